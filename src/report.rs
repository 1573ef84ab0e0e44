//! Human-readable interpretation of BRISQUE scores.

use std::fmt;

/// Fixed quality bands used to label a score. Lower scores are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityBand {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl QualityBand {
    /// All bands, best first.
    pub const ALL: [Self; 5] = [
        Self::Excellent,
        Self::Good,
        Self::Fair,
        Self::Poor,
        Self::VeryPoor,
    ];

    /// Band a score falls into. Each band includes its lower bound;
    /// anything at or above 80 is very poor.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 20.0 => Self::Excellent,
            s if s < 40.0 => Self::Good,
            s if s < 60.0 => Self::Fair,
            s if s < 80.0 => Self::Poor,
            _ => Self::VeryPoor,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent quality",
            Self::Good => "Good quality",
            Self::Fair => "Fair quality",
            Self::Poor => "Poor quality",
            Self::VeryPoor => "Very poor quality",
        }
    }

    /// Row of the interpretation guide for this band.
    #[must_use]
    pub const fn guide_line(self) -> &'static str {
        match self {
            Self::Excellent => "0  - 20 : Excellent quality",
            Self::Good => "20 - 40 : Good quality",
            Self::Fair => "40 - 60 : Fair quality",
            Self::Poor => "60 - 80 : Poor quality",
            Self::VeryPoor => "80 - 100: Very poor quality",
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const RULE: &str = "===============================";

/// The interpretation guide printed under every score.
#[must_use]
pub fn interpretation_guide() -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str("Interpretation Guide:\n");
    for band in QualityBand::ALL {
        out.push_str(band.guide_line());
        out.push('\n');
    }
    out.push_str(RULE);
    out.push('\n');
    out
}

/// The score line, e.g. `BRISQUE Score: 23.45 (Lower is better)`.
#[must_use]
pub fn score_line(score: f64) -> String {
    format!("BRISQUE Score: {score:.2} (Lower is better)")
}

/// Full report: score line, band and interpretation guide.
#[must_use]
pub fn format_report(score: f64) -> String {
    format!(
        "{}\nRating: {}\n\n{}",
        score_line(score),
        QualityBand::from_score(score),
        interpretation_guide()
    )
}
