//! # brisque-score
//!
//! No-reference image quality assessment with BRISQUE (Blind/Referenceless
//! Image Spatial Quality Evaluator). Lower scores indicate better perceived
//! quality.
//!
//! An image is decoded, reordered to RGB, scaled to [0, 1] and laid out as a
//! (1, 3, H, W) tensor before being handed to a [`QualityMetric`].
//!
//! ## Example
//!
//! ```no_run
//! use brisque_score::{Config, QualityScorer};
//!
//! # fn main() -> brisque_score::Result<()> {
//! let scorer = QualityScorer::with_brisque(Config::default())?;
//! let score = scorer.score_path("photo.jpg")?;
//! println!("{}", brisque_score::report::format_report(score));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod metric;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod service;

pub use error::{Error, Result};
pub use metric::{Brisque, QualityMetric};
pub use pipeline::{Config, QualityScorer};
pub use report::QualityBand;
pub use service::{Outcome, ScoreEvent, ScoringService};
