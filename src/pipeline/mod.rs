//! Image-to-score pipeline.

mod scorer;

pub use scorer::{Config, QualityScorer};
