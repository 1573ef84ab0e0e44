//! No-reference quality metrics.
//!
//! A metric consumes a normalized NCHW tensor together with the numeric range
//! its samples were scaled to and returns a single score. Callers must keep
//! the declared range consistent with how the tensor was produced.

mod brisque;
mod nss;
mod svr;

pub use brisque::{Brisque, FEATURE_COUNT};
pub use nss::ShapeGrid;
pub use svr::{FeatureRange, SvrModel};

#[cfg(test)]
pub(crate) use brisque::tests::test_metric;

use crate::error::Result;
use crate::image::ImageTensor;

/// A no-reference image quality metric.
pub trait QualityMetric: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Score a (1, C, H, W) tensor whose samples lie in `[0, data_range]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor shape or value range is not accepted.
    fn score(&self, tensor: &ImageTensor, data_range: f32) -> Result<f64>;
}
