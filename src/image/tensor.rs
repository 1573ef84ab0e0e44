//! Raster to normalized tensor conversion.

use ndarray::Array4;

use crate::error::{Error, Result};

use super::{ImageTensor, RasterImage, MAX_SAMPLE_VALUE, RGB_CHANNELS};

/// Convert a raster to a normalized NCHW tensor.
///
/// The raster is:
/// 1. Read in red-green-blue order regardless of its stored channel order
/// 2. Scaled from [0, 255] to [0, 1]
/// 3. Permuted from (H, W, C) to (C, H, W) with a leading batch axis
///
/// The result has shape (1, 3, height, width).
///
/// # Errors
///
/// Returns an error if the raster has a zero dimension.
pub fn to_tensor(raster: &RasterImage) -> Result<ImageTensor> {
    let (width, height) = raster.dimensions();
    let (width, height) = (width as usize, height as usize);

    if width == 0 || height == 0 {
        return Err(Error::UnsupportedDimensions {
            width,
            height,
            reason: "image has no pixels".to_string(),
        });
    }

    let tensor = Array4::from_shape_fn((1, RGB_CHANNELS, height, width), |(_, c, y, x)| {
        f32::from(raster.rgb_sample(x, y, c)) / MAX_SAMPLE_VALUE
    });

    Ok(tensor)
}
