//! Image decoding and tensor preparation.

mod load;
mod tensor;

pub use load::{load_image, ChannelOrder, RasterImage};
pub use tensor::to_tensor;

use ndarray::Array4;

/// Image tensor in NCHW format (batch, channels, height, width).
/// Values are normalized to the [0, 1] range.
pub type ImageTensor = Array4<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;

/// Largest value an 8-bit sample can take.
pub const MAX_SAMPLE_VALUE: f32 = 255.0;
