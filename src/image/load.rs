//! Image loading utilities.

use std::path::Path;

use image::{ImageError, ImageReader, RgbImage};

use crate::error::{Error, Result};

use super::RGB_CHANNELS;

/// Order of the color samples inside each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Red, green, blue. What the `image` decoders produce.
    Rgb,
    /// Blue, green, red. Common for raw buffers from capture and OpenCV-style sources.
    Bgr,
}

impl ChannelOrder {
    /// Index of the sample holding the given RGB channel (0 = red, 1 = green, 2 = blue).
    #[must_use]
    pub const fn source_index(self, rgb_channel: usize) -> usize {
        match self {
            Self::Rgb => rgb_channel,
            Self::Bgr => RGB_CHANNELS - 1 - rgb_channel,
        }
    }
}

/// A decoded 8-bit, three-channel raster stored row-major as (row, column, channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    order: ChannelOrder,
    samples: Vec<u8>,
}

impl RasterImage {
    /// Wrap an RGB image produced by the `image` crate.
    #[must_use]
    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            order: ChannelOrder::Rgb,
            samples: img.into_raw(),
        }
    }

    /// Build a raster from interleaved samples in the given channel order.
    ///
    /// # Errors
    ///
    /// Returns an error if `samples` does not hold exactly `width * height * 3` bytes.
    pub fn from_raw(width: u32, height: u32, order: ChannelOrder, samples: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * RGB_CHANNELS;
        if samples.len() != expected {
            return Err(Error::ShapeMismatch {
                expected: format!("{expected} samples for {width}x{height}x{RGB_CHANNELS}"),
                actual: format!("{} samples", samples.len()),
            });
        }

        Ok(Self {
            width,
            height,
            order,
            samples,
        })
    }

    /// Build a raster from interleaved blue-green-red samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer length does not match the dimensions.
    pub fn from_bgr_bytes(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        Self::from_raw(width, height, ChannelOrder::Bgr, samples)
    }

    /// Width and height in pixels.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub const fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    /// Interleaved samples in [`Self::channel_order`].
    #[must_use]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Sample of an RGB channel at a pixel, honoring the stored channel order.
    #[must_use]
    pub fn rgb_sample(&self, x: usize, y: usize, rgb_channel: usize) -> u8 {
        let pixel = (y * self.width as usize + x) * RGB_CHANNELS;
        self.samples[pixel + self.order.source_index(rgb_channel)]
    }

    /// Reorder the samples in place so the raster is red-green-blue.
    #[must_use]
    pub fn into_rgb(mut self) -> Self {
        if self.order == ChannelOrder::Bgr {
            for pixel in self.samples.chunks_exact_mut(RGB_CHANNELS) {
                pixel.swap(0, 2);
            }
            self.order = ChannelOrder::Rgb;
        }
        self
    }
}

/// Decode an image file into an RGB raster.
///
/// The format is detected from the file contents, falling back to the
/// extension. Existence of the path is not checked up front; a missing,
/// unreadable or corrupt file surfaces as [`Error::ImageLoad`].
///
/// # Errors
///
/// Returns an error if the image cannot be opened or decoded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RasterImage> {
    let path = path.as_ref();
    let load_error = |source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    };

    let img = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| load_error(ImageError::IoError(e)))?
        .decode()
        .map_err(load_error)?;

    tracing::debug!(
        "Decoded {} ({}x{}, {:?})",
        path.display(),
        img.width(),
        img.height(),
        img.color()
    );

    Ok(RasterImage::from_rgb_image(img.to_rgb8()))
}
