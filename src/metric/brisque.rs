//! BRISQUE: Blind/Referenceless Image Spatial Quality Evaluator.

use std::path::Path;

use image::{imageops, ImageBuffer, Luma};
use ndarray::{Array2, Axis};

use crate::error::{Error, Result};
use crate::image::{ImageTensor, MAX_SAMPLE_VALUE};
use crate::model;

use super::nss::{self, ShapeGrid, PAIR_SHIFTS};
use super::svr::{FeatureRange, SvrModel};
use super::QualityMetric;

/// Number of features extracted per scale: GGD (2) plus four AGGD fits (4 each).
const FEATURES_PER_SCALE: usize = 2 + 4 * PAIR_SHIFTS.len();

/// Number of image scales analysed.
const SCALES: usize = 2;

/// Length of the feature vector fed to the regressor.
pub const FEATURE_COUNT: usize = FEATURES_PER_SCALE * SCALES;

/// ITU-R BT.601 luma weights.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Smallest edge that still leaves a non-empty half-scale image.
const MIN_EDGE: usize = 2;

/// BRISQUE quality metric backed by a pre-trained SVR.
#[derive(Debug, Clone)]
pub struct Brisque {
    model: SvrModel,
    range: FeatureRange,
    window: Vec<f64>,
    grid: ShapeGrid,
}

impl Brisque {
    /// Create the metric from a trained regressor and its feature scaling.
    ///
    /// # Errors
    ///
    /// Returns an error if the model or range do not describe
    /// [`FEATURE_COUNT`] features, or the Gaussian window is invalid.
    pub fn new(
        model: SvrModel,
        range: FeatureRange,
        kernel_size: usize,
        kernel_sigma: f64,
    ) -> Result<Self> {
        if model.feature_count() != FEATURE_COUNT {
            return Err(Error::ShapeMismatch {
                expected: format!("{FEATURE_COUNT} model features"),
                actual: format!("{} model features", model.feature_count()),
            });
        }

        if range.len() != FEATURE_COUNT {
            return Err(Error::ShapeMismatch {
                expected: format!("{FEATURE_COUNT} feature ranges"),
                actual: format!("{} feature ranges", range.len()),
            });
        }

        if kernel_size < 3 || kernel_size % 2 == 0 {
            return Err(Error::InvalidParameter {
                name: "kernel_size".to_string(),
                reason: "must be an odd number of at least 3".to_string(),
            });
        }

        if kernel_sigma.is_nan() || kernel_sigma <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "kernel_sigma".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        tracing::debug!(
            "BRISQUE model with {} support vectors, {kernel_size}x{kernel_size} window",
            model.support_vector_count()
        );

        Ok(Self {
            model,
            range,
            window: nss::gaussian_window(kernel_size, kernel_sigma),
            grid: ShapeGrid::new(),
        })
    }

    /// Load the regressor and feature scaling from OpenCV model files.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read or parsed.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        model_path: P,
        range_path: Q,
        kernel_size: usize,
        kernel_sigma: f64,
    ) -> Result<Self> {
        let model = model::read_svm(model_path.as_ref())?;
        let range = model::read_range(range_path.as_ref())?;
        Self::new(model, range, kernel_size, kernel_sigma)
    }

    /// Extract the raw (unscaled) BRISQUE feature vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor is not a single image in `[0, data_range]`
    /// or is too small to be analysed at two scales.
    pub fn features(&self, tensor: &ImageTensor, data_range: f32) -> Result<Vec<f64>> {
        validate_tensor(tensor, data_range)?;

        let full = luminance(tensor, data_range);
        let half = downscale(&full);

        let mut features = Vec::with_capacity(FEATURE_COUNT);
        for luma in [&full, &half] {
            features.extend(self.scale_features(luma));
        }

        tracing::debug!("BRISQUE features: {features:?}");
        Ok(features)
    }

    fn scale_features(&self, luma: &Array2<f64>) -> Vec<f64> {
        let coefficients = nss::mscn(luma, &self.window);

        let mut features = Vec::with_capacity(FEATURES_PER_SCALE);
        let (alpha, sigma_sq) = nss::fit_ggd(&coefficients, &self.grid);
        features.push(alpha);
        features.push(sigma_sq);

        for shift in PAIR_SHIFTS {
            let products = nss::paired_products(&coefficients, shift);
            features.extend(nss::fit_aggd(&products, &self.grid));
        }

        features
    }
}

impl QualityMetric for Brisque {
    fn name(&self) -> &'static str {
        "brisque"
    }

    fn score(&self, tensor: &ImageTensor, data_range: f32) -> Result<f64> {
        let features = self.features(tensor, data_range)?;
        let scaled = self.range.scale(&features)?;
        let raw = self.model.predict(&scaled)?;

        // Regression can undershoot below the best achievable quality.
        Ok(raw.max(0.0))
    }
}

/// Check the tensor is (1, 3 | 1, H, W) with every sample inside `[0, data_range]`.
fn validate_tensor(tensor: &ImageTensor, data_range: f32) -> Result<()> {
    if data_range.is_nan() || data_range <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "data_range".to_string(),
            reason: format!("must be positive, got {data_range}"),
        });
    }

    let (batch, channels, height, width) = tensor.dim();
    if batch != 1 || !(channels == 1 || channels == 3) {
        return Err(Error::ShapeMismatch {
            expected: "(1, 3, H, W) or (1, 1, H, W)".to_string(),
            actual: format!("{:?}", tensor.shape()),
        });
    }

    if height < MIN_EDGE || width < MIN_EDGE {
        return Err(Error::UnsupportedDimensions {
            width,
            height,
            reason: format!("both sides must be at least {MIN_EDGE} pixels"),
        });
    }

    if tensor.iter().any(|v| !(0.0..=data_range).contains(v)) {
        let min = tensor.iter().copied().fold(f32::INFINITY, f32::min);
        let max = tensor.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        return Err(Error::DataRange {
            min,
            max,
            data_range,
        });
    }

    Ok(())
}

/// Luminance plane on a 0-255 scale.
fn luminance(tensor: &ImageTensor, data_range: f32) -> Array2<f64> {
    let image = tensor.index_axis(Axis(0), 0);
    let scale = f64::from(MAX_SAMPLE_VALUE) / f64::from(data_range);

    if image.len_of(Axis(0)) == 1 {
        return image.index_axis(Axis(0), 0).mapv(|v| f64::from(v) * scale);
    }

    let (r, g, b) = (
        image.index_axis(Axis(0), 0),
        image.index_axis(Axis(0), 1),
        image.index_axis(Axis(0), 2),
    );

    let mut luma = Array2::<f64>::zeros(r.raw_dim());
    ndarray::Zip::from(&mut luma)
        .and(&r)
        .and(&g)
        .and(&b)
        .for_each(|y, &r, &g, &b| {
            *y = (LUMA_WEIGHTS[0] * f64::from(r)
                + LUMA_WEIGHTS[1] * f64::from(g)
                + LUMA_WEIGHTS[2] * f64::from(b))
                * scale;
        });
    luma
}

/// Halve a luminance plane with bicubic resampling.
#[allow(clippy::cast_possible_truncation)]
fn downscale(luma: &Array2<f64>) -> Array2<f64> {
    let (height, width) = luma.dim();
    let max = f64::from(MAX_SAMPLE_VALUE);

    // Resampling works on [0, 1] floats; the plane is bounded by 255.
    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            Luma([(luma[[y as usize, x as usize]] / max) as f32])
        });

    let new_width = width.div_ceil(2) as u32;
    let new_height = height.div_ceil(2) as u32;
    let resized = imageops::resize(
        &buffer,
        new_width,
        new_height,
        imageops::FilterType::CatmullRom,
    );

    Array2::from_shape_fn((new_height as usize, new_width as usize), |(y, x)| {
        f64::from(resized.get_pixel(x as u32, y as u32)[0]) * max
    })
}
