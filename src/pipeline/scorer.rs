//! Single-image quality scoring.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::image::{self, RasterImage};
use crate::metric::{Brisque, QualityMetric};
use crate::model::{ModelCache, ModelFile};

/// Configuration for the quality scorer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Side length of the Gaussian window used for local statistics. Must be odd.
    pub kernel_size: usize,

    /// Standard deviation of the Gaussian window.
    pub kernel_sigma: f64,

    /// Range the tensor samples are normalized to and declared to the metric.
    pub data_range: f32,

    /// Explicit SVR model file. Downloaded into the cache when `None`.
    pub model_file: Option<PathBuf>,

    /// Explicit feature range file. Downloaded into the cache when `None`.
    pub range_file: Option<PathBuf>,

    /// Never download model files.
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kernel_size: 7,
            kernel_sigma: 7.0 / 6.0,
            data_range: 1.0,
            model_file: None,
            range_file: None,
            offline: false,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.kernel_size < 3 || self.kernel_size % 2 == 0 {
            return Err(Error::InvalidParameter {
                name: "kernel_size".to_string(),
                reason: "must be an odd number of at least 3".to_string(),
            });
        }

        if !self.kernel_sigma.is_finite() || self.kernel_sigma <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "kernel_sigma".to_string(),
                reason: "must be a positive number".to_string(),
            });
        }

        if !self.data_range.is_finite() || self.data_range <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "data_range".to_string(),
                reason: "must be a positive number".to_string(),
            });
        }

        Ok(())
    }
}

/// Computes a no-reference quality score for single images.
pub struct QualityScorer {
    config: Config,
    metric: Box<dyn QualityMetric>,
}

impl std::fmt::Debug for QualityScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityScorer")
            .field("config", &self.config)
            .field("metric", &self.metric.name())
            .finish()
    }
}

impl QualityScorer {
    /// Create a scorer around an arbitrary metric.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config, metric: Box<dyn QualityMetric>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, metric })
    }

    /// Create a BRISQUE scorer.
    ///
    /// Model files come from the configuration when given, otherwise from the
    /// model cache (downloading them unless `offline` is set).
    ///
    /// # Errors
    ///
    /// Returns an error if the model files cannot be located or parsed.
    pub fn with_brisque(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing scorer with config: {config:?}");

        let (model_path, range_path) = match (&config.model_file, &config.range_file) {
            (Some(model), Some(range)) => (model.clone(), range.clone()),
            (model, range) => {
                let cache = ModelCache::new(!config.offline)?;
                (
                    resolve(model.as_deref(), &cache, ModelFile::Svm)?,
                    resolve(range.as_deref(), &cache, ModelFile::Range)?,
                )
            }
        };

        tracing::info!("Loading BRISQUE model from {}", model_path.display());
        let metric = Brisque::from_files(
            &model_path,
            &range_path,
            config.kernel_size,
            config.kernel_sigma,
        )?;

        Self::new(config, Box::new(metric))
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Score an image file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded or the metric rejects it.
    pub fn score_path<P: AsRef<Path>>(&self, path: P) -> Result<f64> {
        let path = path.as_ref();
        tracing::info!("Scoring image: {}", path.display());

        let raster = image::load_image(path)?;
        self.score_image(&raster)
    }

    /// Score an already decoded raster.
    ///
    /// # Errors
    ///
    /// Returns an error if the raster is empty or the metric rejects it.
    pub fn score_image(&self, raster: &RasterImage) -> Result<f64> {
        let mut tensor = image::to_tensor(raster)?;
        if (self.config.data_range - 1.0).abs() > f32::EPSILON {
            tensor *= self.config.data_range;
        }

        let score = self.metric.score(&tensor, self.config.data_range)?;
        tracing::debug!("{} score: {score}", self.metric.name());
        Ok(score)
    }
}

fn resolve(explicit: Option<&Path>, cache: &ModelCache, file: ModelFile) -> Result<PathBuf> {
    explicit.map_or_else(|| cache.get_path(file), |path| Ok(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ChannelOrder, ImageTensor};
    use crate::metric::test_metric;
    use ::image::RgbImage;

    /// Mean sample value, handy for checking what reached the metric.
    struct MeanMetric;

    impl QualityMetric for MeanMetric {
        fn name(&self) -> &'static str {
            "mean"
        }

        fn score(&self, tensor: &ImageTensor, data_range: f32) -> Result<f64> {
            let mean = tensor.mean().unwrap_or_default();
            Ok(f64::from(mean / data_range))
        }
    }

    fn textured(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 37 + y * 91) % 256) as u8;
            ::image::Rgb([v, v.wrapping_mul(3), 255 - v])
        })
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_kernel_rejected() {
        let config = Config {
            kernel_size: 4,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_invalid_data_range_rejected() {
        let config = Config {
            data_range: 0.0,
            ..Config::default()
        };
        assert!(QualityScorer::new(config, Box::new(MeanMetric)).is_err());
    }

    #[test]
    fn test_missing_file_propagates() {
        let scorer = QualityScorer::new(Config::default(), Box::new(test_metric())).unwrap();
        let result = scorer.score_path("no/such/image.png");
        assert!(matches!(result, Err(Error::ImageLoad { .. })));
    }

    #[test]
    fn test_bgr_raster_is_reordered_before_scoring() {
        let scorer = QualityScorer::new(Config::default(), Box::new(MeanMetric)).unwrap();

        // Pure blue, once as BGR samples and once as RGB.
        let bgr = RasterImage::from_raw(2, 2, ChannelOrder::Bgr, [255, 0, 0].repeat(4)).unwrap();
        let rgb = RasterImage::from_rgb_image(RgbImage::from_pixel(2, 2, ::image::Rgb([0, 0, 255])));

        assert_eq!(
            image::to_tensor(&bgr).unwrap(),
            image::to_tensor(&rgb).unwrap()
        );
        let expected = 1.0 / 3.0;
        assert!((scorer.score_image(&bgr).unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_score_file_twice_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("texture.png");
        textured(40, 30).save(&path).unwrap();

        let scorer = QualityScorer::new(Config::default(), Box::new(test_metric())).unwrap();
        let first = scorer.score_path(&path).unwrap();
        let second = scorer.score_path(&path).unwrap();

        assert!(first.is_finite());
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_black_and_white_files() {
        let dir = tempfile::tempdir().unwrap();
        let scorer = QualityScorer::new(Config::default(), Box::new(test_metric())).unwrap();

        for (name, value) in [("black.png", 0u8), ("white.png", 255u8)] {
            let path = dir.path().join(name);
            RgbImage::from_pixel(32, 32, ::image::Rgb([value; 3]))
                .save(&path)
                .unwrap();

            let score = scorer.score_path(&path).unwrap();
            assert!(score.is_finite() && score >= 0.0, "{name}: {score}");
        }
    }

    /// Score of [`reference_image`] under `test_metric()`, recorded once.
    const REFERENCE_SCORE: f64 = 41.647_531_502;

    /// Quadratic texture: every window holds real contrast, so the recorded
    /// score does not hinge on rounding.
    #[allow(clippy::cast_possible_truncation)]
    fn reference_image() -> RgbImage {
        let texture = |x: u32, y: u32| (x * x * 3 + y * y * 5 + x * y * 7 + x * 11 + y * 13) % 256;
        RgbImage::from_fn(48, 32, |x, y| {
            ::image::Rgb([
                texture(x, y) as u8,
                texture(y + 3, x + 1) as u8,
                (texture(x + 5, y) / 2 + 64) as u8,
            ])
        })
    }

    #[test]
    fn test_reference_file_matches_recorded_score() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.png");
        reference_image().save(&path).unwrap();

        let scorer = QualityScorer::new(Config::default(), Box::new(test_metric())).unwrap();
        let score = scorer.score_path(&path).unwrap();

        assert!(
            (score - REFERENCE_SCORE).abs() < 1e-4,
            "score {score} drifted from {REFERENCE_SCORE}"
        );
    }

    #[test]
    fn test_data_range_scales_tensor() {
        let config = Config {
            data_range: 255.0,
            ..Config::default()
        };
        let scorer = QualityScorer::new(config, Box::new(MeanMetric)).unwrap();
        let raster =
            RasterImage::from_rgb_image(RgbImage::from_pixel(2, 2, ::image::Rgb([255, 255, 255])));

        assert!((scorer.score_image(&raster).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            model_file: Some(dir.path().join("missing_model.yml")),
            range_file: Some(dir.path().join("missing_range.yml")),
            offline: true,
            ..Config::default()
        };
        assert!(matches!(
            QualityScorer::with_brisque(config),
            Err(Error::Io(_))
        ));
    }

    /// Write a tiny BRISQUE model in OpenCV layout: one support vector at the
    /// origin of the scaled feature space.
    fn write_model(dir: &Path) -> (PathBuf, PathBuf) {
        let count = crate::metric::FEATURE_COUNT;
        let zeros = vec!["0."; count].join(", ");
        let model = format!(
            "%YAML:1.0\n---\nopencv_ml_svm: !!opencv-ml-svm\n   format: 3\n   svmType: EPS_SVR\n   \
             kernel:\n      type: RBF\n      gamma: 5.0e-02\n   \
             term_criteria: {{ epsilon:1.0e-03, iterations:1000 }}\n   var_count: {count}\n   \
             sv_total: 1\n   support_vectors:\n      - [ {zeros} ]\n   decision_functions:\n      \
             -\n         sv_count: 1\n         rho: -5.0\n         alpha: [ 30.0 ]\n         index: [ 0 ]\n"
        );
        let mins = vec!["0."; count].join(", ");
        let maxs = vec!["10."; count].join(", ");
        let range = format!(
            "%YAML:1.0\n---\nrange: !!opencv-matrix\n   rows: 2\n   cols: {count}\n   dt: f\n   \
             data: [ {mins}, {maxs} ]\n"
        );

        let model_path = dir.join("model.yml");
        let range_path = dir.join("range.yml");
        std::fs::write(&model_path, model).unwrap();
        std::fs::write(&range_path, range).unwrap();
        (model_path, range_path)
    }

    #[test]
    fn test_with_brisque_from_explicit_files() {
        let dir = tempfile::tempdir().unwrap();
        let (model_file, range_file) = write_model(dir.path());
        let config = Config {
            model_file: Some(model_file),
            range_file: Some(range_file),
            offline: true,
            ..Config::default()
        };

        let scorer = QualityScorer::with_brisque(config).unwrap();
        let image_path = dir.path().join("texture.png");
        textured(32, 32).save(&image_path).unwrap();

        // Kernel values lie in (0, 1], so the score is bounded by alpha - rho.
        let score = scorer.score_path(&image_path).unwrap();
        assert!(score > 5.0 && score <= 35.0, "score = {score}");
    }
}
