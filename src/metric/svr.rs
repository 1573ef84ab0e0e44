//! Epsilon-SVR prediction with an RBF kernel.

use ndarray::Array2;

use crate::error::{Error, Result};

/// A trained support vector regressor with a radial basis function kernel.
#[derive(Debug, Clone)]
pub struct SvrModel {
    gamma: f64,
    rho: f64,
    support_vectors: Array2<f64>,
    coefficients: Vec<f64>,
}

impl SvrModel {
    /// Assemble a model from its parameters.
    ///
    /// `support_vectors` holds one vector per row; `coefficients` holds the
    /// matching dual coefficients.
    ///
    /// # Errors
    ///
    /// Returns an error if the coefficient count does not match the number of
    /// support vectors or `gamma` is not positive.
    pub fn new(
        gamma: f64,
        rho: f64,
        support_vectors: Array2<f64>,
        coefficients: Vec<f64>,
    ) -> Result<Self> {
        if support_vectors.nrows() != coefficients.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} coefficients", support_vectors.nrows()),
                actual: format!("{} coefficients", coefficients.len()),
            });
        }

        if gamma.is_nan() || gamma <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "gamma".to_string(),
                reason: format!("must be positive, got {gamma}"),
            });
        }

        Ok(Self {
            gamma,
            rho,
            support_vectors,
            coefficients,
        })
    }

    /// Number of features each support vector carries.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.support_vectors.ncols()
    }

    #[must_use]
    pub fn support_vector_count(&self) -> usize {
        self.support_vectors.nrows()
    }

    /// Evaluate `Σ coef_i · exp(-γ‖x - sv_i‖²) - ρ`.
    ///
    /// # Errors
    ///
    /// Returns an error if `features` has the wrong length.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.feature_count() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} features", self.feature_count()),
                actual: format!("{} features", features.len()),
            });
        }

        let sum: f64 = self
            .support_vectors
            .rows()
            .into_iter()
            .zip(&self.coefficients)
            .map(|(sv, &coef)| {
                let dist_sq: f64 = sv.iter().zip(features).map(|(a, b)| (a - b).powi(2)).sum();
                coef * (-self.gamma * dist_sq).exp()
            })
            .sum();

        Ok(sum - self.rho)
    }
}

/// Per-feature bounds used to rescale raw features into [-1, 1] before prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRange {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl FeatureRange {
    /// Create a range from per-feature minima and maxima.
    ///
    /// # Errors
    ///
    /// Returns an error if the bound vectors differ in length.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self> {
        if min.len() != max.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} upper bounds", min.len()),
                actual: format!("{} upper bounds", max.len()),
            });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.min.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }

    /// Map each feature linearly so `min` lands on -1 and `max` on 1.
    /// Features with a degenerate range map to 0.
    ///
    /// # Errors
    ///
    /// Returns an error if `features` has the wrong length.
    pub fn scale(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} features", self.len()),
                actual: format!("{} features", features.len()),
            });
        }

        Ok(features
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .map(|(&value, (&lo, &hi))| {
                let span = hi - lo;
                if span.abs() < f64::EPSILON {
                    0.0
                } else {
                    2.0f64.mul_add((value - lo) / span, -1.0)
                }
            })
            .collect())
    }
}
