//! Natural scene statistics: MSCN coefficients and generalized Gaussian fits.

use ndarray::Array2;

/// Stabilizing constant in the MSCN denominator, for luminance on a 0-255 scale.
const MSCN_C: f64 = 1.0;

/// Guard for denominators that vanish on constant regions.
const EPS: f64 = 1e-12;

/// Paired products this close to zero count for neither side of an AGGD fit.
const SIGN_DEAD_ZONE: f64 = 1e-8;

/// Shape parameter search space for the GGD and AGGD fits.
const ALPHA_START: f64 = 0.2;
const ALPHA_END: f64 = 10.0;
const ALPHA_STEP: f64 = 0.001;

/// Neighbour offsets (dy, dx) for paired products: horizontal, vertical,
/// main diagonal and anti-diagonal.
pub const PAIR_SHIFTS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Lanczos approximation coefficients (g = 7, n = 9).
const LANCZOS_G: f64 = 7.0;
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural logarithm of the gamma function for positive arguments.
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut acc = LANCZOS[0];
    for (i, &coefficient) in LANCZOS.iter().enumerate().skip(1) {
        #[allow(clippy::cast_precision_loss)]
        let offset = i as f64;
        acc += coefficient / (x + offset);
    }
    let t = x + LANCZOS_G + 0.5;

    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

/// Precomputed gamma-function ratios over the shape parameter grid.
#[derive(Debug, Clone)]
pub struct ShapeGrid {
    alphas: Vec<f64>,
    /// Γ(1/α)Γ(3/α) / Γ(2/α)², matched against the GGD moment ratio.
    ggd_ratio: Vec<f64>,
    /// Γ(2/α)² / (Γ(1/α)Γ(3/α)), matched against the AGGD moment ratio.
    aggd_ratio: Vec<f64>,
}

impl Default for ShapeGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeGrid {
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn new() -> Self {
        let steps = ((ALPHA_END - ALPHA_START) / ALPHA_STEP).round() as usize;
        let alphas: Vec<f64> = (0..steps)
            .map(|i| (i as f64).mul_add(ALPHA_STEP, ALPHA_START))
            .collect();

        let ggd_ratio: Vec<f64> = alphas
            .iter()
            .map(|&a| (ln_gamma(1.0 / a) + ln_gamma(3.0 / a) - 2.0 * ln_gamma(2.0 / a)).exp())
            .collect();
        let aggd_ratio = ggd_ratio.iter().map(|r| 1.0 / r).collect();

        Self {
            alphas,
            ggd_ratio,
            aggd_ratio,
        }
    }

    fn closest(&self, ratios: &[f64], target: f64) -> f64 {
        let best = ratios
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
            .map_or(0, |(i, _)| i);
        self.alphas[best]
    }
}

/// Normalized 1-D Gaussian window of odd length.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gaussian_window(size: usize, sigma: f64) -> Vec<f64> {
    let half = (size / 2) as f64;
    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Separable "same" convolution with zero padding.
fn blur(image: &Array2<f64>, window: &[f64]) -> Array2<f64> {
    let (height, width) = image.dim();
    let half = window.len() / 2;

    let mut rows = Array2::<f64>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, &w) in window.iter().enumerate() {
                if let Some(sx) = (x + k).checked_sub(half).filter(|&sx| sx < width) {
                    acc += w * image[[y, sx]];
                }
            }
            rows[[y, x]] = acc;
        }
    }

    let mut out = Array2::<f64>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, &w) in window.iter().enumerate() {
                if let Some(sy) = (y + k).checked_sub(half).filter(|&sy| sy < height) {
                    acc += w * rows[[sy, x]];
                }
            }
            out[[y, x]] = acc;
        }
    }

    out
}

/// Mean-subtracted contrast-normalized coefficients of a luminance plane.
#[must_use]
pub fn mscn(luma: &Array2<f64>, window: &[f64]) -> Array2<f64> {
    let mu = blur(luma, window);
    let squared = luma.mapv(|v| v * v);
    let second_moment = blur(&squared, window);

    let mut out = luma - &mu;
    ndarray::Zip::from(&mut out)
        .and(&mu)
        .and(&second_moment)
        .for_each(|o, &m, &s| {
            let sigma = (s - m * m).abs().sqrt();
            *o /= sigma + MSCN_C;
        });
    out
}

/// Products of each coefficient with its neighbour at `(dy, dx)`, wrapping at the borders.
#[must_use]
pub fn paired_products(coefficients: &Array2<f64>, shift: (isize, isize)) -> Array2<f64> {
    let (height, width) = coefficients.dim();
    let (dy, dx) = shift;

    Array2::from_shape_fn((height, width), |(y, x)| {
        let ny = wrap(y, dy, height);
        let nx = wrap(x, dx, width);
        coefficients[[y, x]] * coefficients[[ny, nx]]
    })
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn wrap(index: usize, offset: isize, len: usize) -> usize {
    (index as isize + offset).rem_euclid(len as isize) as usize
}

/// Fit a zero-mean generalized Gaussian: returns (shape, variance).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fit_ggd(values: &Array2<f64>, grid: &ShapeGrid) -> (f64, f64) {
    let n = values.len().max(1) as f64;
    let sigma_sq = values.iter().map(|v| v * v).sum::<f64>() / n;
    let mean_abs = values.iter().map(|v| v.abs()).sum::<f64>() / n;

    let rho = sigma_sq / (mean_abs * mean_abs + EPS);
    (grid.closest(&grid.ggd_ratio, rho), sigma_sq)
}

/// Fit an asymmetric generalized Gaussian: returns (shape, mean, left variance, right variance).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fit_aggd(values: &Array2<f64>, grid: &ShapeGrid) -> [f64; 4] {
    let (mut left_sum, mut left_count) = (0.0, 0usize);
    let (mut right_sum, mut right_count) = (0.0, 0usize);
    let (mut abs_sum, mut sq_sum) = (0.0, 0.0);

    for &v in values {
        let sq = v * v;
        if v < -SIGN_DEAD_ZONE {
            left_sum += sq;
            left_count += 1;
        } else if v > SIGN_DEAD_ZONE {
            right_sum += sq;
            right_count += 1;
        }
        abs_sum += v.abs();
        sq_sum += sq;
    }

    let n = values.len().max(1) as f64;
    let left_std = (left_sum / left_count.max(1) as f64).sqrt();
    let right_std = (right_sum / right_count.max(1) as f64).sqrt();

    let gamma_hat = left_std / (right_std + EPS);
    let mean_abs = abs_sum / n;
    let r_hat = mean_abs * mean_abs / (sq_sum / n + EPS);
    let r_hat_norm = r_hat * (gamma_hat.powi(3) + 1.0) * (gamma_hat + 1.0)
        / (gamma_hat * gamma_hat + 1.0).powi(2);

    let alpha = grid.closest(&grid.aggd_ratio, r_hat_norm);

    let scale = (0.5 * (ln_gamma(1.0 / alpha) - ln_gamma(3.0 / alpha))).exp();
    let mean = (right_std - left_std)
        * (ln_gamma(2.0 / alpha) - ln_gamma(1.0 / alpha)).exp()
        * scale;

    [alpha, mean, left_std * left_std, right_std * right_std]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ln_gamma_known_values() {
        // Γ(1) = Γ(2) = 1, Γ(5) = 24, Γ(0.5) = √π
        assert!(ln_gamma(1.0).abs() < 1e-10);
        assert!(ln_gamma(2.0).abs() < 1e-10);
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-10);
        assert!((ln_gamma(0.1) - 9.513_507_698_668_732f64.ln()).abs() < 1e-8);
    }

    #[test]
    fn test_gaussian_window_normalized_and_symmetric() {
        let window = gaussian_window(7, 7.0 / 6.0);
        assert_eq!(window.len(), 7);
        assert!((window.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((window[0] - window[6]).abs() < 1e-15);
        assert!(window[3] > window[2]);
    }

    #[test]
    fn test_mscn_of_constant_zero_is_zero() {
        let luma = Array2::<f64>::zeros((9, 9));
        let coefficients = mscn(&luma, &gaussian_window(7, 7.0 / 6.0));
        assert!(coefficients.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mscn_interior_of_constant_plane_is_zero() {
        let luma = Array2::<f64>::from_elem((20, 20), 128.0);
        let coefficients = mscn(&luma, &gaussian_window(7, 7.0 / 6.0));
        assert!(coefficients[[10, 10]].abs() < 1e-9);
    }

    #[test]
    fn test_paired_products_wrap() {
        let coefficients = Array2::from_shape_vec((1, 3), vec![1.0, 2.0, 3.0]).unwrap();
        let products = paired_products(&coefficients, (0, 1));
        assert_eq!(products.as_slice().unwrap(), &[2.0, 6.0, 3.0]);
    }

    #[test]
    fn test_ggd_fit_recovers_gaussian_shape() {
        // Evenly spaced quantiles of a standard normal distribution.
        let n: u32 = 4001;
        let values: Vec<f64> = (1..=n)
            .map(|i| normal_quantile(f64::from(i) / f64::from(n + 1)))
            .collect();
        let values = Array2::from_shape_vec((1, values.len()), values).unwrap();

        let (alpha, sigma_sq) = fit_ggd(&values, &ShapeGrid::new());
        assert!((alpha - 2.0).abs() < 0.1, "alpha = {alpha}");
        assert!((sigma_sq - 1.0).abs() < 0.05, "sigma_sq = {sigma_sq}");
    }

    #[test]
    fn test_aggd_fit_of_zeros_is_finite() {
        let values = Array2::<f64>::zeros((4, 4));
        let features = fit_aggd(&values, &ShapeGrid::new());
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_aggd_ignores_rounding_noise_around_zero() {
        let grid = ShapeGrid::new();
        let noise = Array2::from_shape_vec((2, 3), vec![1e-15, -2e-14, 3e-13, -1e-12, 0.0, 5e-16])
            .unwrap();
        let zeros = Array2::<f64>::zeros((2, 3));

        let [alpha, mean, left, right] = fit_aggd(&noise, &grid);
        let [zero_alpha, ..] = fit_aggd(&zeros, &grid);
        assert!((alpha - zero_alpha).abs() < 1e-12);
        assert!(mean.abs() < 1e-12);
        assert!(left.abs() < f64::EPSILON && right.abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggd_mean_sign_follows_skew() {
        let values =
            Array2::from_shape_vec((1, 6), vec![-0.1, -0.2, 0.5, 1.0, 1.5, 2.0]).unwrap();
        let [alpha, mean, left, right] = fit_aggd(&values, &ShapeGrid::new());
        assert!(alpha > 0.0);
        assert!(mean > 0.0);
        assert!(right > left);
    }

    /// Acklam's rational approximation of the standard normal quantile.
    fn normal_quantile(p: f64) -> f64 {
        const A: [f64; 6] = [
            -3.969_683_028_665_376e1,
            2.209_460_984_245_205e2,
            -2.759_285_104_469_687e2,
            1.383_577_518_672_69e2,
            -3.066_479_806_614_716e1,
            2.506_628_277_459_239,
        ];
        const B: [f64; 5] = [
            -5.447_609_879_822_406e1,
            1.615_858_368_580_409e2,
            -1.556_989_798_598_866e2,
            6.680_131_188_771_972e1,
            -1.328_068_155_288_572e1,
        ];
        const C: [f64; 6] = [
            -7.784_894_002_430_293e-3,
            -3.223_964_580_411_365e-1,
            -2.400_758_277_161_838,
            -2.549_732_539_343_734,
            4.374_664_141_464_968,
            2.938_163_982_698_783,
        ];
        const D: [f64; 4] = [
            7.784_695_709_041_462e-3,
            3.224_671_290_700_398e-1,
            2.445_134_137_142_996,
            3.754_408_661_907_416,
        ];

        let tail = |q: f64| {
            (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
                / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
        };

        if p < 0.024_25 {
            tail((-2.0 * p.ln()).sqrt())
        } else if p > 1.0 - 0.024_25 {
            -tail((-2.0 * (1.0 - p).ln()).sqrt())
        } else {
            let q = p - 0.5;
            let r = q * q;
            (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
                / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
        }
    }
}
