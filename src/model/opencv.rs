//! Reader for BRISQUE models stored in OpenCV `FileStorage` YAML.
//!
//! OpenCV writes a `%YAML:1.0` directive and `!!opencv-*` type tags that
//! general YAML parsers reject, so both are stripped before deserializing.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ndarray::Array2;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::metric::{FeatureRange, SvrModel};

#[derive(Debug, Deserialize)]
struct SvmNode {
    var_count: usize,
    kernel: KernelNode,
    support_vectors: Vec<Vec<f64>>,
    decision_functions: Vec<DecisionFunction>,
}

#[derive(Debug, Deserialize)]
struct KernelNode {
    #[serde(rename = "type")]
    kind: String,
    gamma: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DecisionFunction {
    rho: f64,
    alpha: Vec<f64>,
    #[serde(default)]
    index: Option<Vec<usize>>,
}

#[derive(Debug, Deserialize)]
struct MatrixNode {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Read an SVR model file from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid RBF SVR model.
pub fn read_svm(path: &Path) -> Result<SvrModel> {
    let text = fs::read_to_string(path)?;
    parse_svm(&text).map_err(|reason| Error::ModelParse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Read a feature range file from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a 2-row matrix.
pub fn read_range(path: &Path) -> Result<FeatureRange> {
    let text = fs::read_to_string(path)?;
    parse_range(&text).map_err(|reason| Error::ModelParse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse the text of an OpenCV `ml::SVM` regression model.
///
/// # Errors
///
/// Returns a description of the first problem found.
pub fn parse_svm(text: &str) -> std::result::Result<SvrModel, String> {
    let node: SvmNode = first_node(text)?;

    if !node.kernel.kind.eq_ignore_ascii_case("rbf") {
        return Err(format!("unsupported kernel type {}", node.kernel.kind));
    }
    let gamma = node
        .kernel
        .gamma
        .ok_or_else(|| "RBF kernel without gamma".to_string())?;

    let sv_total = node.support_vectors.len();
    if let Some(bad) = node
        .support_vectors
        .iter()
        .position(|sv| sv.len() != node.var_count)
    {
        return Err(format!(
            "support vector {bad} has {} values, expected {}",
            node.support_vectors[bad].len(),
            node.var_count
        ));
    }

    let function = node
        .decision_functions
        .into_iter()
        .next()
        .ok_or_else(|| "model has no decision function".to_string())?;

    let mut coefficients = vec![0.0; sv_total];
    match function.index {
        Some(index) => {
            if index.len() != function.alpha.len() {
                return Err(format!(
                    "{} alphas but {} indices",
                    function.alpha.len(),
                    index.len()
                ));
            }
            for (&i, &alpha) in index.iter().zip(&function.alpha) {
                let slot = coefficients
                    .get_mut(i)
                    .ok_or_else(|| format!("support vector index {i} out of range"))?;
                *slot += alpha;
            }
        }
        None => {
            if function.alpha.len() != sv_total {
                return Err(format!(
                    "{} alphas for {sv_total} support vectors",
                    function.alpha.len()
                ));
            }
            coefficients = function.alpha;
        }
    }

    let flat: Vec<f64> = node.support_vectors.into_iter().flatten().collect();
    let support_vectors = Array2::from_shape_vec((sv_total, node.var_count), flat)
        .map_err(|e| format!("support vectors: {e}"))?;

    SvrModel::new(gamma, function.rho, support_vectors, coefficients).map_err(|e| e.to_string())
}

/// Parse the text of an OpenCV matrix holding per-feature minima (row 0)
/// and maxima (row 1).
///
/// # Errors
///
/// Returns a description of the first problem found.
pub fn parse_range(text: &str) -> std::result::Result<FeatureRange, String> {
    let matrix: MatrixNode = first_node(text)?;

    if matrix.rows != 2 {
        return Err(format!("range matrix has {} rows, expected 2", matrix.rows));
    }
    if matrix.data.len() != matrix.rows * matrix.cols {
        return Err(format!(
            "range matrix declares {}x{} but holds {} values",
            matrix.rows,
            matrix.cols,
            matrix.data.len()
        ));
    }

    let (min, max) = matrix.data.split_at(matrix.cols);
    FeatureRange::new(min.to_vec(), max.to_vec()).map_err(|e| e.to_string())
}

/// Deserialize the first top-level entry of a `FileStorage` document.
fn first_node<T: serde::de::DeserializeOwned>(text: &str) -> std::result::Result<T, String> {
    let cleaned = clean(text);
    let root: BTreeMap<String, serde_yaml::Value> =
        serde_yaml::from_str(&cleaned).map_err(|e| e.to_string())?;

    // FileStorage documents hold a single named node.
    let (name, value) = root
        .into_iter()
        .next()
        .ok_or_else(|| "document is empty".to_string())?;

    serde_yaml::from_value(value).map_err(|e| format!("{name}: {e}"))
}

fn clean(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with('%'))
        // Written in a compact flow style that YAML parsers reject; not needed for prediction.
        .filter(|line| !line.trim_start().starts_with("term_criteria:"))
        .map(strip_tag)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_tag(line: &str) -> Cow<'_, str> {
    match line.find("!!") {
        Some(start) => {
            let end = line[start..]
                .find(char::is_whitespace)
                .map_or(line.len(), |offset| start + offset);
            Cow::Owned(format!("{}{}", &line[..start], &line[end..]))
        }
        None => Cow::Borrowed(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVM: &str = "%YAML:1.0
---
opencv_ml_svm: !!opencv-ml-svm
   format: 3
   svmType: EPS_SVR
   kernel:
      type: RBF
      gamma: 5.0000000000000003e-02
   C: 1024.
   p: 1.0000000000000001e-01
   term_criteria: { epsilon:1.0000000000000000e-03, iterations:1000 }
   var_count: 2
   sv_total: 3
   support_vectors:
      - [ 0., 0. ]
      - [ 1.0e+00, -1.0e+00 ]
      - [ 5.0e-01, 5.0e-01 ]
   decision_functions:
      -
         sv_count: 3
         rho: -2.5e+00
         alpha: [ 1.5e+00, -2.0e+00, 4.0e+00 ]
         index: [ 2, 0, 1 ]
";

    const RANGE: &str = "%YAML:1.0
---
range: !!opencv-matrix
   rows: 2
   cols: 3
   dt: f
   data: [ 0., -1., 2., 1., 1., 4. ]
";

    #[test]
    fn test_parse_svm() {
        let model = parse_svm(SVM).unwrap();
        assert_eq!(model.feature_count(), 2);
        assert_eq!(model.support_vector_count(), 3);

        // At the origin only the first vector (coefficient -2.0 via index 0) contributes fully.
        let k1 = (-0.05f64 * 2.0).exp();
        let k2 = (-0.05f64 * 0.5).exp();
        let expected = -2.0 + 4.0 * k1 + 1.5 * k2 + 2.5;
        let score = model.predict(&[0.0, 0.0]).unwrap();
        assert!((score - expected).abs() < 1e-9, "{score} vs {expected}");
    }

    #[test]
    fn test_parse_svm_without_index() {
        let text = SVM.replace("         index: [ 2, 0, 1 ]\n", "");
        let model = parse_svm(&text).unwrap();
        assert_eq!(model.support_vector_count(), 3);
    }

    #[test]
    fn test_parse_svm_rejects_linear_kernel() {
        let text = SVM.replace("type: RBF", "type: LINEAR");
        let err = parse_svm(&text).unwrap_err();
        assert!(err.contains("LINEAR"));
    }

    #[test]
    fn test_parse_svm_rejects_ragged_vectors() {
        let text = SVM.replace("[ 5.0e-01, 5.0e-01 ]", "[ 5.0e-01 ]");
        assert!(parse_svm(&text).is_err());
    }

    #[test]
    fn test_parse_range() {
        let range = parse_range(RANGE).unwrap();
        assert_eq!(range.len(), 3);
        assert_eq!(range.scale(&[0.0, 1.0, 4.0]).unwrap(), vec![-1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_parse_range_rejects_wrong_rows() {
        let text = RANGE.replace("rows: 2", "rows: 3");
        assert!(parse_range(&text).is_err());
    }

    #[test]
    fn test_strip_tag() {
        assert_eq!(strip_tag("range: !!opencv-matrix"), "range: ");
        assert_eq!(strip_tag("   rows: 2"), "   rows: 2");
    }

    #[test]
    fn test_read_svm_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "%YAML:1.0\n---\nnot_a_model: 3\n").unwrap();

        match read_svm(&path) {
            Err(Error::ModelParse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
