//! Min-max and z-score normalization
//!
//! Degenerate inputs (all values equal, or zero standard deviation) pass
//! through unchanged instead of producing zeros or `NaN`.

use serde::{Deserialize, Serialize};

/// Normalization applied to a heatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    #[default]
    None,
    MinMax,
    ZScore,
}

/// Matrix axis a normalization runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationAxis {
    /// Each row independently
    Row,
    /// Each column independently
    Column,
    /// The flattened matrix as a whole
    #[default]
    Both,
}

/// `(v - min) / (max - min)`
#[must_use]
pub fn min_max(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    if values.is_empty() || !span.is_finite() || span == 0.0 {
        return values.to_vec();
    }
    values.iter().map(|v| (v - min) / span).collect()
}

/// `(v - mean) / sigma` with the population standard deviation
#[must_use]
pub fn z_score(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sigma = variance.sqrt();
    if sigma == 0.0 || !sigma.is_finite() {
        return values.to_vec();
    }
    values.iter().map(|v| (v - mean) / sigma).collect()
}

/// Apply `method` to a row-major matrix along `axis`
///
/// Ragged rows are allowed; a column only includes rows long enough to
/// have it.
#[must_use]
pub fn normalize_matrix(
    matrix: &[Vec<f64>],
    method: Normalization,
    axis: NormalizationAxis,
) -> Vec<Vec<f64>> {
    let f: fn(&[f64]) -> Vec<f64> = match method {
        Normalization::None => return matrix.to_vec(),
        Normalization::MinMax => min_max,
        Normalization::ZScore => z_score,
    };

    match axis {
        NormalizationAxis::Row => matrix.iter().map(|row| f(row)).collect(),
        NormalizationAxis::Both => {
            let flat: Vec<f64> = matrix.iter().flatten().copied().collect();
            let mut normalized = f(&flat).into_iter();
            matrix
                .iter()
                .map(|row| normalized.by_ref().take(row.len()).collect())
                .collect()
        }
        NormalizationAxis::Column => {
            let width = matrix.iter().map(Vec::len).max().unwrap_or(0);
            let mut out = matrix.to_vec();
            for col in 0..width {
                let rows: Vec<usize> = (0..matrix.len())
                    .filter(|&r| col < matrix[r].len())
                    .collect();
                let column: Vec<f64> = rows.iter().map(|&r| matrix[r][col]).collect();
                for (&r, v) in rows.iter().zip(f(&column)) {
                    out[r][col] = v;
                }
            }
            out
        }
    }
}
