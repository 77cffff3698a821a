//! Histogram and 2D density binning for cytometry plots

use crate::error::AggregateError;
use serde::{Deserialize, Serialize};

/// Axis transform applied before binning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisScale {
    #[default]
    Linear,
    /// `log10(v + 1)`
    Log,
}

impl AxisScale {
    /// Transformed value; `None` when not finite after the transform
    #[inline]
    #[must_use]
    pub fn apply(self, value: f64) -> Option<f64> {
        let v = match self {
            Self::Linear => value,
            Self::Log => (value + 1.0).log10(),
        };
        v.is_finite().then_some(v)
    }
}

/// Equal-width bins over a closed range
#[derive(Debug, Clone, Copy, PartialEq)]
struct Axis {
    min: f64,
    max: f64,
    bins: usize,
}

impl Axis {
    fn new(min: f64, max: f64, bins: usize) -> Result<Self, AggregateError> {
        if bins == 0 {
            return Err(AggregateError::NoBins);
        }
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(AggregateError::InvalidRange { min, max });
        }
        Ok(Self { min, max, bins })
    }

    /// Range of the finite values; a single distinct value gets a unit-wide
    /// range centred on it
    fn fit(values: impl Iterator<Item = f64>, bins: usize) -> Result<Self, AggregateError> {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if min > max {
            return Self::new(0.0, 1.0, bins);
        }
        if min == max {
            return Self::new(min - 0.5, max + 0.5, bins);
        }
        Self::new(min, max, bins)
    }

    fn width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    /// Bin of `v`; the upper bound falls in the last bin
    fn index(&self, v: f64) -> Option<usize> {
        if v < self.min || v > self.max {
            return None;
        }
        let idx = ((v - self.min) / self.width()).floor() as usize;
        Some(idx.min(self.bins - 1))
    }

    fn edges(&self) -> Vec<f64> {
        let width = self.width();
        (0..=self.bins)
            .map(|i| self.min + i as f64 * width)
            .collect()
    }
}

/// One-dimensional histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges
    pub edges: Vec<f64>,
    pub counts: Vec<u32>,
    /// Non-finite or out-of-range values
    pub dropped: usize,
}

/// Bin `values` into `bins` equal-width bins
///
/// `range` defaults to the extent of the finite values.
///
/// # Errors
/// - `AggregateError::NoBins` if `bins` is zero
/// - `AggregateError::InvalidRange` for an empty or non-finite `range`
pub fn histogram(
    values: &[f64],
    bins: usize,
    range: Option<(f64, f64)>,
) -> Result<Histogram, AggregateError> {
    let axis = match range {
        Some((min, max)) => Axis::new(min, max, bins)?,
        None => Axis::fit(values.iter().copied().filter(|v| v.is_finite()), bins)?,
    };

    let mut counts = vec![0u32; bins];
    let mut dropped = 0;
    for &v in values {
        match v.is_finite().then(|| axis.index(v)).flatten() {
            Some(i) => counts[i] += 1,
            None => dropped += 1,
        }
    }

    Ok(Histogram {
        edges: axis.edges(),
        counts,
        dropped,
    })
}

/// Two-dimensional count grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bins2d {
    /// Edges in transformed space
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    /// `counts[y][x]`
    pub counts: Vec<Vec<u32>>,
    /// Pairs with a value that is non-finite after the transform
    pub dropped: usize,
    pub scale: AxisScale,
}

impl Bins2d {
    /// Largest bin count
    #[must_use]
    pub fn max_count(&self) -> u32 {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Smallest bin count
    #[must_use]
    pub fn min_count(&self) -> u32 {
        self.counts.iter().flatten().copied().min().unwrap_or(0)
    }

    /// Points binned
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().map(|&c| u64::from(c)).sum()
    }
}

/// Bin paired `(x, y)` values into an `x_bins` by `y_bins` grid
///
/// Both axes use `scale` and span the extent of their transformed values.
///
/// # Errors
/// - `AggregateError::LengthMismatch` if `xs` and `ys` differ in length
/// - `AggregateError::NoBins` if either bin count is zero
pub fn bin_2d(
    xs: &[f64],
    ys: &[f64],
    x_bins: usize,
    y_bins: usize,
    scale: AxisScale,
) -> Result<Bins2d, AggregateError> {
    if xs.len() != ys.len() {
        return Err(AggregateError::LengthMismatch {
            x: xs.len(),
            y: ys.len(),
        });
    }

    let points: Vec<Option<(f64, f64)>> = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| Some((scale.apply(x)?, scale.apply(y)?)))
        .collect();
    let dropped = points.iter().filter(|p| p.is_none()).count();
    if dropped > 0 {
        tracing::debug!(dropped, ?scale, "dropping non-finite values before binning");
    }

    let valid = || points.iter().flatten();
    let x_axis = Axis::fit(valid().map(|p| p.0), x_bins)?;
    let y_axis = Axis::fit(valid().map(|p| p.1), y_bins)?;

    let mut counts = vec![vec![0u32; x_bins]; y_bins];
    for &(x, y) in valid() {
        if let (Some(xi), Some(yi)) = (x_axis.index(x), y_axis.index(y)) {
            counts[yi][xi] += 1;
        }
    }

    Ok(Bins2d {
        x_edges: x_axis.edges(),
        y_edges: y_axis.edges(),
        counts,
        dropped,
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_places_max_in_last_bin() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4, None).unwrap();
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_eq!(h.dropped, 0);
    }

    #[test]
    fn histogram_drops_out_of_range_and_nan() {
        let h = histogram(&[-1.0, 0.5, f64::NAN, 9.0], 2, Some((0.0, 2.0))).unwrap();
        assert_eq!(h.counts, vec![1, 0]);
        assert_eq!(h.dropped, 3);
    }

    #[test]
    fn histogram_rejects_bad_requests() {
        assert_eq!(histogram(&[1.0], 0, None), Err(AggregateError::NoBins));
        assert!(matches!(
            histogram(&[1.0], 3, Some((2.0, 2.0))),
            Err(AggregateError::InvalidRange { .. })
        ));
    }

    #[test]
    fn single_value_gets_a_unit_range() {
        let h = histogram(&[5.0, 5.0, 5.0], 1, None).unwrap();
        assert_eq!(h.edges, vec![4.5, 5.5]);
        assert_eq!(h.counts, vec![3]);
    }

    #[test]
    fn log_scale_bins_in_log_space() {
        // log10(v + 1): 0 -> 0, 9 -> 1, 99 -> 2
        let b = bin_2d(&[0.0, 9.0, 99.0], &[0.0, 9.0, 99.0], 2, 2, AxisScale::Log).unwrap();
        assert_eq!(b.x_edges, vec![0.0, 1.0, 2.0]);
        assert_eq!(b.counts, vec![vec![1, 0], vec![0, 2]]);
        assert_eq!(b.max_count(), 2);
        assert_eq!(b.total(), 3);
    }

    #[test]
    fn log_scale_drops_values_at_or_below_minus_one() {
        let b = bin_2d(&[-1.0, 1.0, 3.0], &[1.0, 1.0, 3.0], 2, 2, AxisScale::Log).unwrap();
        assert_eq!(b.dropped, 1);
        assert_eq!(b.total(), 2);
    }

    #[test]
    fn mismatched_lengths_fail() {
        assert_eq!(
            bin_2d(&[1.0], &[], 2, 2, AxisScale::Linear),
            Err(AggregateError::LengthMismatch { x: 1, y: 0 })
        );
    }
}
