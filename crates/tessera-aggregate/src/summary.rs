//! Mean aggregation by key

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean and sample count of one bucket
///
/// An empty bucket has mean `0`, never `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub count: usize,
}

impl Summary {
    /// Summarize a slice of observations
    #[must_use]
    pub fn of(values: &[f64]) -> Self {
        let mut acc = MeanAccumulator::default();
        values.iter().for_each(|&v| acc.push(v));
        acc.summary()
    }
}

/// Running sum and count
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    #[inline]
    pub(crate) fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub(crate) fn summary(&self) -> Summary {
        if self.count == 0 {
            return Summary::default();
        }
        Summary {
            mean: self.sum / self.count as f64,
            count: self.count,
        }
    }
}

/// Mean per key over `(key, value)` observations
///
/// Every key in `declared` appears in the result even without
/// observations; such buckets summarize to mean `0`, count `0`.
pub fn mean_by_key<K, I, D>(observations: I, declared: D) -> BTreeMap<K, Summary>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
    D: IntoIterator<Item = K>,
{
    let mut buckets: BTreeMap<K, MeanAccumulator> = declared
        .into_iter()
        .map(|key| (key, MeanAccumulator::default()))
        .collect();

    for (key, value) in observations {
        buckets.entry(key).or_default().push(value);
    }

    buckets
        .into_iter()
        .map(|(key, acc)| (key, acc.summary()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn means_per_key() {
        let result = mean_by_key(
            vec![("a", 1.0), ("b", 4.0), ("a", 3.0)],
            std::iter::empty(),
        );
        assert_eq!(result["a"], Summary { mean: 2.0, count: 2 });
        assert_eq!(result["b"], Summary { mean: 4.0, count: 1 });
    }

    #[test]
    fn declared_empty_bucket_is_zero() {
        let result = mean_by_key(vec![((1u32, "x"), 2.0)], [(1u32, "x"), (2u32, "y")]);
        assert_eq!(result[&(2, "y")], Summary { mean: 0.0, count: 0 });
        assert!(!result[&(2, "y")].mean.is_nan());
        assert_eq!(Summary::of(&[]), Summary::default());
    }
}
