use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DbscanError, MetricError};

/// A distance function over items of type `T`.
///
/// Implementations must behave as a metric: `distance(a, b)` is
/// non-negative, symmetric, zero exactly when the two items are the same,
/// and satisfies the triangle inequality. The tree prunes subtrees based
/// on the triangle inequality, so a function that violates it produces
/// undefined (but memory-safe, terminating) results: queries may simply
/// miss items.
///
/// Plain closures are metrics out of the box:
///
/// ```
/// use metric_dbscan::Metric;
///
/// let line = |a: &f64, b: &f64| (a - b).abs();
/// assert_eq!(line.distance(&3.0, &7.0).unwrap(), 4.0);
/// ```
///
/// Implement the trait directly when computing a distance can fail
/// (e.g. the metric calls out to an external service); the error is
/// surfaced to the caller unchanged.
pub trait Metric<T: ?Sized> {
    /// Computes the distance between two items.
    fn distance(&self, a: &T, b: &T) -> Result<f64, MetricError>;
}

impl<T: ?Sized, F> Metric<T> for F
where
    F: Fn(&T, &T) -> f64,
{
    fn distance(&self, a: &T, b: &T) -> Result<f64, MetricError> {
        Ok(self(a, b))
    }
}

/// Index-addressed view over the caller's items and metric.
///
/// The tree and the driver never touch items directly; everything goes
/// through here by position in the input slice. Every distance is checked
/// before it is used: a negative, NaN, or infinite value aborts the call.
pub(crate) struct IndexedMetric<'a, T, M> {
    items: &'a [T],
    metric: &'a M,
    calls: AtomicU64,
}

impl<'a, T, M: Metric<T>> IndexedMetric<'a, T, M> {
    pub(crate) fn new(items: &'a [T], metric: &'a M) -> Self {
        Self {
            items,
            metric,
            calls: AtomicU64::new(0),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Number of metric evaluations performed so far.
    pub(crate) fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Distance between the items at positions `a` and `b`.
    pub(crate) fn between(&self, a: usize, b: usize) -> Result<f64, DbscanError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let value = self
            .metric
            .distance(&self.items[a], &self.items[b])
            .map_err(|source| DbscanError::MetricFailure { a, b, source })?;
        if !value.is_finite() || value < 0.0 {
            return Err(DbscanError::InvalidMetric { a, b, value });
        }
        Ok(value)
    }
}
