use thiserror::Error;

/// Boxed error reported by a caller-supplied metric.
pub type MetricError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by clustering and tree operations.
#[derive(Debug, Error)]
pub enum DbscanError {
    #[error("dbscan: invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dbscan: metric returned invalid distance {value} between items {a} and {b}")]
    InvalidMetric { a: usize, b: usize, value: f64 },

    #[error("dbscan: metric failed on items {a} and {b}: {source}")]
    MetricFailure {
        a: usize,
        b: usize,
        #[source]
        source: MetricError,
    },

    #[error("dbscan: cancelled")]
    Cancelled,
}
