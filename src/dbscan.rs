use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::DbscanError;
use crate::metric::Metric;
use crate::vptree::{TreeConfig, VpTree, DEFAULT_SEED};

/// Label assigned to items that do not belong to any cluster.
pub const OUTLIER: i32 = -1;

/// ClusterConfig configures a clustering run.
///
/// The defaults reproduce [`cluster_items`]. `bucket_size` and `seed`
/// shape the vantage point tree and affect performance only; the labels
/// a run produces depend solely on the items, the metric, and the two
/// DBSCAN parameters.
pub struct ClusterConfig<'a> {
    /// Maximum number of indices per tree leaf. Must be positive.
    /// Default: 1.
    pub bucket_size: usize,
    /// Seed for vantage selection, forwarded to [`TreeConfig`].
    /// Default: [`DEFAULT_SEED`].
    pub seed: u64,
    /// Called once per scanned item with `(items_processed, items_total)`.
    pub progress: Option<&'a mut dyn FnMut(usize, usize)>,
    /// Checked once per scanned item and before every neighborhood query.
    /// Raise the flag to abort the run with [`DbscanError::Cancelled`];
    /// no partial labels are returned.
    pub cancel: Option<&'a AtomicBool>,
}

impl Default for ClusterConfig<'_> {
    fn default() -> Self {
        Self {
            bucket_size: 1,
            seed: DEFAULT_SEED,
            progress: None,
            cancel: None,
        }
    }
}

/// Groups items into clusters using DBSCAN.
///
/// Assigns an integer label to each input item: `L >= 0` means the item
/// belongs to cluster `L`, [`OUTLIER`] (-1) means it belongs to none.
/// Cluster IDs are dense, start at 0, and are handed out in the order the
/// clusters are first discovered while scanning items in input order.
/// An empty input yields an empty label vector, not an error.
///
/// `min_cluster_size` is the number of neighbors (the item itself
/// included) an item needs within `max_neighbor_distance` to count as a
/// core item. With `min_cluster_size` of 1 every item would trivially be
/// its own cluster, so values below 2 are rejected.
///
/// ```
/// use metric_dbscan::{cluster_items, OUTLIER};
///
/// let readings = vec![0.0_f64, 1.0, 2.0, 10.0, 11.0, 12.0, 100.0];
/// let labels = cluster_items(&readings, &|a: &f64, b: &f64| (a - b).abs(), 2, 1.5).unwrap();
/// assert_eq!(labels, vec![0, 0, 0, 1, 1, 1, OUTLIER]);
/// ```
///
/// # Errors
/// [`DbscanError::InvalidParameter`] if `min_cluster_size < 2` or
/// `max_neighbor_distance` is negative or NaN;
/// [`DbscanError::InvalidMetric`] / [`DbscanError::MetricFailure`] if the
/// metric misbehaves or fails.
pub fn cluster_items<T, M>(
    items: &[T],
    metric: &M,
    min_cluster_size: usize,
    max_neighbor_distance: f64,
) -> Result<Vec<i32>, DbscanError>
where
    M: Metric<T>,
{
    cluster_items_with(
        items,
        metric,
        min_cluster_size,
        max_neighbor_distance,
        ClusterConfig::default(),
    )
}

/// [`cluster_items`] with explicit tuning, progress reporting, and
/// cancellation.
///
/// Two runs over identical inputs with the same seed produce identical
/// label vectors. An item reachable from core items of two different
/// clusters keeps the label of whichever cluster claims it first; that
/// asymmetry is inherent to DBSCAN.
pub fn cluster_items_with<T, M>(
    items: &[T],
    metric: &M,
    min_cluster_size: usize,
    max_neighbor_distance: f64,
    mut config: ClusterConfig<'_>,
) -> Result<Vec<i32>, DbscanError>
where
    M: Metric<T>,
{
    if min_cluster_size < 2 {
        return Err(DbscanError::InvalidParameter(format!(
            "minimum cluster size must be at least 2, got {min_cluster_size}"
        )));
    }
    if max_neighbor_distance.is_nan() || max_neighbor_distance < 0.0 {
        return Err(DbscanError::InvalidParameter(format!(
            "maximum neighbor distance must be non-negative, got {max_neighbor_distance}"
        )));
    }
    check_cancel(config.cancel)?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let tree = VpTree::build(
        items,
        metric,
        TreeConfig {
            bucket_size: config.bucket_size,
            seed: config.seed,
        },
    )?;

    let n = items.len();
    // None: not yet examined. Some(OUTLIER): examined, not core; may still
    // be absorbed as a border item. Some(c >= 0): claimed by cluster c.
    let mut labels: Vec<Option<i32>> = vec![None; n];
    // Guards against re-enqueueing during expansion of dense clusters.
    let mut queued = vec![false; n];
    let mut next_cluster: i32 = 0;

    for item in 0..n {
        check_cancel(config.cancel)?;

        if labels[item].is_none() {
            let neighbors = tree.neighbors_within(item, max_neighbor_distance)?;
            if neighbors.len() < min_cluster_size {
                labels[item] = Some(OUTLIER);
            } else {
                // Unlabeled core item: it seeds the next cluster.
                let cluster = next_cluster;
                next_cluster += 1;
                labels[item] = Some(cluster);
                queued[item] = true;

                let mut seeds: Vec<usize> = Vec::with_capacity(neighbors.len());
                for j in neighbors {
                    if j != item {
                        queued[j] = true;
                        seeds.push(j);
                    }
                }

                while let Some(j) = seeds.pop() {
                    match labels[j] {
                        Some(OUTLIER) => {
                            // Reachable from a core item after all: border,
                            // not noise. Border items never expand.
                            labels[j] = Some(cluster);
                        }
                        Some(_) => {
                            // Already claimed; the first cluster keeps it.
                        }
                        None => {
                            labels[j] = Some(cluster);
                            check_cancel(config.cancel)?;
                            let expansion =
                                tree.neighbors_within(j, max_neighbor_distance)?;
                            if expansion.len() >= min_cluster_size {
                                for x in expansion {
                                    if !queued[x] {
                                        queued[x] = true;
                                        seeds.push(x);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        report(&mut config.progress, item + 1, n);
    }

    tracing::debug!(
        items = n,
        clusters = next_cluster,
        metric_calls = tree.metric_calls(),
        "dbscan scan complete"
    );
    Ok(labels.into_iter().map(|l| l.unwrap_or(OUTLIER)).collect())
}

fn check_cancel(cancel: Option<&AtomicBool>) -> Result<(), DbscanError> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(DbscanError::Cancelled),
        _ => Ok(()),
    }
}

fn report(progress: &mut Option<&mut dyn FnMut(usize, usize)>, done: usize, total: usize) {
    if let Some(f) = progress {
        f(done, total);
    }
}
