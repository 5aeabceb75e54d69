use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::DbscanError;
use crate::metric::{IndexedMetric, Metric};

/// Default seed for vantage selection.
pub const DEFAULT_SEED: u64 = 0x00DB_5CA0;

/// TreeConfig configures vantage point tree construction.
///
/// Neither field changes query results, only how the tree is shaped.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Maximum number of indices held in a leaf bucket. Must be positive.
    /// Default: 1.
    pub bucket_size: usize,
    /// Seed for the vantage selection generator. Builds with the same seed
    /// produce the same tree. Default: [`DEFAULT_SEED`].
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            bucket_size: 1,
            seed: DEFAULT_SEED,
        }
    }
}

impl TreeConfig {
    fn validate(&self) -> Result<(), DbscanError> {
        if self.bucket_size == 0 {
            return Err(DbscanError::InvalidParameter(
                "TreeConfig.bucket_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

enum Node {
    Leaf {
        bucket: Vec<u32>,
    },
    Split {
        vantage: u32,
        threshold: f64,
        inner: Option<Box<Node>>,
        outer: Option<Box<Node>>,
    },
}

/// Max-heap entry for nearest-neighbor searches: farthest candidate first.
struct Candidate {
    index: u32,
    dist: f64,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dist.total_cmp(&other.dist)
    }
}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.index == other.index
    }
}
impl Eq for Candidate {}

/// A vantage point tree over the caller's items.
///
/// The tree stores item positions only; items themselves are addressed by
/// their index in the slice passed to [`VpTree::build`] and are only ever
/// handed to the metric. No equality, hashing, or ordering of items is
/// assumed. Once built the tree is immutable and can be queried from
/// multiple threads.
///
/// Every split node holds a vantage index and the median distance from the
/// vantage to the rest of its subset; indices at most that far from the
/// vantage live in the inner child, the rest in the outer child. Radius
/// queries descend both children only when the triangle inequality says
/// the search ball can straddle the threshold.
pub struct VpTree<'a, T, M> {
    dist: IndexedMetric<'a, T, M>,
    root: Option<Box<Node>>,
}

impl<'a, T, M: Metric<T>> VpTree<'a, T, M> {
    /// Builds a tree over `items`.
    ///
    /// Construction evaluates the metric O(n log n) times in expectation.
    /// An empty slice builds an empty tree.
    ///
    /// # Errors
    /// [`DbscanError::InvalidParameter`] for a zero bucket size,
    /// [`DbscanError::InvalidMetric`] if the metric returns a negative,
    /// NaN, or infinite distance, [`DbscanError::MetricFailure`] if the
    /// metric itself fails.
    pub fn build(items: &'a [T], metric: &'a M, config: TreeConfig) -> Result<Self, DbscanError> {
        config.validate()?;
        let dist = IndexedMetric::new(items, metric);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let indices: Vec<u32> = (0..items.len() as u32).collect();
        let root = Self::build_node(&dist, indices, config.bucket_size, &mut rng)?;
        tracing::debug!(
            items = items.len(),
            metric_calls = dist.calls(),
            depth = node_depth(root.as_deref()),
            "built vantage point tree"
        );
        Ok(Self { dist, root })
    }

    fn build_node(
        dist: &IndexedMetric<'a, T, M>,
        mut subset: Vec<u32>,
        bucket_size: usize,
        rng: &mut StdRng,
    ) -> Result<Option<Box<Node>>, DbscanError> {
        if subset.is_empty() {
            return Ok(None);
        }
        if subset.len() <= bucket_size {
            return Ok(Some(Box::new(Node::Leaf { bucket: subset })));
        }

        let vantage = subset.swap_remove(rng.gen_range(0..subset.len()));

        // Scratch pairs of (index, distance to vantage). This is the only
        // place construction consults the metric.
        let mut scratch: Vec<(u32, f64)> = Vec::with_capacity(subset.len());
        for &x in &subset {
            scratch.push((x, dist.between(vantage as usize, x as usize)?));
        }

        let mid = (scratch.len() - 1) / 2;
        scratch.select_nth_unstable_by(mid, |a, b| a.1.total_cmp(&b.1));
        let threshold = scratch[mid].1;

        let mut inner = Vec::new();
        let mut outer = Vec::new();
        let mut tied = Vec::new();
        for (x, d) in scratch {
            if d < threshold {
                inner.push(x);
            } else if d > threshold {
                outer.push(x);
            } else {
                tied.push(x);
            }
        }

        if outer.is_empty() {
            // The median equals the maximum, so every index landed on or
            // below the threshold. Spill the largest tied indices outward
            // until the children are as balanced as the ties allow; both
            // sides then shrink strictly and recursion terminates even on
            // low-cardinality distance sets.
            tied.sort_unstable();
            let spill = ((inner.len() + tied.len()) / 2).clamp(1, tied.len());
            tracing::debug!(
                subset = inner.len() + tied.len() + 1,
                tied = tied.len(),
                spill,
                "threshold ties spilled to outer child"
            );
            outer.extend(tied.drain(tied.len() - spill..));
        }
        inner.extend(tied);

        let inner = Self::build_node(dist, inner, bucket_size, rng)?;
        let outer = Self::build_node(dist, outer, bucket_size, rng)?;
        Ok(Some(Box::new(Node::Split {
            vantage,
            threshold,
            inner,
            outer,
        })))
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.dist.len()
    }

    /// Returns true if the tree indexes no items.
    pub fn is_empty(&self) -> bool {
        self.dist.len() == 0
    }

    /// Number of metric evaluations performed so far, construction
    /// included.
    pub fn metric_calls(&self) -> u64 {
        self.dist.calls()
    }

    /// All indices within `radius` of the item at index `query`, the query
    /// itself included. The result is unordered and free of duplicates.
    ///
    /// With `radius` zero this returns the query plus every exact
    /// duplicate (distance zero, distinct index).
    ///
    /// # Errors
    /// [`DbscanError::InvalidParameter`] if `query` is out of bounds or
    /// `radius` is negative; metric errors propagate.
    pub fn neighbors_within(&self, query: usize, radius: f64) -> Result<Vec<usize>, DbscanError> {
        self.check_query(query)?;
        if radius.is_nan() || radius < 0.0 {
            return Err(DbscanError::InvalidParameter(format!(
                "search radius must be non-negative, got {radius}"
            )));
        }
        // The query belongs to the result at distance zero no matter how
        // the descent gets pruned, so it goes in up front; the traversal
        // below never pushes it again.
        let mut found = vec![query];
        self.radius_node(self.root.as_deref(), query, radius, &mut found)?;
        Ok(found)
    }

    fn radius_node(
        &self,
        node: Option<&Node>,
        query: usize,
        radius: f64,
        found: &mut Vec<usize>,
    ) -> Result<(), DbscanError> {
        let node = match node {
            Some(n) => n,
            None => return Ok(()),
        };
        match node {
            Node::Leaf { bucket } => {
                for &x in bucket {
                    let x = x as usize;
                    if x != query && self.dist.between(query, x)? <= radius {
                        found.push(x);
                    }
                }
            }
            Node::Split {
                vantage,
                threshold,
                inner,
                outer,
            } => {
                let v = *vantage as usize;
                let dv = if v == query {
                    0.0
                } else {
                    let d = self.dist.between(query, v)?;
                    if d <= radius {
                        found.push(v);
                    }
                    d
                };
                // Triangle inequality: the inner child only matters when
                // the ball reaches down to the threshold shell, the outer
                // child only when it reaches out to it. Both bounds are
                // inclusive: tie spilling can park indices exactly on the
                // threshold in either subtree.
                if dv - radius <= *threshold {
                    self.radius_node(inner.as_deref(), query, radius, found)?;
                }
                if dv + radius >= *threshold {
                    self.radius_node(outer.as_deref(), query, radius, found)?;
                }
            }
        }
        Ok(())
    }

    /// The `k` indices nearest to the item at `query`, the query itself
    /// excluded, sorted by ascending distance. Returns all other items
    /// when fewer than `k` exist. Ties for the last slot are resolved
    /// arbitrarily.
    pub fn k_nearest(&self, query: usize, k: usize) -> Result<Vec<(usize, f64)>, DbscanError> {
        self.check_query(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        self.knn_node(self.root.as_deref(), query, k, &mut heap)?;
        let mut hits: Vec<(usize, f64)> = heap
            .into_iter()
            .map(|c| (c.index as usize, c.dist))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(hits)
    }

    /// The single nearest neighbor of the item at `query`, or `None` when
    /// the tree holds no other item.
    pub fn nearest(&self, query: usize) -> Result<Option<(usize, f64)>, DbscanError> {
        Ok(self.k_nearest(query, 1)?.into_iter().next())
    }

    fn knn_node(
        &self,
        node: Option<&Node>,
        query: usize,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) -> Result<(), DbscanError> {
        let node = match node {
            Some(n) => n,
            None => return Ok(()),
        };
        match node {
            Node::Leaf { bucket } => {
                for &x in bucket {
                    if x as usize == query {
                        continue;
                    }
                    let d = self.dist.between(query, x as usize)?;
                    consider(heap, k, x, d);
                }
            }
            Node::Split {
                vantage,
                threshold,
                inner,
                outer,
            } => {
                let v = *vantage as usize;
                let dv = if v == query {
                    0.0
                } else {
                    let d = self.dist.between(query, v)?;
                    consider(heap, k, *vantage, d);
                    d
                };

                // Descend the side holding the query first so the bound
                // tightens before the other side is considered.
                let near_inner = dv <= *threshold;
                let (first, second) = if near_inner {
                    (inner, outer)
                } else {
                    (outer, inner)
                };
                self.knn_node(first.as_deref(), query, k, heap)?;

                let tau = if heap.len() >= k {
                    heap.peek().map_or(f64::INFINITY, |c| c.dist)
                } else {
                    f64::INFINITY
                };
                let overlaps = if near_inner {
                    dv + tau >= *threshold
                } else {
                    dv - tau <= *threshold
                };
                if overlaps {
                    self.knn_node(second.as_deref(), query, k, heap)?;
                }
            }
        }
        Ok(())
    }

    fn check_query(&self, query: usize) -> Result<(), DbscanError> {
        if query >= self.dist.len() {
            return Err(DbscanError::InvalidParameter(format!(
                "query index {query} out of bounds for {} items",
                self.dist.len()
            )));
        }
        Ok(())
    }
}

fn consider(heap: &mut BinaryHeap<Candidate>, k: usize, index: u32, dist: f64) {
    if heap.len() < k {
        heap.push(Candidate { index, dist });
    } else if let Some(farthest) = heap.peek() {
        if dist < farthest.dist {
            heap.pop();
            heap.push(Candidate { index, dist });
        }
    }
}

fn node_depth(node: Option<&Node>) -> usize {
    match node {
        None => 0,
        Some(Node::Leaf { .. }) => 1,
        Some(Node::Split { inner, outer, .. }) => {
            1 + node_depth(inner.as_deref()).max(node_depth(outer.as_deref()))
        }
    }
}
