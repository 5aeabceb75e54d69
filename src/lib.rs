//! DBSCAN clustering for abstract metric spaces.
//!
//! Most DBSCAN implementations assume items are points in a vector space
//! so neighbor lookups can ride on a coordinate-indexed structure such as
//! a k-d tree. This crate assumes nothing about the items at all: the
//! only thing it ever does with them is call a distance function you
//! supply. Radius queries are served by a vantage point tree, which needs
//! nothing but the metric laws to prune its search.
//!
//! # Example
//!
//! ```rust
//! use metric_dbscan::{cluster_items, OUTLIER};
//!
//! // Sensor readings with one glitch.
//! let readings = vec![0.0_f64, 0.5, 1.0, 20.0, 20.5, 21.0, 500.0];
//! let labels = cluster_items(&readings, &|a: &f64, b: &f64| (a - b).abs(), 2, 1.5).unwrap();
//! assert_eq!(labels, vec![0, 0, 0, 1, 1, 1, OUTLIER]);
//! ```
//!
//! Items can be anything — strings under edit distance, audio
//! fingerprints under Hamming distance — as long as the distance function
//! behaves like a metric (see [`Metric`]). If your items are plain
//! Euclidean points, a coordinate-indexed implementation will beat this
//! one; this crate exists for the spaces those implementations cannot
//! index.
//!
//! The tree is usable on its own via [`VpTree`] for radius and exact
//! nearest-neighbor queries without running the clustering driver.

mod dbscan;
mod error;
mod metric;
#[cfg(test)]
mod testutil;
mod vptree;

pub use dbscan::{cluster_items, cluster_items_with, ClusterConfig, OUTLIER};
pub use error::{DbscanError, MetricError};
pub use metric::Metric;
pub use vptree::{TreeConfig, VpTree, DEFAULT_SEED};
