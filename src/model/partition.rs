use crate::base::GeometryStore;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Holds the identity of one worker within the process group
///
/// An explicit value passed into every component that needs it, fixed for the
/// lifetime of one model instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct PartitionContext {
    /// Zero-based worker id (worker 0 holds the leftmost slice)
    pub pid: usize,

    /// Number of workers
    pub np: usize,
}

impl PartitionContext {
    /// Allocates a new instance
    pub fn new(pid: usize, np: usize) -> Result<Self, StrError> {
        if np < 1 {
            return Err("the number of partitions must be at least 1");
        }
        if pid >= np {
            return Err("the partition id must be smaller than the number of partitions");
        }
        Ok(PartitionContext { pid, np })
    }

    /// Allocates the single-worker (serial) context
    pub fn serial() -> Self {
        PartitionContext { pid: 0, np: 1 }
    }

    /// Returns true if more than one worker participates
    pub fn is_parallel(&self) -> bool {
        self.np > 1
    }
}

impl fmt::Display for PartitionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {} of {}", self.pid, self.np)
    }
}

/// Holds the worker-visible node and element tag sets
///
/// The sets are views (tags into the arena), never copies of the records.
/// They are computed once by the partitioner and may only grow afterwards,
/// when constraint closure pulls in nodes from across the partition boundary.
#[derive(Clone, Debug, Default)]
pub struct WorkerSet {
    /// Visible node tags
    pub node_tags: HashSet<usize>,

    /// Visible element tags
    pub element_tags: HashSet<usize>,
}

impl WorkerSet {
    /// Returns the visible node tags sorted ascending
    pub fn node_tags_sorted(&self) -> Vec<usize> {
        let mut tags: Vec<_> = self.node_tags.iter().copied().collect();
        tags.sort();
        tags
    }

    /// Returns the visible element tags sorted ascending
    pub fn element_tags_sorted(&self) -> Vec<usize> {
        let mut tags: Vec<_> = self.element_tags.iter().copied().collect();
        tags.sort();
        tags
    }
}

/// Holds the contiguous x-interval owned by one worker
///
/// The split follows a cumulative-distribution matching rule over the node
/// x-coordinates, so workers receive approximately equal node counts rather
/// than equal lengths (mesh density is non-uniform). Intervals are closed at
/// both ends: adjacent workers intentionally share the boundary line of nodes.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Partition {
    /// Worker identity
    pub ctx: PartitionContext,

    /// Left edge of the interval
    pub xmin: f64,

    /// Right edge of the interval
    pub xmax: f64,
}

/// Returns the first x whose cumulative count fraction reaches the target
///
/// The histogram must be sorted by x ascending. Ties between the new and the
/// previous cumulative sum favor the previous (smaller) boundary coordinate.
fn x_at_fraction(histogram: &[(f64, usize)], fraction: f64) -> f64 {
    if fraction <= 0.0 {
        return histogram.first().unwrap().0;
    }
    if fraction >= 1.0 {
        return histogram.last().unwrap().0;
    }
    let total: usize = histogram.iter().map(|(_, count)| count).sum();
    let mut cumsum = 0.0;
    let mut x_previous = histogram.first().unwrap().0;
    for (x, count) in histogram {
        let cumsum_new = cumsum + *count as f64 / total as f64;
        if cumsum_new >= fraction {
            if f64::abs(cumsum_new - fraction) < f64::abs(cumsum - fraction) {
                return *x;
            }
            return x_previous;
        }
        cumsum = cumsum_new;
        x_previous = *x;
    }
    histogram.last().unwrap().0
}

impl Partition {
    /// Computes the x-interval for one worker
    ///
    /// The union of intervals over all workers covers the full mesh extent and
    /// the intervals are ordered by worker id.
    pub fn new(store: &GeometryStore, ctx: PartitionContext) -> Result<Self, StrError> {
        if store.nodes.is_empty() {
            return Err("cannot partition an empty node set");
        }
        if !ctx.is_parallel() {
            let (xmin, xmax) = store.x_extent()?;
            return Ok(Partition { ctx, xmin, xmax });
        }

        // frequency histogram of node x-coordinates, sorted ascending
        let mut counts = std::collections::HashMap::new();
        for node in store.nodes.values() {
            *counts.entry(node.x.to_bits()).or_insert(0_usize) += 1;
        }
        let mut histogram: Vec<(f64, usize)> = counts
            .into_iter()
            .map(|(bits, count)| (f64::from_bits(bits), count))
            .collect();
        histogram.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        let left_fraction = ctx.pid as f64 / ctx.np as f64;
        let right_fraction = (ctx.pid + 1) as f64 / ctx.np as f64;
        let xmin = x_at_fraction(&histogram, left_fraction);
        let xmax = x_at_fraction(&histogram, right_fraction);
        Ok(Partition { ctx, xmin, xmax })
    }

    /// Returns true if the coordinate falls in the (closed) interval
    pub fn contains(&self, x: f64) -> bool {
        self.xmin <= x && x <= self.xmax
    }

    /// Computes the worker-visible node and element sets
    ///
    /// A node is visible if its x falls in the closed interval. An element is
    /// visible if at least two of its nodes are; when two or three are, the
    /// missing nodes are pulled in as ghosts so that the element closes. The
    /// ghosts are intentionally duplicated on the two adjacent workers.
    pub fn select(&self, store: &GeometryStore) -> Result<WorkerSet, StrError> {
        let mut set = WorkerSet::default();
        if !self.ctx.is_parallel() {
            set.node_tags = store.nodes.keys().copied().collect();
            set.element_tags = store.elements.keys().copied().collect();
            return Ok(set);
        }

        // membership is decided against the interval node set, not the growing one
        let interval_tags: HashSet<usize> = store
            .nodes
            .values()
            .filter(|node| self.contains(node.x))
            .map(|node| node.tag)
            .collect();
        set.node_tags = interval_tags.clone();

        for element in store.elements.values() {
            let n_inside = element.nodes.iter().filter(|tag| interval_tags.contains(*tag)).count();
            match n_inside {
                0 | 1 => (),
                4 => {
                    set.element_tags.insert(element.tag);
                }
                2 | 3 => {
                    for tag in element.nodes {
                        if !interval_tags.contains(&tag) {
                            if !store.nodes.contains_key(&tag) {
                                log::error!("element {} references unknown node {}", element.tag, tag);
                                return Err("element references a node absent from the global registry");
                            }
                            set.node_tags.insert(tag);
                        }
                    }
                    set.element_tags.insert(element.tag);
                }
                _ => {
                    log::error!("element {} has {} nodes in the partition", element.tag, n_inside);
                    return Err("element boundary node count is not supported");
                }
            }
        }
        Ok(set)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: x ∈ [{:?}, {:?}]", self.ctx, self.xmin, self.xmax)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
