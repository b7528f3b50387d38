use std::time::Duration;

use crate::error::Error;
use crate::model::{EdgeLocation, EdgeRange, Graph, Range};
use crate::pathfinding::search::Pathfinder;
use crate::Distance;

/// Function giving the length of an edge.
pub type EdgeToLength<'a, E> = Box<dyn Fn(&E) -> Distance + 'a>;

/// A* estimator of the remaining cost from a location to the end of the
/// path. One estimator per waypoint group, indexed by how many groups have
/// been satisfied. Must never overestimate.
pub type AStarHeuristic<'a, E> = Box<dyn Fn(&E, Distance) -> f64 + 'a>;

/// Function listing, for one waypoint group, the target locations present on
/// a given edge.
pub type TargetsOnEdge<'a, E> = Box<dyn Fn(&E) -> Vec<EdgeLocation<E>> + 'a>;

/// Function listing the blocked ranges on an edge at search time. Several
/// providers can be combined; their union is blocked.
pub type BlockedRangesOnEdge<'a, E> = Box<dyn Fn(&E) -> Vec<Range> + 'a>;

/// How step costs are computed. Exactly one strategy is configured per
/// search.
pub enum CostModel<'a, E> {
    /// Cost of one edge range, added to the predecessor's accumulated cost.
    PerRange(Box<dyn Fn(&EdgeRange<E>) -> f64 + 'a>),
    /// Total cost from the path origin to a location. Required when costs
    /// cannot be decomposed additively per range, as in STDCM where the cost
    /// depends on the global departure shift.
    FromOrigin(Box<dyn Fn(&EdgeLocation<E>) -> f64 + 'a>),
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Configures a [`Pathfinder`]. Consumed by [`build`](Self::build), so a
/// half-configured instance cannot be reused.
pub struct PathfinderBuilder<'a, G: Graph> {
    graph: &'a G,
    edge_to_length: Option<EdgeToLength<'a, G::Edge>>,
    per_range_cost: Option<Box<dyn Fn(&EdgeRange<G::Edge>) -> f64 + 'a>>,
    total_cost: Option<Box<dyn Fn(&EdgeLocation<G::Edge>) -> f64 + 'a>>,
    blocked_ranges: Vec<BlockedRangesOnEdge<'a, G::Edge>>,
    estimators: Vec<AStarHeuristic<'a, G::Edge>>,
    timeout: Duration,
}

impl<'a, G: Graph> PathfinderBuilder<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            edge_to_length: None,
            per_range_cost: None,
            total_cost: None,
            blocked_ranges: Vec::new(),
            estimators: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the edge length function. Required.
    pub fn edge_to_length(mut self, f: impl Fn(&G::Edge) -> Distance + 'a) -> Self {
        self.edge_to_length = Some(Box::new(f));
        self
    }

    /// Sets an incremental per-range cost. Mutually exclusive with
    /// [`total_cost_from_origin`](Self::total_cost_from_origin).
    pub fn per_range_cost(mut self, f: impl Fn(&EdgeRange<G::Edge>) -> f64 + 'a) -> Self {
        self.per_range_cost = Some(Box::new(f));
        self
    }

    /// Sets a total cost function from the path origin to a location.
    /// Mutually exclusive with [`per_range_cost`](Self::per_range_cost).
    pub fn total_cost_from_origin(
        mut self,
        f: impl Fn(&EdgeLocation<G::Edge>) -> f64 + 'a,
    ) -> Self {
        self.total_cost = Some(Box::new(f));
        self
    }

    /// Adds a blocked-range provider. May be called several times; the union
    /// of all providers is blocked.
    pub fn blocked_ranges(mut self, f: impl Fn(&G::Edge) -> Vec<Range> + 'a) -> Self {
        self.blocked_ranges.push(Box::new(f));
        self
    }

    /// Sets the A* remaining-cost estimators, one per waypoint group. With no
    /// estimators the search degenerates to Dijkstra.
    pub fn remaining_cost_estimators(mut self, fs: Vec<AStarHeuristic<'a, G::Edge>>) -> Self {
        self.estimators = fs;
        self
    }

    /// Sets the wall-clock budget of the search. Defaults to 120 s.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Finalizes the configuration, checking it for consistency.
    pub fn build(self) -> Result<Pathfinder<'a, G>, Error> {
        let edge_to_length = self
            .edge_to_length
            .ok_or(Error::InvalidConfiguration("missing edge length function"))?;
        let cost = match (self.per_range_cost, self.total_cost) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidConfiguration(
                    "per-range and total cost functions are mutually exclusive",
                ));
            }
            (None, Some(f)) => CostModel::FromOrigin(f),
            (Some(f), None) => CostModel::PerRange(f),
            // Default: pure millimeter distance.
            (None, None) => CostModel::PerRange(Box::new(|range| range.length() as f64)),
        };
        Ok(Pathfinder {
            graph: self.graph,
            edge_to_length,
            cost,
            blocked_ranges: self.blocked_ranges,
            estimators: self.estimators,
            timeout: self.timeout,
        })
    }
}
