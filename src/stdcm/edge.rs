use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::stdcm::request::StdcmStep;
use crate::{BlockId, Distance, Time};

/// Identity of one underlying block traversal in the infrastructure
/// explorer. Two edges with the same traversal id cover the same block
/// reached through the same route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraversalId(pub u64);

/// One traversal of one infrastructure block during the forward space-time
/// search, with the delay bookkeeping needed to avoid occupancy conflicts.
///
/// Identity (`Eq`/`Hash`) is deliberately coarse: (traversal,
/// minute-discretized entry time, envelope start offset). Comparing exact
/// times would make the reachable state space effectively infinite on a
/// continuous timeline; two traversals entering the same block in the same
/// calendar minute are the same search state.
#[derive(Clone)]
pub struct StdcmEdge {
    pub traversal: TraversalId,
    /// The block this edge covers.
    pub block: BlockId,
    /// Time at which the train enters the block.
    pub time_start: Time,
    /// Maximum delay that can still be added after this block by shifting
    /// the departure time, without causing conflicts.
    pub maximum_added_delay_after: Time,
    /// Delay added in this block to avoid conflicts, by shifting the
    /// departure time.
    pub added_delay: Time,
    /// Time of the next occupancy of the block, identifying the "opening"
    /// used by this edge.
    pub time_next_occupancy: Time,
    /// Total delay added by shifting the departure time since the start of
    /// the path.
    pub total_departure_time_shift: Time,
    /// Node at the start of this edge, `None` for the first edge.
    pub previous_node: Option<Rc<StdcmNode>>,
    /// Offset of the envelope when it does not start at the block start
    /// (e.g. after a stop mid-block).
    pub envelope_start_offset: Distance,
    /// `time_start` rounded *down* to the minute. Part of the identity; must
    /// equal [`StdcmEdge::minute_of`]`(time_start)`.
    pub minute_time_start: i64,
    /// Speed factor accounting for the standard allowance, e.g. 1/1.05 for
    /// a 5% allowance.
    pub standard_allowance_speed_factor: f64,
    /// Index of the last waypoint group passed on this path.
    pub waypoint_index: usize,
    /// True when the edge ends at a scheduled stop.
    pub end_at_stop: bool,
    /// Speed at the start of the edge, in m/s.
    pub begin_speed: f64,
    /// Speed at the end of the edge, in m/s.
    pub end_speed: f64,
    /// Edge length, in millimeters.
    pub length: Distance,
    /// Time to go from the start to the end of the edge, standard allowance
    /// included.
    pub total_time: Time,
    /// Cost from the origin plus remaining-time estimate, set by the
    /// expander when ordering candidate edges.
    pub weight: Option<f64>,
}

impl StdcmEdge {
    /// Minute-discretization of an entry time: always rounded down, so the
    /// dedup key stays consistent with real time ordering.
    pub fn minute_of(time: Time) -> i64 {
        (time / 60.0).floor() as i64
    }

    /// The node at the end of this edge. Any further waypoint group whose
    /// location lies within the traversed block range counts as passed; an
    /// edge ending at a scheduled stop yields a node carrying the stop
    /// duration and the post-stop offset.
    pub fn edge_end(&self, steps: &[StdcmStep]) -> StdcmNode {
        let mut new_waypoint_index = self.waypoint_index;
        while new_waypoint_index + 1 < steps.len() {
            let next_step = &steps[new_waypoint_index + 1];
            let end_offset = self.envelope_start_offset + self.length;
            let passed = next_step.locations.iter().any(|location| {
                location.block == self.block
                    && location.offset <= end_offset
                    && location.offset >= self.envelope_start_offset
            });
            if !passed {
                break;
            }
            new_waypoint_index += 1;
        }
        let previous_edge = Rc::new(self.clone());
        if !self.end_at_stop {
            // Moving on to the next block.
            StdcmNode {
                time: self.total_time + self.time_start,
                speed: self.end_speed,
                total_departure_time_shift: self.total_departure_time_shift,
                maximum_added_delay: self.maximum_added_delay_after,
                previous_edge,
                waypoint_index: new_waypoint_index,
                stop_offset: None,
                stop_duration: None,
            }
        } else {
            // The next edge continues on the same block, after the stop.
            let stop_duration = first_stop_after(steps, self.waypoint_index)
                .and_then(|step| step.duration)
                .unwrap_or(0.0);
            StdcmNode {
                time: self.total_time + self.time_start + stop_duration,
                speed: self.end_speed,
                total_departure_time_shift: self.total_departure_time_shift,
                maximum_added_delay: self.maximum_added_delay_after,
                previous_edge,
                waypoint_index: new_waypoint_index,
                stop_offset: Some(self.envelope_start_offset + self.length),
                stop_duration: Some(stop_duration),
            }
        }
    }

    /// Approximate time at an offset of the edge, by linear interpolation of
    /// the traversal time.
    pub fn approximate_time_at(&self, offset: Distance) -> Time {
        if self.length == 0 {
            return self.time_start;
        }
        let offset_ratio = offset as f64 / self.length as f64;
        self.time_start + self.total_time * offset_ratio
    }
}

/// First scheduled stop strictly after the given waypoint index.
pub(crate) fn first_stop_after(steps: &[StdcmStep], index: usize) -> Option<&StdcmStep> {
    steps.iter().skip(index + 1).find(|step| step.stop)
}

impl PartialEq for StdcmEdge {
    fn eq(&self, other: &Self) -> bool {
        self.traversal == other.traversal
            && self.minute_time_start == other.minute_time_start
            && self.envelope_start_offset == other.envelope_start_offset
    }
}

impl Eq for StdcmEdge {}

impl Hash for StdcmEdge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.traversal.hash(state);
        self.minute_time_start.hash(state);
        self.envelope_start_offset.hash(state);
    }
}

impl Ord for StdcmEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lowest weight first; equal weights prefer the most waypoint
        // groups passed.
        let weight = OrderedFloat(self.weight.unwrap_or(f64::INFINITY));
        let other_weight = OrderedFloat(other.weight.unwrap_or(f64::INFINITY));
        weight
            .cmp(&other_weight)
            .then_with(|| other.waypoint_index.cmp(&self.waypoint_index))
    }
}

impl PartialOrd for StdcmEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for StdcmEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdcmEdge")
            .field("block", &self.block)
            .field("time_start", &self.time_start)
            .field("envelope_start_offset", &self.envelope_start_offset)
            .finish()
    }
}

/// A point in space-time between two STDCM edges.
#[derive(Debug, Clone)]
pub struct StdcmNode {
    /// Time at which the train reaches this point, stop duration included.
    pub time: Time,
    /// Speed at this point, in m/s.
    pub speed: f64,
    /// Total departure-time shift accumulated so far.
    pub total_departure_time_shift: Time,
    /// Maximum delay that can still be added by shifting the departure.
    pub maximum_added_delay: Time,
    /// The edge leading to this node.
    pub previous_edge: Rc<StdcmEdge>,
    /// Index of the last waypoint group passed.
    pub waypoint_index: usize,
    /// Block offset the train departs from after a stop, if this node is a
    /// stop.
    pub stop_offset: Option<Distance>,
    pub stop_duration: Option<Time>,
}
