//! Builds the final envelope, this time without any approximation.
//!
//! The simulations can be approximations up to this point (while exploring
//! the graph); this is where we transition to a precise simulation. The
//! envelope is built iteratively, by adding fixed time points (path offsets
//! where the train must arrive at a given time). We start with fixed points
//! only at scheduled stops, run a simulation, and on any conflict add a new
//! fixed time point at the conflict location, until a conflict-free solution
//! is found. A conflict at a location that already has a fixed point, or a
//! margin-distribution failure, aborts the loop and falls back to the linear
//! distribution.

use std::collections::BTreeSet;

use log::info;
use serde::Serialize;

use crate::error::Error;
use crate::sim::{
    AllowanceDistribution, AllowanceRange, AllowanceSimulator, Availability, BlockAvailability,
    EnvelopeProfile, SimulationError, StandardAllowance,
};
use crate::stdcm::edge::StdcmEdge;
use crate::stdcm::request::TrainStop;
use crate::{Distance, Time};

/// A hard timing constraint of the final simulation: the train must reach
/// `offset` at `time`. Identity is the offset alone, so the set never holds
/// two points at the same location.
#[derive(Debug, Clone)]
struct FixedTimePoint {
    /// Target time, relative to the departure time.
    time: Time,
    /// Travelled-path offset, in millimeters.
    offset: Distance,
    stop_duration: Option<Time>,
}

impl PartialEq for FixedTimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl Eq for FixedTimePoint {}

impl Ord for FixedTimePoint {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.offset.cmp(&other.offset)
    }
}

impl PartialOrd for FixedTimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Noteworthy decisions taken while refining the envelope, reported to the
/// caller in order of occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PostProcessingEvent {
    /// A conflict was found and a fixed time point was added near this
    /// travelled-path offset (in millimeters).
    ConflictFixedPoint { offset: Distance },
    /// A conflict happened at an offset that already carries a fixed time
    /// point; the loop cannot make progress.
    RepeatedConflict { offset: Distance },
    /// The margin distribution could not slow the train down enough to match
    /// the requested allowance.
    AllowanceConvergenceFailed,
    /// The physically-informed distribution failed; the whole refinement
    /// restarted with the linear distribution.
    LinearFallback,
}

/// Outcome of the refinement: the conflict-free envelope, the distribution
/// that produced it, and the events encountered on the way.
#[derive(Debug, Clone)]
pub struct FinalEnvelope<Env> {
    pub envelope: Env,
    pub distribution: AllowanceDistribution,
    pub events: Vec<PostProcessingEvent>,
}

/// Refines the max-speed envelope of the edge chain found by the search into
/// a conflict-free, allowance-applied envelope.
///
/// Tries the physically-informed distribution first; on failure the whole
/// fixed-point loop restarts from scratch with the linear distribution, and
/// a second failure is a hard scheduling error.
pub fn build_final_envelope<Env, S, A>(
    edges: &[StdcmEdge],
    max_speed_envelope: &Env,
    standard_allowance: Option<StandardAllowance>,
    simulator: &S,
    availability: &A,
    departure_time: Time,
    stops: &[TrainStop],
) -> Result<FinalEnvelope<Env>, Error>
where
    Env: EnvelopeProfile,
    S: AllowanceSimulator<Env>,
    A: BlockAvailability<Env>,
{
    if edges.is_empty() {
        return Err(Error::InvalidConfiguration(
            "final envelope requires a non-empty edge chain",
        ));
    }
    let path_length: Distance = edges.iter().map(|edge| edge.length).sum();
    let has_standard_allowance = standard_allowance.is_some_and(|allowance| {
        allowance.allowance_time(max_speed_envelope.total_time(), path_length as f64 / 1000.0)
            > 0.0
    });
    let mut events = Vec::new();

    let mut fixed_points =
        init_fixed_points(edges, stops, departure_time, path_length, has_standard_allowance);
    if let Some(envelope) = run_with_distribution(
        edges,
        max_speed_envelope,
        &mut fixed_points,
        simulator,
        availability,
        departure_time,
        stops,
        path_length,
        AllowanceDistribution::Mareco,
        &mut events,
    )? {
        return Ok(FinalEnvelope {
            envelope,
            distribution: AllowanceDistribution::Mareco,
            events,
        });
    }

    info!("failed to compute a mareco standard allowance, fallback to linear allowance");
    events.push(PostProcessingEvent::LinearFallback);
    // Full restart: resuming from the accumulated fixed points could change
    // which conflicts are found.
    let mut fixed_points =
        init_fixed_points(edges, stops, departure_time, path_length, has_standard_allowance);
    match run_with_distribution(
        edges,
        max_speed_envelope,
        &mut fixed_points,
        simulator,
        availability,
        departure_time,
        stops,
        path_length,
        AllowanceDistribution::Linear,
        &mut events,
    )? {
        Some(envelope) => Ok(FinalEnvelope {
            envelope,
            distribution: AllowanceDistribution::Linear,
            events,
        }),
        None => Err(Error::SchedulingInfeasible),
    }
}

/// Runs the fixed-point-insertion loop with one distribution. `Ok(None)`
/// means the loop is exhausted and the caller should fall back (or give up);
/// simulator failures other than convergence propagate as hard errors.
#[allow(clippy::too_many_arguments)]
fn run_with_distribution<Env, S, A>(
    edges: &[StdcmEdge],
    max_speed_envelope: &Env,
    fixed_points: &mut BTreeSet<FixedTimePoint>,
    simulator: &S,
    availability: &A,
    departure_time: Time,
    stops: &[TrainStop],
    path_length: Distance,
    distribution: AllowanceDistribution,
    events: &mut Vec<PostProcessingEvent>,
) -> Result<Option<Env>, Error>
where
    Env: EnvelopeProfile,
    S: AllowanceSimulator<Env>,
    A: BlockAvailability<Env>,
{
    // Bound against pathological conflict cycles.
    let max_iterations = edges.len() * 2;
    for _ in 0..max_iterations {
        let ranges = make_allowance_ranges(max_speed_envelope, fixed_points);
        let envelope = if ranges.is_empty() {
            max_speed_envelope.clone()
        } else {
            match simulator.apply(max_speed_envelope, distribution, &ranges) {
                Ok(envelope) => envelope,
                Err(SimulationError::AllowanceConvergence) => {
                    info!("can't slow down enough to match the given standard allowance");
                    events.push(PostProcessingEvent::AllowanceConvergenceFailed);
                    return Ok(None);
                }
                Err(other) => return Err(other.into()),
            }
        };
        let Some(conflict_offset) =
            find_conflict_offset(availability, edges, &envelope, stops, departure_time)
        else {
            return Ok(Some(envelope));
        };
        // The same point re-conflicting means we cannot make progress.
        if fixed_points.iter().any(|point| point.offset == conflict_offset) {
            events.push(PostProcessingEvent::RepeatedConflict {
                offset: conflict_offset,
            });
            return Ok(None);
        }
        info!(
            "conflict in the final simulation at offset {conflict_offset}, adding a fixed time point"
        );
        events.push(PostProcessingEvent::ConflictFixedPoint {
            offset: conflict_offset,
        });
        let point =
            make_fixed_point(fixed_points, edges, conflict_offset, departure_time, path_length, 0.0);
        fixed_points.insert(point);
    }
    Ok(None)
}

/// Seeds the fixed points: one per scheduled stop, plus one at the path end
/// when a standard allowance adds positive time (so the extra time is spread
/// over the whole path instead of vanishing).
fn init_fixed_points(
    edges: &[StdcmEdge],
    stops: &[TrainStop],
    departure_time: Time,
    path_length: Distance,
    has_standard_allowance: bool,
) -> BTreeSet<FixedTimePoint> {
    let mut res = BTreeSet::new();
    for stop in stops {
        let offset = (stop.position * 1000.0).round() as Distance;
        let point =
            make_fixed_point(&res, edges, offset, departure_time, path_length, stop.duration);
        res.insert(point);
    }
    if has_standard_allowance && res.iter().all(|point| point.offset != path_length) {
        let point = make_fixed_point(&res, edges, path_length, departure_time, path_length, 0.0);
        res.insert(point);
    }
    res
}

/// Creates a fixed point at an offset rounded to an edge transition. The
/// interpolated time of a mid-edge location is only an approximation of the
/// true simulation; committing to one risks speeding up into an occupied
/// block, while edge transition times are exact.
///
/// The offset is rounded to the end of the edge containing it; if a fixed
/// point already sits there, to the edge start; if both are taken (or the
/// start is the path origin), the literal conflict offset is kept.
fn make_fixed_point(
    fixed_points: &BTreeSet<FixedTimePoint>,
    edges: &[StdcmEdge],
    conflict_offset: Distance,
    departure_time: Time,
    path_length: Distance,
    stop_duration: Time,
) -> FixedTimePoint {
    let mut offset = round_offset(edges, conflict_offset.min(path_length), true);
    if fixed_points.iter().any(|point| point.offset == offset) {
        offset = round_offset(edges, conflict_offset, false);
    }
    if fixed_points.iter().any(|point| point.offset == offset) || offset == 0 {
        offset = conflict_offset;
    }
    offset = offset.min(path_length);
    FixedTimePoint {
        time: time_on_edges(edges, offset, departure_time),
        offset,
        stop_duration: (stop_duration > 0.0).then_some(stop_duration),
    }
}

/// Rounds an offset to the end (or start) of the edge containing it.
/// Offsets past the chain clamp to its end.
fn round_offset(edges: &[StdcmEdge], offset: Distance, round_to_end: bool) -> Distance {
    let mut prev_edges_length = 0;
    for edge in edges {
        if offset <= prev_edges_length + edge.length {
            return if round_to_end {
                prev_edges_length + edge.length
            } else {
                prev_edges_length
            };
        }
        prev_edges_length += edge.length;
    }
    prev_edges_length
}

/// Time expected during the exploration at the given offset, relative to the
/// train departure time. On a transition the later edge is the reference, as
/// it may include allowances unknown to the previous edge; unless that edge
/// ends at a stop, in which case the *arrival* time is wanted.
fn time_on_edges(edges: &[StdcmEdge], offset: Distance, departure_time: Time) -> Time {
    let last_shift = edges
        .last()
        .map_or(0.0, |edge| edge.total_departure_time_shift);
    let mut remaining_distance = offset;
    for edge in edges {
        let at_stop = edge.end_at_stop && remaining_distance == edge.length;
        if remaining_distance < edge.length || at_stop {
            let absolute_time = edge.approximate_time_at(remaining_distance);
            // Normalize to the departure shift of the full path.
            let time_with_shift =
                absolute_time - edge.total_departure_time_shift + last_shift;
            return time_with_shift - departure_time;
        }
        remaining_distance -= edge.length;
    }
    // End of the last edge.
    edges
        .last()
        .map_or(0.0, |edge| edge.approximate_time_at(edge.length))
        - departure_time
}

/// First conflict on the simulated trajectory, as a travelled-path offset.
fn find_conflict_offset<Env, A>(
    availability: &A,
    edges: &[StdcmEdge],
    envelope: &Env,
    stops: &[TrainStop],
    departure_time: Time,
) -> Option<Distance>
where
    Env: EnvelopeProfile,
    A: BlockAvailability<Env>,
{
    let start_offset = edges[0].envelope_start_offset;
    let end_offset = start_offset + edges.iter().map(|edge| edge.length).sum::<Distance>();
    match availability.check_availability(
        edges,
        envelope,
        stops,
        start_offset,
        end_offset,
        departure_time,
    ) {
        Availability::Available => None,
        Availability::Unavailable {
            first_conflict_offset,
        } => Some(first_conflict_offset),
    }
}

/// Builds the non-overlapping allowance ranges between consecutive fixed
/// points: each range is stretched by exactly the extra time needed for the
/// envelope to land on the point's target time, stop durations accounted
/// for between ranges.
fn make_allowance_ranges<Env: EnvelopeProfile>(
    envelope: &Env,
    fixed_points: &BTreeSet<FixedTimePoint>,
) -> Vec<AllowanceRange> {
    let mut transition = 0.0;
    let mut transition_time = 0.0;
    let mut prev_added_time = 0.0;
    let mut res = Vec::new();
    for point in fixed_points {
        let point_pos = point.offset as f64 / 1000.0;
        let base_time = envelope.time_at(point_pos) - envelope.time_at(transition);
        let point_arrival_time = transition_time + base_time;
        let needed_delay = f64::max(0.0, point.time - point_arrival_time - prev_added_time);

        res.push(AllowanceRange {
            begin_pos: transition,
            end_pos: point_pos,
            added_time: needed_delay,
        });
        prev_added_time += needed_delay;

        transition_time += base_time + point.stop_duration.unwrap_or(0.0);
        transition = point_pos;
    }
    if transition < envelope.end_pos() {
        res.push(AllowanceRange {
            begin_pos: transition,
            end_pos: envelope.end_pos(),
            added_time: 0.0,
        });
    }
    res
}
