use crate::Distance;

/// A point on an edge: edge + offset from the edge start.
/// Used for the inputs of the pathfinding (starts and waypoints).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeLocation<E> {
    pub edge: E,
    pub offset: Distance,
}

impl<E> EdgeLocation<E> {
    pub fn new(edge: E, offset: Distance) -> Self {
        Self { edge, offset }
    }
}

/// A sub-segment of an edge: edge + start and end offsets, `start <= end`.
/// Used for the output of the pathfinding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeRange<E> {
    pub edge: E,
    pub start: Distance,
    pub end: Distance,
}

impl<E> EdgeRange<E> {
    pub fn new(edge: E, start: Distance, end: Distance) -> Self {
        debug_assert!(start <= end);
        Self { edge, start, end }
    }

    pub fn length(&self) -> Distance {
        self.end - self.start
    }
}

/// A plain offset range with no edge attached, used to report blocked
/// sub-segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Distance,
    pub end: Distance,
}

impl Range {
    pub fn new(start: Distance, end: Distance) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }
}
