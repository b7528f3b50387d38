pub use crate::error::Error;

// Generic pathfinding
pub use crate::model::{EdgeLocation, EdgeRange, Graph, Range};
pub use crate::pathfinding::{CostModel, Path, Pathfinder, PathfinderBuilder};

// STDCM
pub use crate::stdcm::edge::{StdcmEdge, StdcmNode, TraversalId};
pub use crate::stdcm::graph::{SpaceTimeExpander, StdcmGraph};
pub use crate::stdcm::heuristic::make_stdcm_heuristics;
pub use crate::stdcm::infra::{BlockGraph, RunningTimeModel};
pub use crate::stdcm::post_processing::{
    FinalEnvelope, PostProcessingEvent, build_final_envelope,
};
pub use crate::stdcm::request::{BlockLocation, StdcmStep, TrainStop};

// Simulation collaborator contracts
pub use crate::sim::{
    AllowanceDistribution, AllowanceRange, Availability, BlockAvailability, EnvelopeProfile,
    SimulationError, StandardAllowance,
};

// Base units
pub use crate::{BlockId, DetectorId, Distance, Time};
