//! Busplan - single-vehicle school bus route planning engine
//!
//! A depot dispatches one bus that collects a set of students and delivers
//! each to their assigned school before the bell, minimizing total travel
//! time. The engine estimates a travel-time matrix over a road network
//! (with off-graph retry and tail-segment speed correction), formulates
//! the visit ordering as a MILP with drop-off time windows, enumerates a
//! pool of solutions, and decodes each into an ordered stop list with a
//! clock schedule.
//!
//! The crate is a library: scenario state is passed in explicitly and
//! nothing is persisted between requests.

pub mod services;
pub mod types;

pub use services::route::{
    decode_solution, DecodeError, DecodedRoute, DropoffWindow, MilpSolver, RawSolution,
    RouteModel, RouteModelBuilder, RoutePlanner, RouteProblem, ScenarioConfig, School,
    SolvePool, SolveStatus, SolverAdapter, SolverConfig,
};
pub use services::routing::{
    DijkstraOracle, EstimatorConfig, MockRoutingService, NetworkRoutingService, OracleRoute,
    RoadEdge, RoadNetwork, RoadNode, RoutingService, ShortestPathOracle, TravelTimeEstimator,
    TravelTimeMatrix,
};
pub use types::{Coordinates, NodeKind, NodeLayout, PlannedRoute, RouteRequest};
