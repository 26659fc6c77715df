//! Route optimization
//!
//! One bus, many students, a handful of schools with bell times: the
//! planner formulates the visit ordering as a MILP, enumerates a pool of
//! solutions, and decodes each into an ordered stop list with a clock
//! schedule.

mod config;
mod model;
mod problem;
mod solution;
mod solver;

pub use config::{DropoffWindow, ScenarioConfig, SolverConfig};
pub use model::{RouteModel, RouteModelBuilder};
pub use problem::{RouteProblem, School};
pub use solution::{decode_solution, DecodeError, DecodedRoute};
pub use solver::{MilpSolver, RawSolution, SolvePool, SolveStatus, SolverAdapter};

use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::services::routing::TravelTimeMatrix;
use crate::types::{PlannedRoute, RouteRequest};

/// Route planner: scenario configuration plus a solver backend
pub struct RoutePlanner {
    scenario: ScenarioConfig,
    solver: Box<dyn SolverAdapter>,
}

impl RoutePlanner {
    pub fn new(scenario: ScenarioConfig, solver_config: SolverConfig) -> Self {
        Self {
            scenario,
            solver: Box::new(MilpSolver::new(solver_config)),
        }
    }

    /// Swap in a different solver backend
    pub fn with_adapter(scenario: ScenarioConfig, adapter: Box<dyn SolverAdapter>) -> Self {
        Self {
            scenario,
            solver: adapter,
        }
    }

    /// Plan routes for a problem against a precomputed travel-time matrix.
    ///
    /// An infeasible or unbounded model yields an empty list: that is the
    /// expected outcome for over-constrained scenarios, not a fault.
    pub fn plan(
        &self,
        problem: &RouteProblem,
        travel_times: &TravelTimeMatrix,
    ) -> Result<Vec<DecodedRoute>> {
        let started = Instant::now();

        problem.validate()?;
        self.scenario.validate()?;
        if travel_times.size != problem.node_count() {
            bail!(
                "travel-time matrix is {}x{} but the problem has {} nodes",
                travel_times.size,
                travel_times.size,
                problem.node_count()
            );
        }

        info!(
            "planning route for {} students and {} schools",
            problem.students.len(),
            problem.schools.len()
        );

        let windows = self.scenario.windows_for(&problem.start_times());
        let builder = RouteModelBuilder::new(
            problem.layout(),
            travel_times.clone(),
            problem.assignments.clone(),
            windows,
            self.scenario.earliest_departure_seconds(),
            self.scenario.departure_weight,
        )?;

        let pool = self.solver.optimize(&builder, problem.max_routes)?;
        match pool.status {
            SolveStatus::Infeasible => {
                warn!("route model is infeasible; returning no routes");
                return Ok(vec![]);
            }
            SolveStatus::Unbounded => {
                warn!("route model is unbounded; returning no routes");
                return Ok(vec![]);
            }
            SolveStatus::Optimal => {}
        }

        let coordinates = problem.coordinates();
        let routes: Vec<DecodedRoute> = pool
            .solutions
            .iter()
            .map(|raw| decode_solution(raw, &coordinates))
            .collect::<Result<_, _>>()
            .context("solver returned an inconsistent solution")?;

        info!(
            "planned {} route(s) in {} ms",
            routes.len(),
            started.elapsed().as_millis()
        );
        Ok(routes)
    }

    /// Request-level entry point: validate the wire request, plan, and
    /// render schedules as HH:MM:SS strings.
    pub fn plan_request(&self, request: &RouteRequest) -> Result<Vec<PlannedRoute>> {
        let problem = RouteProblem::from_request(request)?;
        let matrix = TravelTimeMatrix::from_seconds(request.travel_times.clone())?;

        let routes = self.plan(&problem, &matrix)?;
        Ok(routes
            .into_iter()
            .map(|route| PlannedRoute {
                schedule: route.schedule_strings(),
                route: route.stops,
            })
            .collect())
    }
}

impl Default for RoutePlanner {
    fn default() -> Self {
        Self::new(ScenarioConfig::default(), SolverConfig::default())
    }
}
