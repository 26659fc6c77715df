//! MILP solve and solution-pool enumeration
//!
//! The backend seam is a trait so callers can swap the solver; the default
//! implementation drives `good_lp` and enumerates the pool by re-solving
//! with an exclusion cut over the previous solution's active edges, so
//! each successive solution is optimal among those remaining.

use std::time::Instant;

use anyhow::{bail, Context, Result};
use good_lp::{constraint, default_solver, Expression, ResolutionError, Solution, SolverModel};
use tracing::{debug, info};

use super::config::SolverConfig;
use super::model::{RouteModel, RouteModelBuilder};

/// Binary variables above this are treated as set
const BINARY_THRESHOLD: f64 = 0.5;

/// Terminal condition of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
}

/// Raw variable assignment for one pooled solution
#[derive(Debug, Clone)]
pub struct RawSolution {
    /// X cube values, flattened like [`RouteModel::x`]
    pub x: Vec<f64>,
    /// Y values for non-depot nodes, index node - 1
    pub y: Vec<f64>,
    /// K values for every node, seconds of day
    pub k: Vec<f64>,
    pub objective: f64,
}

impl RawSolution {
    /// Indices (i, j, o) of the active edges
    pub fn used_edges(&self, n: usize) -> Vec<(usize, usize, usize)> {
        let mut edges = Vec::new();
        for i in 0..n {
            for j in 0..n {
                for o in 0..n {
                    if self.x[RouteModel::x_index(n, i, j, o)] > BINARY_THRESHOLD {
                        edges.push((i, j, o));
                    }
                }
            }
        }
        edges
    }
}

/// Pool of solutions ordered by objective value
#[derive(Debug)]
pub struct SolvePool {
    pub status: SolveStatus,
    pub solutions: Vec<RawSolution>,
}

/// Generic MILP solve-and-enumerate seam
pub trait SolverAdapter: Send + Sync {
    /// Solve the model and enumerate up to `pool_size` solutions ordered
    /// by objective value. Fewer solutions than requested is not an error.
    fn optimize(&self, builder: &RouteModelBuilder, pool_size: usize) -> Result<SolvePool>;
}

enum SolveOutcome {
    Solved(RawSolution),
    Infeasible,
    Unbounded,
}

/// `good_lp`-backed solver adapter
pub struct MilpSolver {
    config: SolverConfig,
}

impl MilpSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    fn solve_once(&self, model: RouteModel, cuts: &[Vec<usize>]) -> Result<SolveOutcome> {
        let RouteModel {
            vars,
            x,
            y,
            k,
            constraints,
            objective,
            n: _,
        } = model;

        let objective_expr = objective.clone();
        let mut problem = vars.minimise(objective).using(default_solver);
        for c in constraints {
            problem = problem.with(c);
        }
        for cut in cuts {
            // forbid re-selecting a previously returned edge set
            let reused = cut
                .iter()
                .fold(Expression::from(0.0), |acc, &index| acc + x[index]);
            let limit = cut.len() as f64 - 1.0;
            problem = problem.with(constraint!(reused <= limit));
        }

        match problem.solve() {
            Ok(solution) => {
                let raw = RawSolution {
                    x: x.iter().map(|&v| solution.value(v)).collect(),
                    y: y.iter().map(|&v| solution.value(v)).collect(),
                    k: k.iter().map(|&v| solution.value(v)).collect(),
                    objective: solution.eval(&objective_expr),
                };
                Ok(SolveOutcome::Solved(raw))
            }
            Err(ResolutionError::Infeasible) => Ok(SolveOutcome::Infeasible),
            Err(ResolutionError::Unbounded) => Ok(SolveOutcome::Unbounded),
            Err(other) => Err(other).context("MILP solve failed"),
        }
    }
}

impl SolverAdapter for MilpSolver {
    fn optimize(&self, builder: &RouteModelBuilder, pool_size: usize) -> Result<SolvePool> {
        if pool_size == 0 {
            bail!("pool size must be at least 1");
        }
        if let Some(limit) = self.config.max_time_seconds {
            // the default backend has no deadline parameter; the cap is
            // recorded for backends that do
            debug!("solver time limit requested: {limit}s");
        }

        let started = Instant::now();
        let n = builder.layout().len();
        let mut solutions: Vec<RawSolution> = Vec::new();
        let mut cuts: Vec<Vec<usize>> = Vec::new();

        for round in 0..pool_size {
            let model = builder.build();
            match self.solve_once(model, &cuts)? {
                SolveOutcome::Solved(raw) => {
                    let cut = raw
                        .used_edges(n)
                        .iter()
                        .map(|&(i, j, o)| RouteModel::x_index(n, i, j, o))
                        .collect();
                    cuts.push(cut);
                    solutions.push(raw);
                }
                SolveOutcome::Infeasible if round == 0 => {
                    return Ok(SolvePool {
                        status: SolveStatus::Infeasible,
                        solutions,
                    });
                }
                SolveOutcome::Infeasible => {
                    debug!("solution pool exhausted after {} solutions", solutions.len());
                    break;
                }
                SolveOutcome::Unbounded if round == 0 => {
                    return Ok(SolvePool {
                        status: SolveStatus::Unbounded,
                        solutions,
                    });
                }
                SolveOutcome::Unbounded => {
                    bail!("solver reported unbounded after {} solutions", solutions.len());
                }
            }
        }

        info!(
            "enumerated {} solution(s) in {} ms",
            solutions.len(),
            started.elapsed().as_millis()
        );
        Ok(SolvePool {
            status: SolveStatus::Optimal,
            solutions,
        })
    }
}
