//! Travel-time matrix estimation
//!
//! Computes the full pairwise travel-time matrix over a road network.
//! Query points that fail to resolve are retried with a bounded,
//! deterministic coordinate perturbation; a pair that stays unresolved is
//! recorded with a large sentinel instead of failing the whole matrix.

use anyhow::{bail, Result};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::types::Coordinates;

use super::graph::{RoadEdge, RoadNetwork};
use super::oracle::{DijkstraOracle, OracleRoute, ShortestPathOracle};
use super::TravelTimeMatrix;

/// Tail lengths below this are treated as exactly snapped
const TAIL_EPSILON_METERS: f64 = 1e-6;

/// Travel-time estimator configuration
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Perturbation step in degrees applied to off-graph query points
    pub perturbation_degrees: f64,
    /// Retry budget per pair; the perturbation direction reverses and the
    /// probe resets to the original coordinate halfway through
    pub max_retries: u32,
    /// Travel time recorded for pairs with no route, seconds
    pub unreachable_sentinel_seconds: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            perturbation_degrees: 1e-4,
            max_retries: 20,
            unreachable_sentinel_seconds: 1_000_000.0,
        }
    }
}

/// Pairwise travel-time estimator backed by a shortest-path oracle
pub struct TravelTimeEstimator {
    oracle: Box<dyn ShortestPathOracle>,
    config: EstimatorConfig,
}

impl TravelTimeEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            oracle: Box::new(DijkstraOracle::default()),
            config,
        }
    }

    pub fn with_oracle(oracle: Box<dyn ShortestPathOracle>, config: EstimatorConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate travel times between every ordered pair of locations
    pub fn estimate(
        &self,
        network: &RoadNetwork,
        locations: &[Coordinates],
    ) -> Result<TravelTimeMatrix> {
        self.estimate_with_loading(network, locations, None)
    }

    /// Like [`estimate`](Self::estimate), with `loading_seconds[j]` added
    /// to every entry whose destination is node j (boarding/offload time).
    pub fn estimate_with_loading(
        &self,
        network: &RoadNetwork,
        locations: &[Coordinates],
        loading_seconds: Option<&[f64]>,
    ) -> Result<TravelTimeMatrix> {
        let n = locations.len();
        if n == 0 {
            return Ok(TravelTimeMatrix::empty());
        }
        if let Some(loading) = loading_seconds {
            if loading.len() != n {
                bail!(
                    "expected {} loading times, got {}",
                    n,
                    loading.len()
                );
            }
        }

        debug!("estimating travel times for {} locations", n);

        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .collect();

        // pairs are independent; each writes a disjoint cell
        let computed: Vec<((usize, usize), f64)> = pairs
            .par_iter()
            .map(|&(i, j)| {
                let seconds = self.pair_seconds(network, &locations[i], &locations[j]);
                ((i, j), seconds)
            })
            .collect();

        let mut seconds = vec![vec![0.0; n]; n];
        for ((i, j), value) in computed {
            seconds[i][j] = value;
            if let Some(loading) = loading_seconds {
                seconds[i][j] += loading[j];
            }
        }

        debug!("travel-time matrix complete: {}x{}", n, n);
        TravelTimeMatrix::from_seconds(seconds)
    }

    fn pair_seconds(
        &self,
        network: &RoadNetwork,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> f64 {
        match self.query_with_retry(network, origin, destination) {
            Some(route) => self.route_seconds(network, &route, origin, destination),
            None => {
                warn!(
                    "no route from ({:.6}, {:.6}) to ({:.6}, {:.6}) after {} retries; using sentinel",
                    origin.lat,
                    origin.lng,
                    destination.lat,
                    destination.lng,
                    self.config.max_retries
                );
                self.config.unreachable_sentinel_seconds
            }
        }
    }

    /// Bounded deterministic perturbation search. On failure the probe is
    /// nudged alternately along the latitude and longitude axis; halfway
    /// through the budget the step is negated and the probe resets to the
    /// original coordinate.
    fn query_with_retry(
        &self,
        network: &RoadNetwork,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Option<OracleRoute> {
        let mut step = self.config.perturbation_degrees;
        let mut probe = *origin;
        let mut attempt: u32 = 0;

        loop {
            match self.oracle.shortest_path(network, &probe, destination) {
                Ok(route) => return Some(route),
                Err(err) => {
                    if attempt == self.config.max_retries {
                        debug!("shortest-path retries exhausted: {err}");
                        return None;
                    }
                    if attempt == self.config.max_retries / 2 {
                        step = -step;
                        probe = *origin;
                    }
                    if attempt % 2 == 0 {
                        probe.lat += step;
                    } else {
                        probe.lng += step;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Interior time plus the tail-segment correction: the tail length is
    /// whatever the oracle's total exceeds the interior edges, and it is
    /// traversed at the mean speed of the edges nearest each query point.
    fn route_seconds(
        &self,
        network: &RoadNetwork,
        route: &OracleRoute,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> f64 {
        let interior_length = interior_length_meters(network, &route.nodes);
        let tail_length = (route.length_meters - interior_length).max(0.0);
        if tail_length < TAIL_EPSILON_METERS {
            return route.time_seconds;
        }

        let speeds: Vec<f64> = [origin, destination]
            .into_iter()
            .filter_map(|point| {
                network
                    .nearest_edge(point)
                    .and_then(|id| network.edge(id))
                    .map(RoadEdge::speed)
            })
            .collect();

        let tail_speed = if speeds.is_empty() {
            match network.mean_edge_speed() {
                Some(speed) => speed,
                None => return route.time_seconds,
            }
        } else {
            speeds.iter().sum::<f64>() / speeds.len() as f64
        };

        route.time_seconds + tail_length / tail_speed
    }
}

/// Sum of edge lengths along a node path
fn interior_length_meters(network: &RoadNetwork, nodes: &[usize]) -> f64 {
    nodes
        .windows(2)
        .filter_map(|pair| network.edge_between(pair[0], pair[1]))
        .map(|edge| edge.length_meters)
        .sum()
}
