//! Travel-time estimation over a road network
//!
//! The production path snaps query points to an in-memory road graph and
//! runs shortest-path queries; a haversine-based mock stands in for tests
//! and for callers without a network.

mod estimator;
mod graph;
mod oracle;

pub use estimator::{EstimatorConfig, TravelTimeEstimator};
pub use graph::{RoadEdge, RoadEdgeId, RoadNetwork, RoadNode, RoadNodeId};
pub use oracle::{DijkstraOracle, OracleRoute, ShortestPathOracle};

use anyhow::{bail, Result};

use crate::services::geo::haversine_meters;
use crate::types::Coordinates;

/// Pairwise travel times in seconds
///
/// `seconds[i][j]` is the estimated travel time from location i to
/// location j. The matrix is asymmetric (directed road network) and the
/// diagonal is unused.
#[derive(Debug, Clone)]
pub struct TravelTimeMatrix {
    pub seconds: Vec<Vec<f64>>,
    pub size: usize,
}

impl TravelTimeMatrix {
    pub fn empty() -> Self {
        Self {
            seconds: vec![],
            size: 0,
        }
    }

    /// Wrap a square matrix of seconds
    pub fn from_seconds(seconds: Vec<Vec<f64>>) -> Result<Self> {
        let size = seconds.len();
        if seconds.iter().any(|row| row.len() != size) {
            bail!("travel-time matrix must be square");
        }
        Ok(Self { seconds, size })
    }

    /// Travel time from location i to location j in seconds
    pub fn time(&self, from: usize, to: usize) -> f64 {
        self.seconds[from][to]
    }

    /// Largest entry in the matrix, 0 for an empty one
    pub fn max_time(&self) -> f64 {
        self.seconds
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }
}

/// Routing seam: anything that can produce a travel-time matrix
pub trait RoutingService: Send + Sync {
    /// Travel-time matrix for a list of locations; the first location is
    /// the depot by convention.
    fn travel_times(&self, locations: &[Coordinates]) -> Result<TravelTimeMatrix>;

    /// Service name for logging
    fn name(&self) -> &str;
}

/// Mock routing service
///
/// Haversine distance scaled by a road coefficient and divided by an
/// average speed. Good enough for tests and solver-only callers.
pub struct MockRoutingService {
    /// Straight-line to road-distance coefficient
    road_coefficient: f64,
    /// Average speed in km/h
    average_speed_kmh: f64,
}

impl Default for MockRoutingService {
    fn default() -> Self {
        Self {
            road_coefficient: 1.3,
            average_speed_kmh: 40.0,
        }
    }
}

impl MockRoutingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(road_coefficient: f64, average_speed_kmh: f64) -> Self {
        Self {
            road_coefficient,
            average_speed_kmh,
        }
    }
}

impl RoutingService for MockRoutingService {
    fn travel_times(&self, locations: &[Coordinates]) -> Result<TravelTimeMatrix> {
        let n = locations.len();
        let mut seconds = vec![vec![0.0; n]; n];

        let speed_mps = self.average_speed_kmh / 3.6;
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let road_meters =
                        haversine_meters(&locations[i], &locations[j]) * self.road_coefficient;
                    seconds[i][j] = road_meters / speed_mps;
                }
            }
        }

        TravelTimeMatrix::from_seconds(seconds)
    }

    fn name(&self) -> &str {
        "MockRouting"
    }
}

/// Production routing service: a road network plus the estimator
pub struct NetworkRoutingService {
    network: RoadNetwork,
    estimator: TravelTimeEstimator,
}

impl NetworkRoutingService {
    pub fn new(network: RoadNetwork, config: EstimatorConfig) -> Self {
        Self {
            network,
            estimator: TravelTimeEstimator::new(config),
        }
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }
}

impl RoutingService for NetworkRoutingService {
    fn travel_times(&self, locations: &[Coordinates]) -> Result<TravelTimeMatrix> {
        self.estimator.estimate(&self.network, locations)
    }

    fn name(&self) -> &str {
        "RoadNetwork"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bed_stuy() -> Coordinates {
        Coordinates { lat: 40.6872, lng: -73.9418 }
    }

    fn williamsburg() -> Coordinates {
        Coordinates { lat: 40.7081, lng: -73.9571 }
    }

    fn bushwick() -> Coordinates {
        Coordinates { lat: 40.6944, lng: -73.9213 }
    }

    #[test]
    fn test_matrix_rejects_ragged_rows() {
        let result = TravelTimeMatrix::from_seconds(vec![vec![0.0, 1.0], vec![2.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_matrix_max_time() {
        let matrix = TravelTimeMatrix::from_seconds(vec![
            vec![0.0, 120.0, 45.0],
            vec![90.0, 0.0, 300.0],
            vec![60.0, 75.0, 0.0],
        ])
        .unwrap();

        assert!((matrix.max_time() - 300.0).abs() < 1e-9);
        assert!((TravelTimeMatrix::empty().max_time()).abs() < 1e-9);
    }

    #[test]
    fn test_mock_routing_empty_locations() {
        let service = MockRoutingService::new();
        let matrix = service.travel_times(&[]).unwrap();
        assert_eq!(matrix.size, 0);
    }

    #[test]
    fn test_mock_routing_diagonal_is_zero() {
        let service = MockRoutingService::new();
        let matrix = service
            .travel_times(&[bed_stuy(), williamsburg(), bushwick()])
            .unwrap();

        for i in 0..3 {
            assert!(matrix.time(i, i).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mock_routing_travel_time_reasonable() {
        let service = MockRoutingService::new();
        let matrix = service.travel_times(&[bed_stuy(), williamsburg()]).unwrap();

        // ~2.6 km straight line -> ~3.4 km road at 40 km/h is ~5 min
        let minutes = matrix.time(0, 1) / 60.0;
        assert!(
            (3.0..8.0).contains(&minutes),
            "expected a few minutes, got {minutes} min"
        );
        // mock is symmetric
        assert!((matrix.time(0, 1) - matrix.time(1, 0)).abs() < 1e-9);
    }

    #[test]
    fn test_mock_routing_custom_params_scale() {
        let slow = MockRoutingService::with_params(1.3, 20.0);
        let fast = MockRoutingService::with_params(1.3, 40.0);

        let locations = [bed_stuy(), bushwick()];
        let slow_time = slow.travel_times(&locations).unwrap().time(0, 1);
        let fast_time = fast.travel_times(&locations).unwrap().time(0, 1);

        assert!((slow_time / fast_time - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_network_routing_service() {
        let mut network = RoadNetwork::new();
        let a = network.add_node(bed_stuy());
        let b = network.add_node(williamsburg());
        network.add_edge_pair(a, b, 3000.0, 240.0).unwrap();

        let service = NetworkRoutingService::new(network, EstimatorConfig::default());
        let matrix = service
            .travel_times(&[bed_stuy(), williamsburg()])
            .unwrap();

        assert!((matrix.time(0, 1) - 240.0).abs() < 1e-6);
        assert_eq!(service.name(), "RoadNetwork");
    }
}
