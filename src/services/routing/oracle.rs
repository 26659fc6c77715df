//! Shortest-path oracle
//!
//! Resolves a coordinate pair against the road network: snap both ends,
//! run Dijkstra on travel time, and report the total route length
//! including the unsnapped tail stubs. Off-graph points and disconnected
//! pairs are failures the estimator handles with its retry policy.

use std::collections::BinaryHeap;

use anyhow::{anyhow, bail, Result};

use crate::types::Coordinates;

use super::graph::{RoadEdgeId, RoadNetwork, RoadNodeId};

/// A resolved shortest path between two query coordinates
#[derive(Debug, Clone)]
pub struct OracleRoute {
    /// Total route length in meters, including both tail stubs
    pub length_meters: f64,
    /// Travel time along the interior graph path in seconds
    pub time_seconds: f64,
    /// Interior node path, origin side first
    pub nodes: Vec<RoadNodeId>,
}

/// Shortest-path backend abstraction
pub trait ShortestPathOracle: Send + Sync {
    fn shortest_path(
        &self,
        network: &RoadNetwork,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<OracleRoute>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Dijkstra over the in-memory road network
#[derive(Debug, Clone)]
pub struct DijkstraOracle {
    /// Maximum snapping distance from a query point to the network, meters.
    /// Geocoded points can sit well off the carriageway, so the default is
    /// generous.
    pub snap_radius_meters: f64,
}

impl Default for DijkstraOracle {
    fn default() -> Self {
        Self {
            snap_radius_meters: 500.0,
        }
    }
}

impl DijkstraOracle {
    pub fn new(snap_radius_meters: f64) -> Self {
        Self { snap_radius_meters }
    }

    fn snap(&self, network: &RoadNetwork, point: &Coordinates) -> Result<(RoadNodeId, f64)> {
        let (node, distance) = network
            .nearest_node(point)
            .ok_or_else(|| anyhow!("road network has no nodes"))?;
        if distance > self.snap_radius_meters {
            bail!(
                "no road node within {:.0} m of ({:.6}, {:.6})",
                self.snap_radius_meters,
                point.lat,
                point.lng
            );
        }
        Ok((node, distance))
    }
}

impl ShortestPathOracle for DijkstraOracle {
    fn shortest_path(
        &self,
        network: &RoadNetwork,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<OracleRoute> {
        let (source, origin_tail) = self.snap(network, origin)?;
        let (target, destination_tail) = self.snap(network, destination)?;

        let path = dijkstra(network, source, target)
            .ok_or_else(|| anyhow!("no route between road nodes {source} and {target}"))?;

        Ok(OracleRoute {
            length_meters: origin_tail + path.length_meters + destination_tail,
            time_seconds: path.time_seconds,
            nodes: path.nodes,
        })
    }

    fn name(&self) -> &str {
        "Dijkstra"
    }
}

struct InteriorPath {
    nodes: Vec<RoadNodeId>,
    time_seconds: f64,
    length_meters: f64,
}

/// Heap entry ordered by cost ascending
struct HeapEntry {
    cost: f64,
    node: RoadNodeId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // reversed so the std max-heap pops the cheapest entry first
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

fn dijkstra(network: &RoadNetwork, source: RoadNodeId, target: RoadNodeId) -> Option<InteriorPath> {
    if source == target {
        return Some(InteriorPath {
            nodes: vec![source],
            time_seconds: 0.0,
            length_meters: 0.0,
        });
    }

    let n = network.node_count();
    let mut best = vec![f64::INFINITY; n];
    let mut prev_edge: Vec<Option<RoadEdgeId>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    best[source] = 0.0;
    heap.push(HeapEntry {
        cost: 0.0,
        node: source,
    });

    while let Some(HeapEntry { cost, node }) = heap.pop() {
        if node == target {
            break;
        }
        if cost > best[node] {
            continue;
        }

        for &edge_id in network.out_edges(node) {
            let edge = network.edge(edge_id)?;
            let next_cost = cost + edge.travel_time_seconds;
            if next_cost < best[edge.to] {
                best[edge.to] = next_cost;
                prev_edge[edge.to] = Some(edge_id);
                heap.push(HeapEntry {
                    cost: next_cost,
                    node: edge.to,
                });
            }
        }
    }

    if best[target].is_infinite() {
        return None;
    }

    // walk predecessor edges back to the source
    let mut nodes = vec![target];
    let mut length_meters = 0.0;
    let mut current = target;
    while current != source {
        let edge = network.edge(prev_edge[current]?)?;
        length_meters += edge.length_meters;
        current = edge.from;
        nodes.push(current);
    }
    nodes.reverse();

    Some(InteriorPath {
        nodes,
        time_seconds: best[target],
        length_meters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinates {
        Coordinates { lat, lng }
    }

    /// Line of four nodes ~1 km apart: 0 - 1 - 2 - 3, plus a slow shortcut
    /// edge 0 -> 3.
    fn line_network() -> RoadNetwork {
        let mut network = RoadNetwork::new();
        let a = network.add_node(coord(40.6620, -73.9610));
        let b = network.add_node(coord(40.6710, -73.9610));
        let c = network.add_node(coord(40.6800, -73.9610));
        let d = network.add_node(coord(40.6890, -73.9610));
        network.add_edge_pair(a, b, 1000.0, 60.0).unwrap();
        network.add_edge_pair(b, c, 1000.0, 60.0).unwrap();
        network.add_edge_pair(c, d, 1000.0, 60.0).unwrap();
        // direct but slow
        network.add_edge(a, d, 3100.0, 600.0).unwrap();
        network
    }

    #[test]
    fn test_dijkstra_prefers_faster_multi_hop_path() {
        let network = line_network();
        let path = dijkstra(&network, 0, 3).unwrap();

        assert_eq!(path.nodes, vec![0, 1, 2, 3]);
        assert!((path.time_seconds - 180.0).abs() < 1e-9);
        assert!((path.length_meters - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_dijkstra_no_route() {
        let mut network = line_network();
        let island = network.add_node(coord(40.7500, -73.9000));
        assert!(dijkstra(&network, 0, island).is_none());
    }

    #[test]
    fn test_oracle_at_node_coordinates_has_no_tail() {
        let network = line_network();
        let oracle = DijkstraOracle::default();

        let route = oracle
            .shortest_path(&network, &coord(40.6620, -73.9610), &coord(40.6890, -73.9610))
            .unwrap();

        assert!((route.time_seconds - 180.0).abs() < 1e-9);
        assert!((route.length_meters - 3000.0).abs() < 1e-6);
        assert_eq!(route.nodes.len(), 4);
    }

    #[test]
    fn test_oracle_includes_tail_stubs_in_length() {
        let network = line_network();
        let oracle = DijkstraOracle::default();

        // ~100 m east of node 0
        let origin = coord(40.6620, -73.9598);
        let route = oracle
            .shortest_path(&network, &origin, &coord(40.6890, -73.9610))
            .unwrap();

        assert!(route.length_meters > 3050.0, "length {}", route.length_meters);
        assert!(route.length_meters < 3200.0, "length {}", route.length_meters);
    }

    #[test]
    fn test_oracle_rejects_point_outside_snap_radius() {
        let network = line_network();
        let oracle = DijkstraOracle::new(100.0);

        // several km away from every node
        let far = coord(40.7500, -73.8500);
        let result = oracle.shortest_path(&network, &far, &coord(40.6890, -73.9610));
        assert!(result.is_err());
    }

    #[test]
    fn test_oracle_fails_on_empty_network() {
        let network = RoadNetwork::new();
        let oracle = DijkstraOracle::default();
        let result =
            oracle.shortest_path(&network, &coord(40.0, -73.0), &coord(40.1, -73.1));
        assert!(result.is_err());
    }
}
