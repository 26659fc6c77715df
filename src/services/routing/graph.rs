//! In-memory road network
//!
//! Directed graph with per-edge length and travel-time attributes. Query
//! coordinates are snapped to the nearest node; the snap distance is
//! reported so callers can enforce a radius and account for the unsnapped
//! stub.

use anyhow::{bail, Result};

use crate::services::geo::haversine_meters;
use crate::types::Coordinates;

/// Node handle into a [`RoadNetwork`]
pub type RoadNodeId = usize;
/// Edge handle into a [`RoadNetwork`]
pub type RoadEdgeId = usize;

#[derive(Debug, Clone)]
pub struct RoadNode {
    pub coordinates: Coordinates,
}

/// Directed edge with precomputed length and travel time
#[derive(Debug, Clone)]
pub struct RoadEdge {
    pub from: RoadNodeId,
    pub to: RoadNodeId,
    pub length_meters: f64,
    pub travel_time_seconds: f64,
}

impl RoadEdge {
    /// Average speed over the edge in meters per second
    pub fn speed(&self) -> f64 {
        self.length_meters / self.travel_time_seconds
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    nodes: Vec<RoadNode>,
    edges: Vec<RoadEdge>,
    /// Outgoing edge ids per node
    out_edges: Vec<Vec<RoadEdgeId>>,
    /// Edge ids touching each node, either direction
    incident: Vec<Vec<RoadEdgeId>>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, coordinates: Coordinates) -> RoadNodeId {
        self.nodes.push(RoadNode { coordinates });
        self.out_edges.push(Vec::new());
        self.incident.push(Vec::new());
        self.nodes.len() - 1
    }

    pub fn add_edge(
        &mut self,
        from: RoadNodeId,
        to: RoadNodeId,
        length_meters: f64,
        travel_time_seconds: f64,
    ) -> Result<RoadEdgeId> {
        if from >= self.nodes.len() || to >= self.nodes.len() {
            bail!("edge {from}->{to} references a missing node");
        }
        if length_meters < 0.0 {
            bail!("edge {from}->{to} has negative length");
        }
        if travel_time_seconds <= 0.0 {
            bail!("edge {from}->{to} has non-positive travel time");
        }

        let id = self.edges.len();
        self.edges.push(RoadEdge {
            from,
            to,
            length_meters,
            travel_time_seconds,
        });
        self.out_edges[from].push(id);
        self.incident[from].push(id);
        if to != from {
            self.incident[to].push(id);
        }
        Ok(id)
    }

    /// Add both directions with the same attributes
    pub fn add_edge_pair(
        &mut self,
        a: RoadNodeId,
        b: RoadNodeId,
        length_meters: f64,
        travel_time_seconds: f64,
    ) -> Result<(RoadEdgeId, RoadEdgeId)> {
        let forward = self.add_edge(a, b, length_meters, travel_time_seconds)?;
        let backward = self.add_edge(b, a, length_meters, travel_time_seconds)?;
        Ok((forward, backward))
    }

    pub fn node(&self, id: RoadNodeId) -> Option<&RoadNode> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: RoadEdgeId) -> Option<&RoadEdge> {
        self.edges.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn out_edges(&self, node: RoadNodeId) -> &[RoadEdgeId] {
        &self.out_edges[node]
    }

    /// Nearest node to a point and its distance in meters
    pub fn nearest_node(&self, point: &Coordinates) -> Option<(RoadNodeId, f64)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(id, node)| (id, haversine_meters(point, &node.coordinates)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Nearest edge to a point, by closest endpoint
    pub fn nearest_edge(&self, point: &Coordinates) -> Option<RoadEdgeId> {
        self.edges
            .iter()
            .enumerate()
            .map(|(id, edge)| {
                let from = &self.nodes[edge.from].coordinates;
                let to = &self.nodes[edge.to].coordinates;
                let dist = haversine_meters(point, from).min(haversine_meters(point, to));
                (id, dist)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Fastest direct edge between two adjacent nodes
    pub fn edge_between(&self, from: RoadNodeId, to: RoadNodeId) -> Option<&RoadEdge> {
        self.out_edges
            .get(from)?
            .iter()
            .map(|&id| &self.edges[id])
            .filter(|edge| edge.to == to)
            .min_by(|a, b| a.travel_time_seconds.total_cmp(&b.travel_time_seconds))
    }

    /// Mean edge speed in meters per second
    pub fn mean_edge_speed(&self) -> Option<f64> {
        if self.edges.is_empty() {
            return None;
        }
        let sum: f64 = self.edges.iter().map(RoadEdge::speed).sum();
        Some(sum / self.edges.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // two-node network, 1 km apart, 60 s travel time
    fn two_node_network() -> RoadNetwork {
        let mut network = RoadNetwork::new();
        let a = network.add_node(Coordinates { lat: 40.6620, lng: -73.9610 });
        let b = network.add_node(Coordinates { lat: 40.6710, lng: -73.9610 });
        network.add_edge_pair(a, b, 1000.0, 60.0).unwrap();
        network
    }

    #[test]
    fn test_add_edge_validates_endpoints() {
        let mut network = RoadNetwork::new();
        network.add_node(Coordinates { lat: 40.0, lng: -73.0 });

        assert!(network.add_edge(0, 5, 100.0, 10.0).is_err());
        assert!(network.add_edge(0, 0, -1.0, 10.0).is_err());
        assert!(network.add_edge(0, 0, 100.0, 0.0).is_err());
    }

    #[test]
    fn test_nearest_node() {
        let network = two_node_network();

        // point right next to node 1
        let (node, distance) = network
            .nearest_node(&Coordinates { lat: 40.6709, lng: -73.9610 })
            .unwrap();
        assert_eq!(node, 1);
        assert!(distance < 50.0, "snap distance was {} m", distance);
    }

    #[test]
    fn test_edge_between_picks_fastest() {
        let mut network = two_node_network();
        // slower parallel edge
        network.add_edge(0, 1, 1200.0, 240.0).unwrap();

        let edge = network.edge_between(0, 1).unwrap();
        assert!((edge.travel_time_seconds - 60.0).abs() < 1e-9);
        assert!(network.edge_between(1, 0).is_some());
        assert!(network.edge_between(0, 0).is_none());
    }

    #[test]
    fn test_edge_speed() {
        let network = two_node_network();
        let edge = network.edge(0).unwrap();
        // 1000 m / 60 s
        assert!((edge.speed() - 16.666).abs() < 0.01);
        assert!((network.mean_edge_speed().unwrap() - edge.speed()).abs() < 1e-9);
    }

    #[test]
    fn test_mean_edge_speed_empty() {
        assert!(RoadNetwork::new().mean_edge_speed().is_none());
    }
}
