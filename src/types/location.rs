//! Location and node identity types

use serde::{Deserialize, Serialize};

/// Geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Role of a node in a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Depot,
    Student,
    School,
}

/// Node index layout for a scenario: depot first, then students, then
/// schools. Node ids are positional: depot is 0, students are 1..=P,
/// schools are P+1..=P+S.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    pub num_students: usize,
    pub num_schools: usize,
}

impl NodeLayout {
    /// The depot always occupies node id 0
    pub const DEPOT: usize = 0;

    pub fn new(num_students: usize, num_schools: usize) -> Self {
        Self {
            num_students,
            num_schools,
        }
    }

    /// Total number of nodes including the depot
    pub fn len(&self) -> usize {
        1 + self.num_students + self.num_schools
    }

    pub fn is_empty(&self) -> bool {
        self.num_students == 0 && self.num_schools == 0
    }

    /// Node ids of all students
    pub fn students(&self) -> std::ops::Range<usize> {
        1..1 + self.num_students
    }

    /// Node ids of all schools
    pub fn schools(&self) -> std::ops::Range<usize> {
        1 + self.num_students..self.len()
    }

    /// Node id of the school with the given 0-based index
    pub fn school_node(&self, school_index: usize) -> usize {
        1 + self.num_students + school_index
    }

    /// Classify a node id, if it is in range
    pub fn kind(&self, node: usize) -> Option<NodeKind> {
        if node == Self::DEPOT {
            Some(NodeKind::Depot)
        } else if self.students().contains(&node) {
            Some(NodeKind::Student)
        } else if self.schools().contains(&node) {
            Some(NodeKind::School)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_ranges() {
        let layout = NodeLayout::new(3, 2);

        assert_eq!(layout.len(), 6);
        assert_eq!(layout.students().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(layout.schools().collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(layout.school_node(0), 4);
        assert_eq!(layout.school_node(1), 5);
    }

    #[test]
    fn test_layout_kind() {
        let layout = NodeLayout::new(2, 1);

        assert_eq!(layout.kind(0), Some(NodeKind::Depot));
        assert_eq!(layout.kind(1), Some(NodeKind::Student));
        assert_eq!(layout.kind(2), Some(NodeKind::Student));
        assert_eq!(layout.kind(3), Some(NodeKind::School));
        assert_eq!(layout.kind(4), None);
    }

    #[test]
    fn test_coordinates_serde_camel_case() {
        let coords = Coordinates {
            lat: 40.7283,
            lng: -73.9406,
        };

        let json = serde_json::to_value(&coords).unwrap();
        assert!((json["lat"].as_f64().unwrap() - 40.7283).abs() < 1e-9);
        assert!((json["lng"].as_f64().unwrap() + 73.9406).abs() < 1e-9);
    }
}
