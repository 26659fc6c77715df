//! Route planning request/response wire types

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::{Coordinates, NodeLayout};

/// A single route-generation request
///
/// Node ids are positional: coordinates are ordered depot first, then
/// students, then schools, and the travel-time matrix uses the same
/// indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub num_students: usize,
    pub num_schools: usize,
    /// School start times as HH:MM:SS, one per school
    pub school_start_times: Vec<String>,
    /// Travel times in seconds, one row per origin node
    pub travel_times: Vec<Vec<f64>>,
    /// Coordinates indexed by node id: depot, students, schools
    pub coordinates: Vec<Coordinates>,
    /// For each student, the 0-based index of their assigned school
    pub assignments: Vec<usize>,
    /// Maximum number of pooled routes to return
    pub max_routes: usize,
}

impl RouteRequest {
    pub fn layout(&self) -> NodeLayout {
        NodeLayout::new(self.num_students, self.num_schools)
    }

    /// Check dimensions and value ranges before planning
    pub fn validate(&self) -> Result<()> {
        if self.num_students == 0 {
            bail!("request needs at least one student");
        }
        if self.num_schools == 0 {
            bail!("request needs at least one school");
        }
        if self.max_routes == 0 {
            bail!("maxRoutes must be at least 1");
        }

        let n = self.layout().len();
        if self.coordinates.len() != n {
            bail!(
                "expected {} coordinates (depot + {} students + {} schools), got {}",
                n,
                self.num_students,
                self.num_schools,
                self.coordinates.len()
            );
        }
        if self.school_start_times.len() != self.num_schools {
            bail!(
                "expected {} school start times, got {}",
                self.num_schools,
                self.school_start_times.len()
            );
        }
        if self.travel_times.len() != n || self.travel_times.iter().any(|row| row.len() != n) {
            bail!("travel-time matrix must be {n}x{n}");
        }
        if self.assignments.len() != self.num_students {
            bail!(
                "expected {} assignments, got {}",
                self.num_students,
                self.assignments.len()
            );
        }
        if let Some(bad) = self.assignments.iter().find(|&&s| s >= self.num_schools) {
            bail!(
                "assignment refers to school {} but only {} schools exist",
                bad,
                self.num_schools
            );
        }

        self.parsed_start_times().map(|_| ())
    }

    /// Parse the HH:MM:SS start-time strings
    pub fn parsed_start_times(&self) -> Result<Vec<NaiveTime>> {
        self.school_start_times
            .iter()
            .map(|raw| {
                NaiveTime::parse_from_str(raw, "%H:%M:%S")
                    .with_context(|| format!("invalid school start time '{raw}'"))
            })
            .collect()
    }
}

/// One planned route: ordered stops with an aligned clock schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRoute {
    /// Ordered stop coordinates, depot first
    pub route: Vec<Coordinates>,
    /// HH:MM:SS arrival times aligned with `route`
    pub schedule: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> RouteRequest {
        RouteRequest {
            num_students: 2,
            num_schools: 1,
            school_start_times: vec!["08:00:00".to_string()],
            travel_times: vec![vec![0.0; 4]; 4],
            coordinates: vec![
                Coordinates { lat: 40.6620, lng: -73.9610 },
                Coordinates { lat: 40.6700, lng: -73.9500 },
                Coordinates { lat: 40.6800, lng: -73.9400 },
                Coordinates { lat: 40.6900, lng: -73.9300 },
            ],
            assignments: vec![0, 0],
            max_routes: 5,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(sample_request().validate().is_ok());
    }

    #[test]
    fn test_start_time_parsing() {
        let request = sample_request();
        let times = request.parsed_start_times().unwrap();
        assert_eq!(times, vec![NaiveTime::from_hms_opt(8, 0, 0).unwrap()]);
    }

    #[test]
    fn test_rejects_bad_start_time() {
        let mut request = sample_request();
        request.school_start_times = vec!["8 o'clock".to_string()];
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_rejects_dimension_mismatch() {
        let mut request = sample_request();
        request.travel_times = vec![vec![0.0; 3]; 3];
        assert!(request.validate().is_err());

        let mut request = sample_request();
        request.coordinates.pop();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_assignment() {
        let mut request = sample_request();
        request.assignments = vec![0, 1];
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_max_routes() {
        let mut request = sample_request();
        request.max_routes = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_deserializes_camel_case() {
        let json = serde_json::json!({
            "numStudents": 1,
            "numSchools": 1,
            "schoolStartTimes": ["07:30:00"],
            "travelTimes": [[0.0, 1.0, 2.0], [1.0, 0.0, 3.0], [2.0, 3.0, 0.0]],
            "coordinates": [
                { "lat": 40.66, "lng": -73.96 },
                { "lat": 40.67, "lng": -73.95 },
                { "lat": 40.68, "lng": -73.94 }
            ],
            "assignments": [0],
            "maxRoutes": 3
        });

        let request: RouteRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.num_students, 1);
        assert_eq!(request.max_routes, 3);
        assert!(request.validate().is_ok());
    }
}
