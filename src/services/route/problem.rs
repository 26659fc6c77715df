//! Route planning problem types

use anyhow::{bail, Result};
use chrono::NaiveTime;

use crate::types::{Coordinates, NodeLayout, RouteRequest};

/// A school with its morning bell time
#[derive(Debug, Clone)]
pub struct School {
    pub coordinates: Coordinates,
    pub start_time: NaiveTime,
}

/// Single-vehicle pickup problem: one bus collects every student and
/// drops each at their assigned school before the bell.
#[derive(Debug, Clone)]
pub struct RouteProblem {
    pub depot: Coordinates,
    pub students: Vec<Coordinates>,
    pub schools: Vec<School>,
    /// For each student, the 0-based index into `schools`
    pub assignments: Vec<usize>,
    /// Upper bound on pooled routes to decode
    pub max_routes: usize,
}

impl RouteProblem {
    pub fn layout(&self) -> NodeLayout {
        NodeLayout::new(self.students.len(), self.schools.len())
    }

    pub fn node_count(&self) -> usize {
        self.layout().len()
    }

    /// Flat coordinate list indexed by node id: depot, students, schools
    pub fn coordinates(&self) -> Vec<Coordinates> {
        let mut coords = Vec::with_capacity(self.node_count());
        coords.push(self.depot);
        coords.extend(self.students.iter().copied());
        coords.extend(self.schools.iter().map(|s| s.coordinates));
        coords
    }

    pub fn start_times(&self) -> Vec<NaiveTime> {
        self.schools.iter().map(|s| s.start_time).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.students.is_empty() {
            bail!("problem needs at least one student");
        }
        if self.schools.is_empty() {
            bail!("problem needs at least one school");
        }
        if self.max_routes == 0 {
            bail!("max_routes must be at least 1");
        }
        if self.assignments.len() != self.students.len() {
            bail!(
                "expected {} assignments, got {}",
                self.students.len(),
                self.assignments.len()
            );
        }
        if let Some(bad) = self.assignments.iter().find(|&&s| s >= self.schools.len()) {
            bail!(
                "assignment refers to school {} but only {} schools exist",
                bad,
                self.schools.len()
            );
        }
        Ok(())
    }

    /// Build a problem from a validated wire request
    pub fn from_request(request: &RouteRequest) -> Result<Self> {
        request.validate()?;

        let start_times = request.parsed_start_times()?;
        let layout = request.layout();

        let students = request.coordinates[layout.students()].to_vec();
        let schools = request.coordinates[layout.schools()]
            .iter()
            .zip(start_times)
            .map(|(&coordinates, start_time)| School {
                coordinates,
                start_time,
            })
            .collect();

        Ok(Self {
            depot: request.coordinates[NodeLayout::DEPOT],
            students,
            schools,
            assignments: request.assignments.clone(),
            max_routes: request.max_routes,
        })
    }
}
