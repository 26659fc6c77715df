//! Solution decoding
//!
//! Turns a raw solver assignment into an ordered stop list and a wall
//! clock schedule. The structural order (from Y) and the temporal order
//! (from K) are cross-checked; a disagreement means the model or the
//! solver produced inconsistent values and is surfaced, never papered
//! over.

use chrono::NaiveTime;
use thiserror::Error;

use crate::types::Coordinates;

use super::solver::RawSolution;

/// Slack when comparing K values; covers float noise from the big-M
/// relaxation.
const TIME_TOLERANCE_SECONDS: f64 = 1e-3;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("solution has {values} order values but {nodes} non-depot nodes")]
    DimensionMismatch { values: usize, nodes: usize },
    #[error("order values are not a permutation: {0:?}")]
    InvalidOrdering(Vec<usize>),
    #[error(
        "arrival times disagree with the visit order at stop {position}: \
         node {temporal} arrives there but node {structural} is scheduled"
    )]
    OrderMismatch {
        position: usize,
        structural: usize,
        temporal: usize,
    },
}

/// A decoded route: stops in visit order (depot first) with the arrival
/// clock for each stop.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRoute {
    pub stops: Vec<Coordinates>,
    pub schedule: Vec<NaiveTime>,
}

impl DecodedRoute {
    /// Schedule rendered as HH:MM:SS strings
    pub fn schedule_strings(&self) -> Vec<String> {
        self.schedule
            .iter()
            .map(|t| t.format("%H:%M:%S").to_string())
            .collect()
    }
}

/// Decode one pooled solution against the scenario coordinates
/// (depot first, then students, then schools).
pub fn decode_solution(
    raw: &RawSolution,
    coordinates: &[Coordinates],
) -> Result<DecodedRoute, DecodeError> {
    let n = coordinates.len();
    if raw.y.len() + 1 != n || raw.k.len() != n {
        return Err(DecodeError::DimensionMismatch {
            values: raw.y.len(),
            nodes: n.saturating_sub(1),
        });
    }

    let ordering: Vec<usize> = raw.y.iter().map(|v| v.round().max(0.0) as usize).collect();

    // Y restricted to non-depot nodes must be a permutation of 0..n-1
    let mut seen = vec![false; n - 1];
    for &position in &ordering {
        if position >= n - 1 || seen[position] {
            return Err(DecodeError::InvalidOrdering(ordering));
        }
        seen[position] = true;
    }

    // structural order: depot at slot 0, node k+1 at slot ordering[k] + 1
    let mut stops = vec![coordinates[0]; n];
    let mut node_at_slot = vec![0usize; n];
    for (offset, &position) in ordering.iter().enumerate() {
        stops[position + 1] = coordinates[offset + 1];
        node_at_slot[position + 1] = offset + 1;
    }

    // temporal order: nodes sorted by arrival clock
    let mut by_arrival: Vec<usize> = (0..n).collect();
    by_arrival.sort_by(|&a, &b| raw.k[a].total_cmp(&raw.k[b]));

    for (slot, (&structural, &temporal)) in node_at_slot.iter().zip(&by_arrival).enumerate() {
        let clock_gap = (raw.k[structural] - raw.k[temporal]).abs();
        if structural != temporal && clock_gap > TIME_TOLERANCE_SECONDS {
            return Err(DecodeError::OrderMismatch {
                position: slot,
                structural,
                temporal,
            });
        }
    }

    let schedule = by_arrival
        .iter()
        .map(|&node| seconds_to_time(raw.k[node]))
        .collect();

    Ok(DecodedRoute { stops, schedule })
}

/// Convert seconds of day to a clock time, wrapping at midnight
fn seconds_to_time(seconds: f64) -> NaiveTime {
    let wrapped = seconds.round().rem_euclid(86_400.0) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(wrapped, 0).unwrap_or(NaiveTime::MIN)
}
