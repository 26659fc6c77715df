//! MILP route model
//!
//! Encodes the visit ordering as a dense binary cube: X[i][j][o] marks the
//! edge i -> j occupying position o of the route, integer Y[j] is the
//! position at which node j is visited, and continuous K[j] is the arrival
//! clock at node j in seconds of day. The model is rebuilt fresh for every
//! solve so the pool enumerator can append exclusion cuts.

use anyhow::{bail, Result};
use good_lp::{constraint, variable, variables, Constraint, Expression, ProblemVariables, Variable};
use itertools::iproduct;

use crate::services::routing::TravelTimeMatrix;
use crate::types::NodeLayout;

use super::config::DropoffWindow;

/// Variables, constraints and objective for one scenario, ready to hand to
/// a solver backend.
pub struct RouteModel {
    pub vars: ProblemVariables,
    /// X[i][j][o] flattened as (i * n + j) * n + o
    pub x: Vec<Variable>,
    /// Y[j] for non-depot nodes, index j - 1
    pub y: Vec<Variable>,
    /// K[j] for every node including the depot
    pub k: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    pub objective: Expression,
    pub n: usize,
}

impl RouteModel {
    /// Flat index of X[i][j][o]
    pub fn x_index(n: usize, i: usize, j: usize, o: usize) -> usize {
        (i * n + j) * n + o
    }
}

/// Builder for [`RouteModel`]s
pub struct RouteModelBuilder {
    layout: NodeLayout,
    travel_times: TravelTimeMatrix,
    /// Student node id - 1 -> school index
    assignments: Vec<usize>,
    windows: Vec<DropoffWindow>,
    earliest_departure_seconds: f64,
    departure_weight: f64,
}

impl RouteModelBuilder {
    pub fn new(
        layout: NodeLayout,
        travel_times: TravelTimeMatrix,
        assignments: Vec<usize>,
        windows: Vec<DropoffWindow>,
        earliest_departure_seconds: f64,
        departure_weight: f64,
    ) -> Result<Self> {
        if travel_times.size != layout.len() {
            bail!(
                "travel-time matrix is {}x{} but the scenario has {} nodes",
                travel_times.size,
                travel_times.size,
                layout.len()
            );
        }
        if assignments.len() != layout.num_students {
            bail!(
                "expected {} assignments, got {}",
                layout.num_students,
                assignments.len()
            );
        }
        if assignments.iter().any(|&s| s >= layout.num_schools) {
            bail!("assignment refers to a school outside the scenario");
        }
        if windows.len() != layout.num_schools {
            bail!(
                "expected {} drop-off windows, got {}",
                layout.num_schools,
                windows.len()
            );
        }
        if let Some(bad) = windows
            .iter()
            .find(|w| w.latest_seconds < w.earliest_seconds)
        {
            bail!(
                "drop-off window closes ({:.0}s) before it opens ({:.0}s)",
                bad.latest_seconds,
                bad.earliest_seconds
            );
        }
        if departure_weight < 0.0 {
            bail!("departure weight must be non-negative");
        }

        Ok(Self {
            layout,
            travel_times,
            assignments,
            windows,
            earliest_departure_seconds,
            departure_weight,
        })
    }

    pub fn layout(&self) -> NodeLayout {
        self.layout
    }

    /// Big-M for the time-propagation constraints: no cumulative arrival
    /// can exceed the latest window (or the departure bound) plus one more
    /// leg.
    pub fn big_m(&self) -> f64 {
        let latest = self
            .windows
            .iter()
            .map(|w| w.latest_seconds)
            .fold(self.earliest_departure_seconds, f64::max);
        latest + self.travel_times.max_time()
    }

    /// Construct a fresh model
    pub fn build(&self) -> RouteModel {
        let n = self.layout.len();
        let idx = |i, j, o| RouteModel::x_index(n, i, j, o);

        let mut vars: ProblemVariables = variables!();

        let x: Vec<Variable> = (0..n * n * n)
            .map(|_| vars.add(variable().binary()))
            .collect();
        let y: Vec<Variable> = (1..n)
            .map(|_| vars.add(variable().integer().min(0.0).max((n - 1) as f64)))
            .collect();
        let k: Vec<Variable> = (0..n).map(|_| vars.add(variable().min(0.0))).collect();

        let mut constraints: Vec<Constraint> = Vec::new();

        // DepotFirst: exactly one edge leaves the depot at position 0
        let depot_out = (0..n).fold(Expression::from(0.0), |acc, j| {
            acc + x[idx(NodeLayout::DEPOT, j, 0)]
        });
        constraints.push(constraint!(depot_out == 1.0));

        // OneIn: every non-depot node is entered exactly once
        for j in 1..n {
            let inflow = iproduct!(0..n, 0..n)
                .fold(Expression::from(0.0), |acc, (i, o)| acc + x[idx(i, j, o)]);
            constraints.push(constraint!(inflow == 1.0));
        }

        // OneOut: at most one edge leaves any node
        for i in 0..n {
            let outflow = iproduct!(0..n, 0..n)
                .fold(Expression::from(0.0), |acc, (j, o)| acc + x[idx(i, j, o)]);
            constraints.push(constraint!(outflow <= 1.0));
        }

        // NoSelf
        for (i, o) in iproduct!(0..n, 0..n) {
            let self_edge = Expression::from(x[idx(i, i, o)]);
            constraints.push(constraint!(self_edge == 0.0));
        }

        // InOrder: exactly one edge occupies each position of the path
        for o in 0..n - 1 {
            let at_position = iproduct!(0..n, 0..n)
                .fold(Expression::from(0.0), |acc, (i, j)| acc + x[idx(i, j, o)]);
            constraints.push(constraint!(at_position == 1.0));
        }

        // Continuity: whoever is entered at position o departs at o + 1
        for j in 0..n {
            for o in 0..n.saturating_sub(2) {
                let inflow =
                    (0..n).fold(Expression::from(0.0), |acc, i| acc + x[idx(i, j, o)]);
                let outflow =
                    (0..n).fold(Expression::from(0.0), |acc, l| acc + x[idx(j, l, o + 1)]);
                let net = inflow - outflow;
                constraints.push(constraint!(net == 0.0));
            }
        }

        // AssignOrder: bind Y to the position of the incoming edge
        for j in 1..n {
            let weighted = iproduct!(0..n, 0..n).fold(Expression::from(0.0), |acc, (i, o)| {
                acc + (o as f64) * x[idx(i, j, o)]
            });
            let bound = weighted - y[j - 1];
            constraints.push(constraint!(bound == 0.0));
        }

        // PickupOrder: a student boards before the bus reaches their school
        for (student_offset, &school_index) in self.assignments.iter().enumerate() {
            let student = 1 + student_offset;
            let school = self.layout.school_node(school_index);
            let precedence = y[student - 1] - y[school - 1];
            constraints.push(constraint!(precedence <= 0.0));
        }

        // TimePropagation: K[j] >= K[i] + T[i][j] when edge i -> j is used
        let m = self.big_m();
        for (i, j) in iproduct!(0..n, 0..n) {
            if i == j {
                continue;
            }
            let mut lhs = Expression::from(self.travel_times.time(i, j) - m);
            lhs = lhs + k[i];
            lhs = (0..n).fold(lhs, |acc, o| acc + m * x[idx(i, j, o)]);
            let slack = lhs - k[j];
            constraints.push(constraint!(slack <= 0.0));
        }

        // TimeWindow: schools are reached inside their drop-off window
        for (school_index, window) in self.windows.iter().enumerate() {
            let school = self.layout.school_node(school_index);
            let opens = Expression::from(k[school]);
            let closes = Expression::from(k[school]);
            constraints.push(constraint!(opens >= window.earliest_seconds));
            constraints.push(constraint!(closes <= window.latest_seconds));
        }

        // DepotDeparture
        let departure = Expression::from(k[NodeLayout::DEPOT]);
        constraints.push(constraint!(departure >= self.earliest_departure_seconds));

        // Objective: total travel time, minus a nudge toward later departure
        let mut objective = Expression::from(0.0);
        for (i, j, o) in iproduct!(0..n, 0..n, 0..n) {
            if i != j {
                objective = objective + self.travel_times.time(i, j) * x[idx(i, j, o)];
            }
        }
        if self.departure_weight > 0.0 {
            objective = objective - self.departure_weight * k[NodeLayout::DEPOT];
        }

        RouteModel {
            vars,
            x,
            y,
            k,
            constraints,
            objective,
            n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric_matrix(n: usize, value: f64) -> TravelTimeMatrix {
        let mut seconds = vec![vec![value; n]; n];
        for (i, row) in seconds.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        TravelTimeMatrix::from_seconds(seconds).unwrap()
    }

    fn window(earliest: f64, latest: f64) -> DropoffWindow {
        DropoffWindow {
            earliest_seconds: earliest,
            latest_seconds: latest,
        }
    }

    fn sample_builder() -> RouteModelBuilder {
        RouteModelBuilder::new(
            NodeLayout::new(2, 1),
            symmetric_matrix(4, 100.0),
            vec![0, 0],
            vec![window(27_000.0, 28_500.0)],
            23_400.0,
            0.001,
        )
        .unwrap()
    }

    #[test]
    fn test_x_index_round_trip() {
        let n = 4;
        let mut seen = std::collections::HashSet::new();
        for (i, j, o) in iproduct!(0..n, 0..n, 0..n) {
            assert!(seen.insert(RouteModel::x_index(n, i, j, o)));
        }
        assert_eq!(seen.len(), n * n * n);
        assert_eq!(RouteModel::x_index(n, 0, 0, 0), 0);
        assert_eq!(RouteModel::x_index(n, 3, 3, 3), n * n * n - 1);
    }

    #[test]
    fn test_builder_validates_dimensions() {
        let layout = NodeLayout::new(2, 1);

        // wrong matrix size
        assert!(RouteModelBuilder::new(
            layout,
            symmetric_matrix(3, 100.0),
            vec![0, 0],
            vec![window(0.0, 100.0)],
            0.0,
            0.0,
        )
        .is_err());

        // assignment out of range
        assert!(RouteModelBuilder::new(
            layout,
            symmetric_matrix(4, 100.0),
            vec![0, 1],
            vec![window(0.0, 100.0)],
            0.0,
            0.0,
        )
        .is_err());

        // inverted window
        assert!(RouteModelBuilder::new(
            layout,
            symmetric_matrix(4, 100.0),
            vec![0, 0],
            vec![window(200.0, 100.0)],
            0.0,
            0.0,
        )
        .is_err());
    }

    #[test]
    fn test_big_m_covers_latest_window_plus_leg() {
        let builder = sample_builder();
        // 28 500 latest window + 100 max travel
        assert!((builder.big_m() - 28_600.0).abs() < 1e-9);
    }

    #[test]
    fn test_big_m_uses_departure_bound_when_later() {
        let builder = RouteModelBuilder::new(
            NodeLayout::new(1, 1),
            symmetric_matrix(3, 50.0),
            vec![0],
            vec![window(0.0, 100.0)],
            30_000.0,
            0.0,
        )
        .unwrap();
        assert!((builder.big_m() - 30_050.0).abs() < 1e-9);
    }

    #[test]
    fn test_model_dimensions() {
        let model = sample_builder().build();
        let n = 4;

        assert_eq!(model.n, n);
        assert_eq!(model.x.len(), n * n * n);
        assert_eq!(model.y.len(), n - 1);
        assert_eq!(model.k.len(), n);

        // DepotFirst(1) + OneIn(3) + OneOut(4) + NoSelf(16) + InOrder(3)
        // + Continuity(8) + AssignOrder(3) + PickupOrder(2)
        // + TimePropagation(12) + TimeWindow(2) + DepotDeparture(1)
        assert_eq!(model.constraints.len(), 55);
    }
}
