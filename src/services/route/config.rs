//! Scenario and solver configuration

use anyhow::{bail, Result};
use chrono::{NaiveTime, Timelike};

/// Drop-off window for one school, in seconds of day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropoffWindow {
    pub earliest_seconds: f64,
    pub latest_seconds: f64,
}

/// Scenario parameters: how drop-off windows and the departure bound are
/// derived from school start times.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Drop-offs may begin this many seconds before the school bell
    pub window_open_buffer_seconds: u32,
    /// Drop-offs must end this many seconds before the school bell
    pub window_close_buffer_seconds: u32,
    /// Earliest allowed depot departure
    pub earliest_departure: NaiveTime,
    /// Objective weight per second of depot departure time; pushes the
    /// departure as late as the windows allow. Zero disables the
    /// preference.
    pub departure_weight: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            window_open_buffer_seconds: 1800,
            window_close_buffer_seconds: 300,
            earliest_departure: NaiveTime::from_hms_opt(6, 30, 0).unwrap_or(NaiveTime::MIN),
            departure_weight: 0.001,
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_close_buffer_seconds >= self.window_open_buffer_seconds {
            bail!(
                "window close buffer ({}s) must be smaller than the open buffer ({}s)",
                self.window_close_buffer_seconds,
                self.window_open_buffer_seconds
            );
        }
        if self.departure_weight < 0.0 {
            bail!("departure weight must be non-negative");
        }
        Ok(())
    }

    /// Drop-off window for a school bell time
    pub fn window_for(&self, start_time: NaiveTime) -> DropoffWindow {
        let start = f64::from(start_time.num_seconds_from_midnight());
        DropoffWindow {
            earliest_seconds: (start - f64::from(self.window_open_buffer_seconds)).max(0.0),
            latest_seconds: (start - f64::from(self.window_close_buffer_seconds)).max(0.0),
        }
    }

    pub fn windows_for(&self, start_times: &[NaiveTime]) -> Vec<DropoffWindow> {
        start_times.iter().map(|&t| self.window_for(t)).collect()
    }

    pub fn earliest_departure_seconds(&self) -> f64 {
        f64::from(self.earliest_departure.num_seconds_from_midnight())
    }
}

/// Solver configuration
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Wall-clock cap handed to backends that support a deadline
    pub max_time_seconds: Option<u32>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_time_seconds: Some(30),
        }
    }
}

impl SolverConfig {
    /// Quick configuration for interactive use
    pub fn fast() -> Self {
        Self {
            max_time_seconds: Some(5),
        }
    }

    /// Longer budget for background runs
    pub fn quality() -> Self {
        Self {
            max_time_seconds: Some(120),
        }
    }
}
