//! diagnostics.rs — Injectable event sink for the simulator core
//!
//! The core never logs directly. Boat and controller hand [`Diagnostic`]
//! events to whatever sink they were built with; the binary uses
//! [`TracingSink`], tests use [`RecordingSink`].

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

use crate::pathfinding::{ManeuverKind, TackSide};
use crate::station_keeping::StationState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Linear speed exceeded the configured bound and was clamped.
    SpeedClamped { speed: f64, limit: f64 },
    /// Angular velocity exceeded the configured bound and was clamped.
    SpinClamped { angular_velocity: f64, limit: f64 },
    WaypointReached { index: usize, lap: u32 },
    LapComplete { lap: u32 },
    CourseComplete { waypoints: usize },
    Maneuver { kind: ManeuverKind, side: TackSide, waypoint: usize },
    StationTransition { from: StationState, to: StationState },
    Unreachable { index: usize, maneuvers: u32 },
}

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, d: Diagnostic) {
        match d {
            Diagnostic::SpeedClamped { speed, limit } => {
                warn!(speed, limit, "boat speed clamped");
            }
            Diagnostic::SpinClamped { angular_velocity, limit } => {
                warn!(angular_velocity, limit, "angular velocity clamped");
            }
            Diagnostic::WaypointReached { index, lap } => {
                info!("📍 Waypoint {index} reached (lap {lap})");
            }
            Diagnostic::LapComplete { lap } => info!("🔁 Lap {lap} complete"),
            Diagnostic::CourseComplete { waypoints } => {
                info!("🏁 Course complete ({waypoints} waypoints)");
            }
            Diagnostic::Maneuver { kind, side, waypoint } => {
                info!("⛵ {kind:?} onto {side:?} tack toward waypoint {waypoint}");
            }
            Diagnostic::StationTransition { from, to } => {
                info!("⚓ Station keeping {from:?} → {to:?}");
            }
            Diagnostic::Unreachable { index, maneuvers } => {
                warn!("Waypoint {index} unreachable after {maneuvers} maneuvers, skipping");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Ok(mut events) = self.events.lock() {
            events.push(diagnostic);
        }
    }
}

pub fn tracing_sink() -> SharedSink {
    Arc::new(TracingSink)
}
