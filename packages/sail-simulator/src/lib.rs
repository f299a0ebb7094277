//! # sail-simulator
//!
//! 2D sailing dynamics and an autonomous navigation controller.
//!
//! Per tick the [`Controller`] reads the [`Boat`] state, picks a heading
//! (direct, layline or station keeping), turns it into rudder and sail
//! commands, and the boat integrates the resulting foil loads.
//!
//! The `sail-sim` binary wraps this in a paced tokio loop with WebSocket
//! control and UDP telemetry.

pub mod boat_sim;
pub mod coefficients;
pub mod config;
pub mod constants;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod foil;
pub mod pathfinding;
pub mod polar;
pub mod scenarios;
pub mod station_keeping;
pub mod strategies;
pub mod telemetry;

pub use boat_sim::{flow_from, Boat, BoatSetup, BoatSnapshot, PhysicsConfig, Windage};
pub use coefficients::{CoefficientRow, CoefficientTable};
pub use config::SimulatorConfig;
pub use controller::{AlgorithmInfo, Controller, ControllerConfig, ControllerStatus, PlanMode, Strategies};
pub use diagnostics::{tracing_sink, Diagnostic, DiagnosticSink, RecordingSink, SharedSink, TracingSink};
pub use error::{
    ConfigurationError, DataError, NavigationError, PathfindingError, PhysicsError, SimError, SimResult,
    ValidationError,
};
pub use foil::{Foil, FoilKind, FoilLoad, FoilSpec, Medium, Sheet};
pub use pathfinding::{LaylinePlanner, NavigationConfig, PathStrategy, TackSide};
pub use polar::Polar;
pub use station_keeping::{StationKeeper, StationKeepingConfig, StationState};
pub use strategies::{
    ControlConfig, LiftDragSail, NoisyRudder, PdRudder, RudderStrategy, SailStrategy, StrategyInfo,
};
pub use telemetry::{SimSnapshot, TelemetrySender};
