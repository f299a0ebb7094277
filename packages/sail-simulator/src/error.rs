//! error.rs — Error taxonomy for the simulator core
//!
//! Construction-time problems (`ConfigurationError`, `DataError`,
//! `ValidationError`) fail fast. `PhysicsError` aborts a single tick and is
//! left to the run loop to retry or halt. Navigation errors come out of the
//! controller.

use std::path::PathBuf;

use sail_types::ValueError;
use thiserror::Error;

/// Malformed boat, foil, wind, or controller setup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("boat has no foils")]
    NoFoils,

    #[error("boat has no {0} foil")]
    MissingFoil(&'static str),

    /// A scalar parameter outside its permitted range.
    #[error("{field} = {value} is invalid: {expected}")]
    InvalidParameter {
        field: String,
        value: f64,
        expected: &'static str,
    },

    #[error("total rotational inertia must be positive, got {0}")]
    ZeroInertia(f64),

    /// The no-go cones leave no heading to sail on.
    #[error("no-go cones cover every heading (upwind {upwind}° + downwind {downwind}° >= 180°)")]
    NoGoConesOverlap { upwind: f64, downwind: f64 },

    #[error("config file does not parse: {0}")]
    Parse(String),

    #[error("invalid {field}: {source}")]
    Value {
        field: &'static str,
        #[source]
        source: ValueError,
    },
}

/// Out-of-range angle, vector, time step, or waypoint input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("time step must be finite and positive, got {0}")]
    InvalidTimeStep(f64),

    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Non-finite state detected during integration. The tick that produced it
/// has been rolled back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("{field} became non-finite ({value}) at t = {time:.3}s")]
    NonFinite {
        field: &'static str,
        value: f64,
        time: f64,
    },
}

/// Problems with the waypoint course handed to the controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    #[error("waypoint course is empty")]
    EmptyCourse,

    #[error("waypoint {index} is malformed: {source}")]
    MalformedWaypoint {
        index: usize,
        #[source]
        source: ValueError,
    },

    #[error("step called before plan")]
    NoActivePlan,

    #[error("station box is invalid: {0}")]
    InvalidStation(#[from] ConfigurationError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathfindingError {
    /// Reported once per waypoint; the controller moves on to the next one.
    #[error("waypoint {index} unreachable after {maneuvers} tacks/jibes on one leg")]
    Unreachable { index: usize, maneuvers: u32 },
}

/// Missing or malformed coefficient table / polar file.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("table needs at least 2 rows, got {0}")]
    TooFewRows(usize),

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("angles must be strictly ascending: {previous}° then {next}°")]
    NotAscending { previous: f64, next: f64 },

    #[error("angle {0}° is outside [0, 180]")]
    AngleOutOfDomain(f64),

    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<DataError>,
    },
}

/// Everything the core can return.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("pathfinding error: {0}")]
    Pathfinding(#[from] PathfindingError),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

pub type SimResult<T> = Result<T, SimError>;
