//! constants.rs — Physical constants and tuning defaults
//!
//! Defaults feed the `Default` impls in `config.rs`; the core never reads
//! these directly once a config value has been passed in.

// ── Fluids ────────────────────────────────────────────────────────────────────

/// Fresh water at ~20 °C, kg/m³
pub const WATER_DENSITY: f64 = 997.77;
/// Dry air at sea level, kg/m³
pub const AIR_DENSITY: f64 = 1.204;

// ── Integration ───────────────────────────────────────────────────────────────

pub const DEFAULT_MICRO_STEPS: u32 = 30;
pub const MAX_REALISTIC_BOAT_SPEED: f64 = 50.0;
/// rad/s
pub const MAX_ANGULAR_VELOCITY: f64 = 10.0;
pub const DEFAULT_TIMESTEP: f64 = 0.03;

// ── Hull windage ──────────────────────────────────────────────────────────────

pub const HULL_WINDAGE_CD: f64 = 0.9;
/// m², frontal area above the waterline
pub const HULL_WINDAGE_AREA: f64 = 0.05;

// ── Free-swinging sail ────────────────────────────────────────────────────────

/// kg·m², sail and boom about the mast
pub const SAIL_SWING_INERTIA: f64 = 0.54;
/// m, centre of effort behind the mast
pub const SAIL_CENTRE_OF_EFFORT: f64 = 0.49;
/// N·m·s/rad
pub const SAIL_SWING_DAMPING: f64 = 0.5;

// ── Control ───────────────────────────────────────────────────────────────────

pub const UPWIND_NO_GO_ANGLE: f64 = 45.0;
pub const DOWNWIND_NO_GO_ANGLE: f64 = 30.0;
pub const RUDDER_MAX_ANGLE: f64 = 20.0;
pub const SAIL_MAX_TRIM: f64 = 90.0;
pub const RUDDER_KP: f64 = 0.5;
pub const RUDDER_KD: f64 = 0.3;
/// Rudder noise standard deviation, degrees; zero disables it
pub const RUDDER_NOISE_STD: f64 = 0.0;
pub const ARRIVAL_RADIUS: f64 = 5.0;

/// Closing-rate advantage the other layline needs before a tack/jibe.
pub const TACK_HYSTERESIS: f64 = 0.25;
pub const MIN_MANEUVER_INTERVAL_TICKS: u32 = 30;
pub const MAX_MANEUVERS_PER_LEG: u32 = 200;

// ── Station keeping ───────────────────────────────────────────────────────────

pub const STATION_OUTER_HALF_SIZE: f64 = 20.0;
pub const STATION_INNER_HALF_SIZE: f64 = 10.0;
pub const STATION_EXIT_RADIUS: f64 = 18.0;
pub const STATION_HEADING_TOLERANCE: f64 = 5.0;

// ── Wind ──────────────────────────────────────────────────────────────────────

pub const DEFAULT_WIND_SPEED: f64 = 5.0;
pub const DEFAULT_WIND_FROM: f64 = 270.0;
