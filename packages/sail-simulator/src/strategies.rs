//! strategies.rs — Rudder and sail control laws
//!
//! The controller only talks to the [`RudderStrategy`] and [`SailStrategy`]
//! traits; the defaults here are a PD rudder and a lift/drag-optimal sail.
//! `NoisyRudder` wraps any rudder law with Gaussian actuator noise.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sail_types::{angular_difference, Angle, Vector};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigurationError;
use crate::foil::Foil;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub rudder_kp: f64,
    /// Per degree/second of turn rate
    pub rudder_kd: f64,
    /// Rudder command limit, degrees either side
    pub rudder_max: f64,
    /// Sail trim limit, degrees either side of the centreline
    pub sail_max_trim: f64,
    /// Standard deviation of noise added to each rudder command, degrees
    pub rudder_noise_deg: f64,
    /// Fixed seed for reproducible rudder noise; drawn from entropy when absent
    pub rudder_noise_seed: Option<u64>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            rudder_kp: RUDDER_KP,
            rudder_kd: RUDDER_KD,
            rudder_max: RUDDER_MAX_ANGLE,
            sail_max_trim: SAIL_MAX_TRIM,
            rudder_noise_deg: RUDDER_NOISE_STD,
            rudder_noise_seed: None,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let checks = [
            ("control.rudder_kp", self.rudder_kp, 0.0, f64::MAX),
            ("control.rudder_kd", self.rudder_kd, 0.0, f64::MAX),
            ("control.rudder_max", self.rudder_max, 0.0, 90.0),
            ("control.sail_max_trim", self.sail_max_trim, 0.0, 180.0),
            ("control.rudder_noise_deg", self.rudder_noise_deg, 0.0, 90.0),
        ];
        for (field, value, min, max) in checks {
            if !(value.is_finite() && value >= min && value <= max) {
                return Err(ConfigurationError::InvalidParameter {
                    field: field.into(),
                    value,
                    expected: "finite, non-negative and within its limit",
                });
            }
        }
        Ok(())
    }
}

/// Name and live internals of one strategy, for telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategyInfo {
    pub name: String,
    pub state: BTreeMap<&'static str, f64>,
}

impl StrategyInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), state: BTreeMap::new() }
    }

    pub fn with(mut self, key: &'static str, value: f64) -> Self {
        self.state.insert(key, value);
        self
    }
}

// ── Rudder ────────────────────────────────────────────────────────────────────

pub trait RudderStrategy: Send + Sync {
    /// Rudder command in degrees; positive turns the bow counter-clockwise.
    fn command(&mut self, heading: Angle, target: Angle, angular_velocity: f64) -> f64;

    fn info(&self) -> StrategyInfo {
        StrategyInfo::named("custom")
    }
}

/// `clamp(Kp·error − Kd·turn_rate, ±max)` with the error and turn rate in degrees.
#[derive(Debug, Clone)]
pub struct PdRudder {
    kp: f64,
    kd: f64,
    max: f64,
    last_error: f64,
}

impl PdRudder {
    pub fn new(cfg: &ControlConfig) -> Self {
        Self { kp: cfg.rudder_kp, kd: cfg.rudder_kd, max: cfg.rudder_max, last_error: 0.0 }
    }
}

impl RudderStrategy for PdRudder {
    fn command(&mut self, heading: Angle, target: Angle, angular_velocity: f64) -> f64 {
        let error = angular_difference(heading, target);
        self.last_error = error;
        let raw = self.kp * error - self.kd * angular_velocity.to_degrees();
        raw.clamp(-self.max, self.max)
    }

    fn info(&self) -> StrategyInfo {
        StrategyInfo::named("pd_rudder").with("heading_error_deg", self.last_error)
    }
}

/// Adds a zero-mean Normal draw to every command of the wrapped law,
/// still clamped to the rudder limit.
pub struct NoisyRudder {
    inner: Box<dyn RudderStrategy>,
    noise: Normal<f64>,
    rng: StdRng,
    max: f64,
    last_noise: f64,
}

impl NoisyRudder {
    pub fn new(inner: Box<dyn RudderStrategy>, cfg: &ControlConfig) -> Result<Self, ConfigurationError> {
        let noise = Normal::new(0.0, cfg.rudder_noise_deg).map_err(|_| ConfigurationError::InvalidParameter {
            field: "control.rudder_noise_deg".into(),
            value: cfg.rudder_noise_deg,
            expected: "finite and >= 0",
        })?;
        let rng = match cfg.rudder_noise_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { inner, noise, rng, max: cfg.rudder_max, last_noise: 0.0 })
    }
}

impl RudderStrategy for NoisyRudder {
    fn command(&mut self, heading: Angle, target: Angle, angular_velocity: f64) -> f64 {
        let clean = self.inner.command(heading, target, angular_velocity);
        self.last_noise = self.noise.sample(&mut self.rng);
        (clean + self.last_noise).clamp(-self.max, self.max)
    }

    fn info(&self) -> StrategyInfo {
        let mut info = self.inner.info();
        info.name = format!("noisy {}", info.name);
        info.with("noise_std_deg", self.noise.std_dev()).with("last_noise_deg", self.last_noise)
    }
}

// ── Sail ──────────────────────────────────────────────────────────────────────

/// Inputs for choosing a sail trim.
pub struct SailContext<'a> {
    pub sail: &'a Foil,
    /// Apparent wind at the sail, boat frame, pointing where the air travels
    pub apparent_wind: Vector,
}

impl SailContext<'_> {
    /// Apparent wind angle off the bow, degrees, signed (port positive).
    pub fn apparent_wind_angle(&self) -> f64 {
        angular_difference(Angle::calc(0.0), self.apparent_wind.angle().reversed())
    }
}

pub trait SailStrategy: Send + Sync {
    fn trim(&mut self, ctx: &SailContext<'_>) -> f64;

    fn info(&self) -> StrategyInfo {
        StrategyInfo::named("custom")
    }

    /// Trim with the chord head to wind, producing as little force as possible.
    fn luff(&mut self, ctx: &SailContext<'_>, max_trim: f64) -> f64 {
        luff_trim(ctx, max_trim)
    }
}

pub fn luff_trim(ctx: &SailContext<'_>, max_trim: f64) -> f64 {
    if ctx.apparent_wind.magnitude() == 0.0 {
        return 0.0;
    }
    let incoming = ctx.apparent_wind.angle().reversed();
    trim_for_chord(ctx.sail, incoming, max_trim)
}

fn trim_for_chord(sail: &Foil, chord: Angle, max_trim: f64) -> f64 {
    angular_difference(sail.orientation(), chord).clamp(-max_trim, max_trim)
}

/// Holds the sail at the table's best lift/drag angle of attack, on
/// whichever side pulls the boat forward harder.
#[derive(Debug, Clone)]
pub struct LiftDragSail {
    max_trim: f64,
    upwind_no_go: f64,
    best_aoa: Option<f64>,
}

impl LiftDragSail {
    pub fn new(cfg: &ControlConfig, upwind_no_go: f64) -> Self {
        Self { max_trim: cfg.sail_max_trim, upwind_no_go, best_aoa: None }
    }
}

impl SailStrategy for LiftDragSail {
    fn trim(&mut self, ctx: &SailContext<'_>) -> f64 {
        if ctx.apparent_wind.magnitude() == 0.0 {
            return 0.0;
        }
        if ctx.apparent_wind_angle().abs() < self.upwind_no_go {
            return luff_trim(ctx, self.max_trim);
        }
        let aoa = *self
            .best_aoa
            .get_or_insert_with(|| ctx.sail.table().best_lift_drag_angle().unwrap_or(UPWIND_NO_GO_ANGLE / 2.0));

        let incoming = ctx.apparent_wind.angle().reversed();
        [incoming.offset(aoa), incoming.offset(-aoa)]
            .into_iter()
            .map(|chord| trim_for_chord(ctx.sail, chord, self.max_trim))
            .map(|trim| (trim, ctx.sail.load_at_trim(&ctx.apparent_wind, trim).force.x()))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0.0, |(trim, _)| trim)
    }

    fn info(&self) -> StrategyInfo {
        let info = StrategyInfo::named("lift_drag_sail");
        match self.best_aoa {
            Some(aoa) => info.with("best_aoa_deg", aoa),
            None => info,
        }
    }
}
