//! scenarios.rs — Injectable wind and current scenarios for the run loop
//!
//! Each scenario perturbs the ambient flow the boat sails in, to exercise
//! the controller away from a steady breeze. Scenarios are toggleable at
//! runtime via the WebSocket control API.
//!
//! The core stays deterministic: only the run loop owns a [`WindModel`] and
//! writes its output onto the boat with `set_wind` / `set_current`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sail_types::{Angle, Vector};
use serde::{Deserialize, Serialize};

use crate::boat_sim::flow_from;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioType {
    /// Random gusts and lulls around the base wind speed
    Gusts,
    /// Slow sinusoidal oscillation of the wind direction
    WindShift,
    /// Constant water current under the boat
    Current,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub active: Vec<ScenarioType>,
    /// Standard deviation of the gust speed, m/s
    pub gust_sigma_mps: f64,
    /// Time constant gusts build and fade over, s
    pub gust_time_constant_s: f64,
    /// Peak wind shift either side of the base direction, degrees
    pub shift_amplitude_deg: f64,
    pub shift_period_s: f64,
    pub current_from_deg: f64,
    pub current_speed_mps: f64,
    /// Fixed seed for reproducible gusts; drawn from entropy when absent
    pub seed: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            active: vec![],
            gust_sigma_mps: 1.0,
            gust_time_constant_s: 3.0,
            shift_amplitude_deg: 15.0,
            shift_period_s: 120.0,
            current_from_deg: 0.0,
            current_speed_mps: 0.3,
            seed: None,
        }
    }
}

impl ScenarioConfig {
    pub fn has(&self, s: ScenarioType) -> bool {
        self.active.contains(&s)
    }
}

/// Predefined scenario presets that can be selected from the CLI or web UI
pub fn preset(name: &str) -> Option<ScenarioConfig> {
    match name {
        "default" | "steady" => Some(ScenarioConfig::default()),
        "gusty" => Some(preset_gusty()),
        "shifty" => Some(preset_shifty()),
        "tidal" => Some(preset_tidal()),
        "storm" => Some(preset_storm()),
        _ => None,
    }
}

pub fn preset_gusty() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::Gusts],
        gust_sigma_mps: 1.5,
        ..Default::default()
    }
}

pub fn preset_shifty() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::WindShift],
        shift_amplitude_deg: 20.0,
        shift_period_s: 90.0,
        ..Default::default()
    }
}

pub fn preset_tidal() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::Current],
        current_from_deg: 90.0,
        current_speed_mps: 0.5,
        ..Default::default()
    }
}

pub fn preset_storm() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::Gusts, ScenarioType::WindShift],
        gust_sigma_mps: 3.0,
        gust_time_constant_s: 1.5,
        shift_amplitude_deg: 30.0,
        shift_period_s: 60.0,
        ..Default::default()
    }
}

// ── Wind model ────────────────────────────────────────────────────────────────

/// Ambient flow for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ambient {
    pub wind: Vector,
    /// `None` leaves the boat's configured current alone
    pub current: Option<Vector>,
}

/// Turns a base wind plus the active scenario into per-tick ambient flow.
pub struct WindModel {
    base_from: Angle,
    base_speed: f64,
    scenario: ScenarioConfig,
    rng: StdRng,
    gust: f64,
    elapsed: f64,
}

impl WindModel {
    pub fn new(base_from: Angle, base_speed: f64, scenario: ScenarioConfig) -> Self {
        let rng = match scenario.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { base_from: base_from.to_calc(), base_speed, scenario, rng, gust: 0.0, elapsed: 0.0 }
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    /// Swap the active scenario; the gust state and clock carry over.
    pub fn set_scenario(&mut self, scenario: ScenarioConfig) {
        if let Some(seed) = scenario.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.scenario = scenario;
    }

    pub fn set_base(&mut self, from: Angle, speed: f64) {
        self.base_from = from.to_calc();
        self.base_speed = speed.max(0.0);
    }

    pub fn base(&self) -> (Angle, f64) {
        (self.base_from, self.base_speed)
    }

    /// Advance the model by `dt` seconds.
    pub fn advance(&mut self, dt: f64) -> Ambient {
        self.elapsed += dt;

        if self.scenario.has(ScenarioType::Gusts) {
            // first-order lag towards a fresh normal draw
            let target = Normal::new(0.0, self.scenario.gust_sigma_mps.max(0.0))
                .map(|n| n.sample(&mut self.rng))
                .unwrap_or(0.0);
            let k = (dt / self.scenario.gust_time_constant_s.max(dt)).min(1.0);
            self.gust += k * (target - self.gust);
        } else {
            self.gust = 0.0;
        }

        let from = if self.scenario.has(ScenarioType::WindShift) && self.scenario.shift_period_s > 0.0 {
            let phase = std::f64::consts::TAU * self.elapsed / self.scenario.shift_period_s;
            self.base_from.offset(self.scenario.shift_amplitude_deg * phase.sin())
        } else {
            self.base_from
        };
        let speed = (self.base_speed + self.gust).max(0.0);

        let current = self
            .scenario
            .has(ScenarioType::Current)
            .then(|| flow_from(Angle::calc(self.scenario.current_from_deg), self.scenario.current_speed_mps));

        Ambient { wind: flow_from(from, speed), current }
    }
}
