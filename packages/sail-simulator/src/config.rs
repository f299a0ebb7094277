//! config.rs — `config.toml` loading and object construction
//!
//! Only the outer layer reads files. `build_boat` / `build_controller` turn a
//! parsed [`SimulatorConfig`] into core objects; datasheet and polar paths
//! are resolved relative to the directory the config file was loaded from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sail_types::{Angle, GeoPoint, Vector};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::boat_sim::{flow_from, Boat, BoatSetup, PhysicsConfig, Windage};
use crate::coefficients::CoefficientTable;
use crate::constants::*;
use crate::controller::{Controller, ControllerConfig, PlanMode};
use crate::diagnostics::SharedSink;
use crate::error::{ConfigurationError, DataError, SimResult};
use crate::foil::{Foil, FoilKind, FoilSpec, Medium};
use crate::pathfinding::NavigationConfig;
use crate::polar::Polar;
use crate::scenarios::ScenarioConfig;
use crate::station_keeping::StationKeepingConfig;
use crate::strategies::ControlConfig;

// ── Config structs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub wind: WindConfig,
    #[serde(default)]
    pub initial_state: InitialStateConfig,
    pub boat: BoatConfig,
    pub foils: Vec<FoilConfig>,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub station_keeping: StationKeepingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub scenario: ScenarioConfig,
    pub course: Option<CourseConfig>,
    /// Boat speed polar; best upwind angle falls back to the no-go angle without one
    pub polar: Option<PathBuf>,
    /// Directory relative paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    /// Calc bearing the wind blows from, degrees
    pub from_deg: f64,
    pub speed_mps: f64,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self { from_deg: DEFAULT_WIND_FROM, speed_mps: DEFAULT_WIND_SPEED }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialStateConfig {
    pub lat: f64,
    pub lon: f64,
    pub heading_deg: f64,
    pub current_from_deg: f64,
    pub current_speed_mps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoatConfig {
    pub mass_kg: f64,
    #[serde(default)]
    pub windage: Option<Windage>,
}

/// Offset of a foil from the boat centroid, boat frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OffsetConfig {
    /// Calc degrees, 0 = bow, 90 = port
    pub angle: f64,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoilConfig {
    pub name: String,
    pub kind: FoilKind,
    /// Defaults to air for sails, water otherwise
    pub medium: Option<Medium>,
    pub datasheet: PathBuf,
    /// Defaults to the medium's density
    pub density: Option<f64>,
    pub wetted_area: f64,
    #[serde(default)]
    pub rotational_inertia: f64,
    pub size: f64,
    /// A rudder without a position sits half a hull length aft
    pub position: Option<OffsetConfig>,
    #[serde(default)]
    pub orientation: f64,
    /// Sails only: metres of sheet; the sail then swings freely within it
    pub sheet_length: Option<f64>,
}

impl FoilConfig {
    fn medium(&self) -> Medium {
        self.medium.unwrap_or(match self.kind {
            FoilKind::Sail => Medium::Air,
            FoilKind::Hull | FoilKind::Rudder => Medium::Water,
        })
    }

    fn density(&self) -> f64 {
        self.density.unwrap_or(match self.medium() {
            Medium::Air => AIR_DENSITY,
            Medium::Water => WATER_DENSITY,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub update_rate_hz: f64,
    /// Simulated seconds per tick at 1× speed
    pub dt: f64,
    pub speed: f64,
    pub ctrl_port: u16,
    /// UDP target for JSON telemetry
    pub telemetry_addr: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            update_rate_hz: 1.0 / DEFAULT_TIMESTEP,
            dt: DEFAULT_TIMESTEP,
            speed: 1.0,
            ctrl_port: 9090,
            telemetry_addr: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseConfig {
    pub mode: PlanMode,
    pub waypoints: Vec<GeoPoint>,
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl SimulatorConfig {
    /// Parse a config; relative paths resolve against the working directory.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        let mut cfg: Self = toml::from_str(text).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        cfg.base_dir = PathBuf::from(".");
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::from_toml_str(&text)?;
        cfg.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        info!("📄 Loaded config {}", path.display());
        Ok(cfg)
    }

    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            control: self.control.clone(),
            navigation: self.navigation.clone(),
            station_keeping: self.station_keeping.clone(),
        }
    }

    pub fn wind_from(&self) -> Angle {
        Angle::calc(self.wind.from_deg)
    }

    // ── Construction ─────────────────────────────────────────────────────────

    pub fn build_foils(&self) -> SimResult<Vec<Foil>> {
        if self.foils.is_empty() {
            return Err(ConfigurationError::NoFoils.into());
        }
        let hull_size = self.foils.iter().find(|f| f.kind == FoilKind::Hull).map(|f| f.size);

        // foils sharing a datasheet share one table
        let mut tables: HashMap<PathBuf, Arc<CoefficientTable>> = HashMap::new();
        let mut foils = Vec::with_capacity(self.foils.len());
        for fc in &self.foils {
            let path = self.resolve(&fc.datasheet);
            let table = match tables.get(&path) {
                Some(t) => t.clone(),
                None => {
                    let t = Arc::new(CoefficientTable::from_path(&path)?);
                    tables.insert(path, t.clone());
                    t
                }
            };

            let position = match (fc.position, fc.kind, hull_size) {
                (Some(p), _, _) => Vector::new(Angle::calc(p.angle), p.distance),
                (None, FoilKind::Rudder, Some(size)) => Vector::new(Angle::calc(180.0), size / 2.0),
                (None, _, _) => Vector::ZERO,
            };
            let spec = FoilSpec {
                name: fc.name.clone(),
                kind: fc.kind,
                medium: fc.medium(),
                position,
                orientation: Angle::calc(fc.orientation),
                area: fc.wetted_area,
                density: fc.density(),
                inertia: fc.rotational_inertia,
                size: fc.size,
            };
            let foil = Foil::new(spec, table)?;
            foils.push(match fc.sheet_length {
                Some(length) => foil.with_sheet(length)?,
                None => foil,
            });
        }
        Ok(foils)
    }

    pub fn build_boat(&self, sink: SharedSink) -> SimResult<Boat> {
        let init = &self.initial_state;
        let setup = BoatSetup {
            foils: self.build_foils()?,
            mass: self.boat.mass_kg,
            start: GeoPoint::new(init.lat, init.lon),
            heading: Angle::calc(init.heading_deg),
            wind: flow_from(self.wind_from(), self.wind.speed_mps),
            current: flow_from(Angle::calc(init.current_from_deg), init.current_speed_mps),
            windage: self.boat.windage,
        };
        let boat = Boat::new(setup, self.physics.clone(), sink)?;
        info!(
            "⛵ Boat built: {} foils, {:.1} kg, wind {:.1} m/s from {:.0}°",
            boat.foils().len(),
            boat.mass(),
            self.wind.speed_mps,
            self.wind.from_deg
        );
        Ok(boat)
    }

    pub fn load_polar(&self) -> SimResult<Option<Polar>> {
        match &self.polar {
            Some(p) => Ok(Some(Polar::from_path(self.resolve(p))?)),
            None => Ok(None),
        }
    }

    /// Boat + controller, with the configured course already planned.
    pub fn build_controller(&self, sink: SharedSink) -> SimResult<Controller> {
        let boat = self.build_boat(sink.clone())?;
        let polar = self.load_polar()?;
        let mut controller = Controller::new(boat, self.controller_config(), polar.as_ref(), sink)?;
        if let Some(course) = &self.course {
            controller.plan(course.mode, course.waypoints.clone())?;
            info!("🧭 Course planned: {:?}, {} waypoints", course.mode, course.waypoints.len());
        }
        Ok(controller)
    }
}
