//! controller.rs — Autonomous navigation controller
//!
//! Owns the [`Boat`] and, once per tick:
//!   1. checks waypoint arrival (at most one index advance per tick)
//!   2. asks the path strategy for a heading (direct or layline)
//!   3. asks the rudder and sail strategies for actuator commands
//!   4. writes the commands onto the boat and integrates it
//!
//! Three plan modes: `Precision` runs the course once, `Endurance` loops it,
//! `StationKeeping` holds position around the centroid of the waypoints.
//!
//! The boat is integrated every tick, even when the control step reports an
//! error; the error is returned after the physics step.

use sail_types::{GeoPoint, Point2};
use serde::{Deserialize, Serialize};

use crate::boat_sim::{Boat, BoatSnapshot};
use crate::diagnostics::{Diagnostic, SharedSink};
use crate::error::{ConfigurationError, NavigationError, PathfindingError, SimError, SimResult};
use crate::pathfinding::{Guidance, LaylinePlanner, NavigationConfig, PathStrategy, Situation, TackSide};
use crate::polar::Polar;
use crate::station_keeping::{Observation, StationKeeper, StationKeepingConfig, StationState};
use crate::strategies::{
    ControlConfig, LiftDragSail, NoisyRudder, PdRudder, RudderStrategy, SailContext, SailStrategy, StrategyInfo,
};

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    Endurance,
    Precision,
    StationKeeping,
}

/// Controller tuning, passed in whole at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub control: ControlConfig,
    pub navigation: NavigationConfig,
    pub station_keeping: StationKeepingConfig,
}

/// Swappable behaviours. `Strategies::standard` gives the built-in set.
pub struct Strategies {
    pub rudder: Box<dyn RudderStrategy>,
    pub sail: Box<dyn SailStrategy>,
    pub path: Box<dyn PathStrategy>,
}

impl Strategies {
    /// PD rudder (noisy when `rudder_noise_deg > 0`), lift/drag sail, layline planner.
    pub fn standard(cfg: &ControllerConfig) -> Result<Self, ConfigurationError> {
        let pd: Box<dyn RudderStrategy> = Box::new(PdRudder::new(&cfg.control));
        let rudder: Box<dyn RudderStrategy> = if cfg.control.rudder_noise_deg > 0.0 {
            Box::new(NoisyRudder::new(pd, &cfg.control)?)
        } else {
            pd
        };
        Ok(Self {
            rudder,
            sail: Box::new(LiftDragSail::new(&cfg.control, cfg.navigation.upwind_no_go)),
            path: Box::new(LaylinePlanner::new(cfg.navigation.clone())?),
        })
    }

    pub fn info(&self) -> AlgorithmInfo {
        AlgorithmInfo { rudder: self.rudder.info(), sail: self.sail.info(), path: self.path.info() }
    }
}

/// Which strategies are active and what they currently hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlgorithmInfo {
    pub rudder: StrategyInfo,
    pub sail: StrategyInfo,
    pub path: StrategyInfo,
}

/// Read-only copy of the controller's state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControllerStatus {
    pub mode: Option<PlanMode>,
    pub waypoint_index: usize,
    pub waypoint_count: usize,
    pub tack_side: Option<TackSide>,
    pub station_state: Option<StationState>,
    pub course_complete: bool,
    pub lap: u32,
    pub maneuvers: u32,
    pub target_heading_deg: Option<f64>,
    /// Layline intersection currently steered for, local frame
    pub intermediate: Option<Point2>,
    pub intermediate_geo: Option<GeoPoint>,
    pub rudder_deg: f64,
    pub sail_deg: f64,
    pub algorithm: AlgorithmInfo,
}

#[derive(Debug, Clone)]
struct Course {
    mode: PlanMode,
    points: Vec<Point2>,
    station: Option<StationKeeper>,
    /// Station target proved unreachable; reported once per plan
    station_unreachable: bool,
}

// ── Controller ────────────────────────────────────────────────────────────────

pub struct Controller {
    boat: Boat,
    cfg: ControllerConfig,
    strategies: Strategies,
    best_upwind: f64,
    course: Option<Course>,
    status: ControllerStatus,
    sink: SharedSink,
}

impl Controller {
    pub fn new(boat: Boat, cfg: ControllerConfig, polar: Option<&Polar>, sink: SharedSink) -> Result<Self, ConfigurationError> {
        let strategies = Strategies::standard(&cfg)?;
        Self::with_strategies(boat, cfg, strategies, polar, sink)
    }

    pub fn with_strategies(
        boat: Boat,
        cfg: ControllerConfig,
        strategies: Strategies,
        polar: Option<&Polar>,
        sink: SharedSink,
    ) -> Result<Self, ConfigurationError> {
        cfg.control.validate()?;
        cfg.navigation.validate()?;
        cfg.station_keeping.validate()?;
        if boat.rudder().is_none() {
            return Err(ConfigurationError::MissingFoil("rudder"));
        }
        let best_upwind = polar
            .map(|p| p.best_upwind_angle(boat.wind().magnitude()))
            .unwrap_or(cfg.navigation.upwind_no_go);

        Ok(Self {
            boat,
            cfg,
            strategies,
            best_upwind,
            course: None,
            status: ControllerStatus::default(),
            sink,
        })
    }

    /// Validate and install a new course, resetting all navigation state.
    pub fn plan(&mut self, mode: PlanMode, waypoints: Vec<GeoPoint>) -> Result<(), NavigationError> {
        if waypoints.is_empty() {
            return Err(NavigationError::EmptyCourse);
        }
        for (index, wp) in waypoints.iter().enumerate() {
            wp.validate().map_err(|source| NavigationError::MalformedWaypoint { index, source })?;
        }

        let frame = *self.boat.frame();
        let points: Vec<Point2> = waypoints.iter().map(|wp| frame.to_local(wp)).collect();
        let station = match mode {
            PlanMode::StationKeeping => {
                let n = points.len() as f64;
                let center = Point2::new(
                    points.iter().map(|p| p.x).sum::<f64>() / n,
                    points.iter().map(|p| p.y).sum::<f64>() / n,
                );
                Some(StationKeeper::new(center, self.cfg.station_keeping.clone(), self.best_upwind)?)
            }
            _ => None,
        };

        self.strategies.path.reset();
        self.status = ControllerStatus {
            mode: Some(mode),
            waypoint_count: points.len(),
            station_state: station.as_ref().map(StationKeeper::state),
            maneuvers: self.strategies.path.maneuvers(),
            algorithm: self.strategies.info(),
            ..Default::default()
        };
        self.course = Some(Course { mode, points, station, station_unreachable: false });
        Ok(())
    }

    /// One control tick followed by one physics tick of `dt` seconds.
    ///
    /// A control error (an unreachable waypoint) still lets the boat move
    /// on the held commands; a physics error takes precedence over it.
    pub fn step(&mut self, dt: f64) -> SimResult<()> {
        let mode = self.course.as_ref().map(|c| c.mode).ok_or(NavigationError::NoActivePlan)?;

        let control = if self.status.course_complete {
            Ok(())
        } else {
            match mode {
                PlanMode::Precision | PlanMode::Endurance => self.follow_course(),
                PlanMode::StationKeeping => self.keep_station(),
            }
        };
        self.status.algorithm = self.strategies.info();

        // course complete holds the last commands
        self.boat.set_rudder(self.status.rudder_deg);
        self.boat.set_sail_trim(self.status.sail_deg);
        self.boat.step(dt)?;
        control
    }

    pub fn rudder_angle(&self) -> f64 { self.status.rudder_deg }
    pub fn sail_angle(&self) -> f64 { self.status.sail_deg }
    pub fn state(&self) -> ControllerStatus { self.status.clone() }
    pub fn boat(&self) -> &Boat { &self.boat }
    pub fn boat_mut(&mut self) -> &mut Boat { &mut self.boat }
    pub fn config(&self) -> &ControllerConfig { &self.cfg }
    pub fn best_upwind_angle(&self) -> f64 { self.best_upwind }
    pub fn algorithm_info(&self) -> AlgorithmInfo { self.strategies.info() }

    pub fn snapshot(&self) -> (BoatSnapshot, ControllerStatus) {
        (self.boat.snapshot(), self.state())
    }

    // ── Waypoint following ───────────────────────────────────────────────────

    fn follow_course(&mut self) -> SimResult<()> {
        let Some(course) = self.course.as_ref() else {
            return Err(NavigationError::NoActivePlan.into());
        };
        let index = self.status.waypoint_index;
        let target = course.points[index];

        if self.boat.position().distance_to(&target) < self.cfg.navigation.arrival_radius {
            self.sink.emit(Diagnostic::WaypointReached { index, lap: self.status.lap });
            self.advance();
            if self.status.course_complete {
                return Ok(());
            }
        }

        let index = self.status.waypoint_index;
        let Some(&target) = self.course.as_ref().and_then(|c| c.points.get(index)) else {
            return Ok(());
        };
        match self.steer_to(target, index) {
            Err(SimError::Pathfinding(PathfindingError::Unreachable { index, maneuvers })) => {
                self.sink.emit(Diagnostic::Unreachable { index, maneuvers });
                self.advance();
                Err(PathfindingError::Unreachable { index, maneuvers }.into())
            }
            other => other,
        }
    }

    /// Move to the next waypoint, wrapping or completing at the end.
    fn advance(&mut self) {
        self.strategies.path.reset();
        let count = self.status.waypoint_count;
        let mode = self.status.mode;
        let next = self.status.waypoint_index + 1;
        if next < count {
            self.status.waypoint_index = next;
            return;
        }
        match mode {
            Some(PlanMode::Endurance) => {
                self.status.lap += 1;
                self.sink.emit(Diagnostic::LapComplete { lap: self.status.lap });
                if self.cfg.navigation.endurance_laps.is_some_and(|laps| self.status.lap >= laps) {
                    self.complete(count);
                } else {
                    self.status.waypoint_index = 0;
                }
            }
            _ => self.complete(count),
        }
    }

    fn complete(&mut self, waypoints: usize) {
        self.status.waypoint_index = waypoints;
        self.status.course_complete = true;
        self.status.intermediate = None;
        self.status.intermediate_geo = None;
        self.sink.emit(Diagnostic::CourseComplete { waypoints });
    }

    // ── Station keeping ──────────────────────────────────────────────────────

    fn keep_station(&mut self) -> SimResult<()> {
        let obs = Observation {
            position: self.boat.position(),
            heading: self.boat.heading(),
            wind_from: self.boat.wind_from(),
        };
        let Some(keeper) = self.course.as_mut().and_then(|c| c.station.as_mut()) else {
            return Err(NavigationError::NoActivePlan.into());
        };
        if let Some((from, to)) = keeper.update(&obs) {
            self.sink.emit(Diagnostic::StationTransition { from, to });
            self.strategies.path.reset();
        }
        let state = keeper.state();
        let target = keeper.target(obs.wind_from);
        self.status.station_state = Some(state);

        match target {
            // held commands; reported once per plan, the planner is not re-armed
            Some(target) => match self.steer_to(target, 0) {
                Err(SimError::Pathfinding(PathfindingError::Unreachable { index, maneuvers })) => {
                    let Some(course) = self.course.as_mut() else {
                        return Err(NavigationError::NoActivePlan.into());
                    };
                    if std::mem::replace(&mut course.station_unreachable, true) {
                        return Ok(());
                    }
                    self.sink.emit(Diagnostic::Unreachable { index, maneuvers });
                    Err(PathfindingError::Unreachable { index, maneuvers }.into())
                }
                other => other,
            },
            None => {
                // drift: rudder centred, sail luffed
                self.status.rudder_deg = 0.0;
                self.status.target_heading_deg = None;
                self.status.intermediate = None;
                self.status.intermediate_geo = None;
                if let Some(sail) = self.boat.sail() {
                    let ctx = SailContext { sail, apparent_wind: self.boat.apparent_flow_at(sail) };
                    self.status.sail_deg = self.strategies.sail.luff(&ctx, self.cfg.control.sail_max_trim);
                }
                Ok(())
            }
        }
    }

    // ── Steering ─────────────────────────────────────────────────────────────

    fn steer_to(&mut self, target: Point2, target_index: usize) -> SimResult<()> {
        let situation = Situation {
            position: self.boat.position(),
            heading: self.boat.heading(),
            wind_from: self.boat.wind_from(),
            target,
            target_index,
        };
        let guidance = self.strategies.path.guide(&situation)?;
        self.apply_guidance(&guidance, target_index);

        self.status.rudder_deg = self.strategies.rudder.command(
            self.boat.heading(),
            guidance.heading,
            self.boat.angular_velocity(),
        );
        if let Some(sail) = self.boat.sail() {
            let ctx = SailContext { sail, apparent_wind: self.boat.apparent_flow_at(sail) };
            self.status.sail_deg = self.strategies.sail.trim(&ctx);
        }
        Ok(())
    }

    fn apply_guidance(&mut self, g: &Guidance, target_index: usize) {
        if let (Some(kind), Some(side)) = (g.maneuver, g.side) {
            self.sink.emit(Diagnostic::Maneuver { kind, side, waypoint: target_index });
        }
        if g.side.is_some() {
            self.status.tack_side = g.side;
        }
        self.status.target_heading_deg = Some(g.heading.degrees());
        self.status.intermediate = g.intermediate;
        self.status.intermediate_geo = g.intermediate.map(|p| self.boat.frame().to_geo(&p));
        self.status.maneuvers = self.strategies.path.maneuvers();
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("boat", &self.boat)
            .field("status", &self.status)
            .finish()
    }
}
