//! pathfinding.rs — No-go zones, laylines and tack/jibe planning
//!
//! A bearing is unsailable when it falls inside the upwind cone (within
//! `upwind_no_go` of the wind's origin) or the downwind cone (within
//! `downwind_no_go` of dead downwind). When the target lies in a cone the
//! planner steers a layline on the cone boundary and flips sides when the
//! layline intersection is reached or the current side starts losing ground.
//!
//! Intersection of the two laylines is a 2×2 linear solve (Cramer's rule).

use sail_types::{angular_difference, Angle, Point2, Vector};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{ConfigurationError, PathfindingError};
use crate::strategies::StrategyInfo;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Side the wind comes over. Heading `wind_from + upwind_no_go` is starboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TackSide {
    Port,
    Starboard,
}

impl TackSide {
    pub fn flipped(self) -> Self {
        match self {
            TackSide::Port => TackSide::Starboard,
            TackSide::Starboard => TackSide::Port,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverKind {
    Tack,
    Jibe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cone {
    Upwind,
    Downwind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Half-angle of the upwind no-go cone, degrees
    pub upwind_no_go: f64,
    /// Half-angle of the downwind no-go cone, degrees
    pub downwind_no_go: f64,
    /// m
    pub arrival_radius: f64,
    /// Closing rate is the cos of the angle between a layline and the target
    /// bearing. A tack/jibe is forced once the opposite layline closes faster
    /// than the current one by more than this margin
    pub tack_hysteresis: f64,
    /// Ticks that must pass between two maneuvers
    pub min_maneuver_interval: u32,
    pub max_maneuvers_per_leg: u32,
    /// Endurance courses stop after this many laps; unlimited when absent
    pub endurance_laps: Option<u32>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            upwind_no_go: UPWIND_NO_GO_ANGLE,
            downwind_no_go: DOWNWIND_NO_GO_ANGLE,
            arrival_radius: ARRIVAL_RADIUS,
            tack_hysteresis: TACK_HYSTERESIS,
            min_maneuver_interval: MIN_MANEUVER_INTERVAL_TICKS,
            max_maneuvers_per_leg: MAX_MANEUVERS_PER_LEG,
            endurance_laps: None,
        }
    }
}

impl NavigationConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let angles = [
            ("navigation.upwind_no_go", self.upwind_no_go),
            ("navigation.downwind_no_go", self.downwind_no_go),
        ];
        for (field, v) in angles {
            if !(v.is_finite() && (0.0..90.0).contains(&v)) {
                return Err(ConfigurationError::InvalidParameter {
                    field: field.into(),
                    value: v,
                    expected: "within [0, 90)",
                });
            }
        }
        if self.upwind_no_go + self.downwind_no_go >= 180.0 {
            return Err(ConfigurationError::NoGoConesOverlap {
                upwind: self.upwind_no_go,
                downwind: self.downwind_no_go,
            });
        }
        if !(self.arrival_radius.is_finite() && self.arrival_radius > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                field: "navigation.arrival_radius".into(),
                value: self.arrival_radius,
                expected: "finite and > 0",
            });
        }
        if !(self.tack_hysteresis.is_finite() && (0.0..=1.0).contains(&self.tack_hysteresis)) {
            return Err(ConfigurationError::InvalidParameter {
                field: "navigation.tack_hysteresis".into(),
                value: self.tack_hysteresis,
                expected: "within [0, 1]",
            });
        }
        Ok(())
    }

    /// Which no-go cone, if any, contains `bearing`. Boundary bearings are sailable.
    pub fn cone_for(&self, wind_from: Angle, bearing: Angle) -> Option<Cone> {
        if angular_difference(wind_from, bearing).abs() < self.upwind_no_go {
            Some(Cone::Upwind)
        } else if angular_difference(wind_from.reversed(), bearing).abs() < self.downwind_no_go {
            Some(Cone::Downwind)
        } else {
            None
        }
    }

    /// Boundary heading of `cone` on `side`.
    pub fn layline(&self, cone: Cone, side: TackSide, wind_from: Angle) -> Angle {
        let wind_from = wind_from.to_calc();
        match (cone, side) {
            (Cone::Upwind, TackSide::Starboard) => wind_from.offset(self.upwind_no_go),
            (Cone::Upwind, TackSide::Port) => wind_from.offset(-self.upwind_no_go),
            (Cone::Downwind, TackSide::Starboard) => wind_from.reversed().offset(-self.downwind_no_go),
            (Cone::Downwind, TackSide::Port) => wind_from.reversed().offset(self.downwind_no_go),
        }
    }
}

/// What the planner knows each tick.
#[derive(Debug, Clone, Copy)]
pub struct Situation {
    pub position: Point2,
    pub heading: Angle,
    pub wind_from: Angle,
    pub target: Point2,
    pub target_index: usize,
}

/// Heading to steer plus planning detail for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Guidance {
    pub heading: Angle,
    pub cone: Option<Cone>,
    pub side: Option<TackSide>,
    /// Layline intersection the boat is currently sailing towards
    pub intermediate: Option<Point2>,
    pub maneuver: Option<ManeuverKind>,
}

impl Guidance {
    pub fn direct(heading: Angle) -> Self {
        Self { heading, cone: None, side: None, intermediate: None, maneuver: None }
    }
}

pub trait PathStrategy: Send + Sync {
    /// Heading to steer this tick.
    fn guide(&mut self, situation: &Situation) -> Result<Guidance, PathfindingError>;

    /// Forget per-leg state; called whenever the active waypoint changes.
    fn reset(&mut self);

    fn maneuvers(&self) -> u32;

    fn info(&self) -> StrategyInfo {
        StrategyInfo::named("custom")
    }
}

// ── Layline planner ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LaylinePlanner {
    cfg: NavigationConfig,
    cone: Option<Cone>,
    side: Option<TackSide>,
    ticks_since_maneuver: u32,
    maneuvers_this_leg: u32,
    total_maneuvers: u32,
    gave_up: bool,
}

impl LaylinePlanner {
    pub fn new(cfg: NavigationConfig) -> Result<Self, ConfigurationError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            cone: None,
            side: None,
            ticks_since_maneuver: u32::MAX,
            maneuvers_this_leg: 0,
            total_maneuvers: 0,
            gave_up: false,
        })
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.cfg
    }

    pub fn side(&self) -> Option<TackSide> {
        self.side
    }

    fn closest_side(&self, cone: Cone, s: &Situation) -> TackSide {
        let off = |side| angular_difference(s.heading, self.cfg.layline(cone, side, s.wind_from)).abs();
        if off(TackSide::Starboard) <= off(TackSide::Port) {
            TackSide::Starboard
        } else {
            TackSide::Port
        }
    }
}

impl PathStrategy for LaylinePlanner {
    fn guide(&mut self, s: &Situation) -> Result<Guidance, PathfindingError> {
        self.ticks_since_maneuver = self.ticks_since_maneuver.saturating_add(1);

        let bearing = s.position.bearing_to(&s.target);
        let Some(cone) = self.cfg.cone_for(s.wind_from, bearing) else {
            self.cone = None;
            return Ok(Guidance::direct(bearing));
        };

        // entering a cone (or switching cones): pick the layline nearest the bow
        if self.cone != Some(cone) || self.side.is_none() {
            self.cone = Some(cone);
            self.side = Some(self.closest_side(cone, s));
        }
        let mut side = self.side.unwrap_or(TackSide::Starboard);
        let mut heading = self.cfg.layline(cone, side, s.wind_from);
        let mut intermediate = layline_intersection(
            s.position,
            heading,
            s.target,
            self.cfg.layline(cone, side.flipped(), s.wind_from),
        );

        let closing = |h: Angle| angular_difference(h, bearing).to_radians().cos();
        let advantage = closing(self.cfg.layline(cone, side.flipped(), s.wind_from)) - closing(heading);
        let reached = match intermediate {
            Some(p) => s.position.distance_to(&p) < self.cfg.arrival_radius,
            None => true,
        };
        let losing = advantage > self.cfg.tack_hysteresis;

        let mut maneuver = None;
        if (reached || losing) && self.ticks_since_maneuver >= self.cfg.min_maneuver_interval {
            if self.maneuvers_this_leg >= self.cfg.max_maneuvers_per_leg {
                if !self.gave_up {
                    self.gave_up = true;
                    return Err(PathfindingError::Unreachable {
                        index: s.target_index,
                        maneuvers: self.maneuvers_this_leg,
                    });
                }
            } else {
                side = side.flipped();
                self.side = Some(side);
                self.ticks_since_maneuver = 0;
                self.maneuvers_this_leg += 1;
                self.total_maneuvers += 1;
                maneuver = Some(match cone {
                    Cone::Upwind => ManeuverKind::Tack,
                    Cone::Downwind => ManeuverKind::Jibe,
                });
                heading = self.cfg.layline(cone, side, s.wind_from);
                intermediate = layline_intersection(
                    s.position,
                    heading,
                    s.target,
                    self.cfg.layline(cone, side.flipped(), s.wind_from),
                );
            }
        }

        Ok(Guidance { heading, cone: Some(cone), side: Some(side), intermediate, maneuver })
    }

    fn reset(&mut self) {
        self.cone = None;
        self.side = None;
        self.maneuvers_this_leg = 0;
        self.gave_up = false;
    }

    fn maneuvers(&self) -> u32 {
        self.total_maneuvers
    }

    fn info(&self) -> StrategyInfo {
        StrategyInfo::named("layline")
            .with("maneuvers_this_leg", self.maneuvers_this_leg as f64)
            .with("cooldown_ticks", self.cfg.min_maneuver_interval.saturating_sub(self.ticks_since_maneuver) as f64)
            .with("gave_up", if self.gave_up { 1.0 } else { 0.0 })
    }
}

/// Where the line from `from` along `heading` meets the line that reaches
/// `target` along `final_heading`. `None` when the lines are parallel or the
/// meeting point is behind `from`.
pub fn layline_intersection(from: Point2, heading: Angle, target: Point2, final_heading: Angle) -> Option<Point2> {
    let (d1x, d1y) = Vector::new(heading, 1.0).decompose();
    let (d2x, d2y) = Vector::new(final_heading, 1.0).decompose();
    // from + t·d1 = target − s·d2  →  t·d1 + s·d2 = target − from
    let (bx, by) = (target.x - from.x, target.y - from.y);
    let det = d1x * d2y - d1y * d2x;
    if det.abs() < 1e-9 {
        return None;
    }
    let t = (bx * d2y - by * d2x) / det;
    let s = (d1x * by - d1y * bx) / det;
    if t <= 0.0 || s < 0.0 {
        return None;
    }
    Some(Point2::new(from.x + t * d1x, from.y + t * d1y))
}
