//! station_keeping.rs — Hold position inside a box around a station centre
//!
//! The boat alternates between beating upwind and drifting back down. State
//! changes are driven by the explicit [`TRANSITIONS`] table; each row is
//! guarded by exactly one [`Predicate`] and at most one row fires per tick.
//!
//! ```text
//! ENTERING ──EnteredBoundary──▶ REACHING_UPWIND ──ReachedUpwind──▶ DRIFTING
//!                                     ▲                               │
//!                                     └──ReenteredInterior── RETURNING ◀──ExitedBox
//! ```

use sail_types::{angular_difference, Angle, Point2, Vector};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationState {
    Entering,
    ReachingUpwind,
    Drifting,
    Returning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationKeepingConfig {
    /// Half side of the outer (boundary) box, m
    pub outer_half_size: f64,
    /// Half side of the inner box, m
    pub inner_half_size: f64,
    /// Distance from the centre that ends a drift, m
    pub exit_radius: f64,
    /// Upwind offset from the centre that ends a beat, m; defaults to `inner_half_size`
    pub upwind_progress_limit: Option<f64>,
    /// Slack on the best upwind angle, degrees
    pub heading_tolerance: f64,
}

impl Default for StationKeepingConfig {
    fn default() -> Self {
        Self {
            outer_half_size: STATION_OUTER_HALF_SIZE,
            inner_half_size: STATION_INNER_HALF_SIZE,
            exit_radius: STATION_EXIT_RADIUS,
            upwind_progress_limit: None,
            heading_tolerance: STATION_HEADING_TOLERANCE,
        }
    }
}

impl StationKeepingConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let positive = [
            ("station_keeping.outer_half_size", self.outer_half_size),
            ("station_keeping.inner_half_size", self.inner_half_size),
            ("station_keeping.exit_radius", self.exit_radius),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigurationError::InvalidParameter {
                    field: field.into(),
                    value,
                    expected: "finite and > 0",
                });
            }
        }
        if self.inner_half_size >= self.outer_half_size {
            return Err(ConfigurationError::InvalidParameter {
                field: "station_keeping.inner_half_size".into(),
                value: self.inner_half_size,
                expected: "smaller than outer_half_size",
            });
        }
        if self.exit_radius <= self.inner_half_size {
            return Err(ConfigurationError::InvalidParameter {
                field: "station_keeping.exit_radius".into(),
                value: self.exit_radius,
                expected: "larger than inner_half_size",
            });
        }
        Ok(())
    }

    fn progress_limit(&self) -> f64 {
        self.upwind_progress_limit.unwrap_or(self.inner_half_size)
    }
}

/// What the state machine looks at each tick.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub position: Point2,
    pub heading: Angle,
    pub wind_from: Angle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Inside the outer box.
    EnteredBoundary,
    /// Heading within the best upwind angle (plus tolerance) of the wind,
    /// or far enough upwind of the centre.
    ReachedUpwind,
    /// Farther than `exit_radius` from the centre.
    ExitedBox,
    /// Inside the inner box.
    ReenteredInterior,
}

pub const TRANSITIONS: [(StationState, Predicate, StationState); 4] = [
    (StationState::Entering, Predicate::EnteredBoundary, StationState::ReachingUpwind),
    (StationState::ReachingUpwind, Predicate::ReachedUpwind, StationState::Drifting),
    (StationState::Drifting, Predicate::ExitedBox, StationState::Returning),
    (StationState::Returning, Predicate::ReenteredInterior, StationState::ReachingUpwind),
];

#[derive(Debug, Clone)]
pub struct StationKeeper {
    center: Point2,
    cfg: StationKeepingConfig,
    /// Degrees off the wind the boat can point
    best_upwind: f64,
    state: StationState,
}

impl StationKeeper {
    pub fn new(center: Point2, cfg: StationKeepingConfig, best_upwind: f64) -> Result<Self, ConfigurationError> {
        cfg.validate()?;
        if !(center.x.is_finite() && center.y.is_finite()) {
            return Err(ConfigurationError::InvalidParameter {
                field: "station_keeping.center".into(),
                value: center.x,
                expected: "finite",
            });
        }
        if !(best_upwind.is_finite() && best_upwind > 0.0 && best_upwind < 180.0) {
            return Err(ConfigurationError::InvalidParameter {
                field: "station_keeping.best_upwind".into(),
                value: best_upwind,
                expected: "within (0, 180)",
            });
        }
        Ok(Self { center, cfg, best_upwind, state: StationState::Entering })
    }

    pub fn state(&self) -> StationState { self.state }
    pub fn center(&self) -> Point2 { self.center }

    /// Apply the first matching transition. Returns `(from, to)` when one fired.
    pub fn update(&mut self, obs: &Observation) -> Option<(StationState, StationState)> {
        let (from, _, to) = TRANSITIONS
            .iter()
            .find(|(from, predicate, _)| *from == self.state && self.holds(*predicate, obs))?;
        self.state = *to;
        Some((*from, *to))
    }

    pub fn holds(&self, predicate: Predicate, obs: &Observation) -> bool {
        match predicate {
            Predicate::EnteredBoundary => self.box_distance(obs.position) <= self.cfg.outer_half_size,
            Predicate::ReachedUpwind => {
                let off_wind = angular_difference(obs.wind_from, obs.heading).abs();
                off_wind <= self.best_upwind + self.cfg.heading_tolerance
                    || self.upwind_progress(obs) >= self.cfg.progress_limit()
            }
            Predicate::ExitedBox => self.center.distance_to(&obs.position) > self.cfg.exit_radius,
            Predicate::ReenteredInterior => self.box_distance(obs.position) <= self.cfg.inner_half_size,
        }
    }

    /// Where to steer in the current state; `None` while drifting.
    pub fn target(&self, wind_from: Angle) -> Option<Point2> {
        match self.state {
            StationState::Entering | StationState::Returning => Some(self.center),
            StationState::ReachingUpwind => {
                Some(self.center.translate(&Vector::new(wind_from, self.cfg.progress_limit())))
            }
            StationState::Drifting => None,
        }
    }

    /// Chebyshev distance: the boxes are axis-aligned squares.
    fn box_distance(&self, p: Point2) -> f64 {
        (p.x - self.center.x).abs().max((p.y - self.center.y).abs())
    }

    fn upwind_progress(&self, obs: &Observation) -> f64 {
        self.center.displacement_to(&obs.position).dot(&Vector::new(obs.wind_from, 1.0))
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: StationState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keeper() -> StationKeeper {
        StationKeeper::new(Point2::origin(), StationKeepingConfig::default(), 45.0).unwrap()
    }

    fn at(x: f64, y: f64, heading: f64) -> Observation {
        // wind from the north
        Observation { position: Point2::new(x, y), heading: Angle::calc(heading), wind_from: Angle::calc(90.0) }
    }

    #[test]
    fn every_state_has_exactly_one_exit() {
        for state in [
            StationState::Entering,
            StationState::ReachingUpwind,
            StationState::Drifting,
            StationState::Returning,
        ] {
            assert_eq!(TRANSITIONS.iter().filter(|(from, _, _)| *from == state).count(), 1);
        }
    }

    #[test]
    fn stays_entering_outside_boundary() {
        let mut k = keeper();
        assert_eq!(k.update(&at(50.0, 0.0, 180.0)), None);
        assert_eq!(k.state(), StationState::Entering);
    }

    #[test]
    fn full_cycle() {
        let mut k = keeper();
        assert_eq!(
            k.update(&at(15.0, 0.0, 180.0)),
            Some((StationState::Entering, StationState::ReachingUpwind))
        );
        // beam reach: not pointing high enough yet
        assert_eq!(k.update(&at(5.0, 0.0, 180.0)), None);
        // close-hauled within best angle + tolerance
        assert_eq!(
            k.update(&at(5.0, 0.0, 90.0 + 48.0)),
            Some((StationState::ReachingUpwind, StationState::Drifting))
        );
        assert_eq!(k.target(Angle::calc(90.0)), None);
        assert_eq!(k.update(&at(0.0, -15.0, 0.0)), None);
        assert_eq!(
            k.update(&at(0.0, -18.5, 0.0)),
            Some((StationState::Drifting, StationState::Returning))
        );
        assert_eq!(
            k.update(&at(0.0, -9.0, 90.0)),
            Some((StationState::Returning, StationState::ReachingUpwind))
        );
    }

    #[test]
    fn upwind_progress_ends_the_beat() {
        let mut k = keeper();
        k.force_state(StationState::ReachingUpwind);
        // heading across the wind but already past the progress limit
        assert_eq!(
            k.update(&at(0.0, 10.5, 180.0)),
            Some((StationState::ReachingUpwind, StationState::Drifting))
        );
    }

    #[test]
    fn one_transition_per_update() {
        let mut k = keeper();
        // satisfies both EnteredBoundary and ReachedUpwind
        k.update(&at(0.0, 12.0, 90.0));
        assert_eq!(k.state(), StationState::ReachingUpwind);
    }

    #[test]
    fn upwind_target_is_toward_the_wind() {
        let mut k = keeper();
        k.force_state(StationState::ReachingUpwind);
        let t = k.target(Angle::calc(90.0)).unwrap();
        assert!(t.x.abs() < 1e-9);
        assert!((t.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_inverted_boxes() {
        let cfg = StationKeepingConfig { inner_half_size: 30.0, ..Default::default() };
        assert!(StationKeeper::new(Point2::origin(), cfg, 45.0).is_err());
    }
}
