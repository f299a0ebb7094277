//! boat_sim.rs — Rigid-body boat integrator
//!
//! Sums the loads of every foil plus hull windage and integrates them into
//! position, heading, linear and angular velocity.
//!
//! Each external tick is split into `micro_steps` explicit-Euler sub-steps:
//! foil loads change sharply with apparent-flow direction, and a single large
//! step blows up during a tack.
//!
//! Frames: world is the local planar frame (X east, Y north). Foil positions
//! and loads are in the boat frame (X bow, Y port); the boat frame is the
//! world frame rotated by the heading.

use sail_types::{Angle, GeoPoint, LocalFrame, Point2, Vector};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::diagnostics::{Diagnostic, SharedSink};
use crate::error::{ConfigurationError, PhysicsError, SimResult, ValidationError};
use crate::foil::{Foil, FoilKind, Medium};

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Sub-steps per external tick
    pub micro_steps: u32,
    /// m/s; faster is clamped and reported, not an error
    pub max_speed: f64,
    /// rad/s; faster is clamped and reported
    pub max_angular_velocity: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            micro_steps: DEFAULT_MICRO_STEPS,
            max_speed: MAX_REALISTIC_BOAT_SPEED,
            max_angular_velocity: MAX_ANGULAR_VELOCITY,
        }
    }
}

/// Air drag on the part of the hull above the waterline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Windage {
    pub cd: f64,
    /// m²
    pub area: f64,
}

impl Default for Windage {
    fn default() -> Self {
        Self { cd: HULL_WINDAGE_CD, area: HULL_WINDAGE_AREA }
    }
}

/// Flow vector for wind (or current) blowing *from* a Calc bearing.
pub fn flow_from(from: Angle, speed: f64) -> Vector {
    Vector::new(from.reversed(), speed)
}

/// Everything needed to build a [`Boat`], already parsed and typed.
#[derive(Debug, Clone)]
pub struct BoatSetup {
    pub foils: Vec<Foil>,
    /// kg
    pub mass: f64,
    pub start: GeoPoint,
    pub heading: Angle,
    /// Flow vector of the wind (direction it blows towards)
    pub wind: Vector,
    pub current: Vector,
    pub windage: Option<Windage>,
}

/// Ambient flow minus the foil's own velocity `v + ω × r`, rotated into the
/// boat frame.
fn apparent_flow(kin: &Kinematics, ambient: Vector, position: Vector) -> Vector {
    let heading = kin.heading.degrees();
    let omega = kin.angular_velocity;
    let (vx, vy) = kin.velocity.decompose();
    let (rx, ry) = position.rotate(heading).decompose();
    let foil_velocity = Vector::from_components(vx - omega * ry, vy + omega * rx);
    (ambient - foil_velocity).rotate(-heading)
}

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct Kinematics {
    position: Point2,
    heading: Angle,
    velocity: Vector,
    /// rad/s, counter-clockwise positive
    angular_velocity: f64,
}

/// Copy of the boat state handed to telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct BoatSnapshot {
    pub time_s: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub lat: f64,
    pub lon: f64,
    pub heading_deg: f64,
    pub speed_mps: f64,
    pub course_deg: f64,
    pub angular_velocity_dps: f64,
    pub wind_from_deg: f64,
    pub wind_speed_mps: f64,
    pub apparent_wind_from_deg: f64,
    pub apparent_wind_speed_mps: f64,
    pub rudder_deg: f64,
    pub sail_deg: f64,
}

pub struct Boat {
    foils: Vec<Foil>,
    mass: f64,
    inertia: f64,
    frame: LocalFrame,
    kin: Kinematics,
    wind: Vector,
    current: Vector,
    windage: Option<Windage>,
    physics: PhysicsConfig,
    elapsed: f64,
    sink: SharedSink,
}

impl std::fmt::Debug for Boat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Boat")
            .field("foils", &self.foils.len())
            .field("mass", &self.mass)
            .field("kin", &self.kin)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

impl Boat {
    pub fn new(setup: BoatSetup, physics: PhysicsConfig, sink: SharedSink) -> Result<Self, ConfigurationError> {
        if setup.foils.is_empty() {
            return Err(ConfigurationError::NoFoils);
        }
        if !(setup.mass.is_finite() && setup.mass > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                field: "boat.mass".into(),
                value: setup.mass,
                expected: "finite and > 0",
            });
        }
        if physics.micro_steps == 0 {
            return Err(ConfigurationError::InvalidParameter {
                field: "physics.micro_steps".into(),
                value: 0.0,
                expected: ">= 1",
            });
        }
        let limits = [
            ("physics.max_speed", physics.max_speed),
            ("physics.max_angular_velocity", physics.max_angular_velocity),
        ];
        for (field, v) in limits {
            if !(v.is_finite() && v > 0.0) {
                return Err(ConfigurationError::InvalidParameter {
                    field: field.into(),
                    value: v,
                    expected: "finite and > 0",
                });
            }
        }
        for (field, v) in [("wind", setup.wind), ("current", setup.current)] {
            if !v.is_finite() {
                return Err(ConfigurationError::InvalidParameter {
                    field: field.into(),
                    value: v.magnitude(),
                    expected: "finite speed and direction",
                });
            }
        }
        setup
            .start
            .validate()
            .map_err(|source| ConfigurationError::Value { field: "initial_state.position", source })?;
        if !setup.heading.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                field: "initial_state.heading".into(),
                value: setup.heading.degrees(),
                expected: "finite",
            });
        }

        let inertia: f64 = setup.foils.iter().map(Foil::inertia).sum();
        if inertia <= 0.0 {
            return Err(ConfigurationError::ZeroInertia(inertia));
        }

        Ok(Self {
            foils: setup.foils,
            mass: setup.mass,
            inertia,
            frame: LocalFrame::new(setup.start),
            kin: Kinematics {
                position: Point2::origin(),
                heading: setup.heading.to_calc(),
                velocity: Vector::ZERO,
                angular_velocity: 0.0,
            },
            wind: setup.wind,
            current: setup.current,
            windage: setup.windage,
            physics,
            elapsed: 0.0,
            sink,
        })
    }

    // ── Integration ──────────────────────────────────────────────────────────

    /// Advance the boat by `dt` seconds.
    ///
    /// A non-finite result rolls the boat back to its state before the call
    /// and returns [`PhysicsError`]; retrying with a smaller `dt` is up to
    /// the caller.
    pub fn step(&mut self, dt: f64) -> SimResult<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ValidationError::InvalidTimeStep(dt).into());
        }
        let saved = self.kin;
        let saved_foils: Vec<_> = self.foils.iter().map(Foil::actuation).collect();
        let h = dt / self.physics.micro_steps as f64;
        let mut peak_speed: Option<f64> = None;
        let mut peak_spin: Option<f64> = None;

        for _ in 0..self.physics.micro_steps {
            self.micro_step(h);

            let speed = self.kin.velocity.magnitude();
            if speed > self.physics.max_speed {
                peak_speed = Some(peak_speed.map_or(speed, |p: f64| p.max(speed)));
                self.kin.velocity = Vector::new(self.kin.velocity.angle(), self.physics.max_speed);
            }
            let spin = self.kin.angular_velocity.abs();
            if spin > self.physics.max_angular_velocity {
                peak_spin = Some(peak_spin.map_or(spin, |p: f64| p.max(spin)));
                self.kin.angular_velocity = self.physics.max_angular_velocity.copysign(self.kin.angular_velocity);
            }
        }

        if let Err(e) = self.check_finite() {
            self.kin = saved;
            for (foil, state) in self.foils.iter_mut().zip(saved_foils) {
                foil.restore_actuation(state);
            }
            return Err(e.into());
        }

        if let Some(speed) = peak_speed {
            self.sink.emit(Diagnostic::SpeedClamped { speed, limit: self.physics.max_speed });
        }
        if let Some(angular_velocity) = peak_spin {
            self.sink.emit(Diagnostic::SpinClamped {
                angular_velocity,
                limit: self.physics.max_angular_velocity,
            });
        }
        self.elapsed += dt;
        Ok(())
    }

    fn micro_step(&mut self, h: f64) {
        let heading = self.kin.heading.degrees();
        let (vx, vy) = self.kin.velocity.decompose();

        let mut fx = 0.0;
        let mut fy = 0.0;
        let mut moment = 0.0;

        for foil in self.foils.iter_mut() {
            let ambient = match foil.medium() {
                Medium::Air => self.wind,
                Medium::Water => self.current,
            };
            let apparent = apparent_flow(&self.kin, ambient, foil.position());
            if foil.sheet().is_some() {
                foil.swing(&apparent, h);
            }

            let load = foil.load(&apparent);
            let (lx, ly) = load.force.rotate(heading).decompose();
            fx += lx;
            fy += ly;
            moment += load.moment;
        }

        if let Some(w) = self.windage {
            let apparent = self.wind - self.kin.velocity;
            let drag = 0.5 * AIR_DENSITY * w.cd * w.area * apparent.magnitude().powi(2);
            let (dx, dy) = Vector::new(apparent.angle(), drag).decompose();
            fx += dx;
            fy += dy;
        }

        let vx = vx + fx / self.mass * h;
        let vy = vy + fy / self.mass * h;
        self.kin.velocity = Vector::from_components(vx, vy);
        self.kin.position = Point2::new(self.kin.position.x + vx * h, self.kin.position.y + vy * h);

        self.kin.angular_velocity += moment / self.inertia * h;
        self.kin.heading = self.kin.heading.offset((self.kin.angular_velocity * h).to_degrees());
    }

    fn check_finite(&self) -> Result<(), PhysicsError> {
        let k = &self.kin;
        let fields = [
            ("velocity", k.velocity.magnitude()),
            ("velocity direction", k.velocity.angle().degrees()),
            ("angular velocity", k.angular_velocity),
            ("position.x", k.position.x),
            ("position.y", k.position.y),
            ("heading", k.heading.degrees()),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(PhysicsError::NonFinite { field, value, time: self.elapsed });
            }
        }
        Ok(())
    }

    // ── Actuators ────────────────────────────────────────────────────────────

    /// Positive commands turn the bow counter-clockwise (to port).
    pub fn set_rudder(&mut self, command: f64) {
        for foil in self.foils.iter_mut().filter(|f| f.kind() == FoilKind::Rudder) {
            foil.set_trim(-command);
        }
    }

    /// Sail chord angle relative to the boat's centreline, degrees. A
    /// sheeted sail is eased to swing up to `trim` either side instead.
    pub fn set_sail_trim(&mut self, trim: f64) {
        for foil in self.foils.iter_mut().filter(|f| f.kind() == FoilKind::Sail) {
            if foil.sheet().is_some() {
                foil.ease_sheet(trim);
            } else {
                foil.set_trim(trim);
            }
        }
    }

    // ── Environment ──────────────────────────────────────────────────────────

    pub fn set_wind(&mut self, wind: Vector) {
        self.wind = wind;
    }

    pub fn set_current(&mut self, current: Vector) {
        self.current = current;
    }

    pub fn set_position(&mut self, position: Point2) {
        self.kin.position = position;
    }

    pub fn set_heading(&mut self, heading: Angle) {
        self.kin.heading = heading.to_calc();
    }

    pub fn set_velocity(&mut self, velocity: Vector) {
        self.kin.velocity = velocity;
    }

    pub fn set_angular_velocity(&mut self, omega: f64) {
        self.kin.angular_velocity = omega;
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn position(&self) -> Point2 { self.kin.position }
    pub fn geo_position(&self) -> GeoPoint { self.frame.to_geo(&self.kin.position) }
    pub fn frame(&self) -> &LocalFrame { &self.frame }
    pub fn heading(&self) -> Angle { self.kin.heading }
    pub fn velocity(&self) -> Vector { self.kin.velocity }
    pub fn speed(&self) -> f64 { self.kin.velocity.magnitude() }
    /// rad/s
    pub fn angular_velocity(&self) -> f64 { self.kin.angular_velocity }
    pub fn wind(&self) -> Vector { self.wind }
    pub fn current(&self) -> Vector { self.current }
    pub fn mass(&self) -> f64 { self.mass }
    pub fn elapsed(&self) -> f64 { self.elapsed }
    pub fn foils(&self) -> &[Foil] { &self.foils }
    pub fn physics(&self) -> &PhysicsConfig { &self.physics }

    /// Calc bearing the wind blows from.
    pub fn wind_from(&self) -> Angle {
        self.wind.angle().reversed()
    }

    /// Apparent wind at the centroid, world frame.
    pub fn apparent_wind(&self) -> Vector {
        self.wind - self.kin.velocity
    }

    /// Flow `foil` sees, boat frame, including the boat's turn rate.
    pub fn apparent_flow_at(&self, foil: &Foil) -> Vector {
        let ambient = match foil.medium() {
            Medium::Air => self.wind,
            Medium::Water => self.current,
        };
        apparent_flow(&self.kin, ambient, foil.position())
    }

    pub fn sail(&self) -> Option<&Foil> {
        self.foils.iter().find(|f| f.kind() == FoilKind::Sail)
    }

    pub fn rudder(&self) -> Option<&Foil> {
        self.foils.iter().find(|f| f.kind() == FoilKind::Rudder)
    }

    pub fn snapshot(&self) -> BoatSnapshot {
        let geo = self.geo_position();
        let apparent = self.apparent_wind();
        BoatSnapshot {
            time_s: self.elapsed,
            x_m: self.kin.position.x,
            y_m: self.kin.position.y,
            lat: geo.lat,
            lon: geo.lon,
            heading_deg: self.kin.heading.degrees(),
            speed_mps: self.speed(),
            course_deg: self.kin.velocity.angle().degrees(),
            angular_velocity_dps: self.kin.angular_velocity.to_degrees(),
            wind_from_deg: self.wind_from().degrees(),
            wind_speed_mps: self.wind.magnitude(),
            apparent_wind_from_deg: apparent.angle().reversed().degrees(),
            apparent_wind_speed_mps: apparent.magnitude(),
            rudder_deg: self.rudder().map_or(0.0, |f| -f.trim().degrees()),
            sail_deg: self.sail().map_or(0.0, |f| f.trim().degrees()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::coefficients::{CoefficientRow, CoefficientTable};
    use crate::diagnostics::RecordingSink;
    use crate::foil::FoilSpec;

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn table() -> Arc<CoefficientTable> {
        Arc::new(
            CoefficientTable::new(vec![
                CoefficientRow::new(0.0, 0.0, 0.02),
                CoefficientRow::new(15.0, 1.0, 0.1),
                CoefficientRow::new(90.0, 0.0, 1.2),
                CoefficientRow::new(180.0, 0.0, 0.02),
            ])
            .unwrap(),
        )
    }

    fn foil(kind: FoilKind, medium: Medium, position: Vector) -> Foil {
        let density = if medium == Medium::Air { AIR_DENSITY } else { WATER_DENSITY };
        Foil::new(
            FoilSpec {
                name: kind.label().into(),
                kind,
                medium,
                position,
                orientation: Angle::calc(0.0),
                area: 0.3,
                density,
                inertia: 2.0,
                size: 1.0,
            },
            table(),
        )
        .unwrap()
    }

    fn boat_with(wind: Vector, sink: SharedSink) -> Boat {
        let setup = BoatSetup {
            foils: vec![
                foil(FoilKind::Hull, Medium::Water, Vector::ZERO),
                foil(FoilKind::Rudder, Medium::Water, Vector::new(Angle::calc(180.0), 0.8)),
                foil(FoilKind::Sail, Medium::Air, Vector::new(Angle::calc(0.0), 0.2)),
            ],
            mass: 15.0,
            start: GeoPoint::new(42.0, -71.0),
            heading: Angle::calc(90.0),
            wind,
            current: Vector::ZERO,
            windage: None,
        };
        Boat::new(setup, PhysicsConfig::default(), sink).unwrap()
    }

    fn calm_boat() -> Boat {
        boat_with(Vector::ZERO, RecordingSink::new())
    }

    // --- Construction ---

    #[test]
    fn rejects_empty_foils() {
        let setup = BoatSetup {
            foils: vec![],
            mass: 1.0,
            start: GeoPoint::default(),
            heading: Angle::ZERO,
            wind: Vector::ZERO,
            current: Vector::ZERO,
            windage: None,
        };
        let err = Boat::new(setup, PhysicsConfig::default(), RecordingSink::new()).unwrap_err();
        assert_eq!(err, ConfigurationError::NoFoils);
    }

    #[test]
    fn rejects_zero_mass() {
        let setup = BoatSetup {
            foils: vec![foil(FoilKind::Hull, Medium::Water, Vector::ZERO)],
            mass: 0.0,
            start: GeoPoint::default(),
            heading: Angle::ZERO,
            wind: Vector::ZERO,
            current: Vector::ZERO,
            windage: None,
        };
        assert!(matches!(
            Boat::new(setup, PhysicsConfig::default(), RecordingSink::new()),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn wind_from_west_blows_east() {
        // Calc bearings: 180° is west
        let w = flow_from(Angle::calc(180.0), 5.3);
        assert!((w.x() - 5.3).abs() < 1e-9);
        assert!(w.y().abs() < 1e-9);
    }

    // --- Integration ---

    #[test]
    fn zero_force_keeps_velocities() {
        let mut boat = calm_boat();
        for _ in 0..100 {
            boat.step(0.05).unwrap();
        }
        assert_eq!(boat.velocity(), Vector::ZERO);
        assert_eq!(boat.angular_velocity(), 0.0);
        assert_eq!(boat.position(), Point2::origin());
        assert!((boat.heading().degrees() - 90.0).abs() < 1e-12);
    }

    #[test]
    fn wind_pushes_drifting_boat_downwind() {
        let mut boat = boat_with(flow_from(Angle::calc(180.0), 5.0), RecordingSink::new());
        for _ in 0..50 {
            boat.step(0.03).unwrap();
        }
        assert!(boat.position().x > 0.0);
    }

    #[test]
    fn rejects_bad_time_step() {
        let mut boat = calm_boat();
        for dt in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                boat.step(dt),
                Err(crate::error::SimError::Validation(ValidationError::InvalidTimeStep(_)))
            ));
        }
    }

    #[test]
    fn non_finite_state_rolls_back() {
        let mut boat = calm_boat();
        boat.set_position(Point2::new(3.0, 4.0));
        boat.set_velocity(Vector::new(Angle::calc(0.0), 1.0));
        let before = boat.kin;
        boat.set_wind(Vector::new(Angle::calc(0.0), f64::INFINITY));
        let err = boat.step(0.03).unwrap_err();
        assert!(matches!(err, crate::error::SimError::Physics(_)));
        assert_eq!(boat.kin, before);
        assert_eq!(boat.elapsed(), 0.0);
    }

    #[test]
    fn overspeed_is_clamped_and_reported() {
        let sink = RecordingSink::new();
        let mut boat = boat_with(Vector::ZERO, sink.clone());
        boat.set_velocity(Vector::new(Angle::calc(90.0), 80.0));
        boat.step(0.01).unwrap();
        assert!(boat.speed() <= MAX_REALISTIC_BOAT_SPEED);
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, Diagnostic::SpeedClamped { limit, .. } if *limit == MAX_REALISTIC_BOAT_SPEED)));
    }

    #[test]
    fn spinning_boat_sees_extra_flow_at_the_sail() {
        let mut boat = boat_with(flow_from(Angle::calc(0.0), 5.0), RecordingSink::new());
        boat.set_angular_velocity(1.0);
        // sail 0.2 m forward, bow north, turning counter-clockwise: moving west
        let flow = boat.apparent_flow_at(boat.sail().unwrap());
        let centroid = boat.apparent_wind().rotate(-90.0);
        assert!((flow.x() - centroid.x()).abs() < 1e-9);
        assert!((flow.y() - (centroid.y() - 0.2)).abs() < 1e-9);
    }

    #[test]
    fn sheeted_sail_swings_while_the_boat_steps() {
        let sail = foil(FoilKind::Sail, Medium::Air, Vector::new(Angle::calc(0.0), 0.2))
            .with_sheet(1.0)
            .unwrap();
        let setup = BoatSetup {
            foils: vec![foil(FoilKind::Hull, Medium::Water, Vector::ZERO), sail],
            mass: 15.0,
            start: GeoPoint::new(42.0, -71.0),
            heading: Angle::calc(90.0),
            // from the west: over the port beam of a boat heading north
            wind: flow_from(Angle::calc(180.0), 5.0),
            current: Vector::ZERO,
            windage: None,
        };
        let mut boat = Boat::new(setup, PhysicsConfig::default(), RecordingSink::new()).unwrap();
        boat.set_sail_trim(35.0);
        for _ in 0..20 {
            boat.step(0.03).unwrap();
        }
        assert!((boat.snapshot().sail_deg - 35.0).abs() < 1e-9);
    }

    #[test]
    fn rudder_command_turns_bow_to_port() {
        let mut boat = calm_boat();
        // moving along the heading (north) through still water
        boat.set_velocity(Vector::new(Angle::calc(90.0), 2.0));
        boat.set_rudder(10.0);
        for _ in 0..10 {
            boat.step(0.03).unwrap();
        }
        assert!(boat.angular_velocity() > 0.0);
        assert_eq!(boat.snapshot().rudder_deg, 10.0);
    }
}
