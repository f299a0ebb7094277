//! Integration tests for the full simulate-and-steer pipeline.
//!
//! Exercises: datasheets → Foils → Boat → Controller → ticks,
//! plus the bundled `config.toml` and config loading from disk.
//!
//! All tests are pure logic with no server and no sockets.

use std::path::PathBuf;
use std::sync::Arc;

use sail_simulator::constants::{AIR_DENSITY, MAX_REALISTIC_BOAT_SPEED, WATER_DENSITY};
use sail_simulator::{
    flow_from, Boat, BoatSetup, CoefficientTable, Controller, ControllerConfig, Diagnostic, Foil, FoilKind,
    FoilSpec, Medium, PhysicsConfig, PlanMode, RecordingSink, SimulatorConfig,
};
use sail_types::{Angle, GeoPoint, LocalFrame, Point2, Vector};

// ── Helpers ────────────────────────────────────────────────────────────

const START: GeoPoint = GeoPoint { lat: 42.3601, lon: -71.0589 };

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

fn foil(name: &str, kind: FoilKind, medium: Medium, sheet: &str, position: Vector, area: f64, inertia: f64) -> Foil {
    let table = Arc::new(CoefficientTable::from_path(data(sheet)).unwrap());
    Foil::new(
        FoilSpec {
            name: name.into(),
            kind,
            medium,
            position,
            orientation: Angle::calc(0.0),
            area,
            density: match medium {
                Medium::Water => WATER_DENSITY,
                Medium::Air => AIR_DENSITY,
            },
            inertia,
            size: 1.2,
        },
        table,
    )
    .unwrap()
}

/// Hull + rudder + mainsail, 15 kg, wind 5.3 m/s from 270°.
fn reference_boat(sink: Arc<RecordingSink>) -> Boat {
    let setup = BoatSetup {
        foils: vec![
            foil("vaka", FoilKind::Hull, Medium::Water, "hull.csv", Vector::ZERO, 0.3, 3.0),
            foil("rudder", FoilKind::Rudder, Medium::Water, "rudder.csv", Vector::new(Angle::calc(180.0), 0.6), 0.02, 0.05),
            foil("mainsail", FoilKind::Sail, Medium::Air, "mainsail.csv", Vector::new(Angle::calc(0.0), 0.1), 0.8, 0.5),
        ],
        mass: 15.0,
        start: START,
        heading: Angle::calc(0.0),
        wind: flow_from(Angle::calc(270.0), 5.3),
        current: Vector::ZERO,
        windage: None,
    };
    Boat::new(setup, PhysicsConfig::default(), sink).unwrap()
}

fn geo(x: f64, y: f64) -> GeoPoint {
    LocalFrame::new(START).to_geo(&Point2::new(x, y))
}

fn assert_sane(ctl: &Controller) {
    let b = ctl.boat();
    let heading = b.heading().degrees();
    assert!((0.0..360.0).contains(&heading), "heading {heading}");
    assert!(b.speed() >= 0.0 && b.speed() <= MAX_REALISTIC_BOAT_SPEED, "speed {}", b.speed());
    assert!(b.position().is_finite());
    assert!(b.angular_velocity().is_finite());
    assert!(ctl.rudder_angle().is_finite() && ctl.sail_angle().is_finite());
}

// ── Reference run ──────────────────────────────────────────────────────

#[test]
fn thirty_ticks_stay_finite_and_bounded() {
    let sink = RecordingSink::new();
    let mut ctl = Controller::new(reference_boat(sink.clone()), ControllerConfig::default(), None, sink).unwrap();
    ctl.plan(PlanMode::Precision, vec![geo(100.0, 0.0)]).unwrap();

    for _ in 0..30 {
        ctl.step(0.033).unwrap();
        assert_sane(&ctl);
    }
    assert!((ctl.boat().elapsed() - 30.0 * 0.033).abs() < 1e-9);
}

#[test]
fn long_run_makes_headway_toward_a_reaching_mark() {
    let sink = RecordingSink::new();
    let mut ctl = Controller::new(reference_boat(sink.clone()), ControllerConfig::default(), None, sink).unwrap();
    let mark = Point2::new(100.0, 0.0);
    ctl.plan(PlanMode::Precision, vec![geo(mark.x, mark.y)]).unwrap();

    let start_distance = ctl.boat().position().distance_to(&mark);
    for _ in 0..1500 {
        if ctl.state().course_complete {
            break;
        }
        ctl.step(0.033).unwrap();
        assert_sane(&ctl);
    }
    assert!(ctl.boat().position().distance_to(&mark) < start_distance);
}

#[test]
fn upwind_mark_is_approached_on_a_layline() {
    let sink = RecordingSink::new();
    let mut ctl = Controller::new(reference_boat(sink.clone()), ControllerConfig::default(), None, sink).unwrap();
    // wind from the south: a mark straight south is dead upwind
    ctl.plan(PlanMode::Precision, vec![geo(0.0, -200.0)]).unwrap();
    ctl.step(0.033).unwrap();

    let s = ctl.state();
    assert!(s.tack_side.is_some());
    assert!(s.intermediate.is_some());
    let off_wind = sail_types::angular_difference(Angle::calc(270.0), Angle::calc(s.target_heading_deg.unwrap()));
    assert!((off_wind.abs() - 45.0).abs() < 1e-6);
}

#[test]
fn station_keeping_runs_and_reports_transitions() {
    let sink = RecordingSink::new();
    let mut ctl = Controller::new(reference_boat(sink.clone()), ControllerConfig::default(), None, sink.clone()).unwrap();
    ctl.plan(PlanMode::StationKeeping, vec![geo(-5.0, -5.0), geo(5.0, 5.0)]).unwrap();

    for _ in 0..300 {
        ctl.step(0.033).unwrap();
        assert_sane(&ctl);
    }
    // starts inside the outer box, so the first tick leaves ENTERING
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, Diagnostic::StationTransition { .. })));
}

// ── Config-driven runs ─────────────────────────────────────────────────

#[test]
fn bundled_config_builds_and_runs() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.toml");
    let cfg = SimulatorConfig::from_path(&path).unwrap();
    let mut ctl = cfg.build_controller(RecordingSink::new()).unwrap();

    assert_eq!(ctl.boat().foils().len(), 3);
    assert_eq!(ctl.state().waypoint_count, 3);
    // polar present: best upwind angle comes from it
    assert!(ctl.best_upwind_angle() > 0.0 && ctl.best_upwind_angle() <= 90.0);

    for _ in 0..30 {
        ctl.step(cfg.simulation.dt).unwrap();
        assert_sane(&ctl);
    }
}

#[test]
fn config_from_temp_dir_with_absolute_datasheets() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!(
        r#"
[wind]
from_deg = 270.0
speed_mps = 5.3

[boat]
mass_kg = 15.0

[[foils]]
name = "vaka"
kind = "hull"
datasheet = "{hull}"
wetted_area = 0.3
rotational_inertia = 3.0
size = 1.2

[[foils]]
name = "rudder"
kind = "rudder"
datasheet = "{rudder}"
wetted_area = 0.02
size = 0.15

[[foils]]
name = "main"
kind = "sail"
datasheet = "{sail}"
wetted_area = 0.8
rotational_inertia = 0.5
size = 1.4

[course]
mode = "endurance"
waypoints = [ {{ lat = 0.0005, lon = 0.0 }}, {{ lat = 0.0, lon = 0.0005 }} ]
"#,
        hull = data("hull.csv").display(),
        rudder = data("rudder.csv").display(),
        sail = data("mainsail.csv").display(),
    );
    let path = dir.path().join("sim.toml");
    std::fs::write(&path, text).unwrap();

    let cfg = SimulatorConfig::from_path(&path).unwrap();
    let mut ctl = cfg.build_controller(RecordingSink::new()).unwrap();
    assert_eq!(ctl.state().mode, Some(PlanMode::Endurance));
    for _ in 0..30 {
        ctl.step(0.033).unwrap();
        assert_sane(&ctl);
    }
}
