//! foil.rs — Lift/drag force model for hulls, rudders and sails
//!
//! Every force-producing appendage is modelled the same way: a chord
//! direction in the boat frame, an apparent flow vector, and a coefficient
//! table. Flow vectors point where the fluid is travelling.
//!
//! Sign conventions (boat frame, X = bow, Y = port):
//! - chord = `orientation + trim`, the direction the leading edge points
//! - signed angle of attack = `angular_difference(incoming, chord)`
//! - moment = `position × force`, positive counter-clockwise
//!
//! A sail with a sheet is not set directly. Its trim swings under its own
//! aerodynamic moment about the mast, stopped by the eased sheet.

use std::sync::Arc;

use sail_types::{angular_difference, Angle, Vector};
use serde::{Deserialize, Serialize};

use crate::coefficients::CoefficientTable;
use crate::constants::*;
use crate::error::ConfigurationError;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoilKind {
    Hull,
    Rudder,
    Sail,
}

impl FoilKind {
    pub fn label(self) -> &'static str {
        match self {
            FoilKind::Hull => "hull",
            FoilKind::Rudder => "rudder",
            FoilKind::Sail => "sail",
        }
    }
}

/// Which ambient flow a foil sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medium {
    Water,
    Air,
}

/// Already-validated physical description of one foil.
#[derive(Debug, Clone)]
pub struct FoilSpec {
    pub name: String,
    pub kind: FoilKind,
    pub medium: Medium,
    /// Offset of the centre of effort from the boat centroid, boat frame
    pub position: Vector,
    /// Resting chord direction, boat frame
    pub orientation: Angle,
    /// m²
    pub area: f64,
    /// kg/m³
    pub density: f64,
    /// kg·m², contribution to the boat's yaw inertia
    pub inertia: f64,
    /// Characteristic length, m
    pub size: f64,
}

/// Force and moment produced by one foil, boat frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FoilLoad {
    pub force: Vector,
    pub moment: f64,
}

/// Sheet state of a free-swinging sail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sheet {
    /// Widest swing the full sheet length allows, degrees
    pub max_swing: f64,
    /// Current swing limit set by easing the sheet, degrees
    pub limit: f64,
    /// rad/s about the mast
    pub rate: f64,
}

#[derive(Debug, Clone)]
pub struct Foil {
    spec: FoilSpec,
    trim: Angle,
    table: Arc<CoefficientTable>,
    sheet: Option<Sheet>,
}

// ── Foil ──────────────────────────────────────────────────────────────────────

impl Foil {
    pub fn new(spec: FoilSpec, table: Arc<CoefficientTable>) -> Result<Self, ConfigurationError> {
        positive(&spec.name, "area", spec.area)?;
        positive(&spec.name, "density", spec.density)?;
        positive(&spec.name, "size", spec.size)?;
        if !spec.inertia.is_finite() || spec.inertia < 0.0 {
            return Err(ConfigurationError::InvalidParameter {
                field: format!("{}.inertia", spec.name),
                value: spec.inertia,
                expected: "finite and >= 0",
            });
        }
        if !spec.position.is_finite() || !spec.orientation.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                field: format!("{}.position", spec.name),
                value: spec.position.magnitude(),
                expected: "finite position and orientation",
            });
        }
        Ok(Self { spec, trim: Angle::display(0.0), table, sheet: None })
    }

    /// Let the sail swing freely on a sheet of `length` metres.
    ///
    /// The sheet runs from the boom end to the centreline one boom length
    /// aft of the mast, so it stops the boom at `2·asin(length / 2·size)`.
    pub fn with_sheet(mut self, length: f64) -> Result<Self, ConfigurationError> {
        if self.spec.kind != FoilKind::Sail {
            return Err(ConfigurationError::InvalidParameter {
                field: format!("{}.sheet_length", self.spec.name),
                value: length,
                expected: "set on sails only",
            });
        }
        positive(&self.spec.name, "sheet_length", length)?;
        let max_swing = 2.0 * (length / (2.0 * self.spec.size)).min(1.0).asin().to_degrees();
        self.sheet = Some(Sheet { max_swing, limit: max_swing, rate: 0.0 });
        Ok(self)
    }

    pub fn name(&self) -> &str { &self.spec.name }
    pub fn kind(&self) -> FoilKind { self.spec.kind }
    pub fn medium(&self) -> Medium { self.spec.medium }
    pub fn position(&self) -> Vector { self.spec.position }
    pub fn orientation(&self) -> Angle { self.spec.orientation }
    pub fn inertia(&self) -> f64 { self.spec.inertia }
    pub fn area(&self) -> f64 { self.spec.area }
    pub fn table(&self) -> &Arc<CoefficientTable> { &self.table }

    /// Current actuation, degrees, signed.
    pub fn trim(&self) -> Angle { self.trim }

    pub fn set_trim(&mut self, degrees: f64) {
        self.trim = Angle::display(degrees);
    }

    pub fn sheet(&self) -> Option<&Sheet> { self.sheet.as_ref() }

    /// Ease or haul the sheet so the boom can reach `degrees` either side.
    /// Hauling in past the current trim pulls the boom with it.
    pub fn ease_sheet(&mut self, degrees: f64) {
        let Some(sheet) = self.sheet.as_mut() else { return };
        sheet.limit = degrees.abs().min(sheet.max_swing);
        let trim = self.trim.degrees();
        if trim.abs() > sheet.limit {
            self.trim = Angle::display(sheet.limit.copysign(trim));
            sheet.rate = 0.0;
        }
    }

    /// Trim and sheet state, for rolling a failed step back.
    pub(crate) fn actuation(&self) -> (Angle, Option<Sheet>) {
        (self.trim, self.sheet)
    }

    pub(crate) fn restore_actuation(&mut self, (trim, sheet): (Angle, Option<Sheet>)) {
        self.trim = trim;
        self.sheet = sheet;
    }

    /// Advance a sheeted sail by `h` seconds in apparent `flow` (boat frame).
    /// The boom stops dead when it reaches the sheet limit.
    pub fn swing(&mut self, flow: &Vector, h: f64) {
        let trim = self.trim.degrees();
        let lever = Vector::new(self.chord_at(trim).reversed(), SAIL_CENTRE_OF_EFFORT);
        let torque = lever.cross(&self.load_at_trim(flow, trim).force);
        let Some(sheet) = self.sheet.as_mut() else { return };

        sheet.rate += (torque - SAIL_SWING_DAMPING * sheet.rate) / SAIL_SWING_INERTIA * h;
        let next = trim + (sheet.rate * h).to_degrees();
        if next.abs() >= sheet.limit {
            self.trim = Angle::display(sheet.limit.copysign(next));
            sheet.rate = 0.0;
        } else {
            self.trim = Angle::display(next);
        }
    }

    /// Chord direction in the boat frame for a given trim.
    pub fn chord_at(&self, trim: f64) -> Angle {
        self.spec.orientation.to_calc().offset(trim)
    }

    /// Signed angle of attack, degrees in (-180, 180]. Zero flow gives 0.
    pub fn angle_of_attack(&self, flow: &Vector) -> f64 {
        signed_aoa(flow, self.chord_at(self.trim.degrees()))
    }

    pub fn load(&self, flow: &Vector) -> FoilLoad {
        self.load_at_trim(flow, self.trim.degrees())
    }

    /// Force and moment the foil would produce at `trim`, without moving it.
    pub fn load_at_trim(&self, flow: &Vector, trim: f64) -> FoilLoad {
        if flow.magnitude() == 0.0 {
            return FoilLoad::default();
        }
        let signed = signed_aoa(flow, self.chord_at(trim));
        let (cl, cd) = self.table.lookup(signed.abs());

        let q = 0.5 * self.spec.density * flow.magnitude().powi(2) * self.spec.area;
        let drag = Vector::new(flow.angle(), cd * q);
        // lift is perpendicular to the flow, on the side the chord is inclined towards
        let side = if signed > 0.0 { -90.0 } else { 90.0 };
        let lift = Vector::new(flow.angle().offset(side), cl * q);

        let force = lift + drag;
        FoilLoad { force, moment: self.spec.position.cross(&force) }
    }
}

fn signed_aoa(flow: &Vector, chord: Angle) -> f64 {
    if flow.magnitude() == 0.0 {
        return 0.0;
    }
    angular_difference(flow.angle().reversed(), chord)
}

fn positive(foil: &str, field: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidParameter {
            field: format!("{foil}.{field}"),
            value,
            expected: "finite and > 0",
        })
    }
}
