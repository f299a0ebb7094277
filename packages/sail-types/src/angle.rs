//! angle.rs — Convention-tagged angles
//!
//! Three conventions coexist:
//! - `Data`   : [0, 180], the symmetric-foil lookup domain
//! - `Calc`   : [0, 360), mathematical bearing, 0° = +X, counter-clockwise
//! - `Display`: (-180, 180], signed
//!
//! An [`Angle`] is always normalized into the range of its tag. Changing the
//! tag goes through [`Angle::convert`]; nothing converts implicitly.

use serde::{Deserialize, Serialize};

use crate::ValueError;

// ── Convention ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Convention {
    /// [0, 180]
    Data,
    /// [0, 360)
    Calc,
    /// (-180, 180]
    Display,
}

impl Convention {
    /// Fold a raw degree value into this convention's canonical range.
    ///
    /// Non-finite input stays non-finite; callers validate before they trust it.
    pub fn normalize(self, degrees: f64) -> f64 {
        let calc = fold_calc(degrees);
        match self {
            Convention::Calc => calc,
            Convention::Display => calc_to_display(calc),
            Convention::Data => calc_to_display(calc).abs(),
        }
    }
}

fn fold_calc(degrees: f64) -> f64 {
    let v = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if v >= 360.0 { 0.0 } else { v }
}

fn calc_to_display(v: f64) -> f64 {
    if v > 180.0 { v - 360.0 } else { v }
}

// ── Angle ─────────────────────────────────────────────────────────────────────

/// An angle in degrees plus the convention it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAngle")]
pub struct Angle {
    pub(crate) value: f64,
    pub(crate) convention: Convention,
}

#[derive(Deserialize)]
struct RawAngle {
    value: f64,
    convention: Convention,
}

impl From<RawAngle> for Angle {
    fn from(raw: RawAngle) -> Self {
        Angle::new(raw.value, raw.convention)
    }
}

impl Angle {
    pub const ZERO: Angle = Angle { value: 0.0, convention: Convention::Calc };

    pub fn new(degrees: f64, convention: Convention) -> Self {
        Self { value: convention.normalize(degrees), convention }
    }

    pub fn calc(degrees: f64) -> Self { Self::new(degrees, Convention::Calc) }
    pub fn data(degrees: f64) -> Self { Self::new(degrees, Convention::Data) }
    pub fn display(degrees: f64) -> Self { Self::new(degrees, Convention::Display) }

    pub fn from_radians(radians: f64) -> Self {
        Self::calc(radians.to_degrees())
    }

    pub fn degrees(&self) -> f64 { self.value }
    pub fn radians(&self) -> f64 { self.value.to_radians() }
    pub fn convention(&self) -> Convention { self.convention }
    pub fn is_finite(&self) -> bool { self.value.is_finite() }

    /// Re-fold the value into its convention's range.
    pub fn normalize(self) -> Self {
        Self::new(self.value, self.convention)
    }

    /// Express this angle in another convention.
    ///
    /// `Data → Calc` and `Data → Display` are the identity because [0, 180]
    /// lies inside both ranges. Anything `→ Data` folds symmetrically, so the
    /// sign of a Display angle (or the side of a Calc bearing) is discarded.
    pub fn convert(self, target: Convention) -> Self {
        use Convention::*;
        let value = match (self.convention, target) {
            (Data, Data) | (Calc, Calc) | (Display, Display) => self.value,
            (Data, Calc) | (Data, Display) => self.value,
            (Calc, Display) => calc_to_display(self.value),
            (Display, Calc) => {
                if self.value < 0.0 { fold_calc(self.value + 360.0) } else { self.value }
            }
            (Calc, Data) => calc_to_display(self.value).abs(),
            (Display, Data) => self.value.abs(),
        };
        Self { value, convention: target }
    }

    pub fn to_calc(self) -> Self { self.convert(Convention::Calc) }
    pub fn to_display(self) -> Self { self.convert(Convention::Display) }
    pub fn to_data(self) -> Self { self.convert(Convention::Data) }

    /// Add a raw number of degrees, keeping the convention.
    pub fn offset(self, degrees: f64) -> Self {
        Self::new(self.value + degrees, self.convention)
    }

    /// The opposite direction, as a Calc angle.
    pub fn reversed(self) -> Self {
        self.to_calc().offset(180.0)
    }

    pub fn try_add(self, other: Angle) -> Result<Angle, ValueError> {
        self.same_convention(&other)?;
        Ok(Self::new(self.value + other.value, self.convention))
    }

    pub fn try_sub(self, other: Angle) -> Result<Angle, ValueError> {
        self.same_convention(&other)?;
        Ok(Self::new(self.value - other.value, self.convention))
    }

    fn same_convention(&self, other: &Angle) -> Result<(), ValueError> {
        if self.convention == other.convention {
            Ok(())
        } else {
            Err(ValueError::ConventionMismatch {
                left: self.convention,
                right: other.convention,
            })
        }
    }
}

impl std::fmt::Display for Angle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}°", self.value)
    }
}

/// Shortest signed rotation from `a` to `b`, in degrees, within (-180, 180].
///
/// Both angles are taken as bearings, so their tags need not match.
pub fn angular_difference(a: Angle, b: Angle) -> f64 {
    let from = a.to_calc().value;
    let to = b.to_calc().value;
    Convention::Display.normalize(to - from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // --- Normalization ---

    #[test]
    fn calc_wraps_negative_and_large_values() {
        assert!(close(Angle::calc(-90.0).degrees(), 270.0));
        assert!(close(Angle::calc(720.0 + 45.0).degrees(), 45.0));
        assert_eq!(Angle::calc(360.0).degrees(), 0.0);
    }

    #[test]
    fn tiny_negative_does_not_land_on_360() {
        let a = Angle::calc(-1e-17);
        assert!(a.degrees() < 360.0);
    }

    #[test]
    fn display_keeps_positive_180() {
        assert_eq!(Angle::display(180.0).degrees(), 180.0);
        assert_eq!(Angle::display(-180.0).degrees(), 180.0);
        assert!(close(Angle::display(190.0).degrees(), -170.0));
    }

    #[test]
    fn data_folds_symmetrically() {
        assert!(close(Angle::data(270.0).degrees(), 90.0));
        assert!(close(Angle::data(-30.0).degrees(), 30.0));
        assert_eq!(Angle::data(180.0).degrees(), 180.0);
    }

    // --- Conversion ---

    #[test]
    fn calc_display_conversion() {
        assert!(close(Angle::calc(350.0).to_display().degrees(), -10.0));
        assert!(close(Angle::display(-10.0).to_calc().degrees(), 350.0));
        assert_eq!(Angle::calc(350.0).to_display().convention(), Convention::Display);
    }

    #[test]
    fn mixed_convention_arithmetic_is_refused() {
        let err = Angle::calc(10.0).try_add(Angle::display(10.0)).unwrap_err();
        assert_eq!(
            err,
            ValueError::ConventionMismatch { left: Convention::Calc, right: Convention::Display }
        );
        let ok = Angle::calc(350.0).try_add(Angle::display(20.0).to_calc()).unwrap();
        assert!(close(ok.degrees(), 10.0));
    }

    #[test]
    fn deserialize_normalizes() {
        let a: Angle = serde_json::from_str(r#"{"value": -90.0, "convention": "CALC"}"#).unwrap();
        assert!(close(a.degrees(), 270.0));
    }

    // --- Angular difference ---

    #[test]
    fn angular_difference_takes_short_way() {
        assert!(close(angular_difference(Angle::calc(350.0), Angle::calc(10.0)), 20.0));
        assert!(close(angular_difference(Angle::calc(10.0), Angle::calc(350.0)), -20.0));
        assert_eq!(angular_difference(Angle::calc(0.0), Angle::calc(180.0)), 180.0);
        assert_eq!(angular_difference(Angle::calc(180.0), Angle::calc(0.0)), 180.0);
    }

    proptest! {
        #[test]
        fn calc_normalize_in_range(x in -1.0e6f64..1.0e6) {
            let v = Angle::calc(x).degrees();
            prop_assert!((0.0..360.0).contains(&v));
        }

        #[test]
        fn display_normalize_in_range(x in -1.0e6f64..1.0e6) {
            let v = Angle::display(x).degrees();
            prop_assert!(v > -180.0 && v <= 180.0);
        }

        #[test]
        fn data_calc_data_round_trip(x in 0.0f64..=180.0) {
            let back = Angle::data(x).to_calc().to_data();
            prop_assert!((back.degrees() - x).abs() < 1e-9);
        }

        #[test]
        fn calc_display_calc_round_trip(x in 0.0f64..360.0) {
            let back = Angle::calc(x).to_display().to_calc();
            // 359.999… may come back as 0; compare on the circle
            let diff = angular_difference(Angle::calc(x), back).abs();
            prop_assert!(diff < 1e-9);
        }

        #[test]
        fn angular_difference_in_range(a in -720.0f64..720.0, b in -720.0f64..720.0) {
            let d = angular_difference(Angle::calc(a), Angle::calc(b));
            prop_assert!(d > -180.0 && d <= 180.0);
        }
    }
}
