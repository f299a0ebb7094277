//! vector.rs — Polar 2D vectors and planar points

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::{angular_difference, Angle, Convention};

// ── Vector ────────────────────────────────────────────────────────────────────

/// 2D vector stored as a Calc angle plus a non-negative magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVector")]
pub struct Vector {
    angle: Angle,
    magnitude: f64,
}

#[derive(Deserialize)]
struct RawVector {
    angle: Angle,
    magnitude: f64,
}

impl From<RawVector> for Vector {
    fn from(raw: RawVector) -> Self {
        Vector::new(raw.angle, raw.magnitude)
    }
}

impl Default for Vector {
    fn default() -> Self { Self::ZERO }
}

impl Vector {
    pub const ZERO: Vector = Vector {
        angle: Angle { value: 0.0, convention: Convention::Calc },
        magnitude: 0.0,
    };

    /// Any angle convention is accepted and stored as Calc. A negative
    /// magnitude is turned into a positive one pointing the other way.
    pub fn new(angle: Angle, magnitude: f64) -> Self {
        let angle = angle.to_calc();
        if magnitude == 0.0 {
            Self::ZERO
        } else if magnitude < 0.0 {
            Self { angle: angle.offset(180.0), magnitude: -magnitude }
        } else {
            Self { angle, magnitude }
        }
    }

    pub fn from_components(x: f64, y: f64) -> Self {
        let magnitude = x.hypot(y);
        if magnitude == 0.0 {
            return Self::ZERO;
        }
        Self { angle: Angle::from_radians(y.atan2(x)), magnitude }
    }

    pub fn angle(&self) -> Angle { self.angle }
    pub fn magnitude(&self) -> f64 { self.magnitude }
    pub fn x(&self) -> f64 { self.magnitude * self.angle.radians().cos() }
    pub fn y(&self) -> f64 { self.magnitude * self.angle.radians().sin() }

    pub fn decompose(&self) -> (f64, f64) {
        (self.x(), self.y())
    }

    pub fn is_finite(&self) -> bool {
        self.magnitude.is_finite() && self.angle.is_finite()
    }

    pub fn add(&self, other: &Vector) -> Vector {
        Vector::from_components(self.x() + other.x(), self.y() + other.y())
    }

    pub fn sub(&self, other: &Vector) -> Vector {
        Vector::from_components(self.x() - other.x(), self.y() - other.y())
    }

    pub fn scale(&self, k: f64) -> Vector {
        Vector::new(self.angle, self.magnitude * k)
    }

    pub fn dot(&self, other: &Vector) -> f64 {
        self.x() * other.x() + self.y() * other.y()
    }

    /// Z component of the 3D cross product.
    pub fn cross(&self, other: &Vector) -> f64 {
        self.x() * other.y() - self.y() * other.x()
    }

    /// Rotate counter-clockwise by `degrees`.
    pub fn rotate(&self, degrees: f64) -> Vector {
        if self.magnitude == 0.0 {
            return Self::ZERO;
        }
        Vector { angle: self.angle.offset(degrees), magnitude: self.magnitude }
    }

    /// Same direction, magnitude 1. The zero vector stays zero.
    pub fn unit(&self) -> Vector {
        if self.magnitude == 0.0 { Self::ZERO } else { Vector { angle: self.angle, magnitude: 1.0 } }
    }

    /// Signed angle from this vector's direction to `other`'s, in degrees.
    pub fn angle_to(&self, other: &Vector) -> f64 {
        angular_difference(self.angle, other.angle)
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector { Vector::add(&self, &rhs) }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector { Vector::sub(&self, &rhs) }
}

impl Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, k: f64) -> Vector { self.scale(k) }
}

impl Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector { self.scale(-1.0) }
}

impl std::iter::Sum for Vector {
    fn sum<I: Iterator<Item = Vector>>(iter: I) -> Vector {
        let (x, y) = iter.fold((0.0, 0.0), |(x, y), v| (x + v.x(), y + v.y()));
        Vector::from_components(x, y)
    }
}

// ── Point2 ────────────────────────────────────────────────────────────────────

/// Position in the local planar frame, metres (X = east, Y = north).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }
    pub fn origin() -> Self { Self { x: 0.0, y: 0.0 } }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Vector pointing from `self` to `other`.
    pub fn displacement_to(&self, other: &Point2) -> Vector {
        Vector::from_components(other.x - self.x, other.y - self.y)
    }

    /// Calc bearing from `self` to `other`. Coincident points give 0°.
    pub fn bearing_to(&self, other: &Point2) -> Angle {
        self.displacement_to(other).angle()
    }

    pub fn translate(&self, v: &Vector) -> Point2 {
        Point2::new(self.x + v.x(), self.y + v.y())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn negative_magnitude_flips_direction() {
        let v = Vector::new(Angle::calc(30.0), -2.0);
        assert_eq!(v.magnitude(), 2.0);
        assert!((v.angle().degrees() - 210.0).abs() < EPS);
    }

    #[test]
    fn display_angle_is_stored_as_calc() {
        let v = Vector::new(Angle::display(-90.0), 1.0);
        assert_eq!(v.angle().convention(), Convention::Calc);
        assert!((v.angle().degrees() - 270.0).abs() < EPS);
    }

    #[test]
    fn zero_vector_is_stable() {
        let z = Vector::from_components(-0.0, -0.0);
        assert_eq!(z, Vector::ZERO);
        assert_eq!(z.rotate(90.0), Vector::ZERO);
        assert_eq!(z.unit(), Vector::ZERO);
        assert_eq!(Vector::new(Angle::calc(123.0), 0.0).magnitude(), 0.0);
    }

    #[test]
    fn apparent_flow_is_flow_minus_velocity() {
        // 5 m/s wind blowing east, boat moving east at 2 m/s
        let wind = Vector::new(Angle::calc(0.0), 5.0);
        let boat = Vector::new(Angle::calc(0.0), 2.0);
        let apparent = wind - boat;
        assert!((apparent.magnitude() - 3.0).abs() < EPS);
        assert!(apparent.angle().degrees().abs() < EPS);
    }

    #[test]
    fn cross_is_counter_clockwise_positive() {
        let arm = Vector::new(Angle::calc(0.0), 1.0);
        let push = Vector::new(Angle::calc(90.0), 1.0);
        assert!((arm.cross(&push) - 1.0).abs() < EPS);
        assert!((push.cross(&arm) + 1.0).abs() < EPS);
    }

    #[test]
    fn sum_of_opposites_is_zero() {
        let a = Vector::new(Angle::calc(45.0), 3.0);
        let total: Vector = [a, -a].into_iter().sum();
        assert!(total.magnitude() < EPS);
    }

    #[test]
    fn bearing_between_points() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(0.0, 10.0);
        assert!((a.bearing_to(&b).degrees() - 90.0).abs() < EPS);
        assert!((a.distance_to(&b) - 10.0).abs() < EPS);
    }

    proptest! {
        #[test]
        fn decompose_round_trip(deg in 0.0f64..360.0, mag in 1e-6f64..1e6) {
            let v = Vector::new(Angle::calc(deg), mag);
            let (x, y) = v.decompose();
            let back = Vector::from_components(x, y);
            prop_assert!((back.magnitude() - mag).abs() <= 1e-9 * mag.max(1.0));
            prop_assert!(angular_difference(v.angle(), back.angle()).abs() < 1e-6);
        }

        #[test]
        fn zero_magnitude_round_trip(deg in -720.0f64..720.0) {
            let v = Vector::new(Angle::calc(deg), 0.0);
            let (x, y) = v.decompose();
            prop_assert_eq!(Vector::from_components(x, y).magnitude(), 0.0);
        }
    }
}
