//! geo.rs — Geographic coordinates and the local planar frame

use serde::{Deserialize, Serialize};

use crate::{Point2, ValueError};

/// Metres per degree of latitude (spherical approximation).
pub const METERS_PER_DEGREE_LAT: f64 = 111_111.0;

/// WGS-84 position, degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }

    /// Finite, latitude within ±90, longitude within ±180.
    pub fn validate(&self) -> Result<(), ValueError> {
        check("latitude", self.lat, 90.0)?;
        check("longitude", self.lon, 180.0)
    }
}

fn check(what: &'static str, value: f64, limit: f64) -> Result<(), ValueError> {
    if !value.is_finite() {
        return Err(ValueError::NonFinite { what, value });
    }
    if value.abs() > limit {
        return Err(ValueError::OutOfRange { what, value, min: -limit, max: limit });
    }
    Ok(())
}

/// Equirectangular projection around a fixed origin.
///
/// Good to a few centimetres over the few-kilometre courses the simulator
/// runs; not meant for ocean passages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalFrame {
    pub origin: GeoPoint,
}

impl LocalFrame {
    pub fn new(origin: GeoPoint) -> Self { Self { origin } }

    fn meters_per_degree_lon(&self) -> f64 {
        METERS_PER_DEGREE_LAT * self.origin.lat.to_radians().cos()
    }

    pub fn to_local(&self, p: &GeoPoint) -> Point2 {
        Point2 {
            x: (p.lon - self.origin.lon) * self.meters_per_degree_lon(),
            y: (p.lat - self.origin.lat) * METERS_PER_DEGREE_LAT,
        }
    }

    pub fn to_geo(&self, p: &Point2) -> GeoPoint {
        let per_lon = self.meters_per_degree_lon();
        GeoPoint {
            lat: self.origin.lat + p.y / METERS_PER_DEGREE_LAT,
            lon: if per_lon.abs() < f64::EPSILON {
                self.origin.lon
            } else {
                self.origin.lon + p.x / per_lon
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_north_is_111km() {
        let frame = LocalFrame::new(GeoPoint::new(0.0, 0.0));
        let p = frame.to_local(&GeoPoint::new(1.0, 0.0));
        assert!((p.y - METERS_PER_DEGREE_LAT).abs() < 1e-6);
        assert!(p.x.abs() < 1e-9);
    }

    #[test]
    fn local_geo_round_trip() {
        let frame = LocalFrame::new(GeoPoint::new(42.2775, -71.7539));
        let geo = GeoPoint::new(42.2779, -71.7531);
        let back = frame.to_geo(&frame.to_local(&geo));
        assert!((back.lat - geo.lat).abs() < 1e-12);
        assert!((back.lon - geo.lon).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_bad_coordinates() {
        assert!(GeoPoint::new(45.0, 10.0).validate().is_ok());
        assert!(matches!(
            GeoPoint::new(91.0, 0.0).validate(),
            Err(ValueError::OutOfRange { what: "latitude", .. })
        ));
        assert!(matches!(
            GeoPoint::new(0.0, f64::NAN).validate(),
            Err(ValueError::NonFinite { what: "longitude", .. })
        ));
    }
}
