//! # sail-types
//!
//! Shared value types for the sailing simulator and its navigation controller.
//!
//! These types are used by:
//! - `sail-simulator` core: foil force model, boat integrator, controller
//! - `sail-sim` binary: telemetry snapshots sent over WebSocket / UDP
//!
//! ## Coordinate Conventions
//!
//! - **Local frame**: planar metres, X = east, Y = north, angles counter-clockwise from +X
//! - **Boat frame**: X = bow, Y = port, rotated from the local frame by the heading
//! - **Geographic**: WGS-84 latitude/longitude in degrees, projected onto the
//!   local frame around a fixed origin (see [`LocalFrame`])
//!
//! ## Angle Conventions
//!
//! Every [`Angle`] carries a [`Convention`] tag. Converting between tags is
//! always explicit; arithmetic between two differently tagged angles is refused.

mod angle;
mod error;
mod geo;
mod vector;

pub use angle::{angular_difference, Angle, Convention};
pub use error::ValueError;
pub use geo::{GeoPoint, LocalFrame, METERS_PER_DEGREE_LAT};
pub use vector::{Point2, Vector};
