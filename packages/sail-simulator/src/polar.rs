//! polar.rs — Boat speed polars
//!
//! File layout (`;` or tab separated, every row the same width):
//!
//! ```text
//! twa\tws;4;6;8
//! 30;1.1;1.6;2.0
//! 45;1.9;2.5;3.1
//! ...
//! ```
//!
//! First row: true wind speeds. Each following row: true wind angle
//! (degrees, ascending within [0, 180]) then boat speed per wind speed.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::coefficients::{csv_error, Layout};
use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polar {
    wind_speeds: Vec<f64>,
    angles: Vec<f64>,
    /// `speeds[angle_index][wind_index]`
    speeds: Vec<Vec<f64>>,
}

impl Polar {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let polar = Self::parse(&text).map_err(|e| DataError::InFile {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        debug!(
            "Loaded polar {} ({} angles × {} wind speeds)",
            path.display(),
            polar.angles.len(),
            polar.wind_speeds.len()
        );
        Ok(polar)
    }

    pub fn parse(text: &str) -> Result<Self, DataError> {
        let layout = Layout::sniff(text);
        let mut reader = layout.reader(text, true, layout.aligned);
        let header = reader.headers().map_err(|e| csv_error(e, 1))?.clone();

        let wind_speeds = layout
            .fields(&header)
            .iter()
            .skip(1)
            .map(|f| number(f, 1))
            .collect::<Result<Vec<_>, _>>()?;
        if wind_speeds.is_empty() {
            return Err(DataError::Malformed { line: 1, reason: "no wind speed columns".into() });
        }
        if let Some(w) = wind_speeds.windows(2).find(|w| w[1] <= w[0]) {
            return Err(DataError::NotAscending { previous: w[0], next: w[1] });
        }

        let mut angles = Vec::new();
        let mut speeds = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| csv_error(e, 1))?;
            let line_no = record.position().map_or(0, |p| p.line() as usize);
            let fields = layout
                .fields(&record)
                .iter()
                .map(|f| number(f, line_no))
                .collect::<Result<Vec<_>, _>>()?;
            let Some((&twa, boat_speeds)) = fields.split_first() else {
                continue;
            };
            if boat_speeds.len() != wind_speeds.len() {
                return Err(DataError::Malformed {
                    line: line_no,
                    reason: format!("expected {} columns, got {}", wind_speeds.len() + 1, fields.len()),
                });
            }
            if !(0.0..=180.0).contains(&twa) {
                return Err(DataError::AngleOutOfDomain(twa));
            }
            if let Some(&prev) = angles.last() {
                if twa <= prev {
                    return Err(DataError::NotAscending { previous: prev, next: twa });
                }
            }
            angles.push(twa);
            speeds.push(boat_speeds.to_vec());
        }
        if angles.len() < 2 {
            return Err(DataError::TooFewRows(angles.len()));
        }
        Ok(Self { wind_speeds, angles, speeds })
    }

    /// Boat speed at a true wind angle and speed; bilinear, clamped at the edges.
    pub fn boat_speed(&self, twa: f64, tws: f64) -> f64 {
        let twa = twa.abs().min(180.0);
        let (i, ti) = bracket(&self.angles, twa);
        let (j, tj) = bracket(&self.wind_speeds, tws);
        let at = |a: usize| {
            let row = &self.speeds[a];
            row[j] + tj * (row[(j + 1).min(row.len() - 1)] - row[j])
        };
        let lo = at(i);
        let hi = at((i + 1).min(self.angles.len() - 1));
        lo + ti * (hi - lo)
    }

    /// True wind angle in (0, 90] with the best velocity made good upwind.
    pub fn best_upwind_angle(&self, tws: f64) -> f64 {
        best_vmg(1..=90, |a| self.boat_speed(a, tws) * a.to_radians().cos())
    }

    /// True wind angle in [90, 180] with the best velocity made good downwind.
    pub fn best_downwind_angle(&self, tws: f64) -> f64 {
        best_vmg(90..=180, |a| -self.boat_speed(a, tws) * a.to_radians().cos())
    }
}

fn number(field: &str, line: usize) -> Result<f64, DataError> {
    let f = field.trim();
    f.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DataError::Malformed { line, reason: format!("bad number '{f}'") })
}

/// Lower index and fraction towards the next entry, clamped to the ends.
fn bracket(axis: &[f64], x: f64) -> (usize, f64) {
    let last = axis.len() - 1;
    if last == 0 || !(x > axis[0]) {
        return (0, 0.0);
    }
    if x >= axis[last] {
        return (last, 0.0);
    }
    let hi = axis.partition_point(|&a| a <= x);
    let lo = hi - 1;
    (lo, (x - axis[lo]) / (axis[hi] - axis[lo]))
}

fn best_vmg(range: std::ops::RangeInclusive<u32>, vmg: impl Fn(f64) -> f64) -> f64 {
    range
        .map(f64::from)
        .map(|a| (a, vmg(a)))
        .max_by(|x, y| x.1.total_cmp(&y.1))
        .map_or(0.0, |(a, _)| a)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
twa\\tws;4;8
0;0;0
30;1.0;2.0
45;2.0;3.0
90;3.0;4.0
150;2.5;3.5
180;2.0;3.0
";

    #[test]
    fn parses_semicolon_polar() {
        let p = Polar::parse(SAMPLE).unwrap();
        assert_eq!(p.wind_speeds, vec![4.0, 8.0]);
        assert_eq!(p.angles.len(), 6);
    }

    #[test]
    fn parses_tab_polar() {
        let p = Polar::parse("twa/tws\t5\t10\n0\t0\t0\n90\t3\t5\n").unwrap();
        assert_eq!(p.boat_speed(90.0, 10.0), 5.0);
    }

    #[test]
    fn interpolates_between_angles_and_speeds() {
        let p = Polar::parse(SAMPLE).unwrap();
        assert!((p.boat_speed(60.0, 4.0) - (2.0 + 1.0 / 3.0)).abs() < 1e-9);
        assert!((p.boat_speed(90.0, 6.0) - 3.5).abs() < 1e-9);
        // clamped beyond the table
        assert_eq!(p.boat_speed(90.0, 20.0), 4.0);
        assert_eq!(p.boat_speed(-90.0, 4.0), 3.0);
    }

    #[test]
    fn best_upwind_angle_maximizes_vmg() {
        let p = Polar::parse(SAMPLE).unwrap();
        let best = p.best_upwind_angle(4.0);
        let vmg = |a: f64| p.boat_speed(a, 4.0) * a.to_radians().cos();
        assert!(best > 0.0 && best <= 90.0);
        assert!(vmg(best) >= vmg(30.0));
        assert!(vmg(best) >= vmg(60.0));
    }

    #[test]
    fn best_downwind_angle_is_past_the_beam() {
        let p = Polar::parse(SAMPLE).unwrap();
        let best = p.best_downwind_angle(8.0);
        assert!((90.0..=180.0).contains(&best));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Polar::parse("x;4;8\n0;0\n").unwrap_err();
        assert!(matches!(err, DataError::Malformed { line: 2, .. }));
    }

    #[test]
    fn rejects_single_angle() {
        assert!(matches!(Polar::parse("x;4\n30;1\n"), Err(DataError::TooFewRows(1))));
    }
}
