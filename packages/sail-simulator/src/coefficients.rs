//! coefficients.rs — Empirical lift/drag tables
//!
//! A table maps angle of attack (Data convention, [0, 180]) to lift and drag
//! coefficients. Negative angles of attack are handled by the foil model
//! (lift sign flips, drag unchanged), so only the positive half is stored.
//!
//! Accepted file layouts, read with the `csv` crate:
//! - CSV with a header row (`alpha`/`alfa`/`aoa`, `cl`, `cd` in any order);
//!   lines before the header (XFoil-style preamble) are skipped
//! - comma-separated or space-aligned rows of `aoa cl cd` without a header
//!
//! Delimited files must have the same number of fields on every row.
//! Lines starting with `#` are comments.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::debug;

use crate::error::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoefficientRow {
    /// Angle of attack, degrees
    pub aoa: f64,
    pub cl: f64,
    pub cd: f64,
}

impl CoefficientRow {
    pub fn new(aoa: f64, cl: f64, cd: f64) -> Self {
        Self { aoa, cl, cd }
    }
}

/// Immutable once built; share between foils and strategies with `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientTable {
    rows: Vec<CoefficientRow>,
}

impl CoefficientTable {
    pub fn new(rows: Vec<CoefficientRow>) -> Result<Self, DataError> {
        if rows.len() < 2 {
            return Err(DataError::TooFewRows(rows.len()));
        }
        for (i, row) in rows.iter().enumerate() {
            for v in [row.aoa, row.cl, row.cd] {
                if !v.is_finite() {
                    return Err(DataError::Malformed {
                        line: i + 1,
                        reason: format!("non-finite value {v}"),
                    });
                }
            }
            if !(0.0..=180.0).contains(&row.aoa) {
                return Err(DataError::AngleOutOfDomain(row.aoa));
            }
        }
        if let Some(pair) = rows.windows(2).find(|w| w[1].aoa <= w[0].aoa) {
            return Err(DataError::NotAscending { previous: pair[0].aoa, next: pair[1].aoa });
        }
        Ok(Self { rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&text).map_err(|e| DataError::InFile {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        debug!("Loaded {} coefficient rows from {}", table.rows.len(), path.display());
        Ok(table)
    }

    pub fn parse(text: &str) -> Result<Self, DataError> {
        let layout = Layout::sniff(text);
        let Some(start) = layout.data_start(text)? else {
            return Err(DataError::TooFewRows(0));
        };

        let mut reader = layout.reader(&text[start.offset..], start.header, layout.aligned);
        let columns = if start.header {
            let headers = reader.headers().map_err(|e| csv_error(e, start.line))?.clone();
            header_columns(&layout.fields(&headers)).unwrap_or([0, 1, 2])
        } else {
            [0, 1, 2]
        };

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| csv_error(e, start.line))?;
            let line_no = record.position().map_or(start.line, |p| start.line + p.line() as usize - 1);
            let fields = layout.fields(&record);
            let [a, l, d] = columns;
            let get = |idx: usize, name: &str| -> Result<f64, DataError> {
                let field = fields.get(idx).ok_or_else(|| DataError::Malformed {
                    line: line_no,
                    reason: format!("missing {name} column"),
                })?;
                field.parse::<f64>().map_err(|_| DataError::Malformed {
                    line: line_no,
                    reason: format!("bad {name} value '{field}'"),
                })
            };
            rows.push(CoefficientRow::new(get(a, "aoa")?, get(l, "cl")?, get(d, "cd")?));
        }

        Self::new(rows)
    }

    pub fn rows(&self) -> &[CoefficientRow] {
        &self.rows
    }

    /// `(cl, cd)` at `aoa` degrees. Linear between bracketing rows; outside
    /// the tabulated domain the boundary row is returned.
    pub fn lookup(&self, aoa: f64) -> (f64, f64) {
        let first = self.rows[0];
        let last = self.rows[self.rows.len() - 1];
        // also catches NaN
        if !(aoa > first.aoa) {
            return (first.cl, first.cd);
        }
        if aoa >= last.aoa {
            return (last.cl, last.cd);
        }
        let hi = self.rows.partition_point(|r| r.aoa <= aoa);
        let (lo, hi) = (self.rows[hi - 1], self.rows[hi]);
        let t = (aoa - lo.aoa) / (hi.aoa - lo.aoa);
        (lo.cl + t * (hi.cl - lo.cl), lo.cd + t * (hi.cd - lo.cd))
    }

    /// Tabulated angle in (0, 90] with the best lift-to-drag ratio.
    pub fn best_lift_drag_angle(&self) -> Option<f64> {
        self.rows
            .iter()
            .filter(|r| r.aoa > 0.0 && r.aoa <= 90.0 && r.cd > 0.0)
            .max_by(|a, b| (a.cl / a.cd).total_cmp(&(b.cl / b.cd)))
            .map(|r| r.aoa)
    }
}

/// Delimiter and column style of a datasheet or polar file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout {
    pub delimiter: u8,
    /// Space-aligned columns: runs of blanks separate fields
    pub aligned: bool,
}

/// Where the tabulated part of a file begins.
#[derive(Debug, Clone, Copy)]
struct DataStart {
    offset: usize,
    line: usize,
    header: bool,
}

impl Layout {
    /// First of `,` `;` tab found outside comments; otherwise space-aligned.
    pub fn sniff(text: &str) -> Self {
        let body: Vec<&str> = text
            .lines()
            .map(|l| l.split('#').next().unwrap_or(""))
            .collect();
        [b',', b';', b'\t']
            .into_iter()
            .find(|d| body.iter().any(|l| l.as_bytes().contains(d)))
            .map_or(Self { delimiter: b' ', aligned: true }, |delimiter| Self { delimiter, aligned: false })
    }

    pub fn reader<'a>(&self, text: &'a str, has_headers: bool, flexible: bool) -> csv::Reader<&'a [u8]> {
        ReaderBuilder::new()
            .delimiter(self.delimiter)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .has_headers(has_headers)
            .flexible(flexible)
            .from_reader(text.as_bytes())
    }

    /// Record fields, with the empty gaps of aligned columns dropped.
    pub fn fields<'r>(&self, record: &'r StringRecord) -> Vec<&'r str> {
        record.iter().filter(|f| !(self.aligned && f.is_empty())).collect()
    }

    /// Skip any preamble up to the first header or numeric row.
    fn data_start(&self, text: &str) -> Result<Option<DataStart>, DataError> {
        for result in self.reader(text, false, true).records() {
            let record = result.map_err(|e| csv_error(e, 1))?;
            let fields = self.fields(&record);
            let numeric = fields.first().is_some_and(|f| f.parse::<f64>().is_ok());
            let header = !numeric && header_columns(&fields).is_some();
            if numeric || header {
                let (offset, line) = record
                    .position()
                    .map_or((0, 1), |p| (p.byte() as usize, p.line() as usize));
                return Ok(Some(DataStart { offset, line, header }));
            }
        }
        Ok(None)
    }
}

/// csv reader error, with its line shifted to count from the top of the file.
pub(crate) fn csv_error(e: csv::Error, first_line: usize) -> DataError {
    let line = e.position().map_or(first_line, |p| first_line + p.line() as usize - 1);
    DataError::Malformed { line, reason: e.to_string() }
}

fn header_columns(fields: &[&str]) -> Option<[usize; 3]> {
    let find = |names: &[&str]| {
        fields.iter().position(|f| names.iter().any(|n| f.eq_ignore_ascii_case(n)))
    };
    Some([
        find(&["alpha", "alfa", "aoa", "angle"])?,
        find(&["cl"])?,
        find(&["cd"])?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple() -> CoefficientTable {
        CoefficientTable::new(vec![
            CoefficientRow::new(0.0, 0.0, 0.01),
            CoefficientRow::new(10.0, 1.0, 0.05),
            CoefficientRow::new(90.0, 0.0, 1.2),
            CoefficientRow::new(180.0, 0.0, 0.01),
        ])
        .unwrap()
    }

    // --- Construction ---

    #[test]
    fn rejects_single_row() {
        let err = CoefficientTable::new(vec![CoefficientRow::new(0.0, 0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, DataError::TooFewRows(1)));
    }

    #[test]
    fn rejects_descending_angles() {
        let err = CoefficientTable::new(vec![
            CoefficientRow::new(10.0, 0.0, 0.0),
            CoefficientRow::new(5.0, 0.0, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, DataError::NotAscending { .. }));
    }

    #[test]
    fn rejects_angle_outside_data_domain() {
        let err = CoefficientTable::new(vec![
            CoefficientRow::new(-5.0, 0.0, 0.0),
            CoefficientRow::new(5.0, 0.0, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, DataError::AngleOutOfDomain(a) if a == -5.0));
    }

    // --- Lookup ---

    #[test]
    fn exact_row_hit() {
        assert_eq!(simple().lookup(10.0), (1.0, 0.05));
    }

    #[test]
    fn midpoint_is_strictly_between() {
        let (cl, cd) = simple().lookup(5.0);
        assert!(cl > 0.0 && cl < 1.0);
        assert!(cd > 0.01 && cd < 0.05);
        assert!((cl - 0.5).abs() < 1e-12);
    }

    #[test]
    fn clamps_outside_domain() {
        let t = CoefficientTable::new(vec![
            CoefficientRow::new(5.0, 0.2, 0.02),
            CoefficientRow::new(20.0, 1.1, 0.1),
        ])
        .unwrap();
        assert_eq!(t.lookup(0.0), (0.2, 0.02));
        assert_eq!(t.lookup(170.0), (1.1, 0.1));
        assert_eq!(t.lookup(f64::NAN), (0.2, 0.02));
    }

    #[test]
    fn best_lift_drag_picks_peak_ratio() {
        assert_eq!(simple().best_lift_drag_angle(), Some(10.0));
    }

    // --- Parsing ---

    #[test]
    fn parses_xfoil_style_csv() {
        let text = "\
Xfoil polar. Reynolds number fixed. Mach number fixed
Polar key,xf-naca0010-il-1000000
Alpha,Cl,Cd,Cdp,Cm
0.000,0.0000,0.00540,0.0011,0.0000
5.000,0.5500,0.00700,0.0020,0.0010
10.000,1.0500,0.01300,0.0060,0.0050
";
        let t = CoefficientTable::parse(text).unwrap();
        assert_eq!(t.rows().len(), 3);
        assert_eq!(t.rows()[1], CoefficientRow::new(5.0, 0.55, 0.007));
    }

    #[test]
    fn parses_header_in_other_order() {
        let text = "cd,cl,aoa\n0.1,0.0,0\n0.2,1.0,20\n";
        let t = CoefficientTable::parse(text).unwrap();
        assert_eq!(t.rows()[1], CoefficientRow::new(20.0, 1.0, 0.2));
    }

    #[test]
    fn parses_whitespace_without_header() {
        let text = "# mainsail\n0 0.0 0.05\n30  1.2 0.3\n90 0.0 1.3  # flat plate\n";
        let t = CoefficientTable::parse(text).unwrap();
        assert_eq!(t.rows().len(), 3);
        assert_eq!(t.rows()[2].cd, 1.3);
    }

    #[test]
    fn malformed_value_reports_line() {
        let err = CoefficientTable::parse("0 0 0\n10 abc 0.1\n").unwrap_err();
        assert!(matches!(err, DataError::Malformed { line: 2, .. }));
    }

    #[test]
    fn ragged_csv_row_is_rejected() {
        let err = CoefficientTable::parse("alpha,cl,cd\n0,0.0,0.01\n10,0.9\n").unwrap_err();
        assert!(matches!(err, DataError::Malformed { line: 3, .. }), "{err}");
    }

    #[test]
    fn sniffs_delimiters() {
        assert_eq!(Layout::sniff("a;b\n").delimiter, b';');
        assert_eq!(Layout::sniff("# x, y\n0 1 2\n"), Layout { delimiter: b' ', aligned: true });
        assert_eq!(Layout::sniff("0\t1\t2\n").delimiter, b'\t');
    }

    #[test]
    fn missing_file_is_data_error() {
        let err = CoefficientTable::from_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
