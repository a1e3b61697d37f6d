//! ## vanet-schema::table
//! **Materialized CSV tables with lenient cell access**
//!
//! Cells are looked up by case-insensitive column name. A missing column,
//! a short row or an unparseable value never fails: numeric reads return
//! `f64::NAN` and text reads return `None`.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::SchemaError;
use crate::kind::RecordKind;

#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

/// Resolved column position; `None` when the table lacks the column.
pub type Column = Option<usize>;

impl Table {
    pub fn read_path(path: &Path) -> Result<Self, SchemaError> {
        let file = std::fs::File::open(path).map_err(|source| SchemaError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SchemaError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let mut index = HashMap::with_capacity(headers.len());
        for (i, h) in headers.iter().enumerate() {
            index.entry(h.to_lowercase()).or_insert(i);
        }

        let rows = rdr.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            headers,
            index,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn kind(&self) -> RecordKind {
        RecordKind::classify(&self.headers)
    }

    pub fn column(&self, name: &str) -> Column {
        self.index.get(&name.to_lowercase()).copied()
    }

    pub fn str_at(&self, row: usize, col: Column) -> Option<&str> {
        let cell = self.rows.get(row)?.get(col?)?.trim();
        if cell.is_empty() {
            None
        } else {
            Some(cell)
        }
    }

    pub fn f64_at(&self, row: usize, col: Column) -> f64 {
        self.str_at(row, col)
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(f64::NAN)
    }

    /// Integral value of a cell that may be written as `3` or `3.0`.
    pub fn i64_at(&self, row: usize, col: Column) -> Option<i64> {
        let v = self.f64_at(row, col);
        (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_access() {
        let csv = "\u{feff}Speed,Name\n1.5,a\nx,\n7\n";
        let t = Table::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(t.headers(), ["Speed", "Name"]);
        assert_eq!(t.len(), 3);
        let speed = t.column("speed");
        let name = t.column("NAME");
        assert_eq!(t.f64_at(0, speed), 1.5);
        assert!(t.f64_at(1, speed).is_nan());
        assert_eq!(t.str_at(1, name), None);
        assert_eq!(t.str_at(2, name), None);
        assert!(t.f64_at(0, t.column("missing")).is_nan());
    }

    #[test]
    fn integral_cells() {
        let t = Table::from_reader("seq\n3\n3.0\n3.5\n".as_bytes()).unwrap();
        let c = t.column("seq");
        assert_eq!(t.i64_at(0, c), Some(3));
        assert_eq!(t.i64_at(1, c), Some(3));
        assert_eq!(t.i64_at(2, c), None);
    }

    #[test]
    fn empty_input_has_no_kind() {
        let t = Table::from_reader("".as_bytes()).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.kind(), RecordKind::Unknown);
    }
}
