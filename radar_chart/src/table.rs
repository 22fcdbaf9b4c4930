//! Untyped tabular input: a header row plus string cells.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::RadarError;

/// One input file as read from disk. Cells are kept verbatim; typing happens
/// in validation once a column mapping is known.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn from_path(path: &Path) -> Result<Self, RadarError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a CSV export. Rows may be shorter or longer than the header row.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, RadarError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        let mut blank = 0usize;
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                blank += 1;
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        if blank > 0 {
            debug!(skipped = blank, "blank rows skipped");
        }
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at `(row, col)`; `None` when the cell is absent or blank.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)?
            .get(col)
            .map(|s| s.as_str())
            .filter(|s| !is_missing(s))
    }

    /// Iterate the cells of one column, `None` for blanks.
    pub fn column(&self, col: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, col))
    }
}

/// Spreadsheet null markers, matched case-sensitively after trimming.
const NULL_MARKERS: &[&str] = &[
    "#N/A", "#NA", "-NaN", "-nan", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan",
    "null",
];

pub(crate) fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || NULL_MARKERS.contains(&trimmed)
}

/// Coerce a cell to a finite number; anything else is `None`.
pub(crate) fn coerce_numeric(cell: Option<&str>) -> Option<f64> {
    let value: f64 = cell?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_ragged_rows_and_skips_blank_lines() {
        let data = "Name,Jump Height (in),Extra\nA,10,x\nB,20\n,,\nC,30,y,z\n";
        let table = RawTable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Name", "Jump Height (in)", "Extra"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(1, 2), None);
        assert_eq!(table.cell(2, 0), Some("C"));
    }

    #[test]
    fn null_markers_are_missing() {
        let table = RawTable::new(
            vec!["v".into()],
            vec![vec!["NaN".into()], vec![" ".into()], vec!["1.5".into()]],
        );
        let cells: Vec<_> = table.column(0).collect();
        assert_eq!(cells, vec![None, None, Some("1.5")]);
    }

    #[test]
    fn numeric_coercion_trims_and_rejects_text() {
        assert_eq!(coerce_numeric(Some(" 12.5 ")), Some(12.5));
        assert_eq!(coerce_numeric(Some("12in")), None);
        assert_eq!(coerce_numeric(Some("inf")), None);
        assert_eq!(coerce_numeric(None), None);
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Name,RSI-Modified").unwrap();
        writeln!(file, "A,0.45").unwrap();
        let table = RawTable::from_path(file.path()).unwrap();
        assert_eq!(table.column_index("RSI-Modified"), Some(1));
        assert_eq!(table.cell(0, 1), Some("0.45"));
    }
}
