//! Test-date resolution for an input file.
//!
//! Precedence: explicit override, then the first parseable value of a date
//! column, then a date embedded in the file name. Labels are normalised to
//! `YYYY-MM-DD` whenever the text parses as a date.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::table::RawTable;
use crate::RadarError;

pub const DATE_COLUMN_CANDIDATES: &[&str] = &["date", "test date", "session date"];

// Two-digit-year forms come first: `%Y` would happily read "26" as year 26.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%Y%m%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

fn plausible(date: NaiveDate) -> Option<NaiveDate> {
    PLAUSIBLE_YEARS.contains(&date.year()).then_some(date)
}

fn parse_exact(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok().and_then(plausible))
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|fmt| {
                NaiveDateTime::parse_from_str(text, fmt)
                    .ok()
                    .and_then(|dt| plausible(dt.date()))
            })
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .and_then(|dt| plausible(dt.date_naive()))
        })
}

/// Look for a date inside free text such as a file stem. Windows of up to
/// three tokens are tried longest first, left to right.
fn parse_embedded(text: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == '_')
        .map(|t| t.trim_matches(|c: char| "()[]{};".contains(c)))
        .filter(|t| !t.is_empty())
        .collect();
    for width in (1..=3).rev() {
        for window in tokens.windows(width) {
            let joined = window.join(" ");
            if let Some(date) = parse_exact(&joined) {
                return Some(date);
            }
            if width == 1 {
                let trimmed = joined.trim_end_matches(',');
                let date_part = trimmed.split('T').next().unwrap_or(trimmed);
                if let Some(date) = parse_exact(date_part) {
                    return Some(date);
                }
            }
        }
    }
    None
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_exact(trimmed).or_else(|| parse_embedded(trimmed))
}

/// Normalise free text to `YYYY-MM-DD`, or `None` if no date is found.
pub fn parse_date_label(value: &str) -> Option<String> {
    parse_date(value).map(|d| d.format("%Y-%m-%d").to_string())
}

pub fn infer_date_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    parse_date_label(&stem)
}

/// Index of the first header that names a date column.
pub fn pick_date_column<S: AsRef<str>>(headers: &[S]) -> Option<usize> {
    DATE_COLUMN_CANDIDATES.iter().find_map(|candidate| {
        headers
            .iter()
            .position(|h| h.as_ref().trim().eq_ignore_ascii_case(candidate))
    })
}

/// First cell of the column that parses as a date.
pub fn extract_date_label_from_column(table: &RawTable, col: usize) -> Option<String> {
    table.column(col).flatten().find_map(parse_date_label)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DateSource {
    Override,
    Column(String),
    Filename,
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSource::Override => f.write_str("override"),
            DateSource::Column(name) => write!(f, "column '{name}'"),
            DateSource::Filename => f.write_str("file name"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateLabel {
    pub label: String,
    pub source: DateSource,
}

/// Normalise a user-supplied label; unparseable text is kept as typed.
pub fn normalize_override(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(parse_date_label(trimmed).unwrap_or_else(|| trimmed.to_string()))
}

pub fn resolve_date_label(
    table: &RawTable,
    path: &Path,
    override_label: Option<&str>,
) -> Result<DateLabel, RadarError> {
    if let Some(label) = override_label.and_then(normalize_override) {
        return Ok(DateLabel {
            label,
            source: DateSource::Override,
        });
    }
    if let Some(col) = pick_date_column(&table.headers) {
        if let Some(label) = extract_date_label_from_column(table, col) {
            return Ok(DateLabel {
                label,
                source: DateSource::Column(table.headers[col].clone()),
            });
        }
    }
    if let Some(label) = infer_date_from_filename(path) {
        debug!(file = %path.display(), %label, "date inferred from file name");
        return Ok(DateLabel {
            label,
            source: DateSource::Filename,
        });
    }
    Err(RadarError::DateUnresolved {
        file: path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_common_formats() {
        for text in [
            "2026-01-31",
            "2026/01/31",
            "01/31/2026",
            "1/31/26",
            "Jan 31, 2026",
            "January 31 2026",
            "31 Jan 2026",
            "20260131",
            "2026-01-31 08:15:00",
            "2026-01-31T08:15:00Z",
        ] {
            assert_eq!(parse_date_label(text).as_deref(), Some("2026-01-31"), "{text}");
        }
    }

    #[test]
    fn labels_are_idempotent() {
        let label = parse_date_label("Jan 31, 2026").unwrap();
        assert_eq!(parse_date_label(&label), Some(label));
    }

    #[test]
    fn rejects_non_dates() {
        assert_eq!(parse_date_label(""), None);
        assert_eq!(parse_date_label("baseline"), None);
        assert_eq!(parse_date_label("12"), None);
    }

    #[test]
    fn finds_date_in_file_name() {
        assert_eq!(
            infer_date_from_filename(Path::new("exports/cmj_2026-01-31.csv")).as_deref(),
            Some("2026-01-31")
        );
        assert_eq!(
            infer_date_from_filename(Path::new("Team CMJ Jan 31, 2026.csv")).as_deref(),
            Some("2026-01-31")
        );
        assert_eq!(infer_date_from_filename(Path::new("cmj.csv")), None);
    }

    fn table(body: &str) -> RawTable {
        RawTable::from_reader(body.as_bytes()).unwrap()
    }

    #[test]
    fn precedence_is_override_column_filename() {
        let with_column = table("Name,Test Date\nA,\nB,02/14/2026\n");
        let path = Path::new("cmj_2026-01-31.csv");

        let resolved = resolve_date_label(&with_column, path, Some("Feb 1, 2026")).unwrap();
        assert_eq!(resolved.label, "2026-02-01");
        assert_eq!(resolved.source, DateSource::Override);

        let resolved = resolve_date_label(&with_column, path, None).unwrap();
        assert_eq!(resolved.label, "2026-02-14");
        assert_eq!(resolved.source, DateSource::Column("Test Date".into()));

        let without = table("Name\nA\n");
        let resolved = resolve_date_label(&without, path, Some("  ")).unwrap();
        assert_eq!(resolved.label, "2026-01-31");
        assert_eq!(resolved.source, DateSource::Filename);
    }

    #[test]
    fn free_text_override_is_kept() {
        let resolved = resolve_date_label(&table("Name\n"), Path::new("x.csv"), Some(" Pre-season "))
            .unwrap();
        assert_eq!(resolved.label, "Pre-season");
    }

    #[test]
    fn unresolved_date_is_an_error() {
        let err = resolve_date_label(&table("Name\nA\n"), Path::new("cmj.csv"), None).unwrap_err();
        assert!(matches!(err, RadarError::DateUnresolved { .. }));
    }
}
