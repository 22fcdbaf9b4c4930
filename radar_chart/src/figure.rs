//! Radar figure model: geometry, colours and the comparison table.
//!
//! Everything here is backend-free. `render` turns a [`RadarFigure`] into
//! drawing calls; keeping the numbers separate lets them be tested without
//! a canvas.

use std::f64::consts::PI;

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

use crate::history::HistoryEntry;
use crate::metrics::{axis_labels, AXIS_COUNT};
use crate::RadarError;

/// Plot-space half extent; the unit ring sits well inside it.
pub const PLOT_LIMIT: f64 = 1.25;
pub const LABEL_RADIUS: f64 = 1.12;
/// Labels this close to the vertical axis are centred.
const CENTRE_BAND: f64 = 0.1;

pub const GRID_RING: RGBColor = RGBColor(0xcc, 0xcc, 0xcc);
pub const GRID_SPOKE: RGBColor = RGBColor(0xe0, 0xe0, 0xe0);
pub const RING_LABEL: RGBColor = RGBColor(0x55, 0x55, 0x55);
pub const TEXT: RGBColor = RGBColor(0x22, 0x22, 0x22);
pub const TABLE_EDGE: RGBColor = RGBColor(0xd0, 0xd0, 0xd0);
pub const HEADER_FILL: RGBColor = RGBColor(0xf2, 0xf4, 0xf7);
pub const DATE_FILL: RGBColor = RGBColor(0xff, 0xff, 0xff);
pub const DELTA_FILL: RGBColor = RGBColor(0xf7, 0xf7, 0xf7);
pub const DELTA_LABEL: RGBColor = RGBColor(0x44, 0x44, 0x44);
pub const DELTA_UP: RGBColor = RGBColor(0x1b, 0x7f, 0x3a);
pub const DELTA_DOWN: RGBColor = RGBColor(0xb4, 0x23, 0x18);
pub const DELTA_FLAT: RGBColor = RGBColor(0x55, 0x55, 0x55);

/// Ten-colour categorical palette, cycled by date index.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xe3, 0x77, 0xc2),
    RGBColor(0x7f, 0x7f, 0x7f),
    RGBColor(0xbc, 0xbd, 0x22),
    RGBColor(0x17, 0xbe, 0xcf),
];

pub const TABLE_COLUMN_WIDTHS: [f64; AXIS_COUNT + 1] = [0.20, 0.16, 0.16, 0.16, 0.16, 0.16];

pub fn palette_color(idx: usize) -> RGBColor {
    PALETTE[idx % PALETTE.len()]
}

/// Where the comparison table goes relative to the chart.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableLayout {
    /// Chart and table share one page.
    Below,
    /// The table gets a page of its own after the chart.
    Separate,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RenderOptions {
    /// Grid ring levels on the 0–100 scale.
    pub ring_levels: Vec<f64>,
    pub table_layout: TableLayout,
    /// Page size in pixels (8.5 × 11 in at 100 dpi by default).
    pub width: u32,
    pub height: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            ring_levels: vec![0.0, 25.0, 50.0, 75.0, 100.0],
            table_layout: TableLayout::Below,
            width: 850,
            height: 1100,
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), RadarError> {
        if self.ring_levels.is_empty() {
            return Err(RadarError::InvalidParameter(
                "at least one ring level is required".into(),
            ));
        }
        if let Some(bad) = self
            .ring_levels
            .iter()
            .find(|l| !l.is_finite() || **l < 0.0 || **l > 100.0)
        {
            return Err(RadarError::InvalidParameter(format!(
                "ring level {bad} is outside 0..=100"
            )));
        }
        if self.width < 300 || self.height < 400 {
            return Err(RadarError::InvalidParameter(format!(
                "page size {}x{} is too small",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Parse a comma-separated list such as `0,25,50,75,100`.
pub fn parse_ring_levels(text: &str) -> Result<Vec<f64>, RadarError> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| RadarError::InvalidParameter(format!("invalid ring level '{s}'")))
        })
        .collect()
}

/// Axis angle in radians: the first axis points straight up and the rest
/// follow clockwise at equal spacing.
pub fn axis_angle(idx: usize, count: usize) -> f64 {
    PI / 2.0 - 2.0 * PI * idx as f64 / count as f64
}

pub fn axis_angles() -> [f64; AXIS_COUNT] {
    std::array::from_fn(|idx| axis_angle(idx, AXIS_COUNT))
}

/// Closed polygon for values on the 0–100 scale; the first vertex is
/// repeated at the end.
pub fn polygon_points(values: &[f64; AXIS_COUNT], angles: &[f64; AXIS_COUNT]) -> Vec<(f64, f64)> {
    let mut points: Vec<(f64, f64)> = values
        .iter()
        .zip(angles)
        .map(|(v, a)| {
            let r = v / 100.0;
            (r * a.cos(), r * a.sin())
        })
        .collect();
    if let Some(first) = points.first().copied() {
        points.push(first);
    }
    points
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

pub fn label_alignment(x: f64) -> HAlign {
    if x < -CENTRE_BAND {
        HAlign::Right
    } else if x > CENTRE_BAND {
        HAlign::Left
    } else {
        HAlign::Center
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ring {
    pub level: f64,
    pub vertices: Vec<(f64, f64)>,
    pub label: String,
    /// Label anchor: bottom-centre at `(0, level / 100)`.
    pub label_at: (f64, f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AxisLabel {
    pub text: &'static str,
    pub position: (f64, f64),
    pub align: HAlign,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RadarGrid {
    pub angles: [f64; AXIS_COUNT],
    pub rings: Vec<Ring>,
    /// Outer end of each spoke; spokes start at the origin.
    pub spokes: Vec<(f64, f64)>,
    pub labels: Vec<AxisLabel>,
}

pub fn build_grid(ring_levels: &[f64]) -> RadarGrid {
    let angles = axis_angles();
    let rings = ring_levels
        .iter()
        .map(|&level| Ring {
            level,
            vertices: polygon_points(&[level; AXIS_COUNT], &angles),
            label: format!("{}%", format_number(level)),
            label_at: (0.0, level / 100.0),
        })
        .collect();
    let spokes = angles.iter().map(|a| (a.cos(), a.sin())).collect();
    let labels = angles
        .iter()
        .zip(axis_labels())
        .map(|(a, text)| {
            let position = (LABEL_RADIUS * a.cos(), LABEL_RADIUS * a.sin());
            AxisLabel {
                text,
                position,
                align: label_alignment(position.0),
            }
        })
        .collect();
    RadarGrid {
        angles,
        rings,
        spokes,
        labels,
    }
}

/// One date's polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    pub date_label: String,
    pub color: RGBColor,
    pub points: Vec<(f64, f64)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    Date,
    Delta,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableCell {
    pub text: String,
    pub color: RGBColor,
    pub bold: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub kind: RowKind,
    pub fill: RGBColor,
    pub cells: Vec<TableCell>,
}

/// Per-date percentiles with a delta row between consecutive dates.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonTable {
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl ComparisonTable {
    pub fn build(entries: &[HistoryEntry]) -> Self {
        let header = std::iter::once("Date")
            .chain(axis_labels())
            .map(str::to_string)
            .collect();
        let mut rows = Vec::with_capacity(entries.len() * 2);
        let mut previous: Option<&[f64; AXIS_COUNT]> = None;
        for (idx, entry) in entries.iter().enumerate() {
            let color = palette_color(idx);
            let mut cells = vec![TableCell {
                text: entry.date_label.clone(),
                color,
                bold: true,
            }];
            cells.extend(entry.values.iter().map(|v| TableCell {
                text: format_percentile(*v),
                color,
                bold: false,
            }));
            rows.push(TableRow {
                kind: RowKind::Date,
                fill: DATE_FILL,
                cells,
            });

            if let Some(prev) = previous {
                let mut cells = vec![TableCell {
                    text: "Delta".into(),
                    color: DELTA_LABEL,
                    bold: true,
                }];
                cells.extend(entry.values.iter().zip(prev).map(|(curr, prev)| {
                    let delta = curr - prev;
                    TableCell {
                        text: format_delta(delta),
                        color: delta_color(delta),
                        bold: false,
                    }
                }));
                rows.push(TableRow {
                    kind: RowKind::Delta,
                    fill: DELTA_FILL,
                    cells,
                });
            }
            previous = Some(&entry.values);
        }
        Self { header, rows }
    }
}

/// Everything needed to draw one athlete's page(s).
#[derive(Clone, Debug, PartialEq)]
pub struct RadarFigure {
    pub title: String,
    pub grid: RadarGrid,
    pub traces: Vec<Trace>,
    pub table: ComparisonTable,
    pub options: RenderOptions,
}

pub fn build_radar_figure(
    athlete_name: &str,
    entries: &[HistoryEntry],
    options: &RenderOptions,
) -> RadarFigure {
    let grid = build_grid(&options.ring_levels);
    let traces = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| Trace {
            date_label: entry.date_label.clone(),
            color: palette_color(idx),
            points: polygon_points(&entry.values, &grid.angles),
        })
        .collect();
    RadarFigure {
        title: athlete_name.to_string(),
        grid,
        traces,
        table: ComparisonTable::build(entries),
        options: options.clone(),
    }
}

/// Round to one decimal, mapping negative zero to zero.
/// Nearest tenth, ties to even on the exact binary value (`6.25` -> `6.2`).
fn round1(value: f64) -> f64 {
    let rounded: f64 = format!("{value:.1}").parse().unwrap_or(value);
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn format_number(value: f64) -> String {
    let rounded = round1(value);
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded:.1}")
    }
}

/// `75%`, `62.5%`.
pub fn format_percentile(value: f64) -> String {
    format!("{}%", format_number(value))
}

/// Always signed: `+12`, `-4.3`, `+0`.
pub fn format_delta(value: f64) -> String {
    let rounded = round1(value);
    if rounded.fract() == 0.0 {
        format!("{:+}", rounded as i64)
    } else {
        format!("{rounded:+.1}")
    }
}

/// Colour by the sign of the unrounded delta.
pub fn delta_color(delta: f64) -> RGBColor {
    if delta > 0.0 {
        DELTA_UP
    } else if delta < 0.0 {
        DELTA_DOWN
    } else {
        DELTA_FLAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn entry(date: &str, values: [f64; AXIS_COUNT]) -> HistoryEntry {
        HistoryEntry {
            date_label: date.into(),
            values,
        }
    }

    #[test]
    fn first_axis_points_up_then_clockwise() {
        let degrees = axis_angles().map(f64::to_degrees);
        assert!((degrees[0] - 90.0).abs() < EPS);
        assert!((degrees[1] - 18.0).abs() < EPS);
        assert!((degrees[2] + 54.0).abs() < EPS);
    }

    #[test]
    fn values_scale_to_unit_radius() {
        let angles = axis_angles();
        let full = polygon_points(&[100.0; AXIS_COUNT], &angles);
        assert_eq!(full.len(), AXIS_COUNT + 1);
        assert_eq!(full[0], full[AXIS_COUNT]);
        for (x, y) in &full {
            assert!(((x * x + y * y).sqrt() - 1.0).abs() < EPS);
        }
        let empty = polygon_points(&[0.0; AXIS_COUNT], &angles);
        assert!(empty.iter().all(|(x, y)| x.abs() < EPS && y.abs() < EPS));
    }

    #[test]
    fn labels_align_by_side() {
        let grid = build_grid(&[0.0, 50.0, 100.0]);
        let aligns: Vec<_> = grid.labels.iter().map(|l| l.align).collect();
        assert_eq!(
            aligns,
            [HAlign::Center, HAlign::Left, HAlign::Left, HAlign::Right, HAlign::Right]
        );
        assert_eq!(grid.rings[1].label, "50%");
        assert_eq!(grid.rings[2].label_at, (0.0, 1.0));
    }

    #[test]
    fn formats_percentiles_and_deltas() {
        assert_eq!(format_percentile(75.0), "75%");
        assert_eq!(format_percentile(62.5), "62.5%");
        assert_eq!(format_percentile(100.0 / 3.0), "33.3%");
        assert_eq!(format_delta(12.0), "+12");
        assert_eq!(format_delta(-4.3), "-4.3");
        assert_eq!(format_delta(0.0), "+0");
        assert_eq!(format_delta(-0.04), "+0");
        assert_eq!(format_delta(12.04), "+12");
    }

    #[test]
    fn half_tenths_round_to_even() {
        assert_eq!(format_percentile(100.0 / 16.0), "6.2%");
        assert_eq!(format_percentile(100.0 * 3.0 / 16.0), "18.8%");
        assert_eq!(format_delta(-6.25), "-6.2");
        assert_eq!(format_delta(0.05), "+0.1");
        assert_eq!(format_percentile(99.95), "100%");
    }

    #[test]
    fn delta_colour_follows_unrounded_sign() {
        assert_eq!(delta_color(0.01), DELTA_UP);
        assert_eq!(delta_color(-0.01), DELTA_DOWN);
        assert_eq!(delta_color(0.0), DELTA_FLAT);
    }

    #[test]
    fn delta_row_follows_each_later_date() {
        let entries = [
            entry("2026-01-01", [50.0, 50.0, 50.0, 50.0, 50.0]),
            entry("2026-02-01", [62.0, 45.7, 50.0, 100.0, 25.0]),
        ];
        let table = ComparisonTable::build(&entries);
        assert_eq!(table.header[0], "Date");
        assert_eq!(table.header[2], "Triple Ext");
        let kinds: Vec<_> = table.rows.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, [RowKind::Date, RowKind::Date, RowKind::Delta]);
        assert_eq!(table.rows[1].cells[0].text, "2026-02-01");
        assert_eq!(table.rows[1].cells[0].color, PALETTE[1]);
        let texts: Vec<_> = table.rows[2].cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["Delta", "+12", "-4.3", "+0", "+50", "-25"]);
        assert_eq!(table.rows[2].cells[2].color, DELTA_DOWN);
        assert_eq!(table.rows[2].cells[1].color, DELTA_UP);
    }

    #[test]
    fn three_dates_interleave_deltas() {
        let entries = [
            entry("2026-01-01", [50.0; AXIS_COUNT]),
            entry("2026-02-01", [60.0; AXIS_COUNT]),
            entry("2026-03-01", [55.0; AXIS_COUNT]),
        ];
        let table = ComparisonTable::build(&entries);
        let first_cells: Vec<_> = table.rows.iter().map(|r| r.cells[0].text.as_str()).collect();
        assert_eq!(
            first_cells,
            ["2026-01-01", "2026-02-01", "Delta", "2026-03-01", "Delta"]
        );
        assert_eq!(table.rows[2].cells[1].text, "+10");
        assert_eq!(table.rows[4].cells[1].text, "-5");
        assert_eq!(table.rows[3].cells[0].color, PALETTE[2]);
    }

    #[test]
    fn single_date_has_no_delta_row() {
        let figure = build_radar_figure(
            "Ana",
            &[entry("2026-01-01", [10.0; AXIS_COUNT])],
            &RenderOptions::default(),
        );
        assert_eq!(figure.table.rows.len(), 1);
        assert_eq!(figure.traces.len(), 1);
        assert_eq!(figure.traces[0].color, PALETTE[0]);
        assert_eq!(figure.grid.rings.len(), 5);
    }

    #[test]
    fn palette_cycles() {
        assert_eq!(palette_color(10), palette_color(0));
        assert_eq!(palette_color(13), PALETTE[3]);
    }

    #[test]
    fn ring_levels_parse_and_validate() {
        assert_eq!(parse_ring_levels("0, 20,40 ,100").unwrap(), vec![0.0, 20.0, 40.0, 100.0]);
        assert!(parse_ring_levels("0,x").is_err());
        let mut options = RenderOptions {
            ring_levels: vec![0.0, 120.0],
            ..RenderOptions::default()
        };
        assert!(options.validate().is_err());
        options.ring_levels.clear();
        assert!(options.validate().is_err());
        assert!(RenderOptions::default().validate().is_ok());
    }
}
