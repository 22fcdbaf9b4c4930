use std::fs::{self, File};
use std::io::Write;
use std::panic;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use radar_chart::metrics::{MetricKey, AXIS_COUNT};
use radar_chart::render::{png_paths, remove_pngs};
use radar_chart::{render_document, render_png, PercentileOutput, RadarFigure, RenderedFigure};

/// Percentiles of one processed file, tagged with its test date.
#[derive(Clone, Debug)]
pub struct TaggedOutput {
    pub date_label: String,
    pub output: PercentileOutput,
}

pub const LONG_HEADER: [&str; 5] = [
    "athlete_name",
    "metric_key",
    "raw_value",
    "percentile_0_1",
    "test_date_label",
];

pub fn wide_header() -> Vec<String> {
    let mut header = Vec::with_capacity(AXIS_COUNT + 2);
    header.push("athlete_name".to_string());
    header.extend(
        MetricKey::ALL
            .iter()
            .map(|m| format!("{} percentile", m.axis_label())),
    );
    header.push("test_date_label".to_string());
    header
}

/// Shortest round-trip text that always keeps a decimal point: `1.0`, `0.5`.
fn csv_float(value: f64) -> String {
    format!("{value:?}")
}

pub fn write_long_csv(sessions: &[TaggedOutput], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_long_rows(sessions, &mut writer)
}

pub fn write_long_rows<W: Write>(
    sessions: &[TaggedOutput],
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record(LONG_HEADER)?;
    for session in sessions {
        for record in &session.output.long {
            writer.write_record([
                record.athlete_name.clone(),
                record.metric.axis_label().to_string(),
                csv_float(record.raw_value),
                csv_float(record.percentile),
                session.date_label.clone(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_wide_csv(sessions: &[TaggedOutput], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_wide_rows(sessions, &mut writer)
}

pub fn write_wide_rows<W: Write>(
    sessions: &[TaggedOutput],
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record(wide_header())?;
    for session in sessions {
        for record in &session.output.wide {
            let mut row = Vec::with_capacity(AXIS_COUNT + 2);
            row.push(record.athlete_name.clone());
            row.extend(record.percentiles.iter().map(|p| csv_float(*p)));
            row.push(session.date_label.clone());
            writer.write_record(&row)?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_document(path: &Path, title: &str, figures: &[RenderedFigure]) -> Result<()> {
    let html = render_document(title, figures);
    fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))
}

/// Rasterise one figure, turning backend panics into errors. A panicking
/// backend may still flush its buffer on drop, so leftovers are removed.
pub fn render_png_guard(figure: &RadarFigure, path: &Path) -> Result<Vec<PathBuf>, String> {
    let render = || render_png(figure, path).map_err(|e| format!("plotting error: {e}"));
    panic::catch_unwind(panic::AssertUnwindSafe(render)).unwrap_or_else(|_| {
        remove_pngs(&png_paths(path, figure.options.table_layout));
        Err("plotting backend panicked".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_chart::{build_radar_figure, HistoryEntry, LongRecord, RenderOptions, WideRecord};

    fn session() -> TaggedOutput {
        TaggedOutput {
            date_label: "2026-01-31".into(),
            output: PercentileOutput {
                long: vec![LongRecord {
                    athlete_name: "Ana, Jr".into(),
                    metric: MetricKey::RsiModified,
                    raw_value: 0.45,
                    percentile: 0.5,
                }],
                wide: vec![WideRecord {
                    athlete_name: "Ana, Jr".into(),
                    percentiles: [0.25, 0.5, 0.75, 1.0, 0.5],
                }],
            },
        }
    }

    fn rendered<F>(write: F) -> String
    where
        F: FnOnce(&mut csv::Writer<&mut Vec<u8>>) -> Result<()>,
    {
        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            write(&mut writer).unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn long_rows_use_axis_labels() {
        let text = rendered(|w| write_long_rows(&[session()], w));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "athlete_name,metric_key,raw_value,percentile_0_1,test_date_label"
        );
        assert_eq!(lines[1], "\"Ana, Jr\",Elasticity,0.45,0.5,2026-01-31");
    }

    #[test]
    fn wide_rows_have_one_column_per_axis() {
        let text = rendered(|w| write_wide_rows(&[session()], w));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "athlete_name,Jump Height percentile,Triple Ext percentile,\
             Elasticity percentile,Loading percentile,Braking percentile,test_date_label"
        );
        assert_eq!(lines[1], "\"Ana, Jr\",0.25,0.5,0.75,1.0,0.5,2026-01-31");
    }

    #[test]
    fn floats_keep_a_decimal_point() {
        assert_eq!(csv_float(1.0), "1.0");
        assert_eq!(csv_float(12.0), "12.0");
        assert_eq!(csv_float(0.45), "0.45");
        assert_eq!(csv_float(1.0 / 3.0), "0.3333333333333333");
    }

    #[test]
    fn png_guard_writes_png_without_system_fonts() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![HistoryEntry {
            date_label: "2026-01-31".into(),
            values: [50.0; AXIS_COUNT],
        }];
        let figure = build_radar_figure("Ana", &entries, &RenderOptions::default());
        let path = dir.path().join("Ana.png");
        let written = render_png_guard(&figure, &path).unwrap();
        assert_eq!(written, vec![path.clone()]);
        assert!(path.exists());
    }

    #[test]
    fn writes_csv_files_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let long = dir.path().join("percentiles_long.csv");
        let wide = dir.path().join("percentiles_wide.csv");
        write_long_csv(&[session()], &long).unwrap();
        write_wide_csv(&[session()], &wide).unwrap();
        assert_eq!(fs::read_to_string(&long).unwrap().lines().count(), 2);
        assert_eq!(fs::read_to_string(&wide).unwrap().lines().count(), 2);
    }
}
