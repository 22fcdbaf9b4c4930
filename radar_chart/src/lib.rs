//! Percentile ranking and radar chart rendering for athlete performance tests.
//!
//! The pipeline per input file is: resolve columns → validate → compute
//! percentiles. Sessions from several files are then joined into
//! per-athlete histories, and each history becomes one radar figure.

use plotters::drawing::DrawingAreaErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod columns;
pub mod dates;
pub mod figure;
pub mod history;
pub mod metrics;
pub mod percentile;
pub mod raster;
pub mod render;
pub mod table;
pub mod validate;

pub use columns::{detect_mapping, resolve_mapping, ColumnMapping, MappingResult, PartialMapping};
pub use dates::{parse_date_label, resolve_date_label, DateLabel, DateSource};
pub use figure::{build_radar_figure, RadarFigure, RenderOptions, TableLayout};
pub use history::{build_histories, AthleteHistory, HistoryEntry, SessionResult};
pub use metrics::{FieldKey, MetricKey, AXIS_COUNT};
pub use percentile::{
    compute_percentiles, percentiles_from_rows, LongRecord, PercentileOutput, TieMethod,
    WideRecord,
};
pub use render::{render_athlete_figure, render_document, render_png, RenderedFigure};
pub use table::RawTable;
pub use validate::{validate, AthleteRow, ValidatedTable};

#[derive(Error, Debug)]
pub enum RadarError {
    #[error("column mapping required; unresolved keys: {}", join_fields(.missing))]
    MappingIncomplete {
        missing: Vec<FieldKey>,
        suggested: PartialMapping,
        columns: Vec<String>,
    },
    #[error("validation failed: {}", .problems.join("; "))]
    Validation { problems: Vec<String> },
    #[error("no athlete rows found")]
    EmptyInput,
    #[error("no numeric values found in column: {column}")]
    DegenerateMetric { column: String },
    #[error("non-numeric or missing values in column(s): {}", .columns.join(", "))]
    NonNumeric { columns: Vec<String> },
    #[error("no date label resolved for {file}")]
    DateUnresolved { file: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rendering failed: {0}")]
    Render(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RadarError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RadarError::Render(err.to_string())
    }
}

fn join_fields(fields: &[FieldKey]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Run-wide knobs shared by the engine and the renderer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Params {
    pub ties: TieMethod,
    pub render: RenderOptions,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            ties: TieMethod::Min,
            render: RenderOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_user_facing_detail() {
        let err = RadarError::MappingIncomplete {
            missing: vec![
                FieldKey::AthleteName,
                FieldKey::Metric(MetricKey::RsiModified),
            ],
            suggested: PartialMapping::new(),
            columns: vec!["Who".into()],
        };
        assert_eq!(
            err.to_string(),
            "column mapping required; unresolved keys: athlete_name, rsi_modified"
        );

        let err = RadarError::Validation {
            problems: vec!["first".into(), "second".into()],
        };
        assert_eq!(err.to_string(), "validation failed: first; second");
    }

    #[test]
    fn default_params_use_min_rank_and_quartile_rings() {
        let params = Params::default();
        assert_eq!(params.ties, TieMethod::Min);
        assert_eq!(params.render.ring_levels, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
        assert_eq!(params.render.table_layout, TableLayout::Below);
    }
}
