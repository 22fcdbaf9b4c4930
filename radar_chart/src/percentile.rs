//! Percentile-rank engine.
//!
//! Percentiles are relative to the athletes in one input file: a value's
//! rank within its column divided by the number of non-missing values.
//! Results lie in (0, 1]; the column maximum always scores 1.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::columns::ColumnMapping;
use crate::metrics::{MetricKey, AXIS_COUNT};
use crate::table::{coerce_numeric, RawTable};
use crate::validate::AthleteRow;
use crate::RadarError;

/// How equal values share a rank.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TieMethod {
    /// Tied values take the lowest rank of their group: `[1, 2, 2, 4]`.
    Min,
    /// Tied values take the mean rank of their group: `[1, 2.5, 2.5, 4]`.
    Average,
}

impl Default for TieMethod {
    fn default() -> Self {
        TieMethod::Min
    }
}

impl fmt::Display for TieMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TieMethod::Min => "min",
            TieMethod::Average => "average",
        })
    }
}

/// 1-based ascending ranks.
pub fn rank(values: &[f64], ties: TieMethod) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let group_rank = match ties {
            TieMethod::Min => (start + 1) as f64,
            TieMethod::Average => (start + 1 + end) as f64 / 2.0,
        };
        for &idx in &order[start..end] {
            ranks[idx] = group_rank;
        }
        start = end;
    }
    ranks
}

/// Percent rank over the present values; missing inputs stay missing and do
/// not count toward the denominator.
pub fn percent_rank(values: &[Option<f64>], ties: TieMethod) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let count = present.len() as f64;
    let mut ranks = rank(&present, ties).into_iter();
    values
        .iter()
        .map(|v| v.and_then(|_| ranks.next()).map(|r| r / count))
        .collect()
}

/// One athlete × metric observation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LongRecord {
    pub athlete_name: String,
    pub metric: MetricKey,
    pub raw_value: f64,
    pub percentile: f64,
}

/// One athlete's five percentiles in axis order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WideRecord {
    pub athlete_name: String,
    pub percentiles: [f64; AXIS_COUNT],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PercentileOutput {
    /// Athlete-major, metric-minor.
    pub long: Vec<LongRecord>,
    /// One per input row, input order.
    pub wide: Vec<WideRecord>,
}

/// Percentiles for rows that already passed validation.
pub fn percentiles_from_rows(
    rows: &[AthleteRow],
    ties: TieMethod,
) -> Result<PercentileOutput, RadarError> {
    if rows.is_empty() {
        return Err(RadarError::EmptyInput);
    }
    let mut columns = Vec::with_capacity(AXIS_COUNT);
    for metric in MetricKey::ALL {
        let values: Vec<f64> = rows.iter().map(|r| r.values[metric.index()]).collect();
        let n = values.len() as f64;
        let pct: Vec<f64> = rank(&values, ties).into_iter().map(|r| r / n).collect();
        columns.push(pct);
    }

    let mut output = PercentileOutput::default();
    for (idx, row) in rows.iter().enumerate() {
        let mut percentiles = [0.0; AXIS_COUNT];
        for metric in MetricKey::ALL {
            let pct = columns[metric.index()][idx];
            percentiles[metric.index()] = pct;
            output.long.push(LongRecord {
                athlete_name: row.athlete_name.clone(),
                metric,
                raw_value: row.values[metric.index()],
                percentile: pct,
            });
        }
        output.wide.push(WideRecord {
            athlete_name: row.athlete_name.clone(),
            percentiles,
        });
    }
    debug!(athletes = rows.len(), ties = %ties, "percentiles computed");
    Ok(output)
}

/// Compute percentiles straight from a raw table.
///
/// Checks its inputs independently of `validate`: an empty table, a metric
/// column with no numeric values, or any non-numeric cell is an error.
pub fn compute_percentiles(
    table: &RawTable,
    mapping: &ColumnMapping,
    ties: TieMethod,
) -> Result<PercentileOutput, RadarError> {
    if table.is_empty() {
        return Err(RadarError::EmptyInput);
    }
    let column_index = |name: &str| {
        table.column_index(name).ok_or_else(|| RadarError::Validation {
            problems: vec![format!("Missing column: {name}")],
        })
    };

    let name_col = column_index(&mapping.athlete_name)?;
    let mut metric_values: Vec<Vec<Option<f64>>> = Vec::with_capacity(AXIS_COUNT);
    let mut non_numeric = Vec::new();
    for metric in MetricKey::ALL {
        let name = mapping.metric(metric);
        let values: Vec<Option<f64>> = table.column(column_index(name)?).map(coerce_numeric).collect();
        if values.iter().all(Option::is_none) {
            return Err(RadarError::DegenerateMetric {
                column: name.to_string(),
            });
        }
        if values.iter().any(Option::is_none) {
            non_numeric.push(name.to_string());
        }
        metric_values.push(values);
    }
    if !non_numeric.is_empty() {
        return Err(RadarError::NonNumeric {
            columns: non_numeric,
        });
    }

    let rows: Vec<AthleteRow> = (0..table.len())
        .map(|row| {
            let mut values = [0.0; AXIS_COUNT];
            for (slot, column) in values.iter_mut().zip(&metric_values) {
                *slot = column[row].unwrap_or_default();
            }
            AthleteRow {
                athlete_name: table.cell(row, name_col).unwrap_or_default().trim().to_string(),
                values,
            }
        })
        .collect();
    percentiles_from_rows(&rows, ties)
}

/// Diagnostic view of one column's percentile behaviour.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PercentileSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub has_ties: bool,
    pub percentiles: Vec<f64>,
}

pub fn summarize(values: &[f64], ties: TieMethod) -> Result<PercentileSummary, RadarError> {
    if values.is_empty() {
        return Err(RadarError::EmptyInput);
    }
    let n = values.len() as f64;
    let percentiles: Vec<f64> = rank(values, ties).into_iter().map(|r| r / n).collect();
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(PercentileSummary {
        count: values.len(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        has_ties: sorted.windows(2).any(|w| w[0] == w[1]),
        percentiles,
    })
}
