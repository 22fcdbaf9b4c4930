use std::collections::HashMap;

use tracing::debug;

use crate::metrics::AXIS_COUNT;
use crate::percentile::WideRecord;

/// Percentiles from one input file, tagged with its test date.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionResult {
    pub date_label: String,
    pub wide: Vec<WideRecord>,
}

/// One dated observation, values on the 0–100 scale.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub date_label: String,
    pub values: [f64; AXIS_COUNT],
}

#[derive(Clone, Debug, PartialEq)]
pub struct AthleteHistory {
    pub athlete_name: String,
    pub entries: Vec<HistoryEntry>,
}

impl AthleteHistory {
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }
}

/// Join sessions into per-athlete histories.
///
/// Athletes appear in order of first appearance. Each history's dates follow
/// the order in which labels first occur across sessions. A label repeated
/// for the same athlete keeps the later values.
pub fn build_histories(sessions: &[SessionResult]) -> Vec<AthleteHistory> {
    let mut label_order: HashMap<&str, usize> = HashMap::new();
    for session in sessions {
        let next = label_order.len();
        label_order.entry(session.date_label.as_str()).or_insert(next);
    }

    let mut histories: Vec<AthleteHistory> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    for session in sessions {
        for record in &session.wide {
            let slot = *by_name.entry(record.athlete_name.as_str()).or_insert_with(|| {
                histories.push(AthleteHistory {
                    athlete_name: record.athlete_name.clone(),
                    entries: Vec::new(),
                });
                histories.len() - 1
            });
            let values = record.percentiles.map(|p| p * 100.0);
            let entries = &mut histories[slot].entries;
            match entries.iter_mut().find(|e| e.date_label == session.date_label) {
                Some(existing) => {
                    debug!(
                        athlete = %record.athlete_name,
                        date = %session.date_label,
                        "repeated date label, keeping later values"
                    );
                    existing.values = values;
                }
                None => entries.push(HistoryEntry {
                    date_label: session.date_label.clone(),
                    values,
                }),
            }
        }
    }

    for history in &mut histories {
        history
            .entries
            .sort_by_key(|e| label_order.get(e.date_label.as_str()).copied().unwrap_or(usize::MAX));
    }
    histories
}
