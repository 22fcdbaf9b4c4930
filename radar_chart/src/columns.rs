//! Column resolution: spreadsheet headers → semantic fields.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::metrics::{FieldKey, MetricKey, AXIS_COUNT};
use crate::RadarError;

/// Possibly incomplete assignment of fields to header names.
pub type PartialMapping = BTreeMap<FieldKey, String>;

/// A total mapping: every required field names one input column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMapping {
    pub athlete_name: String,
    pub metrics: [String; AXIS_COUNT],
}

impl ColumnMapping {
    /// Build from a partial mapping, or return the fields it lacks.
    pub fn from_partial(partial: &PartialMapping) -> Result<Self, Vec<FieldKey>> {
        let missing: Vec<FieldKey> = FieldKey::REQUIRED
            .into_iter()
            .filter(|field| !partial.contains_key(field))
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }
        let column = |field: FieldKey| partial[&field].clone();
        Ok(Self {
            athlete_name: column(FieldKey::AthleteName),
            metrics: MetricKey::ALL.map(|m| column(FieldKey::Metric(m))),
        })
    }

    pub fn column(&self, field: FieldKey) -> &str {
        match field {
            FieldKey::AthleteName => &self.athlete_name,
            FieldKey::Metric(metric) => self.metric(metric),
        }
    }

    pub fn metric(&self, metric: MetricKey) -> &str {
        &self.metrics[metric.index()]
    }

    pub fn to_partial(&self) -> PartialMapping {
        FieldKey::REQUIRED
            .into_iter()
            .map(|field| (field, self.column(field).to_string()))
            .collect()
    }

    /// `key=column` pairs in resolution order, for logs.
    pub fn describe(&self) -> String {
        FieldKey::REQUIRED
            .iter()
            .map(|field| format!("{}={}", field.key(), self.column(*field)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Outcome of automatic header detection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappingResult {
    pub mapping: PartialMapping,
    pub missing: Vec<FieldKey>,
}

impl MappingResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

fn normalize(header: &str) -> String {
    header.trim().to_lowercase()
}

/// First candidate (in priority order) that matches an unclaimed header.
/// Headers that normalise identically resolve to the last one, mirroring a
/// lowercase lookup table built over the header row.
fn match_column<S: AsRef<str>>(
    headers: &[S],
    candidates: &[&str],
    claimed: &[&str],
) -> Option<String> {
    candidates.iter().find_map(|candidate| {
        let wanted = normalize(candidate);
        headers
            .iter()
            .rev()
            .map(|h| h.as_ref())
            .find(|h| normalize(h) == wanted)
            .filter(|h| !claimed.contains(h))
            .map(str::to_string)
    })
}

/// Match each required field against its synonym list. Earlier fields claim
/// headers first, so a header can serve at most one field.
pub fn detect_mapping<S: AsRef<str>>(headers: &[S]) -> MappingResult {
    let mut result = MappingResult::default();
    for field in FieldKey::REQUIRED {
        let claimed: Vec<&str> = result.mapping.values().map(String::as_str).collect();
        match match_column(headers, field.candidates(), &claimed) {
            Some(column) => {
                result.mapping.insert(field, column);
            }
            None => result.missing.push(field),
        }
    }
    result
}

/// Resolve a total mapping from an explicit one when given, otherwise by
/// detection. Either way an incomplete result signals `MappingIncomplete`
/// carrying the best-effort suggestion.
pub fn resolve_mapping<S: AsRef<str>>(
    headers: &[S],
    explicit: Option<&PartialMapping>,
) -> Result<ColumnMapping, RadarError> {
    let suggested = match explicit {
        Some(mapping) => mapping.clone(),
        None => detect_mapping(headers).mapping,
    };
    ColumnMapping::from_partial(&suggested).map_err(|missing| RadarError::MappingIncomplete {
        missing,
        suggested,
        columns: headers.iter().map(|h| h.as_ref().to_string()).collect(),
    })
}

/// Parse a JSON object of `field key → column name`.
pub fn parse_mapping_json(text: &str) -> Result<PartialMapping, RadarError> {
    let raw: BTreeMap<String, String> = serde_json::from_str(text)?;
    let mut mapping = PartialMapping::new();
    for (key, column) in raw {
        let field: FieldKey = key.parse()?;
        if column.trim().is_empty() {
            continue;
        }
        mapping.insert(field, column);
    }
    Ok(mapping)
}

pub fn load_mapping(path: &Path) -> Result<PartialMapping, RadarError> {
    let text = fs::read_to_string(path)?;
    parse_mapping_json(&text)
}
