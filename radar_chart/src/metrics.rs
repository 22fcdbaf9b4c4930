//! Fixed metric set: the five radar axes and the athlete-name field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RadarError;

/// One of the five performance metrics. Declaration order is axis order and
/// therefore polygon vertex order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    JumpHeight,
    PeakPowerBm,
    RsiModified,
    EccPeakPowerBm,
    EccDecRfdBm,
}

pub const AXIS_COUNT: usize = 5;

impl MetricKey {
    pub const ALL: [MetricKey; AXIS_COUNT] = [
        MetricKey::JumpHeight,
        MetricKey::PeakPowerBm,
        MetricKey::RsiModified,
        MetricKey::EccPeakPowerBm,
        MetricKey::EccDecRfdBm,
    ];

    pub fn index(self) -> usize {
        match self {
            MetricKey::JumpHeight => 0,
            MetricKey::PeakPowerBm => 1,
            MetricKey::RsiModified => 2,
            MetricKey::EccPeakPowerBm => 3,
            MetricKey::EccDecRfdBm => 4,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            MetricKey::JumpHeight => "jump_height",
            MetricKey::PeakPowerBm => "peak_power_bm",
            MetricKey::RsiModified => "rsi_modified",
            MetricKey::EccPeakPowerBm => "ecc_peak_power_bm",
            MetricKey::EccDecRfdBm => "ecc_dec_rfd_bm",
        }
    }

    /// Display label used on the radar axis and in output column names.
    pub fn axis_label(self) -> &'static str {
        match self {
            MetricKey::JumpHeight => "Jump Height",
            MetricKey::PeakPowerBm => "Triple Ext",
            MetricKey::RsiModified => "Elasticity",
            MetricKey::EccPeakPowerBm => "Loading",
            MetricKey::EccDecRfdBm => "Braking",
        }
    }

    /// Header synonyms in match priority order (lowercase, trimmed).
    pub fn header_candidates(self) -> &'static [&'static str] {
        match self {
            MetricKey::JumpHeight => &["jump height (in)", "jump height", "jump ht (in)", "jump ht"],
            MetricKey::PeakPowerBm => &["peak power/bm", "peak power / bm", "peak power per bm"],
            MetricKey::RsiModified => &["rsi-modified", "rsi modified", "rsimodified", "rsi mod"],
            MetricKey::EccPeakPowerBm => &[
                "eccentric peak power/bm",
                "eccentric peak power / bm",
                "ecc peak power/bm",
                "ecc peak power / bm",
            ],
            MetricKey::EccDecRfdBm => &[
                "eccentric deceleration rfd/bm",
                "eccentric deceleration rfd / bm",
                "ecc deceleration rfd/bm",
                "ecc decel rfd/bm",
            ],
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// All axis labels in axis order.
pub fn axis_labels() -> [&'static str; AXIS_COUNT] {
    MetricKey::ALL.map(MetricKey::axis_label)
}

pub const NAME_CANDIDATES: &[&str] = &[
    "about",
    "athlete",
    "athlete name",
    "full name",
    "name",
    "player",
];

/// A required semantic field of an input table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    AthleteName,
    Metric(MetricKey),
}

impl FieldKey {
    /// Required fields in resolution order.
    pub const REQUIRED: [FieldKey; AXIS_COUNT + 1] = [
        FieldKey::AthleteName,
        FieldKey::Metric(MetricKey::JumpHeight),
        FieldKey::Metric(MetricKey::PeakPowerBm),
        FieldKey::Metric(MetricKey::RsiModified),
        FieldKey::Metric(MetricKey::EccPeakPowerBm),
        FieldKey::Metric(MetricKey::EccDecRfdBm),
    ];

    pub fn key(self) -> &'static str {
        match self {
            FieldKey::AthleteName => "athlete_name",
            FieldKey::Metric(metric) => metric.key(),
        }
    }

    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            FieldKey::AthleteName => NAME_CANDIDATES,
            FieldKey::Metric(metric) => metric.header_candidates(),
        }
    }

    /// Human label for prompts, e.g. "Peak Power Bm".
    pub fn title(self) -> String {
        self.key()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FieldKey {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FieldKey::REQUIRED
            .into_iter()
            .find(|field| field.key() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = FieldKey::REQUIRED.iter().map(|f| f.key()).collect();
                RadarError::InvalidParameter(format!(
                    "unknown field '{}': expected one of {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_order_is_fixed() {
        assert_eq!(
            axis_labels(),
            ["Jump Height", "Triple Ext", "Elasticity", "Loading", "Braking"]
        );
        for (idx, metric) in MetricKey::ALL.iter().enumerate() {
            assert_eq!(metric.index(), idx);
        }
    }

    #[test]
    fn field_keys_parse_case_insensitively() {
        assert_eq!(
            "Jump_Height".parse::<FieldKey>().unwrap(),
            FieldKey::Metric(MetricKey::JumpHeight)
        );
        assert_eq!("athlete_name".parse::<FieldKey>().unwrap(), FieldKey::AthleteName);
        assert!("vertical".parse::<FieldKey>().is_err());
    }

    #[test]
    fn titles_are_word_capitalised() {
        assert_eq!(FieldKey::AthleteName.title(), "Athlete Name");
        assert_eq!(FieldKey::Metric(MetricKey::EccDecRfdBm).title(), "Ecc Dec Rfd Bm");
    }
}
