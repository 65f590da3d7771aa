// Published snapshot models

use serde::{Deserialize, Serialize};

/// A snapshot field: either this cycle's value or an explicit marker that the metric could not be refreshed.
/// Serializes as `{"state":"available","value":…}` / `{"state":"unavailable"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum MetricValue<T> {
    Available(T),
    Unavailable,
}

impl<T> MetricValue<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, MetricValue::Available(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            MetricValue::Available(v) => Some(v),
            MetricValue::Unavailable => None,
        }
    }
}

impl<T> From<Option<T>> for MetricValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => MetricValue::Available(v),
            None => MetricValue::Unavailable,
        }
    }
}

/// Rolling statistics over the byte-rate series, in Mbps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityStats {
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
    pub current: f64,
}

/// Complete set of values published after one polling cycle. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    /// Polling cycle that produced this snapshot; 0 before the first publish.
    pub cycle: u64,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    pub in_error: MetricValue<u64>,
    pub out_error: MetricValue<u64>,
    pub in_unicast: MetricValue<u64>,
    pub out_unicast: MetricValue<u64>,
    pub in_discard: MetricValue<u64>,
    pub out_discard: MetricValue<u64>,
    pub in_non_unicast: MetricValue<u64>,
    pub out_non_unicast: MetricValue<u64>,
    pub in_facility_stats: MetricValue<FacilityStats>,
    pub out_facility_stats: MetricValue<FacilityStats>,
}

impl NetworkSnapshot {
    /// Placeholder held by the store until the first cycle completes.
    pub fn empty() -> Self {
        Self {
            cycle: 0,
            timestamp: 0,
            in_error: MetricValue::Unavailable,
            out_error: MetricValue::Unavailable,
            in_unicast: MetricValue::Unavailable,
            out_unicast: MetricValue::Unavailable,
            in_discard: MetricValue::Unavailable,
            out_discard: MetricValue::Unavailable,
            in_non_unicast: MetricValue::Unavailable,
            out_non_unicast: MetricValue::Unavailable,
            in_facility_stats: MetricValue::Unavailable,
            out_facility_stats: MetricValue::Unavailable,
        }
    }

    /// Number of fields marked unavailable.
    pub fn unavailable_count(&self) -> usize {
        let counts = [
            &self.in_error,
            &self.out_error,
            &self.in_unicast,
            &self.out_unicast,
            &self.in_discard,
            &self.out_discard,
            &self.in_non_unicast,
            &self.out_non_unicast,
        ];
        let stats = [&self.in_facility_stats, &self.out_facility_stats];
        counts.iter().filter(|v| !v.is_available()).count()
            + stats.iter().filter(|v| !v.is_available()).count()
    }
}

impl Default for NetworkSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
