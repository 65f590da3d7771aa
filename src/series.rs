// Rolling current/min/max/mean over one metric's samples.
// Accumulators are updated per append; a full rescan only happens when a bounded window evicts an extreme.

use serde::Serialize;
use std::collections::VecDeque;

use crate::models::{FacilityStats, Metric};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SeriesError {
    #[error("series {0} has no samples yet")]
    EmptySeries(Metric),
}

/// Value type a [`RollingSeries`] can hold.
pub trait Sample: Copy + PartialOrd + std::fmt::Debug {
    fn as_f64(self) -> f64;
}

impl Sample for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

impl Sample for u64 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStats<T> {
    pub average: f64,
    pub maximum: T,
    pub minimum: T,
    pub current: T,
}

impl From<SeriesStats<f64>> for FacilityStats {
    fn from(s: SeriesStats<f64>) -> Self {
        FacilityStats {
            average: s.average,
            maximum: s.maximum,
            minimum: s.minimum,
            current: s.current,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RollingSeries<T: Sample> {
    metric: Metric,
    samples: VecDeque<T>,
    /// `None` keeps every sample for the life of the process.
    capacity: Option<usize>,
    sum: f64,
    min: Option<T>,
    max: Option<T>,
}

impl<T: Sample> RollingSeries<T> {
    pub fn unbounded(metric: Metric) -> Self {
        Self::with_capacity(metric, None)
    }

    /// `Some(0)` is treated as unbounded.
    pub fn with_capacity(metric: Metric, capacity: Option<usize>) -> Self {
        let capacity = capacity.filter(|c| *c > 0);
        Self {
            metric,
            samples: VecDeque::with_capacity(capacity.unwrap_or(0)),
            capacity,
            sum: 0.0,
            min: None,
            max: None,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn current(&self) -> Option<T> {
        self.samples.back().copied()
    }

    pub fn append(&mut self, value: T) {
        self.samples.push_back(value);
        self.sum += value.as_f64();
        if self.min.is_none_or(|m| value < m) {
            self.min = Some(value);
        }
        if self.max.is_none_or(|m| value > m) {
            self.max = Some(value);
        }

        if let Some(cap) = self.capacity
            && self.samples.len() > cap
            && let Some(evicted) = self.samples.pop_front()
        {
            self.sum -= evicted.as_f64();
            let was_extreme = self.min.is_some_and(|m| evicted <= m)
                || self.max.is_some_and(|m| evicted >= m);
            if was_extreme {
                self.rescan();
            }
        }
    }

    pub fn stats(&self) -> Result<SeriesStats<T>, SeriesError> {
        let (Some(current), Some(minimum), Some(maximum)) = (self.current(), self.min, self.max)
        else {
            return Err(SeriesError::EmptySeries(self.metric));
        };
        Ok(SeriesStats {
            average: self.sum / self.samples.len() as f64,
            maximum,
            minimum,
            current,
        })
    }

    fn rescan(&mut self) {
        let mut iter = self.samples.iter().copied();
        let Some(first) = iter.next() else {
            self.min = None;
            self.max = None;
            self.sum = 0.0;
            return;
        };
        let (mut min, mut max, mut sum) = (first, first, first.as_f64());
        for v in iter {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
            sum += v.as_f64();
        }
        self.min = Some(min);
        self.max = Some(max);
        // Drops float drift accumulated by repeated subtraction.
        self.sum = sum;
    }
}
