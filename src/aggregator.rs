// Owns every metric's rolling series and turns one cycle of readings into a snapshot.
// A metric that failed this cycle is published as Unavailable, never as zero.

use std::collections::HashMap;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::counter_client::CounterError;
use crate::models::{
    CounterReading, CounterWidth, FacilityStats, Metric, MetricValue, NetworkSnapshot, RateSample,
};
use crate::rate::compute_rate;
use crate::series::{RollingSeries, SeriesError, SeriesStats};

/// One cycle's worth of counter results, keyed by metric. Missing entries count as failures.
pub type CycleReadings = HashMap<Metric, Result<CounterReading, CounterError>>;

pub struct Aggregator {
    width: CounterWidth,
    /// Last raw reading per octet counter; the next reading is rated against it.
    previous: HashMap<Metric, CounterReading>,
    rates: HashMap<Metric, RollingSeries<f64>>,
    counts: HashMap<Metric, RollingSeries<u64>>,
    latest_rates: HashMap<Metric, RateSample>,
    cycle: u64,
}

impl Aggregator {
    /// `history_window` bounds every series to the most recent N samples; `None` keeps everything.
    pub fn new(width: CounterWidth, history_window: Option<usize>) -> Self {
        let rates = Metric::RATE
            .iter()
            .map(|m| (*m, RollingSeries::with_capacity(*m, history_window)))
            .collect();
        let counts = Metric::COUNT
            .iter()
            .map(|m| (*m, RollingSeries::with_capacity(*m, history_window)))
            .collect();
        Self {
            width,
            previous: HashMap::new(),
            rates,
            counts,
            latest_rates: HashMap::new(),
            cycle: 0,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Installs the first reading of a paired rate read. A failed baseline drops the retained
    /// reading so this cycle's rate comes out Unavailable instead of spanning an unknown interval.
    pub fn observe_baseline(
        &mut self,
        metric: Metric,
        reading: Result<CounterReading, CounterError>,
    ) {
        if !metric.is_rate() {
            return;
        }
        match reading {
            Ok(r) => {
                self.previous.insert(metric, r);
            }
            Err(e) => {
                debug!(%metric, error = %e, "baseline unavailable");
                self.previous.remove(&metric);
            }
        }
    }

    /// Folds one cycle into the series. `interval_secs` is the nominal sampling interval and a
    /// floor for each rate's interval; the measured gap between the two readings is used when longer.
    pub fn record_cycle(
        &mut self,
        mut readings: CycleReadings,
        interval_secs: f64,
    ) -> NetworkSnapshot {
        self.cycle += 1;

        let in_facility_stats = self.record_rate(
            Metric::InOctets,
            readings.remove(&Metric::InOctets),
            interval_secs,
        );
        let out_facility_stats = self.record_rate(
            Metric::OutOctets,
            readings.remove(&Metric::OutOctets),
            interval_secs,
        );

        let mut count = |metric: Metric| self.record_count(metric, readings.remove(&metric));
        let in_error = count(Metric::InErrors);
        let out_error = count(Metric::OutErrors);
        let in_discard = count(Metric::InDiscards);
        let out_discard = count(Metric::OutDiscards);
        let in_unicast = count(Metric::InUcastPkts);
        let out_unicast = count(Metric::OutUcastPkts);
        let in_non_unicast = count(Metric::InNUcastPkts);
        let out_non_unicast = count(Metric::OutNUcastPkts);

        NetworkSnapshot {
            cycle: self.cycle,
            timestamp: now_millis(),
            in_error,
            out_error,
            in_unicast,
            out_unicast,
            in_discard,
            out_discard,
            in_non_unicast,
            out_non_unicast,
            in_facility_stats,
            out_facility_stats,
        }
    }

    fn record_rate(
        &mut self,
        metric: Metric,
        reading: Option<Result<CounterReading, CounterError>>,
        interval_secs: f64,
    ) -> MetricValue<FacilityStats> {
        let reading = match reading {
            Some(Ok(r)) => r,
            Some(Err(e)) => {
                debug!(%metric, cycle = self.cycle, error = %e, "rate metric unavailable");
                self.previous.remove(&metric);
                return MetricValue::Unavailable;
            }
            None => {
                self.previous.remove(&metric);
                return MetricValue::Unavailable;
            }
        };

        let Some(previous) = self.previous.insert(metric, reading) else {
            debug!(%metric, "no previous reading to rate against");
            return MetricValue::Unavailable;
        };
        let elapsed_secs = reading
            .observed_at
            .saturating_duration_since(previous.observed_at)
            .as_secs_f64()
            .max(interval_secs);
        let mbps = match compute_rate(
            previous.raw_value,
            reading.raw_value,
            elapsed_secs,
            self.width,
        ) {
            Ok(v) => v,
            Err(e) => {
                warn!(%metric, error = %e, "rate computation failed");
                return MetricValue::Unavailable;
            }
        };

        self.latest_rates.insert(
            metric,
            RateSample {
                metric,
                megabits_per_second: mbps,
                computed_at: Instant::now(),
            },
        );
        let Some(series) = self.rates.get_mut(&metric) else {
            return MetricValue::Unavailable;
        };
        series.append(mbps);
        series.stats().ok().map(FacilityStats::from).into()
    }

    fn record_count(
        &mut self,
        metric: Metric,
        reading: Option<Result<CounterReading, CounterError>>,
    ) -> MetricValue<u64> {
        match reading {
            Some(Ok(r)) => {
                if let Some(series) = self.counts.get_mut(&metric) {
                    series.append(r.raw_value);
                }
                MetricValue::Available(r.raw_value)
            }
            Some(Err(e)) => {
                debug!(%metric, cycle = self.cycle, error = %e, "count metric unavailable");
                MetricValue::Unavailable
            }
            None => MetricValue::Unavailable,
        }
    }

    /// Rolling stats over an octet counter's Mbps series.
    pub fn rate_stats(&self, metric: Metric) -> Result<SeriesStats<f64>, SeriesError> {
        self.rates
            .get(&metric)
            .ok_or(SeriesError::EmptySeries(metric))?
            .stats()
    }

    /// Rolling stats over a raw count metric's values.
    pub fn count_stats(&self, metric: Metric) -> Result<SeriesStats<u64>, SeriesError> {
        self.counts
            .get(&metric)
            .ok_or(SeriesError::EmptySeries(metric))?
            .stats()
    }

    pub fn latest_rate(&self, metric: Metric) -> Option<RateSample> {
        self.latest_rates.get(&metric).copied()
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}
