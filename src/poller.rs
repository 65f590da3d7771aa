// Background poller: every cycle, paired reads for the octet counters, single reads for the rest,
// then aggregate and publish. Every await point races the cancellation token.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::aggregator::{Aggregator, CycleReadings};
use crate::counter_client::{CounterClient, CounterError, Device};
use crate::models::{CounterReading, CounterWidth, Metric, Oid};
use crate::snapshot_store::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling(Metric),
    WaitingInterval,
    Publishing,
    Stopped,
}

/// Device, counters and timing for one poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub device: Device,
    /// Identifier queried for each metric; every [`Metric`] must be present.
    pub counters: BTreeMap<Metric, Oid>,
    pub counter_width: CounterWidth,
    /// Gap between the two reads of an octet counter; also the rate interval.
    pub sample_interval: Duration,
    /// How often a new cycle starts. Missed ticks are skipped when a cycle overruns.
    pub cycle_interval: Duration,
    /// Upper bound on a single counter query.
    pub request_timeout: Duration,
    /// Samples kept per series; `None` keeps the full history.
    pub history_window: Option<usize>,
    /// How often to log poller stats at INFO level.
    pub stats_log_interval: Duration,
}

impl PollerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.device.address.trim().is_empty(),
            "device address must be non-empty"
        );
        anyhow::ensure!(
            !self.device.community.is_empty(),
            "device community must be non-empty"
        );
        anyhow::ensure!(
            !self.sample_interval.is_zero(),
            "sample interval must be > 0"
        );
        anyhow::ensure!(!self.cycle_interval.is_zero(), "cycle interval must be > 0");
        anyhow::ensure!(
            !self.request_timeout.is_zero(),
            "request timeout must be > 0"
        );
        anyhow::ensure!(
            !self.stats_log_interval.is_zero(),
            "stats log interval must be > 0"
        );
        for metric in Metric::ALL {
            anyhow::ensure!(
                self.counters.contains_key(&metric),
                "no counter identifier configured for {}",
                metric
            );
        }
        Ok(())
    }
}

/// Running poller. Dropping the handle leaves the task running; call [`PollerHandle::stop`].
#[derive(Debug)]
pub struct PollerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<PollerState>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    /// Watch the state machine, e.g. to wait for `Stopped`.
    pub fn state_changes(&self) -> watch::Receiver<PollerState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signals cancellation and waits for the loop to reach `Stopped`.
    /// Nothing is published after this returns.
    pub async fn stop(self) -> anyhow::Result<()> {
        self.cancel.cancel();
        self.join
            .await
            .map_err(|e| anyhow::anyhow!("poller task join: {}", e))
    }
}

/// Validates `config` and spawns the polling loop. Fails fast on configuration errors.
pub fn start_polling<C: CounterClient>(
    client: C,
    store: Arc<SnapshotStore>,
    config: PollerConfig,
) -> anyhow::Result<PollerHandle> {
    config.validate()?;

    let cancel = CancellationToken::new();
    let (state_tx, state_rx) = watch::channel(PollerState::Idle);
    let span = tracing::span!(
        tracing::Level::DEBUG,
        "poller",
        address = %config.device.address,
        sample_interval_ms = config.sample_interval.as_millis() as u64
    );

    let poller = Poller {
        aggregator: Aggregator::new(config.counter_width, config.history_window),
        client,
        config,
        store,
        state_tx,
        cancel: cancel.clone(),
        failing: HashSet::new(),
        last_unavailable: 0,
    };
    let join = tokio::spawn(poller.run().instrument(span));

    Ok(PollerHandle {
        cancel,
        state: state_rx,
        join,
    })
}

struct Poller<C> {
    client: C,
    config: PollerConfig,
    aggregator: Aggregator,
    store: Arc<SnapshotStore>,
    state_tx: watch::Sender<PollerState>,
    cancel: CancellationToken,
    /// Metrics whose last query failed; used to warn once per outage instead of every cycle.
    failing: HashSet<Metric>,
    last_unavailable: usize,
}

impl<C: CounterClient> Poller<C> {
    async fn run(mut self) {
        let mut cycle_tick = interval(self.config.cycle_interval);
        cycle_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(self.config.stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            self.set_state(PollerState::Idle);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = stats_log_tick.tick() => {
                    self.log_stats();
                    continue;
                }
                _ = cycle_tick.tick() => {}
            }
            if self.run_cycle().await.is_none() {
                break;
            }
        }

        self.set_state(PollerState::Stopped);
        debug!(
            cycles_completed = self.aggregator.cycles(),
            "Poller shutting down"
        );
    }

    /// One full cycle. `None` means cancellation was observed and nothing was published.
    async fn run_cycle(&mut self) -> Option<()> {
        for metric in Metric::RATE {
            let baseline = self.fetch(metric).await?;
            self.aggregator.observe_baseline(metric, baseline);
        }

        self.set_state(PollerState::WaitingInterval);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            _ = sleep(self.config.sample_interval) => {}
        }

        let mut readings = CycleReadings::with_capacity(Metric::ALL.len());
        for metric in Metric::ALL {
            let reading = self.fetch(metric).await?;
            readings.insert(metric, reading);
        }

        if self.cancel.is_cancelled() {
            return None;
        }
        self.set_state(PollerState::Publishing);
        let snapshot = self
            .aggregator
            .record_cycle(readings, self.config.sample_interval.as_secs_f64());
        self.last_unavailable = snapshot.unavailable_count();
        debug!(
            cycle = snapshot.cycle,
            unavailable_fields = self.last_unavailable,
            "Snapshot published"
        );
        self.store.publish(snapshot);
        Some(())
    }

    /// Queries one counter under the per-call timeout. `None` if cancelled mid-flight.
    async fn fetch(&mut self, metric: Metric) -> Option<Result<CounterReading, CounterError>> {
        self.set_state(PollerState::Polling(metric));
        let result = match self.config.counters.get(&metric) {
            Some(oid) => {
                let request_timeout = self.config.request_timeout;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return None,
                    r = timeout(request_timeout, self.client.fetch_counter(oid, &self.config.device)) => {
                        r.unwrap_or_else(|_| Err(CounterError::Unreachable(format!(
                            "no response within {:?}",
                            request_timeout
                        ))))
                    }
                }
            }
            None => Err(CounterError::NotFound(format!(
                "no identifier configured for {metric}"
            ))),
        };

        match result {
            Ok(raw) => {
                if self.failing.remove(&metric) {
                    info!(%metric, operation = "fetch_counter", "counter query recovered");
                }
                // Stamped on arrival; rates are measured between these instants.
                Some(Ok(CounterReading::new(metric, raw)))
            }
            Err(e) => {
                if self.failing.insert(metric) {
                    warn!(
                        error = %e,
                        %metric,
                        operation = "fetch_counter",
                        "counter query failed"
                    );
                } else {
                    debug!(error = %e, %metric, operation = "fetch_counter", "counter query still failing");
                }
                Some(Err(e))
            }
        }
    }

    fn log_stats(&self) {
        let latest = |metric: Metric| self.aggregator.latest_rate(metric);
        let (inbound, outbound) = (latest(Metric::InOctets), latest(Metric::OutOctets));
        let rate_age_ms = inbound
            .iter()
            .chain(outbound.iter())
            .map(|r| r.computed_at.elapsed().as_millis() as u64)
            .min();
        info!(
            cycles_completed = self.aggregator.cycles(),
            unavailable_fields = self.last_unavailable,
            failing_metrics = self.failing.len(),
            snapshot_subscribers = self.store.subscriber_count(),
            in_mbps = ?inbound.map(|r| r.megabits_per_second),
            out_mbps = ?outbound.map(|r| r.megabits_per_second),
            rate_age_ms = ?rate_age_ms,
            "poller stats"
        );
    }

    fn set_state(&self, state: PollerState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}
