// Shared test helpers: a scripted counter client and poller config

#![allow(dead_code)]

use ifstat::counter_client::{CounterClient, CounterError, Device};
use ifstat::models::{CounterWidth, Metric, Oid};
use ifstat::poller::PollerConfig;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

type Responder = Box<dyn Fn(usize) -> Result<u64, CounterError> + Send + Sync>;

/// Fake device: each identifier answers through a closure of its call index (0, 1, 2, ...).
/// Identifiers without a responder answer `NotFound`.
pub struct ScriptedClient {
    responders: HashMap<Oid, Responder>,
    call_counts: Mutex<HashMap<Oid, usize>>,
    calls: Mutex<Vec<(Oid, Instant)>>,
    delay: Option<Duration>,
    call_delays: HashMap<(Oid, usize), Duration>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            responders: HashMap::new(),
            call_counts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            call_delays: HashMap::new(),
        }
    }

    pub fn respond(
        mut self,
        metric: Metric,
        f: impl Fn(usize) -> Result<u64, CounterError> + Send + Sync + 'static,
    ) -> Self {
        self.responders.insert(oid_for(metric), Box::new(f));
        self
    }

    /// Every metric answers a constant value.
    pub fn all_constant(mut self, value: u64) -> Self {
        for metric in Metric::ALL {
            self = self.respond(metric, move |_| Ok(value));
        }
        self
    }

    /// Each query sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Only the `call`-th query of `metric` (0-based) sleeps this long before answering.
    pub fn with_call_delay(mut self, metric: Metric, call: usize, delay: Duration) -> Self {
        self.call_delays.insert((oid_for(metric), call), delay);
        self
    }

    /// Instants at which `metric` was queried, in order.
    pub fn call_times(&self, metric: Metric) -> Vec<Instant> {
        let oid = oid_for(metric);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == oid)
            .map(|(_, t)| *t)
            .collect()
    }
}

impl CounterClient for ScriptedClient {
    async fn fetch_counter(&self, oid: &Oid, _device: &Device) -> Result<u64, CounterError> {
        let idx = {
            let mut counts = self.call_counts.lock().unwrap();
            let n = counts.entry(oid.clone()).or_insert(0);
            let idx = *n;
            *n += 1;
            idx
        };
        let delay = self
            .call_delays
            .get(&(oid.clone(), idx))
            .copied()
            .or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push((oid.clone(), Instant::now()));
        match self.responders.get(oid) {
            Some(f) => f(idx),
            None => Err(CounterError::NotFound(oid.to_string())),
        }
    }
}

pub fn oid_for(metric: Metric) -> Oid {
    metric.default_oid(1, CounterWidth::Bits32)
}

pub fn test_device() -> Device {
    Device {
        address: "127.0.0.1".into(),
        port: 161,
        community: "public".into(),
    }
}

pub fn poller_config(sample_interval: Duration, cycle_interval: Duration) -> PollerConfig {
    PollerConfig {
        device: test_device(),
        counters: Metric::ALL.iter().map(|m| (*m, oid_for(*m))).collect(),
        counter_width: CounterWidth::Bits32,
        sample_interval,
        cycle_interval,
        request_timeout: Duration::from_secs(3),
        history_window: None,
        stats_log_interval: Duration::from_secs(3600),
    }
}
