use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::counter_client::{Device, SnmpVersion};
use crate::models::{CounterWidth, Metric, Oid};
use crate::poller::PollerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub device: DeviceConfig,
    pub polling: PollingConfig,
    /// Per-metric identifier overrides, e.g. `out_errors = "1.3.6.1.2.1.2.2.1.20.3"`.
    #[serde(default)]
    pub counters: BTreeMap<Metric, Oid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub address: String,
    #[serde(default = "default_snmp_port")]
    pub port: u16,
    pub community: String,
    #[serde(default)]
    pub version: SnmpVersion,
    /// ifIndex used to build the default counter identifiers.
    #[serde(default = "default_interface_index")]
    pub interface_index: u32,
    /// 32 (ifInOctets/ifOutOctets) or 64 (ifHCInOctets/ifHCOutOctets).
    #[serde(default = "default_counter_width")]
    pub counter_width_bits: CounterWidth,
    /// Per-query timeout, independent of the polling interval.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_snmp_port() -> u16 {
    161
}

fn default_interface_index() -> u32 {
    1
}

fn default_counter_width() -> CounterWidth {
    CounterWidth::Bits32
}

fn default_timeout_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Gap between the paired reads of an octet counter.
    pub sample_interval_ms: u64,
    /// How often a polling cycle starts.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// Samples kept per series; 0 keeps the whole history.
    #[serde(default)]
    pub history_window: usize,
    /// How often to log poller stats (cycles, unavailable fields) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_cycle_interval_ms() -> u64 {
    1000
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.device.address.trim().is_empty(),
            "device.address must be non-empty"
        );
        anyhow::ensure!(
            self.device.port > 0,
            "device.port must be between 1 and 65535, got {}",
            self.device.port
        );
        anyhow::ensure!(
            !self.device.community.is_empty(),
            "device.community must be non-empty"
        );
        anyhow::ensure!(
            self.device.timeout_ms > 0,
            "device.timeout_ms must be > 0, got {}",
            self.device.timeout_ms
        );
        anyhow::ensure!(
            self.polling.sample_interval_ms > 0,
            "polling.sample_interval_ms must be > 0, got {}",
            self.polling.sample_interval_ms
        );
        anyhow::ensure!(
            self.polling.cycle_interval_ms > 0,
            "polling.cycle_interval_ms must be > 0, got {}",
            self.polling.cycle_interval_ms
        );
        anyhow::ensure!(
            self.polling.stats_log_interval_secs > 0,
            "polling.stats_log_interval_secs must be > 0, got {}",
            self.polling.stats_log_interval_secs
        );
        Ok(())
    }

    /// Identifier for each metric: `[counters]` overrides first, IF-MIB defaults otherwise.
    pub fn counter_oids(&self) -> BTreeMap<Metric, Oid> {
        Metric::ALL
            .iter()
            .map(|m| {
                let oid = self.counters.get(m).cloned().unwrap_or_else(|| {
                    m.default_oid(self.device.interface_index, self.device.counter_width_bits)
                });
                (*m, oid)
            })
            .collect()
    }

    pub fn device(&self) -> Device {
        Device {
            address: self.device.address.trim().to_string(),
            port: self.device.port,
            community: self.device.community.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.device.timeout_ms)
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            device: self.device(),
            counters: self.counter_oids(),
            counter_width: self.device.counter_width_bits,
            sample_interval: Duration::from_millis(self.polling.sample_interval_ms),
            cycle_interval: Duration::from_millis(self.polling.cycle_interval_ms),
            request_timeout: self.request_timeout(),
            history_window: Some(self.polling.history_window).filter(|w| *w > 0),
            stats_log_interval: Duration::from_secs(self.polling.stats_log_interval_secs),
        }
    }
}
