// Tracked interface counters, counter identifiers and raw readings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::time::Instant;

/// IF-MIB ifTable entry prefix (1.3.6.1.2.1.2.2.1.<column>.<ifIndex>).
const IF_TABLE_ENTRY: [u32; 9] = [1, 3, 6, 1, 2, 1, 2, 2, 1];
/// IF-MIB ifXTable entry prefix (1.3.6.1.2.1.31.1.1.1.<column>.<ifIndex>).
const IF_X_TABLE_ENTRY: [u32; 10] = [1, 3, 6, 1, 2, 1, 31, 1, 1, 1];

/// One interface counter the poller tracks.
///
/// Octet counters are converted to a rate; every other counter is reported as the latest raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    InOctets,
    OutOctets,
    InErrors,
    OutErrors,
    InDiscards,
    OutDiscards,
    InUcastPkts,
    OutUcastPkts,
    InNUcastPkts,
    OutNUcastPkts,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::InOctets,
        Metric::OutOctets,
        Metric::InErrors,
        Metric::OutErrors,
        Metric::InDiscards,
        Metric::OutDiscards,
        Metric::InUcastPkts,
        Metric::OutUcastPkts,
        Metric::InNUcastPkts,
        Metric::OutNUcastPkts,
    ];

    pub const RATE: [Metric; 2] = [Metric::InOctets, Metric::OutOctets];

    pub const COUNT: [Metric; 8] = [
        Metric::InErrors,
        Metric::OutErrors,
        Metric::InDiscards,
        Metric::OutDiscards,
        Metric::InUcastPkts,
        Metric::OutUcastPkts,
        Metric::InNUcastPkts,
        Metric::OutNUcastPkts,
    ];

    pub fn is_rate(self) -> bool {
        matches!(self, Metric::InOctets | Metric::OutOctets)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::InOctets => "in_octets",
            Metric::OutOctets => "out_octets",
            Metric::InErrors => "in_errors",
            Metric::OutErrors => "out_errors",
            Metric::InDiscards => "in_discards",
            Metric::OutDiscards => "out_discards",
            Metric::InUcastPkts => "in_ucast_pkts",
            Metric::OutUcastPkts => "out_ucast_pkts",
            Metric::InNUcastPkts => "in_n_ucast_pkts",
            Metric::OutNUcastPkts => "out_n_ucast_pkts",
        }
    }

    /// Standard IF-MIB identifier for this counter on `if_index`.
    /// 64-bit octet counters live in ifXTable (ifHCInOctets / ifHCOutOctets).
    pub fn default_oid(self, if_index: u32, width: CounterWidth) -> Oid {
        let (prefix, column): (&[u32], u32) = match (self, width) {
            (Metric::InOctets, CounterWidth::Bits64) => (&IF_X_TABLE_ENTRY, 6),
            (Metric::OutOctets, CounterWidth::Bits64) => (&IF_X_TABLE_ENTRY, 10),
            (Metric::InOctets, _) => (&IF_TABLE_ENTRY, 10),
            (Metric::InUcastPkts, _) => (&IF_TABLE_ENTRY, 11),
            (Metric::InNUcastPkts, _) => (&IF_TABLE_ENTRY, 12),
            (Metric::InDiscards, _) => (&IF_TABLE_ENTRY, 13),
            (Metric::InErrors, _) => (&IF_TABLE_ENTRY, 14),
            (Metric::OutOctets, _) => (&IF_TABLE_ENTRY, 16),
            (Metric::OutUcastPkts, _) => (&IF_TABLE_ENTRY, 17),
            (Metric::OutNUcastPkts, _) => (&IF_TABLE_ENTRY, 18),
            (Metric::OutDiscards, _) => (&IF_TABLE_ENTRY, 19),
            (Metric::OutErrors, _) => (&IF_TABLE_ENTRY, 20),
        };
        let mut arcs = prefix.to_vec();
        arcs.push(column);
        arcs.push(if_index);
        Oid(arcs)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter capacity in bits; decides where a counter wraps back to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CounterWidth {
    Bits32,
    Bits64,
}

impl CounterWidth {
    pub fn bits(self) -> u32 {
        match self {
            CounterWidth::Bits32 => 32,
            CounterWidth::Bits64 => 64,
        }
    }

    /// 2^bits, the value at which the counter wraps.
    pub fn modulus(self) -> u128 {
        1u128 << self.bits()
    }
}

impl TryFrom<u8> for CounterWidth {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(CounterWidth::Bits32),
            64 => Ok(CounterWidth::Bits64),
            other => Err(format!("counter width must be 32 or 64, got {other}")),
        }
    }
}

impl From<CounterWidth> for u8 {
    fn from(width: CounterWidth) -> u8 {
        width.bits() as u8
    }
}

/// Dotted object identifier, e.g. `1.3.6.1.2.1.2.2.1.10.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn new(arcs: Vec<u32>) -> Result<Self, String> {
        if arcs.len() < 2 {
            return Err("object identifier needs at least two arcs".into());
        }
        if arcs[0] > 2 || (arcs[0] < 2 && arcs[1] >= 40) {
            return Err(format!(
                "invalid leading arcs {}.{} in object identifier",
                arcs[0], arcs[1]
            ));
        }
        Ok(Oid(arcs))
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for Oid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err("object identifier must be non-empty".into());
        }
        let arcs = trimmed
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| format!("invalid arc {part:?} in object identifier {s:?}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Oid::new(arcs)
    }
}

impl TryFrom<String> for Oid {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> String {
        oid.to_string()
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
        }
        Ok(())
    }
}

/// One raw counter value as returned by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterReading {
    pub metric: Metric,
    pub raw_value: u64,
    pub observed_at: Instant,
}

impl CounterReading {
    pub fn new(metric: Metric, raw_value: u64) -> Self {
        Self {
            metric,
            raw_value,
            observed_at: Instant::now(),
        }
    }
}

/// Throughput derived from two readings of an octet counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    pub metric: Metric,
    pub megabits_per_second: f64,
    pub computed_at: Instant,
}
