// Domain models

mod metric;
mod snapshot;

pub use metric::{CounterReading, CounterWidth, Metric, Oid, RateSample};
pub use snapshot::{FacilityStats, MetricValue, NetworkSnapshot};
