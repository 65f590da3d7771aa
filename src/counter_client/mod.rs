// Counter query seam: one GET for one counter on one device

mod ber;
mod snmp;

pub use ber::{BerError, Message, Pdu, PduKind, VarBind, VarValue};
pub use snmp::{SnmpClient, SnmpVersion};

use std::future::Future;

use crate::models::Oid;

/// Where and how to reach the device. Not validated here beyond what the transport needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub address: String,
    pub port: u16,
    pub community: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounterError {
    #[error("device unreachable: {0}")]
    Unreachable(String),
    #[error("credential rejected by device")]
    AuthRejected,
    #[error("protocol error: {0}")]
    ProtocolError(String),
    #[error("counter {0} not found on device")]
    NotFound(String),
}

/// Issues a single counter query. Implementations do not retry; the poller decides what happens next cycle.
pub trait CounterClient: Send + Sync + 'static {
    fn fetch_counter(
        &self,
        oid: &Oid,
        device: &Device,
    ) -> impl Future<Output = Result<u64, CounterError>> + Send;
}

impl<C: CounterClient> CounterClient for std::sync::Arc<C> {
    fn fetch_counter(
        &self,
        oid: &Oid,
        device: &Device,
    ) -> impl Future<Output = Result<u64, CounterError>> + Send {
        (**self).fetch_counter(oid, device)
    }
}
