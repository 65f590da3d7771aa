// SNMP v1/v2c GET over UDP

use serde::Deserialize;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicI32, Ordering};
use tokio::net::UdpSocket;
use tokio::time::{Duration, Instant, timeout_at};
use tracing::{debug, instrument};

use super::ber::{Message, PduKind};
use super::{CounterClient, CounterError, Device};
use crate::models::Oid;

/// Largest datagram we accept; SNMP over UDP is bounded by the IP payload size.
const MAX_DATAGRAM: usize = 65_507;

const ERROR_STATUS_NO_SUCH_NAME: i64 = 2;
const ERROR_STATUS_AUTHORIZATION: i64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SnmpVersion {
    #[serde(rename = "1")]
    V1,
    #[default]
    #[serde(rename = "2c")]
    V2c,
}

impl SnmpVersion {
    fn wire(self) -> i64 {
        match self {
            SnmpVersion::V1 => 0,
            SnmpVersion::V2c => 1,
        }
    }
}

fn error_status_name(status: i64) -> &'static str {
    match status {
        1 => "tooBig",
        2 => "noSuchName",
        3 => "badValue",
        4 => "readOnly",
        5 => "genErr",
        6 => "noAccess",
        7 => "wrongType",
        8 => "wrongLength",
        9 => "wrongEncoding",
        10 => "wrongValue",
        11 => "noCreation",
        12 => "inconsistentValue",
        13 => "resourceUnavailable",
        14 => "commitFailed",
        15 => "undoFailed",
        16 => "authorizationError",
        17 => "notWritable",
        18 => "inconsistentName",
        _ => "unknown",
    }
}

/// Community-based SNMP client. One UDP socket per query; no retries.
pub struct SnmpClient {
    version: SnmpVersion,
    timeout: Duration,
    next_request_id: AtomicI32,
}

impl SnmpClient {
    pub fn new(version: SnmpVersion, timeout: Duration) -> Self {
        Self {
            version,
            timeout,
            next_request_id: AtomicI32::new(1),
        }
    }

    fn request_id(&self) -> i32 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed) & i32::MAX
    }

    async fn resolve(device: &Device) -> Result<SocketAddr, CounterError> {
        tokio::net::lookup_host((device.address.as_str(), device.port))
            .await
            .map_err(|e| CounterError::Unreachable(format!("resolve {}: {}", device.address, e)))?
            .next()
            .ok_or_else(|| {
                CounterError::Unreachable(format!("{} resolved to no addresses", device.address))
            })
    }

    async fn exchange(&self, oid: &Oid, device: &Device) -> Result<u64, CounterError> {
        let target = Self::resolve(device).await?;
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| CounterError::Unreachable(format!("bind: {e}")))?;
        socket
            .connect(target)
            .await
            .map_err(|e| CounterError::Unreachable(format!("connect {target}: {e}")))?;

        let request_id = self.request_id();
        let request =
            Message::get_request(self.version.wire(), &device.community, request_id, oid.clone())
                .encode();
        socket
            .send(&request)
            .await
            .map_err(|e| CounterError::Unreachable(format!("send to {target}: {e}")))?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let n = match timeout_at(deadline, socket.recv(&mut buf)).await {
                Err(_) => {
                    return Err(CounterError::Unreachable(format!(
                        "no response from {} within {:?}",
                        target, self.timeout
                    )));
                }
                Ok(Err(e)) => {
                    return Err(CounterError::Unreachable(format!("recv from {target}: {e}")));
                }
                Ok(Ok(n)) => n,
            };
            let response = match Message::decode(&buf[..n]) {
                Ok(m) => m,
                Err(e) => {
                    debug!(request_id, error = %e, len = n, "discarding undecodable datagram");
                    continue;
                }
            };
            if response.pdu.kind != PduKind::Response || response.pdu.request_id != request_id {
                debug!(
                    request_id,
                    received_request_id = response.pdu.request_id,
                    "discarding unmatched SNMP response"
                );
                continue;
            }
            return counter_from_response(response, oid);
        }
    }
}

/// Pulls the counter for `oid` out of a matched GET response.
pub(crate) fn counter_from_response(response: Message, oid: &Oid) -> Result<u64, CounterError> {
    match response.pdu.error_status {
        0 => {}
        ERROR_STATUS_NO_SUCH_NAME => return Err(CounterError::NotFound(oid.to_string())),
        ERROR_STATUS_AUTHORIZATION => return Err(CounterError::AuthRejected),
        status => {
            return Err(CounterError::ProtocolError(format!(
                "error-status {} ({}) at index {}",
                status,
                error_status_name(status),
                response.pdu.error_index
            )));
        }
    }

    let vb = response.pdu.varbinds.into_iter().next().ok_or_else(|| {
        CounterError::ProtocolError("response carried no variable bindings".into())
    })?;
    if vb.oid != *oid {
        return Err(CounterError::ProtocolError(format!(
            "response for {}, requested {}",
            vb.oid, oid
        )));
    }
    if vb.value.is_exception() {
        return Err(CounterError::NotFound(oid.to_string()));
    }
    vb.value.as_counter().ok_or_else(|| {
        CounterError::ProtocolError(format!("value {:?} is not a counter", vb.value))
    })
}

impl CounterClient for SnmpClient {
    #[instrument(skip(self, oid, device), fields(client = "snmp", operation = "fetch_counter", oid = %oid, address = %device.address))]
    async fn fetch_counter(&self, oid: &Oid, device: &Device) -> Result<u64, CounterError> {
        self.exchange(oid, device).await
    }
}
