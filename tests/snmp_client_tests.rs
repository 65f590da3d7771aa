// SnmpClient against a loopback UDP agent

use ifstat::counter_client::{
    CounterClient, CounterError, Device, Message, PduKind, SnmpClient, SnmpVersion, VarBind,
    VarValue,
};
use ifstat::models::Oid;
use tokio::net::UdpSocket;
use tokio::time::Duration;

const IN_OCTETS: &str = "1.3.6.1.2.1.2.2.1.10.1";

/// Binds an agent on an ephemeral port; `reply` turns each request into zero or more responses.
async fn spawn_agent<F>(reply: F) -> u16
where
    F: Fn(Message) -> Vec<Message> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        loop {
            let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let request = Message::decode(&buf[..n]).unwrap();
            for response in reply(request) {
                socket.send_to(&response.encode(), peer).await.unwrap();
            }
        }
    });
    port
}

fn answer(mut request: Message, value: VarValue) -> Message {
    request.pdu.kind = PduKind::Response;
    let oid = request.pdu.varbinds[0].oid.clone();
    request.pdu.varbinds = vec![VarBind { oid, value }];
    request
}

fn device(port: u16, community: &str) -> Device {
    Device {
        address: "127.0.0.1".into(),
        port,
        community: community.into(),
    }
}

fn oid() -> Oid {
    IN_OCTETS.parse().unwrap()
}

#[tokio::test]
async fn fetches_counter32_value() {
    let port = spawn_agent(|req| {
        assert_eq!(req.pdu.kind, PduKind::GetRequest);
        assert_eq!(req.version, 1);
        assert_eq!(req.community, b"public");
        vec![answer(req, VarValue::Counter32(4_000_000_000))]
    })
    .await;

    let client = SnmpClient::new(SnmpVersion::V2c, Duration::from_secs(2));
    let value = client.fetch_counter(&oid(), &device(port, "public")).await;
    assert_eq!(value, Ok(4_000_000_000));
}

#[tokio::test]
async fn v1_requests_use_version_zero() {
    let port = spawn_agent(|req| {
        assert_eq!(req.version, 0);
        vec![answer(req, VarValue::Counter32(17))]
    })
    .await;

    let client = SnmpClient::new(SnmpVersion::V1, Duration::from_secs(2));
    assert_eq!(
        client.fetch_counter(&oid(), &device(port, "public")).await,
        Ok(17)
    );
}

#[tokio::test]
async fn silent_agent_is_unreachable_after_timeout() {
    // Wrong v2c community: the agent drops the request without answering.
    let port = spawn_agent(|req| {
        if req.community == b"public" {
            vec![answer(req, VarValue::Counter32(1))]
        } else {
            vec![]
        }
    })
    .await;

    let client = SnmpClient::new(SnmpVersion::V2c, Duration::from_millis(200));
    let err = client
        .fetch_counter(&oid(), &device(port, "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, CounterError::Unreachable(_)), "{err:?}");
}

#[tokio::test]
async fn ignores_response_with_other_request_id() {
    let port = spawn_agent(|req| {
        let mut stale = answer(req.clone(), VarValue::Counter32(999));
        stale.pdu.request_id = req.pdu.request_id.wrapping_add(1_000);
        vec![stale, answer(req, VarValue::Counter32(42))]
    })
    .await;

    let client = SnmpClient::new(SnmpVersion::V2c, Duration::from_secs(2));
    assert_eq!(
        client.fetch_counter(&oid(), &device(port, "public")).await,
        Ok(42)
    );
}

#[tokio::test]
async fn keeps_waiting_after_undecodable_datagram() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        let (n, peer) = socket.recv_from(&mut buf).await.unwrap();
        let request = Message::decode(&buf[..n]).unwrap();
        socket.send_to(b"\x30\x05junk", peer).await.unwrap();
        let response = answer(request, VarValue::Counter32(5));
        socket.send_to(&response.encode(), peer).await.unwrap();
    });

    let client = SnmpClient::new(SnmpVersion::V2c, Duration::from_secs(2));
    assert_eq!(
        client.fetch_counter(&oid(), &device(port, "public")).await,
        Ok(5)
    );
}

#[tokio::test]
async fn authorization_error_is_auth_rejected() {
    let port = spawn_agent(|mut req| {
        req.pdu.kind = PduKind::Response;
        req.pdu.error_status = 16;
        vec![req]
    })
    .await;

    let client = SnmpClient::new(SnmpVersion::V2c, Duration::from_secs(2));
    assert_eq!(
        client.fetch_counter(&oid(), &device(port, "public")).await,
        Err(CounterError::AuthRejected)
    );
}

#[tokio::test]
async fn missing_instance_is_not_found() {
    let port = spawn_agent(|req| vec![answer(req, VarValue::NoSuchInstance)]).await;

    let client = SnmpClient::new(SnmpVersion::V2c, Duration::from_secs(2));
    let err = client
        .fetch_counter(&oid(), &device(port, "public"))
        .await
        .unwrap_err();
    assert_eq!(err, CounterError::NotFound(IN_OCTETS.into()));
}

#[tokio::test]
async fn unresolvable_host_is_unreachable() {
    let client = SnmpClient::new(SnmpVersion::V2c, Duration::from_millis(200));
    let bad = Device {
        address: "host.invalid".into(),
        port: 161,
        community: "public".into(),
    };
    let err = client.fetch_counter(&oid(), &bad).await.unwrap_err();
    assert!(matches!(err, CounterError::Unreachable(_)), "{err:?}");
}
