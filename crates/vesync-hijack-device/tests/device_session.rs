use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::FramedRead;
use vesync_hijack_device::{
    configure_device, DeviceError, DeviceSession, SessionState, BEGIN_CONFIG_URI,
};
use vesync_hijack_frame::{encode_frame, DeviceCodec};
use vesync_hijack_smartconfig::{NetworkCredentials, ZERO_BSSID};

fn credentials() -> NetworkCredentials {
    NetworkCredentials::new("home-net", ZERO_BSSID, "s3cret", Ipv4Addr::new(192, 168, 1, 2))
}

async fn fake_device() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("fake device should bind");
    let addr = listener.local_addr().expect("fake device addr");
    (listener, addr)
}

async fn read_request(stream: &mut TcpStream) -> Value {
    let mut frames = FramedRead::new(stream, DeviceCodec::new());
    let frame = tokio::time::timeout(Duration::from_secs(2), frames.next())
        .await
        .expect("request should arrive")
        .expect("stream open")
        .expect("request frame decodes");
    serde_json::from_slice(&frame.body).expect("request is JSON")
}

fn reply_wire(reply: &Value) -> BytesMut {
    let mut wire = BytesMut::new();
    encode_frame(reply.to_string().as_bytes(), &mut wire).expect("reply encodes");
    wire.put_u8(0);
    wire
}

#[tokio::test]
async fn configure_device_sends_request_and_returns_split_reply() {
    let (listener, addr) = fake_device().await;

    let device = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("device should accept");
        let request = read_request(&mut stream).await;

        let wire = reply_wire(&json!({ "uri": "/beginConfigReply", "err": 0 }));
        let (head, tail) = wire.split_at(7);
        stream.write_all(head).await.expect("write head");
        stream.flush().await.expect("flush head");
        tokio::time::sleep(Duration::from_millis(20)).await;
        stream.write_all(tail).await.expect("write tail");

        // Client closes after the reply.
        let mut rest = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut rest)
            .await
            .expect("read to eof");
        request
    });

    let reply = configure_device(addr.ip(), addr.port(), &credentials())
        .await
        .expect("configuration should succeed");
    assert_eq!(reply, json!({ "uri": "/beginConfigReply", "err": 0 }));

    let request = device.await.expect("device task");
    assert_eq!(request["uri"], BEGIN_CONFIG_URI);
    assert_eq!(request["wifiID"], "home-net");
    assert_eq!(request["wifiBssid"], "");
    assert_eq!(request["wifiPassword"], "s3cret");
    assert_eq!(request["account"], "0");
    assert_eq!(request["serverIP"], "192.168.1.2");
    assert!(request["key"].is_u64());
}

#[tokio::test]
async fn device_close_fails_outstanding_request() {
    let (listener, addr) = fake_device().await;

    let device = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("device should accept");
        let _ = read_request(&mut stream).await;
        stream.shutdown().await.expect("device shutdown");
    });

    let err = configure_device(addr.ip(), addr.port(), &credentials())
        .await
        .expect_err("configuration should fail");
    assert!(matches!(err, DeviceError::Disconnected(_)), "got {err:?}");
    device.await.expect("device task");
}

#[tokio::test]
async fn connect_refused_is_reported() {
    let (listener, addr) = fake_device().await;
    drop(listener);

    let err = configure_device(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port(), &credentials())
        .await
        .expect_err("nothing is listening");
    assert!(matches!(err, DeviceError::Connect { .. }), "got {err:?}");
}

#[tokio::test]
async fn abandoned_request_frees_the_slot() {
    let (listener, addr) = fake_device().await;

    let device = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("device should accept");
        let mut frames = FramedRead::new(&mut stream, DeviceCodec::new());
        // Ignore the first request, answer the second.
        for _ in 0..2 {
            frames
                .next()
                .await
                .expect("stream open")
                .expect("frame decodes");
        }
        drop(frames);
        stream
            .write_all(&reply_wire(&json!({ "ok": true })))
            .await
            .expect("write reply");
        stream
    });

    let mut session = DeviceSession::connect(addr).await.expect("session connects");
    assert_eq!(session.state(), SessionState::Connected);

    let first = tokio::time::timeout(
        Duration::from_millis(100),
        session.request(&json!({ "uri": "/first" })),
    )
    .await;
    assert!(first.is_err(), "first request should time out");

    let reply = tokio::time::timeout(
        Duration::from_secs(2),
        session.request(&json!({ "uri": "/second" })),
    )
    .await
    .expect("second request in time")
    .expect("second request succeeds");
    assert_eq!(reply, json!({ "ok": true }));
    assert_eq!(session.state(), SessionState::Connected);

    let stream = device.await.expect("device task");
    drop(stream);

    tokio::time::timeout(Duration::from_secs(2), async {
        while session.state() != SessionState::Closed {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session observes device close");

    let err = session
        .request(&json!({ "uri": "/late" }))
        .await
        .expect_err("closed session rejects requests");
    assert!(matches!(err, DeviceError::Disconnected(_)));
}
