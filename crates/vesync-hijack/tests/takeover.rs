use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use vesync_hijack::smartconfig::{BroadcastTiming, NetworkCredentials, GUIDE_CODE, ZERO_BSSID};
use vesync_hijack::{HijackConfig, Orchestrator};
use vesync_hijack_frame::{encode_frame, DeviceCodec};

fn credentials() -> NetworkCredentials {
    NetworkCredentials::new("HomeNet", ZERO_BSSID, "secret123", Ipv4Addr::LOCALHOST)
}

fn fast_timing() -> BroadcastTiming {
    BroadcastTiming {
        guide_duration: Duration::from_millis(20),
        guide_interval: Duration::from_millis(1),
        payload_interval: Duration::from_millis(1),
        payload_repeats: 1,
        repeat_pause: Duration::from_millis(5),
        cycle_pause: Duration::from_millis(5),
    }
}

/// Accepts one configuration session and returns the request it received.
async fn fake_device() -> (u16, tokio::task::JoinHandle<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("fake device should bind");
    let port = listener.local_addr().expect("fake device addr").port();

    let device = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("device should accept");
        let request = {
            let mut frames = FramedRead::new(&mut stream, DeviceCodec::new());
            let frame = frames
                .next()
                .await
                .expect("stream open")
                .expect("request frame decodes");
            serde_json::from_slice::<Value>(&frame.body).expect("request is JSON")
        };

        let mut wire = BytesMut::new();
        encode_frame(json!({ "err": 0 }).to_string().as_bytes(), &mut wire)
            .expect("reply encodes");
        stream.write_all(&wire).await.expect("reply written");
        request
    });
    (port, device)
}

async fn free_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("probe bind");
    socket.local_addr().expect("probe addr").port()
}

#[tokio::test]
async fn direct_device_mode_configures_device() {
    let (device_port, device) = fake_device().await;
    let config = HijackConfig {
        device_port,
        http_port: 0,
        ..HijackConfig::default()
    };

    let orchestrator = Orchestrator::new(config, credentials()).with_device(Ipv4Addr::LOCALHOST.into());
    let cancel = CancellationToken::new();
    let run = tokio::spawn(orchestrator.run(cancel.clone()));

    let request = tokio::time::timeout(Duration::from_secs(5), device)
        .await
        .expect("device should be configured")
        .expect("fake device task");
    assert_eq!(request["uri"], "/beginConfigRequest");
    assert_eq!(request["wifiID"], "HomeNet");
    assert_eq!(request["wifiPassword"], "secret123");
    assert_eq!(request["serverIP"], "127.0.0.1");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("orchestrator should stop")
        .expect("orchestrator task")
        .expect("orchestrator should exit cleanly");
}

#[tokio::test]
async fn direct_device_mode_stops_while_device_is_silent() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("fake device should bind");
    let device_port = listener.local_addr().expect("fake device addr").port();
    let (accepted_tx, accepted_rx) = tokio::sync::oneshot::channel();
    let device = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("device should accept");
        let _ = accepted_tx.send(());
        // Hold the connection open without ever replying.
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(stream);
    });

    let config = HijackConfig {
        device_port,
        http_port: 0,
        ..HijackConfig::default()
    };
    let orchestrator = Orchestrator::new(config, credentials()).with_device(Ipv4Addr::LOCALHOST.into());
    let cancel = CancellationToken::new();
    let run = tokio::spawn(orchestrator.run(cancel.clone()));

    tokio::time::timeout(Duration::from_secs(5), accepted_rx)
        .await
        .expect("orchestrator should connect")
        .expect("fake device task");
    tokio::time::sleep(Duration::from_millis(100)).await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(3), run)
        .await
        .expect("orchestrator should stop while the session hangs")
        .expect("orchestrator task")
        .expect("orchestrator should exit cleanly");
    device.abort();
}

#[tokio::test]
async fn broadcast_mode_sends_guide_and_configures_announcer() {
    let (device_port, device) = fake_device().await;

    let sniffer = UdpSocket::bind("127.0.0.1:0").await.expect("sniffer bind");
    let sniffer_port = sniffer.local_addr().expect("sniffer addr").port();
    let rendezvous_port = free_udp_port().await;

    // Point the "multicast" target at a loopback sniffer.
    let config = HijackConfig {
        device_port,
        http_port: 0,
        rendezvous_port,
        multicast_group: Ipv4Addr::LOCALHOST,
        multicast_port: sniffer_port,
        broadcast: fast_timing(),
        ..HijackConfig::default()
    };

    let cancel = CancellationToken::new();
    let run = tokio::spawn(Orchestrator::new(config, credentials()).run(cancel.clone()));

    let mut buf = vec![0u8; 1024];
    let len = tokio::time::timeout(Duration::from_secs(5), sniffer.recv(&mut buf))
        .await
        .expect("broadcast should start")
        .expect("sniffer recv");
    assert!(GUIDE_CODE.contains(&(len as u16)), "unexpected first length {len}");

    let announcer = UdpSocket::bind("127.0.0.1:0").await.expect("announcer bind");
    let rendezvous = SocketAddr::from((Ipv4Addr::LOCALHOST, rendezvous_port));
    announcer
        .send_to(b"\x1b", rendezvous)
        .await
        .expect("announcement sent");

    let request = tokio::time::timeout(Duration::from_secs(5), device)
        .await
        .expect("announcer should be configured")
        .expect("fake device task");
    assert_eq!(request["uri"], "/beginConfigRequest");
    assert_eq!(request["serverIP"], "127.0.0.1");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("orchestrator should stop")
        .expect("orchestrator task")
        .expect("orchestrator should exit cleanly");
}
