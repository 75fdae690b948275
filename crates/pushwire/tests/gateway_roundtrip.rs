// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end delivery against a local TLS gateway.
//!
//! The gateway decodes every frame it receives, so these tests check the
//! full path: descriptor, TLS handshake, framing, worker identifiers.

mod common;

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use common::{descriptor, wait_for, TestGateway, TestProxy};
use pushwire::notification::identifier::worker_of;
use pushwire::{
    ConnectionConfig, ConnectionManager, CredentialFormat, EngineConfig, FileCredentials,
    Payload, PoolConfig, ProxyConfig, PushError, PushMetrics, ServerDescriptor,
    TransmissionEngine, TrustPolicy, WorkerPool,
};

const DEADLINE: Duration = Duration::from_secs(10);

fn manager(trust: TrustPolicy) -> Arc<ConnectionManager> {
    let config = ConnectionConfig::default()
        .with_connect_timeout(Duration::from_secs(5))
        .with_trust(trust);
    Arc::new(ConnectionManager::new(config).unwrap())
}

fn token(n: usize) -> String {
    format!("{:064x}", 0xD00D_0000 + n)
}

#[test]
fn engine_frames_arrive_in_order() {
    let gateway = TestGateway::start();
    let mut engine = TransmissionEngine::new(
        manager(TrustPolicy::AcceptAnyServer),
        EngineConfig::default(),
    );
    engine
        .initialize(descriptor("127.0.0.1", gateway.addr))
        .unwrap();

    let payload = Payload::from(r#"{"aps":{"alert":"hello"}}"#);
    let outcomes = engine.push_all(&payload, (0..3).map(token));
    assert!(outcomes.iter().all(|o| o.is_successful()));

    assert!(wait_for(DEADLINE, || gateway.closed() == 1));
    let frames = gateway.frames();
    assert_eq!(
        frames.iter().map(|f| f.identifier).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(frames[1].token.to_hex(), token(1));
    assert_eq!(frames[0].payload, payload.as_bytes());
    assert!(frames[0].expiry > 0);
}

#[test]
fn pkcs12_file_credentials_reach_gateway() {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["pushwire-client".to_string()]).unwrap();
    let bundle = p12::PFX::new(cert.der(), &key_pair.serialize_der(), None, "s3cret", "push")
        .unwrap()
        .to_der();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bundle).unwrap();

    let gateway = TestGateway::start();
    let credentials = Arc::new(
        FileCredentials::new(file.path(), CredentialFormat::Pkcs12).with_password("s3cret"),
    );
    let mut engine = TransmissionEngine::new(
        manager(TrustPolicy::AcceptAnyServer),
        EngineConfig::default(),
    );
    engine
        .initialize(ServerDescriptor::new(
            "127.0.0.1",
            gateway.addr.port(),
            credentials,
        ))
        .unwrap();
    engine.send(&token(0), &Payload::from("{}"), 7).unwrap();
    engine.stop();

    assert!(wait_for(DEADLINE, || gateway.frame_count() == 1));
    assert_eq!(gateway.frames()[0].identifier, 7);
}

#[test]
fn list_pool_delivers_every_valid_token() {
    let gateway = TestGateway::start();
    let manager = manager(TrustPolicy::AcceptAnyServer);
    let metrics = Arc::new(PushMetrics::new());

    let mut tokens: Vec<String> = (0..9).map(token).collect();
    tokens.insert(4, "not-a-device".to_string());

    let pool = WorkerPool::list_for_payload(
        manager.clone(),
        descriptor("127.0.0.1", gateway.addr),
        Payload::from(r#"{"aps":{"badge":1}}"#),
        tokens,
        PoolConfig::default()
            .with_workers(3)
            .with_max_notifications_per_connection(2),
    )
    .unwrap()
    .with_metrics(metrics.clone());
    pool.start().unwrap();
    pool.wait_for_all(true).unwrap();

    assert_eq!(pool.outcomes().len(), 10);
    assert_eq!(pool.failed().len(), 1);
    assert!(matches!(
        pool.failed()[0].error(),
        Some(PushError::InvalidToken { .. })
    ));

    assert!(wait_for(DEADLINE, || gateway.frame_count() == 9));
    let frames = gateway.frames();
    let ids: HashSet<u32> = frames.iter().map(|f| f.identifier).collect();
    assert_eq!(ids.len(), 9);
    let workers: HashSet<u8> = ids.iter().copied().map(worker_of).collect();
    assert_eq!(workers, HashSet::from([1, 2, 3]));

    let received: HashSet<String> = frames.iter().map(|f| f.token.to_hex()).collect();
    let expected: HashSet<String> = (0..9).map(token).collect();
    assert_eq!(received, expected);

    // One TLS context for the whole pool, several connections per worker
    assert_eq!(manager.cached_contexts(), 1);
    assert!(gateway.connections() > 3);
    assert_eq!(metrics.snapshot().notifications_sent, 9);
    assert!(metrics.snapshot().proactive_restarts > 0);
}

#[test]
fn queue_pool_over_tls() {
    let gateway = TestGateway::start();
    let mut pool = WorkerPool::queue(
        manager(TrustPolicy::AcceptAnyServer),
        descriptor("127.0.0.1", gateway.addr),
        PoolConfig::default()
            .with_workers(2)
            .with_queue_poll_interval(Duration::from_millis(50)),
    )
    .unwrap();

    for n in 0..6 {
        pool.enqueue(Payload::from("{}"), token(n)).unwrap();
    }
    pool.close(true).unwrap();

    assert_eq!(pool.successful().len(), 6);
    assert!(wait_for(DEADLINE, || gateway.frame_count() == 6));
}

#[test]
fn pinned_root_verifies_gateway() {
    let gateway = TestGateway::start();
    let trust = TrustPolicy::PinnedRoots(gateway.ca_pem.clone().into_bytes());
    let mut engine = TransmissionEngine::new(manager(trust), EngineConfig::default());

    engine
        .initialize(descriptor("localhost", gateway.addr))
        .unwrap();
    engine
        .send(&token(0), &Payload::from("{}"), 42)
        .unwrap();
    engine.stop();

    assert!(wait_for(DEADLINE, || gateway.frame_count() == 1));
    assert_eq!(gateway.frames()[0].identifier, 42);
}

#[test]
fn untrusted_gateway_is_rejected() {
    let gateway = TestGateway::start();
    let mut engine = TransmissionEngine::new(
        manager(TrustPolicy::WebPkiRoots),
        EngineConfig::default().with_retry_attempts(1),
    );
    let err = engine
        .initialize(descriptor("localhost", gateway.addr))
        .unwrap_err();
    assert!(matches!(err, PushError::Transport { .. }));
}

#[test]
fn gateway_through_connect_proxy() {
    let gateway = TestGateway::start();
    let proxy = TestProxy::start();
    let server = descriptor("127.0.0.1", gateway.addr)
        .with_proxy(ProxyConfig::new("127.0.0.1", proxy.addr.port()));

    let mut engine = TransmissionEngine::new(
        manager(TrustPolicy::AcceptAnyServer),
        EngineConfig::default(),
    );
    engine.initialize(server).unwrap();
    engine.send(&token(7), &Payload::from("{}"), 7).unwrap();
    engine.stop();

    assert!(wait_for(DEADLINE, || gateway.frame_count() == 1));
    assert_eq!(
        proxy.requests(),
        vec![format!("CONNECT 127.0.0.1:{} HTTP/1.0", gateway.addr.port())]
    );
}

#[test]
fn refused_connection_is_retryable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut engine = TransmissionEngine::new(
        manager(TrustPolicy::AcceptAnyServer),
        EngineConfig::default(),
    );
    let err = engine.initialize(descriptor("127.0.0.1", addr)).unwrap_err();
    assert!(err.is_retryable());
    assert!(err.is_critical());
}
