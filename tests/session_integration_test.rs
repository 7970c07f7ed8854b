//! Integration tests for the live session over real UDP
//!
//! These tests bind an ephemeral loopback port, send datagrams the way the
//! tracking unit does, and observe the buffer and aggregate stream:
//! - End-to-end normalization and buffering
//! - Retransmission suppression
//! - Kind and category gating
//! - Stop/start lifecycle and prompt termination

use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use live_pitch::config::AppConfig;
use live_pitch::error::{ErrorCode, SessionError, SessionErrorCodes};
use live_pitch::{PitchCall, PitchClassifier, PitchOutcome, SessionManager};
use serde_json::json;

fn init_test_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build test runtime")
}

fn loopback_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1".to_string();
    config.listener.port = 0;
    config.listener.read_timeout_ms = 200;
    config.aggregation.refresh_interval_ms = 20;
    config
}

fn send(addr: SocketAddr, message: &serde_json::Value) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind sender");
    socket
        .send_to(&serde_json::to_vec(message).unwrap(), addr)
        .expect("send datagram");
}

/// Poll until the buffer holds `len` pitches or two seconds pass
fn wait_for_buffer(session: &SessionManager, len: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if session.get_buffer().len() == len {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn reference_pitch(play_id: &str) -> serde_json::Value {
    json!({
        "Kind": "Pitch",
        "PlayId": play_id,
        "Time": "2024-05-01T18:03:07.512Z",
        "Pitch": {
            "Speed": 87.15,
            "Tilt": "1:30",
            "Location": {"Side": 0.2, "Height": 2.5}
        }
    })
}

#[test]
fn test_end_to_end_pitch_reaches_buffer() {
    let mut session = SessionManager::new(loopback_config(), PitchClassifier::unknown());
    session.context().set_pitcher("Ace");
    let addr = session.start_live_mode().expect("start live mode");

    send(addr, &reference_pitch("p-1"));
    assert!(wait_for_buffer(&session, 1));

    let buffer = session.get_buffer();
    assert_eq!(buffer[0].tilt_degrees, Some(45.0));
    assert_eq!(buffer[0].pitch_speed, Some(87.15));
    assert_eq!(buffer[0].plate_location(), Some((0.2, 2.5)));
    assert_eq!(buffer[0].pitcher, "Ace");
    assert_eq!(buffer[0].pitch_type, "Unknown");

    session.stop().expect("stop");
}

#[test]
fn test_retransmissions_collapse_to_one_entry() {
    let mut session = SessionManager::new(loopback_config(), PitchClassifier::unknown());
    let addr = session.start_live_mode().unwrap();

    for _ in 0..3 {
        send(addr, &reference_pitch("p-1"));
    }
    send(addr, &json!({"Kind": "Pitch", "Time": "2024-05-01T18:03:30Z", "Pitch": {"Speed": 84.0}}));
    assert!(wait_for_buffer(&session, 2));

    session.stop().unwrap();
    let stats = session.stats();
    assert_eq!(stats.appended, 2);
    assert_eq!(stats.duplicates_suppressed, 2);
}

#[test]
fn test_non_pitch_and_warm_up_never_reach_buffer() {
    let mut session = SessionManager::new(loopback_config(), PitchClassifier::unknown());
    let addr = session.start_live_mode().unwrap();

    send(addr, &json!({"Kind": "Hit", "Pitch": {"Speed": 90.0}}));
    assert!(session.context().set_category("Warm-up"));
    send(addr, &reference_pitch("p-warm"));

    // Both datagrams are accounted for before checking the buffer
    let deadline = Instant::now() + Duration::from_secs(2);
    while session.stats().datagrams_received < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    session.stop().unwrap();

    assert!(session.get_buffer().is_empty());
    let stats = session.stats();
    assert_eq!(stats.ignored_kind, 1);
    assert_eq!(stats.gated_warmup, 1);
}

#[test]
fn test_aggregates_are_broadcast() {
    let runtime = init_test_runtime();
    let mut session = SessionManager::new(loopback_config(), PitchClassifier::unknown())
        .with_runtime(runtime.handle().clone());
    session.context().set_pitcher("Ace");
    session
        .outcomes()
        .record("p-1", PitchOutcome::called(PitchCall::SwingingStrike));
    let mut aggregates = session.subscribe_aggregates();
    let addr = session.start_live_mode().unwrap();

    send(addr, &reference_pitch("p-1"));

    let snapshot = runtime.block_on(async {
        loop {
            let snapshot = tokio::time::timeout(Duration::from_secs(2), aggregates.recv())
                .await
                .expect("aggregate within timeout")
                .expect("channel open");
            if snapshot.total_pitches == 1 {
                break snapshot;
            }
        }
    });

    assert_eq!(snapshot.pitcher, "Ace");
    assert_eq!(snapshot.whiff_rate, 1.0);
    assert_eq!(snapshot.heat_map.len(), 1);
    assert_eq!(snapshot.heat_map[0].success_score, 0.6);

    session.stop().unwrap();
}

#[test]
fn test_stop_terminates_promptly_and_keeps_buffer() {
    let mut config = loopback_config();
    config.listener.read_timeout_ms = 5_000;
    let mut session = SessionManager::new(config, PitchClassifier::unknown());
    let addr = session.start_live_mode().unwrap();
    send(addr, &reference_pitch("p-1"));
    assert!(wait_for_buffer(&session, 1));

    let started = Instant::now();
    session.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!session.is_live());
    assert_eq!(session.get_buffer().len(), 1);

    // Restart keeps the retained pitches
    session.start_live_mode().unwrap();
    assert_eq!(session.get_buffer().len(), 1);
    session.end_session().unwrap();
    assert!(session.get_buffer().is_empty());
}

#[test]
fn test_lifecycle_errors() {
    let mut session = SessionManager::new(loopback_config(), PitchClassifier::unknown());
    let err = session.stop().unwrap_err();
    assert_eq!(err.code(), SessionErrorCodes::NOT_RUNNING);

    session.start_live_mode().unwrap();
    assert!(matches!(
        session.start_live_mode(),
        Err(SessionError::AlreadyRunning)
    ));
    session.stop().unwrap();
}
