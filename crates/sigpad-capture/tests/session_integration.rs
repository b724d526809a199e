//! Integration tests for the session manager connection state machine.
//!
//! These tests drive `SessionManager` through its public API against the
//! scriptable mock bridge.  Timer-dependent cases (readiness polling, the
//! post-reinitialize reschedule) run under Tokio's paused clock, so the
//! retry budget is verified without real wall-clock waits:
//!
//! - Happy path: service ready, component ready, one supported device,
//!   exclusive lock granted, snapshots fetched, pad display cleared.
//! - Retry budget: with `max_retries = 20`, exactly 20 failed polls followed
//!   by a 21st failed check yields `ServiceUnavailable` — never a 21st retry.
//! - Recovery: a `ComponentNotReady` fault triggers exactly one bridge
//!   reinitialize and exactly one rescheduled attempt, not a busy loop.
//! - Terminal faults: empty discovery, unsupported device, and lock denial
//!   return the machine to `Idle` for caller-initiated retry.

use std::sync::Arc;
use std::time::Duration;

use sigpad_capture::application::{
    ConnectionState, RetryPolicy, SessionError, SessionManager,
};
use sigpad_capture::infrastructure::bridge::mock::{MockBridge, MockBridgeScript, PadCommand};
use sigpad_capture::infrastructure::bridge::EncryptionHandler;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 20,
        short_delay: Duration::from_millis(500),
        long_delay: Duration::from_millis(1000),
    }
}

// ── Happy path ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_connect_happy_path_yields_connected_session() {
    let bridge = MockBridge::new(MockBridgeScript::default());
    let mut manager = SessionManager::new(bridge.clone(), fast_retry());

    let session = manager.connect().await.expect("connect");

    assert_eq!(*manager.state(), ConnectionState::Connected);
    assert_eq!(session.device().name, "Mock STU-540");
    assert_eq!(session.capability().max_x, 10000);
    assert_eq!(session.ink_threshold().on_pressure_mark, 50);
    assert_eq!(session.ink_threshold().off_pressure_mark, 30);

    // The capability fetch is the smoke test; the pad display is cleared
    // exactly once during connection setup.
    let commands = bridge.last_session().expect("session created").commands();
    assert_eq!(commands, vec![PadCommand::ClearScreen]);
}

#[tokio::test(start_paused = true)]
async fn test_connect_succeeds_after_delayed_service_readiness() {
    let script = MockBridgeScript {
        service_ready_after_polls: Some(3),
        ..Default::default()
    };
    let bridge = MockBridge::new(script);
    let mut manager = SessionManager::new(bridge.clone(), fast_retry());

    manager.connect().await.expect("connect");

    // Three failed polls, then the fourth answers ready.
    assert_eq!(bridge.service_polls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_encryption_handlers_are_forwarded_to_session_construction() {
    struct Named(&'static str);
    impl EncryptionHandler for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    let bridge = MockBridge::new(MockBridgeScript::default());
    let mut manager = SessionManager::new(bridge.clone(), fast_retry())
        .with_encryption(Some(Arc::new(Named("aes-primary"))), Some(Arc::new(Named("aes-secondary"))));

    manager.connect().await.expect("connect");

    assert_eq!(
        bridge.encryption_names(),
        vec!["aes-primary".to_string(), "aes-secondary".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_omitted_encryption_handlers_build_plain_session() {
    let bridge = MockBridge::new(MockBridgeScript::default());
    let mut manager = SessionManager::new(bridge.clone(), fast_retry());

    manager.connect().await.expect("connect");

    assert!(bridge.encryption_names().is_empty());
}

// ── Retry budget ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_retry_budget_exhaustion_yields_service_unavailable() {
    let script = MockBridgeScript {
        service_ready_after_polls: None,
        ..Default::default()
    };
    let bridge = MockBridge::new(script);
    let mut manager = SessionManager::new(bridge.clone(), fast_retry());

    let started = tokio::time::Instant::now();
    let err = manager.connect().await.expect_err("must exhaust budget");

    assert_eq!(err, SessionError::ServiceUnavailable { attempts: 21 });
    // 20 failed polls, then the 21st failed check gives up without
    // scheduling another timer.
    assert_eq!(bridge.service_polls(), 21);
    assert_eq!(*manager.state(), ConnectionState::Idle);

    // Under the paused clock the total wait is exact: one short delay plus
    // twenty long delays, and nothing after the final failed check.
    let expected = Duration::from_millis(500) + 20 * Duration::from_millis(1000);
    let elapsed = started.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(100),
        "unexpected total polling time: {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_service_ready_on_final_check_still_connects() {
    // Ready exactly on the 21st check: the budget allows it.
    let script = MockBridgeScript {
        service_ready_after_polls: Some(20),
        ..Default::default()
    };
    let bridge = MockBridge::new(script);
    let mut manager = SessionManager::new(bridge.clone(), fast_retry());

    manager.connect().await.expect("connect");
    assert_eq!(bridge.service_polls(), 21);
}

// ── Component recovery ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_component_not_ready_recovers_with_single_reinitialize() {
    let script = MockBridgeScript {
        component_ready: false,
        component_ready_after_reinit: true,
        ..Default::default()
    };
    let bridge = MockBridge::new(script);
    let mut manager = SessionManager::new(bridge.clone(), fast_retry());

    manager.connect().await.expect("recovered connect");

    assert_eq!(bridge.reinitialize_calls(), 1);
    assert_eq!(*manager.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_component_fault_stops_after_one_reattempt() {
    let script = MockBridgeScript {
        component_ready: false,
        component_ready_after_reinit: false,
        ..Default::default()
    };
    let bridge = MockBridge::new(script);
    let mut manager = SessionManager::new(bridge.clone(), fast_retry());

    let err = manager.connect().await.expect_err("must stay faulted");

    assert_eq!(err, SessionError::ComponentNotReady);
    // Exactly one reinitialize and one rescheduled attempt — no busy loop.
    assert_eq!(bridge.reinitialize_calls(), 1);
    assert_eq!(
        *manager.state(),
        ConnectionState::Faulted(SessionError::ComponentNotReady)
    );
}

// ── Terminal faults ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_empty_discovery_yields_no_device_found() {
    let script = MockBridgeScript {
        devices: Vec::new(),
        ..Default::default()
    };
    let bridge = MockBridge::new(script);
    let mut manager = SessionManager::new(bridge.clone(), fast_retry());

    let err = manager.connect().await.expect_err("no devices");

    assert_eq!(err, SessionError::NoDeviceFound);
    assert_eq!(*manager.state(), ConnectionState::Idle);
    // No recovery machinery fires for this fault kind.
    assert_eq!(bridge.reinitialize_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_device_is_reported_with_its_ids() {
    let script = MockBridgeScript {
        supported: Vec::new(),
        ..Default::default()
    };
    let bridge = MockBridge::new(script);
    let mut manager = SessionManager::new(bridge, fast_retry());

    let err = manager.connect().await.expect_err("unsupported");

    assert_eq!(
        err,
        SessionError::UnsupportedDevice {
            vendor_id: 0x056a,
            product_id: 0x00a8,
        }
    );
    assert_eq!(*manager.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_lock_denial_yields_exclusive_lock_failed() {
    let script = MockBridgeScript {
        deny_lock: true,
        ..Default::default()
    };
    let bridge = MockBridge::new(script);
    let mut manager = SessionManager::new(bridge, fast_retry());

    let err = manager.connect().await.expect_err("lock denied");

    assert!(matches!(err, SessionError::ExclusiveLockFailed(_)));
    assert_eq!(*manager.state(), ConnectionState::Idle);
}

// ── Teardown ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_bridge_and_returns_to_idle() {
    let bridge = MockBridge::new(MockBridgeScript::default());
    let mut manager = SessionManager::new(bridge.clone(), fast_retry());
    manager.connect().await.expect("connect");

    manager.shutdown().await;

    assert_eq!(bridge.close_calls(), 1);
    assert_eq!(*manager.state(), ConnectionState::Idle);
}
