use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use gatt_bridge::ConnectionState;
use gatt_bridge::ErrorKind;
use gatt_bridge::GattClient;
use gatt_bridge::SecurityLevel;
use gatt_bridge::WriteType;

use crate::common::enable_logger;
use crate::common::heart_rate_database;
use crate::common::test_config;
use crate::common::wait_until;
use crate::common::Shared;
use crate::common::SimulatedPeripheral;
use crate::common::PEER;

fn client_for(
    peripheral: &Arc<SimulatedPeripheral>,
    callback_timeout_in_ms: u64,
) -> GattClient<Shared> {
    enable_logger();
    GattClient::builder(Shared(peripheral.clone()))
        .set_config(test_config(callback_timeout_in_ms))
        .build()
        .expect("valid config")
}

#[test]
fn test_connect_to_unknown_peer() {
    let peripheral = Arc::new(SimulatedPeripheral::new(heart_rate_database()));
    let client = client_for(&peripheral, 5_000);

    let err = client.connect("00:00:00:00:00:01", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Disconnected);
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // The same client can try again
    client.connect(PEER, None).unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
}

/// # Case 1: peer drops the link
///
/// ## Validation Criterias:
/// 1. the hang-up reported on the event loop marks the link Disconnected
/// 2. later calls fail fast instead of waiting for the timeout
/// 3. a fresh connect brings everything back
#[test]
fn test_hangup_then_reconnect() {
    let peripheral = Arc::new(SimulatedPeripheral::new(heart_rate_database()));
    let client = client_for(&peripheral, 5_000);
    client.connect(PEER, None).unwrap();
    assert_eq!(client.change_mtu(100).unwrap(), 100);

    peripheral.hang_up();
    assert!(wait_until(Duration::from_secs(5), || client.state()
        == ConnectionState::Disconnected));
    assert!(wait_until(Duration::from_secs(5), || !client
        .link()
        .dispatcher()
        .is_running()));
    assert_eq!(client.mtu(), None);

    let now = Instant::now();
    let err = client.read_by_handle(0x0003).unwrap_err();
    assert!(err.is_disconnected());
    assert!(now.elapsed() < Duration::from_secs(1));

    client.connect(PEER, None).unwrap();
    assert_eq!(client.read_by_handle(0x000b).unwrap().data, vec![87]);
    // The exchange is allowed again on the new connection
    assert_eq!(client.change_mtu(50).unwrap(), 50);
}

#[test]
fn test_unanswered_request_drops_link() {
    enable_logger();
    let peripheral = Arc::new(SimulatedPeripheral::new(heart_rate_database()).silent());
    let mut config = test_config(200);
    config.connection.security_level = SecurityLevel::Medium;
    let client = GattClient::builder(Shared(peripheral.clone()))
        .set_config(config)
        .build()
        .expect("valid config");
    // The connect callback is not a request, it still arrives
    client.connect(PEER, None).unwrap();
    assert_eq!(peripheral.security(), SecurityLevel::Medium);

    let now = Instant::now();
    let err = client
        .write_by_handle(0x0004, &[0x01, 0x00], WriteType::Request)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoCallback);
    assert!(now.elapsed() >= Duration::from_millis(200));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(!client.link().dispatcher().is_running());
}

#[test]
fn test_mtu_and_security() {
    let peripheral = Arc::new(SimulatedPeripheral::new(heart_rate_database()).with_server_mtu(185));
    let client = client_for(&peripheral, 5_000);
    client.connect(PEER, None).unwrap();

    assert_eq!(client.change_mtu(247).unwrap(), 185);
    assert_eq!(peripheral.channel_mtu(), Some(185));
    assert_eq!(client.change_mtu(247).unwrap_err().kind(), ErrorKind::InvalidArgument);

    client.change_security_level(SecurityLevel::High).unwrap();
    assert_eq!(peripheral.security(), SecurityLevel::High);

    client.disconnect();
    assert_eq!(peripheral.channel_mtu(), None);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}
