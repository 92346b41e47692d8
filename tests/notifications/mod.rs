use std::sync::Arc;
use std::time::Duration;

use gatt_bridge::uuid_from_u16;
use gatt_bridge::ClientError;
use gatt_bridge::Error;
use gatt_bridge::GattClient;
use gatt_bridge::GattNotification;
use gatt_bridge::NotificationKind;
use parking_lot::Mutex;

use crate::common::enable_logger;
use crate::common::heart_rate_database;
use crate::common::test_config;
use crate::common::wait_until;
use crate::common::GattDatabase;
use crate::common::Shared;
use crate::common::SimulatedPeripheral;
use crate::common::PEER;

/// Heart rate measurement value and its configuration descriptor
const HR_MEASUREMENT: u16 = 0x0003;
const HR_MEASUREMENT_CCC: u16 = 0x0004;

fn connected_client(peripheral: &Arc<SimulatedPeripheral>) -> GattClient<Shared> {
    enable_logger();
    let client = GattClient::builder(Shared(peripheral.clone()))
        .set_config(test_config(5_000))
        .build()
        .expect("valid config");
    client.connect(PEER, None).unwrap();
    client
}

/// Subscriber collecting what it receives.
fn collector() -> (
    Arc<Mutex<Vec<GattNotification>>>,
    impl Fn(&GattNotification) + Send + Sync + 'static,
) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    (received, move |n: &GattNotification| sink.lock().push(n.clone()))
}

/// Service changed characteristic, indicate only
fn service_changed_database() -> GattDatabase {
    GattDatabase::new()
        .primary(0x1801)
        .characteristic(0x2a05, 0x20, &[0x01, 0x00, 0xff, 0xff])
        .descriptor(0x2902, &[0x00, 0x00])
}

/// # Case 1: notification round trip
///
/// ## Validation Criterias:
/// 1. subscribing enables notifications in the configuration descriptor
/// 2. updates at the subscribed handle reach the callback with its type
/// 3. updates at other handles are ignored
/// 4. removing the subscription disables the descriptor again
#[test]
fn test_notifications_reach_subscriber() {
    let peripheral = Arc::new(SimulatedPeripheral::new(heart_rate_database()));
    let client = connected_client(&peripheral);
    let (received, callback) = collector();
    let hr = uuid_from_u16(0x2a37);

    client
        .add_notif(hr, None, NotificationKind::Notification, callback)
        .unwrap();
    assert_eq!(peripheral.value(HR_MEASUREMENT_CCC), Some(vec![0x01, 0x00]));
    assert_eq!(client.notif_uuid(HR_MEASUREMENT), Some(hr));
    assert_eq!(client.notif_list().len(), 1);

    assert!(peripheral.emit(NotificationKind::Notification, 0x0008, &[0x02]));
    assert!(peripheral.emit(NotificationKind::Notification, HR_MEASUREMENT, &[0x00, 0x50]));
    assert!(wait_until(Duration::from_secs(5), || received.lock().len() == 1));
    {
        let received = received.lock();
        assert_eq!(received[0].uuid, hr);
        assert_eq!(received[0].handle, HR_MEASUREMENT);
        assert_eq!(received[0].kind, NotificationKind::Notification);
        assert_eq!(received[0].data, vec![0x00, 0x50]);
    }
    assert_eq!(peripheral.confirmations(), 0);

    client.remove_notif(hr).unwrap();
    assert_eq!(peripheral.value(HR_MEASUREMENT_CCC), Some(vec![0x00, 0x00]));
    assert_eq!(client.notif_uuid(HR_MEASUREMENT), None);

    peripheral.emit(NotificationKind::Notification, HR_MEASUREMENT, &[0x00, 0x51]);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(received.lock().len(), 1);

    let err = client.remove_notif(hr).unwrap_err();
    assert!(matches!(err, Error::Client(ClientError::NotFound(_))));
}

/// # Case 2: indications
///
/// ## Validation Criterias:
/// 1. an indicate-only characteristic refuses notifications
/// 2. subscribing writes the indication bit
/// 3. every delivered indication is confirmed to the peer
#[test]
fn test_indications_are_confirmed() {
    let peripheral = Arc::new(SimulatedPeripheral::new(service_changed_database()));
    let client = connected_client(&peripheral);
    let (received, callback) = collector();
    let service_changed = uuid_from_u16(0x2a05);

    let err = client
        .add_notif(service_changed, None, NotificationKind::Notification, |_| {})
        .unwrap_err();
    assert!(matches!(err, Error::Client(ClientError::NotNotifiable)));
    assert!(client.notif_list().is_empty());

    client
        .add_notif(service_changed, None, NotificationKind::Indication, callback)
        .unwrap();
    assert_eq!(peripheral.value(0x0004), Some(vec![0x02, 0x00]));

    assert!(peripheral.emit(NotificationKind::Indication, 0x0003, &[0x01, 0x00, 0x0f, 0x00]));
    assert!(wait_until(Duration::from_secs(5), || peripheral.confirmations() == 1));
    assert_eq!(received.lock().len(), 1);
    assert_eq!(received.lock()[0].kind, NotificationKind::Indication);
}

/// # Case 3: subscriptions belong to one connection
///
/// ## Validation Criterias:
/// 1. disconnect forgets them and the peer drops its handler
/// 2. a peer hang-up forgets them as well
/// 3. subscribing again on a new connection works
#[test]
fn test_subscriptions_end_with_the_link() {
    let peripheral = Arc::new(SimulatedPeripheral::new(heart_rate_database()));
    let client = connected_client(&peripheral);
    let hr = uuid_from_u16(0x2a37);

    client
        .add_notif(hr, None, NotificationKind::Notification, |_| {})
        .unwrap();
    client.disconnect();
    assert!(client.notif_list().is_empty());

    client.connect(PEER, None).unwrap();
    assert!(!peripheral.emit(NotificationKind::Notification, HR_MEASUREMENT, &[0x00, 0x50]));

    let (received, callback) = collector();
    client
        .add_notif(hr, None, NotificationKind::Notification, callback)
        .unwrap();
    assert!(peripheral.emit(NotificationKind::Notification, HR_MEASUREMENT, &[0x00, 0x52]));
    assert!(wait_until(Duration::from_secs(5), || received.lock().len() == 1));

    peripheral.hang_up();
    assert!(wait_until(Duration::from_secs(5), || client.notif_list().is_empty()));

    // Without a link there is nothing left to disable
    client.remove_all_notif().unwrap();
}
