use std::sync::Arc;

use gatt_bridge::uuid_from_u16;
use gatt_bridge::ClientError;
use gatt_bridge::Error;
use gatt_bridge::GattClient;
use gatt_bridge::HandleRange;

use crate::common::enable_logger;
use crate::common::heart_rate_database;
use crate::common::test_config;
use crate::common::Shared;
use crate::common::SimulatedPeripheral;
use crate::common::PEER;

fn connect(peripheral: SimulatedPeripheral) -> (GattClient<Shared>, Arc<SimulatedPeripheral>) {
    enable_logger();
    let peripheral = Arc::new(peripheral);
    let client = GattClient::builder(Shared(peripheral.clone()))
        .set_config(test_config(5_000))
        .build()
        .expect("valid config");
    client.connect(PEER, None).expect("connect");
    (client, peripheral)
}

#[test]
fn test_full_discovery() {
    let (client, _peripheral) = connect(SimulatedPeripheral::new(heart_rate_database()));

    let services = client.primaries(None).unwrap();
    let ranges: Vec<(u16, HandleRange)> = services
        .iter()
        .map(|s| (gatt_bridge::short_uuid(&s.uuid).unwrap(), s.range))
        .collect();
    assert_eq!(
        ranges,
        vec![
            (0x180d, HandleRange { start: 0x0001, end: 0x0008 }),
            (0x180f, HandleRange { start: 0x0009, end: 0x000b }),
        ]
    );

    let heart_rate = client.primary(uuid_from_u16(0x180d)).unwrap();
    assert_eq!(heart_rate.range, services[0].range);
    assert!(client.included(Some(&heart_rate)).unwrap().is_empty());

    let characteristics = client.characteristics(None, Some(&heart_rate)).unwrap();
    let handles: Vec<(u16, u16)> = characteristics
        .iter()
        .map(|c| (c.handle, c.value_handle))
        .collect();
    assert_eq!(handles, vec![(0x0002, 0x0003), (0x0007, 0x0008)]);

    // Battery level lives in the other service only
    let err = client
        .characteristic(uuid_from_u16(0x2a19), Some(&heart_rate))
        .unwrap_err();
    assert!(matches!(err, Error::Client(ClientError::NotFound("characteristic"))));
    let battery = client.characteristic(uuid_from_u16(0x2a19), None).unwrap();
    assert_eq!(battery.value_handle, 0x000b);
}

/// # Case 1: descriptor walk spread over several Find Information pages
///
/// ## Validation Criterias:
/// 1. one request per page, each resuming after the last handle seen
/// 2. descriptors come back concatenated in handle order
/// 3. the walk stops at the next characteristic declaration
#[test]
fn test_paginated_descriptors() {
    let (client, peripheral) = connect(SimulatedPeripheral::new(heart_rate_database()).with_page_size(2));

    let heart_rate = client.primary(uuid_from_u16(0x180d)).unwrap();
    let measurement = client
        .characteristic(uuid_from_u16(0x2a37), Some(&heart_rate))
        .unwrap();

    let descriptors = client
        .descriptors_by_char(&measurement, None, Some(&heart_rate))
        .unwrap();
    let found: Vec<(u16, u16)> = descriptors
        .iter()
        .map(|d| (d.handle, gatt_bridge::short_uuid(&d.uuid).unwrap()))
        .collect();
    assert_eq!(
        found,
        vec![(0x0003, 0x2a37), (0x0004, 0x2902), (0x0005, 0x2901), (0x0006, 0x2904)]
    );
    // 3..4, 5..6, then 7 is a declaration
    assert_eq!(peripheral.find_info_requests(), 3);
}

#[test]
fn test_descriptors_bounded_by_next_characteristic() {
    let (client, peripheral) = connect(SimulatedPeripheral::new(heart_rate_database()).with_page_size(2));

    let characteristics = client.characteristics(None, None).unwrap();
    let descriptors = client
        .descriptors_by_char(&characteristics[0], Some(&characteristics[1]), None)
        .unwrap();

    assert_eq!(descriptors.len(), 4);
    assert_eq!(descriptors.last().map(|d| d.handle), Some(0x0006));
    // The last page ends exactly on the bound
    assert_eq!(peripheral.find_info_requests(), 2);

    // Nothing between a characteristic value and the end of its service
    let battery = client.primary(uuid_from_u16(0x180f)).unwrap();
    let level = client.characteristic(uuid_from_u16(0x2a19), Some(&battery)).unwrap();
    let descriptors = client.descriptors_by_char(&level, None, Some(&battery)).unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].handle, level.value_handle);
}

#[test]
fn test_descriptor_lookup_by_type() {
    let (client, _peripheral) = connect(SimulatedPeripheral::new(heart_rate_database()).with_page_size(1));

    let cccd = client
        .descriptor(uuid_from_u16(0x2a37), None, uuid_from_u16(0x2902))
        .unwrap();
    assert_eq!(cccd.handle, 0x0004);

    let err = client
        .descriptor(uuid_from_u16(0x2a38), None, uuid_from_u16(0x2902))
        .unwrap_err();
    assert!(matches!(err, Error::Client(ClientError::NotFound("descriptor"))));
}
