use std::sync::Arc;

use gatt_bridge::uuid_from_u16;
use gatt_bridge::ErrorKind;
use gatt_bridge::GattClient;
use gatt_bridge::WriteType;

use crate::common::enable_logger;
use crate::common::heart_rate_database;
use crate::common::test_config;
use crate::common::Shared;
use crate::common::SimulatedPeripheral;
use crate::common::PEER;

fn connect() -> (GattClient<Shared>, Arc<SimulatedPeripheral>) {
    enable_logger();
    let peripheral = Arc::new(SimulatedPeripheral::new(heart_rate_database()));
    let client = GattClient::builder(Shared(peripheral.clone()))
        .set_config(test_config(5_000))
        .build()
        .expect("valid config");
    client.connect(PEER, None).expect("connect");
    (client, peripheral)
}

#[test]
fn test_read_paths_agree() {
    let (client, _peripheral) = connect();
    let level = uuid_from_u16(0x2a19);

    let by_uuid = client.read_char(level, None).unwrap();
    assert_eq!(by_uuid.handle, 0x000b);
    assert_eq!(by_uuid.data, vec![87]);

    let blob = client.read_char_blob(level, None).unwrap();
    assert_eq!(blob.uuid, Some(level));
    assert_eq!(blob.data, by_uuid.data);

    let all = client.read_char_all_blob(level, None).unwrap();
    assert_eq!(all, vec![blob]);
}

#[test]
fn test_read_descriptors() {
    let (client, _peripheral) = connect();
    let measurement = uuid_from_u16(0x2a37);

    let name = client.read_desc(measurement, None, uuid_from_u16(0x2901)).unwrap();
    assert_eq!(name.data, b"Heart Rate".to_vec());
    assert_eq!(name.uuid, Some(uuid_from_u16(0x2901)));

    let values = client.read_all_desc(measurement, None).unwrap();
    let handles: Vec<u16> = values.iter().map(|v| v.handle).collect();
    assert_eq!(handles, vec![0x0003, 0x0004, 0x0005, 0x0006]);
}

#[test]
fn test_read_unknown_handle_fails() {
    let (client, _peripheral) = connect();

    let err = client.read_by_handle(0x0100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestFailed);
    assert_eq!(err.to_string(), "read by handle request failed: Invalid handle (status 0x01)");
    // A negative status does not cost the link
    assert!(client.read_by_handle(0x0003).is_ok());
}

#[test]
fn test_write_then_read_back() {
    let (client, peripheral) = connect();
    let measurement = uuid_from_u16(0x2a37);
    let cccd = uuid_from_u16(0x2902);

    client.write_desc(measurement, None, cccd, &[0x01, 0x00]).unwrap();
    assert_eq!(peripheral.value(0x0004), Some(vec![0x01, 0x00]));
    assert_eq!(client.read_desc(measurement, None, cccd).unwrap().data, vec![0x01, 0x00]);

    client
        .write_char(uuid_from_u16(0x2a38), None, &[0x03], WriteType::Command)
        .unwrap();
    assert_eq!(peripheral.value(0x0008), Some(vec![0x03]));

    let err = client
        .write_by_handle(0x0100, &[0x01], WriteType::Request)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestFailed);
}
