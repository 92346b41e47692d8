// -
// Attribute handles

/// Reserved, never assigned to an attribute
pub const INVALID_HANDLE: u16 = 0x0000;
/// First handle of the attribute space
pub const MIN_HANDLE: u16 = 0x0001;
/// Last handle of the attribute space
pub const MAX_HANDLE: u16 = 0xffff;

// -
// ATT

/// ATT_MTU of an LE link before any exchange
pub const ATT_DEFAULT_LE_MTU: u16 = 23;

/// Status reported by the transport for a successful response
pub const ATT_STATUS_SUCCESS: u8 = 0x00;

// -
// Addresses

/// Length of a textual Bluetooth address, `XX:XX:XX:XX:XX:XX`
pub(crate) const MAC_ADDRESS_LEN: usize = 17;

// -
// Request names used in logs and errors

pub(crate) const REQ_CONNECT: &str = "connect";
pub(crate) const REQ_PRIMARY_ALL: &str = "discover all primary services";
pub(crate) const REQ_PRIMARY_BY_UUID: &str = "discover primary service by UUID";
pub(crate) const REQ_INCLUDED: &str = "find included services";
pub(crate) const REQ_CHARACTERISTICS: &str = "discover characteristics";
pub(crate) const REQ_FIND_INFO: &str = "find information";
pub(crate) const REQ_READ_BY_HANDLE: &str = "read by handle";
pub(crate) const REQ_READ_BY_UUID: &str = "read by UUID";
pub(crate) const REQ_WRITE: &str = "write request";
pub(crate) const REQ_WRITE_CMD: &str = "write command";
pub(crate) const REQ_EXCHANGE_MTU: &str = "exchange MTU";
