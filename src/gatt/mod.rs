//! Caller-visible GATT attribute types.
//!
//! These are the payloads assembled by the completion callbacks and handed
//! back by [`crate::GattClient`]. Handles are only meaningful while the
//! peer's attribute database is unchanged.
pub mod att;


use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::ClientError;
use crate::Result;
use crate::INVALID_HANDLE;
use crate::MAX_HANDLE;
use crate::MIN_HANDLE;

/// Primary Service declaration
pub const PRIMARY_SERVICE_UUID: u16 = 0x2800;
/// Secondary Service declaration
pub const SECONDARY_SERVICE_UUID: u16 = 0x2801;
/// Include declaration
pub const INCLUDE_UUID: u16 = 0x2802;
/// Characteristic declaration
pub const CHARACTERISTIC_UUID: u16 = 0x2803;
/// Client Characteristic Configuration descriptor
pub const CCC_UUID: u16 = 0x2902;

/// Characteristic property: value can be notified
pub const PROPERTY_NOTIFY: u8 = 0x10;
/// Characteristic property: value can be indicated
pub const PROPERTY_INDICATE: u8 = 0x20;

const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Expands a 16-bit SIG assigned number over the Bluetooth base UUID.
pub const fn uuid_from_u16(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// Returns the 16-bit alias when `uuid` lies on the Bluetooth base UUID.
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let alias = (value >> 96) as u32;
    if value & !(0xffff_ffffu128 << 96) == BLUETOOTH_BASE_UUID && alias <= u16::MAX as u32 {
        Some(alias as u16)
    } else {
        None
    }
}

/// True for the attribute types that open a new service, include or
/// characteristic and therefore end a descriptor run.
pub fn is_declaration(uuid: &Uuid) -> bool {
    matches!(
        short_uuid(uuid),
        Some(PRIMARY_SERVICE_UUID | SECONDARY_SERVICE_UUID | INCLUDE_UUID | CHARACTERISTIC_UUID)
    )
}

/// Inclusive attribute handle range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleRange {
    pub start: u16,
    pub end: u16,
}

impl HandleRange {
    /// The whole attribute space, `0x0001..=0xffff`.
    pub const ALL: HandleRange = HandleRange {
        start: MIN_HANDLE,
        end: MAX_HANDLE,
    };

    pub fn new(
        start: u16,
        end: u16,
    ) -> Result<Self> {
        if start > end {
            return Err(ClientError::HandleOrder { start, end }.into());
        }
        if start == INVALID_HANDLE || end == INVALID_HANDLE {
            return Err(ClientError::InvalidHandle.into());
        }
        Ok(Self { start, end })
    }

    pub fn contains(
        &self,
        handle: u16,
    ) -> bool {
        self.start <= handle && handle <= self.end
    }
}

impl Default for HandleRange {
    fn default() -> Self {
        Self::ALL
    }
}

/// A primary service and the handles it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattPrimary {
    pub uuid: Uuid,
    /// Set when the service was reported through a "service changed" path
    pub changed: bool,
    pub range: HandleRange,
}

impl GattPrimary {
    /// Validated handle range of this service, used as the search window of
    /// every lookup scoped to it.
    pub fn handle_range(&self) -> Result<HandleRange> {
        HandleRange::new(self.range.start, self.range.end)
    }
}

/// An include declaration inside a primary service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattIncluded {
    /// Only reported by the peer for 16-bit service UUIDs
    pub uuid: Option<Uuid>,
    pub handle: u16,
    pub range: HandleRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    pub uuid: Uuid,
    /// Handle of the declaration attribute
    pub handle: u16,
    pub properties: u8,
    pub value_handle: u16,
}

impl GattCharacteristic {
    /// Whether the peer may push this value with `kind`.
    pub fn supports(
        &self,
        kind: NotificationKind,
    ) -> bool {
        self.properties & kind.property() != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattDescriptor {
    pub uuid: Uuid,
    pub handle: u16,
}

/// An attribute value as returned by a read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GattValue {
    /// Characteristic or descriptor type, when known to the caller
    pub uuid: Option<Uuid>,
    pub handle: u16,
    pub data: Vec<u8>,
}

impl GattValue {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Acknowledged or fire-and-forget write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteType {
    /// Write Request, the peer answers with a Write Response
    #[default]
    Request,
    /// Write Command, nothing comes back
    Command,
}

/// Server-initiated updates of a characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Handle Value Notification, unacknowledged
    Notification,
    /// Handle Value Indication, confirmed by the client
    Indication,
}

impl NotificationKind {
    /// Characteristic property bit required to subscribe
    pub fn property(self) -> u8 {
        match self {
            NotificationKind::Notification => PROPERTY_NOTIFY,
            NotificationKind::Indication => PROPERTY_INDICATE,
        }
    }

    /// Client Characteristic Configuration value enabling this kind
    pub fn ccc_value(self) -> [u8; 2] {
        match self {
            NotificationKind::Notification => [0x01, 0x00],
            NotificationKind::Indication => [0x02, 0x00],
        }
    }
}

/// Client Characteristic Configuration value disabling both kinds
pub const CCC_DISABLED: [u8; 2] = [0x00, 0x00];

/// A value pushed by the peer for a subscribed characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattNotification {
    pub kind: NotificationKind,
    /// Characteristic type the subscription was made for
    pub uuid: Uuid,
    /// Value handle of the characteristic
    pub handle: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    #[default]
    Public,
    Random,
}

/// Checks the textual form `XX:XX:XX:XX:XX:XX` of a Bluetooth address.
pub fn is_valid_address(address: &str) -> bool {
    let bytes = address.as_bytes();
    bytes.len() == crate::constants::MAC_ADDRESS_LEN
        && bytes.iter().enumerate().all(|(i, b)| match i % 3 {
            2 => *b == b':',
            _ => b.is_ascii_hexdigit(),
        })
}
