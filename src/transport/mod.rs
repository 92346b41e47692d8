//! Boundary to the asynchronous ATT stack.
//!
//! Implementations own the L2CAP channel, the PDU encoding and decoding, and
//! schedule every callback on the [`EventLoop`] handed to
//! [`AttTransport::connect`]. Dispatch methods return `false` when the request
//! could not be queued; in that case the callback is dropped without being
//! called.

use std::io;

#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::AddressType;
use crate::EventLoop;
use crate::HandleRange;
use crate::NotificationKind;
use crate::SecurityLevel;

/// Invoked once when the link is up, or with the reason it could not be opened
pub type ConnectCallback = Box<dyn FnOnce(io::Result<()>) + Send>;
/// Invoked on every hang-up of the underlying channel
pub type HangupHandler = Box<dyn Fn() + Send + Sync>;
/// Discovery procedures hand back the ATT status and the decoded records
pub type DiscoveryCallback<T> = Box<dyn FnOnce(u8, Vec<T>) + Send>;
/// PDU level responses; `None` when the PDU failed structural decoding
pub type ResponseCallback<T> = Box<dyn FnOnce(u8, Option<T>) + Send>;

/// Invoked for every Handle Value Notification or Indication received
pub type NotificationHandler = Box<dyn Fn(ValueUpdate) + Send + Sync>;

/// Decoded Handle Value Notification / Indication PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueUpdate {
    pub kind: NotificationKind,
    pub handle: u16,
    pub value: Vec<u8>,
}

/// Decoded entry of a Read By Group Type response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub uuid: Uuid,
    pub changed: bool,
    pub start: u16,
    pub end: u16,
}

/// Decoded include declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRecord {
    pub uuid: Option<Uuid>,
    pub handle: u16,
    pub start: u16,
    pub end: u16,
}

/// Decoded characteristic declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicRecord {
    pub uuid: Uuid,
    pub handle: u16,
    pub properties: u8,
    pub value_handle: u16,
}

/// One `(handle, type)` pair of a Find Information response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoEntry {
    pub handle: u16,
    pub uuid: Uuid,
}

/// One `(handle, value)` pair of a Read By Type response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleValue {
    pub handle: u16,
    pub value: Vec<u8>,
}

/// Link parameters for [`AttTransport::connect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub source: Option<String>,
    pub destination: String,
    pub address_type: AddressType,
    pub security: SecurityLevel,
    /// 0 for LE, the L2CAP PSM of a BR/EDR link otherwise
    pub psm: u16,
    /// MTU already agreed on for this peer, if any
    pub mtu: Option<u16>,
}

#[cfg_attr(test, automock)]
pub trait AttTransport: Send + Sync + 'static {
    /// Opens the channel. Errors returned here mean nothing was started and
    /// `callback` will never run.
    fn connect(
        &self,
        event_loop: EventLoop,
        request: &ConnectRequest,
        on_hangup: HangupHandler,
        callback: ConnectCallback,
    ) -> io::Result<()>;

    /// Shuts the channel down. Pending callbacks may still run.
    fn disconnect(&self);

    fn discover_primary_all(
        &self,
        callback: DiscoveryCallback<ServiceRecord>,
    ) -> bool;

    fn discover_primary_by_uuid(
        &self,
        uuid: Uuid,
        callback: DiscoveryCallback<HandleRange>,
    ) -> bool;

    fn find_included(
        &self,
        range: HandleRange,
        callback: DiscoveryCallback<IncludeRecord>,
    ) -> bool;

    fn discover_characteristics(
        &self,
        range: HandleRange,
        uuid: Option<Uuid>,
        callback: DiscoveryCallback<CharacteristicRecord>,
    ) -> bool;

    /// One Find Information request; pagination is driven by the caller
    fn discover_descriptors(
        &self,
        range: HandleRange,
        callback: ResponseCallback<Vec<InfoEntry>>,
    ) -> bool;

    fn read_by_handle(
        &self,
        handle: u16,
        callback: ResponseCallback<Vec<u8>>,
    ) -> bool;

    fn read_by_uuid(
        &self,
        range: HandleRange,
        uuid: Uuid,
        callback: ResponseCallback<Vec<HandleValue>>,
    ) -> bool;

    fn write_request(
        &self,
        handle: u16,
        value: &[u8],
        callback: ResponseCallback<()>,
    ) -> bool;

    fn write_command(
        &self,
        handle: u16,
        value: &[u8],
    ) -> bool;

    /// Sends the client MTU; the callback receives the server MTU
    fn exchange_mtu(
        &self,
        mtu: u16,
        callback: ResponseCallback<u16>,
    ) -> bool;

    /// Applies the negotiated MTU to the channel
    fn set_mtu(
        &self,
        mtu: u16,
    ) -> bool;

    fn set_security_level(
        &self,
        level: SecurityLevel,
    ) -> io::Result<()>;

    /// Installs the handler run on the event loop for every notification or
    /// indication of the current connection, replacing any previous one.
    /// The handler is dropped on disconnect.
    fn set_notification_handler(
        &self,
        handler: NotificationHandler,
    );

    /// Sends the Handle Value Confirmation of the last indication
    fn confirm_indication(&self) -> bool;
}
