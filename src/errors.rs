//! GATT Bridge Error Hierarchy
//!
//! Every synchronous call surfaces exactly one [`Error`]. Errors are grouped by
//! where they originate:
//! - [`GattError`]: the outstanding request itself failed (timeout, link loss,
//!   negative ATT status, undecodable response, ...)
//! - [`ClientError`]: the call was rejected before anything was dispatched
//! - [`DispatcherError`]: the background event loop could not be brought up

use std::io;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failures of a dispatched GATT request
    #[error(transparent)]
    Gatt(#[from] GattError),

    /// Invalid arguments or session state, detected before dispatch
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Event loop lifecycle failures
    #[error(transparent)]
    Dispatcher(#[from] DispatcherError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum GattError {
    /// No callback released the context before the deadline
    #[error("Timeout, no callback received after {0:?}")]
    NoCallback(Duration),

    /// The event loop died, or the link was reported closed
    #[error("Disconnected: {0}")]
    Disconnected(&'static str),

    /// The peer answered with a negative ATT status
    #[error("{request} request failed: {reason} (status {status:#04x})")]
    RequestFailed {
        request: &'static str,
        status: u8,
        reason: &'static str,
    },

    /// The response could not be decoded or assembled
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Building the caller-visible payload failed
    #[error("Failed to allocate {0} result")]
    Allocation(&'static str),

    /// The transport refused to enqueue the request
    #[error("Unable to send {0} request")]
    SendRequest(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Already connected to a device")]
    AlreadyConnected,

    #[error("Invalid Bluetooth address: {0}")]
    InvalidAddress(String),

    #[error("Connection failed: {0}")]
    ConnectFailed(#[source] io::Error),

    /// End handle placed before start handle
    #[error("Handle order error: end handle {end:#06x} before start handle {start:#06x}")]
    HandleOrder { start: u16, end: u16 },

    #[error("Invalid handle")]
    InvalidHandle,

    #[error("{0} not unique")]
    NotUnique(&'static str),

    #[error("No {0} found")]
    NotFound(&'static str),

    #[error("Invalid value: empty payload")]
    InvalidValue,

    #[error("Operation is only available for LE transport")]
    LeOnly,

    #[error("MTU exchange can only occur once per connection")]
    MtuAlreadyExchanged,

    #[error("Invalid MTU {requested}, minimum MTU size is {minimum}")]
    InvalidMtu { requested: u16, minimum: u16 },

    #[error("Change will take effect on reconnection")]
    ReconnectionNeeded,

    #[error("Failed to change security level: {0}")]
    Security(#[source] io::Error),

    #[error("Characteristic is not notifiable")]
    NotNotifiable,

    #[error("Characteristic is not indicable")]
    NotIndicable,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    #[error("Failed to spawn event loop thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("Failed to build event loop: {0}")]
    Build(#[source] io::Error),
}

/// Flat classification of [`Error`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoCallback,
    Disconnected,
    RequestFailed,
    Protocol,
    Allocation,
    SendRequest,
    InvalidArgument,
    Dispatcher,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Gatt(e) => match e {
                GattError::NoCallback(_) => ErrorKind::NoCallback,
                GattError::Disconnected(_) => ErrorKind::Disconnected,
                GattError::RequestFailed { .. } => ErrorKind::RequestFailed,
                GattError::Protocol(_) => ErrorKind::Protocol,
                GattError::Allocation(_) => ErrorKind::Allocation,
                GattError::SendRequest(_) => ErrorKind::SendRequest,
            },
            Error::Client(ClientError::ConnectFailed(_)) => ErrorKind::Disconnected,
            Error::Client(_) => ErrorKind::InvalidArgument,
            Error::Dispatcher(_) => ErrorKind::Dispatcher,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.kind() == ErrorKind::Disconnected
    }
}
