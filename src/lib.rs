//! Synchronous facade over a callback-driven Bluetooth Low Energy GATT
//! client.
//!
//! The ATT stack underneath ([`AttTransport`]) is asynchronous: every request
//! returns immediately and its response arrives later through a callback run
//! on a background event loop ([`Dispatcher`]). [`GattClient`] turns each of
//! those exchanges into a blocking call:
//!
//! 1. a fresh [`CompletionContext`] is paired with a [`Completer`]
//! 2. the request is handed to the transport together with a callback owning
//!    the completer
//! 3. the caller blocks in [`CompletionContext::wait`] until the callback
//!    delivers the assembled result, the event loop dies, or the callback
//!    timeout elapses
//!
//! The shared [`Link`] tracks the connection state; any wait that gives up
//! marks the link [`ConnectionState::Disconnected`] and stops the event loop.
//!
//! ```ignore
//! let client = GattClient::builder(transport)
//!     .callback_timeout(Duration::from_secs(10))
//!     .build()?;
//! client.connect("00:1A:7D:DA:71:13", None)?;
//! let battery = client.read_char(uuid_from_u16(0x2a19), None)?;
//! ```

mod client;
mod config;
mod constants;
mod core;
mod errors;
mod gatt;
mod transport;

pub use core::*;

pub use client::*;
pub use config::*;
pub use constants::*;
pub use errors::*;
pub use gatt::*;
pub use transport::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
