//! Synchronous GATT client facade
//!
//! - [`GattClient`] - one blocking call per GATT procedure
//! - [`GattClientBuilder`] - configurable client construction
//!
//! # Basic Usage
//! ```ignore
//! use gatt_bridge::{GattClient, uuid_from_u16, WriteType};
//! use std::time::Duration;
//!
//! let client = GattClient::builder(transport)
//!     .callback_timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! client.connect("00:1A:7D:DA:71:13", None)?;
//! let heart_rate = client.primary(uuid_from_u16(0x180d))?;
//! let value = client.read_char(uuid_from_u16(0x2a38), Some(&heart_rate))?;
//! client.write_char(uuid_from_u16(0x2a39), Some(&heart_rate), &[0x01], WriteType::Request)?;
//! client.disconnect();
//! ```
mod builder;
mod gatt_client;

pub use builder::*;
pub use gatt_client::*;
