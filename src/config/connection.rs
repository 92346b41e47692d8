use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::AddressType;
use crate::Error;
use crate::Result;
use crate::SecurityLevel;

/// Defaults applied when opening a connection
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConnectionConfig {
    /// Local adapter (`hciX` or its address); `None` lets the transport pick
    #[serde(default)]
    pub source: Option<String>,

    /// Address type used when `connect` is not given one
    #[serde(default)]
    pub address_type: AddressType,

    /// Security level requested when the link is opened
    #[serde(default)]
    pub security_level: SecurityLevel,

    /// L2CAP PSM; 0 selects the LE ATT channel, anything else a BR/EDR link
    #[serde(default)]
    pub psm: u16,
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(source) = &self.source {
            if source.trim().is_empty() {
                return Err(Error::Config(ConfigError::Message(
                    "connection.source cannot be an empty string".into(),
                )));
            }
        }

        Ok(())
    }

    pub fn is_le(&self) -> bool {
        self.psm == 0
    }
}
