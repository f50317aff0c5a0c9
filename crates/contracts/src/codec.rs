//! Wire codec shared by network sources and sinks

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// Serialization format for datagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Bincode => "bincode",
        }
    }

    /// Encode a value into a datagram payload
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, ContractError> {
        let data = match self {
            Self::Json => {
                serde_json::to_vec(value).map_err(|e| ContractError::codec("json", e.to_string()))?
            }
            Self::Bincode => bincode::serialize(value)
                .map_err(|e| ContractError::codec("bincode", e.to_string()))?,
        };
        Ok(Bytes::from(data))
    }

    /// Decode a datagram payload
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ContractError> {
        match self {
            Self::Json => serde_json::from_slice(data)
                .map_err(|e| ContractError::codec("json", e.to_string())),
            Self::Bincode => bincode::deserialize(data)
                .map_err(|e| ContractError::codec("bincode", e.to_string())),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "bincode" => Ok(Self::Bincode),
            other => Err(format!("unknown wire format '{}'", other)),
        }
    }
}
