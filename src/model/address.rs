use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const ADDRESS_HRP: &str = "erd";

/// Raw 32-byte ledger account identifier.
///
/// Everything inside the reconciler keys on these bytes; the bech32
/// `erd1...` form only appears at the display and serialization boundary.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pubkey(pub [u8; 32]);

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid bech32 address `{0}`")]
    Bech32(String),
    #[error("address `{address}` uses prefix `{hrp}`, expected `{ADDRESS_HRP}`")]
    WrongHrp { address: String, hrp: String },
    #[error("address payload is {0} bytes, expected 32")]
    WrongLength(usize),
}

impl Pubkey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let raw: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressError::WrongLength(bytes.len()))?;
        Ok(Pubkey(raw))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Bech32 `erd1...` rendering.
    pub fn to_bech32(&self) -> String {
        // The HRP literal is valid and 32 bytes is far below the length limit.
        match Hrp::parse(ADDRESS_HRP)
            .ok()
            .and_then(|hrp| bech32::encode::<Bech32>(hrp, &self.0).ok())
        {
            Some(s) => s,
            None => self.to_hex(),
        }
    }

    /// Shortened form for log lines.
    pub fn short(&self) -> String {
        let s = self.to_bech32();
        if s.len() > 14 {
            format!("{}...{}", &s[..8], &s[s.len() - 6..])
        } else {
            s
        }
    }
}

impl FromStr for Pubkey {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hrp, data) = bech32::decode(s).map_err(|_| AddressError::Bech32(s.to_string()))?;
        if hrp.as_str() != ADDRESS_HRP {
            return Err(AddressError::WrongHrp {
                address: s.to_string(),
                hrp: hrp.to_string(),
            });
        }
        Pubkey::from_slice(&data)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_bech32())
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bech32())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
