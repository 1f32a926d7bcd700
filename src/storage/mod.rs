pub mod keys;
pub mod snapshot;

#[cfg(feature = "full")]
pub mod fetcher;
#[cfg(feature = "full")]
pub mod gateway;

use thiserror::Error;

pub use keys::StorageKey;
pub use snapshot::{RawState, StorageSnapshot};

/// Failure reported by the storage collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[cfg(feature = "full")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned error `{code}`: {message}")]
    Gateway { code: String, message: String },

    #[error("invalid hex in {what}: {source}")]
    Hex {
        what: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("invalid base64 in {what}: {source}")]
    Base64 {
        what: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("invalid {what}: `{value}`")]
    InvalidValue { what: String, value: String },

    #[error("view `{0}` was not fetched")]
    MissingView(String),
}

/// Outcome of a single-key lookup.
#[derive(Debug)]
pub enum KeyLookup {
    Found(Vec<u8>),
    NotFound,
    Error(FetchError),
}

impl KeyLookup {
    /// Found bytes, or `None` when the key does not exist.
    pub fn into_option(self) -> Result<Option<Vec<u8>>, FetchError> {
        match self {
            KeyLookup::Found(v) => Ok(Some(v)),
            KeyLookup::NotFound => Ok(None),
            KeyLookup::Error(e) => Err(e),
        }
    }

    /// Found bytes, with a missing key read as an empty value.
    ///
    /// The ledger drops keys whose value is empty, so for numeric slots
    /// "not found" and "zero" are the same thing.
    pub fn or_empty(self) -> Result<Vec<u8>, FetchError> {
        self.into_option().map(Option::unwrap_or_default)
    }
}
