use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::fetcher::StorageFetcher;
use super::keys::StorageKey;
use super::{FetchError, KeyLookup};

const SUCCESS_CODE: &str = "successful";

// ── API response types ───────────────────────────────────────────────

/// Common envelope of every gateway response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    error: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct KeysData {
    #[serde(default)]
    pairs: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct KeyData {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VmQueryRequest<'a> {
    sc_address: &'a str,
    func_name: &'a str,
    args: &'a [String],
}

#[derive(Debug, Deserialize)]
struct VmQueryData {
    data: VmOutput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VmOutput {
    #[serde(default)]
    return_data: Option<Vec<Option<String>>>,
    #[serde(default)]
    return_code: String,
    #[serde(default)]
    return_message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenData {
    token_data: TokenBalance,
}

#[derive(Debug, Deserialize)]
struct TokenBalance {
    balance: String,
}

// ── Gateway client ───────────────────────────────────────────────────

/// Ledger proxy REST client.
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("salsa-recon/0.1")
            .build()?;
        Ok(GatewayClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let envelope: Envelope<T> = self.client.get(&url).send().await?.json().await?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, FetchError> {
    if !envelope.error.is_empty() || (!envelope.code.is_empty() && envelope.code != SUCCESS_CODE) {
        return Err(FetchError::Gateway {
            code: envelope.code,
            message: envelope.error,
        });
    }
    envelope.data.ok_or_else(|| FetchError::Gateway {
        code: envelope.code,
        message: "response has no data".into(),
    })
}

#[async_trait]
impl StorageFetcher for GatewayClient {
    async fn get_key(&self, address: &str, key: &StorageKey) -> KeyLookup {
        let path = format!("/address/{}/key/{}", address, key.to_hex());
        let data: KeyData = match self.get(&path).await {
            Ok(d) => d,
            Err(e) => return KeyLookup::Error(e),
        };
        if data.value.is_empty() {
            return KeyLookup::NotFound;
        }
        match hex::decode(&data.value) {
            Ok(bytes) => KeyLookup::Found(bytes),
            Err(source) => KeyLookup::Error(FetchError::Hex {
                what: format!("value of key {}", key.to_hex()),
                source,
            }),
        }
    }

    async fn get_keys(
        &self,
        address: &str,
        prefix: &[u8],
    ) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, FetchError> {
        let data: KeysData = self.get(&format!("/address/{address}/keys")).await?;

        let mut out = BTreeMap::new();
        for (k, v) in &data.pairs {
            let key = hex::decode(k).map_err(|source| FetchError::Hex {
                what: "storage key".into(),
                source,
            })?;
            if !key.starts_with(prefix) {
                continue;
            }
            let value = hex::decode(v).map_err(|source| FetchError::Hex {
                what: format!("value of key {k}"),
                source,
            })?;
            out.insert(key, value);
        }
        Ok(out)
    }

    async fn query_view(
        &self,
        address: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<Vec<u8>>, FetchError> {
        let url = format!("{}/vm-values/query", self.base_url);
        let request = VmQueryRequest {
            sc_address: address,
            func_name: function,
            args,
        };
        let envelope: Envelope<VmQueryData> = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        let output = unwrap_envelope(envelope)?.data;

        if !output.return_code.is_empty() && output.return_code != "ok" {
            return Err(FetchError::Gateway {
                code: output.return_code,
                message: format!("{function}: {}", output.return_message),
            });
        }

        output
            .return_data
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                let encoded = item.unwrap_or_default();
                STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|source| FetchError::Base64 {
                        what: format!("return data of {function}"),
                        source,
                    })
            })
            .collect()
    }

    async fn token_balance(&self, address: &str, token: &str) -> Result<U256, FetchError> {
        let data: TokenData = self.get(&format!("/address/{address}/esdt/{token}")).await?;
        let balance = data.token_data.balance;
        U256::from_str(&balance).map_err(|_| FetchError::InvalidValue {
            what: format!("{token} balance"),
            value: balance,
        })
    }
}
