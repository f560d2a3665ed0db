//! Client for the TronGrid account endpoints
//!
//! One lookup is two calls against the same pooled client: `getaccount` for the
//! balance and `getaccountresource` for bandwidth and energy. TronGrid omits fields
//! for accounts without history, so every missing number reads as zero.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Result, WatchError};

/// `TRON-PRO-API-KEY`; header names are case-insensitive on the wire.
pub const API_KEY_HEADER: &str = "tron-pro-api-key";

const GET_ACCOUNT_PATH: &str = "/wallet/getaccount";
const GET_ACCOUNT_RESOURCE_PATH: &str = "/wallet/getaccountresource";

/// Balance, bandwidth and energy derived from one pair of upstream responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Raw balance in sun, as reported by `getaccount`.
    pub balance_trx: i64,
    pub bandwidth_remaining: i64,
    pub energy_remaining: i64,
}

impl AccountSnapshot {
    /// Fails with `Upstream` when the reported numbers cannot be subtracted in `i64`.
    pub fn from_parts(account: &AccountInfo, resource: &AccountResource) -> Result<Self> {
        Ok(AccountSnapshot {
            balance_trx: account.balance,
            bandwidth_remaining: remaining(
                "bandwidth",
                resource.free_net_limit,
                resource.free_net_used,
            )?,
            energy_remaining: remaining("energy", resource.energy_limit, resource.energy_used)?,
        })
    }
}

fn remaining(what: &str, limit: i64, used: i64) -> Result<i64> {
    limit.checked_sub(used).ok_or_else(|| {
        WatchError::Upstream(format!(
            "{} figures out of range (limit {}, used {})",
            what, limit, used
        ))
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub balance: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountResource {
    #[serde(default, rename = "freeNetUsed")]
    pub free_net_used: i64,
    #[serde(default, rename = "freeNetLimit")]
    pub free_net_limit: i64,
    #[serde(default, rename = "EnergyUsed")]
    pub energy_used: i64,
    #[serde(default, rename = "EnergyLimit")]
    pub energy_limit: i64,
}

#[derive(Serialize)]
struct AddressRequest<'a> {
    address: &'a str,
    visible: bool,
}

/// Shared upstream client. Headers are fixed at construction and never change.
#[derive(Debug, Clone)]
pub struct TronClient {
    client: reqwest::Client,
    base_url: String,
}

impl TronClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| WatchError::Config(format!("API_KEY is not a valid header value: {}", e)))?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| WatchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(TronClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch both account resources for `address` and fold them into a snapshot.
    ///
    /// Either call failing, or answering with something other than a JSON object,
    /// fails the whole lookup.
    pub async fn fetch(&self, address: &str) -> Result<AccountSnapshot> {
        let account: AccountInfo = self.post(GET_ACCOUNT_PATH, address).await?;
        let resource: AccountResource = self.post(GET_ACCOUNT_RESOURCE_PATH, address).await?;

        AccountSnapshot::from_parts(&account, &resource)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, address: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, address = %address, "upstream.request");

        let response = self
            .client
            .post(&url)
            .json(&AddressRequest {
                address,
                visible: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Upstream(format!(
                "{} answered with status {}",
                path, status
            )));
        }

        let body = response.text().await?;
        parse_body(path, &body)
    }
}

fn parse_body<T: DeserializeOwned>(path: &str, body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| WatchError::Upstream(format!("{} returned unparseable data: {}", path, e)))
}
