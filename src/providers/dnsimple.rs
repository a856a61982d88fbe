//! [DNSimple](https://dnsimple.com) backend adapter.
//!
//! Credentials are read from `DNSIMPLE_OAUTH_TOKEN`, with an optional
//! `DNSIMPLE_BASE_URL` override (e.g. for the sandbox environment). The API
//! is multi-tenant, so every call is scoped to the account resolved once from
//! the whoami endpoint.
//!
//! See: <https://developer.dnsimple.com/v2/>

use super::{http_client, optional_env, required_env};
use crate::{
    backend::{DnsBackend, ExistingRecord, TxtRecord, Zone},
    error::{BoxError, Error},
    Reconciler,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use tokio::sync::OnceCell;

const DEFAULT_BASE_URL: &str = "https://api.dnsimple.com";

/// A DNS-01 challenge provider backed by DNSimple.
pub type Dnsimple = Reconciler<DnsimpleBackend>;

impl Dnsimple {
    /// Build a provider from the `DNSIMPLE_OAUTH_TOKEN` and optional
    /// `DNSIMPLE_BASE_URL` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let token = required_env("DNSIMPLE_OAUTH_TOKEN")?;
        Self::with_credentials(token, optional_env("DNSIMPLE_BASE_URL"))
    }

    /// Build a provider from the given OAuth token.
    pub fn with_credentials(token: String, base_url: Option<String>) -> Result<Self, Error> {
        if token.is_empty() {
            return Err(Error::Configuration("the DNSimple OAuth token is empty".into()));
        }

        Ok(Reconciler::new(DnsimpleBackend {
            client: http_client()?,
            token,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            account_id: OnceCell::new(),
        }))
    }
}

/// The raw DNSimple API adapter.
pub struct DnsimpleBackend {
    client: Client,
    token: String,
    base_url: String,
    account_id: OnceCell<String>,
}

impl DnsimpleBackend {
    /// The account identifier, resolved once from whoami and reused for the
    /// lifetime of the instance. Safe under concurrent first use.
    async fn account_id(&self) -> Result<&str, BoxError> {
        let id = self.account_id.get_or_try_init(|| self.whoami()).await?;
        Ok(id)
    }

    async fn whoami(&self) -> Result<String, BoxError> {
        let response: WhoamiResponse = self
            .client
            .get(format!("{}/v2/whoami", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.data.account {
            Some(account) => Ok(account.id.to_string()),
            // User tokens resolve without an account and cannot manage zones
            None => Err(Box::new(Error::Configuration(
                "DNSimple user tokens are not supported, use an account token".into(),
            ))),
        }
    }
}

#[async_trait]
impl DnsBackend for DnsimpleBackend {
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>, BoxError> {
        let account = self.account_id().await?;
        let response: ZonesResponse = self
            .client
            .get(format!("{}/v2/{}/zones", self.base_url, account))
            .query(&[("name_like", name)])
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .data
            .into_iter()
            .map(|zone| Zone {
                name: zone.name,
                id: zone.id.to_string(),
            })
            .collect())
    }

    async fn list_records(&self, zone: &Zone, name: &str) -> Result<Vec<ExistingRecord>, BoxError> {
        let account = self.account_id().await?;
        let response: RecordsResponse = self
            .client
            .get(format!(
                "{}/v2/{}/zones/{}/records",
                self.base_url, account, zone.name
            ))
            .query(&[("name", name), ("type", "TXT")])
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .data
            .into_iter()
            .map(|record| ExistingRecord {
                id: record.id.to_string(),
                name: record.name,
                content: record.content,
            })
            .collect())
    }

    async fn create_record(&self, zone: &Zone, record: &TxtRecord) -> Result<(), BoxError> {
        let account = self.account_id().await?;
        self.client
            .post(format!(
                "{}/v2/{}/zones/{}/records",
                self.base_url, account, zone.name
            ))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "name": record.name,
                "type": "TXT",
                "content": record.content,
                "ttl": record.ttl,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn delete_record(&self, zone: &Zone, record_id: &str) -> Result<(), BoxError> {
        let account = self.account_id().await?;
        self.client
            .delete(format!(
                "{}/v2/{}/zones/{}/records/{}",
                self.base_url, account, zone.name, record_id
            ))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

// The OAuth token must never leak through Debug output
impl Debug for DnsimpleBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsimpleBackend")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id.get())
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct WhoamiResponse {
    data: WhoamiData,
}

#[derive(Deserialize)]
struct WhoamiData {
    account: Option<AccountData>,
}

#[derive(Deserialize)]
struct AccountData {
    id: u64,
}

#[derive(Deserialize)]
struct ZonesResponse {
    data: Vec<ZoneData>,
}

#[derive(Deserialize)]
struct ZoneData {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct RecordsResponse {
    data: Vec<RecordData>,
}

#[derive(Deserialize)]
struct RecordData {
    id: u64,
    name: String,
    content: String,
}
