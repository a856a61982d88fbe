//! [Cloudflare](https://www.cloudflare.com) backend adapter.
//!
//! Credentials are read from `CLOUDFLARE_API_TOKEN`, which needs the
//! `Zone:Read` and `DNS:Edit` permissions for the zones being solved. The
//! zone handle is the Cloudflare zone id, and record listings use the full
//! record name since the API does not accept apex-relative names.
//!
//! See: <https://developers.cloudflare.com/api/>

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

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// A DNS-01 challenge provider backed by Cloudflare.
pub type Cloudflare = Reconciler<CloudflareBackend>;

impl Cloudflare {
    /// Build a provider from the `CLOUDFLARE_API_TOKEN` and optional
    /// `CLOUDFLARE_BASE_URL` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let token = required_env("CLOUDFLARE_API_TOKEN")?;
        Self::with_credentials(token, optional_env("CLOUDFLARE_BASE_URL"))
    }

    /// Build a provider from the given API token.
    pub fn with_credentials(token: String, base_url: Option<String>) -> Result<Self, Error> {
        if token.is_empty() {
            return Err(Error::Configuration("the Cloudflare API token is empty".into()));
        }

        Ok(Reconciler::new(CloudflareBackend {
            client: http_client()?,
            token,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
        }))
    }
}

/// The raw Cloudflare API adapter.
pub struct CloudflareBackend {
    client: Client,
    token: String,
    base_url: String,
}

impl CloudflareBackend {
    /// Cloudflare addresses records by their full name, not relative to the
    /// apex.
    fn full_name(zone: &Zone, name: &str) -> String {
        if name.is_empty() {
            zone.name.clone()
        } else {
            format!("{}.{}", name, zone.name)
        }
    }
}

#[async_trait]
impl DnsBackend for CloudflareBackend {
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>, BoxError> {
        let response: ListResponse<ZoneData> = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", name)])
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .result
            .into_iter()
            .map(|zone| Zone {
                name: zone.name,
                id: zone.id,
            })
            .collect())
    }

    async fn list_records(&self, zone: &Zone, name: &str) -> Result<Vec<ExistingRecord>, BoxError> {
        let full_name = Self::full_name(zone, name);
        let response: ListResponse<RecordData> = self
            .client
            .get(format!("{}/zones/{}/dns_records", self.base_url, zone.id))
            .query(&[("type", "TXT"), ("name", &full_name)])
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .result
            .into_iter()
            .map(|record| ExistingRecord {
                id: record.id,
                name: record.name,
                content: record.content,
            })
            .collect())
    }

    async fn create_record(&self, zone: &Zone, record: &TxtRecord) -> Result<(), BoxError> {
        self.client
            .post(format!("{}/zones/{}/dns_records", self.base_url, zone.id))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "type": "TXT",
                "name": Self::full_name(zone, &record.name),
                "content": record.content,
                "ttl": record.ttl,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn delete_record(&self, zone: &Zone, record_id: &str) -> Result<(), BoxError> {
        self.client
            .delete(format!(
                "{}/zones/{}/dns_records/{}",
                self.base_url, zone.id, record_id
            ))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

// The API token must never leak through Debug output
impl Debug for CloudflareBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ListResponse<T> {
    result: Vec<T>,
}

#[derive(Deserialize)]
struct ZoneData {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct RecordData {
    id: String,
    name: String,
    content: String,
}
