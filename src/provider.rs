//! The challenge provider capability and the provider registry.
//!
//! Currently, the following backends are supported:
//! - [Cloudflare](https://www.cloudflare.com): `"cloudflare"`
//! - [DNSimple](https://dnsimple.com): `"dnsimple"`

use crate::error::Error;
use once_cell::sync::Lazy;
use std::{collections::HashMap, fmt::Debug};

/// The capability every DNS-01 challenge provider implements.
///
/// Providers must tolerate concurrent calls for different domains as
/// authorizations are solved in parallel.
#[async_trait::async_trait]
pub trait Dns01Provider: Debug + Send + Sync {
    /// Publish the challenge TXT record for the domain.
    ///
    /// Creation is not idempotent: presenting the same domain twice may leave
    /// duplicate records behind. [`cleanup`](Dns01Provider::cleanup) removes
    /// all of them.
    async fn present(
        &self,
        domain: &str,
        token: &str,
        key_authorization: &str,
    ) -> Result<(), Error>;

    /// Remove every challenge TXT record previously published for the domain.
    ///
    /// Zero matching records is a success, not an error.
    async fn cleanup(
        &self,
        domain: &str,
        token: &str,
        key_authorization: &str,
    ) -> Result<(), Error>;
}

type Constructor = fn() -> Result<Box<dyn Dns01Provider>, Error>;

static PROVIDERS: Lazy<HashMap<&'static str, Constructor>> = Lazy::new(|| {
    #[allow(unused_mut)]
    let mut providers: HashMap<&'static str, Constructor> = HashMap::new();

    #[cfg(feature = "cloudflare")]
    providers.insert("cloudflare", cloudflare);
    #[cfg(feature = "dnsimple")]
    providers.insert("dnsimple", dnsimple);

    providers
});

/// Build an authenticated provider for a backend identifier.
///
/// The identifier must exactly match a registered backend (case-sensitive);
/// anything else fails with [`Error::UnknownProvider`] naming the offending
/// identifier. Credentials are read from the backend's environment variables
/// and validated, but no DNS or challenge-record operations are performed.
pub fn create(name: &str) -> Result<Box<dyn Dns01Provider>, Error> {
    match PROVIDERS.get(name) {
        Some(constructor) => constructor(),
        None => Err(Error::UnknownProvider(name.to_owned())),
    }
}

#[cfg(feature = "cloudflare")]
fn cloudflare() -> Result<Box<dyn Dns01Provider>, Error> {
    Ok(Box::new(crate::providers::Cloudflare::from_env()?))
}

#[cfg(feature = "dnsimple")]
fn dnsimple() -> Result<Box<dyn Dns01Provider>, Error> {
    Ok(Box::new(crate::providers::Dnsimple::from_env()?))
}
