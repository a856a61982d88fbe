//! Vendor backend adapters.
//!
//! Each adapter translates the four [`DnsBackend`](crate::DnsBackend)
//! operations into one vendor's native API and reads its credentials from
//! named environment variables. Adapters hold no challenge logic; the
//! [`Reconciler`](crate::Reconciler) they are wrapped in does the zone
//! discovery and record reconciliation.
//!
//! If you would like another backend supported, implement
//! [`DnsBackend`](crate::DnsBackend) against its API and wrap it in a
//! [`Reconciler`](crate::Reconciler).

#[cfg(any(feature = "cloudflare", feature = "dnsimple"))]
use crate::error::Error;
#[cfg(any(feature = "cloudflare", feature = "dnsimple"))]
use std::time::Duration;

#[cfg(feature = "cloudflare")]
mod cloudflare;
#[cfg(feature = "dnsimple")]
mod dnsimple;

#[cfg(feature = "cloudflare")]
#[cfg_attr(docsrs, doc(cfg(feature = "cloudflare")))]
pub use cloudflare::{Cloudflare, CloudflareBackend};
#[cfg(feature = "dnsimple")]
#[cfg_attr(docsrs, doc(cfg(feature = "dnsimple")))]
pub use dnsimple::{Dnsimple, DnsimpleBackend};

#[cfg(any(feature = "cloudflare", feature = "dnsimple"))]
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[cfg(any(feature = "cloudflare", feature = "dnsimple"))]
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[cfg(any(feature = "cloudflare", feature = "dnsimple"))]
pub(crate) fn http_client() -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::Configuration(format!("failed to build the HTTP client: {e}")))
}

/// Read a mandatory environment variable, failing with the variable's name.
#[cfg(any(feature = "cloudflare", feature = "dnsimple"))]
pub(crate) fn required_env(name: &'static str) -> Result<String, Error> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Configuration(format!("{name} is not set"))),
    }
}

#[cfg(any(feature = "cloudflare", feature = "dnsimple"))]
pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
