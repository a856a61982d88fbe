//! Publish and remove [DNS-01](https://letsencrypt.org/docs/challenge-types/#dns-01-challenge)
//! challenge records across interchangeable DNS-hosting backends.
//!
//! Given a domain and its key authorization, the crate discovers which zone
//! actually governs the name by walking it label by label against the
//! configured recursive resolvers, derives the record name relative to the
//! discovered apex, and reconciles the `_acme-challenge` TXT record through
//! a vendor [`DnsBackend`].
//!
//! Backends are selected by identifier through the registry:
//!
//! ```no_run
//! # async fn demo() -> Result<(), dns01::Error> {
//! let provider = dns01::create("cloudflare")?;
//! provider.present("www.example.com", "token", "key-authorization").await?;
//! // ... wait for the authorization to validate ...
//! provider.cleanup("www.example.com", "token", "key-authorization").await?;
//! # Ok(())
//! # }
//! ```
//!
//! Any other DNS host can be plugged in by implementing [`DnsBackend`]
//! against its API and wrapping it in a [`Reconciler`].

#![cfg_attr(docsrs, feature(doc_cfg))]

mod backend;
mod challenge;
mod error;
mod provider;
pub mod providers;
mod zone;

pub use backend::{DnsBackend, ExistingRecord, Reconciler, TxtRecord, Zone};
pub use challenge::{ChallengeRecord, DEFAULT_TTL};
pub use error::{BoxError, Error};
pub use provider::{create, Dns01Provider};
pub use zone::{configure_nameservers, extract_record_name, find_zone_by_fqdn};
