//! Zone apex discovery and record name derivation.
//!
//! A DNS-hosting account may manage a parent zone while challenge targets can
//! be arbitrarily deep subdomains, so the zone boundary is discovered at
//! runtime by walking the name label by label and asking the recursive
//! resolvers for a start of authority, rather than guessed from label counts.

use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use std::net::IpAddr;
use tracing::debug;
use trust_dns_resolver::{
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    error::ResolveError,
    AsyncResolver, IntoName, TokioAsyncResolver,
};

static RESOLVER: OnceCell<TokioAsyncResolver> = OnceCell::new();

/// Use the given recursive nameservers for zone discovery instead of the
/// system configuration.
///
/// May be called at most once, before the first [`find_zone_by_fqdn`] call.
/// The nameserver set is process-wide and immutable afterwards.
pub fn configure_nameservers(nameservers: &[IpAddr]) -> Result<()> {
    let group = NameServerConfigGroup::from_ips_clear(nameservers, 53, true);
    let config = ResolverConfig::from_parts(None, Vec::new(), group);
    let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default());

    RESOLVER
        .set(resolver)
        .map_err(|_| Error::Configuration("the recursive nameservers are already configured".into()))
}

/// Find the zone apex for a FQDN.
///
/// Starting from the full name, the leftmost label is repeatedly stripped and
/// the remaining suffix queried for a start of authority. The first
/// affirmative answer from any configured resolver wins; negative and
/// transient answers alike move the walk to the next shorter suffix. The
/// returned apex is dot-terminated.
pub async fn find_zone_by_fqdn(fqdn: &str) -> Result<String> {
    let resolver = RESOLVER.get_or_try_init(|| AsyncResolver::tokio_from_system_conf())?;

    let fqdn = to_fqdn(fqdn);
    let mut name = fqdn.as_str().into_name().map_err(ResolveError::from)?;
    let mut last_error = None;

    loop {
        match resolver.soa_lookup(name.clone()).await {
            Ok(lookup) => {
                if let Some(record) = lookup.as_lookup().records().first() {
                    let apex = record.name().to_utf8();
                    if is_dot_boundary_suffix(un_fqdn(&fqdn), un_fqdn(&apex)) {
                        debug!(%apex, "found zone apex");
                        return Ok(apex);
                    }

                    debug!(suffix = %name, %apex, "authority does not own the queried name");
                }
            }
            Err(source) => {
                debug!(suffix = %name, error = %source, "no start of authority");
                last_error = Some(source);
            }
        }

        if name.num_labels() > 1 {
            name = name.base_name();
        } else {
            return Err(Error::ZoneNotFound {
                domain: un_fqdn(&fqdn).to_owned(),
                source: last_error,
            });
        }
    }
}

/// Derive a record's name relative to a zone apex.
///
/// Returns the empty string when the record sits exactly at the apex. The
/// apex must be a dot-boundary suffix of the FQDN; a bare substring match
/// (e.g. `example.com` inside `notexample.com`) is rejected. That case is
/// unreachable as long as [`find_zone_by_fqdn`] upholds its contract.
pub fn extract_record_name(fqdn: &str, apex: &str) -> Result<String> {
    let name = un_fqdn(fqdn);
    let apex = un_fqdn(apex);

    if name == apex {
        return Ok(String::new());
    }

    match name
        .strip_suffix(apex)
        .and_then(|rest| rest.strip_suffix('.'))
    {
        Some(relative) if !relative.is_empty() => Ok(relative.to_owned()),
        _ => Err(Error::RecordName {
            fqdn: name.to_owned(),
            apex: apex.to_owned(),
        }),
    }
}

/// Append the trailing dot if the name does not already carry one.
pub(crate) fn to_fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_owned()
    } else {
        format!("{name}.")
    }
}

/// Strip the trailing dot, if any.
pub(crate) fn un_fqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

fn is_dot_boundary_suffix(name: &str, suffix: &str) -> bool {
    name == suffix
        || name
            .strip_suffix(suffix)
            .map_or(false, |rest| rest.ends_with('.'))
}


#[cfg(all(test, feature = "integration"))]
mod live_tests {
    use super::find_zone_by_fqdn;
    use crate::error::{Error, Result};

    #[tokio::test]
    async fn find_zone_by_fqdn_simple() -> Result<()> {
        let zone = find_zone_by_fqdn("gist.github.com").await?;
        assert_eq!(zone, "github.com.");

        Ok(())
    }

    #[tokio::test]
    async fn find_zone_by_fqdn_non_existent_subdomain() -> Result<()> {
        let zone = find_zone_by_fqdn("foo.google.com").await?;
        assert_eq!(zone, "google.com.");

        Ok(())
    }

    #[tokio::test]
    async fn find_zone_by_fqdn_etld() -> Result<()> {
        let zone = find_zone_by_fqdn("example.com.ac").await?;
        assert_eq!(zone, "ac.");

        Ok(())
    }

    #[tokio::test]
    async fn find_zone_by_fqdn_non_existent() {
        let error = find_zone_by_fqdn("test.lego.zz").await.unwrap_err();
        assert!(matches!(error, Error::ZoneNotFound { .. }));
    }
}
