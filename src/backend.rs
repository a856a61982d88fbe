//! The backend adapter interface and the record reconciler.

use crate::{
    challenge::ChallengeRecord,
    error::{BoxError, Error},
    provider::Dns01Provider,
    zone::{extract_record_name, find_zone_by_fqdn, un_fqdn},
};
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use tracing::debug;

/// A zone in a backend's inventory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Zone {
    /// Apex without the trailing dot
    pub name: String,
    /// Backend-specific handle
    pub id: String,
}

/// A TXT record to be created, named relative to the zone apex.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxtRecord {
    /// Name relative to the apex; empty for a record at the zone root
    pub name: String,
    pub content: String,
    pub ttl: u32,
}

/// A TXT record reported by a backend's record listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExistingRecord {
    /// Backend-assigned identifier used for deletion
    pub id: String,
    pub name: String,
    pub content: String,
}

/// The four operations a vendor adapter translates into its native API.
///
/// Adapters surface failures as opaque errors; the [`Reconciler`] wraps them
/// with the failing operation and target. Record listings are implicitly
/// filtered to TXT records, the only type this crate reconciles.
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// List the zones in this account matching the name filter.
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>, BoxError>;

    /// List the TXT records in a zone with the given apex-relative name.
    async fn list_records(&self, zone: &Zone, name: &str) -> Result<Vec<ExistingRecord>, BoxError>;

    /// Create a TXT record in the zone.
    async fn create_record(&self, zone: &Zone, record: &TxtRecord) -> Result<(), BoxError>;

    /// Delete a record from the zone by its backend-assigned identifier.
    async fn delete_record(&self, zone: &Zone, record_id: &str) -> Result<(), BoxError>;
}

#[async_trait]
trait ZoneFinder: Send + Sync {
    async fn find_zone(&self, fqdn: &str) -> Result<String, Error>;
}

/// Live SOA-walking discovery against the configured recursive nameservers.
struct SoaWalk;

#[async_trait]
impl ZoneFinder for SoaWalk {
    async fn find_zone(&self, fqdn: &str) -> Result<String, Error> {
        find_zone_by_fqdn(fqdn).await
    }
}

/// Drives present and cleanup for one authenticated backend.
///
/// Each operation resolves the governing zone afresh, derives the record name
/// relative to the discovered apex, and issues the matching backend calls.
/// Nothing is retried at this layer; callers retry whole invocations.
pub struct Reconciler<B> {
    backend: B,
    finder: Box<dyn ZoneFinder>,
}

impl<B: DnsBackend> Reconciler<B> {
    /// Wrap a backend with live DNS zone discovery.
    pub fn new(backend: B) -> Self {
        Reconciler {
            backend,
            finder: Box::new(SoaWalk),
        }
    }

    #[cfg(test)]
    fn with_finder(backend: B, finder: Box<dyn ZoneFinder>) -> Self {
        Reconciler { backend, finder }
    }

    /// Access the wrapped backend adapter.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Find the zone governing the FQDN and confirm this account manages it.
    ///
    /// The DNS-discovered apex must appear in the backend's own inventory
    /// with an exactly equal name. A DNS-visible apex missing from the
    /// inventory means the domain is hosted elsewhere, which is reported
    /// separately from a zone that is not discoverable at all.
    async fn hosted_zone(&self, domain: &str, fqdn: &str) -> Result<Zone, Error> {
        let apex = self.finder.find_zone(fqdn).await?;
        let apex = un_fqdn(&apex);

        let zones = self
            .backend
            .list_zones(apex)
            .await
            .map_err(|e| Error::backend("zone list", apex, e))?;

        zones
            .into_iter()
            .find(|zone| zone.name == apex)
            .ok_or_else(|| Error::ZoneNotManaged {
                apex: apex.to_owned(),
                domain: domain.to_owned(),
            })
    }
}

impl<B> Debug for Reconciler<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // `DnsBackend` doesn't require Debug, so only name the backend type
        f.debug_struct("Reconciler")
            .field("backend", &std::any::type_name::<B>())
            .finish()
    }
}

#[async_trait]
impl<B: DnsBackend> Dns01Provider for Reconciler<B> {
    async fn present(
        &self,
        domain: &str,
        _token: &str,
        key_authorization: &str,
    ) -> Result<(), Error> {
        let record = ChallengeRecord::new(domain, key_authorization);
        let zone = self.hosted_zone(domain, &record.fqdn).await?;
        let name = extract_record_name(&record.fqdn, &zone.name)?;

        debug!(zone = %zone.name, %name, "creating challenge record");
        let txt = TxtRecord {
            name,
            content: record.value,
            ttl: record.ttl,
        };
        self.backend
            .create_record(&zone, &txt)
            .await
            .map_err(|e| Error::backend("record create", &zone.name, e))
    }

    async fn cleanup(
        &self,
        domain: &str,
        _token: &str,
        key_authorization: &str,
    ) -> Result<(), Error> {
        let record = ChallengeRecord::new(domain, key_authorization);
        let zone = self.hosted_zone(domain, &record.fqdn).await?;
        let name = extract_record_name(&record.fqdn, &zone.name)?;

        let records = self
            .backend
            .list_records(&zone, &name)
            .await
            .map_err(|e| Error::backend("record list", &zone.name, e))?;

        // The first failed deletion aborts the loop; records after the
        // failure point stay behind for the caller's next attempt.
        for existing in records {
            debug!(zone = %zone.name, id = %existing.id, "deleting challenge record");
            self.backend
                .delete_record(&zone, &existing.id)
                .await
                .map_err(|e| Error::backend("record delete", &zone.name, e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DnsBackend, ExistingRecord, Reconciler, TxtRecord, Zone, ZoneFinder};
    use crate::{
        challenge::ChallengeRecord,
        error::{BoxError, Error},
        Dns01Provider,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::{sync::Arc, time::Duration};

    const TOKEN: &str = "testing-token";
    const KEY_AUTHZ: &str = "testing-token.fTj8VizIhdrSuBFhcN-pLmeTBa1-v6YtxJTWKaOASHs";

    struct FixedZone(&'static str);

    #[async_trait]
    impl ZoneFinder for FixedZone {
        async fn find_zone(&self, _fqdn: &str) -> Result<String, Error> {
            Ok(self.0.to_owned())
        }
    }

    #[derive(Default)]
    struct FakeState {
        records: Vec<(String, ExistingRecord)>,
        next_id: u64,
    }

    #[derive(Clone, Default)]
    struct FakeBackend {
        zones: Vec<Zone>,
        state: Arc<Mutex<FakeState>>,
        latency: Duration,
        failing_record: Option<&'static str>,
    }

    impl FakeBackend {
        fn with_zones(names: &[&str]) -> Self {
            FakeBackend {
                zones: names
                    .iter()
                    .map(|name| Zone {
                        name: (*name).to_owned(),
                        id: format!("zone-{name}"),
                    })
                    .collect(),
                ..FakeBackend::default()
            }
        }

        fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        fn fail_deleting(mut self, record_id: &'static str) -> Self {
            self.failing_record = Some(record_id);
            self
        }

        fn records_named(&self, zone_id: &str, name: &str) -> Vec<ExistingRecord> {
            let state = self.state.lock();
            state
                .records
                .iter()
                .filter(|(zone, record)| zone == zone_id && record.name == name)
                .map(|(_, record)| record.clone())
                .collect()
        }
    }

    #[async_trait]
    impl DnsBackend for FakeBackend {
        async fn list_zones(&self, name: &str) -> Result<Vec<Zone>, BoxError> {
            tokio::time::sleep(self.latency).await;
            Ok(self
                .zones
                .iter()
                .filter(|zone| name.contains(zone.name.as_str()) || zone.name.contains(name))
                .cloned()
                .collect())
        }

        async fn list_records(
            &self,
            zone: &Zone,
            name: &str,
        ) -> Result<Vec<ExistingRecord>, BoxError> {
            tokio::time::sleep(self.latency).await;
            Ok(self.records_named(&zone.id, name))
        }

        async fn create_record(&self, zone: &Zone, record: &TxtRecord) -> Result<(), BoxError> {
            tokio::time::sleep(self.latency).await;
            let mut state = self.state.lock();
            state.next_id += 1;
            let id = format!("record-{}", state.next_id);
            state.records.push((
                zone.id.clone(),
                ExistingRecord {
                    id,
                    name: record.name.clone(),
                    content: record.content.clone(),
                },
            ));
            Ok(())
        }

        async fn delete_record(&self, zone: &Zone, record_id: &str) -> Result<(), BoxError> {
            tokio::time::sleep(self.latency).await;
            if self.failing_record == Some(record_id) {
                return Err("injected delete failure".into());
            }

            let mut state = self.state.lock();
            state
                .records
                .retain(|(zone_id, record)| zone_id != &zone.id || record.id != record_id);
            Ok(())
        }
    }

    fn reconciler(backend: FakeBackend) -> Reconciler<FakeBackend> {
        Reconciler::with_finder(backend, Box::new(FixedZone("example.com.")))
    }

    #[test]
    fn reconcilers_are_debuggable() {
        // The capability trait requires Debug, and test assertions rely on it
        let provider: Box<dyn Dns01Provider> =
            Box::new(reconciler(FakeBackend::with_zones(&["example.com"])));
        assert!(format!("{provider:?}").contains("Reconciler"));
    }

    #[test_log::test(tokio::test)]
    async fn present_then_cleanup_leaves_no_records() {
        let backend = FakeBackend::with_zones(&["example.com"]);
        let provider = reconciler(backend.clone());

        provider
            .present("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();

        let records = backend.records_named("zone-example.com", "_acme-challenge.foo");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].content,
            ChallengeRecord::new("foo.example.com", KEY_AUTHZ).value
        );

        provider
            .cleanup("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();
        assert!(backend
            .records_named("zone-example.com", "_acme-challenge.foo")
            .is_empty());

        // A second cleanup finds nothing and still succeeds
        provider
            .cleanup("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn cleanup_removes_duplicate_records() {
        let backend = FakeBackend::with_zones(&["example.com"]);
        let provider = reconciler(backend.clone());

        provider
            .present("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();
        provider
            .present("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();
        assert_eq!(
            backend
                .records_named("zone-example.com", "_acme-challenge.foo")
                .len(),
            2
        );

        provider
            .cleanup("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();
        assert!(backend
            .records_named("zone-example.com", "_acme-challenge.foo")
            .is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn cleanup_without_records_succeeds() {
        let provider = reconciler(FakeBackend::with_zones(&["example.com"]));

        provider
            .cleanup("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn deep_subdomains_keep_their_labels() {
        let backend = FakeBackend::with_zones(&["example.com"]);
        let provider = reconciler(backend.clone());

        provider
            .present("deep.sub.foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();

        assert_eq!(
            backend
                .records_named("zone-example.com", "_acme-challenge.deep.sub.foo")
                .len(),
            1
        );
    }

    #[test_log::test(tokio::test)]
    async fn unmanaged_zones_are_rejected() {
        let provider = reconciler(FakeBackend::with_zones(&["other.org"]));

        let error = provider
            .present("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::ZoneNotManaged { .. }));
    }

    #[test_log::test(tokio::test)]
    async fn concurrent_presents_do_not_interfere() {
        let backend =
            FakeBackend::with_zones(&["example.com"]).with_latency(Duration::from_millis(25));
        let provider = reconciler(backend.clone());

        let (alpha, beta) = tokio::join!(
            provider.present("alpha.example.com", TOKEN, KEY_AUTHZ),
            provider.present("beta.example.com", TOKEN, KEY_AUTHZ),
        );
        alpha.unwrap();
        beta.unwrap();

        assert_eq!(
            backend
                .records_named("zone-example.com", "_acme-challenge.alpha")
                .len(),
            1
        );
        assert_eq!(
            backend
                .records_named("zone-example.com", "_acme-challenge.beta")
                .len(),
            1
        );
    }

    #[test_log::test(tokio::test)]
    async fn failed_deletion_aborts_cleanup() {
        let backend = FakeBackend::with_zones(&["example.com"]).fail_deleting("record-1");
        let provider = reconciler(backend.clone());

        provider
            .present("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();
        provider
            .present("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap();

        let error = provider
            .cleanup("foo.example.com", TOKEN, KEY_AUTHZ)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Backend { .. }));

        // Nothing past the failure point was deleted
        assert_eq!(
            backend
                .records_named("zone-example.com", "_acme-challenge.foo")
                .len(),
            2
        );
    }
}
