use crate::zone::to_fqdn;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use openssl::sha::sha256;

/// How long published challenge records should live, in seconds.
pub const DEFAULT_TTL: u32 = 120;

/// The TXT record proving control over a domain for a DNS-01 challenge.
///
/// Recomputed fresh on every present/cleanup call and never persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChallengeRecord {
    /// Always `_acme-challenge.<domain>`, dot-terminated
    pub fqdn: String,
    /// URL-safe unpadded base64 of the SHA-256 digest of the key authorization
    pub value: String,
    /// Record time-to-live in seconds
    pub ttl: u32,
}

impl ChallengeRecord {
    /// Compute the challenge record for a domain from its key authorization.
    pub fn new(domain: &str, key_authorization: &str) -> Self {
        let digest = sha256(key_authorization.as_bytes());

        ChallengeRecord {
            fqdn: to_fqdn(&format!("_acme-challenge.{domain}")),
            value: URL_SAFE_NO_PAD.encode(digest),
            ttl: DEFAULT_TTL,
        }
    }
}
