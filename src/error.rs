use std::{
    error::Error as StdError,
    fmt::{Display, Formatter},
};
use trust_dns_resolver::error::ResolveError;

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// An opaque error surfaced by a [`DnsBackend`](crate::DnsBackend) operation.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug)]
pub enum Error {
    /// The requested provider identifier is not registered
    UnknownProvider(String),
    /// A mandatory credential or setting is missing or malformed
    Configuration(String),
    /// No authoritative zone could be discovered for the domain
    ZoneNotFound {
        domain: String,
        source: Option<ResolveError>,
    },
    /// The DNS-discovered apex is absent from the backend's zone inventory
    ZoneNotManaged { apex: String, domain: String },
    /// A backend API call failed
    Backend {
        operation: &'static str,
        target: String,
        source: BoxError,
    },
    /// The record name does not sit under the apex on a dot boundary
    RecordName { fqdn: String, apex: String },
    /// The recursive resolver could not be built or the name could not be parsed
    Resolver(ResolveError),
}

impl Error {
    /// Wrap a backend failure with the failing operation and its target,
    /// letting an already-classified [`Error`] pass through unchanged.
    pub(crate) fn backend(operation: &'static str, target: &str, source: BoxError) -> Self {
        match source.downcast::<Error>() {
            Ok(error) => *error,
            Err(source) => Self::Backend {
                operation,
                target: target.to_owned(),
                source,
            },
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProvider(name) => write!(f, "unrecognized DNS provider: {name}"),
            Self::Configuration(reason) => write!(f, "invalid provider configuration: {reason}"),
            Self::ZoneNotFound { domain, .. } => {
                write!(f, "could not find the start of authority for {domain}")
            }
            Self::ZoneNotManaged { apex, domain } => {
                write!(f, "zone {apex} for {domain} is not managed by this account")
            }
            Self::Backend {
                operation,
                target,
                source,
            } => write!(f, "{operation} failed for {target}: {source}"),
            Self::RecordName { fqdn, apex } => {
                write!(f, "{apex} is not a parent zone of {fqdn}")
            }
            Self::Resolver(_) => write!(f, "failed to set up the recursive resolver"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::UnknownProvider(_) => None,
            Self::Configuration(_) => None,
            Self::ZoneNotFound { source, .. } => {
                source.as_ref().map(|e| e as &(dyn StdError + 'static))
            }
            Self::ZoneNotManaged { .. } => None,
            Self::Backend { source, .. } => Some(source.as_ref()),
            Self::RecordName { .. } => None,
            Self::Resolver(e) => Some(e),
        }
    }
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        Self::Resolver(err)
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn unknown_provider_names_the_identifier() {
        let error = Error::UnknownProvider("bogus-provider".into());
        assert!(error.to_string().contains("bogus-provider"));
    }

    #[test]
    fn backend_wrap_preserves_classified_errors() {
        let inner = Error::Configuration("user tokens are not supported".into());
        let wrapped = Error::backend("zone list", "example.com", Box::new(inner));
        assert!(matches!(wrapped, Error::Configuration(_)));
    }

    #[test]
    fn backend_wrap_adds_operation_context() {
        let source: super::BoxError = "500 internal server error".into();
        let wrapped = Error::backend("record create", "example.com", source);
        assert!(matches!(wrapped, Error::Backend { .. }));
        assert!(wrapped.to_string().contains("record create"));
        assert!(wrapped.to_string().contains("example.com"));
        // The vendor failure is part of the message, not just the source chain
        assert!(wrapped.to_string().contains("500 internal server error"));
    }
}
