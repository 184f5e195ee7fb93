use thiserror::Error;

use crate::error::ErrorKind;

/// Errors raised while turning a domain into candidate mail hosts.
#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("no mail exchanger found for {domain}")]
    MxNotFound { domain: String },
    #[error("DNS lookup failed for {domain}: {source}")]
    Network {
        domain: String,
        #[source]
        source: LookupError,
    },
}

impl MxError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    pub(crate) fn not_found(domain: &str) -> Self {
        Self::MxNotFound {
            domain: domain.to_string(),
        }
    }

    pub(crate) fn network(domain: &str, source: LookupError) -> Self {
        Self::Network {
            domain: domain.to_string(),
            source,
        }
    }

    /// Maps onto the crate-wide taxonomy. Input and setup problems count as
    /// network errors: the question "does this domain take mail" was never asked.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MxNotFound { .. } => ErrorKind::MxNotFound,
            _ => ErrorKind::NetworkError,
        }
    }
}

/// Failure reported by an [`MxLookup`](super::MxLookup) backend.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Authoritative "no such record / no such domain".
    #[error("no records found")]
    NoRecords,
    #[error("lookup timed out")]
    Timeout,
    #[error(transparent)]
    Resolve(trust_dns_resolver::error::ResolveError),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoRecords)
    }
}

impl From<trust_dns_resolver::error::ResolveError> for LookupError {
    fn from(err: trust_dns_resolver::error::ResolveError) -> Self {
        use trust_dns_resolver::error::ResolveErrorKind;
        match err.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => Self::NoRecords,
            ResolveErrorKind::Timeout => Self::Timeout,
            _ => Self::Resolve(err),
        }
    }
}
