use std::collections::HashSet;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use tracing::{debug, warn};
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::proto::rr::rdata::MX;

use super::{Error, ExchangeCandidate, LookupError, MxRecord, ResolutionOutcome};

/// Resolve `domain` with the system resolver and return the ordered candidates.
///
/// The domain is normalized via IDNA before querying DNS. MX records are tried
/// first; address records are used only when the domain publishes no MX.
pub async fn check_mx(domain: &str) -> Result<ResolutionOutcome, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = system_resolver(None)?;
    resolve_with(&resolver, &ascii).await
}

/// Build a tokio resolver from the system configuration. `timeout` overrides
/// the per-query timeout when given.
pub fn system_resolver(timeout: Option<Duration>) -> Result<TokioAsyncResolver, Error> {
    let (config, mut opts) =
        trust_dns_resolver::system_conf::read_system_conf().map_err(Error::resolver_init)?;
    if let Some(timeout) = timeout {
        opts.timeout = timeout;
    }
    Ok(TokioAsyncResolver::tokio(config, opts))
}

pub async fn resolve_with<R>(resolver: &R, domain: &str) -> Result<ResolutionOutcome, Error>
where
    R: MxLookup + ?Sized,
{
    let records = match resolver.lookup_mx(domain).await {
        Ok(records) => records,
        Err(err) if err.is_not_found() => Vec::new(),
        Err(err) => {
            warn!(domain, error = %err, "MX lookup failed");
            return Err(Error::network(domain, err));
        }
    };

    if !records.is_empty() {
        let candidates = order_candidates(records);
        if candidates.is_empty() {
            debug!(domain, "domain publishes a null MX");
            return Err(Error::not_found(domain));
        }
        debug!(domain, count = candidates.len(), "resolved MX candidates");
        return Ok(ResolutionOutcome::new(candidates, true, false));
    }

    let addrs = match resolver.lookup_addrs(domain).await {
        Ok(addrs) => addrs,
        Err(err) if err.is_not_found() => Vec::new(),
        Err(err) => {
            warn!(domain, error = %err, "address lookup failed");
            return Err(Error::network(domain, err));
        }
    };
    if addrs.is_empty() {
        debug!(domain, "no MX and no address records");
        return Err(Error::not_found(domain));
    }

    let mut seen = HashSet::new();
    let candidates: Vec<_> = addrs
        .into_iter()
        .filter(|addr| seen.insert(*addr))
        .map(|addr| ExchangeCandidate::fallback(addr.to_string()))
        .collect();
    debug!(domain, count = candidates.len(), "falling back to address records");
    Ok(ResolutionOutcome::new(candidates, false, true))
}

/// Stable ascending sort by preference; null exchanges dropped, duplicates
/// collapsed onto their most preferred occurrence.
pub(crate) fn order_candidates(records: Vec<MxRecord>) -> Vec<ExchangeCandidate> {
    let mut records: Vec<_> = records
        .into_iter()
        .filter(|record| !record.is_null())
        .map(|record| MxRecord::new(record.preference, normalize_exchange(&record.exchange)))
        .collect();
    records.sort_by_key(|record| record.preference);

    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.exchange.clone()))
        .map(|record| ExchangeCandidate::mx(record.exchange, record.preference))
        .collect()
}

pub fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

/// Exchanges stay in A-label form so they can go straight to the socket and
/// the TLS server name.
pub(crate) fn mx_record(mx: &MX) -> MxRecord {
    MxRecord::new(mx.preference(), mx.exchange().to_ascii())
}

/// DNS backend used by [`resolve_with`].
pub trait MxLookup {
    fn lookup_mx(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<Vec<MxRecord>, LookupError>> + Send;

    fn lookup_addrs(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<Vec<IpAddr>, LookupError>> + Send;
}

impl MxLookup for TokioAsyncResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, LookupError> {
        let lookup = self.mx_lookup(domain).await?;
        Ok(lookup.iter().map(mx_record).collect())
    }

    async fn lookup_addrs(&self, domain: &str) -> Result<Vec<IpAddr>, LookupError> {
        let lookup = self.lookup_ip(domain).await?;
        Ok(lookup.iter().collect())
    }
}

#[cfg(test)]
impl MxLookup for crate::mx::tests::StubResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, LookupError> {
        (self.on_mx)(domain)
    }

    async fn lookup_addrs(&self, domain: &str) -> Result<Vec<IpAddr>, LookupError> {
        (self.on_addrs)(domain)
    }
}
