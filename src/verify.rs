//! One-call mailbox verification: resolve the domain, then probe it.

use thiserror::Error;
use tracing::{debug, info};

use crate::mx::{self, MxLookup, ResolutionOutcome};
use crate::report::{ValidatorId, VerificationResult};
use crate::smtp_verify::{ProbeConfig, ProbeError, ProbeOutcome, Prober, SetupError, Transport};

/// Problems that prevent a verification from starting at all. DNS and SMTP
/// failures are not among them; they end up in the results.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("'{address}' is not an address of the form local@domain")]
    InvalidAddress { address: String },
    #[error("invalid domain in '{address}': {source}")]
    InvalidDomain {
        address: String,
        #[source]
        source: mx::Error,
    },
    #[error(transparent)]
    Resolver(mx::Error),
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Everything learned about one address.
#[derive(Debug)]
pub struct MailboxVerification {
    /// The probed address, domain in ASCII form.
    pub address: String,
    pub domain: String,
    pub resolution: Result<ResolutionOutcome, mx::Error>,
    /// `None` when the probe was disabled or there was nothing to probe.
    pub probe: Option<Result<ProbeOutcome, ProbeError>>,
    pub results: Vec<VerificationResult>,
}

impl MailboxVerification {
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|result| result.valid)
    }

    pub fn result(&self, validator: &ValidatorId) -> Option<&VerificationResult> {
        self.results
            .iter()
            .find(|result| &result.validator == validator)
    }
}

/// Verifies `address` with the system resolver and a TCP prober built from
/// `config`. The resolver reuses the probe timeout for its queries.
pub async fn check_mailaddress_exists(
    address: &str,
    config: &ProbeConfig,
) -> Result<MailboxVerification, VerifyError> {
    let resolver = mx::system_resolver(Some(config.timeout())).map_err(VerifyError::Resolver)?;
    let prober = Prober::new(config.clone())?;
    verify_with(&resolver, &prober, address).await
}

pub async fn verify_with<R, T>(
    resolver: &R,
    prober: &Prober<T>,
    address: &str,
) -> Result<MailboxVerification, VerifyError>
where
    R: MxLookup + ?Sized,
    T: Transport,
{
    let (local, domain) = split_address(address)?;
    let address = format!("{local}@{domain}");

    let resolution = mx::resolve_with(resolver, &domain).await;
    let mut results = vec![VerificationResult::mx(&resolution)];

    let probe = match &resolution {
        _ if !prober.config().enabled => {
            debug!(%address, "smtp probe disabled");
            results.push(VerificationResult::skipped(ValidatorId::Smtp));
            None
        }
        Ok(outcome) => {
            let probe = prober.probe(&address, outcome).await;
            results.push(VerificationResult::smtp(&probe));
            Some(probe)
        }
        Err(err) => {
            debug!(%address, error = %err, "no candidates, smtp probe not attempted");
            None
        }
    };

    let verification = MailboxVerification {
        address,
        domain,
        resolution,
        probe,
        results,
    };
    info!(
        address = %verification.address,
        valid = verification.is_valid(),
        "verification finished"
    );
    Ok(verification)
}

/// Splits at the last `@` and converts the domain to lower-case ASCII.
pub fn split_address(address: &str) -> Result<(String, String), VerifyError> {
    let invalid = || VerifyError::InvalidAddress {
        address: address.to_string(),
    };
    let (local, domain) = address.trim().rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.trim().is_empty() {
        return Err(invalid());
    }
    let domain = mx::normalize_domain(domain).map_err(|source| VerifyError::InvalidDomain {
        address: address.to_string(),
        source,
    })?;
    Ok((local.to_string(), domain))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::mx::tests::StubResolver;
    use crate::mx::{LookupError, MxRecord};
    use crate::report::ResultDetails;
    use crate::smtp_verify::tests::{EHLO_PLAIN, GREETING, OK, ScriptedTransport, dialogue};

    fn prober(
        transport: &Arc<ScriptedTransport>,
        config: ProbeConfig,
    ) -> Prober<Arc<ScriptedTransport>> {
        Prober::with_transport(config, Arc::clone(transport))
    }

    #[test]
    fn split_address_normalizes_domain() {
        let (local, domain) = split_address(" John.Doe@Bücher.Example ").unwrap();
        assert_eq!(local, "John.Doe");
        assert_eq!(domain, "xn--bcher-kva.example");
    }

    #[test]
    fn split_address_rejects_missing_parts() {
        for address in ["no-at-sign", "@example.com", "user@", "user@ "] {
            assert!(
                matches!(split_address(address), Err(VerifyError::InvalidAddress { .. })),
                "{address}"
            );
        }
    }

    #[tokio::test]
    async fn resolves_then_probes_first_exchanger() {
        let resolver = StubResolver::with_mx(vec![
            MxRecord::new(20, "mx2.example.com."),
            MxRecord::new(10, "mx1.example.com."),
        ]);
        let transport = ScriptedTransport::new(vec![dialogue(&[GREETING, EHLO_PLAIN, OK, OK])]);
        let config = ProbeConfig {
            retries: 0,
            ..ProbeConfig::default()
        };

        let verification = verify_with(&resolver, &prober(&transport, config), "user@Example.com")
            .await
            .unwrap();

        assert!(verification.is_valid());
        assert_eq!(verification.address, "user@example.com");
        assert_eq!(transport.connects()[0].0, "mx1.example.com");
        let smtp = verification.result(&ValidatorId::Smtp).expect("smtp result");
        assert!(matches!(
            &smtp.details,
            Some(ResultDetails::Smtp(details)) if details.mailbox_exists
        ));
        assert_eq!(verification.results.len(), 2);
    }

    #[tokio::test]
    async fn missing_exchanger_skips_smtp() {
        let resolver = StubResolver::new(
            |_| Err(LookupError::NoRecords),
            |_| Err(LookupError::NoRecords),
        );
        let transport = ScriptedTransport::new(Vec::new());

        let verification = verify_with(
            &resolver,
            &prober(&transport, ProbeConfig::default()),
            "user@example.invalid",
        )
        .await
        .unwrap();

        assert!(!verification.is_valid());
        assert!(verification.probe.is_none());
        let mx = verification.result(&ValidatorId::Mx).expect("mx result");
        assert_eq!(mx.error_kind(), Some(ErrorKind::MxNotFound));
        assert!(transport.connects().is_empty());
    }

    #[tokio::test]
    async fn disabled_probe_is_skipped_without_connecting() {
        let resolver = StubResolver::with_mx(vec![MxRecord::new(10, "mx1.example.com")]);
        let transport = ScriptedTransport::new(Vec::new());
        let config = ProbeConfig {
            enabled: false,
            ..ProbeConfig::default()
        };

        let verification = verify_with(&resolver, &prober(&transport, config), "user@example.com")
            .await
            .unwrap();

        let smtp = verification.result(&ValidatorId::Smtp).expect("smtp result");
        assert_eq!(smtp, &VerificationResult::skipped(ValidatorId::Smtp));
        assert!(verification.is_valid());
        assert!(transport.connects().is_empty());
    }
}
