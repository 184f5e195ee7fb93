use std::net::{IpAddr, Ipv4Addr};

use proptest::prelude::*;

use super::{
    CandidateSource, ExchangeCandidate, LookupError, MxRecord, ResolutionOutcome, resolve_with,
    resolver,
};

type MxResult = Result<Vec<MxRecord>, LookupError>;
type AddrResult = Result<Vec<IpAddr>, LookupError>;

pub(crate) struct StubResolver {
    pub on_mx: Box<dyn Fn(&str) -> MxResult + Send + Sync>,
    pub on_addrs: Box<dyn Fn(&str) -> AddrResult + Send + Sync>,
}

impl StubResolver {
    pub(crate) fn new<M, A>(on_mx: M, on_addrs: A) -> Self
    where
        M: Fn(&str) -> MxResult + Send + Sync + 'static,
        A: Fn(&str) -> AddrResult + Send + Sync + 'static,
    {
        Self {
            on_mx: Box::new(on_mx),
            on_addrs: Box::new(on_addrs),
        }
    }

    pub(crate) fn with_mx(records: Vec<MxRecord>) -> Self {
        Self::new(
            move |_| Ok(records.clone()),
            |_| panic!("address lookup must not run when MX records exist"),
        )
    }
}

fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(a, b, c, d))
}

#[test]
fn normalize_domain_rejects_empty() {
    let err = resolver::normalize_domain("  ").expect_err("empty domain should fail");
    assert!(matches!(err, super::Error::EmptyDomain));
}

#[test]
fn normalize_domain_converts_idn() {
    let ascii = resolver::normalize_domain("bücher.example.").expect("idn converts");
    assert_eq!(ascii, "xn--bcher-kva.example");
}

#[test]
fn tls_name_uses_domain_only_for_address_fallbacks() {
    let mx = ExchangeCandidate::mx("mx1.example.com", 10);
    let fallback = ExchangeCandidate::fallback("192.0.2.1");
    assert_eq!(mx.tls_name("example.com"), "mx1.example.com");
    assert_eq!(fallback.tls_name("example.com"), "example.com");
    assert_eq!(fallback.tls_name(""), "192.0.2.1");
}

#[test]
fn idn_exchange_is_kept_in_ascii_form() {
    use trust_dns_resolver::Name;
    use trust_dns_resolver::proto::rr::rdata::MX;

    let exchange = Name::from_utf8("mail.bücher.example.").expect("valid name");
    let record = resolver::mx_record(&MX::new(10, exchange));
    assert_eq!(record.preference, 10);
    assert_eq!(
        resolver::normalize_exchange(&record.exchange),
        "mail.xn--bcher-kva.example"
    );
}

#[test]
fn normalize_exchange_trims_dot_and_lowercases() {
    assert_eq!(
        resolver::normalize_exchange("Mail.EXAMPLE.com."),
        "mail.example.com"
    );
}

#[tokio::test]
async fn mx_records_sorted_and_deduplicated() {
    let stub = StubResolver::with_mx(vec![
        MxRecord::new(20, "mx2.example.com."),
        MxRecord::new(10, "MX1.example.com."),
        MxRecord::new(30, "mx1.example.com."),
        MxRecord::new(10, "mx3.example.com."),
    ]);

    let outcome = resolve_with(&stub, "example.com")
        .await
        .expect("lookup succeeds");
    let hosts: Vec<_> = outcome.candidates.iter().map(|c| c.host.as_str()).collect();
    assert_eq!(
        hosts,
        ["mx1.example.com", "mx3.example.com", "mx2.example.com"]
    );
    assert!(outcome.has_mx);
    assert!(!outcome.has_a);
    assert!(
        outcome
            .candidates
            .iter()
            .all(|c| c.source == CandidateSource::Mx)
    );
    assert_eq!(outcome.quality_score, ResolutionOutcome::MAX_QUALITY);
}

#[tokio::test]
async fn falls_back_to_address_records_without_mx() {
    let stub = StubResolver::new(
        |_| Err(LookupError::NoRecords),
        |domain| {
            assert_eq!(domain, "example.org");
            Ok(vec![v4(192, 0, 2, 1), v4(192, 0, 2, 2)])
        },
    );

    let outcome = resolve_with(&stub, "example.org")
        .await
        .expect("fallback succeeds");
    assert!(!outcome.has_mx);
    assert!(outcome.has_a);
    assert_eq!(
        outcome.candidates,
        vec![
            ExchangeCandidate::fallback("192.0.2.1"),
            ExchangeCandidate::fallback("192.0.2.2"),
        ]
    );
    assert_eq!(outcome.quality_score, 9);
}

#[tokio::test]
async fn empty_mx_answer_also_falls_back() {
    let stub = StubResolver::new(|_| Ok(Vec::new()), |_| Ok(vec![v4(198, 51, 100, 7)]));
    let outcome = resolve_with(&stub, "example.net").await.expect("fallback");
    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(
        outcome.candidates[0].preference,
        ExchangeCandidate::FALLBACK_PREFERENCE
    );
}

#[tokio::test]
async fn no_records_at_all_is_mx_not_found() {
    let stub = StubResolver::new(|_| Err(LookupError::NoRecords), |_| Ok(Vec::new()));
    let err = resolve_with(&stub, "nomail.example")
        .await
        .expect_err("nothing to resolve");
    assert!(matches!(err, super::Error::MxNotFound { .. }));
    assert_eq!(err.kind(), crate::ErrorKind::MxNotFound);
}

#[tokio::test]
async fn null_mx_does_not_fall_back() {
    let stub = StubResolver::with_mx(vec![MxRecord::new(0, ".")]);
    let err = resolve_with(&stub, "example.com")
        .await
        .expect_err("null MX refuses mail");
    assert!(matches!(err, super::Error::MxNotFound { .. }));
}

#[tokio::test]
async fn transport_failure_is_network_error() {
    let stub = StubResolver::new(
        |_| Err(LookupError::Timeout),
        |_| panic!("no fallback after a failed MX query"),
    );
    let err = resolve_with(&stub, "example.com")
        .await
        .expect_err("timeout");
    assert!(matches!(err, super::Error::Network { .. }));
    assert_eq!(err.kind(), crate::ErrorKind::NetworkError);
}

#[tokio::test]
async fn fallback_lookup_failure_is_network_error() {
    let stub = StubResolver::new(|_| Ok(Vec::new()), |_| Err(LookupError::Timeout));
    let err = resolve_with(&stub, "example.com")
        .await
        .expect_err("timeout");
    assert_eq!(err.kind(), crate::ErrorKind::NetworkError);
}

#[test]
fn quality_score_rewards_mx_and_redundancy() {
    let single_a = ResolutionOutcome::new(vec![ExchangeCandidate::fallback("192.0.2.1")], false, true);
    let single_mx = ResolutionOutcome::new(vec![ExchangeCandidate::mx("mx.example", 10)], true, false);
    let double_mx = ResolutionOutcome::new(
        vec![
            ExchangeCandidate::mx("mx1.example", 10),
            ExchangeCandidate::mx("mx2.example", 20),
        ],
        true,
        false,
    );
    assert!(single_a.quality_score < single_mx.quality_score);
    assert!(single_mx.quality_score < double_mx.quality_score);
    assert!(double_mx.quality_score <= ResolutionOutcome::MAX_QUALITY);
}

proptest! {
    #[test]
    fn candidate_order_is_stable_and_non_decreasing(prefs in prop::collection::vec(0u16..8, 1..24)) {
        let records: Vec<_> = prefs
            .iter()
            .enumerate()
            .map(|(idx, pref)| MxRecord::new(*pref, format!("mx{idx}.example.com")))
            .collect();

        let ordered = resolver::order_candidates(records);
        prop_assert_eq!(ordered.len(), prefs.len());
        for pair in ordered.windows(2) {
            prop_assert!(pair[0].preference <= pair[1].preference);
            if pair[0].preference == pair[1].preference {
                let index = |c: &ExchangeCandidate| {
                    c.host
                        .trim_start_matches("mx")
                        .trim_end_matches(".example.com")
                        .parse::<usize>()
                        .unwrap()
                };
                prop_assert!(index(&pair[0]) < index(&pair[1]));
            }
        }
    }
}
