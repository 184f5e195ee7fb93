use std::fmt;

/// A raw MX answer as returned by the lookup backend, before ordering.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }

    /// RFC 7505 "null MX": the exchange is the root name, the domain takes no mail.
    pub fn is_null(&self) -> bool {
        self.exchange.trim_end_matches('.').is_empty()
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Mx,
    AFallback,
}

/// One host the prober may connect to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCandidate {
    pub host: String,
    pub preference: u16,
    pub source: CandidateSource,
}

impl ExchangeCandidate {
    /// Preference given to address-record fallbacks (least preferred).
    pub const FALLBACK_PREFERENCE: u16 = u16::MAX;

    pub fn mx(host: impl Into<String>, preference: u16) -> Self {
        Self {
            host: host.into(),
            preference,
            source: CandidateSource::Mx,
        }
    }

    pub fn fallback(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            preference: Self::FALLBACK_PREFERENCE,
            source: CandidateSource::AFallback,
        }
    }
}

impl ExchangeCandidate {
    /// Name the server certificate is checked against. An address fallback
    /// has no host name of its own, so the mail domain stands in for it.
    pub fn tls_name<'a>(&'a self, domain: &'a str) -> &'a str {
        match self.source {
            CandidateSource::AFallback if !domain.is_empty() => domain,
            _ => &self.host,
        }
    }
}

impl fmt::Display for ExchangeCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            CandidateSource::Mx => write!(f, "{}:{}", self.preference, self.host),
            CandidateSource::AFallback => write!(f, "A:{}", self.host),
        }
    }
}

/// Ordered candidate list plus an advisory quality signal.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub candidates: Vec<ExchangeCandidate>,
    pub has_mx: bool,
    pub has_a: bool,
    /// 0..=20; never used to gate probing.
    pub quality_score: u8,
}

impl ResolutionOutcome {
    pub const MAX_QUALITY: u8 = 20;
    const BASE_SCORE: u8 = 5;
    const MX_BONUS: u8 = 10;
    const PER_EXCHANGER: u8 = 2;

    pub(crate) fn new(candidates: Vec<ExchangeCandidate>, has_mx: bool, has_a: bool) -> Self {
        let quality_score = Self::score(candidates.len(), has_mx);
        Self {
            candidates,
            has_mx,
            has_a,
            quality_score,
        }
    }

    fn score(distinct: usize, has_mx: bool) -> u8 {
        let redundancy = u8::try_from(distinct)
            .unwrap_or(u8::MAX)
            .saturating_mul(Self::PER_EXCHANGER);
        let mx = if has_mx { Self::MX_BONUS } else { 0 };
        Self::BASE_SCORE
            .saturating_add(mx)
            .saturating_add(redundancy)
            .min(Self::MAX_QUALITY)
    }
}
