//! Mail-exchanger resolution.
//!
//! The public entry point is [`check_mx`], which resolves a domain with the
//! system resolver and returns the ordered [`ExchangeCandidate`] list the SMTP
//! prober walks. [`resolve_with`] does the same against any [`MxLookup`].

mod error;
mod resolver;
mod types;

pub use error::{LookupError, MxError as Error};
pub use resolver::{MxLookup, check_mx, normalize_domain, resolve_with, system_resolver};
pub use types::{CandidateSource, ExchangeCandidate, MxRecord, ResolutionOutcome};

#[cfg(test)]
pub(crate) mod tests;
