#![forbid(unsafe_code)]
//! mailreach_lib: mailbox reachability checks without sending mail.
//!
//! [`mx`] turns a domain into an ordered list of mail exchangers,
//! [`smtp_verify`] asks those exchangers whether they would accept a
//! recipient, and [`check_mailaddress_exists`] runs both for one address and
//! reports [`VerificationResult`] records.

pub mod error;
pub mod mx;
pub mod report;
pub mod smtp_verify;
pub mod verify;

pub use error::{ErrorKind, Severity};
pub use mx::{Error as MxError, ExchangeCandidate, ResolutionOutcome, check_mx};
pub use report::{ResultDetails, ResultError, ValidatorId, VerificationResult};
pub use smtp_verify::{
    DiagnosticsSink, ProbeConfig, ProbeError, ProbeOutcome, Prober, TranscriptSink,
};
pub use verify::{MailboxVerification, VerifyError, check_mailaddress_exists, verify_with};
