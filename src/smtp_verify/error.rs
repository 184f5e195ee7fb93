use std::io;

use thiserror::Error;

use crate::error::ErrorKind;

use super::diagnostics::Stage;
use super::reply::{ReplyError, SmtpReply};
use super::types::ProbeOutcome;

/// Failure to build a prober (before any network activity).
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("TLS connector initialization failed: {source}")]
    Tls {
        #[source]
        source: native_tls::Error,
    },
}

/// Terminal failure of a probe, after retries.
///
/// `outcome` holds the details of the last attempt (host, port, TLS state,
/// last reply) so callers can report them alongside the error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProbeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Literal server reply behind the failure, when there was one.
    pub response: Option<String>,
    pub outcome: ProbeOutcome,
}

impl ProbeError {
    pub fn is_greylisted(&self) -> bool {
        self.outcome.greylisted
    }
}

/// Failure of a single attempt, before it is folded into a [`ProbeError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttemptError {
    pub kind: ErrorKind,
    pub stage: Stage,
    pub message: String,
    pub reply: Option<SmtpReply>,
}

impl AttemptError {
    pub(crate) fn new(kind: ErrorKind, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
            reply: None,
        }
    }

    pub(crate) fn timeout(stage: Stage) -> Self {
        Self::new(ErrorKind::SmtpTimeout, stage, format!("{stage} timed out"))
    }

    /// The server answered, but not with what this stage needs.
    pub(crate) fn unexpected(stage: Stage, reply: SmtpReply) -> Self {
        Self {
            kind: ErrorKind::SmtpConnectionFailed,
            stage,
            message: format!("unexpected {stage} reply {}", reply.code),
            reply: Some(reply),
        }
    }

    /// Premature close and malformed data are dialogue failures; resets,
    /// refusals and unreachable hosts are network failures.
    pub(crate) fn io(stage: Stage, err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
                ErrorKind::SmtpConnectionFailed
            }
            io::ErrorKind::TimedOut => ErrorKind::SmtpTimeout,
            _ if stage == Stage::TlsHandshake => ErrorKind::SmtpConnectionFailed,
            _ => ErrorKind::NetworkError,
        };
        Self::new(kind, stage, format!("{stage}: {err}"))
    }

    pub(crate) fn protocol(stage: Stage, err: &ReplyError) -> Self {
        Self::new(
            ErrorKind::SmtpConnectionFailed,
            stage,
            format!("{stage}: {err}"),
        )
    }
}
