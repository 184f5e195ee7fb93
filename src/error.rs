use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Classified failure kinds surfaced by the resolver and the prober.
///
/// Raw transport errors never leave the crate; they are mapped onto one of
/// these variants first.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The domain has no usable mail host.
    MxNotFound,
    /// DNS or TCP failure unrelated to the target's mail configuration.
    NetworkError,
    /// The SMTP dialogue left the expected path before the mailbox check.
    SmtpConnectionFailed,
    /// `RCPT TO` answered 550, 551 or 553.
    SmtpMailboxNotFound,
    /// A stage exceeded its time budget.
    SmtpTimeout,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MxNotFound => "MX_NOT_FOUND",
            Self::NetworkError => "NETWORK_ERROR",
            Self::SmtpConnectionFailed => "SMTP_CONNECTION_FAILED",
            Self::SmtpMailboxNotFound => "SMTP_MAILBOX_NOT_FOUND",
            Self::SmtpTimeout => "SMTP_TIMEOUT",
        }
    }

    /// Whether another attempt (same or next host) may change the answer.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MxNotFound | Self::SmtpMailboxNotFound)
    }

    pub fn severity(&self) -> Severity {
        if self.is_retryable() {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitive_kinds_are_not_retryable() {
        assert!(!ErrorKind::MxNotFound.is_retryable());
        assert!(!ErrorKind::SmtpMailboxNotFound.is_retryable());
        assert!(ErrorKind::SmtpTimeout.is_retryable());
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(ErrorKind::SmtpConnectionFailed.is_retryable());
    }

    #[test]
    fn severity_follows_retryability() {
        assert_eq!(ErrorKind::SmtpMailboxNotFound.severity(), Severity::Error);
        assert_eq!(ErrorKind::SmtpTimeout.severity(), Severity::Warning);
        assert_eq!(ErrorKind::MxNotFound.to_string(), "MX_NOT_FOUND");
    }
}
