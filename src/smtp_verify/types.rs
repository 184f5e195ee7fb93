use super::reply::SmtpReply;

/// Terminal result of one probe (possibly after internal retries).
///
/// `greylisted` implies `!mailbox_exists`.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeOutcome {
    pub mailbox_exists: bool,
    /// False when `RCPT TO` was not issued (mailbox verification disabled or
    /// the attempt failed earlier).
    pub mailbox_checked: bool,
    pub mx_host: String,
    pub port: u16,
    pub tls_used: bool,
    /// Code of the last reply received, 0 when none arrived.
    pub response_code: u16,
    pub response_message: String,
    pub greylisted: bool,
    pub attempts: usize,
}

impl ProbeOutcome {
    pub(crate) fn new(mx_host: &str, port: u16, attempts: usize) -> Self {
        Self {
            mx_host: mx_host.to_string(),
            port,
            attempts,
            ..Self::default()
        }
    }

    pub(crate) fn with_reply(mut self, reply: Option<&SmtpReply>) -> Self {
        if let Some(reply) = reply {
            self.response_code = reply.code;
            self.response_message = reply.message();
        }
        self
    }
}

/// Meaning of the `RCPT TO` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RcptVerdict {
    Exists,
    NotFound,
    Greylisted,
    Unexpected,
}

impl RcptVerdict {
    pub(crate) fn classify(reply: &SmtpReply) -> Self {
        match reply.code {
            250 | 251 => Self::Exists,
            550 | 551 | 553 => Self::NotFound,
            450 | 451 => Self::Greylisted,
            _ => Self::Unexpected,
        }
    }
}
