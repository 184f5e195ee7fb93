use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::reply::SmtpReply;

/// The step of a probe attempt an event or failure belongs to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Connect,
    Greeting,
    Ehlo,
    Helo,
    StartTls,
    TlsHandshake,
    EhloSecure,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Ehlo => "EHLO",
            Self::Helo => "HELO",
            Self::StartTls => "STARTTLS",
            Self::TlsHandshake => "TLS handshake",
            Self::EhloSecure => "EHLO (TLS)",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        };
        f.write_str(name)
    }
}

/// A recorded transcript event used for diagnostics.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpEvent {
    Attempt { number: usize, port: u16 },
    Connected,
    Sent { stage: Stage, command: String },
    Received { stage: Stage, reply: SmtpReply },
    TlsEstablished,
    Error { stage: Stage, message: String },
    Closed,
}

impl fmt::Display for SmtpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempt { number, port } => write!(f, "* attempt {number} on port {port}"),
            Self::Connected => f.write_str("* connected"),
            Self::Sent { command, .. } => write!(f, "C: {command}"),
            Self::Received { reply, .. } => write!(f, "S: {reply}"),
            Self::TlsEstablished => f.write_str("* TLS established"),
            Self::Error { stage, message } => write!(f, "! {stage}: {message}"),
            Self::Closed => f.write_str("* closed"),
        }
    }
}

/// Receives every event of every attempt. Injected into the prober at
/// construction; implementations must tolerate concurrent probes.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, host: &str, event: &SmtpEvent);
}

/// Default sink: forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, host: &str, event: &SmtpEvent) {
        match event {
            SmtpEvent::Error { stage, message } => {
                tracing::warn!(host, %stage, message = message.as_str(), "smtp probe error");
            }
            SmtpEvent::Attempt { .. } | SmtpEvent::TlsEstablished => {
                tracing::info!(host, "{event}");
            }
            _ => tracing::debug!(host, "{event}"),
        }
    }
}

/// Collects `[host] event` lines in memory.
#[derive(Debug, Default)]
pub struct TranscriptSink {
    lines: Mutex<Vec<String>>,
}

impl TranscriptSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticsSink for TranscriptSink {
    fn record(&self, host: &str, event: &SmtpEvent) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("[{host}] {event}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_formats_events() {
        let sink = TranscriptSink::new();
        sink.record(
            "mx.example",
            &SmtpEvent::Sent {
                stage: Stage::Ehlo,
                command: "EHLO localhost".into(),
            },
        );
        sink.record(
            "mx.example",
            &SmtpEvent::Received {
                stage: Stage::Ehlo,
                reply: SmtpReply {
                    code: 250,
                    lines: vec!["mx.example".into()],
                },
            },
        );
        assert_eq!(
            sink.take(),
            vec!["[mx.example] C: EHLO localhost", "[mx.example] S: 250 mx.example"]
        );
        assert!(sink.lines().is_empty());
    }
}
