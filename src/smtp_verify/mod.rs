//! SMTP mailbox probing.
//!
//! [`Prober::probe`] walks the candidates produced by the [`mx`](crate::mx)
//! resolver and runs `EHLO`, optional `STARTTLS`, `MAIL FROM` and `RCPT TO`
//! against them, classifying the `RCPT TO` reply into a [`ProbeOutcome`] or a
//! [`ProbeError`]. No `DATA` is ever sent.

mod diagnostics;
mod error;
mod options;
mod probe;
mod reply;
mod session;
mod stream;
mod transport;
mod types;

pub use diagnostics::{DiagnosticsSink, SmtpEvent, Stage, TracingSink, TranscriptSink};
pub use error::{ProbeError, SetupError};
pub use options::ProbeConfig;
pub use probe::Prober;
pub use reply::{ReplyError, ReplyParser, SmtpReply};
pub use stream::{AsyncIo, BoxedIo};
pub use transport::{TcpTransport, Transport};
pub use types::ProbeOutcome;
