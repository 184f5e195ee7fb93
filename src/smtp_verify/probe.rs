use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ErrorKind;
use crate::mx::{ExchangeCandidate, ResolutionOutcome};

use super::diagnostics::{DiagnosticsSink, SmtpEvent, Stage, TracingSink};
use super::error::{AttemptError, ProbeError, SetupError};
use super::options::ProbeConfig;
use super::reply::SmtpReply;
use super::session::{ProbeSession, within};
use super::transport::{TcpTransport, Transport};
use super::types::{ProbeOutcome, RcptVerdict};

/// Drives SMTP conversations against the candidates of a [`ResolutionOutcome`].
///
/// Stateless across calls: every [`probe`](Self::probe) opens its own
/// connections and closes them before returning.
pub struct Prober<T = TcpTransport> {
    config: ProbeConfig,
    transport: T,
    sink: Arc<dyn DiagnosticsSink>,
}

impl Prober<TcpTransport> {
    /// TCP + native-tls transport, events forwarded to `tracing`.
    pub fn new(config: ProbeConfig) -> Result<Self, SetupError> {
        let transport = TcpTransport::new(config.accept_invalid_certs)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Prober<T> {
    pub fn with_transport(config: ProbeConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probes `address` against the resolved candidates.
    ///
    /// Attempts run one after another: attempt `n` targets candidate `n`, or
    /// the last candidate once the list is exhausted, with the configured
    /// backoff before every retry. An accepted recipient or a definitive
    /// rejection (550/551/553) ends the loop at once.
    pub async fn probe(
        &self,
        address: &str,
        resolution: &ResolutionOutcome,
    ) -> Result<ProbeOutcome, ProbeError> {
        let port = self.config.port;
        let Some(last) = resolution.candidates.last() else {
            return Err(ProbeError {
                kind: ErrorKind::MxNotFound,
                message: "no mail exchanger to probe".to_string(),
                response: None,
                outcome: ProbeOutcome::new("", port, 0),
            });
        };

        let domain = address.rsplit_once('@').map_or("", |(_, domain)| domain);
        let sender = self.config.envelope_sender(domain);
        let max_attempts = self.config.max_attempts();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            let candidate = resolution.candidates.get(attempt).unwrap_or(last);
            if attempt > 0 {
                debug!(host = %candidate.host, backoff_ms = self.config.backoff_ms, "retrying");
                tokio::time::sleep(self.config.backoff()).await;
            }
            let number = attempt + 1;
            self.sink.record(
                &candidate.host,
                &SmtpEvent::Attempt { number, port },
            );

            let err = match self.attempt(candidate, domain, address, &sender, number).await {
                Ok(outcome) => {
                    info!(
                        host = %outcome.mx_host,
                        exists = outcome.mailbox_exists,
                        tls = outcome.tls_used,
                        "probe finished"
                    );
                    return Ok(outcome);
                }
                Err(err) => err,
            };
            warn!(host = %candidate.host, attempt = number, kind = %err.kind, "{}", err.message);
            if !err.kind.is_retryable() {
                return Err(err);
            }
            last_error = Some(err);
        }

        Err(last_error.unwrap_or_else(|| ProbeError {
            kind: ErrorKind::SmtpConnectionFailed,
            message: "no attempt was made".to_string(),
            response: None,
            outcome: ProbeOutcome::new(&last.host, port, 0),
        }))
    }

    /// One full connection, from TCP connect to `QUIT`.
    async fn attempt(
        &self,
        candidate: &ExchangeCandidate,
        domain: &str,
        address: &str,
        sender: &str,
        number: usize,
    ) -> Result<ProbeOutcome, ProbeError> {
        let host = candidate.host.as_str();
        let port = self.config.port;
        let base = ProbeOutcome::new(host, port, number);

        let io = match within(
            self.config.timeout(),
            Stage::Connect,
            self.transport.connect(host, port),
        )
        .await
        {
            Ok(io) => io,
            Err(err) => {
                self.sink.record(
                    host,
                    &SmtpEvent::Error {
                        stage: err.stage,
                        message: err.message.clone(),
                    },
                );
                return Err(into_probe_error(err, base));
            }
        };

        let mut session = ProbeSession::new(host, io, self.config.timeout(), self.sink.as_ref())
            .with_tls_name(candidate.tls_name(domain));
        let result = self.converse(&mut session, address, sender).await;
        if let Err(err) = &result {
            session.record(SmtpEvent::Error {
                stage: err.stage,
                message: err.message.clone(),
            });
        }
        session.quit().await;
        debug!(host, elapsed_ms = session.elapsed().as_millis() as u64, "attempt closed");

        let base = ProbeOutcome {
            tls_used: session.tls_used(),
            ..base
        };
        match result {
            Ok(Conversation::Connected) => Ok(base.with_reply(session.last_reply())),
            Ok(Conversation::Rcpt(reply)) => {
                let outcome = ProbeOutcome {
                    mailbox_checked: true,
                    ..base
                }
                .with_reply(Some(&reply));
                classify_rcpt(reply, outcome)
            }
            Err(err) => {
                let base = base.with_reply(session.last_reply());
                Err(into_probe_error(err, base))
            }
        }
    }

    /// A server that stays silent past the stage budget, greeting included,
    /// fails the attempt with `SmtpTimeout` rather than a connection failure.
    async fn converse(
        &self,
        session: &mut ProbeSession<'_>,
        address: &str,
        sender: &str,
    ) -> Result<Conversation, AttemptError> {
        let greeting = session.read_reply(Stage::Greeting).await?;
        if greeting.code != 220 {
            return Err(AttemptError::unexpected(Stage::Greeting, greeting));
        }

        self.hello(session, Stage::Ehlo).await?;

        if self.config.wants_tls() {
            if session.starttls_advertised() {
                self.start_tls(session).await?;
            } else if self.config.tls_required {
                return Err(AttemptError::new(
                    ErrorKind::SmtpConnectionFailed,
                    Stage::StartTls,
                    "STARTTLS required but not advertised",
                ));
            }
        }

        if !self.config.verify_mailbox {
            return Ok(Conversation::Connected);
        }

        let mail = session
            .command(Stage::MailFrom, &format!("MAIL FROM:<{sender}>"))
            .await?;
        if !mail.is_positive_completion() {
            return Err(AttemptError::unexpected(Stage::MailFrom, mail));
        }

        let rcpt = session
            .command(Stage::RcptTo, &format!("RCPT TO:<{address}>"))
            .await?;
        Ok(Conversation::Rcpt(rcpt))
    }

    /// EHLO, with a single HELO fallback when EHLO is refused with 5xx.
    async fn hello(&self, session: &mut ProbeSession<'_>, stage: Stage) -> Result<(), AttemptError> {
        let identity = self.config.helo_name();
        let ehlo = session.command(stage, &format!("EHLO {identity}")).await?;
        if ehlo.is_positive_completion() {
            session.set_capabilities(&ehlo);
            return Ok(());
        }
        if !ehlo.is_permanent_failure() || stage == Stage::EhloSecure {
            return Err(AttemptError::unexpected(stage, ehlo));
        }

        let helo = session.command(Stage::Helo, &format!("HELO {identity}")).await?;
        if helo.is_positive_completion() {
            session.set_capabilities(&SmtpReply {
                code: helo.code,
                lines: Vec::new(),
            });
            Ok(())
        } else {
            Err(AttemptError::unexpected(Stage::Helo, helo))
        }
    }

    async fn start_tls(&self, session: &mut ProbeSession<'_>) -> Result<(), AttemptError> {
        let reply = session.command(Stage::StartTls, "STARTTLS").await?;
        if !reply.is_positive_completion() {
            if self.config.tls_required {
                return Err(AttemptError::unexpected(Stage::StartTls, reply));
            }
            debug!(code = reply.code, "STARTTLS refused, continuing in plaintext");
            return Ok(());
        }
        session.upgrade_tls(&self.transport).await?;
        self.hello(session, Stage::EhloSecure).await
    }
}

enum Conversation {
    /// Stopped after EHLO because mailbox verification is disabled.
    Connected,
    Rcpt(SmtpReply),
}

fn classify_rcpt(reply: SmtpReply, outcome: ProbeOutcome) -> Result<ProbeOutcome, ProbeError> {
    match RcptVerdict::classify(&reply) {
        RcptVerdict::Exists => Ok(ProbeOutcome {
            mailbox_exists: true,
            ..outcome
        }),
        RcptVerdict::NotFound => Err(ProbeError {
            kind: ErrorKind::SmtpMailboxNotFound,
            message: format!("mailbox rejected by {}", outcome.mx_host),
            response: Some(reply.to_string()),
            outcome,
        }),
        RcptVerdict::Greylisted => Err(ProbeError {
            kind: ErrorKind::SmtpConnectionFailed,
            message: format!("recipient temporarily deferred by {} (greylisting)", outcome.mx_host),
            response: Some(reply.to_string()),
            outcome: ProbeOutcome {
                greylisted: true,
                ..outcome
            },
        }),
        RcptVerdict::Unexpected => Err(ProbeError {
            kind: ErrorKind::SmtpConnectionFailed,
            message: format!("unexpected RCPT TO reply {}", reply.code),
            response: Some(reply.to_string()),
            outcome,
        }),
    }
}

fn into_probe_error(err: AttemptError, outcome: ProbeOutcome) -> ProbeError {
    ProbeError {
        kind: err.kind,
        message: format!("{} ({})", err.message, outcome.mx_host),
        response: err.reply.as_ref().map(ToString::to_string),
        outcome,
    }
}
