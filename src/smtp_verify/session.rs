use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::time::{Instant, timeout};

use crate::error::ErrorKind;

use super::diagnostics::{DiagnosticsSink, SmtpEvent, Stage};
use super::error::AttemptError;
use super::reply::{ReplyParser, SmtpReply};
use super::stream::{BoxedIo, SmtpStream};
use super::transport::Transport;

/// How long `QUIT` waits for the server's goodbye.
const QUIT_GRACE: Duration = Duration::from_secs(1);

/// State of one connection attempt. Dropping it closes the socket.
pub(crate) struct ProbeSession<'a> {
    host: &'a str,
    tls_name: &'a str,
    stream: Option<SmtpStream>,
    parser: ReplyParser,
    tls: bool,
    starttls_advertised: bool,
    last_reply: Option<SmtpReply>,
    timeout: Duration,
    started: Instant,
    sink: &'a dyn DiagnosticsSink,
}

impl<'a> ProbeSession<'a> {
    pub(crate) fn new(
        host: &'a str,
        io: BoxedIo,
        timeout: Duration,
        sink: &'a dyn DiagnosticsSink,
    ) -> Self {
        sink.record(host, &SmtpEvent::Connected);
        Self {
            host,
            tls_name: host,
            stream: Some(SmtpStream::new(io)),
            parser: ReplyParser::new(),
            tls: false,
            starttls_advertised: false,
            last_reply: None,
            timeout,
            started: Instant::now(),
            sink,
        }
    }

    /// Overrides the name presented for SNI and certificate checks.
    pub(crate) fn with_tls_name(mut self, name: &'a str) -> Self {
        self.tls_name = name;
        self
    }

    pub(crate) fn tls_used(&self) -> bool {
        self.tls
    }

    pub(crate) fn starttls_advertised(&self) -> bool {
        self.starttls_advertised
    }

    pub(crate) fn last_reply(&self) -> Option<&SmtpReply> {
        self.last_reply.as_ref()
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn record(&self, event: SmtpEvent) {
        self.sink.record(self.host, &event);
    }

    /// Replaces the known capabilities with those of an EHLO reply.
    pub(crate) fn set_capabilities(&mut self, ehlo: &SmtpReply) {
        self.starttls_advertised = ehlo.has_capability("STARTTLS");
    }

    pub(crate) async fn read_reply(&mut self, stage: Stage) -> Result<SmtpReply, AttemptError> {
        let stream = self.stream.as_mut().ok_or_else(|| closed(stage))?;
        let parser = &mut self.parser;
        let reply = match timeout(self.timeout, collect_reply(stream, parser, stage)).await {
            Ok(result) => result?,
            Err(_) => return Err(AttemptError::timeout(stage)),
        };
        self.record(SmtpEvent::Received {
            stage,
            reply: reply.clone(),
        });
        self.last_reply = Some(reply.clone());
        Ok(reply)
    }

    pub(crate) async fn send(&mut self, stage: Stage, command: &str) -> Result<(), AttemptError> {
        self.record(SmtpEvent::Sent {
            stage,
            command: command.to_string(),
        });
        let stream = self.stream.as_mut().ok_or_else(|| closed(stage))?;
        within(self.timeout, stage, stream.send_command(command)).await
    }

    pub(crate) async fn command(
        &mut self,
        stage: Stage,
        command: &str,
    ) -> Result<SmtpReply, AttemptError> {
        self.send(stage, command).await?;
        self.read_reply(stage).await
    }

    /// Hands the socket to the transport for the TLS handshake. On success the
    /// session continues over TLS with no known capabilities; on failure the
    /// socket is gone.
    pub(crate) async fn upgrade_tls<T: Transport>(
        &mut self,
        transport: &T,
    ) -> Result<(), AttemptError> {
        let stage = Stage::TlsHandshake;
        let stream = self.stream.take().ok_or_else(|| closed(stage))?;
        if stream.has_buffered_input() {
            return Err(AttemptError::new(
                ErrorKind::SmtpConnectionFailed,
                stage,
                "server sent data before the TLS handshake",
            ));
        }
        let handshake = transport.start_tls(self.tls_name, stream.into_inner());
        let io = within(self.timeout, stage, handshake).await?;
        self.stream = Some(SmtpStream::new(io));
        self.parser = ReplyParser::new();
        self.tls = true;
        self.starttls_advertised = false;
        self.record(SmtpEvent::TlsEstablished);
        Ok(())
    }

    /// Best-effort `QUIT`, then close. Never fails.
    pub(crate) async fn quit(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            self.record(SmtpEvent::Closed);
            return;
        };
        self.record(SmtpEvent::Sent {
            stage: Stage::Quit,
            command: "QUIT".to_string(),
        });
        let grace = self.timeout.min(QUIT_GRACE);
        if let Ok(Ok(())) = timeout(self.timeout, stream.send_command("QUIT")).await {
            let mut parser = ReplyParser::new();
            if let Ok(Ok(reply)) =
                timeout(grace, collect_reply(&mut stream, &mut parser, Stage::Quit)).await
            {
                self.record(SmtpEvent::Received {
                    stage: Stage::Quit,
                    reply,
                });
            }
        }
        let _ = timeout(grace, stream.shutdown()).await;
        drop(stream);
        self.record(SmtpEvent::Closed);
    }
}

async fn collect_reply(
    stream: &mut SmtpStream,
    parser: &mut ReplyParser,
    stage: Stage,
) -> Result<SmtpReply, AttemptError> {
    loop {
        let line = stream
            .read_line()
            .await
            .map_err(|err| AttemptError::io(stage, &err))?;
        if let Some(reply) = parser
            .feed(&line)
            .map_err(|err| AttemptError::protocol(stage, &err))?
        {
            return Ok(reply);
        }
    }
}

pub(crate) async fn within<T, F>(limit: Duration, stage: Stage, fut: F) -> Result<T, AttemptError>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(AttemptError::io(stage, &err)),
        Err(_) => Err(AttemptError::timeout(stage)),
    }
}

fn closed(stage: Stage) -> AttemptError {
    AttemptError::new(
        ErrorKind::SmtpConnectionFailed,
        stage,
        "connection already closed",
    )
}
