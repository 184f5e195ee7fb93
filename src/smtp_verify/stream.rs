use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Anything an SMTP session can run over: TCP, TLS over TCP, or an in-memory pipe.
pub trait AsyncIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncIo for T {}

pub type BoxedIo = Box<dyn AsyncIo>;

/// Longest reply line accepted, CRLF included.
pub(crate) const MAX_LINE_LEN: u64 = 4096;

/// Line-framed SMTP stream. Timeouts are applied by the caller.
pub(crate) struct SmtpStream {
    reader: BufReader<BoxedIo>,
}

impl SmtpStream {
    pub(crate) fn new(io: BoxedIo) -> Self {
        Self {
            reader: BufReader::new(io),
        }
    }

    pub(crate) async fn send_command(&mut self, command: &str) -> io::Result<()> {
        let mut data = Vec::with_capacity(command.len() + 2);
        data.extend_from_slice(command.as_bytes());
        data.extend_from_slice(b"\r\n");
        let io = self.reader.get_mut();
        io.write_all(&data).await?;
        io.flush().await
    }

    /// Reads one CRLF-terminated line. EOF before the terminator is reported
    /// as `UnexpectedEof`.
    pub(crate) async fn read_line(&mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        let read = (&mut self.reader)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            ));
        }
        if !buf.ends_with(b"\n") {
            let kind = if read as u64 >= MAX_LINE_LEN {
                io::ErrorKind::InvalidData
            } else {
                io::ErrorKind::UnexpectedEof
            };
            return Err(io::Error::new(kind, "incomplete reply line"));
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// True when the server sent bytes we have not consumed yet.
    pub(crate) fn has_buffered_input(&self) -> bool {
        !self.reader.buffer().is_empty()
    }

    pub(crate) fn into_inner(self) -> BoxedIo {
        self.reader.into_inner()
    }

    pub(crate) async fn shutdown(&mut self) {
        let _ = self.reader.get_mut().shutdown().await;
    }
}
