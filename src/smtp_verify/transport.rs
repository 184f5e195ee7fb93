use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::net::TcpStream;

use super::error::SetupError;
use super::stream::BoxedIo;

/// Opens connections and upgrades them to TLS. The prober owns one and calls
/// it once per attempt; tests substitute an in-memory implementation.
pub trait Transport: Send + Sync {
    fn connect(&self, host: &str, port: u16) -> impl Future<Output = io::Result<BoxedIo>> + Send;

    /// Runs the TLS client handshake over an established plaintext stream.
    fn start_tls(
        &self,
        host: &str,
        stream: BoxedIo,
    ) -> impl Future<Output = io::Result<BoxedIo>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn connect(&self, host: &str, port: u16) -> impl Future<Output = io::Result<BoxedIo>> + Send {
        T::connect(self, host, port)
    }

    fn start_tls(
        &self,
        host: &str,
        stream: BoxedIo,
    ) -> impl Future<Output = io::Result<BoxedIo>> + Send {
        T::start_tls(self, host, stream)
    }
}

/// TCP plus native-tls.
#[derive(Clone)]
pub struct TcpTransport {
    tls: tokio_native_tls::TlsConnector,
}

impl TcpTransport {
    pub fn new(accept_invalid_certs: bool) -> Result<Self, SetupError> {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .danger_accept_invalid_hostnames(accept_invalid_certs)
            .build()
            .map_err(|source| SetupError::Tls { source })?;
        Ok(Self {
            tls: tokio_native_tls::TlsConnector::from(connector),
        })
    }
}

impl Transport for TcpTransport {
    async fn connect(&self, host: &str, port: u16) -> io::Result<BoxedIo> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }

    async fn start_tls(&self, host: &str, stream: BoxedIo) -> io::Result<BoxedIo> {
        let tls = self
            .tls
            .connect(host, stream)
            .await
            .map_err(io::Error::other)?;
        Ok(Box::new(tls))
    }
}
