//! Stream transport for sessions.
//!
//! The session manager only needs something that reads and writes bytes;
//! [`Connector`] produces it. [`TcpConnector`] is the real socket, tests and
//! embedders can supply their own.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Opens the byte stream a session runs over.
pub trait Connector {
    /// The stream type produced.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Open a stream to `host:port`.
    ///
    /// Timeouts and cancellation are applied by the caller.
    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Plain TCP, no TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;
        // Command lines are tiny and strictly request/response.
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
