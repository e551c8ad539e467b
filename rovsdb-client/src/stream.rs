//! Connected stream abstraction over TCP, Unix sockets, and TLS.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio_rustls::client::TlsStream as ClientTlsStream;

/// A connected byte stream to an OVSDB server.
///
/// Every variant is `Unpin`, so the poll impls dispatch with `Pin::new`
/// rather than projection.
#[derive(Debug)]
pub enum ClientStream {
    Tcp { stream: TcpStream },
    #[cfg(unix)]
    Unix { stream: UnixStream },
    Tls { stream: ClientTlsStream<TcpStream> },
}

impl ClientStream {
    /// Returns whether this stream is TLS-encrypted.
    pub fn is_tls(&self) -> bool {
        matches!(self, ClientStream::Tls { .. })
    }
}

impl AsyncRead for ClientStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp { stream } => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            ClientStream::Unix { stream } => Pin::new(stream).poll_read(cx, buf),
            ClientStream::Tls { stream } => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ClientStream::Tcp { stream } => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            ClientStream::Unix { stream } => Pin::new(stream).poll_write(cx, buf),
            ClientStream::Tls { stream } => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp { stream } => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            ClientStream::Unix { stream } => Pin::new(stream).poll_flush(cx),
            ClientStream::Tls { stream } => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp { stream } => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            ClientStream::Unix { stream } => Pin::new(stream).poll_shutdown(cx),
            ClientStream::Tls { stream } => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
