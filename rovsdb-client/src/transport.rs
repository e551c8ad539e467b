//! Outbound transport abstraction.
//!
//! The RPC engine only ever *sends* through the transport; inbound bytes
//! are read by the session's dispatch loop and handed to the engine as
//! whole messages.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

use crate::stream::ClientStream;

/// Delivers encoded messages to the peer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Writes one complete encoded message.
    async fn send(&self, data: Bytes) -> io::Result<()>;

    /// Shuts down the write side. Safe to call more than once.
    async fn close(&self);
}

/// Transport over the write half of a split [`ClientStream`].
pub struct StreamTransport {
    writer: Mutex<Option<WriteHalf<ClientStream>>>,
}

impl StreamTransport {
    /// Splits `stream`, keeping the write half here; the read half goes to
    /// the session's dispatch loop.
    pub fn split(stream: ClientStream) -> (Self, ReadHalf<ClientStream>) {
        let (read_half, write_half) = tokio::io::split(stream);
        (
            Self {
                writer: Mutex::new(Some(write_half)),
            },
            read_half,
        )
    }
}

#[async_trait]
impl Transport for StreamTransport {
    async fn send(&self, data: Bytes) -> io::Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "transport closed")
        })?;
        writer.write_all(&data).await?;
        // the codec emits no delimiter, so nothing may linger in a TLS
        // write buffer between messages
        writer.flush().await
    }

    async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use serde_json::Value as Json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Captures outbound messages and counts closes, for assertions.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        sent: parking_lot::Mutex<Vec<Json>>,
        closes: AtomicUsize,
        fail_sends: AtomicBool,
    }

    impl MockTransport {
        pub fn new() -> std::sync::Arc<Self> {
            std::sync::Arc::new(Self::default())
        }

        pub fn sent(&self) -> Vec<Json> {
            self.sent.lock().clone()
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().len()
        }

        pub fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        pub fn fail_sends(&self, fail: bool) {
            self.fail_sends.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, data: Bytes) -> io::Result<()> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock failure"));
            }
            let message = serde_json::from_slice(&data).expect("sent data is JSON");
            self.sent.lock().push(message);
            Ok(())
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
