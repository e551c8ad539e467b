//! # rovsdb-client
//!
//! Async client library for OVSDB servers.
//!
//! This crate provides:
//! - Request/response correlation over a concatenated-JSON stream
//! - Typed session operations: transactions, monitors, locks
//! - Callback registries for unsolicited server notifications
//! - Optional TLS support

pub mod client;
pub mod dispatch;
pub mod error;
pub mod rpc;
pub mod stream;
pub mod tls;
pub mod transport;

pub use client::{Client, ClientConfig, LockCallback, MonitorCallback};
pub use dispatch::{Arity, HandlerTable};
pub use error::ClientError;
pub use rpc::{CallHandle, RpcEngine};
pub use stream::ClientStream;
pub use tls::TlsConfig;
pub use transport::{StreamTransport, Transport};
