//! # rovsdb-protocol
//!
//! Wire types for the OVSDB management protocol (RFC 7047):
//!
//! - Column values: atoms, sets, maps, and rows, with their
//!   context-sensitive JSON encodings
//! - Transaction operations and structurally-decoded operation results
//! - JSON-RPC request/response envelopes and inbound classification
//! - Monitor, lock, and schema wire types
//! - A byte-stream codec for the undelimited concatenated-JSON transport
//!
//! This crate is transport-agnostic and carries no I/O; see `rovsdb-client`
//! for the session layer.

pub mod codec;
pub mod error;
pub mod message;
pub mod monitor;
pub mod operation;
pub mod schema;
pub mod value;

pub use codec::{Decoder, Encoder};
pub use error::ProtocolError;
pub use message::{Message, Request, Response};
pub use monitor::{
    LockResult, MonitorRequest, MonitorRequests, MonitorSelect, RowUpdate, TableUpdate,
    TableUpdates,
};
pub use operation::{
    decode_transact_reply, Condition, Function, Mutation, Mutator, Operation,
    OperationResult, WaitUntil,
};
pub use schema::{ColumnSchema, DatabaseSchema, TableSchema};
pub use value::{Atom, Row, Value};

/// Default TCP port of an OVSDB server.
pub const DEFAULT_PORT: u16 = 6640;

/// Maximum size of a single inbound message (64 MiB). Monitor snapshots of
/// large databases dwarf ordinary replies, so the cap is generous.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;
