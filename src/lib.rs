//! rovsdb - An async OVSDB client
//!
//! Speaks the management protocol of ovsdb-server (RFC 7047): column
//! values with their tagged JSON encodings, transactions, table
//! monitors, and advisory locks, over TCP, Unix sockets, or TLS.
//!
//! ```no_run
//! use rovsdb::{Client, ClientConfig, Operation, Row};
//! use std::net::SocketAddr;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let addr: SocketAddr = "127.0.0.1:6640".parse()?;
//!     let client = Client::connect(addr, ClientConfig::default()).await?;
//!
//!     let dbs = client.list_dbs().await?;
//!     let results = client
//!         .transact(
//!             &dbs[0],
//!             vec![Operation::insert("Bridge", Row::new().with("name", "br0"))],
//!         )
//!         .await?;
//!     println!("{results:?}");
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

pub use rovsdb_client as client;
pub use rovsdb_protocol as protocol;

pub use rovsdb_client::{
    Client, ClientConfig, ClientError, LockCallback, MonitorCallback, TlsConfig,
};
pub use rovsdb_protocol::{
    Atom, Condition, DatabaseSchema, Function, LockResult, MonitorRequest, MonitorRequests,
    MonitorSelect, Mutation, Mutator, Operation, OperationResult, Row, RowUpdate, TableUpdate,
    TableUpdates, Value, DEFAULT_PORT,
};
