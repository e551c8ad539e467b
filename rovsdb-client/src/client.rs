//! The session layer: typed operations over one OVSDB connection.
//!
//! A [`Client`] owns an [`RpcEngine`], the dispatch loop feeding it, and
//! the two registries that give unsolicited notifications somewhere to
//! land: monitor-id to [`MonitorCallback`] and lock-id to [`LockCallback`].

use crate::dispatch::{Arity, HandlerTable};
use crate::error::ClientError;
use crate::rpc::RpcEngine;
use crate::stream::ClientStream;
use crate::tls::TlsConfig;
use crate::transport::{StreamTransport, Transport};
use dashmap::DashMap;
use rovsdb_protocol::{
    decode_transact_reply, DatabaseSchema, Decoder, LockResult, MonitorRequests,
    Operation, OperationResult, TableUpdates,
};
use serde_json::{json, Value as Json};
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, ReadHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,
    /// Deadline applied by the engine to every outstanding call.
    pub call_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
    /// TLS settings; `None` connects in the clear.
    pub tls: Option<TlsConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            tls: None,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }
}

/// Receives change notifications for one monitor.
pub trait MonitorCallback: Send + Sync {
    fn update(&self, updates: TableUpdates);
}

/// Receives lock-state notifications for one lock.
pub trait LockCallback: Send + Sync {
    /// The server granted a lock this session was waiting on.
    fn locked(&self, lock: &str);
    /// Another session stole a lock this session held.
    fn stolen(&self, lock: &str);
}

#[derive(Default)]
struct Registries {
    monitors: DashMap<String, Arc<dyn MonitorCallback>>,
    locks: DashMap<String, Arc<dyn LockCallback>>,
}

impl Registries {
    fn clear(&self) {
        self.monitors.clear();
        self.locks.clear();
    }
}

struct ClientInner {
    engine: RpcEngine,
    registries: Arc<Registries>,
    next_id: AtomicU64,
    active: AtomicBool,
    dispatch: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

/// A client session. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Connects over TCP, upgrading to TLS when the config asks for it.
    pub async fn connect(addr: SocketAddr, config: ClientConfig) -> Result<Self, ClientError> {
        tracing::debug!("connecting to {}", addr);
        let tcp = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout)??;
        tcp.set_nodelay(true).ok();

        let stream = match &config.tls {
            Some(tls) => {
                let host = addr.ip().to_string();
                let (connector, server_name) = crate::tls::build_connector(tls, &host)?;
                let tls_stream = connector
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| ClientError::TlsHandshake(e.to_string()))?;
                tracing::debug!("TLS handshake complete");
                ClientStream::Tls { stream: tls_stream }
            }
            None => ClientStream::Tcp { stream: tcp },
        };
        Self::start(stream, &config)
    }

    /// Connects over a Unix socket, the usual transport for a local
    /// ovsdb-server.
    #[cfg(unix)]
    pub async fn connect_unix(
        path: impl AsRef<Path>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let path = path.as_ref();
        tracing::debug!("connecting to {:?}", path);
        let stream = tokio::time::timeout(
            config.connect_timeout,
            tokio::net::UnixStream::connect(path),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;
        Self::start(ClientStream::Unix { stream }, &config)
    }

    fn start(stream: ClientStream, config: &ClientConfig) -> Result<Self, ClientError> {
        let (transport, reader) = StreamTransport::split(stream);
        let client = Self::assemble(Arc::new(transport), config)?;
        let task = tokio::spawn(dispatch_loop(
            Arc::clone(&client.inner),
            reader,
            config.read_buffer_size,
        ));
        *client.inner.dispatch.lock() = Some(task);
        Ok(client)
    }

    /// Builds the session state over an already-established transport.
    /// No dispatch loop is spawned; inbound messages must reach the
    /// engine some other way.
    fn assemble(
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        let registries = Arc::new(Registries::default());
        let mut handlers = HandlerTable::new();
        register_session_handlers(&mut handlers, &registries)?;
        let engine = RpcEngine::new(transport, handlers, config.call_timeout);
        Ok(Self {
            inner: Arc::new(ClientInner {
                engine,
                registries,
                next_id: AtomicU64::new(1),
                active: AtomicBool::new(true),
                dispatch: parking_lot::Mutex::new(None),
            }),
        })
    }

    /// Lists the databases the server hosts.
    pub async fn list_dbs(&self) -> Result<Vec<String>, ClientError> {
        self.ensure_active()?;
        let handle = self
            .inner
            .engine
            .call::<Vec<String>>(self.next_id(), "list_dbs", vec![])
            .await?;
        handle.wait().await
    }

    /// Fetches the schema of one database.
    pub async fn get_schema(&self, db: &str) -> Result<DatabaseSchema, ClientError> {
        self.ensure_active()?;
        let handle = self
            .inner
            .engine
            .call::<DatabaseSchema>(self.next_id(), "get_schema", vec![json!(db)])
            .await?;
        handle.wait().await
    }

    /// Runs a transaction. The reply is positional: `result[i]` answers
    /// `operations[i]`.
    pub async fn transact(
        &self,
        db: &str,
        operations: Vec<Operation>,
    ) -> Result<Vec<OperationResult>, ClientError> {
        self.ensure_active()?;
        let mut params = Vec::with_capacity(operations.len() + 1);
        params.push(json!(db));
        for operation in &operations {
            params.push(serde_json::to_value(operation)?);
        }
        let handle = self
            .inner
            .engine
            .call::<Json>(self.next_id(), "transact", params)
            .await?;
        let reply = handle.wait().await?;
        decode_transact_reply(&reply, operations.len())
            .map_err(|e| ClientError::ResultMismatch(e.to_string()))
    }

    /// Starts a monitor and returns the initial snapshot.
    ///
    /// `callback` is registered only after the server confirms the
    /// monitor, so it can never fire before the caller has the snapshot,
    /// and a failed call leaves no registration behind.
    pub async fn monitor(
        &self,
        db: &str,
        monitor_id: &str,
        requests: MonitorRequests,
        callback: Arc<dyn MonitorCallback>,
    ) -> Result<TableUpdates, ClientError> {
        self.ensure_active()?;
        let params = vec![json!(db), json!(monitor_id), serde_json::to_value(&requests)?];
        let handle = self
            .inner
            .engine
            .call::<TableUpdates>(self.next_id(), "monitor", params)
            .await?;
        let initial = handle.wait().await?;
        self.inner
            .registries
            .monitors
            .insert(monitor_id.to_string(), callback);
        tracing::debug!("monitor {} registered", monitor_id);
        Ok(initial)
    }

    /// Cancels a monitor. The registration is removed only once the
    /// server confirms the cancellation.
    pub async fn monitor_cancel(&self, monitor_id: &str) -> Result<(), ClientError> {
        self.ensure_active()?;
        let handle = self
            .inner
            .engine
            .call::<Json>(self.next_id(), "monitor_cancel", vec![json!(monitor_id)])
            .await?;
        handle.wait().await?;
        self.inner.registries.monitors.remove(monitor_id);
        tracing::debug!("monitor {} cancelled", monitor_id);
        Ok(())
    }

    /// Requests a lock, queueing behind other holders.
    ///
    /// The callback is registered whenever the call succeeds, even with
    /// `locked: false`: the server will announce the eventual grant with
    /// an unsolicited "locked" notification for this id.
    pub async fn lock(
        &self,
        lock_id: &str,
        callback: Arc<dyn LockCallback>,
    ) -> Result<LockResult, ClientError> {
        self.lock_call("lock", lock_id, callback).await
    }

    /// Requests a lock, preempting the current holder.
    pub async fn steal(
        &self,
        lock_id: &str,
        callback: Arc<dyn LockCallback>,
    ) -> Result<LockResult, ClientError> {
        self.lock_call("steal", lock_id, callback).await
    }

    async fn lock_call(
        &self,
        method: &str,
        lock_id: &str,
        callback: Arc<dyn LockCallback>,
    ) -> Result<LockResult, ClientError> {
        self.ensure_active()?;
        let handle = self
            .inner
            .engine
            .call::<LockResult>(self.next_id(), method, vec![json!(lock_id)])
            .await?;
        let result = handle.wait().await?;
        self.inner
            .registries
            .locks
            .insert(lock_id.to_string(), callback);
        tracing::debug!("{} {} -> locked={}", method, lock_id, result.locked);
        Ok(result)
    }

    /// Releases a lock (or abandons a queued request for it).
    pub async fn unlock(&self, lock_id: &str) -> Result<(), ClientError> {
        self.ensure_active()?;
        let handle = self
            .inner
            .engine
            .call::<Json>(self.next_id(), "unlock", vec![json!(lock_id)])
            .await?;
        handle.wait().await?;
        self.inner.registries.locks.remove(lock_id);
        Ok(())
    }

    /// Round-trips an echo through the server, as a liveness probe.
    pub async fn echo(&self) -> Result<Vec<Json>, ClientError> {
        self.ensure_active()?;
        let handle = self
            .inner
            .engine
            .call::<Vec<Json>>(self.next_id(), "echo", vec![])
            .await?;
        handle.wait().await
    }

    /// Tears the session down: stops the dispatch loop, fails every
    /// outstanding call, clears both registries. One-shot; later calls
    /// are no-ops and every operation afterwards fails fast.
    pub async fn shutdown(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
        if let Some(task) = self.inner.dispatch.lock().take() {
            task.abort();
        }
        self.inner.engine.shutdown().await;
        self.inner.registries.clear();
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst) && !self.inner.engine.is_closed()
    }

    fn ensure_active(&self) -> Result<(), ClientError> {
        if self.inner.active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::NotActive)
        }
    }

    /// Ids are session-scoped and never reused, so the engine's
    /// uniqueness precondition always holds for this session's traffic.
    fn next_id(&self) -> String {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

/// Registers the callee half of the session: the methods an OVSDB server
/// invokes on its clients.
fn register_session_handlers(
    handlers: &mut HandlerTable,
    registries: &Arc<Registries>,
) -> Result<(), ClientError> {
    handlers.register("echo", Arity::at_least(0), |params| Ok(Json::Array(params)))?;

    let reg = Arc::clone(registries);
    handlers.register("update", Arity::exactly(2), move |params| {
        // a non-string monitor id cannot match any registration
        let Some(monitor_id) = params[0].as_str() else {
            tracing::debug!("update notification with non-string monitor id");
            return Ok(Json::Null);
        };
        let Some(callback) = reg
            .monitors
            .get(monitor_id)
            .map(|entry| Arc::clone(entry.value()))
        else {
            // cancellation may have raced the notification; not an error
            tracing::debug!("update for unregistered monitor {}", monitor_id);
            return Ok(Json::Null);
        };
        let updates: TableUpdates = serde_json::from_value(params[1].clone())
            .map_err(|e| format!("table updates: {e}"))?;
        callback.update(updates);
        Ok(Json::Null)
    })?;

    let reg = Arc::clone(registries);
    handlers.register("locked", Arity::exactly(1), move |params| {
        let Some(lock_id) = params[0].as_str() else {
            tracing::debug!("locked notification with non-string lock id");
            return Ok(Json::Null);
        };
        if let Some(callback) = reg.locks.get(lock_id).map(|entry| Arc::clone(entry.value()))
        {
            callback.locked(lock_id);
        } else {
            tracing::debug!("locked notification for unregistered lock {}", lock_id);
        }
        Ok(Json::Null)
    })?;

    let reg = Arc::clone(registries);
    handlers.register("stolen", Arity::exactly(1), move |params| {
        let Some(lock_id) = params[0].as_str() else {
            tracing::debug!("stolen notification with non-string lock id");
            return Ok(Json::Null);
        };
        if let Some(callback) = reg.locks.get(lock_id).map(|entry| Arc::clone(entry.value()))
        {
            callback.stolen(lock_id);
        } else {
            tracing::debug!("stolen notification for unregistered lock {}", lock_id);
        }
        Ok(Json::Null)
    })?;

    Ok(())
}

/// Reads the socket, splits messages, and feeds them to the engine in
/// arrival order. Any fatal condition tears the whole session down.
async fn dispatch_loop(
    inner: Arc<ClientInner>,
    mut reader: ReadHalf<ClientStream>,
    buffer_size: usize,
) {
    let mut decoder = Decoder::new();
    let mut buf = vec![0u8; buffer_size];
    let reason = 'read: loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break 'read "connection closed by peer".to_string(),
            Ok(n) => n,
            Err(e) => break 'read format!("read failed: {e}"),
        };
        decoder.extend(&buf[..n]);
        loop {
            match decoder.decode_message() {
                Ok(Some(message)) => {
                    if let Err(e) = inner.engine.handle_message(message).await {
                        break 'read format!("message handling failed: {e}");
                    }
                }
                Ok(None) => break,
                Err(e) => break 'read format!("inbound stream corrupted: {e}"),
            }
        }
    };
    tracing::debug!("session ending: {}", reason);
    inner.active.store(false, Ordering::SeqCst);
    inner.engine.shutdown().await;
    inner.registries.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use rovsdb_protocol::MonitorRequest;

    fn test_client() -> (Client, Arc<MockTransport>) {
        let mock = MockTransport::new();
        let client = Client::assemble(mock.clone(), &ClientConfig::default()).unwrap();
        (client, mock)
    }

    /// Waits for the nth outbound request, then feeds back a success
    /// response carrying `result`.
    async fn respond_next(client: &Client, mock: &Arc<MockTransport>, nth: usize, result: Json) {
        while mock.sent_count() <= nth {
            tokio::task::yield_now().await;
        }
        let sent = mock.sent();
        let id = sent[nth]["id"].as_str().expect("request has id").to_string();
        client
            .inner
            .engine
            .handle_message(json!({"id": id, "result": result, "error": null}))
            .await
            .unwrap();
    }

    async fn respond_error(client: &Client, mock: &Arc<MockTransport>, nth: usize, error: &str) {
        while mock.sent_count() <= nth {
            tokio::task::yield_now().await;
        }
        let sent = mock.sent();
        let id = sent[nth]["id"].as_str().expect("request has id").to_string();
        client
            .inner
            .engine
            .handle_message(json!({"id": id, "result": null, "error": error}))
            .await
            .unwrap();
    }

    #[derive(Default)]
    struct RecordingMonitor {
        updates: parking_lot::Mutex<Vec<TableUpdates>>,
    }

    impl MonitorCallback for RecordingMonitor {
        fn update(&self, updates: TableUpdates) {
            self.updates.lock().push(updates);
        }
    }

    #[derive(Default)]
    struct RecordingLock {
        events: parking_lot::Mutex<Vec<String>>,
    }

    impl LockCallback for RecordingLock {
        fn locked(&self, lock: &str) {
            self.events.lock().push(format!("locked:{lock}"));
        }

        fn stolen(&self, lock: &str) {
            self.events.lock().push(format!("stolen:{lock}"));
        }
    }

    #[tokio::test]
    async fn test_list_dbs() {
        let (client, mock) = test_client();
        let (dbs, _) = tokio::join!(
            client.list_dbs(),
            respond_next(&client, &mock, 0, json!(["Open_vSwitch", "hardware_vtep"])),
        );
        assert_eq!(
            dbs.unwrap(),
            vec!["Open_vSwitch".to_string(), "hardware_vtep".to_string()]
        );
        assert_eq!(
            mock.sent()[0],
            json!({"method": "list_dbs", "params": [], "id": "1"})
        );
    }

    #[tokio::test]
    async fn test_get_schema() {
        let (client, mock) = test_client();
        let schema_json = json!({
            "name": "Open_vSwitch",
            "version": "8.3.0",
            "tables": {"Bridge": {"columns": {"name": {"type": "string"}}}},
        });
        let (schema, _) = tokio::join!(
            client.get_schema("Open_vSwitch"),
            respond_next(&client, &mock, 0, schema_json),
        );
        let schema = schema.unwrap();
        assert_eq!(schema.name, "Open_vSwitch");
        assert!(schema.table("Bridge").is_some());
        assert_eq!(mock.sent()[0]["params"], json!(["Open_vSwitch"]));
    }

    #[tokio::test]
    async fn test_transact_positional_decoding() {
        let (client, mock) = test_client();
        let operations = vec![
            Operation::insert("Bridge", rovsdb_protocol::Row::new().with("name", "br0")),
            Operation::delete("Port", vec![]),
        ];
        let reply = json!([
            {"uuid": ["uuid", "36bef046-7da7-43a5-905a-c17899216fcb"]},
            {"count": 0},
        ]);
        let (results, _) = tokio::join!(
            client.transact("Open_vSwitch", operations),
            respond_next(&client, &mock, 0, reply),
        );
        let results = results.unwrap();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], OperationResult::Insert { .. }));
        assert_eq!(results[1], OperationResult::Update { count: 0 });

        let request = &mock.sent()[0];
        assert_eq!(request["method"], json!("transact"));
        assert_eq!(request["params"][0], json!("Open_vSwitch"));
        assert_eq!(request["params"][1]["op"], json!("insert"));
        assert_eq!(request["params"][2]["op"], json!("delete"));
    }

    #[tokio::test]
    async fn test_monitor_lifecycle() {
        let (client, mock) = test_client();
        let callback = Arc::new(RecordingMonitor::default());
        let requests = MonitorRequests::new().with_table("Bridge", MonitorRequest::default());

        let initial_json = json!({
            "Bridge": {
                "36bef046-7da7-43a5-905a-c17899216fcb": {"new": {"name": "br0"}}
            }
        });
        let (initial, _) = tokio::join!(
            client.monitor("Open_vSwitch", "m1", requests, callback.clone()),
            respond_next(&client, &mock, 0, initial_json),
        );
        let initial = initial.unwrap();
        assert!(initial.table("Bridge").is_some());
        assert_eq!(
            mock.sent()[0]["params"],
            json!(["Open_vSwitch", "m1", {"Bridge": {}}])
        );

        // an update notification now reaches the callback
        let update = json!({
            "method": "update",
            "params": ["m1", {"Bridge": {
                "f9bf38ba-8fd0-466e-9dc8-7f0d47e2f446": {"new": {"name": "br1"}}
            }}],
            "id": null,
        });
        client.inner.engine.handle_message(update.clone()).await.unwrap();
        assert_eq!(callback.updates.lock().len(), 1);
        assert!(callback.updates.lock()[0].table("Bridge").is_some());
        // notifications get no reply
        assert_eq!(mock.sent_count(), 1);

        // after cancellation the same notification goes nowhere
        let (cancelled, _) = tokio::join!(
            client.monitor_cancel("m1"),
            respond_next(&client, &mock, 1, json!({})),
        );
        cancelled.unwrap();
        client.inner.engine.handle_message(update).await.unwrap();
        assert_eq!(callback.updates.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_monitor_leaves_no_registration() {
        let (client, mock) = test_client();
        let callback = Arc::new(RecordingMonitor::default());

        let (result, _) = tokio::join!(
            client.monitor("db", "m1", MonitorRequests::new(), callback),
            respond_error(&client, &mock, 0, "unknown database"),
        );
        assert!(matches!(result.unwrap_err(), ClientError::Remote(_)));
        assert!(client.inner.registries.monitors.is_empty());
    }

    #[tokio::test]
    async fn test_update_for_unknown_monitor_is_silent() {
        let (client, mock) = test_client();
        client
            .inner
            .engine
            .handle_message(json!({
                "method": "update",
                "params": ["nobody", {"T": {}}],
                "id": null,
            }))
            .await
            .unwrap();
        assert_eq!(mock.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_lock_lifecycle_with_notifications() {
        let (client, mock) = test_client();
        let callback = Arc::new(RecordingLock::default());

        // the lock is contended: granted=false, callback registered anyway
        let (result, _) = tokio::join!(
            client.lock("config", callback.clone()),
            respond_next(&client, &mock, 0, json!({"locked": false})),
        );
        assert!(!result.unwrap().locked);
        assert_eq!(mock.sent()[0], json!({"method": "lock", "params": ["config"], "id": "1"}));

        client
            .inner
            .engine
            .handle_message(json!({"method": "locked", "params": ["config"], "id": null}))
            .await
            .unwrap();
        client
            .inner
            .engine
            .handle_message(json!({"method": "stolen", "params": ["config"], "id": null}))
            .await
            .unwrap();
        assert_eq!(
            *callback.events.lock(),
            vec!["locked:config".to_string(), "stolen:config".to_string()]
        );

        // unlock removes the registration; later notifications are dropped
        let (unlocked, _) = tokio::join!(
            client.unlock("config"),
            respond_next(&client, &mock, 1, json!({})),
        );
        unlocked.unwrap();
        client
            .inner
            .engine
            .handle_message(json!({"method": "locked", "params": ["config"], "id": null}))
            .await
            .unwrap();
        assert_eq!(callback.events.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_steal_uses_its_own_method() {
        let (client, mock) = test_client();
        let callback = Arc::new(RecordingLock::default());
        let (result, _) = tokio::join!(
            client.steal("config", callback),
            respond_next(&client, &mock, 0, json!({"locked": true})),
        );
        assert!(result.unwrap().locked);
        assert_eq!(mock.sent()[0]["method"], json!("steal"));
        assert!(client.inner.registries.locks.contains_key("config"));
    }

    #[tokio::test]
    async fn test_echo_probe() {
        let (client, mock) = test_client();
        let (echoed, _) = tokio::join!(
            client.echo(),
            respond_next(&client, &mock, 0, json!([])),
        );
        assert_eq!(echoed.unwrap(), Vec::<Json>::new());
        assert_eq!(mock.sent()[0]["method"], json!("echo"));
    }

    #[tokio::test]
    async fn test_server_echo_is_answered_identically() {
        let (client, mock) = test_client();
        client
            .inner
            .engine
            .handle_message(json!({"method": "echo", "params": [1, "two"], "id": "e1"}))
            .await
            .unwrap();
        assert_eq!(
            mock.sent(),
            vec![json!({"result": [1, "two"], "error": null, "id": "e1"})]
        );
    }

    #[tokio::test]
    async fn test_session_ids_are_monotonic() {
        let (client, mock) = test_client();
        let (a, b, c, _) = tokio::join!(
            client.list_dbs(),
            client.echo(),
            client.echo(),
            async {
                for nth in 0..3 {
                    respond_next(&client, &mock, nth, json!([])).await;
                }
            },
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        let mut ids: Vec<String> = mock
            .sent()
            .iter()
            .map(|m| m["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["1".to_string(), "2".to_string(), "3".to_string()]);
    }

    #[tokio::test]
    async fn test_shutdown_is_one_shot_and_fails_fast() {
        let (client, mock) = test_client();
        let callback = Arc::new(RecordingMonitor::default());
        let (_, _) = tokio::join!(
            client.monitor("db", "m1", MonitorRequests::new(), callback),
            respond_next(&client, &mock, 0, json!({})),
        );
        assert!(!client.inner.registries.monitors.is_empty());

        client.shutdown().await;
        assert!(!client.is_active());
        assert_eq!(mock.close_count(), 1);
        assert!(client.inner.registries.monitors.is_empty());

        assert!(matches!(
            client.list_dbs().await.unwrap_err(),
            ClientError::NotActive
        ));
        assert!(matches!(
            client.echo().await.unwrap_err(),
            ClientError::NotActive
        ));

        client.shutdown().await;
        assert_eq!(mock.close_count(), 1);
    }
}
