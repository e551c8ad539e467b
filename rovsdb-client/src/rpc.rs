//! Request/response correlation engine.
//!
//! One engine serves both roles of the protocol. As caller it issues
//! requests, matches inbound responses back to waiting callers, and holds
//! a deadline over every outstanding call. As callee it routes inbound
//! requests through the handler table and answers the ones that carry an
//! id.
//!
//! The pending-call table is the synchronization point: a call resolves by
//! whichever of {response, deadline, shutdown} removes its entry first,
//! and the losers observe the entry gone and do nothing.

use crate::dispatch::HandlerTable;
use crate::error::ClientError;
use crate::transport::Transport;
use parking_lot::Mutex;
use rovsdb_protocol::{Encoder, Message, Request, Response};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

type CallOutcome = Result<Json, ClientError>;

/// Engine-side record of one outstanding call.
struct PendingCall {
    tx: oneshot::Sender<CallOutcome>,
    timer: Option<JoinHandle<()>>,
}

struct PendingTable {
    closed: bool,
    calls: HashMap<String, PendingCall>,
}

struct EngineInner {
    transport: Arc<dyn Transport>,
    handlers: HandlerTable,
    call_timeout: Duration,
    pending: Mutex<PendingTable>,
}

/// The correlation engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct RpcEngine {
    inner: Arc<EngineInner>,
}

impl RpcEngine {
    /// Builds an engine over `transport`. The handler table is sealed
    /// here; no handlers can be added once the engine is running.
    pub fn new(
        transport: Arc<dyn Transport>,
        handlers: HandlerTable,
        call_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                transport,
                handlers,
                call_timeout,
                pending: Mutex::new(PendingTable {
                    closed: false,
                    calls: HashMap::new(),
                }),
            }),
        }
    }

    /// Issues a request and returns a handle for its eventual result.
    ///
    /// `id` must not collide with an outstanding call; a duplicate is
    /// rejected before anything reaches the transport. If the send itself
    /// fails, the call is rolled back completely before the error is
    /// returned.
    pub async fn call<R: DeserializeOwned>(
        &self,
        id: impl Into<String>,
        method: impl Into<String>,
        params: Vec<Json>,
    ) -> Result<CallHandle<R>, ClientError> {
        let id = id.into();
        let method = method.into();
        let (tx, rx) = oneshot::channel();
        {
            let mut table = self.inner.pending.lock();
            if table.closed {
                return Err(ClientError::ConnectionClosed);
            }
            match table.calls.entry(id.clone()) {
                Entry::Occupied(_) => return Err(ClientError::DuplicateId(id)),
                Entry::Vacant(entry) => {
                    entry.insert(PendingCall { tx, timer: None });
                }
            }
        }

        let request = Request::new(id.clone(), method.clone(), params);
        let bytes = match Encoder::encode_request(&request) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.inner.pending.lock().calls.remove(&id);
                return Err(e.into());
            }
        };
        if let Err(e) = self.inner.transport.send(bytes).await {
            self.inner.pending.lock().calls.remove(&id);
            return Err(e.into());
        }
        tracing::debug!("sent request id={} method={}", id, method);

        self.arm_deadline(&id);
        Ok(CallHandle {
            id,
            rx,
            _marker: PhantomData,
        })
    }

    /// Sends a notification: no id, no pending call, no reply expected.
    pub async fn notify(
        &self,
        method: impl Into<String>,
        params: Vec<Json>,
    ) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::ConnectionClosed);
        }
        let request = Request::notification(method, params);
        let bytes = Encoder::encode_request(&request)?;
        self.inner.transport.send(bytes).await?;
        Ok(())
    }

    /// Feeds one inbound message through the engine.
    ///
    /// An error from here is fatal to the session: either the stream
    /// produced something unclassifiable, or the engine is already shut
    /// down. Per-call failures never surface here; they resolve the
    /// affected call instead.
    pub async fn handle_message(&self, message: Json) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::ConnectionClosed);
        }
        match Message::classify(message)? {
            Message::Response(response) => {
                self.handle_response(response);
                Ok(())
            }
            Message::Request(request) => self.handle_request(request).await,
        }
    }

    fn handle_response(&self, response: Response) {
        let Some(id) = response.id.clone() else {
            tracing::debug!("dropping response with null id");
            return;
        };
        let outcome = match response.error_text() {
            Some(reason) => Err(ClientError::Remote(reason)),
            None => Ok(response.result),
        };
        if !self.resolve(&id, outcome) {
            tracing::debug!("dropping response for unknown id={}", id);
        }
    }

    async fn handle_request(&self, request: Request) -> Result<(), ClientError> {
        let Request { method, params, id } = request;
        let outcome = match self.inner.handlers.dispatch(&method, params) {
            Some(outcome) => outcome,
            None => {
                tracing::debug!("no handler for method={}", method);
                Err(format!("unknown method `{method}`"))
            }
        };
        let Some(id) = id else {
            // notifications are never answered, not even with errors
            if let Err(reason) = outcome {
                tracing::debug!("notification method={} failed: {}", method, reason);
            }
            return Ok(());
        };
        let response = match outcome {
            Ok(result) => Response::ok(id, result),
            Err(reason) => Response::error(id, reason),
        };
        let bytes = Encoder::encode_response(&response)?;
        self.inner.transport.send(bytes).await?;
        Ok(())
    }

    /// Shuts the engine down: closes the transport, then fails every
    /// outstanding call with a connection-closed error. Idempotent; only
    /// the first caller does any work.
    pub async fn shutdown(&self) {
        let calls = {
            let mut table = self.inner.pending.lock();
            if table.closed {
                return;
            }
            table.closed = true;
            std::mem::take(&mut table.calls)
        };
        tracing::debug!("engine shutting down, failing {} pending calls", calls.len());
        self.inner.transport.close().await;
        for (_, call) in calls {
            let _ = call.tx.send(Err(ClientError::ConnectionClosed));
            if let Some(timer) = call.timer {
                timer.abort();
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.pending.lock().closed
    }

    /// Number of calls awaiting resolution.
    pub fn pending_calls(&self) -> usize {
        self.inner.pending.lock().calls.len()
    }

    /// Claims and resolves one pending call. `false` means the id had no
    /// pending call: never issued, or another path already resolved it.
    fn resolve(&self, id: &str, outcome: CallOutcome) -> bool {
        let call = self.inner.pending.lock().calls.remove(id);
        match call {
            Some(call) => {
                // the receiver may be gone if the caller stopped waiting
                let _ = call.tx.send(outcome);
                if let Some(timer) = call.timer {
                    timer.abort();
                }
                true
            }
            None => false,
        }
    }

    fn arm_deadline(&self, id: &str) {
        let engine = self.clone();
        let timer_id = id.to_string();
        let timeout = self.inner.call_timeout;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if engine.resolve(&timer_id, Err(ClientError::Timeout)) {
                tracing::debug!("call id={} timed out after {:?}", timer_id, timeout);
            }
        });
        let mut table = self.inner.pending.lock();
        match table.calls.get_mut(id) {
            Some(call) => call.timer = Some(timer),
            // the response won the race while the timer was being spawned
            None => timer.abort(),
        }
    }
}

/// The caller's half of one outstanding call.
///
/// The typed decode happens here, on receipt: a response that resolves
/// the call but does not match `R` surfaces as
/// [`ClientError::ResultMismatch`], distinct from a server-reported error.
#[derive(Debug)]
pub struct CallHandle<R> {
    id: String,
    rx: oneshot::Receiver<CallOutcome>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: DeserializeOwned> CallHandle<R> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for the call to resolve; the engine's deadline bounds this.
    pub async fn wait(self) -> Result<R, ClientError> {
        match self.rx.await {
            Ok(outcome) => decode_result(outcome?),
            Err(_) => Err(ClientError::ConnectionClosed),
        }
    }

    /// Waits at most `timeout`. Giving up here does not cancel the call;
    /// the engine's own deadline still resolves it eventually.
    pub async fn wait_for(self, timeout: Duration) -> Result<R, ClientError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(outcome)) => decode_result(outcome?),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => Err(ClientError::Timeout),
        }
    }
}

fn decode_result<R: DeserializeOwned>(result: Json) -> Result<R, ClientError> {
    serde_json::from_value(result).map_err(|e| ClientError::ResultMismatch(e.to_string()))
}
