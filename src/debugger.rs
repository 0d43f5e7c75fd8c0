//! Side-channel diagnostics for the cache service.
//!
//! The store hands a [`DebugRecord`] to an optional [`DebugObserver`] on every
//! Set. Observers are best effort: they may drop records but never block or
//! fail the call that produced them. The `debugger` binary hosts the
//! [`Debugger`] RPC service, which keeps the most recent records in a
//! [`DebugHistory`].

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future;
use serde::{Deserialize, Serialize};
use tarpc::tokio_serde::formats::Json;
use tarpc::{client, context};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::store::CallContext;

/// Records waiting to be forwarded before new ones are dropped.
const QUEUE_DEPTH: usize = 256;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugRecord {
    pub epoch_ms: u64,
    pub method: String,
    pub trace_id: String,
    pub request: serde_json::Value,
}

impl DebugRecord {
    /// Snapshot `request` as JSON, stamped with the current time.
    pub fn capture<T: Serialize>(ctx: &CallContext, request: &T) -> DebugRecord {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        DebugRecord {
            epoch_ms,
            method: ctx.method.clone(),
            trace_id: ctx.trace_id.clone(),
            request: serde_json::to_value(request).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Receives debug records from the store.
pub trait DebugObserver: Send + Sync {
    fn observe(&self, record: DebugRecord);
}

/// The last `capacity` records, newest first.
#[derive(Debug)]
pub struct DebugHistory {
    records: VecDeque<DebugRecord>,
    capacity: usize,
}

impl DebugHistory {
    pub fn new(capacity: usize) -> DebugHistory {
        DebugHistory {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: DebugRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_back();
        }
        self.records.push_front(record);
    }

    pub fn snapshot(&self) -> Vec<DebugRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn lock_history(history: &Mutex<DebugHistory>) -> MutexGuard<'_, DebugHistory> {
    history.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observer writing straight into a history owned by the same process.
pub struct HistoryObserver {
    history: Arc<Mutex<DebugHistory>>,
}

impl HistoryObserver {
    pub fn new(history: Arc<Mutex<DebugHistory>>) -> Self {
        HistoryObserver { history }
    }
}

impl DebugObserver for HistoryObserver {
    fn observe(&self, record: DebugRecord) {
        lock_history(&self.history).push(record);
    }
}

#[tarpc::service]
pub trait Debugger {
    /// Store a debug record, always answers "OK"
    async fn send_debug_info(record: DebugRecord) -> String;
    /// Recent debug records, newest first
    async fn debug_logs() -> Vec<DebugRecord>;
}

#[derive(Clone)]
pub struct DebuggerServer {
    history: Arc<Mutex<DebugHistory>>,
}

impl DebuggerServer {
    pub fn new(history: Arc<Mutex<DebugHistory>>) -> Self {
        DebuggerServer { history }
    }
}

impl Debugger for DebuggerServer {
    type SendDebugInfoFut = future::Ready<String>;
    type DebugLogsFut = future::Ready<Vec<DebugRecord>>;

    fn send_debug_info(self, _: context::Context, record: DebugRecord) -> Self::SendDebugInfoFut {
        debug!(method = %record.method, trace_id = %record.trace_id, "debug record received");
        lock_history(&self.history).push(record);
        future::ready("OK".to_string())
    }

    fn debug_logs(self, _: context::Context) -> Self::DebugLogsFut {
        future::ready(lock_history(&self.history).snapshot())
    }
}

/// Observer forwarding records to a remote [`Debugger`].
///
/// Records go through a bounded queue drained by a background task, so
/// `observe` returns immediately. When the queue is full or the sink has gone
/// away the record is dropped.
pub struct RemoteDebugObserver {
    queue: mpsc::Sender<DebugRecord>,
}

impl RemoteDebugObserver {
    /// Connect to a debugger listening on `addr`. Must be called inside a
    /// tokio runtime.
    pub async fn connect(addr: SocketAddr) -> io::Result<Self> {
        let transport = tarpc::serde_transport::tcp::connect(addr, Json::default).await?;
        let client = DebuggerClient::new(client::Config::default(), transport).spawn();
        Ok(Self::from_client(client))
    }

    /// Forward through an already spawned client. Must be called inside a
    /// tokio runtime.
    pub fn from_client(client: DebuggerClient) -> Self {
        let (queue, mut pending) = mpsc::channel::<DebugRecord>(QUEUE_DEPTH);
        tokio::spawn(async move {
            while let Some(record) = pending.recv().await {
                if let Err(e) = client.send_debug_info(context::current(), record).await {
                    warn!(error = %e, "failed to deliver debug record");
                }
            }
        });
        RemoteDebugObserver { queue }
    }
}

impl DebugObserver for RemoteDebugObserver {
    fn observe(&self, record: DebugRecord) {
        if let Err(e) = self.queue.try_send(record) {
            debug!(error = %e, "debug record dropped");
        }
    }
}
