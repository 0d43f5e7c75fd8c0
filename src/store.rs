use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::debugger::{DebugObserver, DebugRecord};
use crate::error::{CacheError, Result};
use crate::{DelRequest, DelResponse, GetRequest, GetResponse, SetRequest, SetResponse};

/// Who issued a call, as far as the diagnostic record cares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub method: String,
    pub trace_id: String,
}

impl CallContext {
    pub fn new(method: impl Into<String>, trace_id: impl Into<String>) -> Self {
        CallContext {
            method: method.into(),
            trace_id: trace_id.into(),
        }
    }

    /// Context for calls made in-process, without an RPC trace.
    pub fn local(method: impl Into<String>) -> Self {
        CallContext::new(method, "local")
    }
}

/// In-memory key-value store backing the cache service.
///
/// Every operation takes the same lock, so set, get and del are serialized
/// with respect to each other. The optional observer only sees Set calls and
/// can never change their outcome.
pub struct CacheStore {
    entries: Mutex<HashMap<String, String>>,
    observer: Option<Arc<dyn DebugObserver>>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> CacheStore {
        CacheStore {
            entries: Mutex::new(HashMap::new()),
            observer: None,
        }
    }

    pub fn with_observer(observer: Arc<dyn DebugObserver>) -> CacheStore {
        CacheStore {
            entries: Mutex::new(HashMap::new()),
            observer: Some(observer),
        }
    }

    pub fn set(&self, req: SetRequest) -> SetResponse {
        self.set_from(&CallContext::local("set"), req)
    }

    pub fn set_from(&self, ctx: &CallContext, req: SetRequest) -> SetResponse {
        if let Some(observer) = &self.observer {
            observer.observe(DebugRecord::capture(ctx, &req));
        }
        self.entries().insert(req.key, req.value);
        SetResponse { ok: true }
    }

    pub fn get(&self, req: GetRequest) -> Result<GetResponse> {
        match self.entries().get(&req.key) {
            Some(value) => Ok(GetResponse {
                value: value.clone(),
                key: req.key,
            }),
            None => Err(CacheError::NotFound { key: req.key }),
        }
    }

    pub fn del(&self, req: DelRequest) -> DelResponse {
        self.entries().remove(&req.key);
        DelResponse { ok: true }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    // A poisoned lock can only come from a panic between single map calls,
    // which leaves the map itself consistent.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
