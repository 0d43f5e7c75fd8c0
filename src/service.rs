use std::sync::Arc;

use futures::future;
use tarpc::context;
use tracing::debug;

use crate::error::CacheError;
use crate::store::{CacheStore, CallContext};
use crate::{
    DelRequest, DelResponse, GetRequest, GetResponse, SetRequest, SetResponse, SimpleCache,
};

/// RPC face of a [`CacheStore`]. Cloned once per request by tarpc; all clones
/// share the same store.
#[derive(Clone)]
pub struct CacheServer {
    store: Arc<CacheStore>,
}

impl CacheServer {
    pub fn new(store: Arc<CacheStore>) -> Self {
        CacheServer { store }
    }
}

fn call_context(method: &str, ctx: &context::Context) -> CallContext {
    CallContext::new(method, ctx.trace_context.trace_id.to_string())
}

impl SimpleCache for CacheServer {
    // Need to define the future types for tarpc
    type SetFut = future::Ready<SetResponse>;
    type GetFut = future::Ready<Result<GetResponse, CacheError>>;
    type DelFut = future::Ready<DelResponse>;

    fn set(self, ctx: context::Context, req: SetRequest) -> Self::SetFut {
        debug!(key = %req.key, "set");
        future::ready(self.store.set_from(&call_context("SimpleCache.Set", &ctx), req))
    }

    fn get(self, _: context::Context, req: GetRequest) -> Self::GetFut {
        let response = self.store.get(req);
        if let Err(e) = &response {
            debug!(error = %e, "get missed");
        }
        future::ready(response)
    }

    fn del(self, _: context::Context, req: DelRequest) -> Self::DelFut {
        debug!(key = %req.key, "del");
        future::ready(self.store.del(req))
    }
}
