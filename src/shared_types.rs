use serde::{Deserialize, Serialize};

pub mod config;
pub mod debugger;
pub mod error;
pub mod limits;
pub mod service;
pub mod store;

pub use error::CacheError;
pub use service::CacheServer;
pub use store::{CacheStore, CallContext};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResponse {
    pub ok: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelRequest {
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelResponse {
    pub ok: bool,
}

#[tarpc::service]
pub trait SimpleCache {
    /// Insert or overwrite a key
    async fn set(req: SetRequest) -> SetResponse;
    /// Get a value by key, `CacheError::NotFound` when the key has no mapping
    async fn get(req: GetRequest) -> Result<GetResponse, CacheError>;
    /// Delete a key, succeeds whether or not it was present
    async fn del(req: DelRequest) -> DelResponse;
}
