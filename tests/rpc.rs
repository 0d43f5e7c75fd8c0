use simple_cache::debugger::{
    DebugHistory, DebugObserver, DebugRecord, Debugger, DebuggerClient, DebuggerServer,
    RemoteDebugObserver,
};
use simple_cache::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tarpc::server::{self, Channel};
use tarpc::{client, context};

fn start_cache(store: CacheStore) -> SimpleCacheClient {
    let (client_transport, server_transport) = tarpc::transport::channel::unbounded();
    let channel = server::BaseChannel::with_defaults(server_transport);
    tokio::spawn(channel.execute(CacheServer::new(Arc::new(store)).serve()));
    SimpleCacheClient::new(client::Config::default(), client_transport).spawn()
}

fn start_debugger(history_size: usize) -> DebuggerClient {
    let (client_transport, server_transport) = tarpc::transport::channel::unbounded();
    let history = Arc::new(Mutex::new(DebugHistory::new(history_size)));
    let channel = server::BaseChannel::with_defaults(server_transport);
    tokio::spawn(channel.execute(DebuggerServer::new(history).serve()));
    DebuggerClient::new(client::Config::default(), client_transport).spawn()
}

fn set_req(key: &str, value: &str) -> SetRequest {
    SetRequest {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn get_req(key: &str) -> GetRequest {
    GetRequest {
        key: key.to_string(),
    }
}

fn del_req(key: &str) -> DelRequest {
    DelRequest {
        key: key.to_string(),
    }
}

#[tokio::test]
async fn hello_world_over_rpc() {
    let client = start_cache(CacheStore::new());

    let set = client.set(context::current(), set_req("hello", "world")).await.unwrap();
    assert!(set.ok);

    let found = client.get(context::current(), get_req("hello")).await.unwrap();
    assert_eq!(
        found,
        Ok(GetResponse {
            key: "hello".to_string(),
            value: "world".to_string(),
        })
    );

    let del = client.del(context::current(), del_req("hello")).await.unwrap();
    assert!(del.ok);

    let missing = client.get(context::current(), get_req("hello")).await.unwrap();
    let err = missing.unwrap_err();
    assert_eq!(
        err,
        CacheError::NotFound {
            key: "hello".to_string()
        }
    );
    assert_eq!(err.code(), 5);
}

#[tokio::test]
async fn missing_key_on_empty_store_is_not_found() {
    let client = start_cache(CacheStore::new());
    let missing = client.get(context::current(), get_req("missing")).await.unwrap();
    assert!(matches!(missing, Err(CacheError::NotFound { key }) if key == "missing"));
}

#[tokio::test]
async fn del_twice_is_ok() {
    let client = start_cache(CacheStore::new());
    for _ in 0..2 {
        let del = client.del(context::current(), del_req("never-set")).await.unwrap();
        assert!(del.ok);
    }
}

#[tokio::test]
async fn concurrent_sets_resolve_to_one_value() {
    let client = start_cache(CacheStore::new());

    let writes = (0..32).map(|i| {
        let client = client.clone();
        let value = if i % 2 == 0 { "a" } else { "b" };
        async move { client.set(context::current(), set_req("k", value)).await }
    });
    for set in futures::future::join_all(writes).await {
        assert!(set.unwrap().ok);
    }

    let found = client.get(context::current(), get_req("k")).await.unwrap().unwrap();
    assert!(found.value == "a" || found.value == "b");
}

#[tokio::test]
async fn set_is_forwarded_to_debugger() {
    let debugger = start_debugger(10);
    let observer = RemoteDebugObserver::from_client(debugger.clone());
    let client = start_cache(CacheStore::with_observer(Arc::new(observer)));

    client.set(context::current(), set_req("hello", "world")).await.unwrap();
    client.get(context::current(), get_req("hello")).await.unwrap().unwrap();

    let mut records = Vec::new();
    for _ in 0..50 {
        records = debugger.debug_logs(context::current()).await.unwrap();
        if !records.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].method, "SimpleCache.Set");
    assert_eq!(records[0].request["key"], "hello");
    assert_eq!(records[0].request["value"], "world");
}

#[tokio::test]
async fn debugger_answers_ok_and_keeps_newest_first() {
    let debugger = start_debugger(2);
    for n in 1..=3u64 {
        let record = DebugRecord {
            epoch_ms: n,
            method: "set".to_string(),
            trace_id: n.to_string(),
            request: serde_json::Value::Null,
        };
        let answer = debugger.send_debug_info(context::current(), record).await.unwrap();
        assert_eq!(answer, "OK");
    }

    let stamps: Vec<u64> = debugger
        .debug_logs(context::current())
        .await
        .unwrap()
        .iter()
        .map(|r| r.epoch_ms)
        .collect();
    assert_eq!(stamps, vec![3, 2]);
}

#[tokio::test]
async fn unreachable_debugger_does_not_affect_set() {
    let (client_transport, server_transport) = tarpc::transport::channel::unbounded();
    drop(server_transport);
    let dead = DebuggerClient::new(client::Config::default(), client_transport).spawn();
    let observer = RemoteDebugObserver::from_client(dead);
    let client = start_cache(CacheStore::with_observer(Arc::new(observer)));

    for n in 0..3 {
        let set = client
            .set(context::current(), set_req("k", &n.to_string()))
            .await
            .unwrap();
        assert!(set.ok);
    }
    let found = client.get(context::current(), get_req("k")).await.unwrap().unwrap();
    assert_eq!(found.value, "2");
}

#[tokio::test]
async fn full_queue_drops_records_without_blocking() {
    let (client_transport, _server_transport) = tarpc::transport::channel::unbounded();
    let stalled = DebuggerClient::new(client::Config::default(), client_transport).spawn();
    let observer = RemoteDebugObserver::from_client(stalled);

    let started = std::time::Instant::now();
    for n in 0..1_000u64 {
        observer.observe(DebugRecord {
            epoch_ms: n,
            method: "set".to_string(),
            trace_id: n.to_string(),
            request: serde_json::Value::Null,
        });
    }
    assert!(started.elapsed() < Duration::from_secs(1));
}
