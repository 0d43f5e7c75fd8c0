use clap::Parser;
use simple_cache::config::{init_logging, ClientArgs};
use simple_cache::debugger::DebuggerClient;
use simple_cache::*;
use std::net::SocketAddr;
use std::time::Duration;
use tarpc::tokio_serde::formats::Json;
use tarpc::{client, context};
use tracing::info;

fn call_context() -> context::Context {
    let mut ctx = context::current();
    ctx.deadline = context::current().deadline + Duration::from_secs(5);
    ctx
}

async fn run_scenario(server_addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    info!(%server_addr, "connecting to server");
    let transport = tarpc::serde_transport::tcp::connect(server_addr, Json::default).await?;
    let client = SimpleCacheClient::new(client::Config::default(), transport).spawn();

    println!("================== SET ==================");
    let response = client
        .set(
            call_context(),
            SetRequest {
                key: "hello".to_string(),
                value: "world".to_string(),
            },
        )
        .await?;
    println!("{}", response.ok);

    println!("================== GET ==================");
    let found = client
        .get(
            call_context(),
            GetRequest {
                key: "hello".to_string(),
            },
        )
        .await??;
    println!("{} : {}", found.key, found.value);

    println!("================== DEL ==================");
    let response = client
        .del(
            call_context(),
            DelRequest {
                key: "hello".to_string(),
            },
        )
        .await?;
    println!("{}", response.ok);

    println!("================== GET ==================");
    let missing = client
        .get(
            call_context(),
            GetRequest {
                key: "hello".to_string(),
            },
        )
        .await?;
    match missing {
        Err(e) => println!("{} (status {})", e, e.code()),
        Ok(found) => println!("unexpected value {} : {}", found.key, found.value),
    }

    Ok(())
}

async fn print_debug_logs(debugger_addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let transport = tarpc::serde_transport::tcp::connect(debugger_addr, Json::default).await?;
    let client = DebuggerClient::new(client::Config::default(), transport).spawn();

    println!("================== DEBUG LOGS ==================");
    for record in client.debug_logs(call_context()).await? {
        println!(
            "{} {} [{}] {}",
            record.epoch_ms, record.method, record.trace_id, record.request
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ClientArgs::parse();
    init_logging(args.verbose);

    run_scenario(args.server).await?;

    if let Some(debugger_addr) = args.logs {
        print_debug_logs(debugger_addr).await?;
    }
    Ok(())
}
