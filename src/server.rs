use clap::Parser;
use futures::future;
use futures_util::StreamExt;
use simple_cache::config::{init_logging, ServerArgs};
use simple_cache::debugger::RemoteDebugObserver;
use simple_cache::limits::ConnectionLimiter;
use simple_cache::*;
use std::error::Error;
use std::sync::Arc;
use tarpc::server::{self, Channel};
use tarpc::tokio_serde::formats::Json;
use tokio::signal;
use tracing::{info, warn};

async fn build_store(args: &ServerArgs) -> CacheStore {
    let Some(sink) = args.debug_sink else {
        return CacheStore::new();
    };
    match RemoteDebugObserver::connect(sink).await {
        Ok(observer) => {
            info!(%sink, "forwarding set requests to debugger");
            CacheStore::with_observer(Arc::new(observer))
        }
        Err(e) => {
            warn!(%sink, error = %e, "debugger unreachable, running without it");
            CacheStore::new()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = ServerArgs::parse();
    init_logging(args.verbose);

    let server = CacheServer::new(Arc::new(build_store(&args).await));
    let limiter = ConnectionLimiter::new(args.max_connections, args.max_connections_per_ip);

    // JSON transport is provided by the json_transport tarpc module. It makes it easy
    // to start up a serde-powered json serialization strategy over TCP.
    let mut listener = tarpc::serde_transport::tcp::listen(&args.listen_addr(), Json::default).await?;
    listener.config_mut().max_frame_length(usize::MAX);

    info!(address = %listener.local_addr(), "server listening");
    info!(
        max_connections = limiter.max_total(),
        max_per_ip = args.max_connections_per_ip,
        "connection limits"
    );

    let serving = listener
        // Ignore accept errors.
        .filter_map(|r| future::ready(r.ok()))
        .map(server::BaseChannel::with_defaults)
        .for_each(|channel| {
            let server = server.clone();
            let limiter = limiter.clone();
            async move {
                let peer_addr = match channel.transport().peer_addr() {
                    Ok(addr) => addr,
                    Err(e) => {
                        warn!(error = %e, "dropping connection without peer address");
                        return;
                    }
                };

                let Some(permit) = limiter.try_acquire(peer_addr.ip()) else {
                    warn!(peer = %peer_addr, active = limiter.active(), "connection limit reached, rejecting");
                    return;
                };
                info!(
                    peer = %peer_addr,
                    active = limiter.active(),
                    from_ip = limiter.active_for(peer_addr.ip()),
                    "new connection"
                );

                // Spawn task to handle this client; requests on the channel run concurrently.
                tokio::spawn(async move {
                    channel.execute(server.serve()).await;

                    drop(permit);
                    info!(peer = %peer_addr, active = limiter.active(), "client disconnected");
                });
            }
        });

    tokio::select! {
        _ = serving => {}
        res = signal::ctrl_c() => {
            res?;
            info!("shutting down");
        }
    }

    Ok(())
}
