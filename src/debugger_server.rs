use clap::Parser;
use futures::future;
use futures_util::StreamExt;
use simple_cache::config::{init_logging, DebuggerArgs};
use simple_cache::debugger::{DebugHistory, Debugger, DebuggerServer};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tarpc::server::{self, Channel};
use tarpc::tokio_serde::formats::Json;
use tokio::signal;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = DebuggerArgs::parse();
    init_logging(args.verbose);

    let history = Arc::new(Mutex::new(DebugHistory::new(args.history_size as usize)));
    let debugger = DebuggerServer::new(history);

    let mut listener = tarpc::serde_transport::tcp::listen(&args.listen_addr(), Json::default).await?;
    listener.config_mut().max_frame_length(usize::MAX);
    info!(address = %listener.local_addr(), history_size = args.history_size, "debugger listening");

    let serving = listener
        .filter_map(|r| future::ready(r.ok()))
        .map(server::BaseChannel::with_defaults)
        .for_each(|channel| {
            let debugger = debugger.clone();
            async move {
                if let Ok(peer) = channel.transport().peer_addr() {
                    debug!(%peer, "debug client connected");
                }
                tokio::spawn(channel.execute(debugger.serve()));
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
