use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use clap::Parser;

pub const DEFAULT_PORT: u16 = 8899;
pub const DEFAULT_DEBUGGER_PORT: u16 = 6001;
pub const DEFAULT_ADDRESS: IpAddr = IpAddr::V6(Ipv6Addr::LOCALHOST);
pub const MAX_CONNECTIONS: usize = 10;
pub const MAX_CONNECTIONS_PER_IP: usize = 1;
pub const HISTORY_SIZE: u32 = 10;

/// Cache server command line.
#[derive(Debug, Parser)]
#[command(name = "kv-server", about = "Key-value cache served over tarpc")]
pub struct ServerArgs {
    /// Interface to listen on
    #[arg(short, long, default_value_t = DEFAULT_ADDRESS)]
    pub listen: IpAddr,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Max simultaneous connections
    #[arg(short = 'c', long, default_value_t = MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Max simultaneous connections from one IP address
    #[arg(long, default_value_t = MAX_CONNECTIONS_PER_IP, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_connections_per_ip: usize,

    /// Address of a debugger that receives a record for every Set
    #[arg(long)]
    pub debug_sink: Option<SocketAddr>,

    /// Sets the level of verbosity
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ServerArgs {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }
}

/// Debugger command line.
#[derive(Debug, Parser)]
#[command(name = "debugger", about = "Keeps the most recent debug records sent by the cache server")]
pub struct DebuggerArgs {
    /// Interface to listen on
    #[arg(short, long, default_value_t = DEFAULT_ADDRESS)]
    pub listen: IpAddr,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_DEBUGGER_PORT)]
    pub port: u16,

    /// Number of records to keep
    #[arg(long, default_value_t = HISTORY_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    pub history_size: u32,

    /// Sets the level of verbosity
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl DebuggerArgs {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }
}

/// Client command line.
#[derive(Debug, Parser)]
#[command(name = "client", about = "Runs set/get/del against a cache server")]
pub struct ClientArgs {
    /// Cache server address
    #[arg(short, long, default_value_t = SocketAddr::new(DEFAULT_ADDRESS, DEFAULT_PORT))]
    pub server: SocketAddr,

    /// Debugger address to fetch recent debug records from
    #[arg(long)]
    pub logs: Option<SocketAddr>,

    /// Sets the level of verbosity
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Map the number of `-v` flags to a log level.
pub fn log_level(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

pub fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .init();
}
