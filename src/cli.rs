use clap::{Parser, Subcommand};
use logbox::humanize::HumanDuration;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "logbox")]
#[command(about = "CI job log query service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP tool server
    Server(ServerArgs),
    /// Drop cached job logs older than the retention period
    Prune(PruneArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct PruneArgs {
    /// Retention period, e.g. `12h` (overrides `cache.retention`)
    #[arg(long)]
    pub retention: Option<HumanDuration>,
}
