use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "manta",
    version,
    about = "A terminal dashboard for service-mesh control planes."
)]
pub struct CliArgs {
    /// Control-plane state snapshot to browse (.yaml/.yml/.json);
    /// defaults to built-in sample data
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Snapshot and config re-check interval in milliseconds
    #[arg(long, default_value_t = 1_500)]
    pub refresh_ms: u64,

    /// Start on a specific tab (mesh, zone, dp, svc, pol)
    #[arg(short, long)]
    pub tab: Option<String>,

    /// Initial filter query for the starting tab
    #[arg(short, long)]
    pub query: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}
