use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Network telemetry triage: alerts, incident episodes and ATT&CK tactics.
#[derive(Parser, Debug)]
#[command(name = "netsoc", version, about = "Network telemetry incident triage")]
pub struct CliArgs {
    /// Path to overrides file (default: ~/.config/netsoc/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run detection and correlation over a telemetry export and print the
    /// incident report
    Analyze(AnalyzeArgs),

    /// Print dataset statistics and the most connected hosts
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Zeek TSV, JSON or NDJSON export
    pub path: PathBuf,

    /// Maximum seconds between alerts of one episode
    #[arg(long)]
    pub gap: Option<i64>,

    /// Rolling window for the volume anomaly scorer
    #[arg(long)]
    pub window: Option<usize>,

    /// |z| above which a volume sample is anomalous
    #[arg(long)]
    pub z_threshold: Option<f64>,

    /// Numeric field scored for volume anomalies
    #[arg(long)]
    pub field: Option<String>,

    /// IOC list, one indicator per line (default: data.ioc_path when present)
    #[arg(long)]
    pub iocs: Option<PathBuf>,

    /// Map episodes to ATT&CK tactics with the configured LLM
    #[arg(long)]
    pub map: bool,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    pub path: PathBuf,

    /// Number of hosts to list
    #[arg(long)]
    pub top: Option<usize>,
}
