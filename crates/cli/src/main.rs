mod cli;
mod config;
mod report;
mod terminal;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use netsoc_core::Config;
use netsoc_detect::summary::AlertSummary;
use netsoc_detect::{build_timeline, generate_alerts_with_iocs, hosts, IocList};
use netsoc_ingest::embedding::create_embedder;
use netsoc_ingest::{load_corpus, load_events, tactic_seeds, LoadedDataset};
use netsoc_llm::{create_provider, map_episodes_to_tactics, RetrievalIndex, TacticMappings};

use crate::cli::{AnalyzeArgs, CliArgs, Command, StatsArgs};
use crate::config::{apply_flags, CliConfig};
use crate::report::{Report, StatsReport};
use crate::terminal::Terminal;

fn load(path: &Path) -> Result<LoadedDataset> {
    load_events(path).with_context(|| format!("failed to load {}", path.display()))
}

/// `--iocs` must load; the configured default is used only when it exists.
fn ioc_list(args: &AnalyzeArgs, config: &Config) -> Result<Option<IocList>> {
    let path = match &args.iocs {
        Some(path) => path.clone(),
        None if config.data.ioc_path.is_file() => config.data.ioc_path.clone(),
        None => return Ok(None),
    };
    let list = IocList::load(&path).context("failed to load IOC list")?;
    Ok(Some(list))
}

async fn map_tactics(config: &Config, episodes: &[netsoc_core::Episode]) -> Result<TacticMappings> {
    let embedder = create_embedder(&config.embedding, &config.ollama, &config.llm)
        .context("failed to create embedder")?;
    let provider = create_provider(&config.llm, &config.ollama)
        .context("failed to create LLM provider")?;

    let docs = load_corpus(&config.data.corpus_dir).unwrap_or_else(|e| {
        warn!(error = %e, "corpus unreadable, using tactic seeds only");
        tactic_seeds()
    });
    let mut index = RetrievalIndex::new(embedder)
        .with_batch_size(config.embedding.batch_size as usize);
    index
        .add_documents(docs)
        .await
        .context("failed to index reference corpus")?;

    Ok(map_episodes_to_tactics(episodes, Arc::new(index), provider, &config.mapper).await)
}

async fn analyze(
    args: &AnalyzeArgs,
    mut config: Config,
    overrides: &CliConfig,
    terminal: &Terminal,
) -> Result<()> {
    overrides.apply(&mut config.detection);
    apply_flags(args, &mut config.detection);

    let dataset = load(&args.path)?;
    let stats = dataset.stats();

    let iocs = ioc_list(args, &config)?;
    let alerts = generate_alerts_with_iocs(&dataset.events, &config.detection, iocs.as_ref());
    let episodes = build_timeline(&alerts, config.detection.gap_seconds)
        .context("failed to build incident timeline")?;
    info!(alerts = alerts.len(), episodes = episodes.len(), "analysis complete");

    let mappings = if args.map {
        Some(map_tactics(&config, &episodes).await?)
    } else {
        None
    };

    let report = Report {
        source: args.path.display().to_string(),
        stats,
        summary: AlertSummary::from_alerts(&alerts),
        alerts,
        episodes,
        mappings,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        terminal.print_report(&report)?;
    }
    Ok(())
}

fn stats(args: &StatsArgs, overrides: &CliConfig, terminal: &Terminal) -> Result<()> {
    let dataset = load(&args.path)?;
    let report = StatsReport {
        source: args.path.display().to_string(),
        stats: dataset.stats(),
        top_hosts: hosts::top_hosts(&dataset.events, overrides.top_hosts(args.top)),
    };
    terminal.print_stats(&report)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let terminal = Terminal::new(!args.no_color);

    netsoc_core::config::load_dotenv();
    let config = Config::from_env();
    let overrides = CliConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;

    let result = match &args.command {
        Command::Analyze(a) => analyze(a, config, &overrides, &terminal).await,
        Command::Stats(s) => stats(s, &overrides, &terminal),
    };

    if let Err(e) = result {
        terminal.print_error(&format!("{e:#}"))?;
        std::process::exit(1);
    }
    Ok(())
}
