use std::io::{self, Write};

use anyhow::Result;
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use netsoc_core::AlertKind;

use crate::report::{self, Report, StatsReport};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const HEADER: Color = Color::Magenta;
    const ALERT: Color = Color::Yellow;
    const SEVERE: Color = Color::Red;
    const EPISODE: Color = Color::Cyan;
    const MAPPING: Color = Color::Green;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
}

fn alert_color(kind: AlertKind) -> Color {
    match kind {
        AlertKind::SshBruteForce
        | AlertKind::RogueDhcpServer
        | AlertKind::HighDataTransfer
        | AlertKind::VolumeAnomaly
        | AlertKind::IocMatch => Colors::SEVERE,
        _ => Colors::ALERT,
    }
}

/// Renders reports to stdout.
pub struct Terminal {
    color: bool,
}

impl Terminal {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn line(&self, out: &mut impl Write, color: Color, text: &str) -> Result<()> {
        if self.color {
            queue!(out, SetForegroundColor(color), Print(text), ResetColor, Print("\n"))?;
        } else {
            queue!(out, Print(text), Print("\n"))?;
        }
        Ok(())
    }

    fn plain(&self, out: &mut impl Write, text: &str) -> Result<()> {
        queue!(out, Print(text), Print("\n"))?;
        Ok(())
    }

    fn section(&self, out: &mut impl Write, title: &str) -> Result<()> {
        self.plain(out, "")?;
        self.line(out, Colors::HEADER, title)?;
        self.line(out, Colors::DIM, &"-".repeat(title.len().max(40)))
    }

    pub fn print_report(&self, report: &Report) -> Result<()> {
        let mut out = io::stdout().lock();

        self.line(&mut out, Colors::HEADER, &format!("netsoc incident report: {}", report.source))?;

        self.section(&mut out, "Dataset")?;
        self.plain(&mut out, &format!("  rows:        {} ({} dropped)", report.stats.rows, report.stats.dropped_rows))?;
        self.plain(&mut out, &format!("  time range:  {}", report::time_range(&report.stats)))?;
        if report.stats.synthetic_time {
            self.line(&mut out, Colors::DIM, "  (no time field found; synthetic sequence assigned)")?;
        }
        for (kind, count) in &report.stats.event_types {
            self.plain(&mut out, &format!("  {:<12} {}", kind, count))?;
        }

        self.section(&mut out, &format!("Alert summary ({} total)", report.summary.total))?;
        if report.summary.by_kind.is_empty() {
            self.line(&mut out, Colors::DIM, "  No alerts.")?;
        }
        for (kind, count) in &report.summary.by_kind {
            self.plain(&mut out, &format!("  {:<24} {}", kind, count))?;
        }

        self.section(&mut out, "Timeline")?;
        for (i, alert) in report.alerts.iter().enumerate() {
            self.line(&mut out, alert_color(alert.kind), &report::timeline_line(i + 1, alert))?;
        }

        self.section(&mut out, &format!("Episodes ({})", report.episodes.len()))?;
        for (i, episode) in report.episodes.iter().enumerate() {
            self.line(&mut out, Colors::EPISODE, &report::episode_header(i + 1, episode))?;
            self.line(
                &mut out,
                Colors::DIM,
                &format!("  hints: {}", report::episode_techniques(episode).join(", ")),
            )?;
        }

        if let Some(mappings) = &report.mappings {
            self.section(&mut out, "Tactic mapping")?;
            for m in &mappings.mapped {
                self.line(&mut out, Colors::EPISODE, &format!("{}", m.episode_start.format("%Y-%m-%d %H:%M:%S")))?;
                self.line(&mut out, Colors::MAPPING, &format!("  {}", m.mapping_text.trim()))?;
            }
            for f in &mappings.failed {
                self.line(
                    &mut out,
                    Colors::ERROR,
                    &format!("{}  mapping failed: {}", f.episode_start.format("%Y-%m-%d %H:%M:%S"), f.error),
                )?;
            }
        }

        out.flush()?;
        Ok(())
    }

    pub fn print_stats(&self, report: &StatsReport) -> Result<()> {
        let mut out = io::stdout().lock();
        let stats = &report.stats;

        self.line(&mut out, Colors::HEADER, &format!("Dataset: {}", report.source))?;
        self.plain(&mut out, &format!("  format:        {:?}", stats.format))?;
        self.plain(&mut out, &format!("  rows:          {} ({} dropped)", stats.rows, stats.dropped_rows))?;
        self.plain(&mut out, &format!("  time range:    {}", report::time_range(stats)))?;
        self.plain(&mut out, &format!("  sources:       {}", stats.unique_sources))?;
        self.plain(&mut out, &format!("  destinations:  {}", stats.unique_destinations))?;
        self.plain(&mut out, &format!("  columns:       {}", stats.columns.len()))?;

        self.section(&mut out, "Event types")?;
        for (kind, count) in &stats.event_types {
            self.plain(&mut out, &format!("  {:<12} {}", kind, count))?;
        }

        self.section(&mut out, "Top hosts by degree centrality")?;
        for h in &report.top_hosts {
            self.plain(&mut out, &format!("  {:<40} {:>5}  {:.3}", h.host, h.degree, h.centrality))?;
        }

        out.flush()?;
        Ok(())
    }

    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut err = io::stderr().lock();
        self.line(&mut err, Colors::ERROR, &format!("Error: {}", msg))?;
        err.flush()?;
        Ok(())
    }
}
