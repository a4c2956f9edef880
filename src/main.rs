use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_summary::Result;
use metrics_summary::metrics::{self, ParseOptions};
use metrics_summary::model::MetricsSummary;
use metrics_summary::render;
use std::io::{self, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

const STDIN: &str = "-";

#[derive(Parser)]
#[command(name = "metrics-summary")]
#[command(about = "Summarize benchmark metrics exports", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print per-operation timer summaries as JSON.
    Summarize {
        /// Metrics export to read; stdin when omitted or "-".
        #[arg(default_value = STDIN)]
        input: String,

        /// Write to this file instead of stdout.
        #[arg(short = 'o', long)]
        out: Option<String>,

        /// Keep Counters and Gauges bodies and print the full summary
        /// (timers, clock delta, section line counts, raw sections).
        #[arg(long)]
        retain_raw: bool,
    },

    /// Write the legacy perf.json report.
    PerfJson {
        #[arg(default_value = STDIN)]
        input: String,

        #[arg(long, default_value = "perf.json")]
        report_file: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.cmd {
        Commands::Summarize {
            input,
            out,
            retain_raw,
        } => {
            let options = ParseOptions {
                retain_raw_sections: retain_raw,
            };
            let summary = read_summary(&input, options)?;
            let json = if retain_raw {
                render::render_metrics_json(&summary)?
            } else {
                render::render_summary_json(&summary.timers)?
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("write summary {}", path))?;
                    info!(path = %path, operations = summary.timers.len(), "wrote summary");
                }
                None => io::stdout().lock().write_all(json.as_bytes())?,
            }
        }
        Commands::PerfJson { input, report_file } => {
            let summary = read_summary(&input, ParseOptions::default())?;
            let report = render::translate(&summary.timers);
            let json = render::render_perf_json(&report)?;
            std::fs::write(&report_file, json)
                .with_context(|| format!("write report {}", report_file))?;
            info!(path = %report_file, entries = report.results.len(), "wrote perf.json");
        }
    }

    Ok(())
}

fn read_summary(input: &str, options: ParseOptions) -> Result<MetricsSummary> {
    if input == STDIN {
        let summary = metrics::parse_reader(io::stdin().lock(), "<stdin>", options)?;
        Ok(summary)
    } else {
        metrics::parse_file(input, options)
    }
}
