// LogSift - GPL-3.0-or-later
// This file is part of LogSift.
//
// Copyright (C) 2026 Daniel Freiermuth
//
// LogSift is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// LogSift is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with LogSift.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::Context;
use clap::Parser;
use logsift::anomaly::detect_metric_anomalies;
use logsift::classifier::OllamaClassifier;
use logsift::config::AnalyzerConfig;
use logsift::core::collector::read_lines;
use logsift::core::{Pipeline, ProcessedLogCache};
use logsift::parser::extract::{extract_events, LogFormat};
use logsift::parser::timestamp::count_timestamped_lines;
use logsift::report::{Report, DEFAULT_REPORT_PATH};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(name = "logsift")]
#[command(version = VERSION)]
#[command(
    about = "Classify server logs with an LLM and flag anomalies in volume, errors and latency",
    long_about = None
)]
struct Args {
    /// Log file to analyze
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Config file (defaults to logsift/config.json in the config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Input format
    #[arg(long, value_enum)]
    format: Option<LogFormat>,

    /// Field delimiter for csv input
    #[arg(long)]
    delimiter: Option<String>,

    /// Trailing window length, in buckets
    #[arg(long)]
    window: Option<usize>,

    /// Standard deviations above the window mean that count as anomalous
    #[arg(long)]
    threshold: Option<f64>,

    /// Bucket width in seconds
    #[arg(long, value_name = "SECS")]
    granularity: Option<i64>,

    /// Minimum similarity for reusing a cached classification
    #[arg(long)]
    similarity: Option<f32>,

    /// Processed-log cache file
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,

    /// Concurrent classification workers
    #[arg(long)]
    workers: Option<usize>,

    /// Ollama model name
    #[arg(long)]
    model: Option<String>,

    /// Skip classification, report statistical anomalies only
    #[arg(long)]
    offline: bool,

    /// Where to write the JSON report
    #[arg(long, value_name = "PATH", default_value = DEFAULT_REPORT_PATH)]
    report: PathBuf,

    /// Also write the event types as CSV
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut AnalyzerConfig) {
        if let Some(format) = self.format {
            config.format.log_format = format;
        }
        if let Some(delimiter) = &self.delimiter {
            config.format.delimiter.clone_from(delimiter);
        }
        if let Some(window) = self.window {
            config.anomaly.window = window;
        }
        if let Some(threshold) = self.threshold {
            config.anomaly.threshold = threshold;
        }
        if let Some(granularity) = self.granularity {
            config.anomaly.granularity_secs = granularity;
        }
        if let Some(similarity) = self.similarity {
            config.dedup.similarity_threshold = similarity;
        }
        if let Some(cache) = &self.cache {
            config.dedup.cache_path.clone_from(cache);
        }
        if let Some(workers) = self.workers {
            config.classifier.workers = workers;
        }
        if let Some(model) = &self.model {
            config.classifier.model.clone_from(model);
        }
        if self.offline {
            config.classifier.enabled = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides, e.g. RUST_LOG=logsift=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!("LogSift {VERSION} starting");

    let mut config = AnalyzerConfig::load(args.config.as_deref()).context("Failed to load config")?;
    args.apply(&mut config);
    config.validate().context("Invalid settings")?;

    let lines = read_lines(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    tracing::debug!(
        "{} of {} lines start with a logging timestamp",
        count_timestamped_lines(lines.iter().map(String::as_str)),
        lines.len()
    );

    let events = extract_events(&lines, &config.format).context("Invalid log format settings")?;
    let anomalies = detect_metric_anomalies(&events, &config.anomaly);

    let report = if config.classifier.enabled {
        let classifier =
            OllamaClassifier::new(&config.classifier).context("Failed to set up classifier")?;
        let cache =
            ProcessedLogCache::load(&config.dedup.cache_path, config.dedup.similarity_threshold);

        let output = Pipeline::new(&classifier, &cache)
            .with_workers(config.classifier.workers)
            .run(&events)
            .context("Classification failed")?;

        // The report is still worth having when the cache can't be written
        if let Err(e) = cache.save(&config.dedup.cache_path) {
            tracing::error!(
                "Failed to save cache to {}: {e}",
                config.dedup.cache_path.display()
            );
        }

        Report::from_run(anomalies, Some(&output))
    } else {
        tracing::info!("Classification disabled, reporting statistical anomalies only");
        Report::from_run(anomalies, None)
    };

    print!("{report}");

    report.export_json(&args.report).context("Failed to export report")?;
    if let Some(csv) = &args.csv {
        report.export_csv(csv).context("Failed to export CSV report")?;
    }
    Ok(())
}
