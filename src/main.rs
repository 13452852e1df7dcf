use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use concurrent_queue_mini::core::report::append_reports;
use concurrent_queue_mini::core::stress::{StressConfig, run_stress};

/// Hammer a ConcurrentQueue from many threads and verify exactly-once FIFO delivery
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Number of producer threads
    #[arg(long)]
    producers: Option<usize>,

    /// Number of consumer threads
    #[arg(long)]
    consumers: Option<usize>,

    /// Items pushed by each producer
    #[arg(long = "items")]
    items_per_producer: Option<usize>,

    /// How many times to repeat the run
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// NDJSON file the reports are appended to
    #[arg(long, default_value = "output.ndjson")]
    report: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn stress_config(&self) -> StressConfig {
        let defaults = StressConfig::default();
        StressConfig {
            producers: self.producers.unwrap_or(defaults.producers),
            consumers: self.consumers.unwrap_or(defaults.consumers),
            items_per_producer: self.items_per_producer.unwrap_or(defaults.items_per_producer),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = cli.stress_config();
    let mut reports = Vec::with_capacity(cli.runs);
    for _ in 0..cli.runs {
        let report = run_stress(&config).context("stress run rejected")?;
        println!("{report}");
        reports.push(report);
    }

    append_reports(&reports, &cli.report)
        .with_context(|| format!("failed to append reports to {}", cli.report.display()))?;

    let failed = reports.iter().filter(|r| !r.verified).count();
    if failed > 0 {
        bail!("{failed} of {} runs failed verification", reports.len());
    }
    Ok(())
}
