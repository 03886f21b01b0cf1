use anyhow::{Context, Result};
use clap::Parser;
use dsp_common::{
    init_tracer,
    metrics::{component_info_metric, describe_metrics},
};
use metrics_exporter_prometheus::PrometheusBuilder;
use pulses_to_peaks::{DspConfig, EventRecord, EventSummary, process_events};
use std::{fs::File, io::BufReader, net::SocketAddr, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};

// cargo run --bin pulses-to-peaks -- --config config.json --input events.json --output peaks.json

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Detector configuration, as JSON.
    #[clap(long)]
    config: PathBuf,

    /// List of events to process, as JSON.
    #[clap(long)]
    input: PathBuf,

    /// Where to write the event summaries, stdout if omitted.
    #[clap(long)]
    output: Option<PathBuf>,

    /// Endpoint on which Prometheus metrics are served.
    #[clap(long)]
    observability_address: Option<SocketAddr>,

    /// Number of worker threads, rayon's default if omitted.
    #[clap(long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let _tracer = init_tracer!(LevelFilter::INFO)?;

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()
            .context("Prometheus metrics exporter should be set up")?;
        describe_metrics();
        component_info_metric("pulses-to-peaks");
    }

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let config = DspConfig::load(&args.config)
        .with_context(|| format!("Cannot load config from {}", args.config.display()))?;

    let input = File::open(&args.input)
        .with_context(|| format!("Cannot open {}", args.input.display()))?;
    let records: Vec<EventRecord> = serde_json::from_reader(BufReader::new(input))?;
    let num_records = records.len();

    let events = process_events(records, &config);
    info!(
        num_records,
        num_processed = events.len(),
        "Finished processing events"
    );

    let summaries: Vec<EventSummary> = events.iter().map(EventSummary::from).collect();
    match args.output {
        Some(path) => serde_json::to_writer_pretty(File::create(path)?, &summaries)?,
        None => serde_json::to_writer_pretty(std::io::stdout().lock(), &summaries)?,
    }
    Ok(())
}
