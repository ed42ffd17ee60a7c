//! `bot-launcher` binary: sets up logging, loads the configuration and runs the
//! startup sequence. A failed startup exits non-zero.

use std::path::PathBuf;

use bot_launcher::base::{config::Config, types::Void};
use clap::Parser;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use tracing_subscriber::{filter::LevelFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Brings a Slack bot online: health check, storage, handshake, event loop.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// Config file (defaults to `.hidden/config.toml` when present).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log verbosity: `-v` for debug, `-vv` for trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    init_logging(args.verbose)?;

    let config = Config::load(args.config.as_deref())?;

    bot_launcher::start(config).await
}

/// Stdout logs at the requested level, plus OTLP span export.
fn init_logging(verbose: u8) -> Void {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let stdout = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(true)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
    let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("bot-launcher");
    let otel = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    Ok(())
}
