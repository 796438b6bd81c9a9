//! CLI entry point for the TRIAS trip categorizer.
//!
//! `serve` runs the `Categorize` gRPC endpoint; `categorize` runs the same
//! pipeline once on a local file or URL.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use tonic::transport::Server;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use trias_categorizer::{
    config::ServiceConfig,
    fetch::{BasicClient, load_offers},
    output::{append_records, to_pretty_json},
    r2r::categorizer_server::CategorizerServer,
    service::CategorizerService,
};

#[derive(Parser)]
#[command(name = "trias_categorizer")]
#[command(about = "Assigns qualitative categories to TRIAS trip offers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the Categorize RPC over insecure gRPC
    Serve {
        /// JSON config file
        #[arg(short, long)]
        config: Option<String>,

        /// Address to listen on, overrides the config file
        #[arg(short, long)]
        addr: Option<SocketAddr>,

        /// Feature generator seed, overrides the config file
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Categorize a single offer document from a file or URL
    Categorize {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// JSON config file
        #[arg(short, long)]
        config: Option<String>,

        /// CSV file to append results to
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/trias_categorizer.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("trias_categorizer.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, addr, seed } => {
            let mut config = ServiceConfig::load_or_default(config.as_deref())?;
            if let Some(addr) = addr {
                config.listen_addr = addr;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            serve(config).await?;
        }
        Commands::Categorize {
            source,
            config,
            output,
        } => {
            let config = ServiceConfig::load_or_default(config.as_deref())?;
            let service = CategorizerService::from_config(&config)?;

            let client = BasicClient::new()?;
            let offers = load_offers(&client, &source).await?;

            let categorization = match service.categorize_offers(&offers) {
                Ok(categorization) => categorization,
                Err(e) => {
                    error!(error = %e, exit_code = e.exit_code(), "Offer document rejected");
                    // returning lets the log guard flush before the process ends
                    return Ok(ExitCode::from(e.exit_code()));
                }
            };

            println!("{}", to_pretty_json(&categorization)?);

            if let Some(output) = output {
                let rows = append_records(&output, &categorization)?;
                info!(output = %output, rows, "Categorization appended to CSV");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Serves the categorizer until Ctrl+C.
#[tracing::instrument(skip_all, fields(addr = %config.listen_addr))]
async fn serve(config: ServiceConfig) -> Result<()> {
    let service = CategorizerService::from_config(&config)?;

    info!(
        seed = config.seed,
        seed_mode = ?config.seed_mode,
        on_invalid_input = ?config.on_invalid_input,
        "Launching categorizer"
    );

    Server::builder()
        .add_service(CategorizerServer::new(service))
        .serve_with_shutdown(config.listen_addr, async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => {
                    error!(error = %e, "Cannot listen for Ctrl+C, serving until killed");
                    std::future::pending::<()>().await
                }
            }
        })
        .await
        .context("gRPC server failed")?;

    info!("Categorizer stopped");
    Ok(())
}
