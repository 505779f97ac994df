//! minsig broker binary.
//!
//! # Architecture Overview
//!
//! ```text
//!   peer A ──POST /slot {offer}──┐                  ┌── held until answer ──▶ peer A
//!                                ▼                  │
//!                        ┌──────────────┐   ┌───────┴────────┐
//!                        │ http server  │──▶│ rendezvous     │
//!                        │ (plain, TLS) │   │ table          │
//!                        └──────────────┘   └───────┬────────┘
//!                                ▲                  │
//!   peer B ──POST /slot {offer}──┘                  └── stored offer ──▶ peer B
//!   peer B ──POST /slot {answer}─▶ delivered to A, slot freed
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use minsig::config::loader::load_config;
use minsig::config::validation::validate_config;
use minsig::config::{BrokerConfig, TlsConfig};
use minsig::http::HttpServer;
use minsig::lifecycle::{signals, Shutdown};
use minsig::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "minsig", version, about = "Minimal WebRTC signalling broker")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Plain HTTP listen address.
    #[arg(long)]
    http: Option<String>,

    /// HTTPS listen address (requires --cert and --key).
    #[arg(long, requires_all = ["cert", "key"])]
    https: Option<String>,

    /// PEM certificate chain for HTTPS.
    #[arg(long)]
    cert: Option<String>,

    /// PEM private key for HTTPS.
    #[arg(long)]
    key: Option<String>,
}

impl Args {
    fn apply(self, config: &mut BrokerConfig) {
        if let Some(http) = self.http {
            config.listener.http_address = http;
        }
        if let (Some(bind_address), Some(cert_path), Some(key_path)) =
            (self.https, self.cert, self.key)
        {
            config.listener.tls = Some(TlsConfig {
                bind_address,
                cert_path,
                key_path,
            });
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BrokerConfig::default(),
    };
    args.apply(&mut config);

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("config: {}", error);
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    logging::init_logging(&config.observability);
    tracing::info!("minsig v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        http_address = %config.listener.http_address,
        tls = config.listener.tls.is_some(),
        idle_timeout_secs = ?config.rendezvous.idle_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.http_address).await?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
