use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use minsig::rendezvous::{SdpType, SessionDescription};

#[derive(Parser)]
#[command(name = "minsig-cli")]
#[command(about = "Talk to a minsig signalling broker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Offer,
    Answer,
}

#[derive(Subcommand)]
enum Commands {
    /// Post a session description to a slot and print the reply
    Post {
        /// Slot name
        slot: String,

        /// Description type
        #[arg(short = 't', long = "type", value_enum, default_value = "offer")]
        kind: Kind,

        /// SDP text, or @path to read it from a file
        #[arg(short, long)]
        sdp: String,

        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Show broker status from the admin endpoint
    Status {
        #[arg(short, long, default_value = "http://localhost:8081")]
        url: String,

        #[arg(short, long, env = "MINSIG_ADMIN_KEY")]
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Post {
            slot,
            kind,
            sdp,
            url,
        } => {
            let sdp = match sdp.strip_prefix('@') {
                Some(path) => std::fs::read_to_string(path)?,
                None => sdp,
            };
            let desc = SessionDescription {
                kind: match kind {
                    Kind::Offer => SdpType::Offer,
                    Kind::Answer => SdpType::Answer,
                },
                sdp,
            };

            let res = client
                .post(slot_url(&url, &slot)?)
                .json(&desc)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Status { url, key } => {
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))?,
            );
            let res = client
                .get(format!("{}/admin/status", url.trim_end_matches('/')))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Append `slot` to `base` as a single percent-encoded path segment.
fn slot_url(base: &str, slot: &str) -> Result<reqwest::Url, Box<dyn std::error::Error>> {
    let mut url = reqwest::Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| format!("broker url cannot take a path: {}", base))?
        .pop_if_empty()
        .push(slot.trim_start_matches('/'));
    Ok(url)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Err(format!("broker returned status {}", status).into());
    }

    if text.is_empty() {
        println!("ok");
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
