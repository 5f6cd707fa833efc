//! Posts a combat log to a running healparser service and prints the report.

use std::path::PathBuf;

use clap::Parser;

use healparser::logging;

#[derive(Parser, Debug)]
#[command(name = "heal_uploader", version, about)]
struct Cli {
    /// Combat log to upload.
    file: PathBuf,

    /// Report name shown on the leaderboard.
    #[arg(short = 'n', long = "name")]
    name: Option<String>,

    /// Base URL of the service.
    #[arg(short = 'u', long = "url", default_value = "http://localhost:3000")]
    url: String,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug, None);

    match upload(&cli).await {
        Ok(body) => println!("{body}"),
        Err(e) => {
            tracing::error!(error = %e, "Upload failed");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn upload(cli: &Cli) -> Result<String, String> {
    let bytes = tokio::fs::read(&cli.file)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", cli.file.display()))?;
    let file_name = cli
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("WoWCombatLog.txt")
        .to_string();

    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("text/plain")
        .map_err(|e| e.to_string())?;
    let mut form = reqwest::multipart::Form::new().part("file", part);
    if let Some(name) = &cli.name {
        form = form.text("name", name.clone());
    }

    let endpoint = format!("{}/api/report/upload", cli.url.trim_end_matches('/'));
    tracing::debug!(url = %endpoint, "Uploading");

    let client = reqwest::Client::new();
    let resp = client
        .post(&endpoint)
        .multipart(form)
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
        return Err(format!("Server returned {status}: {body}"));
    }

    // Pretty-print when the body is JSON
    Ok(serde_json::from_str::<serde_json::Value>(&body)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or(body))
}
