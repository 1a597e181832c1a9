use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use trendscraper::{
    config::Settings,
    drive::{auth::Credentials, DriveClient},
    run,
    trends::TrendClient,
};

/// Fetch interest-over-time data and upload dated CSVs to Drive.
#[derive(Parser, Debug)]
struct Args {
    /// Path to the YAML settings file
    #[arg(long = "conf_file_path", visible_alias = "setting_file_path")]
    conf_file_path: PathBuf,

    /// Local directory for intermediate CSVs
    #[arg(long = "output_dir_path")]
    output_dir_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let started_at = Local::now();
    info!(%started_at, "start");

    // ─── 2) load settings ────────────────────────────────────────────
    let args = Args::parse();
    let settings = Settings::load(&args.conf_file_path)
        .with_context(|| format!("loading settings from {}", args.conf_file_path.display()))?;
    info!(
        keywords = settings.keywords.len(),
        mode = ?settings.output_mode,
        "settings loaded"
    );

    // ─── 3) authenticate against the storage backend ─────────────────
    let creds_path =
        std::env::var("GDRIVE_CREDENTIALS").unwrap_or_else(|_| "credentials.json".to_string());
    let creds = Credentials::load(&creds_path)?;
    let drive = DriveClient::authenticate(reqwest::Client::new(), &creds).await?;

    // ─── 4) run ──────────────────────────────────────────────────────
    let trends = TrendClient::new()?;
    run::run(&settings, &trends, &drive, &args.output_dir_path, started_at).await?;

    info!("end");
    Ok(())
}
