use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dolar_core::config::Settings;
use dolar_core::domain::news::NewsSnapshot;
use dolar_core::domain::quote::QuotationSnapshot;
use dolar_core::service::{news_from_xml, quotations_from_html, DolarService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Quotes,
    News,
}

#[derive(Debug, Parser)]
#[command(name = "dolar_worker")]
struct Args {
    /// Pipeline to run once. Output is the snapshot as JSON on stdout.
    #[arg(long, value_enum, default_value_t = Target::Quotes)]
    target: Target,

    /// Parse a saved copy of the page or feed instead of fetching the live upstream.
    #[arg(long)]
    from_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = match args.target {
        Target::Quotes => run_quotes(&settings, args.from_file.as_deref()).await,
        Target::News => run_news(&settings, args.from_file.as_deref()).await,
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(pipeline = ?args.target, error = %format!("{err:#}"), "worker run failed");
    }
    result
}

async fn run_quotes(settings: &Settings, from_file: Option<&Path>) -> anyhow::Result<()> {
    let snapshot: QuotationSnapshot = match from_file {
        Some(path) => quotations_from_html(&read_capture(path)?, chrono::Utc::now()),
        None => DolarService::from_settings(settings)?.scrape_quotations().await,
    };

    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    let found = snapshot.quotes.values().filter(|q| !q.is_zero()).count();
    tracing::info!(
        source = %snapshot.source,
        success = snapshot.success,
        types_found = found,
        "quotation snapshot built"
    );
    anyhow::ensure!(
        snapshot.success,
        "quotation snapshot unsuccessful: {}",
        snapshot.error.as_deref().unwrap_or("unknown error")
    );
    Ok(())
}

async fn run_news(settings: &Settings, from_file: Option<&Path>) -> anyhow::Result<()> {
    let snapshot: NewsSnapshot = match from_file {
        Some(path) => news_from_xml(&read_capture(path)?, chrono::Utc::now()),
        None => DolarService::from_settings(settings)?.scrape_news().await,
    };

    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    tracing::info!(source = %snapshot.source, count = snapshot.count, "news snapshot built");
    if let Some(error) = &snapshot.error {
        anyhow::bail!("news snapshot unsuccessful: {error}");
    }
    Ok(())
}

fn read_capture(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
