//! # Daily Digest
//!
//! Scrapes a handful of websites and public APIs concurrently, assembles the
//! results into one HTML document and writes it to a file or emails it.
//!
//! ## Editions
//!
//! - **digest**: NASA Astronomy Picture of the Day, NASA Earth Observatory
//!   image of the day, Hacker News top stories and Hugging Face papers
//! - **delight**: affirmation, cat fact, tarot card, joke, fun fact and quote
//!
//! ## Usage
//!
//! ```sh
//! daily_digest digest                 # writes digest_preview.html
//! daily_digest delight --email        # mails DELIGHT_EMAIL
//! daily_digest quotes --pages 10      # refills the quotes file
//! daily_digest tarot-images           # downloads the card images
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: every section of the edition runs as its own tokio task
//! 2. **Joining**: the aggregator waits for all of them; a failed section is
//!    replaced by its fallback fragment
//! 3. **Rendering**: sections are concatenated in edition order
//! 4. **Delivery**: file and/or SMTP

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cli;
mod config;
mod editions;
mod error;
mod llm;
mod outputs;
mod scrapers;
mod utils;

use cli::{Cli, Command, EditionArgs};
use config::DigestConfig;
use editions::Edition;
use llm::OpenRouter;
use outputs::email::{self, Envelope};
use outputs::{file, html};
use scrapers::FetchContext;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("daily_digest starting up");

    let cli = Cli::parse();
    debug!(config = ?cli.config, command = ?cli.command, "Parsed CLI arguments");

    let config = Arc::new(DigestConfig::load(cli.config.as_deref())?);

    match &cli.command {
        Command::Digest(args) => run_edition(&cli, &config, Edition::Digest, args).await?,
        Command::Delight(args) => run_edition(&cli, &config, Edition::Delight, args).await?,
        Command::Quotes { pages } => {
            let client = http_client(config.http.timeout_secs, &config.http.user_agent)?;
            let appended = scrapers::quotes::crawl(&client, &config, *pages).await?;
            info!(appended, pages, "Quotes crawled");
        }
        Command::TarotImages => {
            let client = http_client(config.http.timeout_secs, &config.http.user_agent)?;
            let saved = scrapers::tarot::crawl_images(&client, &config).await?;
            info!(saved, "Tarot images downloaded");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

fn http_client(timeout_secs: u64, user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
}

/// Fetch, render and deliver one edition.
#[instrument(level = "info", skip_all, fields(%edition))]
async fn run_edition(
    cli: &Cli,
    config: &Arc<DigestConfig>,
    edition: Edition,
    args: &EditionArgs,
) -> Result<(), Box<dyn Error>> {
    // fail before fetching anything if the email cannot be sent
    let envelope = if args.email {
        let (recipient, recipient_var) = cli.recipient(edition);
        Some(Envelope::from_parts(
            cli.sender_email.clone(),
            cli.sender_password.clone(),
            recipient,
            recipient_var,
        )?)
    } else {
        None
    };

    let timeout_secs = match edition {
        Edition::Digest => config.http.timeout_secs,
        Edition::Delight => config.delight.timeout_secs,
    };
    let client = http_client(timeout_secs, &config.http.user_agent)?;

    let llm = match cli.openrouter_api.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            let llm_client = http_client(config.http.timeout_secs, &config.http.user_agent)?;
            info!(model = %config.llm.model, "LLM enabled");
            Some(OpenRouter::new(llm_client, &config.llm, key))
        }
        _ => {
            info!("OPENROUTER_API not set; LLM extras disabled");
            None
        }
    };

    let ctx = FetchContext::new(client, Arc::clone(config), llm);
    let store = edition.run(&ctx).await?;
    let document = html::render_document(edition.title(), Local::now().date_naive(), &store);

    if let Some(path) = args.output_path(edition) {
        file::write_document(&path, &document).await?;
    }
    if let Some(envelope) = envelope {
        email::send(&config.smtp, &envelope, edition.subject(), &document).await?;
    }
    Ok(())
}
