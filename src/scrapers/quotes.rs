//! Quote of the day from a local file, and the crawler that fills that file.
//!
//! The file holds one quote per line. The daily pick is the line at
//! `day_of_year % count`; the file is only ever appended to.

use super::{FetchContext, element_text, selector};
use crate::config::DigestConfig;
use crate::error::FetchError;
use crate::utils::{ensure_parent_dir, escape_text};
use chrono::{Datelike, Local, NaiveDate};
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use scraper::Html;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{info, instrument, warn};

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

#[instrument(level = "info", skip_all)]
pub async fn fetch(ctx: FetchContext) -> Result<String, FetchError> {
    let path = &ctx.config.delight.quotes_path;
    let quotes = read_quotes(path).await?;
    let quote = pick(&quotes, Local::now().date_naive())
        .ok_or_else(|| FetchError::NoContent(format!("no quotes in {}", path.display())))?;
    info!(count = quotes.len(), "Picked quote of the day");
    Ok(format!(
        "<h2>💬 Quote of the Day</h2><p class=\"quote-text\">\"{}\"</p>",
        escape_text(quote)
    ))
}

/// Non-blank lines of the quotes file.
pub async fn read_quotes(path: &Path) -> Result<Vec<String>, FetchError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn pick(quotes: &[String], date: NaiveDate) -> Option<&str> {
    if quotes.is_empty() {
        return None;
    }
    let i = date.ordinal() as usize % quotes.len();
    Some(quotes[i].as_str())
}

/// Crawl `pages` listing pages and append every quote found to the quotes
/// file. Returns the number of quotes appended.
///
/// A page that fails to load is skipped; a write failure stops the crawl.
#[instrument(level = "info", skip(client, config))]
pub async fn crawl(
    client: &reqwest::Client,
    config: &DigestConfig,
    pages: u32,
) -> Result<usize, FetchError> {
    let path = &config.delight.quotes_path;
    ensure_parent_dir(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    // a last line without its newline would merge with the first crawled quote
    if lacks_trailing_newline(&mut file)
        .await
        .map_err(|e| FetchError::io(path, e))?
    {
        file.write_all(b"\n")
            .await
            .map_err(|e| FetchError::io(path, e))?;
    }

    let mut appended = 0;
    for page in 1..=pages {
        let url = format!("{}?page={page}", config.quotes.base_url);
        info!(page, %url, "Crawling quotes page");

        let quotes = match crawl_page(client, &url).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(page, error = %e, "Skipping quotes page");
                continue;
            }
        };
        let mut chunk = String::new();
        for quote in &quotes {
            chunk.push_str(quote);
            chunk.push('\n');
        }
        file.write_all(chunk.as_bytes())
            .await
            .map_err(|e| FetchError::io(path, e))?;
        appended += quotes.len();
    }
    file.flush().await.map_err(|e| FetchError::io(path, e))?;

    info!(appended, path = %path.display(), "Quote crawl finished");
    Ok(appended)
}

async fn lacks_trailing_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

async fn crawl_page(client: &reqwest::Client, url: &str) -> Result<Vec<String>, FetchError> {
    let response = client
        .get(url)
        .header(USER_AGENT, BROWSER_UA)
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    parse_quotes(&response.text().await?)
}

pub fn parse_quotes(html: &str) -> Result<Vec<String>, FetchError> {
    let document = Html::parse_document(html);
    let quote_sel = selector("div.quoteText")?;
    Ok(document
        .select(&quote_sel)
        .map(element_text)
        .filter(|q| !q.is_empty())
        .collect())
}
