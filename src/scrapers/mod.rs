//! Fetch operations, one module per source.
//!
//! Every operation has the same shape: it takes a cloned [`FetchContext`],
//! performs its own HTTP calls, and returns either a rendered HTML fragment
//! or a [`FetchError`]. None of them touch shared state; the aggregator
//! assigns each result to its key.
//!
//! # Sources
//!
//! | Key | Module | Method | Notes |
//! |-----|--------|--------|-------|
//! | `apod` | [`apod`] | HTML scraping | Image or video of the day |
//! | `eo` | [`eo`] | HTML scraping | Optional LLM summary of the article |
//! | `hn` | [`hackernews`] | Firebase JSON API | Top stories, rank order |
//! | `hf` | [`huggingface`] | HTML scraping | Four listings merged per title |
//! | `affirmation`, `cat`, `joke`, `fun_fact` | [`delight`] | JSON APIs | Short timeouts |
//! | `tarot` | [`tarot`] | Local deck | Seeded by date, optional LLM guidance; images from the `tarot-images` command |
//! | `quote` | [`quotes`] | Local file | Filled by the `quotes` command |

pub mod apod;
pub mod delight;
pub mod eo;
pub mod hackernews;
pub mod huggingface;
pub mod quotes;
pub mod tarot;

use crate::config::DigestConfig;
use crate::error::FetchError;
use crate::llm::OpenRouter;
use scraper::{ElementRef, Selector};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Everything an operation needs, cheap to clone into each task.
#[derive(Clone, Debug)]
pub struct FetchContext {
    pub client: reqwest::Client,
    pub config: Arc<DigestConfig>,
    pub llm: Option<OpenRouter>,
}

impl FetchContext {
    pub fn new(client: reqwest::Client, config: Arc<DigestConfig>, llm: Option<OpenRouter>) -> Self {
        Self {
            client,
            config,
            llm,
        }
    }
}

/// GET `url` and return the body, failing on non-success status.
#[instrument(level = "debug", skip(client))]
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.text().await?;
    debug!(bytes = body.len(), "Fetched");
    Ok(body)
}

/// GET `url` and decode the body as JSON.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, FetchError> {
    let body = get_text(client, url).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Compile a CSS selector, reporting a bad one as a parse error.
pub fn selector(css: &'static str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::parse(format!("bad selector {css:?}: {e}")))
}

/// Text content of an element with whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    crate::utils::collapse_whitespace(&element.text().collect::<String>())
}

/// Fragment shown in place of a section that could not be loaded.
pub fn failure_fragment(title: &str, error: &FetchError) -> String {
    format!(
        "<h2>🚫 Failed to load {}</h2><p class=\"error-text\"><i>{}</i></p>",
        crate::utils::escape_text(title),
        crate::utils::escape_text(&error.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_text_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/gone", server.uri());
        let err = get_text(&reqwest::Client::new(), &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_get_json_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ids"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1,2,3]"))
            .mount(&server)
            .await;

        let url = format!("{}/ids", server.uri());
        let ids: Vec<u64> = get_json(&reqwest::Client::new(), &url).await.unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_failure_fragment_escapes_error() {
        let fragment = failure_fragment("APOD", &FetchError::parse("<bad>"));
        assert!(fragment.contains("Failed to load APOD"));
        assert!(fragment.contains("&lt;bad&gt;"));
    }
}
