//! The two documents the tool produces and the sections each one contains.
//!
//! An edition turns a [`FetchContext`] into an [`Aggregator`] whose task
//! order is the order sections appear in the document.

use crate::aggregator::{Aggregator, ResultStore, Section};
use crate::error::{AggregatorError, FetchError};
use crate::scrapers::{
    FetchContext, apod, delight, eo, failure_fragment, hackernews, huggingface, quotes, tarot,
};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edition {
    /// Space pictures, Hacker News and new ML papers.
    Digest,
    /// Affirmation, cats, tarot, a joke, a fun fact and a quote.
    Delight,
}

impl Edition {
    pub fn title(self) -> &'static str {
        match self {
            Edition::Digest => "📰 Daily Digest",
            Edition::Delight => "🌟 Daily Delight 🌟",
        }
    }

    pub fn subject(self) -> &'static str {
        match self {
            Edition::Digest => "📅 Daily Digest",
            Edition::Delight => "💌 Your Daily Dose of Delight",
        }
    }

    /// Preview file written when no `--output` is given and no email is sent.
    pub fn default_output(self) -> PathBuf {
        match self {
            Edition::Digest => PathBuf::from("digest_preview.html"),
            Edition::Delight => PathBuf::from("delight_preview.html"),
        }
    }

    /// Section keys in document order.
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            Edition::Digest => &["apod", "eo", "hn", "hf"],
            Edition::Delight => &["affirmation", "cat", "tarot", "joke", "fun_fact", "quote"],
        }
    }

    /// Register this edition's tasks.
    pub fn aggregator(self, ctx: &FetchContext) -> Result<Aggregator, AggregatorError> {
        let mut agg = Aggregator::new();
        match self {
            Edition::Digest => {
                section(&mut agg, ctx, "apod", "APOD", apod::fetch)?;
                section(&mut agg, ctx, "eo", "EO Image of the Day", eo::fetch)?;
                section(&mut agg, ctx, "hn", "Hacker News", hackernews::fetch)?;
                section(&mut agg, ctx, "hf", "Hugging Face Papers", huggingface::fetch)?;
            }
            Edition::Delight => {
                let affirmation_ctx = ctx.clone();
                agg.task(
                    "affirmation",
                    move || delight::affirmation(affirmation_ctx),
                    |_| delight::render_affirmation(delight::DEFAULT_AFFIRMATION),
                )?;
                section(&mut agg, ctx, "cat", "cat fact or image", delight::cat)?;
                section(&mut agg, ctx, "tarot", "tarot card", tarot::fetch)?;
                section(&mut agg, ctx, "joke", "joke", delight::joke)?;
                section(&mut agg, ctx, "fun_fact", "fun fact", delight::fun_fact)?;
                section(&mut agg, ctx, "quote", "quote", quotes::fetch)?;
            }
        }
        Ok(agg)
    }

    /// Fetch every section of the edition.
    #[instrument(level = "info", skip_all, fields(edition = %self))]
    pub async fn run(self, ctx: &FetchContext) -> Result<ResultStore, AggregatorError> {
        let agg = self.aggregator(ctx)?;
        debug_assert_eq!(agg.keys(), self.keys(), "registration order drifted");
        debug!(keys = ?agg.keys(), "Registered sections");

        let store = agg.run().await;
        for &key in self.keys() {
            if let Some(Section::Failed { reason, .. }) = store.get(key) {
                info!(key, %reason, "Section replaced by its fallback");
            }
        }
        let failed = store.failed_keys();
        info!(sections = store.len(), failed = failed.len(), ?failed, "Edition fetched");
        Ok(store)
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Edition::Digest => "digest",
            Edition::Delight => "delight",
        })
    }
}

/// Register `op` under `key`, falling back to a "Failed to load" fragment.
fn section<Op, Fut>(
    agg: &mut Aggregator,
    ctx: &FetchContext,
    key: &'static str,
    label: &'static str,
    op: Op,
) -> Result<(), AggregatorError>
where
    Op: FnOnce(FetchContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<String, FetchError>> + Send + 'static,
{
    let ctx = ctx.clone();
    agg.task(key, move || op(ctx), move |e| failure_fragment(label, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DigestConfig;
    use std::sync::Arc;
    use wiremock::MockServer;

    fn ctx(config: DigestConfig) -> FetchContext {
        FetchContext::new(reqwest::Client::new(), Arc::new(config), None)
    }

    #[test]
    fn test_aggregator_keys_follow_document_order() {
        let ctx = ctx(DigestConfig::default());
        for edition in [Edition::Digest, Edition::Delight] {
            let agg = edition.aggregator(&ctx).unwrap();
            assert_eq!(agg.keys(), edition.keys());
        }
    }

    #[test]
    fn test_edition_metadata() {
        assert_eq!(Edition::Digest.subject(), "📅 Daily Digest");
        assert_eq!(Edition::Delight.subject(), "💌 Your Daily Dose of Delight");
        assert_eq!(Edition::Delight.default_output(), PathBuf::from("delight_preview.html"));
        assert_eq!(Edition::Digest.to_string(), "digest");
    }

    #[tokio::test]
    async fn test_unreachable_sources_degrade_to_fallbacks() {
        // every endpoint answers 404 and no local files exist
        let server = MockServer::start().await;
        let uri = server.uri();
        let mut config = DigestConfig::default();
        config.delight.affirmation_url = format!("{uri}/affirmation");
        config.delight.fun_fact_url = format!("{uri}/fact");
        config.delight.joke_url = format!("{uri}/joke");
        config.delight.cat_fact_url = format!("{uri}/cat");
        config.delight.cat_image_url = format!("{uri}/cat/image");
        config.delight.quotes_path = "/no/such/quotes.txt".into();
        config.delight.tarot_path = "/no/such/tarot.json".into();

        let store = Edition::Delight.run(&ctx(config)).await.unwrap();
        assert_eq!(store.len(), 6);
        assert_eq!(store.failed_keys(), Edition::Delight.keys().to_vec());

        let affirmation = store.get("affirmation").unwrap().fragment();
        assert!(affirmation.contains(delight::DEFAULT_AFFIRMATION));
        let joke = store.get("joke").unwrap().fragment();
        assert!(joke.contains("Failed to load joke"));
    }
}
