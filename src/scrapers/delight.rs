//! The small JSON-API sections of the delight edition.

use super::{FetchContext, get_json};
use crate::error::FetchError;
use crate::utils::{escape_attr, escape_text};
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// Shown when the affirmation service is unavailable.
pub const DEFAULT_AFFIRMATION: &str = "You are amazing and capable!";

const NO_EXPLANATION: &str = "No explanation available.";

#[derive(Debug, Deserialize)]
struct Affirmation {
    affirmation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FunFact {
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Joke {
    pub setup: String,
    pub punchline: String,
}

#[derive(Debug, Deserialize)]
struct CatFacts {
    data: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatImage {
    url: String,
}

#[instrument(level = "info", skip_all)]
pub async fn affirmation(ctx: FetchContext) -> Result<String, FetchError> {
    let body: Affirmation = get_json(&ctx.client, &ctx.config.delight.affirmation_url).await?;
    let text = body
        .affirmation
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_AFFIRMATION.to_string());
    info!(%text, "Fetched affirmation");
    Ok(render_affirmation(&text))
}

pub fn render_affirmation(text: &str) -> String {
    format!(
        "<div class=\"affirmation\"><h2>🌈 {}</h2></div>",
        escape_text(text.trim())
    )
}

#[instrument(level = "info", skip_all)]
pub async fn fun_fact(ctx: FetchContext) -> Result<String, FetchError> {
    let fact: FunFact = get_json(&ctx.client, &ctx.config.delight.fun_fact_url).await?;
    Ok(format!(
        "<h2>🧠 Fun Fact</h2><p class=\"fun-fact-text\">{}</p>",
        escape_text(fact.text.trim())
    ))
}

/// Cat fact and cat picture, fetched at the same time. Both are required.
#[instrument(level = "info", skip_all)]
pub async fn cat(ctx: FetchContext) -> Result<String, FetchError> {
    let delight = &ctx.config.delight;
    let (facts, images) = tokio::try_join!(
        get_json::<CatFacts>(&ctx.client, &delight.cat_fact_url),
        get_json::<Vec<CatImage>>(&ctx.client, &delight.cat_image_url),
    )?;

    let fact = facts
        .data
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::NoContent("cat fact list is empty".into()))?;
    let image = images
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::NoContent("cat image list is empty".into()))?;
    info!(image = %image.url, "Fetched cat fact and image");

    Ok(format!(
        "<h2>🐱 Cat Fact of the Day</h2><p class=\"fact-text\">{}</p>\
         <div style=\"text-align: center;\"><img src=\"{}\" alt=\"Adorable Cat\" width=\"400\"></div>",
        escape_text(fact.trim()),
        escape_attr(&image.url)
    ))
}

/// Joke of the day, explained by the LLM when one is configured.
#[instrument(level = "info", skip_all)]
pub async fn joke(ctx: FetchContext) -> Result<String, FetchError> {
    let joke: Joke = get_json(&ctx.client, &ctx.config.delight.joke_url).await?;

    let explanation = match &ctx.llm {
        Some(llm) => {
            let prompt = format!(
                "You are a witty assistant who explains jokes clearly and briefly.\n\
                 Explain the humor in this joke in 1-2 short sentences:\n\n\
                 \"{} {}\"\n\n\
                 Avoid being too dry or too literal.",
                joke.setup, joke.punchline
            );
            Some(llm.complete_or(&prompt, NO_EXPLANATION).await)
        }
        None => {
            warn!("No LLM configured; joke goes unexplained");
            None
        }
    };

    Ok(render_joke(&joke, explanation.as_deref()))
}

pub fn render_joke(joke: &Joke, explanation: Option<&str>) -> String {
    let mut html = format!(
        "<h2>🃏 Joke of the Day</h2><p class=\"joke-setup\">{}</p><p class=\"joke-punchline\"><b>{}</b></p>",
        escape_text(&joke.setup),
        escape_text(&joke.punchline)
    );
    if let Some(explanation) = explanation {
        html.push_str(&format!(
            "<div class=\"joke-explanation\"><b>🤖 Why it's funny:</b><p>{}</p></div>",
            escape_text(explanation)
        ));
    }
    html
}
