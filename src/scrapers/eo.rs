//! NASA Earth Observatory image of the day.
//!
//! The landing page lists recent images as cards; the first card of the
//! landing block is today's. When an LLM is configured the linked article is
//! fetched as well and summarized into a short paragraph.

use super::{FetchContext, element_text, get_text, selector};
use crate::error::FetchError;
use crate::utils::{escape_attr, escape_text, truncate_for_log};
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

const NO_SUMMARY: &str = "No summary available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EoCard {
    pub title: String,
    pub link: String,
    pub image_url: String,
    pub caption: String,
}

/// Fetch the image of the day, plus the article summary when possible.
#[instrument(level = "info", skip_all)]
pub async fn fetch(ctx: FetchContext) -> Result<String, FetchError> {
    let url = &ctx.config.earth_observatory.url;
    info!(%url, "Fetching Earth Observatory Image of the Day");
    let listing_url = Url::parse(url).map_err(|e| FetchError::parse(format!("bad EO url: {e}")))?;

    let html = get_text(&ctx.client, url).await?;
    let card = parse_listing(&html, &listing_url)?;
    info!(title = %card.title, image = %card.image_url, "Parsed EO card");

    let summary = match &ctx.llm {
        Some(llm) => match article_text(&ctx.client, &card.link).await {
            Ok(text) if !text.is_empty() => {
                let prompt = format!(
                    "You are a strict scientific summarizer. Output only the summary. \
                     No explanations, no intros, no markdown, no HTML, no links, no emojis, no lists.\n\
                     Summarize the following article concisely and ignore irrelevant information:\n{text}"
                );
                Some(llm.complete_or(&prompt, NO_SUMMARY).await)
            }
            Ok(_) => {
                warn!(link = %card.link, "EO article had no text; skipping summary");
                None
            }
            Err(e) => {
                warn!(link = %card.link, error = %e, "EO article fetch failed; skipping summary");
                None
            }
        },
        None => None,
    };

    Ok(render(&card, summary.as_deref()))
}

/// Extract the first landing card from the listing page.
pub fn parse_listing(html: &str, listing_url: &Url) -> Result<EoCard, FetchError> {
    let document = Html::parse_document(html);
    let card_sel = selector(".first-landing-cards .masonry-item")?;
    let title_sel = selector("h4 a")?;
    let image_sel = selector(".thumbnail-image img")?;
    let caption_sel = selector(".caption p")?;

    let card = document
        .select(&card_sel)
        .next()
        .ok_or(FetchError::MissingElement("EO landing card"))?;

    let title_link = card.select(&title_sel).next();
    let title = title_link
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No Title Found".to_string());
    let link = title_link
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| listing_url.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| "#".to_string());

    let image_url = card
        .select(&image_sel)
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| listing_url.join(src).ok())
        .map(|u| u.to_string())
        .unwrap_or_default();

    let caption = card
        .select(&caption_sel)
        .next()
        .map(element_text)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "No Summary Found".to_string());

    Ok(EoCard {
        title,
        link,
        image_url,
        caption,
    })
}

async fn article_text(client: &reqwest::Client, link: &str) -> Result<String, FetchError> {
    if link == "#" {
        return Err(FetchError::MissingElement("EO article link"));
    }
    let html = get_text(client, link).await?;
    let text = parse_article(&html)?;
    debug!(preview = %truncate_for_log(&text, 200), "EO article text");
    Ok(text)
}

/// Join the paragraphs of the article body.
pub fn parse_article(html: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(html);
    let body_sel = selector("div.col-lg-8 p")?;
    let fallback_sel = selector("article p")?;

    let mut paragraphs: Vec<String> = document.select(&body_sel).map(element_text).collect();
    if paragraphs.is_empty() {
        paragraphs = document.select(&fallback_sel).map(element_text).collect();
    }
    paragraphs.retain(|p| !p.is_empty());
    Ok(paragraphs.join(" "))
}

/// Render the Earth Observatory section.
///
/// # Arguments
///
/// * `card` - The image of the day from the listing page
/// * `summary` - LLM summary of the linked article, if one was produced
///
/// # Returns
///
/// An HTML fragment with the image, the caption and a "Read more" link; the
/// summary block is omitted when `summary` is `None`.
pub fn render(card: &EoCard, summary: Option<&str>) -> String {
    let mut html = format!(
        "<h2>🌍 NASA Earth Observatory - Image of the Day</h2>\
         <div class=\"eo\"><h3>{}</h3>\
         <img src=\"{}\" alt=\"Earth Observatory\" style=\"width: 100%; border-radius: 8px;\">\
         <p class=\"caption\">{} <a href=\"{}\" target=\"_blank\">[Read more]</a></p></div>",
        escape_text(&card.title),
        escape_attr(&card.image_url),
        escape_text(&card.caption),
        escape_attr(&card.link),
    );
    if let Some(summary) = summary {
        html.push_str(&format!(
            "<div class=\"summary\"><b>🤖 Summary</b><p>{}</p></div>",
            escape_text(summary)
        ));
    }
    html
}
