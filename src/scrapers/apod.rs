//! NASA Astronomy Picture of the Day.
//!
//! The APOD page is a hand-written HTML document that has barely changed in
//! decades: the title is the bold text of the second `<center>`, the media is
//! the first `<img>` (or a `<video><source>` on video days), and the
//! explanation is the third paragraph, which runs into the "Tomorrow's
//! picture" footer.

use super::{FetchContext, element_text, get_text, selector};
use crate::error::FetchError;
use crate::utils::{escape_attr, escape_text};
use scraper::Html;
use tracing::{info, instrument};
use url::Url;

/// The media shown for the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApodMedia {
    Image(String),
    Video(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApodEntry {
    pub title: String,
    pub media: ApodMedia,
    /// Kept as HTML: the explanation links to glossary pages.
    pub explanation: String,
}

/// Fetch today's APOD and render it.
#[instrument(level = "info", skip_all)]
pub async fn fetch(ctx: FetchContext) -> Result<String, FetchError> {
    let url = &ctx.config.apod.url;
    info!(%url, "Fetching Astronomy Picture of the Day");
    let page_url = Url::parse(url).map_err(|e| FetchError::parse(format!("bad APOD url: {e}")))?;

    let html = get_text(&ctx.client, url).await?;
    let entry = parse_page(&html, &page_url)?;
    info!(title = %entry.title, media = ?entry.media, "Parsed APOD");
    Ok(render(&entry))
}

/// Extract the entry from an APOD page.
///
/// # Arguments
///
/// * `html` - Body of the APOD page
/// * `page_url` - Address the page was fetched from; relative media links
///   resolve against it
///
/// # Returns
///
/// The title (from the second `<center>` block), the image or video, and the
/// explanation paragraph cut before "Tomorrow's picture:". Fails with
/// [`FetchError::MissingElement`] when the page has neither image nor video.
pub fn parse_page(html: &str, page_url: &Url) -> Result<ApodEntry, FetchError> {
    let document = Html::parse_document(html);
    let center = selector("center")?;
    let bold = selector("b")?;
    let img = selector("img")?;
    let video_source = selector("video source")?;
    let paragraph = selector("p")?;

    let title = document
        .select(&center)
        .nth(1)
        .and_then(|c| c.select(&bold).next())
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No Title Found".to_string());

    let resolve = |src: &str| {
        page_url
            .join(src)
            .map(|u| u.to_string())
            .map_err(|e| FetchError::parse(format!("bad media link {src:?}: {e}")))
    };
    let media = if let Some(src) = document.select(&img).find_map(|e| e.value().attr("src")) {
        ApodMedia::Image(resolve(src)?)
    } else if let Some(src) = document
        .select(&video_source)
        .find_map(|e| e.value().attr("src"))
    {
        ApodMedia::Video(resolve(src)?)
    } else {
        return Err(FetchError::MissingElement("APOD image or video"));
    };

    let explanation = document
        .select(&paragraph)
        .nth(2)
        .map(|p| {
            let raw = p.inner_html();
            raw.split("Tomorrow's picture:")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "No explanation available.".to_string());

    Ok(ApodEntry {
        title,
        media,
        explanation,
    })
}

/// Render an entry as the APOD section.
///
/// The explanation is inserted as-is: it is the page's own markup, links included.
pub fn render(entry: &ApodEntry) -> String {
    let media = match &entry.media {
        ApodMedia::Image(src) => format!(
            "<img src=\"{}\" alt=\"APOD\" style=\"width: 100%; border-radius: 8px;\">",
            escape_attr(src)
        ),
        ApodMedia::Video(src) => format!(
            "<video controls style=\"width: 100%; border-radius: 8px;\"><source src=\"{}\"></video>",
            escape_attr(src)
        ),
    };
    format!(
        "<h2>✨ Astronomy Picture of the Day</h2>\
         <div class=\"apod\"><h3>{}</h3>{}</div>\
         <p class=\"explanation\">{}</p>",
        escape_text(&entry.title),
        media,
        entry.explanation
    )
}
