//! Tarot card of the day, drawn from a local deck, and the crawler that
//! downloads the card images next to it.
//!
//! The draw is seeded with the date (`YYYYMMDD`), so every run on the same
//! day shows the same card.

use super::{FetchContext, get_text, selector};
use crate::config::DigestConfig;
use crate::error::FetchError;
use crate::utils::{escape_attr, escape_text};
use chrono::{Datelike, Local, NaiveDate};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scraper::Html;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const NO_GUIDANCE: &str = "No guidance available.";

#[derive(Debug, Clone, Deserialize)]
pub struct TarotDeck {
    pub cards: Vec<TarotCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TarotCard {
    pub name: String,
    pub meaning_up: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub image: String,
}

impl TarotDeck {
    pub async fn load(path: &Path) -> Result<Self, FetchError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        let deck: TarotDeck = serde_json::from_str(&raw)?;
        Ok(deck)
    }

    /// The card for `date`.
    pub fn draw(&self, date: NaiveDate) -> Result<&TarotCard, FetchError> {
        if self.cards.is_empty() {
            return Err(FetchError::NoContent("tarot deck has no cards".into()));
        }
        let mut rng = StdRng::seed_from_u64(day_seed(date));
        Ok(&self.cards[rng.random_range(0..self.cards.len())])
    }
}

fn day_seed(date: NaiveDate) -> u64 {
    date.year() as u64 * 10_000 + u64::from(date.month()) * 100 + u64::from(date.day())
}

#[instrument(level = "info", skip_all)]
pub async fn fetch(ctx: FetchContext) -> Result<String, FetchError> {
    let path = &ctx.config.delight.tarot_path;
    let deck = TarotDeck::load(path).await?;
    let card = deck.draw(Local::now().date_naive())?;
    info!(card = %card.name, deck = deck.cards.len(), "Drew tarot card");

    let guidance = match &ctx.llm {
        Some(llm) => {
            let prompt = format!(
                "You are a warm and uplifting tarot advisor. The user has drawn the \"{}\" tarot card.\n\n\
                 Card Meaning: \"{}\"\n\n\
                 Card Description: \"{}\"\n\n\
                 Write a short, kind, and encouraging 2-3 sentence daily guidance inspired by this card. \
                 Make it feel supportive, reassuring, and hopeful, never negative or ominous.\n\n\
                 Avoid repeating the card name. Speak as if gently guiding a friend to have a beautiful day.",
                card.name, card.meaning_up, card.desc
            );
            Some(llm.complete_or(&prompt, NO_GUIDANCE).await)
        }
        None => None,
    };

    Ok(render(card, guidance.as_deref()))
}

pub fn render(card: &TarotCard, guidance: Option<&str>) -> String {
    let mut html = format!(
        "<h2>🔮 Tarot Card of the Day</h2><div class=\"tarot\"><h3>{}</h3>",
        escape_text(&card.name)
    );
    if !card.image.is_empty() {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\" class=\"tarot-image\">",
            escape_attr(&card.image),
            escape_attr(&card.name)
        ));
    }
    html.push_str(&format!(
        "<p><b>✨ Core Meaning</b><br>{}</p>",
        escape_text(&card.meaning_up)
    ));
    if !card.desc.is_empty() {
        html.push_str(&format!(
            "<p><b>📜 Description</b><br>{}</p>",
            escape_text(&card.desc)
        ));
    }
    if let Some(guidance) = guidance {
        html.push_str(&format!(
            "<p><b>🔍 Daily Guidance</b><br>{}</p>",
            escape_text(guidance)
        ));
    }
    html.push_str("</div>");
    html
}

/// Directory holding the deck file; card images are saved there too.
pub fn deck_dir(tarot_path: &Path) -> PathBuf {
    match tarot_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Download every card image of the configured Wikimedia category into the
/// deck directory. Returns the number of images saved.
///
/// The category page must load; a card whose file page or image fails is
/// logged and skipped.
#[instrument(level = "info", skip_all)]
pub async fn crawl_images(client: &reqwest::Client, config: &DigestConfig) -> Result<usize, FetchError> {
    let settings = &config.tarot_images;
    let category = Url::parse(&settings.category_url)
        .map_err(|e| FetchError::parse(format!("bad category url {:?}: {e}", settings.category_url)))?;
    let dir = deck_dir(&config.delight.tarot_path);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| FetchError::io(&dir, e))?;

    let listing = get_text(client, category.as_str()).await?;
    let pages = parse_file_pages(&listing, &category)?;
    info!(count = pages.len(), dir = %dir.display(), "Found tarot file pages");

    let delay = Duration::from_millis(settings.delay_ms);
    let mut saved = 0;
    for (i, page) in pages.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match download_card(client, page, &dir).await {
            Ok(Some(path)) => {
                info!(page = %page, path = %path.display(), "Saved tarot image");
                saved += 1;
            }
            Ok(None) => warn!(page = %page, "No full-size image link; skipping"),
            Err(e) => warn!(page = %page, error = %e, "Skipping tarot image"),
        }
    }

    info!(saved, "Tarot image crawl finished");
    Ok(saved)
}

async fn download_card(
    client: &reqwest::Client,
    page: &Url,
    dir: &Path,
) -> Result<Option<PathBuf>, FetchError> {
    let html = get_text(client, page.as_str()).await?;
    let Some(image) = parse_full_image(&html, page)? else {
        return Ok(None);
    };
    let name = image_file_name(&image)
        .ok_or_else(|| FetchError::parse(format!("no file name in {image}")))?;

    let response = client.get(image.as_str()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: image.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await?;
    debug!(url = %image, bytes = bytes.len(), "Downloaded image");

    let path = dir.join(name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| FetchError::io(&path, e))?;
    Ok(Some(path))
}

/// File pages linked from a category gallery, resolved against `category`.
pub fn parse_file_pages(html: &str, category: &Url) -> Result<Vec<Url>, FetchError> {
    let document = Html::parse_document(html);
    let link_sel = selector("a.mw-file-description")?;
    Ok(document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| category.join(href).ok())
        .unique()
        .collect())
}

/// The full-size image linked from a file page, if any.
pub fn parse_full_image(html: &str, page: &Url) -> Result<Option<Url>, FetchError> {
    let document = Html::parse_document(html);
    let link_sel = selector("div.fullImageLink a")?;
    Ok(document
        .select(&link_sel)
        .find_map(|a| a.value().attr("href"))
        .and_then(|href| page.join(href).ok()))
}

fn image_file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .last()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn deck() -> TarotDeck {
        serde_json::from_str(
            r#"{"cards":[
                {"name":"The Fool","meaning_up":"Beginnings","desc":"A traveller.","image":"fool.jpg"},
                {"name":"The Star","meaning_up":"Hope"},
                {"name":"The Sun","meaning_up":"Joy","desc":"","image":""}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_day_seed() {
        assert_eq!(day_seed(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()), 20250307);
    }

    #[test]
    fn test_draw_is_stable_for_a_day() {
        let deck = deck();
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let first = deck.draw(day).unwrap().clone();
        for _ in 0..5 {
            assert_eq!(deck.draw(day).unwrap(), &first);
        }
    }

    #[test]
    fn test_draw_varies_across_days() {
        let deck = deck();
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let names: HashSet<String> = start
            .iter_days()
            .take(60)
            .map(|d| deck.draw(d).unwrap().name.clone())
            .collect();
        assert!(names.len() > 1);
    }

    #[test]
    fn test_empty_deck() {
        let deck = TarotDeck { cards: Vec::new() };
        let err = deck.draw(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).unwrap_err();
        assert!(matches!(err, FetchError::NoContent(_)));
    }

    #[test]
    fn test_render_skips_empty_parts() {
        let deck = deck();
        let html = render(&deck.cards[1], None);
        assert!(html.contains("The Star"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("Description"));
        assert!(!html.contains("Daily Guidance"));

        let html = render(&deck.cards[0], Some("Be brave."));
        assert!(html.contains("src=\"fool.jpg\""));
        assert!(html.contains("Be brave."));
    }

    #[tokio::test]
    async fn test_fetch_from_deck_file() {
        let dir = tempfile::tempdir().unwrap();
        let deck_path = dir.path().join("tarot.json");
        std::fs::write(&deck_path, r#"{"cards":[{"name":"The Moon","meaning_up":"Dreams"}]}"#)
            .unwrap();

        let mut config = DigestConfig::default();
        config.delight.tarot_path = deck_path;
        let ctx = FetchContext::new(reqwest::Client::new(), Arc::new(config), None);
        let html = fetch(ctx).await.unwrap();
        assert!(html.contains("The Moon"));
    }

    #[tokio::test]
    async fn test_fetch_missing_deck() {
        let mut config = DigestConfig::default();
        config.delight.tarot_path = "/no/such/tarot.json".into();
        let ctx = FetchContext::new(reqwest::Client::new(), Arc::new(config), None);
        let err = fetch(ctx).await.unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[test]
    fn test_deck_dir() {
        assert_eq!(deck_dir(Path::new("tarot_cards/tarot.json")), PathBuf::from("tarot_cards"));
        assert_eq!(deck_dir(Path::new("tarot.json")), PathBuf::from("."));
    }

    #[test]
    fn test_parse_file_pages_resolves_and_dedups() {
        let category = Url::parse("https://commons.wikimedia.org/wiki/Category:Tarot").unwrap();
        let html = r#"<ul class="gallery">
<li><a href="/wiki/File:RWS_Tarot_00_Fool.jpg" class="mw-file-description"><img src="t.jpg"></a></li>
<li><a href="/wiki/File:RWS_Tarot_00_Fool.jpg" class="mw-file-description"><img src="t.jpg"></a></li>
<li><a href="/wiki/File:RWS_Tarot_01_Magician.jpg" class="mw-file-description"></a></li>
<li><a href="/wiki/Special:Upload">Upload</a></li>
</ul>"#;
        let pages = parse_file_pages(html, &category).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(
            pages[0].as_str(),
            "https://commons.wikimedia.org/wiki/File:RWS_Tarot_00_Fool.jpg"
        );
    }

    #[test]
    fn test_parse_full_image() {
        let page = Url::parse("https://commons.wikimedia.org/wiki/File:Fool.jpg").unwrap();
        let html = r#"<div class="fullImageLink" id="file"><a href="https://upload.wikimedia.org/wikipedia/commons/9/90/RWS_Tarot_00_Fool.jpg"><img src="x"></a></div>"#;
        let image = parse_full_image(html, &page).unwrap().unwrap();
        assert_eq!(image_file_name(&image).as_deref(), Some("RWS_Tarot_00_Fool.jpg"));

        assert_eq!(parse_full_image("<div class=\"other\"></div>", &page).unwrap(), None);
    }

    #[tokio::test]
    async fn test_crawl_images_saves_cards_and_skips_failures() {
        let server = MockServer::start().await;
        let uri = server.uri();
        Mock::given(method("GET"))
            .and(path("/wiki/Category_Tarot"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a class="mw-file-description" href="/wiki/File_Fool.jpg"></a>
<a class="mw-file-description" href="/wiki/File_Magician.jpg"></a>
<a class="mw-file-description" href="/wiki/File_Star.jpg"></a>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wiki/File_Fool.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<div class="fullImageLink"><a href="{uri}/upload/RWS_Fool.jpg">full</a></div>"#
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/upload/RWS_Fool.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wiki/File_Magician.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wiki/File_Star.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>no image here</p>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = DigestConfig::default();
        config.delight.tarot_path = dir.path().join("cards/tarot.json");
        config.tarot_images.category_url = format!("{uri}/wiki/Category_Tarot");
        config.tarot_images.delay_ms = 0;

        let saved = crawl_images(&reqwest::Client::new(), &config).await.unwrap();
        assert_eq!(saved, 1);
        let cards = dir.path().join("cards");
        assert_eq!(std::fs::read(cards.join("RWS_Fool.jpg")).unwrap(), vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(std::fs::read_dir(&cards).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_crawl_images_needs_the_category_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = DigestConfig::default();
        config.delight.tarot_path = dir.path().join("tarot.json");
        config.tarot_images.category_url = format!("{}/wiki/Category_Tarot", server.uri());

        let err = crawl_images(&reqwest::Client::new(), &config).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }
}
