//! Hacker News top stories via the public Firebase API.

use super::{FetchContext, get_json};
use crate::error::FetchError;
use crate::utils::{escape_attr, escape_text};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// Item requests in flight at once, however many stories are listed.
const MAX_ITEM_FETCHES: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct HnItem {
    pub id: u64,
    pub title: Option<String>,
    pub url: Option<String>,
}

/// A story as listed in the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HnStory {
    pub rank: usize,
    pub title: String,
    pub url: String,
}

impl HnStory {
    fn from_item(rank: usize, item: HnItem) -> Self {
        let url = item.url.unwrap_or_else(|| discussion_url(item.id));
        Self {
            rank,
            title: item.title.unwrap_or_else(|| "(no title)".to_string()),
            url,
        }
    }

    fn unavailable(rank: usize, id: u64) -> Self {
        Self {
            rank,
            title: "(no title)".to_string(),
            url: discussion_url(id),
        }
    }
}

fn discussion_url(id: u64) -> String {
    format!("https://news.ycombinator.com/item?id={id}")
}

/// Fetch the top stories and render them as an ordered list.
///
/// Items are fetched concurrently but listed in rank order. An item that
/// fails to load is listed with a link to its discussion page.
#[instrument(level = "info", skip_all)]
pub async fn fetch(ctx: FetchContext) -> Result<String, FetchError> {
    let hn = &ctx.config.hackernews;
    let base = hn.api_base.trim_end_matches('/');
    info!(top = hn.top, "Fetching Hacker News");

    let ids: Vec<u64> = get_json(&ctx.client, &format!("{base}/topstories.json")).await?;
    if ids.is_empty() {
        return Err(FetchError::NoContent("empty top stories list".into()));
    }
    let top: Vec<u64> = ids.into_iter().take(hn.top).collect();
    let concurrency = item_concurrency(top.len());

    let client = &ctx.client;
    let stories: Vec<HnStory> = stream::iter(top.into_iter().enumerate())
        .map(|(i, id)| async move {
            let rank = i + 1;
            match get_json::<HnItem>(client, &format!("{base}/item/{id}.json")).await {
                Ok(item) => {
                    let story = HnStory::from_item(rank, item);
                    debug!(rank, title = %story.title, url = %story.url, "Fetched HN item");
                    story
                }
                Err(e) => {
                    warn!(rank, id, error = %e, "HN item fetch failed");
                    HnStory::unavailable(rank, id)
                }
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    info!(count = stories.len(), "Fetched Hacker News stories");
    Ok(render(&stories))
}

fn item_concurrency(stories: usize) -> usize {
    stories.clamp(1, MAX_ITEM_FETCHES)
}

/// Render stories as a numbered list.
///
/// # Arguments
///
/// * `stories` - Stories in rank order
///
/// # Returns
///
/// An HTML fragment with a heading counting the stories and one `<li>` per
/// story, titles and links escaped.
pub fn render(stories: &[HnStory]) -> String {
    let mut html = format!("<h2>🔥 Hacker News Top {}</h2><ol>", stories.len());
    for story in stories {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>",
            escape_attr(&story.url),
            escape_text(&story.title)
        ));
    }
    html.push_str("</ol>");
    html
}
