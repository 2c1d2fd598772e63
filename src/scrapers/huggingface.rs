//! Hugging Face papers: daily, weekly, monthly and trending listings merged
//! into one set of paper cards.
//!
//! The four listings are crawled concurrently (bounded by
//! `huggingface.workers`) and overlap heavily, so every sighting goes through
//! a shared [`PaperBook`]:
//!
//! 1. Under the lock, look the title up. If it is known, add the listing's tag
//!    and stop. Otherwise insert a `Pending` record. Both happen in one
//!    critical section, so exactly one listing claims each title.
//! 2. With the lock released, fetch the paper page (network I/O).
//! 3. Re-acquire the lock and store the fetched details (or the failure).
//!
//! Because the claim is atomic, a title's detail page is fetched at most once
//! per run even when several listings sight it at the same moment.

use super::{FetchContext, element_text, get_text, selector};
use crate::error::FetchError;
use crate::utils::{collapse_whitespace, escape_attr, escape_text};
use chrono::{Datelike, Local, NaiveDate};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

static PUBLISHED_ON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Published on ([A-Za-z]+\.? \d{1,2}(?:, \d{4})?)").unwrap()
});
static ENDS_WITH_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}$").unwrap());

/// Which listing a paper was sighted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaperTag {
    Daily,
    Weekly,
    Monthly,
    Trending,
}

impl PaperTag {
    pub const ALL: [PaperTag; 4] = [
        PaperTag::Daily,
        PaperTag::Weekly,
        PaperTag::Monthly,
        PaperTag::Trending,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaperTag::Daily => "DAILY",
            PaperTag::Weekly => "WEEKLY",
            PaperTag::Monthly => "MONTHLY",
            PaperTag::Trending => "TRENDING",
        }
    }

    /// Listing URL for this tag on `today`.
    pub fn listing_url(self, base: &str, today: NaiveDate) -> String {
        let base = base.trim_end_matches('/');
        match self {
            PaperTag::Daily => format!("{base}/papers/date/{}", today.format("%Y-%m-%d")),
            PaperTag::Weekly => format!("{base}/papers/week/{}", today.format("%G-W%V")),
            PaperTag::Monthly => format!("{base}/papers/month/{}", today.format("%Y-%m")),
            PaperTag::Trending => format!("{base}/papers/trending"),
        }
    }
}

impl fmt::Display for PaperTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details scraped from a paper's own page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperDetails {
    pub pdf_link: String,
    pub github_link: Option<String>,
    pub abstract_text: String,
    pub published: Option<NaiveDate>,
    pub stars: Option<String>,
    pub upvotes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperState {
    /// Claimed by a listing; details not fetched yet.
    Pending,
    Fetched(PaperDetails),
    Failed { reason: String },
}

/// One paper, however many listings it appeared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRecord {
    pub title: String,
    pub paper_link: String,
    pub tags: BTreeSet<PaperTag>,
    pub state: PaperState,
}

/// Result of reporting a title to the [`PaperBook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sighting {
    /// First sighting: the caller owns the detail fetch.
    New,
    /// Already known: the tag was merged, nothing else to do.
    Seen,
}

#[derive(Debug, Default)]
struct Papers {
    records: Vec<PaperRecord>,
    by_title: HashMap<String, usize>,
}

/// Title-keyed paper records shared by the concurrent listing crawls.
///
/// Records keep first-sighting order and are never removed.
#[derive(Debug, Clone, Default)]
pub struct PaperBook {
    inner: Arc<Mutex<Papers>>,
}

impl PaperBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `title` appeared in the `tag` listing.
    pub async fn sight(&self, title: &str, paper_link: &str, tag: PaperTag) -> Sighting {
        let mut papers = self.inner.lock().await;
        if let Some(&i) = papers.by_title.get(title) {
            papers.records[i].tags.insert(tag);
            return Sighting::Seen;
        }
        let i = papers.records.len();
        papers.records.push(PaperRecord {
            title: title.to_string(),
            paper_link: paper_link.to_string(),
            tags: BTreeSet::from([tag]),
            state: PaperState::Pending,
        });
        papers.by_title.insert(title.to_string(), i);
        Sighting::New
    }

    /// Store the outcome of the detail fetch for a claimed title.
    pub async fn complete(&self, title: &str, state: PaperState) {
        let mut papers = self.inner.lock().await;
        match papers.by_title.get(title).copied() {
            Some(i) => papers.records[i].state = state,
            None => error!(%title, "Completed a paper that was never sighted"),
        }
    }

    /// Copy of every record in first-sighting order.
    pub async fn records(&self) -> Vec<PaperRecord> {
        self.inner.lock().await.records.clone()
    }
}

/// A paper as it appears in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedPaper {
    pub title: String,
    /// Site-relative path, e.g. `/papers/2501.00001`.
    pub href: String,
    pub link: String,
}

/// Crawl the four listings and render the merged paper cards.
#[instrument(level = "info", skip_all)]
pub async fn fetch(ctx: FetchContext) -> Result<String, FetchError> {
    let today = Local::now().date_naive();
    let records = collect(&ctx, today).await?;
    if records.is_empty() {
        return Err(FetchError::NoContent("no papers in any listing".into()));
    }
    info!(count = records.len(), "Fetched Hugging Face papers");
    Ok(render(&records))
}

/// Crawl every listing for `today` and return the merged records.
pub async fn collect(ctx: &FetchContext, today: NaiveDate) -> Result<Vec<PaperRecord>, FetchError> {
    let hf = &ctx.config.huggingface;
    let base = Url::parse(&hf.base_url)
        .map_err(|e| FetchError::parse(format!("bad Hugging Face url: {e}")))?;
    let book = PaperBook::new();

    let (book_ref, base_ref) = (&book, &base);
    stream::iter(PaperTag::ALL)
        .for_each_concurrent(hf.workers.max(1), |tag| async move {
            crawl_listing(ctx, book_ref, base_ref, tag, today).await;
        })
        .await;

    Ok(book.records().await)
}

#[instrument(level = "info", skip_all, fields(%tag))]
async fn crawl_listing(
    ctx: &FetchContext,
    book: &PaperBook,
    base: &Url,
    tag: PaperTag,
    today: NaiveDate,
) {
    let hf = &ctx.config.huggingface;
    let url = tag.listing_url(&hf.base_url, today);
    info!(%url, "Fetching listing");

    let html = match get_text(&ctx.client, &url).await {
        Ok(html) => html,
        Err(e) => {
            error!(%url, error = %e, "Listing fetch failed");
            return;
        }
    };
    let papers = match parse_listing(&html, base, hf.per_listing) {
        Ok(papers) => papers,
        Err(e) => {
            error!(%url, error = %e, "Listing parse failed");
            return;
        }
    };
    if papers.is_empty() {
        warn!(%url, "No papers found");
        return;
    }

    let mut claimed = 0usize;
    for (idx, paper) in papers.into_iter().enumerate() {
        let rank = idx + 1;
        if book.sight(&paper.title, &paper.link, tag).await == Sighting::Seen {
            debug!(rank, title = %paper.title, "Already sighted; merged tag");
            continue;
        }
        claimed += 1;
        debug!(rank, title = %paper.title, link = %paper.link, "Fetching paper details");

        let state = match get_text(&ctx.client, &paper.link).await {
            Ok(page) => match parse_details(&page, &paper.href, &hf.arxiv_base, today) {
                Ok(details) => PaperState::Fetched(details),
                Err(e) => PaperState::Failed {
                    reason: e.to_string(),
                },
            },
            Err(e) => PaperState::Failed {
                reason: e.to_string(),
            },
        };
        if let PaperState::Failed { reason } = &state {
            warn!(rank, title = %paper.title, %reason, "Paper details unavailable");
        }
        book.complete(&paper.title, state).await;
    }
    info!(claimed, "Listing done");
}

/// Extract up to `limit` papers from a listing page.
///
/// # Arguments
///
/// * `html` - Body of a `/papers/...` listing
/// * `base` - Site root the relative paper links resolve against
/// * `limit` - Maximum number of papers returned
///
/// # Returns
///
/// Papers in listing order. Articles without a titled link are skipped and
/// do not count towards `limit`.
pub fn parse_listing(html: &str, base: &Url, limit: usize) -> Result<Vec<ListedPaper>, FetchError> {
    let document = Html::parse_document(html);
    let article_sel = selector("article")?;
    let title_sel = selector("h3 a")?;

    let papers = document
        .select(&article_sel)
        .filter_map(|article| {
            let a = article.select(&title_sel).next()?;
            let href = a.value().attr("href")?;
            let link = base.join(href).ok()?;
            let title = element_text(a);
            (!title.is_empty()).then(|| ListedPaper {
                title,
                href: href.to_string(),
                link: link.to_string(),
            })
        })
        .take(limit)
        .collect();
    Ok(papers)
}

/// Extract the details from a paper page.
pub fn parse_details(
    html: &str,
    href: &str,
    arxiv_base: &str,
    today: NaiveDate,
) -> Result<PaperDetails, FetchError> {
    let document = Html::parse_document(html);
    let github_sel = selector(r#"a[href^="https://github.com"]"#)?;
    let span_sel = selector("span")?;
    let upvote_sel = selector(".font-semibold.text-orange-500")?;
    let og_description = selector(r#"meta[property="og:description"]"#)?;
    let description = selector(r#"meta[name="description"]"#)?;

    let paper_id = href
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| FetchError::parse(format!("no paper id in {href:?}")))?;
    let pdf_link = format!("{}/pdf/{paper_id}", arxiv_base.trim_end_matches('/'));

    let page_text = collapse_whitespace(&document.root_element().text().collect::<String>());
    let published = PUBLISHED_ON
        .captures(&page_text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_published_date(m.as_str(), today));

    let github = document.select(&github_sel).next();
    let github_link = github.and_then(|a| a.value().attr("href")).map(str::to_string);
    let stars = github
        .and_then(|a| a.select(&span_sel).last())
        .map(element_text)
        .filter(|s| !s.is_empty());

    let upvotes = document
        .select(&upvote_sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty());

    let abstract_text = document
        .select(&og_description)
        .chain(document.select(&description))
        .find_map(|m| m.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "(No abstract available)".to_string());

    Ok(PaperDetails {
        pdf_link,
        github_link,
        abstract_text,
        published,
        stars,
        upvotes,
    })
}

/// Parse "Mar 12, 2025", "March 12, 2025" or "Mar 12" (current year assumed).
///
/// "Sept" is accepted as an abbreviation of September.
pub fn parse_published_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim().replace('.', "");
    let raw = match raw.strip_prefix("Sept ") {
        Some(rest) => format!("Sep {rest}"),
        None => raw,
    };
    let dated = if ENDS_WITH_YEAR.is_match(&raw) {
        raw
    } else {
        format!("{raw}, {}", today.year())
    };
    ["%b %d, %Y", "%B %d, %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&dated, fmt).ok())
}

/// Render the merged papers as cards.
///
/// # Arguments
///
/// * `records` - Papers in first-sighting order
///
/// # Returns
///
/// One card per record carrying its tags (also as a `data-tags` attribute).
/// Fetched papers show date, PDF, upvotes, GitHub and abstract; papers whose
/// details failed show only title, link and tags.
pub fn render(records: &[PaperRecord]) -> String {
    let mut html = String::from("<h2>📚 Hugging Face Papers</h2><div class=\"papers\">");
    for record in records {
        let tags = record.tags.iter().map(|t| t.as_str()).join(" ");
        let tag_badges: String = record
            .tags
            .iter()
            .map(|t| format!("<span class=\"tag\">{t}</span>"))
            .collect();

        html.push_str(&format!(
            "<div class=\"paper\" data-tags=\"{}\"><h3><a href=\"{}\" target=\"_blank\">{}</a></h3><div class=\"tags\">{}</div>",
            tags,
            escape_attr(&record.paper_link),
            escape_text(&record.title),
            tag_badges
        ));

        match &record.state {
            PaperState::Fetched(details) => {
                let published = details
                    .published
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "Unknown date".to_string());
                html.push_str(&format!(
                    "<p class=\"published\">📅 {published}</p><div class=\"links\"><span>📄 <a href=\"{}\" target=\"_blank\">PDF</a></span>",
                    escape_attr(&details.pdf_link)
                ));
                if let Some(upvotes) = &details.upvotes {
                    html.push_str(&format!(" <span>👍 {}</span>", escape_text(upvotes)));
                }
                if let Some(github) = &details.github_link {
                    html.push_str(&format!(
                        " <span>💻 <a href=\"{}\" target=\"_blank\">GitHub</a></span>",
                        escape_attr(github)
                    ));
                    if let Some(stars) = &details.stars {
                        html.push_str(&format!(" <span>⭐ {}</span>", escape_text(stars)));
                    }
                }
                html.push_str(&format!(
                    "</div><div class=\"abstract\">{}</div>",
                    escape_text(&details.abstract_text)
                ));
            }
            PaperState::Failed { .. } | PaperState::Pending => {
                html.push_str("<p class=\"abstract\"><i>Details unavailable.</i></p>");
            }
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}
