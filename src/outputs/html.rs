//! The document template.
//!
//! Fragments are inserted verbatim: each source escapes the scraped values it
//! interpolates, and the fallbacks escape their error text.

use crate::aggregator::ResultStore;
use crate::utils::escape_text;
use chrono::NaiveDate;

const SEPARATOR: &str = "<hr>";

const STYLE: &str = "body{font-family:Arial,sans-serif;max-width:640px;margin:auto;padding:20px;color:#222}\
img{max-width:100%}\
.error-text{color:#b00}\
.tag{display:inline-block;margin-right:4px;padding:1px 6px;border-radius:8px;background:#eef;font-size:0.8em}\
.paper{margin-bottom:1.2em}";

const EMPTY_BODY: &str = "<p style=\"text-align:center\"><i>Nothing to show today.</i></p>";

/// Render the full page: title, date, then every section in key order.
///
/// # Arguments
///
/// * `title` - Page title, also used as the heading
/// * `date` - Date printed under the heading
/// * `store` - Sections of the run; an empty store renders a placeholder body
///
/// # Returns
///
/// A complete HTML document.
pub fn render_document(title: &str, date: NaiveDate, store: &ResultStore) -> String {
    let body = if store.is_empty() {
        EMPTY_BODY.to_string()
    } else {
        store.concat(SEPARATOR)
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <h1 style=\"text-align:center\">{title}</h1>\n\
         <p style=\"text-align:center\">{date}</p>\n{SEPARATOR}\n{body}\n</body>\n</html>\n",
        title = escape_text(title),
        date = date.format("%A, %B %-d, %Y"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::error::FetchError;

    #[tokio::test]
    async fn test_sections_appear_in_key_order() {
        let mut agg = Aggregator::new();
        agg.task("b", || async { Ok("<p>second-key</p>".to_string()) }, |_| String::new())
            .unwrap()
            .task(
                "a",
                || async { Err(FetchError::NoContent("nothing".into())) },
                |_| "<p>fallback</p>".to_string(),
            )
            .unwrap();
        let store = agg.run().await;

        let date = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        let page = render_document("Daily <Digest>", date, &store);
        assert!(page.contains("<title>Daily &lt;Digest&gt;</title>"));
        assert!(page.contains("Tuesday, May 6, 2025"));
        assert!(page.contains("<p>second-key</p><hr><p>fallback</p>"));
    }

    #[tokio::test]
    async fn test_empty_store_renders_placeholder() {
        let store = Aggregator::new().run().await;
        let date = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        let page = render_document("Daily Digest", date, &store);
        assert!(page.contains("Nothing to show today."));
    }
}
