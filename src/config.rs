//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so running without `--config` uses the public
//! endpoints the digest was written against. A config file only needs the
//! keys it wants to override:
//!
//! ```yaml
//! http:
//!   timeout_secs: 20
//! hackernews:
//!   top: 5
//! delight:
//!   quotes_path: /var/lib/digest/quotes.txt
//! ```
//!
//! Credentials never live here; they come from the environment through
//! [`crate::cli::Cli`].

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub apod: ApodConfig,
    #[serde(default)]
    pub earth_observatory: EarthObservatoryConfig,
    #[serde(default)]
    pub hackernews: HackerNewsConfig,
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,
    #[serde(default)]
    pub delight: DelightConfig,
    #[serde(default)]
    pub quotes: QuotesConfig,
    #[serde(default)]
    pub tarot_images: TarotImagesConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

impl DigestConfig {
    /// Load the configuration from `path`, or return defaults when `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        // an empty file deserializes to unit, not to an empty mapping
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Shared HTTP client settings for the digest edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout. Advisory: a timeout fails the section, it is never retried.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("daily_digest/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApodConfig {
    /// The page is fetched from here; relative media links resolve against it.
    #[serde(default = "default_apod_url")]
    pub url: String,
}

impl Default for ApodConfig {
    fn default() -> Self {
        Self {
            url: default_apod_url(),
        }
    }
}

fn default_apod_url() -> String {
    "https://apod.nasa.gov/apod/astropix.html".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarthObservatoryConfig {
    #[serde(default = "default_eo_url")]
    pub url: String,
}

impl Default for EarthObservatoryConfig {
    fn default() -> Self {
        Self {
            url: default_eo_url(),
        }
    }
}

fn default_eo_url() -> String {
    "https://earthobservatory.nasa.gov/topic/image-of-the-day".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HackerNewsConfig {
    #[serde(default = "default_hn_api")]
    pub api_base: String,
    /// Number of top stories listed.
    #[serde(default = "default_hn_top")]
    pub top: usize,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            api_base: default_hn_api(),
            top: default_hn_top(),
        }
    }
}

fn default_hn_api() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}

fn default_hn_top() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceConfig {
    #[serde(default = "default_hf_base")]
    pub base_url: String,
    /// Papers taken from each listing.
    #[serde(default = "default_hf_per_listing")]
    pub per_listing: usize,
    /// Listings crawled at the same time.
    #[serde(default = "default_hf_workers")]
    pub workers: usize,
    /// Prefix of the generated PDF links.
    #[serde(default = "default_arxiv_base")]
    pub arxiv_base: String,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_hf_base(),
            per_listing: default_hf_per_listing(),
            workers: default_hf_workers(),
            arxiv_base: default_arxiv_base(),
        }
    }
}

fn default_hf_base() -> String {
    "https://huggingface.co".to_string()
}

fn default_hf_per_listing() -> usize {
    15
}

fn default_hf_workers() -> usize {
    4
}

fn default_arxiv_base() -> String {
    "https://arxiv.org".to_string()
}

/// Endpoints and local files of the delight edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelightConfig {
    #[serde(default = "default_delight_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_affirmation_url")]
    pub affirmation_url: String,
    #[serde(default = "default_fun_fact_url")]
    pub fun_fact_url: String,
    #[serde(default = "default_joke_url")]
    pub joke_url: String,
    #[serde(default = "default_cat_fact_url")]
    pub cat_fact_url: String,
    #[serde(default = "default_cat_image_url")]
    pub cat_image_url: String,
    #[serde(default = "default_quotes_path")]
    pub quotes_path: PathBuf,
    #[serde(default = "default_tarot_path")]
    pub tarot_path: PathBuf,
}

impl Default for DelightConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_delight_timeout_secs(),
            affirmation_url: default_affirmation_url(),
            fun_fact_url: default_fun_fact_url(),
            joke_url: default_joke_url(),
            cat_fact_url: default_cat_fact_url(),
            cat_image_url: default_cat_image_url(),
            quotes_path: default_quotes_path(),
            tarot_path: default_tarot_path(),
        }
    }
}

fn default_delight_timeout_secs() -> u64 {
    5
}

fn default_affirmation_url() -> String {
    "https://www.affirmations.dev/".to_string()
}

fn default_fun_fact_url() -> String {
    "https://uselessfacts.jsph.pl/api/v2/facts/random?language=en".to_string()
}

fn default_joke_url() -> String {
    "https://official-joke-api.appspot.com/random_joke".to_string()
}

fn default_cat_fact_url() -> String {
    "https://meowfacts.herokuapp.com/".to_string()
}

fn default_cat_image_url() -> String {
    "https://api.thecatapi.com/v1/images/search".to_string()
}

fn default_quotes_path() -> PathBuf {
    PathBuf::from("quotes.txt")
}

fn default_tarot_path() -> PathBuf {
    PathBuf::from("tarot_cards/tarot.json")
}

/// Source of the quotes file crawled by the `quotes` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesConfig {
    #[serde(default = "default_quotes_base")]
    pub base_url: String,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            base_url: default_quotes_base(),
        }
    }
}

fn default_quotes_base() -> String {
    "https://www.goodreads.com/quotes".to_string()
}

/// Source of the card images fetched by the `tarot-images` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TarotImagesConfig {
    /// Wikimedia Commons category listing one file page per card.
    #[serde(default = "default_tarot_category")]
    pub category_url: String,
    /// Pause between two card downloads.
    #[serde(default = "default_tarot_delay_ms")]
    pub delay_ms: u64,
}

impl Default for TarotImagesConfig {
    fn default() -> Self {
        Self {
            category_url: default_tarot_category(),
            delay_ms: default_tarot_delay_ms(),
        }
    }
}

fn default_tarot_category() -> String {
    "https://commons.wikimedia.org/wiki/Category:The_Pictorial_Key_to_the_Tarot".to_string()
}

fn default_tarot_delay_ms() -> u64 {
    1000
}

/// OpenRouter settings. The API key comes from `OPENROUTER_API`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base(),
            model: default_llm_model(),
        }
    }
}

fn default_llm_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_llm_model() -> String {
    "mistralai/mistral-nemo:free".to_string()
}

/// SMTP relay used for email delivery (implicit TLS).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
        }
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}
