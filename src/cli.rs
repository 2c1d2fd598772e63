//! Command-line interface definitions.
//!
//! Credentials and recipients are read from the environment (the same names
//! the cron jobs export); everything else about the sources lives in the
//! optional YAML config.

use crate::editions::Edition;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Preview the digest in digest_preview.html
/// daily_digest digest
///
/// # Mail the delight edition
/// daily_digest --config digest.yaml delight --email
///
/// # Refill the quotes file from ten listing pages
/// daily_digest quotes --pages 10
///
/// # Fetch the card images next to tarot.json
/// daily_digest tarot-images
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SMTP login and sender address
    #[arg(long, env = "SENDER_EMAIL", hide_env_values = true)]
    pub sender_email: Option<String>,

    /// SMTP password (an app password for Gmail)
    #[arg(long, env = "SENDER_PASSWORD", hide_env_values = true)]
    pub sender_password: Option<String>,

    /// Recipient of the digest edition
    #[arg(long, env = "DIGEST_EMAIL", hide_env_values = true)]
    pub digest_email: Option<String>,

    /// Recipient of the delight edition
    #[arg(long, env = "DELIGHT_EMAIL", hide_env_values = true)]
    pub delight_email: Option<String>,

    /// OpenRouter API key; enables summaries, joke explanations and tarot guidance
    #[arg(long, env = "OPENROUTER_API", hide_env_values = true)]
    pub openrouter_api: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the daily digest (APOD, Earth Observatory, Hacker News, Hugging Face)
    Digest(EditionArgs),
    /// Build the daily delight (affirmation, cat, tarot, joke, fun fact, quote)
    Delight(EditionArgs),
    /// Crawl quotes into the quotes file
    Quotes {
        /// Number of listing pages to crawl
        #[arg(short, long, default_value_t = 100)]
        pages: u32,
    },
    /// Download the tarot card images into the deck directory
    TarotImages,
}

#[derive(Args, Debug, Clone)]
pub struct EditionArgs {
    /// Write the document to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Send the document by email
    #[arg(short, long)]
    pub email: bool,
}

impl EditionArgs {
    /// Where to write the document: `--output`, or the edition's preview file
    /// when nothing else would deliver it.
    pub fn output_path(&self, edition: Edition) -> Option<PathBuf> {
        match (&self.output, self.email) {
            (Some(path), _) => Some(path.clone()),
            (None, false) => Some(edition.default_output()),
            (None, true) => None,
        }
    }
}

impl Cli {
    /// Recipient configured for `edition`, with the variable it comes from.
    pub fn recipient(&self, edition: Edition) -> (Option<String>, &'static str) {
        match edition {
            Edition::Digest => (self.digest_email.clone(), "DIGEST_EMAIL"),
            Edition::Delight => (self.delight_email.clone(), "DELIGHT_EMAIL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_digest_defaults() {
        let cli = Cli::parse_from(["daily_digest", "digest"]);
        let Command::Digest(args) = cli.command else {
            panic!("expected digest");
        };
        assert!(!args.email);
        assert_eq!(
            args.output_path(Edition::Digest),
            Some(PathBuf::from("digest_preview.html"))
        );
    }

    #[test]
    fn test_cli_short_flags_and_global_config() {
        let cli = Cli::parse_from(["daily_digest", "delight", "-e", "-o", "/tmp/d.html", "-c", "x.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
        let Command::Delight(args) = cli.command else {
            panic!("expected delight");
        };
        assert!(args.email);
        assert_eq!(args.output_path(Edition::Delight), Some(PathBuf::from("/tmp/d.html")));
    }

    #[test]
    fn test_email_only_writes_no_file() {
        let cli = Cli::parse_from(["daily_digest", "digest", "--email"]);
        let Command::Digest(args) = cli.command else {
            panic!("expected digest");
        };
        assert_eq!(args.output_path(Edition::Digest), None);
    }

    #[test]
    fn test_quotes_pages() {
        let cli = Cli::parse_from(["daily_digest", "quotes", "--pages", "3"]);
        assert!(matches!(cli.command, Command::Quotes { pages: 3 }));

        let cli = Cli::parse_from(["daily_digest", "quotes"]);
        assert!(matches!(cli.command, Command::Quotes { pages: 100 }));
    }

    #[test]
    fn test_tarot_images_subcommand() {
        let cli = Cli::parse_from(["daily_digest", "-c", "x.yaml", "tarot-images"]);
        assert!(matches!(cli.command, Command::TarotImages));
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
    }

    #[test]
    fn test_recipient_flags() {
        let cli = Cli::parse_from([
            "daily_digest",
            "--digest-email",
            "d@example.com",
            "--delight-email",
            "l@example.com",
            "digest",
        ]);
        assert_eq!(
            cli.recipient(Edition::Digest),
            (Some("d@example.com".to_string()), "DIGEST_EMAIL")
        );
        assert_eq!(cli.recipient(Edition::Delight).1, "DELIGHT_EMAIL");
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["daily_digest"]).is_err());
    }
}
