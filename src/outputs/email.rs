//! Email delivery over SMTP with implicit TLS.

use crate::config::SmtpConfig;
use crate::error::DeliveryError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

/// Who sends the document, to whom, and the sender's SMTP password.
#[derive(Clone)]
pub struct Envelope {
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl Envelope {
    /// Assemble the envelope from optional environment values.
    /// `recipient_var` names the variable reported when the recipient is missing.
    pub fn from_parts(
        sender: Option<String>,
        password: Option<String>,
        recipient: Option<String>,
        recipient_var: &'static str,
    ) -> Result<Self, DeliveryError> {
        fn present(value: Option<String>, var: &'static str) -> Result<String, DeliveryError> {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(DeliveryError::MissingCredentials(var))
        }
        Ok(Self {
            sender: present(sender, "SENDER_EMAIL")?,
            password: present(password, "SENDER_PASSWORD")?,
            recipient: present(recipient, recipient_var)?,
        })
    }
}

/// Build the HTML message.
pub fn build_message(envelope: &Envelope, subject: &str, html: &str) -> Result<Message, DeliveryError> {
    let from: Mailbox = envelope.sender.parse()?;
    let to: Mailbox = envelope.recipient.parse()?;
    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())?;
    Ok(message)
}

/// Send `html` to the envelope's recipient. Never retried.
#[instrument(level = "info", skip(smtp, envelope, html), fields(to = %envelope.recipient, host = %smtp.host))]
pub async fn send(
    smtp: &SmtpConfig,
    envelope: &Envelope,
    subject: &str,
    html: &str,
) -> Result<(), DeliveryError> {
    let message = build_message(envelope, subject, html)?;
    let creds = Credentials::new(envelope.sender.clone(), envelope.password.clone());

    let mailer: AsyncSmtpTransport<Tokio1Executor> =
        AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
            .port(smtp.port)
            .credentials(creds)
            .build();

    mailer.send(message).await?;
    info!("Email sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> Envelope {
        Envelope::from_parts(
            Some("me@example.com".into()),
            Some("app-password".into()),
            Some("you@example.com".into()),
            "DIGEST_EMAIL",
        )
        .unwrap()
    }

    #[test]
    fn test_missing_parts_are_named() {
        let err = Envelope::from_parts(None, Some("p".into()), Some("a@b.c".into()), "DIGEST_EMAIL")
            .unwrap_err();
        assert!(matches!(err, DeliveryError::MissingCredentials("SENDER_EMAIL")));

        let err = Envelope::from_parts(
            Some("a@b.c".into()),
            Some("p".into()),
            Some("  ".into()),
            "DELIGHT_EMAIL",
        )
        .unwrap_err();
        assert!(matches!(err, DeliveryError::MissingCredentials("DELIGHT_EMAIL")));
    }

    #[test]
    fn test_debug_hides_password() {
        let shown = format!("{:?}", envelope());
        assert!(!shown.contains("app-password"));
    }

    #[test]
    fn test_build_html_message() {
        let message = build_message(&envelope(), "📅 Daily Digest", "<h1>Hi</h1>").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: you@example.com"));
        assert!(raw.contains("Content-Type: text/html"));
        assert!(raw.contains("<h1>Hi</h1>"));
    }

    #[test]
    fn test_bad_address() {
        let mut bad = envelope();
        bad.recipient = "not an address".into();
        let err = build_message(&bad, "s", "b").unwrap_err();
        assert!(matches!(err, DeliveryError::Address(_)));
    }
}
