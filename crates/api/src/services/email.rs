//! Receipt rendering and delivery.
//!
//! Delivery goes through the [`Notifier`] trait. [`SmtpNotifier`] sends via
//! lettre; [`LogNotifier`] writes the message to the log when SMTP is not
//! configured.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use bookshop_core::{Email, Price, Quantity};

use crate::config::EmailConfig;
use crate::models::CartLine;

/// Subject line of checkout receipts.
pub const RECEIPT_SUBJECT: &str = "Your Receipt from BookShop";

struct ReceiptLine<'a> {
    title: &'a str,
    quantity: Quantity,
    price: Price,
    total: Price,
}

/// Plain text template for the order receipt.
#[derive(Template)]
#[template(path = "email/receipt.txt")]
struct ReceiptEmailText<'a> {
    lines: Vec<ReceiptLine<'a>>,
    total: Price,
    currency: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Delivery refused by the notifier.
    #[error("Delivery failed: {0}")]
    Rejected(String),
}

/// Render the receipt body for a set of cart lines.
///
/// # Errors
///
/// Returns `askama::Error` if rendering fails.
pub fn render_receipt(lines: &[CartLine], currency: &str) -> Result<String, askama::Error> {
    let template = ReceiptEmailText {
        lines: lines
            .iter()
            .map(|line| ReceiptLine {
                title: &line.title,
                quantity: line.quantity,
                price: line.price,
                total: line.line_total(),
            })
            .collect(),
        total: lines.iter().map(CartLine::line_total).sum(),
        currency,
    };
    template.render()
}

/// Delivers plain text messages to customers.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `body` to `to`.
    async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// SMTP delivery via lettre.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(
            to = %to,
            subject = %subject,
            body = %body,
            "SMTP not configured; email logged"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{Email, Notifier, NotifyError, async_trait};

    /// A sent message captured by [`RecordingNotifier`].
    #[derive(Debug, Clone)]
    pub struct SentEmail {
        pub to: String,
        pub subject: String,
        pub body: String,
    }

    /// Captures messages; fails every send while `failing` is set.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<SentEmail>>,
        pub failing: std::sync::atomic::AtomicBool,
    }

    impl RecordingNotifier {
        #[allow(clippy::unwrap_used)]
        pub fn sent(&self) -> Vec<SentEmail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        #[allow(clippy::unwrap_used)]
        async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), NotifyError> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(NotifyError::Rejected("mailbox unavailable".to_owned()));
            }
            self.sent.lock().unwrap().push(SentEmail {
                to: to.to_string(),
                subject: subject.to_owned(),
                body: body.to_owned(),
            });
            Ok(())
        }
    }
}
