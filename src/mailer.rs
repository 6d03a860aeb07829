//! Outbound mail.
//!
//! Thin wrapper over an SMTP relay. The transport is an opaque collaborator;
//! this module only knows how to build a multipart message with a PDF
//! attachment and hand it over. A counting mock is provided for tests and
//! for running without a configured relay.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport is not configured: {0}")]
    Configuration(String),
    #[error("invalid mail address: {0}")]
    InvalidAddress(String),
    #[error("failed to build mail message: {0}")]
    Build(String),
    #[error("failed to send mail: {0}")]
    Send(String),
}

/// One invoice email: recipient, optional CCs, subject, body text, and the
/// signed PDF under its delivery filename.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invoice(
        &self,
        to: &str,
        cc: &[String],
        subject: &str,
        body: &str,
        filename: &str,
        pdf: Vec<u8>,
    ) -> Result<(), MailError>;
}

/// STARTTLS SMTP relay mailer.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| MailError::Configuration(format!("invalid from address: {e}")))?;

        let creds = Credentials::new(config.user.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::Configuration(format!("failed to create SMTP relay: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_invoice(
        &self,
        to: &str,
        cc: &[String],
        subject: &str,
        body: &str,
        filename: &str,
        pdf: Vec<u8>,
    ) -> Result<(), MailError> {
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("recipient '{to}': {e}")))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject);
        for address in cc {
            let cc_mailbox: Mailbox = address
                .parse()
                .map_err(|e| MailError::InvalidAddress(format!("cc '{address}': {e}")))?;
            builder = builder.cc(cc_mailbox);
        }

        let attachment = Attachment::new(filename.to_string()).body(
            pdf,
            ContentType::parse("application/pdf")
                .map_err(|e| MailError::Build(e.to_string()))?,
        );

        let message = builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(attachment),
            )
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;

        log::info!("invoice mail sent to {to} ({} cc)", cc.len());
        Ok(())
    }
}

/// Mailer that records sends instead of talking to a relay. Used by tests
/// and when no SMTP relay is configured.
#[derive(Default)]
pub struct MockMailer {
    sent: std::sync::Mutex<Vec<SentInvoice>>,
    fail_for: std::sync::Mutex<Vec<String>>,
}

/// What a mock send captured.
#[derive(Debug, Clone)]
pub struct SentInvoice {
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub filename: String,
    pub pdf_len: usize,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends to `recipient` fail with a transport error.
    pub fn fail_for(&self, recipient: &str) {
        self.fail_for.lock().unwrap().push(recipient.to_string());
    }

    pub fn sent(&self) -> Vec<SentInvoice> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_invoice(
        &self,
        to: &str,
        cc: &[String],
        subject: &str,
        _body: &str,
        filename: &str,
        pdf: Vec<u8>,
    ) -> Result<(), MailError> {
        if self.fail_for.lock().unwrap().iter().any(|r| r == to) {
            return Err(MailError::Send(format!("mock transport refused {to}")));
        }
        self.sent.lock().unwrap().push(SentInvoice {
            to: to.to_string(),
            cc: cc.to_vec(),
            subject: subject.to_string(),
            filename: filename.to_string(),
            pdf_len: pdf.len(),
        });
        log::info!("[mock] invoice mail to {to}");
        Ok(())
    }
}
