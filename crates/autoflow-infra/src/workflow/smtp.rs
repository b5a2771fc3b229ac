//! SMTP delivery for `send_email` steps.
//!
//! Recipient fields may hold comma-separated address lists. The receipt lists
//! every envelope recipient: an SMTP transaction either accepts all of them or
//! fails as a whole.

use std::time::Duration;

use autoflow_core::workflow::step_runner::{MailMessage, MailReceipt, MailRelay, StepError};
use autoflow_types::config::{SmtpConfig, SmtpSecurity};
use futures_util::future::BoxFuture;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

/// Connection settings with the password kept secret.
#[derive(Debug)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl From<&SmtpConfig> for SmtpSettings {
    fn from(config: &SmtpConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            security: config.security,
            username: config.username.clone(),
            password: config.password.clone().map(SecretString::from),
        }
    }
}

pub struct SmtpMailRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailRelay {
    /// Build the transport. No connection is made until the first send.
    pub fn new(
        settings: &SmtpSettings,
        timeout: Duration,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let builder = match settings.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(settings.host.as_str())
            }
        };
        let mut builder = builder.port(settings.port).timeout(Some(timeout));
        if let Some(username) = &settings.username {
            let password = settings
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string())
                .unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        Ok(Self {
            transport: builder.build(),
            host: settings.host.clone(),
        })
    }

    async fn deliver(&self, message: MailMessage) -> Result<MailReceipt, StepError> {
        let from = parse_mailbox("from", &message.from)?;
        let message_id = format!("<{}@{}>", Uuid::now_v7(), from.email.domain());
        let email = build_message(&message, &message_id)?;
        let accepted: Vec<String> = email.envelope().to().iter().map(ToString::to_string).collect();

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| StepError::Mail(format!("smtp {}: {e}", self.host)))?;

        tracing::info!(
            message_id = %message_id,
            recipients = accepted.len(),
            code = %response.code(),
            "email accepted by smtp server"
        );
        Ok(MailReceipt {
            message_id,
            accepted,
        })
    }
}

impl MailRelay for SmtpMailRelay {
    fn send(&self, message: MailMessage) -> BoxFuture<'_, Result<MailReceipt, StepError>> {
        Box::pin(self.deliver(message))
    }
}

fn parse_mailbox(field: &str, address: &str) -> Result<Mailbox, StepError> {
    address
        .trim()
        .parse()
        .map_err(|e| StepError::Mail(format!("invalid {field} address {address:?}: {e}")))
}

fn parse_list(field: &str, list: Option<&str>) -> Result<Vec<Mailbox>, StepError> {
    list.unwrap_or_default()
        .split(',')
        .filter(|a| !a.trim().is_empty())
        .map(|a| parse_mailbox(field, a))
        .collect()
}

/// Assemble the RFC 5322 message for `message`.
pub fn build_message(message: &MailMessage, message_id: &str) -> Result<Message, StepError> {
    let to = parse_list("to", Some(&message.to))?;
    if to.is_empty() {
        return Err(StepError::Mail("no recipients in \"to\"".to_string()));
    }

    let mut builder = Message::builder()
        .from(parse_mailbox("from", &message.from)?)
        .message_id(Some(message_id.to_string()))
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN);
    for mailbox in to {
        builder = builder.to(mailbox);
    }
    for mailbox in parse_list("cc", message.cc.as_deref())? {
        builder = builder.cc(mailbox);
    }
    for mailbox in parse_list("bcc", message.bcc.as_deref())? {
        builder = builder.bcc(mailbox);
    }

    builder
        .body(message.body.clone())
        .map_err(|e| StepError::Mail(format!("cannot build message: {e}")))
}
