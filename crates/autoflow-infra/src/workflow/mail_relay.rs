//! `MailRelay` selection and the non-SMTP relays.
//!
//! The HTTP relay posts the message as JSON and expects `{messageId, accepted}`
//! back, the shape hosted mail APIs answer with. Its API token is wrapped in
//! [`SecretString`] and only exposed when the `Authorization` header is built.

use std::sync::Arc;
use std::time::Duration;

use autoflow_core::workflow::step_runner::{MailMessage, MailReceipt, MailRelay, StepError};
use autoflow_types::config::MailConfig;
use futures_util::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};

use super::smtp::{SmtpMailRelay, SmtpSettings};

/// Pick the delivery path for `config`: SMTP, then the HTTP relay, then none.
pub fn mail_relay_from_config(
    config: &MailConfig,
    client: reqwest::Client,
    timeout: Duration,
) -> Result<Arc<dyn MailRelay>, lettre::transport::smtp::Error> {
    if let Some(smtp) = config.smtp.as_ref().filter(|s| !s.host.trim().is_empty()) {
        tracing::debug!(host = %smtp.host, port = smtp.port, "email steps deliver over smtp");
        return Ok(Arc::new(SmtpMailRelay::new(&SmtpSettings::from(smtp), timeout)?));
    }
    match config.relay_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            let token = config.api_token.clone().map(SecretString::from);
            Ok(Arc::new(HttpMailRelay::new(client, url, token)))
        }
        _ => Ok(Arc::new(DisabledMailRelay)),
    }
}

/// Posts messages to a relay endpoint.
pub struct HttpMailRelay {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<SecretString>,
}

impl HttpMailRelay {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_token: Option<SecretString>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_token,
        }
    }

    async fn deliver(&self, message: MailMessage) -> Result<MailReceipt, StepError> {
        let mut request = self.client.post(&self.endpoint).json(&message);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| StepError::Mail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(StepError::Mail(format!("relay returned {status}: {detail}")));
        }

        let receipt: MailReceipt = response
            .json()
            .await
            .map_err(|e| StepError::Mail(format!("invalid relay response: {e}")))?;
        tracing::info!(message_id = %receipt.message_id, to = %message.to, "email accepted by relay");
        Ok(receipt)
    }
}

impl MailRelay for HttpMailRelay {
    fn send(&self, message: MailMessage) -> BoxFuture<'_, Result<MailReceipt, StepError>> {
        Box::pin(self.deliver(message))
    }
}

/// Stand-in when neither SMTP nor a relay URL is configured. Every send fails.
pub struct DisabledMailRelay;

impl MailRelay for DisabledMailRelay {
    fn send(&self, message: MailMessage) -> BoxFuture<'_, Result<MailReceipt, StepError>> {
        Box::pin(async move {
            tracing::warn!(to = %message.to, "send_email step with no mail relay configured");
            Err(StepError::Mail("mail relay not configured".to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_types::config::{SmtpConfig, SmtpSecurity};
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> MailMessage {
        MailMessage {
            from: "autoflow@example.com".to_string(),
            to: "ops@example.com".to_string(),
            cc: None,
            bcc: Some("audit@example.com".to_string()),
            subject: "Nightly report".to_string(),
            body: "All green".to_string(),
        }
    }

    #[tokio::test]
    async fn test_posts_json_and_parses_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer tok-123"))
            .and(body_partial_json(json!({
                "to": "ops@example.com",
                "bcc": "audit@example.com",
                "subject": "Nightly report"
            })))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(json!({"messageId": "<m1@relay>", "accepted": ["ops@example.com"]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let relay = HttpMailRelay::new(
            reqwest::Client::new(),
            format!("{}/send", server.uri()),
            Some(SecretString::from("tok-123")),
        );
        let receipt = relay.send(message()).await.unwrap();
        assert_eq!(receipt.message_id, "<m1@relay>");
        assert_eq!(receipt.accepted, vec!["ops@example.com".to_string()]);

        let received = server.received_requests().await.unwrap();
        let body: Value = received[0].body_json().unwrap();
        assert!(body.get("cc").is_none());
    }

    #[tokio::test]
    async fn test_relay_rejection_is_mail_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let relay = HttpMailRelay::new(reqwest::Client::new(), format!("{}/send", server.uri()), None);
        let err = relay.send(message()).await.unwrap_err();
        assert!(matches!(err, StepError::Mail(_)));
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_unparsable_receipt_is_mail_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("queued"))
            .mount(&server)
            .await;

        let relay = HttpMailRelay::new(reqwest::Client::new(), server.uri(), None);
        let err = relay.send(message()).await.unwrap_err();
        assert!(err.to_string().contains("invalid relay response"));
    }

    #[tokio::test]
    async fn test_from_config_without_transport_is_disabled() {
        let relay = mail_relay_from_config(
            &MailConfig::default(),
            reqwest::Client::new(),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = relay.send(message()).await.unwrap_err();
        assert_eq!(err.to_string(), "email delivery failed: mail relay not configured");
    }

    #[tokio::test]
    async fn test_from_config_prefers_smtp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut smtp = SmtpConfig::new("127.0.0.1");
        smtp.port = port;
        smtp.security = SmtpSecurity::None;
        let config = MailConfig {
            smtp: Some(smtp),
            relay_url: Some(server.uri()),
            ..MailConfig::default()
        };

        let relay = mail_relay_from_config(&config, reqwest::Client::new(), Duration::from_secs(2))
            .unwrap();
        let err = relay.send(message()).await.unwrap_err();
        assert!(err.to_string().contains("smtp 127.0.0.1"));
    }
}
