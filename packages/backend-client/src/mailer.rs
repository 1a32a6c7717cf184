//! Transactional mail delivery over HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use soundbank_shared_config::MailConfig;
use tracing::debug;

use crate::client::BackendClient;
use crate::error::{BackendError, BackendResult};
use crate::models::{Email, SendEmailRequest};

/// Something that can deliver an email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> BackendResult<()>;
}

/// Mailer backed by an HTTP mail API (`POST {api_url}/emails`)
#[derive(Debug, Clone)]
pub struct HttpMailer {
    http_client: Client,
    config: MailConfig,
}

impl HttpMailer {
    /// Create a new mailer from configuration
    pub fn new(config: &MailConfig, timeout_secs: u64) -> BackendResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(BackendError::HttpError)?;

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> BackendResult<()> {
        let body = SendEmailRequest {
            from: &self.config.from_address,
            to: [&email.to],
            subject: &email.subject,
            text: &email.text,
            reply_to: email.reply_to.as_deref(),
        };

        let mut request = self.http_client.post(self.config.send_url()).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                BackendError::ConnectionRefused(self.config.api_url.clone())
            } else {
                BackendError::HttpError(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = BackendClient::truncate_error_body(response.text().await.unwrap_or_default());
            return Err(BackendError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!(subject = %email.subject, "Email handed to mail API");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_url: &str) -> MailConfig {
        MailConfig {
            api_url: server_url.to_string(),
            api_key: "mail-key".to_string(),
            from_address: "site@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_email() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer mail-key"))
            .and(body_json(json!({
                "from": "site@example.com",
                "to": ["owner@example.com"],
                "subject": "Hello",
                "text": "Body",
                "reply_to": "visitor@example.com"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(&test_config(&server.uri()), 5).unwrap();
        let email =
            Email::new("owner@example.com", "Hello", "Body").reply_to("visitor@example.com");
        mailer.send(&email).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_email_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad sender"))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(&test_config(&server.uri()), 5).unwrap();
        let result = mailer.send(&Email::new("a@example.com", "s", "t")).await;
        assert_matches!(result, Err(BackendError::ApiError { status: 422, .. }));
    }
}
