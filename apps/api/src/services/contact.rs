//! Contact form delivery

use std::sync::Arc;

use soundbank_backend_client::{Email, Mailer};

use crate::error::{ApiError, ApiResult};
use crate::services::auth::validate_email;

/// Longest accepted contact message, in characters
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// A validated contact form submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactMessage {
    /// Trim and validate the submitted fields
    pub fn parse(name: &str, email: &str, message: &str) -> ApiResult<Self> {
        let name = name.trim();
        let message = message.trim();
        if name.is_empty() {
            return Err(ApiError::MissingField("name"));
        }
        validate_email(email)?;
        if message.is_empty() {
            return Err(ApiError::MissingField("message"));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiError::ValidationError(format!(
                "message must be at most {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        Ok(Self {
            name: name.to_string(),
            email: email.trim().to_string(),
            message: message.to_string(),
        })
    }
}

/// Sends contact form messages to the site owner
#[derive(Clone)]
pub struct ContactService {
    mailer: Arc<dyn Mailer>,
    recipient: String,
}

impl ContactService {
    pub fn new(mailer: Arc<dyn Mailer>, recipient: impl Into<String>) -> Self {
        Self {
            mailer,
            recipient: recipient.into(),
        }
    }

    pub async fn send(&self, contact: &ContactMessage) -> ApiResult<()> {
        let email = Email::new(
            self.recipient.clone(),
            format!("Website contact from {}", contact.name),
            format!(
                "Name: {}\nEmail: {}\n\n{}",
                contact.name, contact.email, contact.message
            ),
        )
        .reply_to(contact.email.clone());

        self.mailer
            .send(&email)
            .await
            .map_err(ApiError::upstream("Failed to send message"))?;

        tracing::info!(from = %contact.email, "Contact message delivered");
        Ok(())
    }
}
