//! Contact form route handler
//!
//! `POST /api/send-email` forwards a visitor's message to the site owner
//! (CONTACT limit).

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::middleware::rate_limit::{ActionCategory, ClientIdentity, RateLimitDecision, RateLimitState};
use crate::routes::{message, ApiJson, MessageBody, Success};
use crate::services::{ContactMessage, ContactService};

#[derive(Clone)]
pub struct ContactState {
    pub contact: ContactService,
    pub rate_limits: RateLimitState,
}

impl ContactState {
    pub fn new(contact: ContactService, rate_limits: RateLimitState) -> Self {
        Self {
            contact,
            rate_limits,
        }
    }
}

pub fn contact_router(state: ContactState) -> Router {
    Router::new()
        .route("/", post(send_email))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

async fn send_email(
    State(state): State<ContactState>,
    ClientIdentity(client): ClientIdentity,
    ApiJson(body): ApiJson<ContactRequest>,
) -> ApiResult<(RateLimitDecision, Json<Success<MessageBody>>)> {
    let contact = ContactMessage::parse(&body.name, &body.email, &body.message)?;

    let decision = state
        .rate_limits
        .enforce(ActionCategory::Contact, &client)
        .await?;

    state.contact.send(&contact).await?;

    Ok((decision, message("Message sent")))
}
