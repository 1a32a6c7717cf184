//! Survey participant route handlers
//!
//! - `POST /api/survey-participants` - Sign up for the listening survey (CONTACT limit)
//! - `DELETE /api/survey-participants/:id` - Remove a participant (admin, DELETE limit)

use axum::{
    extract::{Path, State},
    middleware,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::middleware::rate_limit::{
    rate_limit, ActionCategory, ClientIdentity, RateLimitDecision, RateLimitState,
};
use crate::middleware::AdminUser;
use crate::models::SurveyParticipant;
use crate::routes::{message, parse_id, success, ApiJson, MessageBody, Success};
use crate::services::SurveyService;

#[derive(Clone)]
pub struct SurveyState {
    pub survey: SurveyService,
    pub rate_limits: RateLimitState,
}

impl SurveyState {
    pub fn new(survey: SurveyService, rate_limits: RateLimitState) -> Self {
        Self {
            survey,
            rate_limits,
        }
    }
}

pub fn survey_router(state: SurveyState) -> Router {
    let create = Router::new().route("/", post(create_participant));

    let remove = Router::new()
        .route("/:id", delete(delete_participant))
        .route_layer(middleware::from_fn_with_state(
            (state.rate_limits.clone(), ActionCategory::Delete),
            rate_limit,
        ));

    Router::new().merge(create).merge(remove).with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateParticipantRequest {
    pub name: String,
    pub email: String,
    pub profile_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantBody {
    pub participant: SurveyParticipant,
}

async fn create_participant(
    State(state): State<SurveyState>,
    ClientIdentity(client): ClientIdentity,
    ApiJson(body): ApiJson<CreateParticipantRequest>,
) -> ApiResult<(RateLimitDecision, Json<Success<ParticipantBody>>)> {
    let profile_id = body
        .profile_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .map(|id| parse_id(id, "profileId"))
        .transpose()?;
    let participant =
        SurveyService::validate(&body.name, &body.email, profile_id, body.notes.as_deref())?;

    let decision = state
        .rate_limits
        .enforce(ActionCategory::Contact, &client)
        .await?;

    let participant = state.survey.create(&participant).await?;
    Ok((decision, success(ParticipantBody { participant })))
}

async fn delete_participant(
    State(state): State<SurveyState>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<MessageBody>>> {
    let id = parse_id(&id, "id")?;

    tracing::info!(admin_id = %admin.user.id, participant_id = %id, "Deleting survey participant");
    state.survey.delete(id).await?;

    Ok(message("Participant deleted"))
}
