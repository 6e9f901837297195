//! Shared inbox.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::Value;
use url::Url;

use super::FederationState;
use crate::activities::InboxActivity;

/// Header carrying the actor whose signature the transport verified.
pub const ACTOR_HEADER: &str = "x-fedsync-actor";

/// Handle POST /inbox.
///
/// Processing happens in the background; the sender only learns that the
/// activity was accepted for processing.
pub async fn inbox_handler(
    State(state): State<FederationState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let Some(actor) = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Url::parse(v).ok())
    else {
        tracing::debug!("Inbox request without verified actor");
        return StatusCode::UNAUTHORIZED;
    };

    let activity: InboxActivity = match serde_json::from_value(body) {
        Ok(activity) => activity,
        Err(e) => {
            tracing::debug!(actor = %actor, error = %e, "Malformed activity");
            return StatusCode::BAD_REQUEST;
        }
    };

    tokio::spawn(async move {
        state.inbox.receive(&actor, activity).await;
    });
    StatusCode::ACCEPTED
}
