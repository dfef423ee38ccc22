//! Polling endpoint for client sync.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use switchboard_shared::dto::SyncStateResponse;

use crate::middleware::AppResult;
use crate::state::AppState;

/// GET /api/sync/state
pub async fn state(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let contacts = state.contacts.list().await?;
    let conversations = state.conversations.list().await?;

    let last_activity_at = conversations
        .iter()
        .map(|c| c.last_message_at.unwrap_or(c.created_at))
        .chain(contacts.iter().map(|c| c.updated_at))
        .max();

    Ok(HttpResponse::Ok().json(SyncStateResponse {
        contacts: contacts.len(),
        conversations: conversations.len(),
        last_activity_at,
        server_time: Utc::now(),
    }))
}
