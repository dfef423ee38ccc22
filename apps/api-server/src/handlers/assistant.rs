//! Assistant endpoints.
//!
//! The model provider is an external collaborator; these handlers only
//! validate input and assemble context. The answer is a local summary until
//! a provider client is configured.

use actix_web::{HttpResponse, web};

use switchboard_shared::dto::{AssistantRequest, AssistantResponse};

use crate::middleware::{AppError, AppResult, CurrentCaller};
use crate::state::AppState;

const MAX_PROMPT_CHARS: usize = 4000;
const LOCAL_MODEL: &str = "local-summary";

fn validate(req: &AssistantRequest) -> AppResult<()> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation(vec!["prompt must not be empty".to_string()]));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::Validation(vec![format!(
            "prompt must be at most {} characters",
            MAX_PROMPT_CHARS
        )]));
    }
    Ok(())
}

/// POST /api/ai/console
pub async fn console(
    caller: CurrentCaller,
    body: web::Json<AssistantRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    validate(&req)?;

    tracing::debug!(identity = %caller.0.identity, "Assistant console request");

    Ok(HttpResponse::Ok().json(AssistantResponse {
        answer: format!("Received {} characters.", req.prompt.trim().chars().count()),
        model: LOCAL_MODEL.to_string(),
    }))
}

/// POST /api/ai/qa
///
/// Answers questions about a conversation from its message history.
pub async fn qa(
    state: web::Data<AppState>,
    body: web::Json<AssistantRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    validate(&req)?;

    let conversation_id = req
        .conversation_id
        .ok_or_else(|| AppError::BadRequest("conversation_id is required".to_string()))?;
    let history = state.conversations.messages(conversation_id).await?;

    let answer = match history.last() {
        Some(last) => format!(
            "{} messages so far; the latest from {} reads: {}",
            history.len(),
            last.author,
            last.body
        ),
        None => "This conversation has no messages yet.".to_string(),
    };

    Ok(HttpResponse::Ok().json(AssistantResponse {
        answer,
        model: LOCAL_MODEL.to_string(),
    }))
}
