//! Conversation and message endpoints.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use switchboard_core::domain::{Conversation, Message, MessageDirection};
use switchboard_shared::{
    ApiResponse,
    dto::{ConversationResponse, CreateConversationRequest, MessageResponse, SendMessageRequest},
};

use crate::middleware::{AppError, AppResult, CurrentCaller};
use crate::state::AppState;

fn conversation_response(conversation: Conversation) -> ConversationResponse {
    ConversationResponse {
        id: conversation.id,
        contact_id: conversation.contact_id,
        assigned_to: conversation.assigned_to,
        last_message_at: conversation.last_message_at,
        created_at: conversation.created_at,
    }
}

fn message_response(message: Message) -> MessageResponse {
    let direction = match message.direction {
        MessageDirection::Inbound => "inbound",
        MessageDirection::Outbound => "outbound",
    };

    MessageResponse {
        id: message.id,
        conversation_id: message.conversation_id,
        direction: direction.to_string(),
        author: message.author,
        body: message.body,
        sent_at: message.sent_at,
    }
}

/// GET /api/conversations
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let conversations: Vec<ConversationResponse> = state
        .conversations
        .list()
        .await?
        .into_iter()
        .map(conversation_response)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(conversations)))
}

/// POST /api/conversations
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateConversationRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if state.contacts.find_by_id(req.contact_id).await?.is_none() {
        return Err(AppError::BadRequest(format!(
            "Contact {} does not exist",
            req.contact_id
        )));
    }

    let saved = state
        .conversations
        .save(Conversation::new(req.contact_id, req.assigned_to))
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(conversation_response(saved))))
}

/// GET /api/conversations/{id}/messages
pub async fn messages(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let messages: Vec<MessageResponse> = state
        .conversations
        .messages(path.into_inner())
        .await?
        .into_iter()
        .map(message_response)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(messages)))
}

/// POST /api/conversations/{id}/messages
pub async fn send_message(
    state: web::Data<AppState>,
    caller: CurrentCaller,
    path: web::Path<Uuid>,
    body: web::Json<SendMessageRequest>,
) -> AppResult<HttpResponse> {
    let text = body.into_inner().body;
    if text.trim().is_empty() {
        return Err(AppError::Validation(vec!["body must not be empty".to_string()]));
    }

    let message = Message::outbound(path.into_inner(), caller.0.identity, text);
    let saved = state.conversations.append_message(message).await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(message_response(saved))))
}
