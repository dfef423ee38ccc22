//! Contact endpoints.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use switchboard_core::domain::Contact;
use switchboard_shared::{
    ApiResponse,
    dto::{ContactResponse, CreateContactRequest},
};

use crate::middleware::{AppError, AppResult};
use crate::state::AppState;

fn to_response(contact: Contact) -> ContactResponse {
    ContactResponse {
        id: contact.id,
        name: contact.name,
        phone: contact.phone,
        email: contact.email,
        tags: contact.tags,
        created_at: contact.created_at,
    }
}

/// GET /api/contacts
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let contacts: Vec<ContactResponse> = state
        .contacts
        .list()
        .await?
        .into_iter()
        .map(to_response)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(contacts)))
}

/// GET /api/contacts/{id}
pub async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let contact = state
        .contacts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contact with id {} not found", id)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(to_response(contact))))
}

/// POST /api/contacts
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateContactRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut errors = Vec::new();
    if req.name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }
    if req.phone.trim().is_empty() {
        errors.push("phone must not be empty".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let mut contact = Contact::new(
        req.name.trim().to_string(),
        req.phone.trim().to_string(),
        req.email,
    );
    contact.tags = req.tags;

    let saved = state.contacts.save(contact).await?;
    tracing::info!(contact_id = %saved.id, "Contact created");

    Ok(HttpResponse::Created().json(ApiResponse::ok(to_response(saved))))
}
