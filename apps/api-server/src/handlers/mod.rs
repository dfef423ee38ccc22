//! HTTP handlers and route configuration.

mod assistant;
mod contacts;
mod conversations;
mod health;
mod sync;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Exempt from admission control
            .route("/health", web::get().to(health::health_check))
            .route("/handshake", web::get().to(health::handshake))
            // CRM
            .service(
                web::scope("/contacts")
                    .route("", web::get().to(contacts::list))
                    .route("", web::post().to(contacts::create))
                    .route("/{id}", web::get().to(contacts::get)),
            )
            .service(
                web::scope("/conversations")
                    .route("", web::get().to(conversations::list))
                    .route("", web::post().to(conversations::create))
                    .route("/{id}/messages", web::get().to(conversations::messages))
                    .route("/{id}/messages", web::post().to(conversations::send_message)),
            )
            .route("/sync/state", web::get().to(sync::state))
            // Assistant
            .service(
                web::scope("/ai")
                    .route("/console", web::post().to(assistant::console))
                    .route("/qa", web::post().to(assistant::qa)),
            ),
    );
}
