//! Health check and session bootstrap endpoints.

use actix_web::HttpResponse;
use serde::Serialize;

use crate::middleware::CurrentCaller;
use crate::observability::RequestId;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Health check endpoint - returns server status.
///
/// GET /api/health
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    pub identity: String,
    pub role: &'static str,
    pub request_id: String,
    pub server_time: String,
}

/// Tells a client how the server sees it before it opens a session.
///
/// GET /api/handshake
pub async fn handshake(caller: CurrentCaller, request_id: RequestId) -> HttpResponse {
    let CurrentCaller(caller) = caller;

    HttpResponse::Ok().json(HandshakeResponse {
        identity: caller.identity,
        role: caller.role.as_str(),
        request_id: request_id.0,
        server_time: chrono::Utc::now().to_rfc3339(),
    })
}
