//! Middleware modules.

pub mod admission;
pub mod auth;
pub mod error;

pub use admission::AdmissionMiddleware;
pub use auth::{CurrentCaller, IdentityMiddleware, TrustedProxies};
pub use error::{AppError, AppResult};
