//! Identity collaborator implementations.

mod jwt;

pub use jwt::{JwtConfig, JwtTokenService};
