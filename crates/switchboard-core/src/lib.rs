//! # Switchboard Core
//!
//! The domain layer of the Switchboard messaging backend.
//! This crate contains domain types, port traits and the admission-control
//! components. It has no infrastructure dependencies; concrete stores live in
//! `switchboard-infra`.

pub mod admission;
pub mod domain;
pub mod error;
pub mod ports;

pub use error::{DomainError, GateError};
