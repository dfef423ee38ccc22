//! Admission control - policy resolution, the gate, and the read-cache front.
//!
//! Control flow per request:
//! identity collaborator -> [`AdmissionGate::check`] -> deny (429) or
//! allow -> [`ReadCache::lookup`] -> hit (replay) or miss (handler, then
//! [`ReadCache::store`] on 2xx).

mod gate;
mod pattern;
mod read_cache;
mod resolver;
mod table;

pub use gate::{AdmissionGate, ExemptPaths};
pub use pattern::PathPattern;
pub use read_cache::{CacheRule, ReadCache};
pub use resolver::PolicyResolver;
pub use table::{EndpointRule, GENERAL_SCOPE, PolicyTable};
