//! Domain entities - the core business objects.

mod contact;
mod conversation;
mod decision;
mod policy;
mod role;

pub use contact::Contact;
pub use conversation::{Conversation, Message, MessageDirection};
pub use decision::{Caller, Decision, DecisionEvent, DecisionKind, GateResult};
pub use policy::{Horizon, Policy, ResolvedPolicy};
pub use role::Role;
