//! Limit policy resolution.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::{ResolvedPolicy, Role};
use crate::error::DomainError;

use super::{GENERAL_SCOPE, PolicyTable};

/// Maps `(role, path)` to exactly one policy.
///
/// Resolution order:
/// 1. the most specific endpoint rule matching the path (and the role, for role-bound rules);
/// 2. the role default;
/// 3. the global default.
///
/// There is no error path: every request gets a usable policy.
#[derive(Debug)]
pub struct PolicyResolver {
    table: PolicyTable,
    unknown_role_logged: AtomicBool,
}

impl PolicyResolver {
    /// Build a resolver over a validated table.
    pub fn new(table: PolicyTable) -> Result<Self, DomainError> {
        table.validate()?;
        Ok(Self {
            table,
            unknown_role_logged: AtomicBool::new(false),
        })
    }

    /// Resolver over [`PolicyTable::builtin`].
    pub fn builtin() -> Self {
        Self {
            table: PolicyTable::builtin(),
            unknown_role_logged: AtomicBool::new(false),
        }
    }

    pub fn resolve(&self, role: Role, path: &str) -> ResolvedPolicy {
        if role == Role::Unknown && !self.unknown_role_logged.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                path = %path,
                "Unrecognized caller role, applying default policy"
            );
        }
        let role = role.effective();

        if let Some(rule) = self
            .table
            .endpoint_rules
            .iter()
            .find(|rule| rule.applies_to(role, path))
        {
            return ResolvedPolicy {
                scope: rule.scope.clone(),
                policy: rule.policy,
            };
        }

        let policy = self
            .table
            .role_defaults
            .get(&role)
            .copied()
            .unwrap_or(self.table.global_default);

        ResolvedPolicy {
            scope: GENERAL_SCOPE.to_string(),
            policy,
        }
    }
}
