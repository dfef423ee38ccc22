//! Static policy tables.

use std::collections::HashMap;

use crate::domain::{Policy, Role};
use crate::error::DomainError;

use super::PathPattern;

/// Counter scope shared by every endpoint without an override.
pub const GENERAL_SCOPE: &str = "general";

const MINUTE_MS: i64 = 60_000;
const SECOND_MS: i64 = 1_000;

/// Per-endpoint override. Shadows the role default for every path it matches.
#[derive(Debug, Clone)]
pub struct EndpointRule {
    pub pattern: PathPattern,
    pub scope: String,
    /// Restrict the rule to one role; `None` applies to every role.
    pub role: Option<Role>,
    pub policy: Policy,
}

impl EndpointRule {
    pub fn new(pattern: &str, scope: &str, policy: Policy) -> Self {
        Self {
            pattern: PathPattern::new(pattern),
            scope: scope.to_string(),
            role: None,
            policy,
        }
    }

    pub fn for_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub(crate) fn applies_to(&self, role: Role, path: &str) -> bool {
        self.role.is_none_or(|r| r == role) && self.pattern.matches(path)
    }
}

/// Role defaults, endpoint overrides and the global fallback.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    pub(crate) global_default: Policy,
    pub(crate) role_defaults: HashMap<Role, Policy>,
    /// Kept sorted most specific first; role-bound rules before role-agnostic
    /// ones of equal specificity.
    pub(crate) endpoint_rules: Vec<EndpointRule>,
}

impl PolicyTable {
    pub fn new(global_default: Policy) -> Self {
        Self {
            global_default,
            role_defaults: HashMap::new(),
            endpoint_rules: Vec::new(),
        }
    }

    pub fn with_role_default(mut self, role: Role, policy: Policy) -> Self {
        self.role_defaults.insert(role, policy);
        self
    }

    pub fn with_endpoint(mut self, rule: EndpointRule) -> Self {
        self.endpoint_rules.push(rule);
        self.endpoint_rules.sort_by(|a, b| {
            b.pattern
                .specificity()
                .cmp(&a.pattern.specificity())
                .then_with(|| b.role.is_some().cmp(&a.role.is_some()))
        });
        self
    }

    /// Check every policy in the table and the shape of the patterns.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.global_default.validate()?;
        for (role, policy) in &self.role_defaults {
            if *role == Role::Unknown {
                return Err(DomainError::Validation(
                    "the unknown role cannot carry its own policy".to_string(),
                ));
            }
            policy.validate()?;
        }
        for rule in &self.endpoint_rules {
            if !rule.pattern.as_str().starts_with('/') {
                return Err(DomainError::Validation(format!(
                    "endpoint pattern {:?} must start with '/'",
                    rule.pattern.as_str()
                )));
            }
            if rule.scope.is_empty() || rule.scope == GENERAL_SCOPE {
                return Err(DomainError::Validation(format!(
                    "endpoint pattern {:?} needs its own scope name",
                    rule.pattern.as_str()
                )));
            }
            rule.policy.validate()?;
        }
        Ok(())
    }

    /// The production table.
    pub fn builtin() -> Self {
        Self::new(Policy::new(60, MINUTE_MS, 10, SECOND_MS))
            .with_role_default(Role::Admin, Policy::new(600, MINUTE_MS, 30, SECOND_MS))
            .with_role_default(Role::Agent, Policy::new(300, MINUTE_MS, 20, SECOND_MS))
            .with_role_default(Role::Viewer, Policy::new(120, MINUTE_MS, 10, SECOND_MS))
            .with_role_default(Role::Default, Policy::new(60, MINUTE_MS, 10, SECOND_MS))
            .with_endpoint(EndpointRule::new(
                "/api/ai/console",
                "ai_console",
                Policy::new(10, MINUTE_MS, 2, SECOND_MS),
            ))
            .with_endpoint(EndpointRule::new(
                "/api/ai/qa",
                "ai_qa",
                Policy::new(20, MINUTE_MS, 3, SECOND_MS),
            ))
            .with_endpoint(EndpointRule::new(
                "/api/sync/state",
                "sync_state",
                Policy::new(30, MINUTE_MS, 5, SECOND_MS),
            ))
            .with_endpoint(EndpointRule::new(
                "/api/conversations/*/messages",
                "messages",
                Policy::new(120, MINUTE_MS, 10, SECOND_MS),
            ))
            .with_endpoint(
                EndpointRule::new(
                    "/api/conversations/*/messages",
                    "messages",
                    Policy::new(50, MINUTE_MS, 50, SECOND_MS),
                )
                .for_role(Role::Viewer),
            )
            .with_endpoint(EndpointRule::new(
                "/api/conversations",
                "conversations",
                Policy::new(100, MINUTE_MS, 10, SECOND_MS),
            ))
    }
}
