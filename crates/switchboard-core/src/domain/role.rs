use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller role used to select a rate-limit policy.
///
/// The set is closed. Anything the identity collaborator hands us that is not
/// one of the known names becomes [`Role::Unknown`], which resolves exactly
/// like [`Role::Default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Agent,
    Viewer,
    #[default]
    Default,
    Unknown,
}

impl Role {
    /// Parse a role name, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "agent" => Role::Agent,
            "viewer" => Role::Viewer,
            "default" | "user" => Role::Default,
            _ => Role::Unknown,
        }
    }

    /// Pick the most privileged known role from a list of token claims.
    ///
    /// An empty list is an ordinary caller (`Default`); a list made only of
    /// unrecognized names is `Unknown`.
    pub fn from_claims(claims: &[String]) -> Self {
        if claims.is_empty() {
            return Role::Default;
        }

        claims
            .iter()
            .map(|c| Role::parse(c))
            .filter(|r| *r != Role::Unknown)
            .max_by_key(|r| r.rank())
            .unwrap_or(Role::Unknown)
    }

    /// The role whose policies actually apply.
    pub fn effective(self) -> Self {
        match self {
            Role::Unknown => Role::Default,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Viewer => "viewer",
            Role::Default => "default",
            Role::Unknown => "unknown",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Agent => 2,
            Role::Viewer => 1,
            Role::Default | Role::Unknown => 0,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Role::parse("Admin"), Role::Admin);
        assert_eq!(Role::parse(" VIEWER "), Role::Viewer);
        assert_eq!(Role::parse("agent"), Role::Agent);
    }

    #[test]
    fn test_typo_becomes_unknown_and_resolves_to_default() {
        let role = Role::parse("admn");
        assert_eq!(role, Role::Unknown);
        assert_eq!(role.effective(), Role::Default);
    }

    #[test]
    fn test_from_claims_picks_highest_known_role() {
        let claims = vec!["viewer".to_string(), "bogus".to_string(), "agent".to_string()];
        assert_eq!(Role::from_claims(&claims), Role::Agent);
    }

    #[test]
    fn test_from_claims_edge_cases() {
        assert_eq!(Role::from_claims(&[]), Role::Default);
        assert_eq!(Role::from_claims(&["root".to_string()]), Role::Unknown);
    }
}
