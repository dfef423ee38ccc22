//! JWT token service implementation.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

use switchboard_core::ports::{AuthError, TokenClaims, TokenService};

const DEFAULT_SECRET: &str = "change-me-in-production";

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            issuer: "switchboard-api".to_string(),
        }
    }
}

impl JwtConfig {
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string());

        if secret == DEFAULT_SECRET {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!(
                    "SECURITY: Using default JWT secret in production! Set JWT_SECRET environment variable."
                );
            } else {
                tracing::warn!("Using default JWT secret. Set JWT_SECRET for production use.");
            }
        }

        Self {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "switchboard-api".to_string()),
        }
    }
}

/// Wire claims. `iss` and `exp` are also checked by [`Validation`].
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    exp: i64,
}

/// HS256 bearer token validator.
pub struct JwtTokenService {
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            decoding_key,
            config,
        }
    }
}

impl TokenService for JwtTokenService {
    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        if token_data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }

        Ok(TokenClaims {
            subject: token_data.claims.sub,
            email: token_data.claims.email,
            roles: token_data.claims.roles,
            exp: token_data.claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    #[derive(Serialize)]
    struct IssuedClaims {
        sub: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        roles: Vec<String>,
        exp: i64,
        iat: i64,
        iss: String,
    }

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key".to_string(),
            issuer: "test-issuer".to_string(),
        }
    }

    fn mint(
        config: &JwtConfig,
        sub: &str,
        email: Option<&str>,
        roles: &[&str],
        ttl_secs: i64,
    ) -> String {
        let now = Utc::now().timestamp();
        let claims = IssuedClaims {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: now + ttl_secs,
            iat: now,
            iss: config.issuer.clone(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_keeps_email_and_roles() {
        let config = test_config();
        let service = JwtTokenService::new(config.clone());

        let token = mint(&config, "agent-7", Some("ana@example.com"), &["agent"], 3600);
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.subject, "agent-7");
        assert_eq!(claims.email.as_deref(), Some("ana@example.com"));
        assert_eq!(claims.roles, vec!["agent".to_string()]);
    }

    #[test]
    fn test_validate_invalid_token() {
        let service = JwtTokenService::new(test_config());

        let result = service.validate_token("invalid-token");

        assert!(matches!(result.unwrap_err(), AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_validate_wrong_issuer_token() {
        let issuer1 = JwtConfig {
            issuer: "issuer1".to_string(),
            ..test_config()
        };
        let issuer2 = JwtTokenService::new(JwtConfig {
            issuer: "issuer2".to_string(),
            ..test_config()
        });

        let token = mint(&issuer1, "svc", None, &[], 3600);

        assert!(issuer2.validate_token(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = JwtTokenService::new(test_config());
        let forged = JwtConfig {
            secret: "other-secret".to_string(),
            ..test_config()
        };

        let token = mint(&forged, "svc", None, &[], 3600);

        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let config = test_config();
        let service = JwtTokenService::new(config.clone());

        let token = mint(&config, "svc", None, &[], -3600);

        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let config = test_config();
        let service = JwtTokenService::new(config.clone());

        let token = mint(&config, "", None, &[], 3600);

        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
