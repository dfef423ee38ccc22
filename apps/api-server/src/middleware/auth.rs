//! Caller resolution middleware and extractor.
//!
//! Every request leaves this middleware with a [`Caller`] in its extensions.
//! A valid bearer token yields the token's email (or subject) and its highest
//! role; anything else falls back to an anonymous caller keyed by client
//! address. Rejecting unauthenticated traffic is left to the handlers.
//!
//! The client address is the TCP peer. `X-Forwarded-For` is only read when
//! the peer is one of the configured [`TrustedProxies`].

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{self, HeaderMap},
};
use std::future::{Future, Ready, ready};
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;

use switchboard_core::domain::{Caller, Role};
use switchboard_core::ports::TokenService;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Reverse proxies whose `X-Forwarded-For` hops are believed.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Vec<IpAddr>);

impl TrustedProxies {
    pub fn new(proxies: Vec<IpAddr>) -> Self {
        Self(proxies)
    }

    fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }

    /// Client address for a request arriving from `peer`.
    ///
    /// Behind a trusted proxy this is the rightmost forwarded hop that is not
    /// itself a trusted proxy. Hops further left are client-supplied.
    pub fn client_ip(&self, peer: Option<IpAddr>, headers: &HeaderMap) -> Option<IpAddr> {
        let peer = peer?;
        if !self.contains(&peer) {
            return Some(peer);
        }

        let Some(chain) = headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) else {
            return Some(peer);
        };

        for hop in chain.rsplit(',') {
            match hop.trim().parse::<IpAddr>() {
                Ok(ip) if self.contains(&ip) => continue,
                Ok(ip) => return Some(ip),
                Err(_) => break,
            }
        }
        Some(peer)
    }
}

/// Identity middleware factory.
pub struct IdentityMiddleware {
    tokens: Option<Arc<dyn TokenService>>,
    proxies: TrustedProxies,
}

impl IdentityMiddleware {
    /// Without a token service every caller is anonymous.
    pub fn new(tokens: Option<Arc<dyn TokenService>>) -> Self {
        Self {
            tokens,
            proxies: TrustedProxies::default(),
        }
    }

    pub fn with_trusted_proxies(mut self, proxies: TrustedProxies) -> Self {
        self.proxies = proxies;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = IdentityMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service,
            tokens: self.tokens.clone(),
            proxies: self.proxies.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: S,
    tokens: Option<Arc<dyn TokenService>>,
    proxies: TrustedProxies,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let caller = resolve_caller(&req, self.tokens.as_deref(), &self.proxies);
        req.extensions_mut().insert(caller);

        let fut = self.service.call(req);
        Box::pin(fut)
    }
}

fn resolve_caller(
    req: &ServiceRequest,
    tokens: Option<&dyn TokenService>,
    proxies: &TrustedProxies,
) -> Caller {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    if let (Some(token), Some(tokens)) = (bearer, tokens) {
        match tokens.validate_token(token) {
            Ok(claims) => {
                let role = Role::from_claims(&claims.roles);
                return Caller::new(claims.email.unwrap_or(claims.subject), role);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring bearer token"),
        }
    }

    anonymous_caller(req, proxies)
}

/// Caller keyed by client address.
pub fn anonymous_caller(req: &ServiceRequest, proxies: &TrustedProxies) -> Caller {
    let peer = req.peer_addr().map(|addr| addr.ip());
    address_caller(proxies.client_ip(peer, req.headers()))
}

fn address_caller(ip: Option<IpAddr>) -> Caller {
    match ip {
        Some(ip) => Caller::anonymous(&ip.to_string()),
        None => Caller::anonymous("unknown"),
    }
}

/// Extractor for the caller resolved by [`IdentityMiddleware`].
#[derive(Debug, Clone)]
pub struct CurrentCaller(pub Caller);

impl FromRequest for CurrentCaller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let known = req.extensions().get::<Caller>().cloned();
        let caller = match known {
            Some(caller) => caller,
            None => address_caller(req.peer_addr().map(|addr| addr.ip())),
        };

        ready(Ok(CurrentCaller(caller)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test, web};
    use switchboard_core::ports::{AuthError, TokenClaims};

    struct StaticTokens;

    impl TokenService for StaticTokens {
        fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
            match token {
                "agent-token" => Ok(TokenClaims {
                    subject: "u-1".to_string(),
                    email: Some("agent@example.com".to_string()),
                    roles: vec!["viewer".to_string(), "agent".to_string()],
                    exp: i64::MAX,
                }),
                "no-email" => Ok(TokenClaims {
                    subject: "svc-7".to_string(),
                    email: None,
                    roles: vec!["robot".to_string()],
                    exp: i64::MAX,
                }),
                _ => Err(AuthError::InvalidToken("unknown".to_string())),
            }
        }
    }

    async fn whoami(caller: CurrentCaller) -> HttpResponse {
        HttpResponse::Ok().body(format!("{}|{}", caller.0.identity, caller.0.role))
    }

    async fn whoami_via(
        proxies: TrustedProxies,
        peer: &str,
        headers: &[(&str, &str)],
    ) -> String {
        let tokens: Arc<dyn TokenService> = Arc::new(StaticTokens);
        let app = test::init_service(
            App::new()
                .wrap(IdentityMiddleware::new(Some(tokens)).with_trusted_proxies(proxies))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let mut req = test::TestRequest::get()
            .uri("/whoami")
            .peer_addr(peer.parse().unwrap());
        for (name, value) in headers {
            req = req.insert_header((*name, *value));
        }

        let body = test::call_and_read_body(&app, req.to_request()).await;
        String::from_utf8(body.to_vec()).unwrap()
    }

    async fn call(auth: Option<&str>) -> String {
        let headers: Vec<(&str, &str)> = auth.map(|v| ("authorization", v)).into_iter().collect();
        whoami_via(TrustedProxies::default(), "10.0.0.7:4000", &headers).await
    }

    fn proxy() -> TrustedProxies {
        TrustedProxies::new(vec!["10.0.0.9".parse().unwrap()])
    }

    #[actix_web::test]
    async fn test_bearer_token_resolves_email_and_highest_role() {
        assert_eq!(call(Some("Bearer agent-token")).await, "agent@example.com|agent");
    }

    #[actix_web::test]
    async fn test_subject_used_when_email_missing() {
        assert_eq!(call(Some("Bearer no-email")).await, "svc-7|unknown");
    }

    #[actix_web::test]
    async fn test_invalid_token_falls_back_to_address() {
        assert_eq!(call(Some("Bearer forged")).await, "ip:10.0.0.7|default");
    }

    #[actix_web::test]
    async fn test_missing_header_falls_back_to_address() {
        assert_eq!(call(None).await, "ip:10.0.0.7|default");
    }

    #[actix_web::test]
    async fn test_forwarded_header_ignored_from_untrusted_peer() {
        let resolved = whoami_via(
            proxy(),
            "10.0.0.7:4000",
            &[("x-forwarded-for", "203.0.113.5")],
        )
        .await;
        assert_eq!(resolved, "ip:10.0.0.7|default");
    }

    #[actix_web::test]
    async fn test_trusted_proxy_yields_rightmost_untrusted_hop() {
        let resolved = whoami_via(
            proxy(),
            "10.0.0.9:4000",
            &[("x-forwarded-for", "198.51.100.1, 203.0.113.5, 10.0.0.9")],
        )
        .await;
        assert_eq!(resolved, "ip:203.0.113.5|default");
    }

    #[actix_web::test]
    async fn test_trusted_proxy_without_header_keys_on_proxy() {
        let resolved = whoami_via(proxy(), "10.0.0.9:4000", &[]).await;
        assert_eq!(resolved, "ip:10.0.0.9|default");
    }
}
