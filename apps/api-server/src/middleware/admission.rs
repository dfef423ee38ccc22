//! Admission control and read caching middleware.
//!
//! Runs after [`IdentityMiddleware`](super::auth::IdentityMiddleware) so the
//! caller is known. Exempt paths pass straight through. Everything else is
//! checked against the gate; a store failure lets the request through.
//! Admitted cacheable GETs are served from the response cache when possible.
//! Bodies of unknown size or above the cache ceiling are passed on uncached.

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::{self, BodySize, EitherBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{
        StatusCode,
        header::{self, HeaderMap, HeaderName, HeaderValue},
    },
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use switchboard_core::admission::{AdmissionGate, ReadCache};
use switchboard_core::domain::{Caller, GateResult};
use switchboard_core::ports::CachedResponse;
use switchboard_shared::RateLimitedResponse;

use super::auth::{TrustedProxies, anonymous_caller};

const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";
const X_CACHE: &str = "x-cache";

const DEFAULT_MAX_CACHED_BODY: usize = 256 * 1024;

/// Admission middleware factory.
pub struct AdmissionMiddleware {
    gate: Arc<AdmissionGate>,
    read_cache: Arc<ReadCache>,
    max_cached_body: usize,
}

impl AdmissionMiddleware {
    pub fn new(gate: Arc<AdmissionGate>, read_cache: Arc<ReadCache>) -> Self {
        Self {
            gate,
            read_cache,
            max_cached_body: DEFAULT_MAX_CACHED_BODY,
        }
    }

    /// Largest handler body that is buffered for caching.
    pub fn with_max_cached_body(mut self, bytes: usize) -> Self {
        self.max_cached_body = bytes;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdmissionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AdmissionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionMiddlewareService {
            service,
            gate: self.gate.clone(),
            read_cache: self.read_cache.clone(),
            max_cached_body: self.max_cached_body,
        }))
    }
}

pub struct AdmissionMiddlewareService<S> {
    service: S,
    gate: Arc<AdmissionGate>,
    read_cache: Arc<ReadCache>,
    max_cached_body: usize,
}

impl<S, B> Service<ServiceRequest> for AdmissionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();

        if self.gate.is_exempt(&path) {
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        }

        let known = req.extensions().get::<Caller>().cloned();
        let caller = match known {
            Some(caller) => caller,
            None => anonymous_caller(&req, &TrustedProxies::default()),
        };

        let verdict = match self.gate.check(&caller, &path) {
            Ok(result) => Some(result),
            Err(e) => {
                self.gate.record_fail_open(&caller, &path, &e);
                None
            }
        };

        if let Some(result) = verdict.as_ref().filter(|r| !r.allowed) {
            let mut response = HttpResponse::TooManyRequests()
                .insert_header((header::RETRY_AFTER, result.retry_after_sec))
                .json(RateLimitedResponse::new(
                    result.scope.clone(),
                    result.window_ms,
                    result.limit,
                    result.retry_after_sec,
                ));
            apply_limit_headers(response.headers_mut(), result);

            let (http_req, _payload) = req.into_parts();
            let srv_response = ServiceResponse::new(http_req, response);
            return Box::pin(async move { Ok(srv_response.map_into_right_body()) });
        }

        let cacheable = self.read_cache.ttl_for(req.method().as_str(), &path).map(|ttl| {
            let signature = ReadCache::signature(
                req.method().as_str(),
                &path,
                req.query_string(),
                &caller.identity,
            );
            (signature, ttl)
        });

        if let Some((signature, _)) = &cacheable {
            if let Some(hit) = self.read_cache.lookup(&caller, &path, signature) {
                let mut response = cached_response(&hit);
                if let Some(result) = &verdict {
                    apply_limit_headers(response.headers_mut(), result);
                }

                let (http_req, _payload) = req.into_parts();
                let srv_response = ServiceResponse::new(http_req, response);
                return Box::pin(async move { Ok(srv_response.map_into_right_body()) });
            }
        }

        let fut = self.service.call(req);
        let read_cache = self.read_cache.clone();
        let max_cached_body = self.max_cached_body;

        Box::pin(async move {
            let mut res = fut.await?;
            if let Some(result) = &verdict {
                apply_limit_headers(res.headers_mut(), result);
            }

            match cacheable {
                Some((signature, ttl))
                    if res.status().is_success()
                        && fits_in_cache(res.response().body().size(), max_cached_body) =>
                {
                    store_and_rebuild(res, &read_cache, signature, ttl, max_cached_body).await
                }
                _ => Ok(res.map_into_left_body()),
            }
        })
    }
}

fn apply_limit_headers(headers: &mut HeaderMap, result: &GateResult) {
    headers.insert(
        HeaderName::from_static(X_RATELIMIT_LIMIT),
        HeaderValue::from(result.limit),
    );
    headers.insert(
        HeaderName::from_static(X_RATELIMIT_REMAINING),
        HeaderValue::from(result.remaining),
    );
    headers.insert(
        HeaderName::from_static(X_RATELIMIT_RESET),
        HeaderValue::from(result.reset_epoch_sec),
    );
}

fn cached_response(hit: &CachedResponse) -> HttpResponse {
    let status = StatusCode::from_u16(hit.status).unwrap_or(StatusCode::OK);
    let mut builder = HttpResponse::build(status);
    if let Some(content_type) = &hit.content_type {
        builder.insert_header((header::CONTENT_TYPE, content_type.as_str()));
    }
    builder
        .insert_header((X_CACHE, "HIT"))
        .body(hit.body.clone())
}

fn fits_in_cache(size: BodySize, max: usize) -> bool {
    match size {
        BodySize::None => true,
        BodySize::Sized(len) => usize::try_from(len).is_ok_and(|len| len <= max),
        BodySize::Stream => false,
    }
}

/// Buffer a handler's body, keep a copy in the cache, and hand it on.
async fn store_and_rebuild<B>(
    res: ServiceResponse<B>,
    read_cache: &ReadCache,
    signature: String,
    ttl: Duration,
    max_cached_body: usize,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody + 'static,
{
    let (http_req, response) = res.into_parts();
    let (head, payload) = response.into_parts();

    let bytes = match body::to_bytes_limited(payload, max_cached_body).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            let e: Box<dyn std::error::Error> = e.into();
            tracing::warn!(error = %e, "Failed to buffer response body");
            return Err(actix_web::error::ErrorInternalServerError(
                "failed to read response body",
            ));
        }
        Err(_) => {
            tracing::warn!(max_cached_body, "Response body outgrew its declared size");
            return Err(actix_web::error::ErrorInternalServerError(
                "failed to read response body",
            ));
        }
    };

    let content_type = head
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    read_cache.store(
        signature,
        CachedResponse {
            status: head.status().as_u16(),
            content_type,
            body: bytes.to_vec(),
        },
        ttl,
    );

    let mut response = head.set_body(bytes).map_into_boxed_body();
    response.headers_mut().insert(
        HeaderName::from_static(X_CACHE),
        HeaderValue::from_static("MISS"),
    );

    Ok(ServiceResponse::new(http_req, response).map_into_right_body())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::IdentityMiddleware;
    use actix_web::{App, test, web};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use switchboard_core::admission::{EndpointRule, PolicyResolver, PolicyTable};
    use switchboard_core::domain::{DecisionKind, Policy};
    use switchboard_core::ports::{
        Clock, CounterKey, DecisionObserver, ManualClock, RateLimitError, RecordingObserver,
        ResponseCache, WindowCounterStore,
    };
    use switchboard_infra::{
        InMemoryResponseCache, InMemoryWindowCounterStore, ResponseCacheConfig,
    };

    struct Harness {
        gate: Arc<AdmissionGate>,
        read_cache: Arc<ReadCache>,
        clock: Arc<ManualClock>,
        observer: Arc<RecordingObserver>,
    }

    fn harness_with_store(
        store: impl FnOnce(Arc<dyn Clock>) -> Arc<dyn WindowCounterStore>,
    ) -> Harness {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let observer = Arc::new(RecordingObserver::new());
        let table = PolicyTable::new(Policy::new(10, 60_000, 5, 1_000)).with_endpoint(
            EndpointRule::new("/api/ai/qa", "ai_qa", Policy::new(2, 60_000, 2, 1_000)),
        );
        let resolver = PolicyResolver::new(table).unwrap();

        let gate = AdmissionGate::new(
            resolver,
            store(clock.clone()),
            observer.clone() as Arc<dyn DecisionObserver>,
            clock.clone(),
        );
        let responses: Arc<dyn ResponseCache> = Arc::new(InMemoryResponseCache::new(
            clock.clone(),
            ResponseCacheConfig::default(),
        ));
        let read_cache = ReadCache::new(responses, observer.clone(), Duration::from_secs(30));

        Harness {
            gate: Arc::new(gate),
            read_cache: Arc::new(read_cache),
            clock,
            observer,
        }
    }

    fn harness() -> Harness {
        harness_with_store(|clock| Arc::new(InMemoryWindowCounterStore::new(clock)))
    }

    struct BrokenStore;

    impl WindowCounterStore for BrokenStore {
        fn check_and_increment(
            &self,
            _key: &CounterKey,
            _policy: &Policy,
        ) -> Result<switchboard_core::domain::Decision, RateLimitError> {
            Err(RateLimitError::Backend("unavailable".to_string()))
        }

        fn sweep(&self) -> usize {
            0
        }

        fn len(&self) -> usize {
            0
        }
    }

    #[derive(Default)]
    struct Hits(AtomicUsize);

    async fn counted(hits: web::Data<Hits>) -> HttpResponse {
        let n = hits.0.fetch_add(1, Ordering::SeqCst) + 1;
        HttpResponse::Ok().json(serde_json::json!({ "call": n }))
    }

    async fn missing() -> HttpResponse {
        HttpResponse::NotFound().finish()
    }

    macro_rules! app {
        ($h:expr, $hits:expr) => {
            app!($h, $hits, DEFAULT_MAX_CACHED_BODY)
        };
        ($h:expr, $hits:expr, $max_body:expr) => {
            test::init_service(
                App::new()
                    .wrap(
                        AdmissionMiddleware::new($h.gate.clone(), $h.read_cache.clone())
                            .with_max_cached_body($max_body),
                    )
                    .wrap(IdentityMiddleware::new(None))
                    .app_data($hits.clone())
                    .route("/api/health", web::get().to(counted))
                    .route("/api/ai/qa", web::post().to(counted))
                    .route("/api/contacts", web::get().to(counted))
                    .route("/api/contacts", web::post().to(counted))
                    .route("/api/sync/state", web::get().to(missing)),
            )
            .await
        };
    }

    fn header<'a>(res: &'a ServiceResponse<impl MessageBody>, name: &str) -> Option<&'a str> {
        res.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[actix_web::test]
    async fn test_denied_request_gets_429_with_body_and_headers() {
        let h = harness();
        let hits = web::Data::new(Hits::default());
        let app = app!(h, hits);

        for _ in 0..2 {
            let req = test::TestRequest::post().uri("/api/ai/qa").to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let req = test::TestRequest::post().uri("/api/ai/qa").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header(&res, "retry-after"), Some("1"));
        assert_eq!(header(&res, "x-ratelimit-limit"), Some("2"));
        assert_eq!(header(&res, "x-ratelimit-remaining"), Some("0"));

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(
            body,
            serde_json::json!({
                "code": "RATE_LIMITED",
                "message": "Too many requests",
                "details": { "scope": "ai_qa", "windowMs": 1000, "limit": 2 },
                "retryAfter": 1
            })
        );
        assert_eq!(hits.0.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn test_admitted_request_carries_limit_headers() {
        let h = harness();
        let hits = web::Data::new(Hits::default());
        let app = app!(h, hits);

        let req = test::TestRequest::post().uri("/api/ai/qa").to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(header(&res, "x-ratelimit-limit"), Some("2"));
        assert_eq!(header(&res, "x-ratelimit-remaining"), Some("1"));
        assert_eq!(header(&res, "x-ratelimit-reset"), Some("1020"));
        assert!(header(&res, "retry-after").is_none());
    }

    #[actix_web::test]
    async fn test_exempt_path_bypasses_gate() {
        let h = harness();
        let hits = web::Data::new(Hits::default());
        let app = app!(h, hits);

        for _ in 0..10 {
            let req = test::TestRequest::get().uri("/api/health").to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert!(header(&res, "x-ratelimit-limit").is_none());
        }
        assert!(h.observer.events().is_empty());
    }

    #[actix_web::test]
    async fn test_store_failure_fails_open() {
        let h = harness_with_store(|_| Arc::new(BrokenStore));
        let hits = web::Data::new(Hits::default());
        let app = app!(h, hits);

        for _ in 0..5 {
            let req = test::TestRequest::post().uri("/api/ai/qa").to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert!(header(&res, "x-ratelimit-limit").is_none());
        }

        let events = h.observer.events();
        assert_eq!(events.len(), 5);
        assert!(events.iter().all(|e| e.decision == DecisionKind::FailOpen));
    }

    #[actix_web::test]
    async fn test_cacheable_get_served_from_cache_until_expiry() {
        let h = harness();
        let hits = web::Data::new(Hits::default());
        let app = app!(h, hits);

        let req = test::TestRequest::get().uri("/api/contacts?b=2&a=1").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(header(&res, "x-cache"), Some("MISS"));
        let first = test::read_body(res).await;

        let req = test::TestRequest::get().uri("/api/contacts?a=1&b=2").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(header(&res, "x-cache"), Some("HIT"));
        assert_eq!(header(&res, "content-type"), Some("application/json"));
        assert_eq!(test::read_body(res).await, first);
        assert_eq!(hits.0.load(Ordering::SeqCst), 1);

        h.clock.advance(Duration::from_secs(31));
        let req = test::TestRequest::get().uri("/api/contacts?a=1&b=2").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(header(&res, "x-cache"), Some("MISS"));
        assert_eq!(hits.0.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn test_writes_and_errors_are_not_cached() {
        let h = harness();
        let hits = web::Data::new(Hits::default());
        let app = app!(h, hits);

        for _ in 0..2 {
            let req = test::TestRequest::post().uri("/api/contacts").to_request();
            let res = test::call_service(&app, req).await;
            assert!(header(&res, "x-cache").is_none());
        }
        assert_eq!(hits.0.load(Ordering::SeqCst), 2);

        for _ in 0..2 {
            let req = test::TestRequest::get().uri("/api/sync/state").to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
            assert!(header(&res, "x-cache").is_none());
        }
    }

    #[actix_web::test]
    async fn test_anonymous_callers_counted_per_address() {
        let h = harness();
        let hits = web::Data::new(Hits::default());
        let app = app!(h, hits);

        let from = |addr: &str| {
            test::TestRequest::post()
                .uri("/api/ai/qa")
                .peer_addr(addr.parse().unwrap())
                .to_request()
        };

        for _ in 0..2 {
            let res = test::call_service(&app, from("10.0.0.1:1000")).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = test::call_service(&app, from("10.0.0.1:1000")).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let res = test::call_service(&app, from("10.0.0.2:1000")).await;
        assert_eq!(res.status(), StatusCode::OK);

        let events = h.observer.events();
        assert_eq!(events[0].identity, "ip:10.0.0.1");
        assert_eq!(events[3].identity, "ip:10.0.0.2");
    }

    #[actix_web::test]
    async fn test_forwarded_for_rotation_does_not_reset_budget() {
        let h = harness();
        let hits = web::Data::new(Hits::default());
        let app = app!(h, hits);

        let mut admitted = 0;
        for i in 0..20 {
            let req = test::TestRequest::post()
                .uri("/api/ai/qa")
                .peer_addr("10.0.0.1:1000".parse().unwrap())
                .insert_header(("x-forwarded-for", format!("1.2.3.{i}")))
                .to_request();
            if test::call_service(&app, req).await.status() == StatusCode::OK {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 2);
        assert!(h.observer.events().iter().all(|e| e.identity == "ip:10.0.0.1"));
    }

    #[actix_web::test]
    async fn test_oversized_body_passes_through_uncached() {
        let h = harness();
        let hits = web::Data::new(Hits::default());
        let app = app!(h, hits, 4);

        for call in 1..=2 {
            let req = test::TestRequest::get().uri("/api/contacts").to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert!(header(&res, "x-cache").is_none());

            let body: serde_json::Value = test::read_body_json(res).await;
            assert_eq!(body, serde_json::json!({ "call": call }));
        }
        assert_eq!(hits.0.load(Ordering::SeqCst), 2);
    }

    #[::core::prelude::v1::test]
    fn test_only_sized_bodies_within_ceiling_fit() {
        assert!(fits_in_cache(BodySize::None, 0));
        assert!(fits_in_cache(BodySize::Sized(4), 4));
        assert!(!fits_in_cache(BodySize::Sized(5), 4));
        assert!(!fits_in_cache(BodySize::Stream, 1024));
    }
}
