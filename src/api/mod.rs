//! HTTP surface: shared state, extractors and the router.

mod auth;
mod financial;
mod limit;
mod milestones;
mod projects;
mod reports;
mod resources;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequest, FromRequestParts};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use limit::{RateLimitConfig, RateLimiter};

use crate::analysis::DateWindow;
use crate::auth::{require_auth, JwtService};
use crate::db::Database;
use crate::error::ApiError;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtService,
    pub limiter: Arc<RateLimiter>,
}

/// Largest accepted request body.
const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Hardening headers added to every response.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'self';base-uri 'self';font-src 'self' https: data:;form-action 'self';\
         frame-ancestors 'self';img-src 'self' data:;object-src 'none';script-src 'self';\
         script-src-attr 'none';style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// `Json` whose rejections render as `ApiError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `?startDate=..&endDate=..`; only applied when both are present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl WindowQuery {
    pub fn window(&self) -> Option<DateWindow> {
        DateWindow::from_bounds(self.start_date, self.end_date)
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "OK", "timestamp": Utc::now() }))
}

async fn route_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Route not found" })))
}

fn cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn with_security_headers(router: Router<AppState>) -> Router<AppState> {
    SECURITY_HEADERS.iter().fold(router, |router, &(name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .nest("/projects", projects::routes())
        .nest("/resources", resources::routes())
        .nest("/milestones", milestones::routes())
        .nest("/financial", financial::routes())
        .nest("/reports", reports::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected);

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), limit::rate_limit));

    with_security_headers(app)
        .layer(cors(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::testing::*;
    use super::*;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unknown_routes_get_json_404() {
        let (status, body) = send(get("/api/nothing-here")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        for uri in ["/api/projects", "/api/reports/dashboard", "/api/auth/me"] {
            let (status, body) = send(get(uri)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["error"], "Access denied. No token provided.");
            assert_eq!(body["code"], "UNAUTHENTICATED");
        }
    }

    #[tokio::test]
    async fn garbage_tokens_are_rejected_before_any_lookup() {
        let req = Request::builder()
            .uri("/api/resources")
            .header("authorization", "Bearer not.a.jwt")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token.");
    }

    #[tokio::test]
    async fn non_bearer_scheme_counts_as_missing() {
        let req = Request::builder()
            .uri("/api/milestones")
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access denied. No token provided.");
    }

    #[test]
    fn window_needs_both_bounds() {
        let q = WindowQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: None,
        };
        assert!(q.window().is_none());

        let q = WindowQuery {
            end_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            ..q
        };
        assert!(q.window().is_some());
    }

    #[tokio::test]
    async fn responses_carry_security_headers() {
        let resp = app().oneshot(get("/health")).await.unwrap();
        let headers = resp.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
        assert_eq!(headers["referrer-policy"], "no-referrer");
        assert!(headers.contains_key("content-security-policy"));
    }

    #[tokio::test]
    async fn cors_preflight_allows_credentials() {
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/projects")
            .header("origin", ORIGIN)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        let headers = resp.headers();
        assert_eq!(headers["access-control-allow-origin"], ORIGIN);
        assert_eq!(headers["access-control-allow-credentials"], "true");
    }

    #[tokio::test]
    async fn oversized_bodies_are_refused() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .header("content-length", (BODY_LIMIT_BYTES + 1).to_string())
            .body(Body::from("{}"))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn clients_over_budget_get_429() {
        let app = router(
            state_with_limit(RateLimitConfig {
                max_requests: 2,
                window: std::time::Duration::from_secs(60),
            }),
            &[ORIGIN.to_string()],
        );

        for _ in 0..2 {
            let resp = app.clone().oneshot(get("/health")).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key("retry-after"));
        assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    }
}
