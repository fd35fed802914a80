use axum::{
    extract::{ Request, State },
    http::{ header, HeaderMap, HeaderValue, Method, StatusCode },
    middleware::Next,
    response::{ IntoResponse, Response },
};
use log::{ debug, warn };
use std::sync::Arc;

use crate::error::RelayError;

pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type";

/// Fixed cross-origin headers attached to every response.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_any: bool,
    origins: Vec<(String, HeaderValue)>,
}

impl CorsPolicy {
    pub fn new(origins: &[String]) -> Self {
        let mut allow_any = false;
        let mut allowed = Vec::new();

        for origin in origins.iter().map(|o| o.trim()).filter(|o| !o.is_empty()) {
            if origin == "*" {
                allow_any = true;
                continue;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push((origin.to_string(), value)),
                Err(_) => warn!("Ignoring allowed origin '{}': not a valid header value", origin),
            }
        }

        if allowed.is_empty() {
            allow_any = true;
        }

        Self { allow_any, origins: allowed }
    }

    pub fn allow_any() -> Self {
        Self { allow_any: true, origins: Vec::new() }
    }

    /// The `Access-Control-Allow-Origin` value and whether it depends on the
    /// request's `Origin`.
    fn allow_origin_for(&self, request_origin: Option<&str>) -> (HeaderValue, bool) {
        if self.allow_any {
            return (HeaderValue::from_static("*"), false);
        }
        let matched = request_origin.and_then(|origin| {
            self.origins.iter().find(|(allowed, _)| allowed == origin)
        });
        match matched {
            Some((_, value)) => (value.clone(), true),
            None => (self.origins[0].1.clone(), true),
        }
    }

    pub fn apply(&self, headers: &mut HeaderMap, request_origin: Option<&str>) {
        let (allow_origin, varies) = self.allow_origin_for(request_origin);
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        if varies {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
        headers
            .entry(header::CONTENT_TYPE)
            .or_insert_with(|| HeaderValue::from_static("application/json"));
    }
}

/// Outermost middleware. Preflight requests never reach a handler, unknown
/// methods are refused, and whatever comes back gets the CORS headers.
pub async fn cors_gate(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let method = request.method().clone();

    let mut response = match &method {
        &Method::OPTIONS => StatusCode::NO_CONTENT.into_response(),
        &Method::GET | &Method::POST => next.run(request).await,
        other => {
            debug!("Refusing {} {}", other, request.uri().path());
            RelayError::UnsupportedMethod.into_response()
        }
    };

    policy.apply(response.headers_mut(), origin.as_deref());
    response
}
