use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub const HEADER_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_ID_LEN: usize = 128;

fn normalize_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_ID_LEN {
        return None;
    }
    Some(trimmed.to_string())
}

/// Echoes the caller's `x-request-id` or mints a UUID, on both the request
/// (for the trace span) and the response.
pub async fn request_id_mw(mut req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(normalize_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let value = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &value {
        req.headers_mut().insert(HEADER_REQUEST_ID, value.clone());
    }

    let mut response = next.run(req).await;
    if let Some(value) = value {
        response.headers_mut().insert(HEADER_REQUEST_ID, value);
    }
    response
}
