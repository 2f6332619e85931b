use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::app::http::response_envelope::{Envelope, FieldIssue};

const KNOWN_FIELDS: [&str; 4] = ["query", "k", "catalog_path", "sample_size"];

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

/// Picks the request field a serde message complains about, if any.
fn guess_path_from_serde_msg(msg: &str) -> Option<String> {
    KNOWN_FIELDS
        .iter()
        .find(|key| msg.contains(&format!("`{key}`")) || msg.contains(&format!("{key}:")))
        .map(|key| key.to_string())
}

fn hint_for(msg: &str) -> Option<String> {
    if msg.contains("invalid type: string") && msg.contains("integer") {
        Some("Numeric fields (`k`, `sample_size`) must be JSON numbers.".into())
    } else if msg.contains("missing field `query`") {
        Some("Send a JSON object like { \"query\": \"summer beach outfit\" }.".into())
    } else if msg.contains("expected a map") || msg.contains("expected struct") {
        Some("Expected a JSON object here (e.g. { \"field\": \"value\" }).".into())
    } else if msg.contains("Content-Type") {
        Some("Set `Content-Type: application/json`.".into())
    } else {
        None
    }
}

fn ensure_request_id(parts: &mut axum::http::response::Parts) -> String {
    if let Some(v) = parts
        .headers
        .get("X-Request-Id")
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        return v.to_string();
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    let id = format!("req-{nanos}");
    if let Ok(v) = HeaderValue::from_str(&id) {
        parts.headers.insert("X-Request-Id", v);
    }
    id
}

/// Rewrites plain-text extractor rejections (400/415/422) into the JSON envelope.
///
/// Bodies that are already envelopes pass through untouched.
pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    let code = match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE_ENTITY",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        _ => return res,
    };

    let (mut parts, bytes) = take_body(res).await;
    ensure_request_id(&mut parts);

    if serde_json::from_slice::<serde_json::Value>(&bytes)
        .is_ok_and(|v| v.get("success").is_some())
    {
        return Response::from_parts(parts, bytes.into());
    }

    let original = String::from_utf8_lossy(&bytes);
    let envelope = Envelope::failure(status, code, original.trim()).with_issue(FieldIssue {
        path: guess_path_from_serde_msg(&original),
        hint: hint_for(&original),
    });

    let body = match serde_json::to_vec(&envelope) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.headers.insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);

    Response::from_parts(parts, body.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_messages_point_at_fields() {
        let msg = "Failed to deserialize the JSON body into the target type: k: invalid type: string \"ten\", expected usize at line 1 column 22";
        assert_eq!(guess_path_from_serde_msg(msg).as_deref(), Some("k"));
        assert_eq!(
            guess_path_from_serde_msg("missing field `query` at line 1 column 2").as_deref(),
            Some("query")
        );
        assert_eq!(guess_path_from_serde_msg("EOF while parsing"), None);
    }

    #[test]
    fn missing_query_gets_a_hint() {
        assert!(hint_for("missing field `query`").is_some());
        assert!(hint_for("something else").is_none());
    }
}
