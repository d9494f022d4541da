//! Middleware for logging requests and responses.

use axum::{extract::Request, http::header::CONTENT_TYPE, middleware::Next, response::Response};

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the response body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (headers, body_text) = extract_header_and_body_text_from_request(request).await;

    if headers.method.eq(&axum::http::Method::POST)
        && headers
            .headers
            .get(CONTENT_TYPE)
            .and_then(|content_type| content_type.to_str().ok())
            .is_some_and(|content_type| content_type.starts_with("application/json"))
    {
        let display_text = redact_json_field(&body_text, "password");
        log_request(&headers, &display_text);
    } else {
        log_request(&headers, &body_text);
    }

    let request = Request::from_parts(headers, body_text.into());
    let response = next.run(request).await;

    let (headers, body_text) = extract_header_and_body_text_from_response(response).await;
    log_response(&headers, &body_text);

    Response::from_parts(headers, body_text.into())
}

/// Replace the string value of `field_name` in a JSON object with asterisks.
///
/// Works on the raw text so that bodies which fail to parse as JSON are still
/// logged (unredacted fields and all structure preserved).
fn redact_json_field(body_text: &str, field_name: &str) -> String {
    let needle = format!("\"{field_name}\"");
    let Some(key_start) = body_text.find(&needle) else {
        return body_text.to_string();
    };

    let after_key = &body_text[key_start + needle.len()..];
    let Some(colon_offset) = after_key.find(':') else {
        return body_text.to_string();
    };
    let Some(quote_offset) = after_key[colon_offset..].find('"') else {
        return body_text.to_string();
    };

    let value_start = key_start + needle.len() + colon_offset + quote_offset + 1;
    let Some(value_length) = find_string_end(&body_text[value_start..]) else {
        return body_text.to_string();
    };

    let mut redacted = String::with_capacity(body_text.len());
    redacted.push_str(&body_text[..value_start]);
    redacted.push_str("********");
    redacted.push_str(&body_text[value_start + value_length..]);

    redacted
}

/// The byte offset of the closing quote of a JSON string, honoring escapes.
fn find_string_end(text: &str) -> Option<usize> {
    let mut escaped = false;

    for (offset, character) in text.char_indices() {
        match character {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(offset),
            _ => escaped = false,
        }
    }

    None
}

async fn extract_header_and_body_text_from_request(
    request: Request,
) -> (axum::http::request::Parts, String) {
    let (headers, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn extract_header_and_body_text_from_response(
    response: Response,
) -> (axum::http::response::Parts, String) {
    let (headers, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The longest prefix of `body` that is at most `limit` bytes and ends on a
/// character boundary, so that multibyte characters are never split.
fn truncate_on_char_boundary(body: &str, limit: usize) -> &str {
    if body.len() <= limit {
        return body;
    }

    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {headers:#?}\nbody: {:}...",
            truncate_on_char_boundary(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {headers:#?}\nbody: {body:?}");
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {headers:#?}\nbody: {:}...",
            truncate_on_char_boundary(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {headers:#?}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod truncation_tests {
    use super::{LOG_BODY_LENGTH_LIMIT, truncate_on_char_boundary};

    #[test]
    fn short_body_is_unchanged() {
        assert_eq!(truncate_on_char_boundary("hello", 64), "hello");
    }

    #[test]
    fn long_ascii_body_is_cut_at_the_limit() {
        let body = "a".repeat(100);

        let truncated = truncate_on_char_boundary(&body, LOG_BODY_LENGTH_LIMIT);

        assert_eq!(truncated.len(), LOG_BODY_LENGTH_LIMIT);
    }

    #[test]
    fn multibyte_character_straddling_the_limit_is_dropped_whole() {
        // The euro sign is three bytes, starting at byte 63.
        let body = format!("{}€ and more text", "a".repeat(63));

        let truncated = truncate_on_char_boundary(&body, LOG_BODY_LENGTH_LIMIT);

        assert_eq!(truncated, "a".repeat(63));
    }
}
