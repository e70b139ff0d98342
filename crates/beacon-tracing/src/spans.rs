//! Span builder helpers for beacon instrumentation.

/// Create a span covering one hit sent to the collection endpoint.
///
/// Usage: `let span = hit_span!("event", client_id);`
///
/// Recorded once the response is in:
/// - `status`: numeric HTTP status, `0` when nothing came back
/// - `latency_ms`: milliseconds from send to response
#[macro_export]
macro_rules! hit_span {
    ($hit_type:expr, $client_id:expr) => {
        tracing::info_span!(
            "measurement_hit",
            hit_type = %$hit_type,
            client_id = %$client_id,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}

/// Create a span for a single outbound HTTP exchange.
#[macro_export]
macro_rules! http_request_span {
    ($method:expr, $url:expr) => {
        tracing::debug_span!(
            "http_request",
            method = %$method,
            url = %$url,
            status = tracing::field::Empty,
        )
    };
}
