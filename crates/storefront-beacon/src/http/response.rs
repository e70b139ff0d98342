//! Unified response value returned by [`super::HttpClient`].

/// Outcome of one HTTP exchange, captured as raw header lines plus body.
///
/// A transport failure produces a response with no header lines and no body,
/// so callers never have to handle an error type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    headers: Vec<String>,
    result: Option<String>,
}

impl HttpResponse {
    pub fn new(headers: Vec<String>, result: Option<String>) -> Self {
        Self { headers, result }
    }

    /// Response for a request that never got an answer.
    pub fn failed() -> Self {
        Self::default()
    }

    /// Status code parsed from the status line (`HTTP/1.1 404 Not Found`).
    ///
    /// Returns `0` when no headers were captured or the line is malformed.
    pub fn code(&self) -> u16 {
        self.headers
            .first()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0)
    }

    /// Response body, or `None` when the request or body read failed.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Raw header lines, status line first.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}
