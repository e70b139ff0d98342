//! Single-shot GET/POST helper that never returns an error.
//!
//! Every call is one awaited request/response cycle: no retries, and no
//! redirect handling beyond what reqwest does on its own. Transport failures
//! are folded into [`HttpResponse::failed`].

use reqwest::Method;
use tracing::Instrument;

use super::response::HttpResponse;

/// Thin wrapper over a caller-configured `reqwest::Client`. Cheap to clone.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Wrap an existing client; timeouts and TLS come from its builder.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// POST a pre-encoded body with raw `Name: value` header lines.
    pub async fn post(&self, url: &str, headers: &[&str], body: String) -> HttpResponse {
        self.send(Method::POST, url, headers, Some(body)).await
    }

    /// GET `url`, with `params` form-encoded onto its query string.
    pub async fn get(&self, url: &str, headers: &[&str], params: &[(&str, &str)]) -> HttpResponse {
        let url = append_query(url, params);
        self.send(Method::GET, &url, headers, None).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[&str],
        body: Option<String>,
    ) -> HttpResponse {
        let span = beacon_tracing::http_request_span!(method, url);

        async {
            let mut req_builder = self.client.request(method.clone(), url);

            for line in headers {
                match line.split_once(':') {
                    Some((name, value)) => {
                        req_builder = req_builder.header(name.trim(), value.trim());
                    }
                    None => tracing::debug!(header = %line, "Skipping malformed header line"),
                }
            }

            if let Some(body) = body {
                req_builder = req_builder.body(body);
            }

            let resp = match req_builder.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::debug!(error = %e, timeout = e.is_timeout(), "HTTP request failed");
                    return HttpResponse::failed();
                }
            };

            let status = resp.status();
            tracing::Span::current().record("status", status.as_u16());

            let mut lines = Vec::with_capacity(resp.headers().len() + 1);
            lines.push(format!("{:?} {}", resp.version(), status));
            for (name, value) in resp.headers() {
                lines.push(format!(
                    "{}: {}",
                    name,
                    String::from_utf8_lossy(value.as_bytes())
                ));
            }

            let result = match resp.text().await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to read response body");
                    None
                }
            };

            HttpResponse::new(lines, result)
        }
        .instrument(span)
        .await
    }
}

/// Append form-encoded `params` to `url`, joining with `?` or `&` as needed.
///
/// A `#fragment` stays at the end, after the query.
pub fn append_query(url: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }

    let query = match serde_urlencoded::to_string(params) {
        Ok(query) => query,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to encode query parameters");
            return url.to_string();
        }
    };

    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };

    let separator = if base.ends_with('?') || base.ends_with('&') {
        ""
    } else if base.contains('?') {
        "&"
    } else {
        "?"
    };

    match fragment {
        Some(fragment) => format!("{base}{separator}{query}#{fragment}"),
        None => format!("{base}{separator}{query}"),
    }
}
