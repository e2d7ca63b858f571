//! `reqwest`-backed transport with a persistent cookie jar.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authgate_api::{
    GuardConfig, GuardError, Method, Transport, TransportFactory, TransportRequest,
    TransportResponse,
};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use url::Url;

use crate::xsrf::{XSRF_HEADER_NAME, xsrf_token};

/// Sends guard requests over HTTP, keeping session cookies between calls.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: Url,
    http: reqwest::Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    pub fn new(config: &GuardConfig) -> Result<Self, GuardError> {
        let base_url = parse_base_url(&config.api_base_url)?;
        let jar = Arc::new(Jar::default());

        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .default_headers(default_headers(config)?)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| GuardError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            base_url,
            http,
            jar,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `path` and `query` under the base URL.
    pub fn endpoint(&self, path: &str, query: &[(String, String)]) -> Url {
        join_endpoint(&self.base_url, path, query)
    }

    /// Current XSRF token for `url`, if the backend has set one.
    pub fn xsrf_token(&self, url: &Url) -> Option<String> {
        let cookies = self.jar.cookies(url)?;
        xsrf_token(cookies.to_str().ok()?)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, GuardError> {
        let url = self.endpoint(&request.path, &request.query);

        let mut builder = match request.method {
            Method::Get => self.http.get(url.clone()),
            Method::Post => self.http.post(url.clone()),
        };
        if let Some(token) = self.xsrf_token(&url) {
            builder = builder.header(XSRF_HEADER_NAME, token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            tracing::debug!(method = %request.method, path = %request.path, error = %e, "request failed");
            GuardError::Transport(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GuardError::Transport(format!("failed to read body: {e}")))?;

        tracing::debug!(method = %request.method, path = %request.path, status, "request completed");
        Ok(TransportResponse::new(status, decode_body(&bytes)))
    }
}

/// Builds a [`ReqwestTransport`] per client.
#[derive(Debug, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn build(&self, config: &GuardConfig) -> Result<Arc<dyn Transport>, GuardError> {
        Ok(Arc::new(ReqwestTransport::new(config)?))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, GuardError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GuardError::Config(
            "api_base_url is required for the http transport".to_string(),
        ));
    }
    let url = Url::parse(raw).map_err(|e| GuardError::Url(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GuardError::Url(format!(
            "{raw}: scheme must be http or https"
        )));
    }
    Ok(url)
}

fn default_headers(config: &GuardConfig) -> Result<HeaderMap, GuardError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );

    for (name, value) in &config.extra_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GuardError::Config(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| GuardError::Config(format!("invalid value for header {name}: {e}")))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

// Paths are appended to the base path rather than resolved against it, so a
// base of `https://host/backend` keeps its `/backend` prefix.
fn join_endpoint(base: &Url, path: &str, query: &[(String, String)]) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    url.set_fragment(None);

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    url
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn joins_under_base_prefix() {
        let url = join_endpoint(&base("https://app.example.com/backend/"), "/api/user", &[]);
        assert_eq!(url.as_str(), "https://app.example.com/backend/api/user");

        let url = join_endpoint(&base("http://localhost:8000"), "/login", &[]);
        assert_eq!(url.as_str(), "http://localhost:8000/login");
    }

    #[test]
    fn encodes_query_values() {
        let query = vec![
            ("route".to_string(), "/admin/users?x=1".to_string()),
            ("middleware".to_string(), "role:admin&owner".to_string()),
        ];
        let url = join_endpoint(&base("http://localhost:8000"), "/api/can-access", &query);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, query);
        assert_eq!(url.query().unwrap().matches('&').count(), 1);
    }

    #[test]
    fn decodes_bodies() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
        assert_eq!(decode_body(br#"{"allowed":true}"#), json!({"allowed": true}));
        assert_eq!(decode_body(b"<html>"), Value::String("<html>".to_string()));
    }

    #[test]
    fn requires_absolute_http_base() {
        assert!(matches!(
            ReqwestTransport::new(&GuardConfig::default()),
            Err(GuardError::Config(_))
        ));
        assert!(ReqwestTransport::new(&GuardConfig::with_base_url("/api")).is_err());
        assert!(ReqwestTransport::new(&GuardConfig::with_base_url("ftp://host")).is_err());
        assert!(ReqwestTransport::new(&GuardConfig::with_base_url("http://localhost:8000")).is_ok());
    }

    #[test]
    fn rejects_invalid_extra_headers() {
        let mut cfg = GuardConfig::with_base_url("http://localhost:8000");
        cfg.extra_headers
            .insert("bad header".to_string(), "x".to_string());
        assert!(matches!(
            ReqwestTransport::new(&cfg),
            Err(GuardError::Config(_))
        ));
    }

    #[test]
    fn xsrf_token_comes_from_jar() {
        let transport =
            ReqwestTransport::new(&GuardConfig::with_base_url("http://localhost:8000")).unwrap();
        let url = transport.endpoint("/api/user", &[]);
        assert_eq!(transport.xsrf_token(&url), None);

        transport
            .jar
            .add_cookie_str("XSRF-TOKEN=abc%3D; Path=/", transport.base_url());
        assert_eq!(transport.xsrf_token(&url).as_deref(), Some("abc="));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let mut cfg = GuardConfig::with_base_url("http://127.0.0.1:9");
        cfg.connect_timeout_ms = 200;
        cfg.request_timeout_ms = 500;
        let transport = ReqwestTransport::new(&cfg).unwrap();
        let err = transport
            .send(TransportRequest::get("/api/user"))
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::Transport(_)));
    }
}
