use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type RoleId = String;
pub type Route = String;

pub const USER_PATH: &str = "/api/user";
pub const CSRF_COOKIE_PATH: &str = "/sanctum/csrf-cookie";
pub const LOGIN_PATH: &str = "/login";
pub const LOGOUT_PATH: &str = "/logout";
pub const CAN_ACCESS_PATH: &str = "/api/can-access";

/// How the host application navigates between pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardMode {
    /// Client-routed single page application: redirects are route changes.
    #[default]
    Spa,
    /// Multi-page application: redirects are full navigations.
    Mpa,
}

impl fmt::Display for GuardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardMode::Spa => f.write_str("spa"),
            GuardMode::Mpa => f.write_str("mpa"),
        }
    }
}

impl std::str::FromStr for GuardMode {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spa" => Ok(GuardMode::Spa),
            "mpa" => Ok(GuardMode::Mpa),
            other => Err(GuardError::Config(format!(
                "unknown mode {other:?} (expected \"spa\" or \"mpa\")"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Redirects {
    /// Where blocked visitors are sent. Empty disables the redirect.
    pub on_fail: String,
    pub on_success: String,
}

impl Default for Redirects {
    fn default() -> Self {
        Self {
            on_fail: "/login".to_string(),
            on_success: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub api_base_url: String,
    pub mode: GuardMode,
    pub redirects: Redirects,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            mode: GuardMode::default(),
            redirects: Redirects::default(),
            connect_timeout_ms: 2_000,
            request_timeout_ms: 10_000,
            extra_headers: BTreeMap::new(),
        }
    }
}

impl GuardConfig {
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }
}

/// The authenticated user as returned by the backend.
///
/// Only `roles` is interpreted; every other field is kept verbatim in
/// `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(
        default,
        deserialize_with = "deserialize_roles",
        skip_serializing_if = "Option::is_none"
    )]
    pub roles: Option<Vec<RoleId>>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl User {
    pub fn with_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        Self {
            roles: Some(roles.into_iter().map(Into::into).collect()),
            attributes: Map::new(),
        }
    }

    /// Parse a response body into a user. The body must be a JSON object.
    pub fn from_value(value: Value) -> Result<Self, GuardError> {
        if !value.is_object() {
            return Err(GuardError::Decode(format!(
                "expected a user object, got {}",
                value_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn roles(&self) -> Option<&[RoleId]> {
        self.roles.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Convenience accessor for `id`, rendered as a string.
    pub fn id(&self) -> Option<String> {
        match self.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Convenience accessor for `email`.
    pub fn email(&self) -> Option<&str> {
        self.get("email").and_then(Value::as_str)
    }

    /// Convenience accessor for `name`.
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }
}

// Role ids may come back as strings or integers; both compare as strings.
// Other entries are skipped and a non-array `roles` counts as absent, so an
// unexpected shape never costs the user record itself.
fn deserialize_roles<'de, D>(deserializer: D) -> Result<Option<Vec<RoleId>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Login form fields posted to the backend.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            remember: None,
            extra: Map::new(),
        }
    }

    /// Ask the backend for a long-lived session.
    #[must_use]
    pub fn remember(mut self, remember: bool) -> Self {
        self.remember = Some(remember);
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("remember", &self.remember)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Session state owned by a guard client.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_loading: bool,
    pub error: Option<GuardError>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A credentialed request relative to the configured API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Status and decoded body of a response.
///
/// An empty body decodes to `Value::Null`, a body that is not JSON to
/// `Value::String`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub data: Value,
}

impl TransportResponse {
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    pub fn ok(data: Value) -> Self {
        Self::new(200, data)
    }

    pub fn empty(status: u16) -> Self {
        Self::new(status, Value::Null)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into `GuardError::Status`.
    pub fn error_for_status(self) -> Result<Self, GuardError> {
        if self.is_success() {
            Ok(self)
        } else {
            let body = match &self.data {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Err(GuardError::Status {
                status: self.status,
                body,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("guard client not initialized; create one at application start")]
    NotInitialized,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    Url(String),
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::Decode(err.to_string())
    }
}

impl GuardError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GuardError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// HTTP seam between the guard client and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, GuardError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, GuardError> {
        (**self).send(request).await
    }
}

/// Builds the transport a guard client talks through.
pub trait TransportFactory: Send + Sync {
    fn build(&self, config: &GuardConfig) -> Result<Arc<dyn Transport>, GuardError>;
}

/// Host-side navigation used by redirects.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> Route;
    /// Client-side route change.
    fn push(&self, target: &str);
    /// Full page navigation.
    fn assign(&self, target: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_keeps_unknown_fields() {
        let user = User::from_value(json!({"id": 7, "email": "a@b.c", "roles": ["admin"]})).unwrap();
        assert_eq!(user.roles(), Some(&["admin".to_string()][..]));
        assert_eq!(user.id().as_deref(), Some("7"));
        assert_eq!(user.email(), Some("a@b.c"));
    }

    #[test]
    fn numeric_roles_become_strings() {
        let user = User::from_value(json!({"roles": [1, "editor"]})).unwrap();
        assert_eq!(user.roles().unwrap(), ["1", "editor"]);
    }

    #[test]
    fn missing_and_null_roles_are_none() {
        assert!(User::from_value(json!({"id": 1})).unwrap().roles.is_none());
        assert!(User::from_value(json!({"roles": null})).unwrap().roles.is_none());
    }

    #[test]
    fn non_object_user_is_rejected() {
        assert!(matches!(User::from_value(Value::Null), Err(GuardError::Decode(_))));
        assert!(matches!(User::from_value(json!([1, 2])), Err(GuardError::Decode(_))));
    }

    #[test]
    fn unexpected_role_shapes_keep_the_user() {
        let user = User::from_value(json!({
            "id": 1,
            "roles": [{"id": 1, "name": "admin"}, "editor", 3, null],
        }))
        .unwrap();
        assert_eq!(user.roles().unwrap(), ["editor", "3"]);
        assert_eq!(user.id().as_deref(), Some("1"));

        let scalar = User::from_value(json!({"id": 2, "roles": "admin"})).unwrap();
        assert!(scalar.roles().is_none());
        assert_eq!(scalar.id().as_deref(), Some("2"));
    }

    #[test]
    fn error_for_status_keeps_body() {
        let err = TransportResponse::new(403, json!({"message": "Forbidden"}))
            .error_for_status()
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("Forbidden"));
        assert!(TransportResponse::empty(204).error_for_status().is_ok());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: GuardConfig = serde_json::from_value(json!({"mode": "mpa"})).unwrap();
        assert_eq!(cfg.mode, GuardMode::Mpa);
        assert_eq!(cfg.redirects.on_fail, "/login");
        assert_eq!(cfg.request_timeout_ms, 10_000);
        assert_eq!("SPA".parse::<GuardMode>().unwrap(), GuardMode::Spa);
        assert!("desktop".parse::<GuardMode>().is_err());
    }

    #[test]
    fn credentials_serialize_flat() {
        let mut creds = Credentials::new("a@b.c", "secret");
        creds.extra.insert("device".to_string(), json!("cli"));
        let v = serde_json::to_value(&creds).unwrap();
        assert_eq!(v, json!({"email": "a@b.c", "password": "secret", "device": "cli"}));
        assert!(!format!("{creds:?}").contains("secret"));

        let v = serde_json::to_value(Credentials::new("a@b.c", "pw").remember(true)).unwrap();
        assert_eq!(v["remember"], json!(true));
    }
}
