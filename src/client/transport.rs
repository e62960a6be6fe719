//! HTTP transport for the Robot webservice.
//!
//! [`Transport`] is the only place that touches the network. The production
//! implementation, [`HttpTransport`], sends requests with `reqwest` and basic
//! auth; tests substitute [`crate::testing::MockTransport`].

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

/// Ordered `application/x-www-form-urlencoded` fields.
///
/// Keys may repeat (`server[]`, `authorized_key`), so this is a list rather than a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form(Vec<(String, String)>);

impl Form {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Append a field only when `value` is non-empty.
    pub fn field_if_present(self, key: impl Into<String>, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.field(key, value)
        }
    }

    /// Append a field in place.
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.push((key.into(), value.to_string()));
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The fields in insertion order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// Whether the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Body of a Robot request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// Form-encoded body.
    Form(Form),
    /// JSON body.
    Json(Value),
}

/// A request relative to the webservice base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path starting with `/`, e.g. `/vswitch/4711`.
    pub path: String,
    /// Request body.
    pub body: RequestBody,
}

impl ApiRequest {
    /// The form body, if this request carries one.
    pub fn form(&self) -> Option<&Form> {
        match &self.body {
            RequestBody::Form(form) => Some(form),
            _ => None,
        }
    }
}

/// Raw webservice response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response body as text.
    pub body: String,
}

impl ApiResponse {
    /// Build a response from a status code and body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends requests to the Robot webservice.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send a single request and return the raw response, whatever its status.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ProviderError>;
}

/// [`Transport`] over HTTPS with basic auth.
pub struct HttpTransport {
    client: reqwest::Client,
    username: String,
    password: String,
    base_url: String,
}

impl HttpTransport {
    /// Request timeout for a single webservice call.
    pub const TIMEOUT: Duration = Duration::from_secs(60);

    /// Build a transport for the configured endpoint and credentials.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hetzner-robot-provider/", env!("CARGO_PKG_VERSION")))
            .timeout(Self::TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
            base_url: config.url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ProviderError> {
        let url = format!("{}{}", self.base_url, request.path);
        let builder = self
            .client
            .request(request.method.clone(), &url)
            .basic_auth(&self.username, Some(&self.password));

        let builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(form) => builder.form(form.pairs()),
            RequestBody::Json(value) => builder.json(value),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}


#[cfg(test)]
mod http_tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::{ApiRequest, Form, HttpTransport, RequestBody, Transport};
    use crate::config::ProviderConfig;

    // base64("robot:secret")
    const AUTHORIZATION: &str = "Basic cm9ib3Q6c2VjcmV0";

    fn transport(server: &MockServer) -> HttpTransport {
        let config = ProviderConfig::resolve(
            &json!({"username": "robot", "password": "secret", "url": server.base_url()}),
            |_| None,
        )
        .unwrap();
        HttpTransport::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_form_body_with_basic_auth() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/vswitch")
                    .header("authorization", AUTHORIZATION)
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body("name=backend&vlan=4000");
                then.status(201).body(r#"{"id":4711}"#);
            })
            .await;

        let request = ApiRequest {
            method: reqwest::Method::POST,
            path: "/vswitch".to_string(),
            body: RequestBody::Form(Form::new().field("name", "backend").field("vlan", 4000)),
        };
        let response = transport(&server).send(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, reqwest::StatusCode::CREATED);
        assert_eq!(response.body, r#"{"id":4711}"#);
    }

    #[tokio::test]
    async fn test_delete_with_repeated_form_keys() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/vswitch/4711/server")
                    .header("authorization", AUTHORIZATION)
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body("server%5B%5D=1&server%5B%5D=2");
                then.status(202);
            })
            .await;

        let request = ApiRequest {
            method: reqwest::Method::DELETE,
            path: "/vswitch/4711/server".to_string(),
            body: RequestBody::Form(Form::new().field("server[]", 1).field("server[]", 2)),
        };
        let response = transport(&server).send(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, reqwest::StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_json_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/server/321")
                    .header("authorization", AUTHORIZATION)
                    .header("content-type", "application/json")
                    .json_body(json!({"server_name": "web-1"}));
                then.status(200).body(r#"{"server":{"server_number":321}}"#);
            })
            .await;

        let request = ApiRequest {
            method: reqwest::Method::POST,
            path: "/server/321".to_string(),
            body: RequestBody::Json(json!({"server_name": "web-1"})),
        };
        let response = transport(&server).send(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/boot/999")
                    .header("authorization", AUTHORIZATION);
                then.status(404)
                    .body(r#"{"error":{"status":404,"code":"SERVER_NOT_FOUND","message":"Server not found"}}"#);
            })
            .await;

        let request = ApiRequest {
            method: reqwest::Method::GET,
            path: "/boot/999".to_string(),
            body: RequestBody::Empty,
        };
        let response = transport(&server).send(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, reqwest::StatusCode::NOT_FOUND);
        assert!(response.body.contains("SERVER_NOT_FOUND"));
    }
}
