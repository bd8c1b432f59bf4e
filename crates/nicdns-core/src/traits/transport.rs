// # Transport Trait
//
// Defines the seam between the client and the HTTP stack.
//
// ## Implementations
//
// - reqwest: `nicdns-http` crate
// - Tests: scripted in-memory transports (see `tests/common`)
//
// ## Usage
//
// ```rust,ignore
// use nicdns_core::traits::{Body, HttpRequest, Method, Transport};
//
// let response = transport
//     .execute(HttpRequest::new(Method::Get, url).with_bearer(token))
//     .await?;
// ```

use async_trait::async_trait;

/// HTTP method subset used by the DNS-master API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body
#[derive(Clone, PartialEq, Eq)]
pub enum Body {
    /// `application/x-www-form-urlencoded` fields
    Form(Vec<(String, String)>),
    /// XML document
    Xml(String),
}

// Form bodies carry passwords and refresh tokens
impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Form(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, _)| (k, "<REDACTED>")))
                .finish(),
            Body::Xml(xml) => f.debug_tuple("Xml").field(xml).finish(),
        }
    }
}

/// Outgoing request
#[derive(Clone)]
pub struct HttpRequest {
    /// Method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Bearer token for the `Authorization` header
    pub bearer: Option<String>,
    /// Optional body
    pub body: Option<Body>,
}

impl HttpRequest {
    /// Create a request without auth or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            bearer: None,
            body: None,
        }
    }

    /// Attach a bearer token
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Attach a body
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a form field (tests and logging of non-secret fields)
    pub fn form_field(&self, key: &str) -> Option<&str> {
        match &self.body {
            Some(Body::Form(fields)) => fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("bearer", &self.bearer.as_ref().map(|_| "<REDACTED>"))
            .field("body", &self.body)
            .finish()
    }
}

/// Response as seen by the client: status and full body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Body text
    pub body: String,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 401: the bearer token was rejected
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Trait for HTTP transport implementations
///
/// A transport executes exactly one request per call. It does not retry,
/// refresh tokens or interpret bodies; all of that is owned by the client.
///
/// # Errors
///
/// Return `Error::Transport` when no response was received. Any response,
/// whatever its status, is returned as `Ok(HttpResponse)`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a single request
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, crate::Error>;

    /// Transport name (for logging/debugging)
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_secrets_not_exposed_in_debug() {
        let request = HttpRequest::new(Method::Post, "https://api.nic.ru/oauth/token")
            .with_bearer("bearer_secret")
            .with_body(Body::Form(vec![
                ("grant_type".to_string(), "password".to_string()),
                ("password".to_string(), "pa55word".to_string()),
            ]));

        let debug_str = format!("{:?}", request);
        assert!(!debug_str.contains("pa55word"));
        assert!(!debug_str.contains("bearer_secret"));
        assert!(debug_str.contains("grant_type"));
        assert_eq!(request.form_field("grant_type"), Some("password"));
        assert_eq!(request.form_field("missing"), None);
    }

    #[test]
    fn test_status_helpers() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
        assert!(HttpResponse::new(401, "").is_unauthorized());
    }
}
