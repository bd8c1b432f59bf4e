// # reqwest Transport
//
// `Transport` implementation backed by `reqwest`.
//
// ## Behaviour
//
// - One HTTP request per `execute` call. Retries on 401 are owned by `NicClient`.
// - Timeout from `NicConfig::timeout()` (default 600 seconds).
// - Form bodies are sent as `application/x-www-form-urlencoded`,
//   XML bodies as `text/xml; charset=utf-8`.
// - Every status is returned as an `HttpResponse`; only failures to get a
//   response at all become `Error::Transport`.
//
// ## Security
//
// Bearer tokens and form fields are never logged. Log lines carry the method,
// the URL and the status only.

use async_trait::async_trait;
use nicdns_core::traits::{Body, HttpRequest, HttpResponse, Method, Transport};
use nicdns_core::{Error, NicConfig, Result};
use std::time::Duration;

/// User-Agent sent with every request
const USER_AGENT: &str = concat!("nicdns/", env!("CARGO_PKG_VERSION"));

/// reqwest-based transport
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Create a transport using the timeout of `config`
    pub fn from_config(config: &NicConfig) -> Result<Self> {
        Self::new(config.timeout())
    }

    /// Configured request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        match request.body {
            Some(Body::Form(fields)) => builder.form(&fields),
            Some(Body::Xml(xml)) => builder
                .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
                .body(xml),
            None => builder,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();

        let response = self.build(request).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::transport(format!("{} {} timed out after {:?}", method, url, self.timeout))
            } else {
                Error::transport(format!("{} {} failed: {}", method, url, e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response of {} {}: {}", method, url, e)))?;

        tracing::debug!("{} {} -> {}", method, url, status);
        Ok(HttpResponse::new(status, body))
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, capture the raw request, answer with `status` and `body`
    async fn serve_once(status: u16, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_form_request_with_bearer() {
        let (url, server) = serve_once(200, r#"{"access_token":"x"}"#).await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let request = HttpRequest::new(Method::Post, format!("{}/oauth/token", url))
            .with_bearer("bearer-value")
            .with_body(Body::Form(vec![
                ("grant_type".to_string(), "password".to_string()),
                ("username".to_string(), "123/NIC-D".to_string()),
            ]));
        let response = transport.execute(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"access_token":"x"}"#);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /oauth/token HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer bearer-value"));
        assert!(raw.to_ascii_lowercase().contains("application/x-www-form-urlencoded"));
        assert!(raw.contains("grant_type=password&username=123%2FNIC-D"));
    }

    #[tokio::test]
    async fn test_xml_body_and_error_status_passthrough() {
        let (url, server) = serve_once(
            404,
            "<response><status>fail</status></response>",
        )
        .await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let request = HttpRequest::new(Method::Put, format!("{}/dns-master/records", url))
            .with_body(Body::Xml("<request/>".to_string()));
        let response = transport.execute(request).await.unwrap();

        assert_eq!(response.status, 404);
        assert!(response.body.contains("fail"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("PUT /dns-master/records HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("content-type: text/xml; charset=utf-8"));
        assert!(raw.ends_with("<request/>"));
        assert!(!raw.to_ascii_lowercase().contains("authorization"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .execute(HttpRequest::new(Method::Get, format!("http://{}/", addr)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_config_uses_configured_timeout() {
        let mut config = NicConfig::new("app", "secret");
        config.timeout_secs = 42;

        let transport = ReqwestTransport::from_config(&config).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(42));
        assert_eq!(transport.name(), "reqwest");
    }

    #[test]
    fn test_debug_output() {
        let transport = ReqwestTransport::new(Duration::from_secs(1)).unwrap();
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("ReqwestTransport"));
    }
}
