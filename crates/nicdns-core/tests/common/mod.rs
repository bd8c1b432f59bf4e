//! Test doubles and common utilities for client contract tests
//!
//! The scripted transport answers requests from a queue and records every
//! request, so tests can assert exactly what went over the wire.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use nicdns_core::traits::{HttpRequest, HttpResponse, Transport};
use nicdns_core::{Error, NicConfig, Result, Token};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const BASE_URL: &str = "https://api.test.invalid";
pub const TOKEN_URL: &str = "https://api.test.invalid/oauth/token";

/// A transport that replays queued responses
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    call_count: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        })
    }

    /// Number of requests executed
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// All recorded requests
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent to the token endpoint
    pub fn token_requests(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == TOKEN_URL)
            .collect()
    }

    /// Requests sent to DNS-master endpoints
    pub fn api_requests(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url != TOKEN_URL)
            .collect()
    }

    /// Responses not consumed yet
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::transport("scripted transport ran out of responses"))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Configuration pointing at the scripted transport
pub fn test_config() -> NicConfig {
    NicConfig::new("test-app", "test-secret").with_base_url(BASE_URL)
}

/// Configuration with password credentials and defaults
pub fn full_config() -> NicConfig {
    test_config()
        .with_credentials("123/NIC-D", "password")
        .with_defaults(Some("MYSERVICE".to_string()), Some("example.ru".to_string()))
}

/// A token valid for the next hour
pub fn fresh_token(access: &str) -> Token {
    Token::new(access)
        .with_refresh_token(format!("{}-refresh", access))
        .with_expires_at(Utc::now() + Duration::seconds(3600))
}

/// A token that expired a minute ago
pub fn expired_token(access: &str, refresh: Option<&str>) -> Token {
    let token = Token::new(access).with_expires_at(Utc::now() - Duration::seconds(60));
    match refresh {
        Some(refresh) => token.with_refresh_token(refresh),
        None => token,
    }
}

/// Successful token endpoint response
pub fn token_response(access: &str, refresh: &str) -> HttpResponse {
    HttpResponse::new(
        200,
        format!(
            r#"{{"access_token":"{}","token_type":"Bearer","expires_in":14400,"refresh_token":"{}"}}"#,
            access, refresh
        ),
    )
}

/// Successful envelope around `data`
pub fn envelope(data: &str) -> HttpResponse {
    HttpResponse::new(
        200,
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" ?>
<response>
    <status>success</status>
    <data>{}</data>
</response>"#,
            data
        ),
    )
}

/// Successful envelope without data
pub fn empty_success() -> HttpResponse {
    HttpResponse::new(
        200,
        r#"<?xml version="1.0" encoding="UTF-8" ?><response><status>success</status></response>"#,
    )
}

/// Failed envelope
pub fn failure(status: u16, code: &str, message: &str) -> HttpResponse {
    HttpResponse::new(
        status,
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" ?>
<response>
    <status>fail</status>
    <errors><error code="{}">{}</error></errors>
</response>"#,
            code, message
        ),
    )
}

/// 401 as sent for an expired or revoked bearer token
pub fn unauthorized() -> HttpResponse {
    HttpResponse::new(401, r#"{"error":"invalid_token"}"#)
}

/// `<data>` of a records listing for `zone`
pub fn records_data(zone: &str) -> String {
    format!(
        r#"<zone admin="123/NIC-REG" enable="true" has-changes="false"
            has-primary="true" id="227642" idn-name="{zone}" name="{zone}"
            payer="123/NIC-REG" service="MYSERVICE">
            <rr id="210074">
                <name>@</name>
                <idn-name>@</idn-name>
                <type>SOA</type>
                <soa>
                    <mname><name>ns3-l2.nic.ru.</name></mname>
                    <rname><name>dns.nic.ru.</name></rname>
                    <serial>2011112002</serial>
                    <refresh>1440</refresh>
                    <retry>3600</retry>
                    <expire>2592000</expire>
                    <minimum>600</minimum>
                </soa>
            </rr>
            <rr id="210075">
                <name>www</name>
                <idn-name>www</idn-name>
                <ttl>3600</ttl>
                <type>A</type>
                <a>192.0.2.10</a>
            </rr>
        </zone>"#
    )
}
