//! Minimal embedding example for nicdns-core
//!
//! Drives `NicClient` against an in-process stand-in for the DNS-master API,
//! so it runs without credentials or network access. The stand-in rejects the
//! first bearer token to show the one-refresh-one-retry behaviour.

use async_trait::async_trait;
use nicdns_core::traits::{Body, HttpRequest, HttpResponse, Method, Transport};
use nicdns_core::{DnsRecord, MemoryTokenStore, NicClient, NicConfig, Result, Token, TokenStore};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const ZONE: &str = "example.ru";

/// In-process DNS-master
#[derive(Default)]
struct FakeDnsMaster {
    tokens_issued: AtomicUsize,
    next_id: AtomicUsize,
    staged: Mutex<Vec<String>>,
    published: Mutex<Vec<String>>,
}

impl FakeDnsMaster {
    fn current_bearer(&self) -> String {
        format!("access-{}", self.tokens_issued.load(Ordering::SeqCst))
    }

    fn envelope(data: &str) -> HttpResponse {
        HttpResponse::new(
            200,
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\
                 <response><status>success</status><data>{}</data></response>",
                data
            ),
        )
    }

    /// Give every `<rr>` of an `<rr-list>` an id
    fn assign_ids(&self, body: &str) -> Vec<String> {
        body.split("<rr>")
            .skip(1)
            .filter_map(|chunk| chunk.split_once("</rr>"))
            .map(|(inner, _)| {
                let id = 1000 + self.next_id.fetch_add(1, Ordering::SeqCst);
                format!("<rr id=\"{}\">{}</rr>", id, inner)
            })
            .collect()
    }
}

#[async_trait]
impl Transport for FakeDnsMaster {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        if request.url.ends_with("/oauth/token") {
            let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
            println!("[DNS-master] issuing token #{}", n);
            return Ok(HttpResponse::new(
                200,
                format!(
                    r#"{{"access_token":"access-{}","token_type":"Bearer","expires_in":14400,"refresh_token":"refresh-{}"}}"#,
                    n, n
                ),
            ));
        }

        if request.bearer.as_deref() != Some(self.current_bearer().as_str()) {
            println!("[DNS-master] 401 for {} {}", request.method, request.url);
            return Ok(HttpResponse::new(401, r#"{"error":"invalid_token"}"#));
        }

        println!("[DNS-master] {} {}", request.method, request.url);
        let zone_open = format!("<zone name=\"{}\" service=\"DEMO\">", ZONE);

        let response = match (request.method, request.body) {
            (Method::Put, Some(Body::Xml(body))) => {
                let added = self.assign_ids(&body);
                self.staged.lock().unwrap_or_else(|e| e.into_inner()).extend(added.clone());
                Self::envelope(&format!("{}{}</zone>", zone_open, added.concat()))
            }
            (Method::Post, _) if request.url.ends_with("/commit") => {
                let staged: Vec<String> =
                    self.staged.lock().unwrap_or_else(|e| e.into_inner()).drain(..).collect();
                self.published.lock().unwrap_or_else(|e| e.into_inner()).extend(staged);
                Self::envelope("")
            }
            (Method::Get, _) if request.url.ends_with("/records") => {
                let published = self.published.lock().unwrap_or_else(|e| e.into_inner()).concat();
                Self::envelope(&format!("{}{}</zone>", zone_open, published))
            }
            _ => HttpResponse::new(404, "not found"),
        };
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "fake-dns-master"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded nicdns-core Example ===\n");

    let dns_master = Arc::new(FakeDnsMaster::default());
    let store = Arc::new(MemoryTokenStore::new());

    let config = NicConfig::new("demo-app", "demo-secret")
        .with_base_url("https://dns-master.invalid")
        .with_credentials("123/NIC-D", "demo-password")
        .with_defaults(Some("DEMO".to_string()), Some(ZONE.to_string()));

    // A token saved by an earlier run; the server no longer accepts it
    let stale = Token::new("stale-token").with_refresh_token("refresh-0");

    println!("1. Creating client with a stale token...");
    let client = NicClient::new(config, dns_master.clone())?
        .with_token(stale)
        .with_token_store(store.clone())
        .with_token_updater(|token| {
            println!("[Updater] new token, expires at {:?}", token.expires_at);
        });

    println!("\n2. Staging records (the stale token is renewed once)...");
    let added = client
        .add_records(
            &[
                DnsRecord::a("www", Ipv4Addr::new(192, 0, 2, 10)).with_ttl(600),
                DnsRecord::txt("_acme-challenge", "demo-challenge"),
            ],
            None,
            None,
        )
        .await?;
    for record in &added {
        println!("   staged #{:?}: {}", record.id, record);
    }

    println!("\n3. Records before commit:");
    println!("   {} published", client.records(None, None).await?.len());

    println!("\n4. Committing...");
    client.commit(None, None).await?;

    println!("\n5. Records after commit:");
    for record in client.records(None, None).await? {
        println!("   #{:?} {}", record.id, record);
    }

    let saved = store.load().await?.map(|t| t.expires_at);
    println!("\n6. Token store holds a token expiring at {:?}", saved);

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- The HTTP stack is pluggable through the Transport trait");
    println!("- A rejected token is renewed once and the call retried once");
    println!("- Nothing is published until commit");

    Ok(())
}
