// # NIC.RU DNS-master Real Environment Validation Tool
//
// Exercises the client against the real API in a controlled way.
//
// ## Usage
//
// ```bash
// # Read-only mode (default - safe)
// NICDNS_CLIENT_ID=app-id \
// NICDNS_CLIENT_SECRET=app-secret \
// NICDNS_USERNAME=123/NIC-D \
// NICDNS_PASSWORD=secret \
// NICDNS_SERVICE=MYSERVICE \
// NICDNS_ZONE=example.ru \
// cargo run --bin live_validation
//
// # Stage mode: additionally stages a TXT record, then rolls it back
// NICDNS_MODE=stage ... cargo run --bin live_validation
// ```
//
// Stage mode never commits. Note that rollback discards every pending change
// of the zone, including changes staged elsewhere.

use nicdns_core::{DnsRecord, NicClient, NicConfig};
use nicdns_http::ReqwestTransport;
use std::env;
use std::sync::Arc;

fn required(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        tracing::error!("{} environment variable is required", name);
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("=== NIC.RU DNS-master Real Environment Validation ===");

    let mut config = NicConfig::new(required("NICDNS_CLIENT_ID"), required("NICDNS_CLIENT_SECRET"))
        .with_credentials(required("NICDNS_USERNAME"), required("NICDNS_PASSWORD"))
        .with_defaults(env::var("NICDNS_SERVICE").ok(), env::var("NICDNS_ZONE").ok());
    config.scope = env::var("NICDNS_SCOPE").ok();
    let stage = env::var("NICDNS_MODE").map(|m| m == "stage").unwrap_or(false);

    let transport = Arc::new(ReqwestTransport::from_config(&config)?);
    let client = NicClient::new(config, transport)?;

    let token = client.fetch_token().await?;
    tracing::info!("✓ Token obtained (expires at {:?})", token.expires_at);

    let services = client.services().await?;
    tracing::info!("✓ {} service(s)", services.len());
    for service in &services {
        tracing::info!("  {} ({}), {} zone(s)", service.name, service.tariff, service.domains_num);
    }

    let zones = client.zones(None).await?;
    tracing::info!("✓ {} zone(s)", zones.len());

    if client.config().default_zone.is_none() {
        tracing::info!("NICDNS_ZONE not set, skipping record checks");
        return Ok(());
    }

    let records = client.records(None, None).await?;
    tracing::info!("✓ {} record(s)", records.len());
    for record in records.iter().take(10) {
        tracing::info!("  {}", record);
    }

    if !stage {
        tracing::info!("Read-only mode, done");
        return Ok(());
    }

    tracing::warn!(
        "Stage mode ends with a rollback, which discards every pending change of the zone, \
         including changes staged by other clients"
    );

    let marker = DnsRecord::txt("_nicdns-validation", "staged by live_validation").with_ttl(300);
    let added = client.add_record(&marker, None, None).await?;
    tracing::info!("✓ Staged {} record(s): {}", added.len(), marker);

    client.rollback(None, None).await?;
    tracing::info!("✓ Rolled back pending changes");

    Ok(())
}
