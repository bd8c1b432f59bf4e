// # nicdnsctl - NIC.RU DNS-master command line client
//
// Thin layer over `nicdns-core`: parses arguments, builds the client,
// runs one operation and prints the result. No API logic lives here.
//
// ## Configuration
//
// Every flag can also be set through the environment:
//
// - `NICDNS_CLIENT_ID` / `NICDNS_CLIENT_SECRET`: OAuth2 application credentials
// - `NICDNS_USERNAME` / `NICDNS_PASSWORD`: account credentials (password grant)
// - `NICDNS_SCOPE`: requested OAuth2 scope
// - `NICDNS_BASE_URL`: API endpoint (default `https://api.nic.ru`)
// - `NICDNS_SERVICE` / `NICDNS_ZONE`: defaults for service and zone arguments
// - `NICDNS_TOKEN_FILE`: file the token is persisted to between runs
// - `NICDNS_TIMEOUT`: HTTP timeout in seconds
// - `NICDNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export NICDNS_CLIENT_ID=app-id
// export NICDNS_CLIENT_SECRET=app-secret
// export NICDNS_USERNAME=123/NIC-D
// export NICDNS_PASSWORD=secret
// export NICDNS_SERVICE=MYSERVICE
// export NICDNS_ZONE=example.ru
// export NICDNS_TOKEN_FILE=~/.config/nicdns/token.json
//
// nicdnsctl add a www 192.0.2.1 --ttl 600
// nicdnsctl commit
// ```
//
// Adding and deleting records only stages the change. `commit` publishes
// every pending change of the zone, including changes made elsewhere.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nicdns_core::{DnsRecord, FileTokenStore, NicClient, NicConfig, RecordData};
use nicdns_http::ReqwestTransport;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes
///
/// - 0: Success
/// - 1: Configuration or usage error
/// - 2: Runtime error (authentication, API, transport)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CtlExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<CtlExitCode> for ExitCode {
    fn from(code: CtlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// NIC.RU DNS-master command line client
#[derive(Parser)]
#[command(name = "nicdnsctl", version, about, long_about = None)]
struct Cli {
    /// OAuth2 application id
    #[arg(long, env = "NICDNS_CLIENT_ID")]
    client_id: String,

    /// OAuth2 application secret
    #[arg(long, env = "NICDNS_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    /// Account login (e.g. 123/NIC-D)
    #[arg(long, env = "NICDNS_USERNAME")]
    username: Option<String>,

    /// Account password
    #[arg(long, env = "NICDNS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Requested OAuth2 scope
    #[arg(long, env = "NICDNS_SCOPE")]
    scope: Option<String>,

    /// API endpoint
    #[arg(long, env = "NICDNS_BASE_URL", default_value = nicdns_core::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Default service
    #[arg(short, long, global = true, env = "NICDNS_SERVICE")]
    service: Option<String>,

    /// Default zone
    #[arg(short, long, global = true, env = "NICDNS_ZONE")]
    zone: Option<String>,

    /// Token file (created if missing)
    #[arg(long, env = "NICDNS_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, env = "NICDNS_TIMEOUT", default_value_t = 600)]
    timeout: u64,

    /// Log level
    #[arg(long, env = "NICDNS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Obtain a token with the password grant (and save it to the token file)
    Login,

    /// List services
    Services,

    /// List zones (of the service, or of the whole account)
    Zones,

    /// List records of the zone
    Records,

    /// Print the zone file
    Zonefile,

    /// Stage a new record
    Add {
        #[command(subcommand)]
        record: AddRecord,

        /// Record TTL in seconds
        #[arg(long, global = true)]
        ttl: Option<u32>,

        /// Commit the zone right after staging
        #[arg(long, global = true)]
        commit: bool,
    },

    /// Stage deletion of a record by id
    Delete {
        /// Record id as shown by `records`
        id: u64,

        /// Commit the zone right after staging
        #[arg(long)]
        commit: bool,
    },

    /// Publish all pending changes of the zone
    Commit,

    /// Discard all pending changes of the zone
    Rollback,
}

#[derive(Subcommand, Debug)]
enum AddRecord {
    /// IPv4 address record
    A { name: String, address: Ipv4Addr },
    /// IPv6 address record
    Aaaa { name: String, address: Ipv6Addr },
    /// Alias record
    Cname { name: String, target: String },
    /// Text record (one or more strings)
    Txt {
        name: String,
        #[arg(required = true)]
        strings: Vec<String>,
    },
}

impl AddRecord {
    fn into_record(self, ttl: Option<u32>) -> DnsRecord {
        let record = match self {
            AddRecord::A { name, address } => DnsRecord::a(name, address),
            AddRecord::Aaaa { name, address } => DnsRecord::aaaa(name, address),
            AddRecord::Cname { name, target } => DnsRecord::cname(name, target),
            AddRecord::Txt { name, strings } => DnsRecord::new(name, RecordData::Txt { strings }),
        };
        match ttl {
            Some(ttl) => record.with_ttl(ttl),
            None => record,
        }
    }
}

impl Cli {
    /// Build the client configuration
    fn to_config(&self) -> NicConfig {
        let mut config = NicConfig::new(&self.client_id, &self.client_secret)
            .with_base_url(&self.base_url)
            .with_defaults(self.service.clone(), self.zone.clone());
        config.username = self.username.clone();
        config.password = self.password.clone();
        config.scope = self.scope.clone();
        config.timeout_secs = self.timeout;
        config.token_path = self.token_file.clone();
        config
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => anyhow::bail!(
                "NICDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                other
            ),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    CtlExitCode::Success.into()
                }
                _ => CtlExitCode::ConfigError.into(),
            };
        }
    };

    let log_level = match cli.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return CtlExitCode::ConfigError.into();
        }
    };

    // Logs go to stderr; stdout carries command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CtlExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CtlExitCode::RuntimeError.into();
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => CtlExitCode::Success.into(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e).into()
        }
    }
}

/// Map a failure to its exit code
fn exit_code_for(e: &anyhow::Error) -> CtlExitCode {
    match e.downcast_ref::<nicdns_core::Error>() {
        Some(nicdns_core::Error::Config(_)) | Some(nicdns_core::Error::InvalidInput(_)) => {
            CtlExitCode::ConfigError
        }
        _ => CtlExitCode::RuntimeError,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.to_config();
    let token_path = config.token_path.clone();
    let transport = Arc::new(ReqwestTransport::from_config(&config)?);
    let mut client = NicClient::new(config, transport)?;

    if let Some(path) = &token_path {
        let store = FileTokenStore::new(path)
            .await
            .with_context(|| format!("failed to open token file {}", path.display()))?;
        client = client.with_token_store(Arc::new(store));
        match client.tokens().restore().await {
            Ok(true) => debug!("Using saved token from {}", path.display()),
            Ok(false) => debug!("No saved token in {}", path.display()),
            Err(e) => warn!("Ignoring unreadable token file {}: {}", path.display(), e),
        }
    }

    let json = cli.json;
    match cli.command {
        Command::Login => {
            let token = client.fetch_token().await?;
            match token.expires_at {
                Some(at) => println!("Logged in, token valid until {}", at),
                None => println!("Logged in"),
            }
        }
        Command::Services => {
            let services = client.services().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&services)?);
            } else {
                for s in services {
                    println!(
                        "{}\t{}\tdomains {}/{}\t{}",
                        s.name,
                        s.tariff,
                        s.domains_num,
                        s.domains_limit,
                        if s.enable { "enabled" } else { "disabled" }
                    );
                }
            }
        }
        Command::Zones => {
            let zones = client.zones(None).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&zones)?);
            } else {
                for z in zones {
                    println!(
                        "{}\t{}\t{}{}",
                        z.id,
                        z.name,
                        z.service,
                        if z.has_changes { "\tuncommitted changes" } else { "" }
                    );
                }
            }
        }
        Command::Records => {
            let records = client.records(None, None).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_records(&records);
            }
        }
        Command::Zonefile => {
            print!("{}", client.zonefile(None, None).await?);
        }
        Command::Add {
            record,
            ttl,
            commit,
        } => {
            let record = record.into_record(ttl);
            let added = client.add_record(&record, None, None).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&added)?);
            } else if added.is_empty() {
                println!("Staged: {}", record);
            } else {
                print_records(&added);
            }
            if commit {
                client.commit(None, None).await?;
                println!("Committed");
            }
        }
        Command::Delete { id, commit } => {
            client.delete_record(id, None, None).await?;
            println!("Staged deletion of record #{}", id);
            if commit {
                client.commit(None, None).await?;
                println!("Committed");
            }
        }
        Command::Commit => {
            client.commit(None, None).await?;
            println!("Committed");
        }
        Command::Rollback => {
            client.rollback(None, None).await?;
            println!("Rolled back");
        }
    }

    Ok(())
}

fn print_records(records: &[DnsRecord]) {
    for r in records {
        match r.id {
            Some(id) => println!("{}\t{}", id, r),
            None => println!("-\t{}", r),
        }
    }
}
