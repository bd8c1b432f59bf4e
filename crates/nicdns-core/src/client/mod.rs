// # DNS-master Client
//
// Typed access to the NIC.RU DNS-master REST API.
//
// ## API Reference
//
// - List services: GET `/dns-master/services`
// - List zones: GET `/dns-master/services/:service/zones` (or `/dns-master/zones`)
// - Zone file: GET `/dns-master/services/:service/zones/:zone`
// - List records: GET `/dns-master/services/:service/zones/:zone/records`
// - Add records: PUT `/dns-master/services/:service/zones/:zone/records`
// - Delete record: DELETE `/dns-master/services/:service/zones/:zone/records/:id`
// - Commit: POST `/dns-master/services/:service/zones/:zone/commit`
// - Rollback: POST `/dns-master/services/:service/zones/:zone/rollback`
//
// ## Staged changes
//
// Adding and deleting records only stages the change on the server. Nothing
// is published until `commit` is called for the same (service, zone), and
// `commit` publishes **every** pending change in that zone, including changes
// staged by other API clients or the web interface.
//
// ## Authentication
//
// Each call asks the `TokenManager` for a valid token. If the server still
// answers 401 the token is renewed and the call is retried exactly once; a
// second 401 is returned as `Error::Authentication`.

mod envelope;

use std::sync::Arc;

use crate::auth::{Token, TokenManager};
use crate::config::NicConfig;
use crate::models::{DnsRecord, Service, Zone};
use crate::traits::{Body, HttpRequest, HttpResponse, Method, TokenStore, Transport};
use crate::xml::{Element, XmlWriter};
use crate::{Error, Result};
use envelope::Envelope;

/// NIC.RU DNS-master API client
///
/// # Example
///
/// ```rust,ignore
/// use nicdns_core::{DnsRecord, NicClient, NicConfig};
///
/// let config = NicConfig::new("app-id", "app-secret")
///     .with_credentials("123/NIC-D", "password")
///     .with_defaults(Some("MYSERVICE".into()), Some("example.ru".into()));
/// let client = NicClient::new(config, transport)?;
///
/// client.fetch_token().await?;
/// client.add_record(&DnsRecord::a("www", "192.0.2.1".parse()?), None, None).await?;
/// client.commit(None, None).await?;
/// ```
pub struct NicClient {
    config: Arc<NicConfig>,
    transport: Arc<dyn Transport>,
    tokens: TokenManager,
}

impl std::fmt::Debug for NicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NicClient")
            .field("config", &self.config)
            .field("transport", &self.transport.name())
            .field("tokens", &self.tokens)
            .finish()
    }
}

impl NicClient {
    /// Create a client
    ///
    /// Fails with `Error::Config` if the configuration is invalid.
    pub fn new(config: NicConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let tokens = TokenManager::new(Arc::clone(&config), Arc::clone(&transport));
        Ok(Self {
            config,
            transport,
            tokens,
        })
    }

    /// Start from a previously obtained token
    pub fn with_token(mut self, token: Token) -> Self {
        self.tokens = self.tokens.with_token(token);
        self
    }

    /// Persist every new token to `store`
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.tokens = self.tokens.with_store(store);
        self
    }

    /// Invoke `updater` with every new token
    pub fn with_token_updater<F>(mut self, updater: F) -> Self
    where
        F: Fn(&Token) + Send + Sync + 'static,
    {
        self.tokens = self.tokens.with_updater(updater);
        self
    }

    /// Client configuration
    pub fn config(&self) -> &NicConfig {
        &self.config
    }

    /// Token manager
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Obtain a token with the password grant
    pub async fn fetch_token(&self) -> Result<Token> {
        self.tokens.fetch_token().await
    }

    /// Services available for management
    pub async fn services(&self) -> Result<Vec<Service>> {
        let data = self.request_data(Method::Get, "/services", None).await?;
        children(data.as_ref(), "service")
            .into_iter()
            .map(Service::from_xml)
            .collect()
    }

    /// Zones of a service, or of the whole account when no service is given or configured
    pub async fn zones(&self, service: Option<&str>) -> Result<Vec<Zone>> {
        let path = match service.or(self.config.default_service.as_deref()) {
            Some(service) => format!("/services/{}/zones", segment("service", service)?),
            None => "/zones".to_string(),
        };
        let data = self.request_data(Method::Get, &path, None).await?;
        children(data.as_ref(), "zone")
            .into_iter()
            .map(Zone::from_xml)
            .collect()
    }

    /// Zone file of a zone, as text
    pub async fn zonefile(&self, service: Option<&str>, zone: Option<&str>) -> Result<String> {
        let path = self.zone_path(service, zone)?;
        let response = self.send(Method::Get, &path, None).await?;
        if !response.is_success() {
            return Err(Error::http(response.status, response.body));
        }
        Ok(response.body)
    }

    /// All records of a zone
    pub async fn records(
        &self,
        service: Option<&str>,
        zone: Option<&str>,
    ) -> Result<Vec<DnsRecord>> {
        let zone_name = self.zone_name(zone)?;
        let path = format!("{}/records", self.zone_path(service, Some(zone_name))?);

        let data = self
            .request_data(Method::Get, &path, None)
            .await?
            .ok_or_else(|| Error::invalid_response("Can't find <data> in records response"))?;

        let zone_element = data
            .find("zone")
            .ok_or_else(|| Error::invalid_response("Can't find <zone> in records response"))?;
        let returned = zone_element.attr("name").unwrap_or_default();
        if !same_zone(returned, zone_name) {
            return Err(Error::invalid_response(format!(
                "requested zone '{}' but server returned '{}'",
                zone_name, returned
            )));
        }

        zone_element
            .find_all("rr")
            .into_iter()
            .map(DnsRecord::from_xml)
            .collect()
    }

    /// Stage new records in a zone
    ///
    /// Only A, AAAA, CNAME and TXT records can be added. The records are not
    /// published until [`commit`](Self::commit) is called, and commit
    /// publishes all pending changes of the zone, not only these.
    ///
    /// Returns the records as echoed by the server (with ids), which may be empty.
    pub async fn add_records(
        &self,
        records: &[DnsRecord],
        service: Option<&str>,
        zone: Option<&str>,
    ) -> Result<Vec<DnsRecord>> {
        if records.is_empty() {
            return Err(Error::invalid_input("no records to add"));
        }

        let path = format!("{}/records", self.zone_path(service, zone)?);

        let mut rr_list = XmlWriter::fragment();
        for record in records {
            if !record.record_type().is_addable() {
                return Err(Error::invalid_input(format!(
                    "{} records cannot be added: {}",
                    record.record_type(),
                    record
                )));
            }
            let rr = record.to_xml();
            tracing::debug!("Prepared for addition on {}: {}", path, rr);
            rr_list.raw(&rr);
        }

        let mut document = XmlWriter::document();
        document
            .open("request", &[])
            .open("rr-list", &[])
            .raw(&rr_list.finish())
            .close("rr-list")
            .close("request");

        let data = self
            .request_data(Method::Put, &path, Some(Body::Xml(document.finish())))
            .await?;

        let added = match &data {
            Some(data) => data
                .find_all("zone/rr")
                .into_iter()
                .chain(data.find_all("rr"))
                .map(DnsRecord::from_xml)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        tracing::debug!("Successfully added {} records", records.len());
        Ok(added)
    }

    /// Stage a single new record; see [`add_records`](Self::add_records)
    pub async fn add_record(
        &self,
        record: &DnsRecord,
        service: Option<&str>,
        zone: Option<&str>,
    ) -> Result<Vec<DnsRecord>> {
        self.add_records(std::slice::from_ref(record), service, zone)
            .await
    }

    /// Stage deletion of a record by id
    ///
    /// Not published until [`commit`](Self::commit) is called, and commit
    /// publishes all pending changes of the zone, not only this deletion.
    pub async fn delete_record(
        &self,
        record_id: u64,
        service: Option<&str>,
        zone: Option<&str>,
    ) -> Result<()> {
        if record_id == 0 {
            return Err(Error::invalid_input("Invalid record ID: 0"));
        }

        let path = format!("{}/records/{}", self.zone_path(service, zone)?, record_id);
        tracing::debug!("Deleting record #{} via {}", record_id, path);

        self.request_data(Method::Delete, &path, None).await?;

        tracing::debug!("Record #{} deleted", record_id);
        Ok(())
    }

    /// Publish all pending changes of a zone
    ///
    /// ⚠️ This applies every staged change in the zone, including changes made
    /// by other clients, not only the ones made through this client.
    pub async fn commit(&self, service: Option<&str>, zone: Option<&str>) -> Result<()> {
        let path = format!("{}/commit", self.zone_path(service, zone)?);
        self.request_data(Method::Post, &path, None).await?;
        tracing::info!("Changes committed: {}", path);
        Ok(())
    }

    /// Discard all pending changes of a zone
    pub async fn rollback(&self, service: Option<&str>, zone: Option<&str>) -> Result<()> {
        let path = format!("{}/rollback", self.zone_path(service, zone)?);
        self.request_data(Method::Post, &path, None).await?;
        tracing::info!("Changes rolled back: {}", path);
        Ok(())
    }

    fn service_name<'a>(&'a self, service: Option<&'a str>) -> Result<&'a str> {
        service
            .or(self.config.default_service.as_deref())
            .ok_or_else(|| Error::config("no service given and no default_service configured"))
    }

    fn zone_name<'a>(&'a self, zone: Option<&'a str>) -> Result<&'a str> {
        zone.or(self.config.default_zone.as_deref())
            .ok_or_else(|| Error::config("no zone given and no default_zone configured"))
    }

    fn zone_path(&self, service: Option<&str>, zone: Option<&str>) -> Result<String> {
        Ok(format!(
            "/services/{}/zones/{}",
            segment("service", self.service_name(service)?)?,
            segment("zone", self.zone_name(zone)?)?
        ))
    }

    /// Authenticated request with one renewal-and-retry on 401
    async fn send(&self, method: Method, path: &str, body: Option<Body>) -> Result<HttpResponse> {
        let url = self.config.api_url(path);
        let build = |token: &str| {
            let request = HttpRequest::new(method, url.clone()).with_bearer(token);
            match &body {
                Some(body) => request.with_body(body.clone()),
                None => request,
            }
        };

        let token = self.tokens.valid_token().await?;
        tracing::debug!("{} {}", method, url);
        let response = self.transport.execute(build(&token)).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        let token = self.tokens.force_refresh(&token).await?;
        tracing::debug!("{} {} (retry with renewed token)", method, url);
        let response = self.transport.execute(build(&token)).await?;
        if response.is_unauthorized() {
            return Err(Error::auth(format!(
                "server rejected the renewed token for {} {}",
                method, path
            )));
        }
        Ok(response)
    }

    /// Request whose body is a `<response>` envelope; returns its `<data>`
    async fn request_data(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
    ) -> Result<Option<Element>> {
        let response = self.send(method, path, body).await?;
        match Envelope::parse(&response.body) {
            Ok(envelope) => envelope.into_data(),
            Err(_) if !response.is_success() => Err(Error::http(response.status, response.body)),
            Err(e) => Err(e),
        }
    }
}

fn children<'a>(data: Option<&'a Element>, name: &str) -> Vec<&'a Element> {
    data.map(|d| d.find_all(name)).unwrap_or_default()
}

fn segment<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() || value.contains(['/', '?', '#', '%']) || value.contains(char::is_whitespace)
    {
        return Err(Error::invalid_input(format!("invalid {} name: '{}'", what, value)));
    }
    Ok(value)
}

fn same_zone(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}
