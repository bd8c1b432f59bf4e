use serde::{Deserialize, Serialize};

use super::{attr, parse_bool, parse_number, required_attr};
use crate::Result;
use crate::xml::Element;

/// DNS hosting service of the account
///
/// ```xml
/// <service admin="123/NIC-REG" domains-limit="12" domains-num="5"
///     enable="true" has-primary="false" name="testservice"
///     payer="123/NIC-REG" tariff="Secondary L" rr-limit="1000" rr-num="49"/>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Administrator contract
    pub admin: String,
    /// Maximum number of zones
    pub domains_limit: u32,
    /// Current number of zones
    pub domains_num: u32,
    /// Whether the service is enabled
    pub enable: bool,
    /// Whether the service hosts primary zones
    pub has_primary: bool,
    /// Service name, used in API paths
    pub name: String,
    /// Paying contract
    pub payer: String,
    /// Tariff plan
    pub tariff: String,
    /// Maximum number of records, when limited
    pub rr_limit: Option<u32>,
    /// Current number of records, when reported
    pub rr_num: Option<u32>,
}

impl Service {
    /// Build from a `<service>` element
    pub fn from_xml(element: &Element) -> Result<Self> {
        Ok(Self {
            admin: required_attr(element, "admin")?.to_string(),
            domains_limit: parse_number("domains-limit", required_attr(element, "domains-limit")?)?,
            domains_num: parse_number("domains-num", required_attr(element, "domains-num")?)?,
            enable: parse_bool(required_attr(element, "enable")?)?,
            has_primary: parse_bool(required_attr(element, "has-primary")?)?,
            name: required_attr(element, "name")?.to_string(),
            payer: required_attr(element, "payer")?.to_string(),
            tariff: required_attr(element, "tariff")?.to_string(),
            rr_limit: attr(element, "rr-limit")
                .map(|v| parse_number("rr-limit", v))
                .transpose()?,
            rr_num: attr(element, "rr-num")
                .map(|v| parse_number("rr-num", v))
                .transpose()?,
        })
    }
}
