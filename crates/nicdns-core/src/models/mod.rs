//! Entities returned by the DNS-master API
//!
//! - [`Service`]: a DNS hosting service of the account
//! - [`Zone`]: a zone inside a service
//! - [`DnsRecord`]: a resource record inside a zone

pub mod record;
pub mod service;
pub mod zone;

pub use record::{DnsRecord, RecordData, RecordType, Soa};
pub use service::Service;
pub use zone::Zone;

use crate::xml::Element;
use crate::{Error, Result};

/// Attribute lookup treating `-` and `_` in names as equal
///
/// The API is not consistent (`domains-limit` next to `rr_num`).
pub(crate) fn attr<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element.attr(name).or_else(|| {
        let alternative = if name.contains('-') {
            name.replace('-', "_")
        } else {
            name.replace('_', "-")
        };
        element.attr(&alternative)
    })
}

pub(crate) fn required_attr<'a>(element: &'a Element, name: &str) -> Result<&'a str> {
    attr(element, name).ok_or_else(|| {
        Error::invalid_response(format!(
            "<{}> is missing attribute '{}'",
            element.name, name
        ))
    })
}

pub(crate) fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::invalid_response(format!(
            "expected 'true' or 'false', got '{}'",
            other
        ))),
    }
}

pub(crate) fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::invalid_response(format!("field '{}' is not a valid number: '{}'", field, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_dash_underscore() {
        let element = Element::parse(r#"<service rr_num="49" domains-limit="12"/>"#).unwrap();
        assert_eq!(attr(&element, "rr-num"), Some("49"));
        assert_eq!(attr(&element, "domains_limit"), Some("12"));
        assert!(required_attr(&element, "tariff").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(parse_bool("yes").is_err());
    }
}
