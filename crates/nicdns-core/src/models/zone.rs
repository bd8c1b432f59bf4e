use serde::{Deserialize, Serialize};

use super::{parse_bool, parse_number, required_attr};
use crate::Result;
use crate::xml::Element;

/// DNS zone inside a service
///
/// `has_changes` is true while add/delete operations are staged and not yet
/// committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Administrator contract
    pub admin: String,
    /// Whether the zone is enabled
    pub enable: bool,
    /// Whether uncommitted changes are pending
    pub has_changes: bool,
    /// Whether the zone is primary
    pub has_primary: bool,
    /// Zone id
    pub id: u64,
    /// Punycode-decoded name
    pub idn_name: String,
    /// Zone name, used in API paths
    pub name: String,
    /// Paying contract
    pub payer: String,
    /// Name of the owning service
    pub service: String,
}

impl Zone {
    /// Build from a `<zone>` element
    pub fn from_xml(element: &Element) -> Result<Self> {
        Ok(Self {
            admin: required_attr(element, "admin")?.to_string(),
            enable: parse_bool(required_attr(element, "enable")?)?,
            has_changes: parse_bool(required_attr(element, "has-changes")?)?,
            has_primary: parse_bool(required_attr(element, "has-primary")?)?,
            id: parse_number("id", required_attr(element, "id")?)?,
            idn_name: required_attr(element, "idn-name")?.to_string(),
            name: required_attr(element, "name")?.to_string(),
            payer: required_attr(element, "payer")?.to_string(),
            service: required_attr(element, "service")?.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_from_xml() {
        let element = Element::parse(
            r#"<zone admin="123/NIC-REG" enable="true" has-changes="false"
                has-primary="true" id="227642" idn-name="example.ru"
                name="example.ru" payer="123/NIC-REG" service="myservice"/>"#,
        )
        .unwrap();

        let zone = Zone::from_xml(&element).unwrap();
        assert_eq!(zone.id, 227642);
        assert_eq!(zone.name, "example.ru");
        assert_eq!(zone.service, "myservice");
        assert!(zone.enable);
        assert!(!zone.has_changes);
    }

    #[test]
    fn test_zone_bad_id() {
        let element = Element::parse(
            r#"<zone admin="a" enable="true" has-changes="false" has-primary="true"
                id="abc" idn-name="x" name="x" payer="a" service="s"/>"#,
        )
        .unwrap();
        assert!(Zone::from_xml(&element).is_err());
    }
}
