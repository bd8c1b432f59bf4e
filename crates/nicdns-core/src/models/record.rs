// # DNS Records
//
// Mapping between the API's `<rr>` elements and typed records.
//
// ```xml
// <rr id="210074">
//     <name>www</name>
//     <idn-name>www</idn-name>
//     <ttl>3600</ttl>
//     <type>A</type>
//     <a>192.0.2.1</a>
// </rr>
// ```
//
// Every type keeps its payload in a type-specific child: `<a>`, `<aaaa>`,
// `<cname><name>`, `<ns><name>`, `<ptr><name>`, `<mx>`, `<srv>`, `<soa>`,
// `<txt><string>...`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use super::parse_number;
use crate::xml::{Element, XmlWriter};
use crate::{Error, Result};

/// Record types understood by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// Start of authority
    Soa,
    /// Name server
    Ns,
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Mail exchange
    Mx,
    /// Text
    Txt,
    /// Service locator
    Srv,
    /// Pointer
    Ptr,
}

impl RecordType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Soa => "SOA",
            RecordType::Ns => "NS",
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Srv => "SRV",
            RecordType::Ptr => "PTR",
        }
    }

    /// Whether records of this type may be added through the API
    pub fn is_addable(&self) -> bool {
        matches!(
            self,
            RecordType::A | RecordType::Aaaa | RecordType::Cname | RecordType::Txt
        )
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SOA" => Ok(RecordType::Soa),
            "NS" => Ok(RecordType::Ns),
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "MX" => Ok(RecordType::Mx),
            "TXT" => Ok(RecordType::Txt),
            "SRV" => Ok(RecordType::Srv),
            "PTR" => Ok(RecordType::Ptr),
            _ => Err(Error::invalid_response(format!("Unknown record type: {}", s))),
        }
    }
}

/// SOA payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Soa {
    /// Primary name server
    pub mname: String,
    /// Responsible mailbox
    pub rname: String,
    /// Serial
    pub serial: u32,
    /// Refresh interval
    pub refresh: u32,
    /// Retry interval
    pub retry: u32,
    /// Expire limit
    pub expire: u32,
    /// Negative caching TTL
    pub minimum: u32,
}

/// Type-specific record payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum RecordData {
    /// SOA
    Soa(Soa),
    /// NS
    Ns {
        /// Name server host
        name: String,
    },
    /// A
    A {
        /// Address
        address: Ipv4Addr,
    },
    /// AAAA
    Aaaa {
        /// Address
        address: Ipv6Addr,
    },
    /// CNAME
    Cname {
        /// Canonical name
        name: String,
    },
    /// MX
    Mx {
        /// Preference, lower wins
        preference: u16,
        /// Mail exchanger host
        exchange: String,
    },
    /// TXT, one entry per character-string
    Txt {
        /// Strings
        strings: Vec<String>,
    },
    /// SRV
    Srv {
        /// Priority
        priority: u16,
        /// Weight
        weight: u16,
        /// Port
        port: u16,
        /// Target host
        target: String,
    },
    /// PTR
    Ptr {
        /// Pointed-to name
        name: String,
    },
}

impl RecordData {
    /// Record type of this payload
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::Soa(_) => RecordType::Soa,
            RecordData::Ns { .. } => RecordType::Ns,
            RecordData::A { .. } => RecordType::A,
            RecordData::Aaaa { .. } => RecordType::Aaaa,
            RecordData::Cname { .. } => RecordType::Cname,
            RecordData::Mx { .. } => RecordType::Mx,
            RecordData::Txt { .. } => RecordType::Txt,
            RecordData::Srv { .. } => RecordType::Srv,
            RecordData::Ptr { .. } => RecordType::Ptr,
        }
    }

    fn from_xml(record_type: RecordType, rr: &Element) -> Result<Self> {
        Ok(match record_type {
            RecordType::Soa => RecordData::Soa(Soa {
                mname: field(rr, "soa/mname/name")?.to_string(),
                rname: field(rr, "soa/rname/name")?.to_string(),
                serial: number(rr, "soa/serial")?,
                refresh: number(rr, "soa/refresh")?,
                retry: number(rr, "soa/retry")?,
                expire: number(rr, "soa/expire")?,
                minimum: number(rr, "soa/minimum")?,
            }),
            RecordType::Ns => RecordData::Ns {
                name: field(rr, "ns/name")?.to_string(),
            },
            RecordType::A => RecordData::A {
                address: address(rr, "a")?,
            },
            RecordType::Aaaa => RecordData::Aaaa {
                address: address(rr, "aaaa")?,
            },
            RecordType::Cname => RecordData::Cname {
                name: field(rr, "cname/name")?.to_string(),
            },
            RecordType::Mx => RecordData::Mx {
                preference: number(rr, "mx/preference")?,
                exchange: field(rr, "mx/exchange/name")?.to_string(),
            },
            RecordType::Txt => {
                let strings: Vec<String> = rr
                    .find_all("txt/string")
                    .into_iter()
                    .map(|s| s.text.clone())
                    .collect();
                if strings.is_empty() {
                    return Err(Error::invalid_response("The field txt/string not found"));
                }
                RecordData::Txt { strings }
            }
            RecordType::Srv => RecordData::Srv {
                priority: number(rr, "srv/priority")?,
                weight: number(rr, "srv/weight")?,
                port: number(rr, "srv/port")?,
                target: field(rr, "srv/target/name")?.to_string(),
            },
            RecordType::Ptr => RecordData::Ptr {
                name: field(rr, "ptr/name")?.to_string(),
            },
        })
    }

    fn write_xml(&self, w: &mut XmlWriter) {
        match self {
            RecordData::Soa(soa) => {
                w.open("soa", &[]);
                w.text_element("serial", &soa.serial.to_string())
                    .text_element("refresh", &soa.refresh.to_string())
                    .text_element("retry", &soa.retry.to_string())
                    .text_element("expire", &soa.expire.to_string())
                    .text_element("minimum", &soa.minimum.to_string())
                    .name_element("mname", &soa.mname)
                    .name_element("rname", &soa.rname);
                w.close("soa");
            }
            RecordData::Ns { name } => {
                w.name_element("ns", name);
            }
            RecordData::A { address } => {
                w.text_element("a", &address.to_string());
            }
            RecordData::Aaaa { address } => {
                w.text_element("aaaa", &address.to_string());
            }
            RecordData::Cname { name } => {
                w.name_element("cname", name);
            }
            RecordData::Mx {
                preference,
                exchange,
            } => {
                w.open("mx", &[])
                    .text_element("preference", &preference.to_string())
                    .name_element("exchange", exchange)
                    .close("mx");
            }
            RecordData::Txt { strings } => {
                w.open("txt", &[]);
                for s in strings {
                    w.text_element("string", s);
                }
                w.close("txt");
            }
            RecordData::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                w.open("srv", &[])
                    .text_element("priority", &priority.to_string())
                    .text_element("weight", &weight.to_string())
                    .text_element("port", &port.to_string())
                    .name_element("target", target)
                    .close("srv");
            }
            RecordData::Ptr { name } => {
                w.name_element("ptr", name);
            }
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::Soa(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            RecordData::Ns { name } | RecordData::Cname { name } | RecordData::Ptr { name } => {
                f.write_str(name)
            }
            RecordData::A { address } => write!(f, "{}", address),
            RecordData::Aaaa { address } => write!(f, "{}", address),
            RecordData::Mx {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            RecordData::Txt { strings } => {
                let quoted: Vec<String> = strings
                    .iter()
                    .map(|s| format!("\"{}\"", s.replace('"', "\\\"")))
                    .collect();
                f.write_str(&quoted.join(" "))
            }
            RecordData::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target),
        }
    }
}

/// Resource record of a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Server-assigned id; `None` for records not yet added
    pub id: Option<u64>,
    /// Owner name relative to the zone (`@` for the apex)
    pub name: String,
    /// Punycode-decoded owner name
    pub idn_name: Option<String>,
    /// TTL in seconds; `None` uses the zone default
    pub ttl: Option<u32>,
    /// Payload
    pub data: RecordData,
}

impl DnsRecord {
    /// Create a record without id or TTL
    pub fn new(name: impl Into<String>, data: RecordData) -> Self {
        Self {
            id: None,
            name: name.into(),
            idn_name: None,
            ttl: None,
            data,
        }
    }

    /// A record
    pub fn a(name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self::new(name, RecordData::A { address })
    }

    /// AAAA record
    pub fn aaaa(name: impl Into<String>, address: Ipv6Addr) -> Self {
        Self::new(name, RecordData::Aaaa { address })
    }

    /// CNAME record
    pub fn cname(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            RecordData::Cname {
                name: target.into(),
            },
        )
    }

    /// TXT record with a single string
    pub fn txt(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            name,
            RecordData::Txt {
                strings: vec![text.into()],
            },
        )
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the IDN name
    pub fn with_idn_name(mut self, idn_name: impl Into<String>) -> Self {
        self.idn_name = Some(idn_name.into());
        self
    }

    /// Record type
    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }

    /// Build from an `<rr>` element
    pub fn from_xml(rr: &Element) -> Result<Self> {
        let id = match rr.attr("id") {
            Some(raw) => {
                let id: u64 = parse_number("id", raw)?;
                if id == 0 {
                    return Err(Error::invalid_response("Invalid record ID: 0"));
                }
                Some(id)
            }
            None => None,
        };

        let record_type: RecordType = field(rr, "type")?.parse()?;

        Ok(Self {
            id,
            name: field(rr, "name")?.to_string(),
            idn_name: rr.text_at("idn-name").map(str::to_string),
            ttl: rr
                .text_at("ttl")
                .map(|v| parse_number("ttl", v))
                .transpose()?,
            data: RecordData::from_xml(record_type, rr)?,
        })
    }

    /// Serialize as an `<rr>` element
    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::fragment();
        let attributes: Vec<(&str, String)> = self
            .id
            .map(|id| vec![("id", id.to_string())])
            .unwrap_or_default();

        w.open("rr", &attributes)
            .text_element("name", &self.name)
            .text_element("idn-name", self.idn_name.as_deref().unwrap_or(&self.name));
        if let Some(ttl) = self.ttl {
            w.text_element("ttl", &ttl.to_string());
        }
        w.text_element("type", self.record_type().as_str());
        self.data.write_xml(&mut w);
        w.close("rr");
        w.finish()
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ttl) = self.ttl {
            write!(f, " {}", ttl)?;
        }
        write!(f, " IN {} {}", self.record_type(), self.data)
    }
}

fn field<'a>(rr: &'a Element, path: &str) -> Result<&'a str> {
    rr.text_at(path)
        .ok_or_else(|| Error::invalid_response(format!("The field {} not found", path)))
}

fn number<T: FromStr>(rr: &Element, path: &str) -> Result<T> {
    parse_number(path, field(rr, path)?)
}

fn address<T: FromStr>(rr: &Element, path: &str) -> Result<T> {
    let raw = field(rr, path)?;
    raw.trim().parse().map_err(|_| {
        Error::invalid_response(format!("field '{}' is not a valid address: '{}'", path, raw))
    })
}
