//! Minimal XML element tree for DNS-master payloads
//!
//! Responses are small documents, so they are read fully into an
//! [`Element`] tree with `quick-xml` and then queried with slash-separated
//! child paths (`"soa/mname/name"`). Requests are built with [`XmlWriter`].

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::{Error, Result};

/// XML element with attributes, child elements and concatenated text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<Element>,
    /// Text content as sent; whitespace-only text around child elements is dropped
    pub text: String,
}

impl Element {
    /// Parse a document and return its root element
    pub fn parse(document: &str) -> Result<Element> {
        let mut reader = Reader::from_str(document.trim_start());

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::xml(format!("at position {}: {}", reader.buffer_position(), e)))?;

            match event {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| Error::xml("unbalanced closing tag"))?;
                    // Indentation between child elements
                    if !element.children.is_empty() && element.text.trim().is_empty() {
                        element.text.clear();
                    }
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let text = text.unescape().map_err(|e| Error::xml(e.to_string()))?;
                        current.text.push_str(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::xml(format!("unclosed element <{}>", stack[stack.len() - 1].name)));
        }
        root.ok_or_else(|| Error::xml("document has no root element"))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element> {
        let mut element = Element {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            ..Default::default()
        };
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| Error::xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| Error::xml(e.to_string()))?
                .into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    fn attach(
        stack: &mut [Element],
        root: &mut Option<Element>,
        element: Element,
    ) -> Result<()> {
        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(element);
                Ok(())
            }
            None if root.is_none() => {
                *root = Some(element);
                Ok(())
            }
            None => Err(Error::xml("document has more than one root element")),
        }
    }

    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First descendant matching a slash-separated path of tag names
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |element, segment| {
                element.children.iter().find(|c| c.name == segment)
            })
    }

    /// All descendants matching a path; the last segment may match several siblings
    pub fn find_all<'a>(&'a self, path: &str) -> Vec<&'a Element> {
        let (parent, last) = match path.rsplit_once('/') {
            Some((parent, last)) => (self.find(parent), last),
            None => (Some(self), path),
        };
        parent
            .map(|p| p.children.iter().filter(|c| c.name == last).collect())
            .unwrap_or_default()
    }

    /// Text of the element at `path`, if present
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.find(path).map(|e| e.text.as_str())
    }
}

/// String builder for request documents with escaping
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
}

impl XmlWriter {
    /// Start a document with the XML declaration
    pub fn document() -> Self {
        Self {
            out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n"),
        }
    }

    /// Start a fragment (no declaration)
    pub fn fragment() -> Self {
        Self::default()
    }

    /// Open a tag with attributes
    pub fn open(&mut self, name: &str, attributes: &[(&str, String)]) -> &mut Self {
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attributes {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape(value.as_str()));
            self.out.push('"');
        }
        self.out.push('>');
        self
    }

    /// Close a tag
    pub fn close(&mut self, name: &str) -> &mut Self {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
        self
    }

    /// `<name>text</name>`
    pub fn text_element(&mut self, name: &str, text: &str) -> &mut Self {
        self.open(name, &[]);
        self.out.push_str(&escape(text));
        self.close(name)
    }

    /// `<outer><name>text</name></outer>`, the API's shape for domain-name fields
    pub fn name_element(&mut self, outer: &str, name: &str) -> &mut Self {
        self.open(outer, &[]);
        self.text_element("name", name);
        self.close(outer)
    }

    /// Append an already serialized fragment
    pub fn raw(&mut self, fragment: &str) -> &mut Self {
        self.out.push_str(fragment);
        self
    }

    /// Finish and return the document
    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"
        <?xml version="1.0" encoding="UTF-8" ?>
        <response>
            <status>success</status>
            <data>
                <service name="svc" enable="true"/>
                <service name="other" enable="false"/>
            </data>
        </response>
    "#;

    #[test]
    fn test_parse_and_query() {
        let root = Element::parse(RESPONSE).unwrap();
        assert_eq!(root.name, "response");
        assert_eq!(root.text_at("status"), Some("success"));

        let services = root.find_all("data/service");
        assert_eq!(services.len(), 2);
        assert_eq!(services[1].attr("name"), Some("other"));
        assert!(root.find("data/zone").is_none());
        assert!(root.find_all("missing/service").is_empty());
    }

    #[test]
    fn test_entities_and_cdata() {
        let root =
            Element::parse(r#"<rr note="a &amp; b"><txt>x &lt; y</txt><raw><![CDATA[<&>]]></raw></rr>"#)
                .unwrap();
        assert_eq!(root.attr("note"), Some("a & b"));
        assert_eq!(root.text_at("txt"), Some("x < y"));
        assert_eq!(root.text_at("raw"), Some("<&>"));
    }

    #[test]
    fn test_leaf_text_is_not_trimmed() {
        let root = Element::parse("<txt>\n    <string>  padded  </string>\n</txt>").unwrap();
        assert_eq!(root.text, "");
        assert_eq!(root.text_at("string"), Some("  padded  "));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(Element::parse("<a><b></a>"), Err(Error::Xml(_))));
        assert!(matches!(Element::parse("<a>"), Err(Error::Xml(_))));
        assert!(matches!(Element::parse(""), Err(Error::Xml(_))));
        assert!(matches!(Element::parse("<a/><b/>"), Err(Error::Xml(_))));
    }

    #[test]
    fn test_writer_escapes() {
        let mut writer = XmlWriter::fragment();
        writer
            .open("rr", &[("id", "7".to_string())])
            .text_element("name", "a<b")
            .name_element("cname", "target.example.")
            .close("rr");
        assert_eq!(
            writer.finish(),
            r#"<rr id="7"><name>a&lt;b</name><cname><name>target.example.</name></cname></rr>"#
        );
    }
}
