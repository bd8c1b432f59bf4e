//! `<response>` envelope shared by every DNS-master endpoint
//!
//! ```xml
//! <response>
//!     <status>fail</status>
//!     <errors>
//!         <error code="4097">Zone not found</error>
//!     </errors>
//! </response>
//! ```

use crate::xml::Element;
use crate::{Error, Result};

/// Parsed envelope
#[derive(Debug)]
pub(crate) struct Envelope {
    pub status: String,
    pub errors: Vec<(String, String)>,
    pub data: Option<Element>,
}

impl Envelope {
    pub(crate) fn parse(body: &str) -> Result<Self> {
        let mut root = Element::parse(body)?;

        let status = root
            .text_at("status")
            .map(|status| status.trim().to_string())
            .ok_or_else(|| Error::invalid_response(format!("Can't find <status> in response: {}", body)))?;

        let errors = root
            .find_all("errors/error")
            .into_iter()
            .map(|e| (e.attr("code").unwrap_or_default().to_string(), e.text.trim().to_string()))
            .collect();

        let data = root
            .children
            .iter()
            .position(|c| c.name == "data")
            .map(|index| root.children.swap_remove(index));

        Ok(Self {
            status,
            errors,
            data,
        })
    }

    pub(crate) fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Error text in the form `Code: 4097. Zone not found Code: ...`
    pub(crate) fn error_message(&self) -> String {
        if self.errors.is_empty() {
            return format!("request failed with status '{}'", self.status);
        }
        self.errors
            .iter()
            .map(|(code, text)| format!("Code: {}. {}", code, text))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `Ok(data)` on success, `Error::Api` otherwise
    pub(crate) fn into_data(self) -> Result<Option<Element>> {
        if !self.is_success() {
            return Err(Error::api(self.error_message()));
        }
        Ok(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_with_data() {
        let envelope = Envelope::parse(
            "<response><status>success</status><data><service name=\"a\"/></data></response>",
        )
        .unwrap();
        let data = envelope.into_data().unwrap().unwrap();
        assert_eq!(data.children.len(), 1);
    }

    #[test]
    fn test_success_without_data() {
        let envelope = Envelope::parse("<response><status>success</status></response>").unwrap();
        assert!(envelope.into_data().unwrap().is_none());
    }

    #[test]
    fn test_failure_joins_errors() {
        let envelope = Envelope::parse(
            r#"<response><status>fail</status><errors>
                <error code="4097">Zone not found</error>
                <error code="4001">Access denied</error>
            </errors></response>"#,
        )
        .unwrap();
        let err = envelope.into_data().unwrap_err();
        assert!(matches!(err, Error::Api(_)));
        assert_eq!(
            err.to_string(),
            "DNS API error: Code: 4097. Zone not found Code: 4001. Access denied"
        );
    }

    #[test]
    fn test_missing_status() {
        let err = Envelope::parse("<response><data/></response>").unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }
}
