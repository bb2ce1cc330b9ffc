//! Lead data as the primary view holds it.

use serde::{Deserialize, Serialize};

use crate::timezone::Zoned;

/// A lead as served by the backend list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub disposition: Option<String>,
    pub notes: Option<String>,
    pub dob: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub gender: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    /// Pipeline tag such as `NextGen` or `Marketplace`.
    pub source: Option<String>,
    /// Explicit IANA zone; overrides the postal-code lookup when it parses.
    pub time_zone: Option<String>,
}

impl LeadRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Zoned for LeadRecord {
    fn postal_code(&self) -> Option<&str> {
        self.zipcode.as_deref()
    }

    fn explicit_zone(&self) -> Option<&str> {
        self.time_zone.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_shape() {
        let lead: LeadRecord = serde_json::from_str(
            r#"{"_id":"64f0","name":"Ada","zipcode":"10001","timeZone":"America/Chicago","extra":1}"#,
        )
        .unwrap();
        assert_eq!(lead.id, "64f0");
        assert_eq!(lead.postal_code(), Some("10001"));
        assert_eq!(lead.explicit_zone(), Some("America/Chicago"));
        assert!(lead.notes.is_none());
    }
}
