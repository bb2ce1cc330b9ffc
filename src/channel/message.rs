use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field change pushed from a detached surface to the primary view.
///
/// Fire-and-forget: nothing acknowledges it, and each message stands alone. Applying
/// the same message twice leaves the record as applying it once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SyncMessage {
    NotesUpdated { record_id: String, notes: String },
    DispositionUpdated { record_id: String, disposition: String },
}

impl SyncMessage {
    pub fn notes(record_id: impl Into<String>, notes: impl Into<String>) -> Self {
        SyncMessage::NotesUpdated {
            record_id: record_id.into(),
            notes: notes.into(),
        }
    }

    pub fn disposition(record_id: impl Into<String>, disposition: impl Into<String>) -> Self {
        SyncMessage::DispositionUpdated {
            record_id: record_id.into(),
            disposition: disposition.into(),
        }
    }

    pub fn record_id(&self) -> &str {
        match self {
            SyncMessage::NotesUpdated { record_id, .. }
            | SyncMessage::DispositionUpdated { record_id, .. } => record_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::NotesUpdated { .. } => "notesUpdated",
            SyncMessage::DispositionUpdated { .. } => "dispositionUpdated",
        }
    }
}

/// What actually crosses between contexts: the sender's origin and untyped data.
/// The receiver decides whether to trust and decode it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: String,
    pub data: Value,
}

impl Envelope {
    pub fn new(origin: impl Into<String>, message: &SyncMessage) -> Self {
        Self {
            origin: origin.into(),
            data: serde_json::to_value(message).unwrap_or(Value::Null),
        }
    }

    pub fn raw(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }

    pub fn decode(&self) -> Option<SyncMessage> {
        serde_json::from_value(self.data.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_matches_contract() {
        let value = serde_json::to_value(SyncMessage::notes("r1", "hello")).unwrap();
        assert_eq!(value, json!({"type": "notesUpdated", "recordId": "r1", "notes": "hello"}));

        let value = serde_json::to_value(SyncMessage::disposition("r1", "SOLD")).unwrap();
        assert_eq!(
            value,
            json!({"type": "dispositionUpdated", "recordId": "r1", "disposition": "SOLD"})
        );
    }

    #[test]
    fn decode_rejects_foreign_payloads() {
        let origin = "http://localhost:5173";
        assert!(Envelope::raw(origin, json!({"type": "LEAD_NOTES_UPDATED"})).decode().is_none());
        assert!(Envelope::raw(origin, json!("notesUpdated")).decode().is_none());
        assert!(Envelope::raw(origin, json!({"type": "notesUpdated", "recordId": "r1"}))
            .decode()
            .is_none());
        assert_eq!(
            Envelope::raw(origin, json!({"type": "notesUpdated", "recordId": "r1", "notes": ""}))
                .decode(),
            Some(SyncMessage::notes("r1", ""))
        );
    }

    #[test]
    fn accessors() {
        let message = SyncMessage::disposition("r9", "Quoted");
        assert_eq!(message.record_id(), "r9");
        assert_eq!(message.kind(), "dispositionUpdated");
    }
}
