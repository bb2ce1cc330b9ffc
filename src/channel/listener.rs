use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use super::message::{Envelope, SyncMessage};
use crate::records::LeadRecord;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// The primary view's in-memory lead collection. Only the primary context's own
/// listener writes sync updates into it.
#[derive(Debug, Clone, Default)]
pub struct RecordCache {
    inner: Arc<Mutex<Vec<LeadRecord>>>,
}

impl RecordCache {
    pub fn new(records: Vec<LeadRecord>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(records)),
        }
    }

    pub fn replace_all(&self, records: Vec<LeadRecord>) {
        *lock(&self.inner) = records;
    }

    pub fn all(&self) -> Vec<LeadRecord> {
        lock(&self.inner).clone()
    }

    pub fn get(&self, record_id: &str) -> Option<LeadRecord> {
        lock(&self.inner)
            .iter()
            .find(|record| record.id == record_id)
            .cloned()
    }

    fn update<F>(&self, record_id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut LeadRecord),
    {
        let mut guard = lock(&self.inner);
        match guard.iter_mut().find(|record| record.id == record_id) {
            Some(record) => {
                apply(record);
                true
            }
            None => false,
        }
    }
}

/// Which record, if any, the primary view is editing notes for inline.
#[derive(Debug, Clone, Default)]
pub struct NotesEditState {
    inner: Arc<Mutex<Option<String>>>,
}

impl NotesEditState {
    pub fn begin(&self, record_id: impl Into<String>) {
        *lock(&self.inner) = Some(record_id.into());
    }

    pub fn end(&self) {
        *lock(&self.inner) = None;
    }

    pub fn is_editing(&self, record_id: &str) -> bool {
        lock(&self.inner).as_deref() == Some(record_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Delivery {
    Applied,
    RejectedOrigin,
    Malformed,
    /// Notes for the record the user is editing inline; applying would clobber the draft.
    DroppedWhileEditing,
    UnknownRecord,
}

/// Primary-side receiving end: origin check, decode, editing guard, apply.
#[derive(Debug, Clone)]
pub struct PrimaryListener {
    origin: String,
    records: RecordCache,
    editing: NotesEditState,
}

impl PrimaryListener {
    pub fn new(origin: impl Into<String>, records: RecordCache, editing: NotesEditState) -> Self {
        Self {
            origin: origin.into(),
            records,
            editing,
        }
    }

    pub fn handle(&self, envelope: &Envelope) -> (Delivery, Option<SyncMessage>) {
        if envelope.origin != self.origin {
            log_debug!("Ignoring message from foreign origin {}", envelope.origin);
            return (Delivery::RejectedOrigin, None);
        }

        let Some(message) = envelope.decode() else {
            return (Delivery::Malformed, None);
        };

        let delivery = match &message {
            SyncMessage::NotesUpdated { record_id, notes } => {
                if self.editing.is_editing(record_id) {
                    log_info!("Dropping notes update for {record_id}: inline edit in progress");
                    Delivery::DroppedWhileEditing
                } else if self
                    .records
                    .update(record_id, |record| record.notes = Some(notes.clone()))
                {
                    Delivery::Applied
                } else {
                    Delivery::UnknownRecord
                }
            }
            SyncMessage::DispositionUpdated {
                record_id,
                disposition,
            } => {
                if self.records.update(record_id, |record| {
                    record.disposition = Some(disposition.clone())
                }) {
                    Delivery::Applied
                } else {
                    Delivery::UnknownRecord
                }
            }
        };

        (delivery, Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ORIGIN: &str = "http://localhost:5173";

    fn listener() -> (PrimaryListener, RecordCache, NotesEditState) {
        let mut lead = LeadRecord::new("r1", "Ada");
        lead.notes = Some("old".into());
        let records = RecordCache::new(vec![lead, LeadRecord::new("r2", "Grace")]);
        let editing = NotesEditState::default();
        (
            PrimaryListener::new(ORIGIN, records.clone(), editing.clone()),
            records,
            editing,
        )
    }

    #[test]
    fn applies_notes_exactly() {
        let (listener, records, _) = listener();
        let envelope = Envelope::new(ORIGIN, &SyncMessage::notes("r1", "new notes\nline 2"));
        assert_eq!(listener.handle(&envelope).0, Delivery::Applied);
        assert_eq!(records.get("r1").unwrap().notes.as_deref(), Some("new notes\nline 2"));
    }

    #[test]
    fn drops_notes_only_for_the_record_being_edited() {
        let (listener, records, editing) = listener();
        editing.begin("r1");

        let for_r1 = Envelope::new(ORIGIN, &SyncMessage::notes("r1", "clobber"));
        assert_eq!(listener.handle(&for_r1).0, Delivery::DroppedWhileEditing);
        assert_eq!(records.get("r1").unwrap().notes.as_deref(), Some("old"));

        let for_r2 = Envelope::new(ORIGIN, &SyncMessage::notes("r2", "fine"));
        assert_eq!(listener.handle(&for_r2).0, Delivery::Applied);
        assert_eq!(records.get("r2").unwrap().notes.as_deref(), Some("fine"));

        editing.end();
        assert_eq!(listener.handle(&for_r1).0, Delivery::Applied);
        assert_eq!(records.get("r1").unwrap().notes.as_deref(), Some("clobber"));
    }

    #[test]
    fn disposition_ignores_the_editing_guard() {
        let (listener, records, editing) = listener();
        editing.begin("r1");
        let envelope = Envelope::new(ORIGIN, &SyncMessage::disposition("r1", "SOLD"));
        assert_eq!(listener.handle(&envelope).0, Delivery::Applied);
        assert_eq!(records.get("r1").unwrap().disposition.as_deref(), Some("SOLD"));
    }

    #[test]
    fn foreign_origin_is_rejected_silently() {
        let (listener, records, _) = listener();
        let envelope = Envelope::new("https://evil.example", &SyncMessage::notes("r1", "x"));
        assert_eq!(listener.handle(&envelope), (Delivery::RejectedOrigin, None));
        assert_eq!(records.get("r1").unwrap().notes.as_deref(), Some("old"));
    }

    #[test]
    fn malformed_and_unknown() {
        let (listener, _, _) = listener();
        let junk = Envelope::raw(ORIGIN, json!({"type": "somethingElse"}));
        assert_eq!(listener.handle(&junk).0, Delivery::Malformed);

        let missing = Envelope::new(ORIGIN, &SyncMessage::notes("r404", "x"));
        assert_eq!(listener.handle(&missing).0, Delivery::UnknownRecord);
    }

    #[test]
    fn repeated_messages_are_idempotent() {
        let (listener, records, _) = listener();
        let envelope = Envelope::new(ORIGIN, &SyncMessage::disposition("r2", "Quoted"));
        listener.handle(&envelope);
        let once = records.all();
        listener.handle(&envelope);
        assert_eq!(records.all(), once);
    }
}
