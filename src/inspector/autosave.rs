use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SavePhase {
    Idle,
    /// Input arrived; a save fires once the quiet period elapses.
    Pending,
    Saving,
    Error,
}

/// What the small status label next to a field shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Blank,
    Saving,
    Saved,
    Error,
}

impl SaveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Blank => "",
            SaveStatus::Saving => "Saving",
            SaveStatus::Saved => "Saved",
            SaveStatus::Error => "Error",
        }
    }
}

/// Debounced notes autosave: `idle -> pending -> saving -> idle | error`.
///
/// Holds no timer itself. The driver feeds it input and the current instant and
/// sleeps until [`NotesAutosave::deadline`]. At most one save is in flight; input
/// that arrives during a save re-arms the deadline and is saved afterwards.
#[derive(Debug, Clone)]
pub struct NotesAutosave {
    debounce: Duration,
    draft: String,
    saved: String,
    in_flight: Option<String>,
    deadline: Option<Instant>,
    phase: SavePhase,
    status: SaveStatus,
}

impl NotesAutosave {
    pub fn new(initial: impl Into<String>, debounce: Duration) -> Self {
        let initial = initial.into();
        Self {
            debounce,
            draft: initial.clone(),
            saved: initial,
            in_flight: None,
            deadline: None,
            phase: SavePhase::Idle,
            status: SaveStatus::Blank,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn phase(&self) -> SavePhase {
        self.phase
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// When the pending save should fire, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            SavePhase::Pending => self.deadline,
            _ => None,
        }
    }

    /// A keystroke: replace the draft and restart the quiet period.
    pub fn input(&mut self, text: impl Into<String>, now: Instant) {
        self.draft = text.into();
        self.deadline = Some(now + self.debounce);
        if self.phase != SavePhase::Saving {
            self.phase = SavePhase::Pending;
        }
    }

    /// Returns the text to save when the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match (self.phase, self.deadline) {
            (SavePhase::Pending, Some(deadline)) if deadline <= now => {
                self.deadline = None;
                self.begin()
            }
            _ => None,
        }
    }

    /// Focus left the notes area: save now instead of waiting.
    pub fn flush(&mut self, now: Instant) -> Option<String> {
        if self.phase == SavePhase::Saving {
            if self.in_flight.as_deref() != Some(self.draft.as_str()) {
                self.deadline = Some(now);
            }
            return None;
        }
        self.deadline = None;
        self.begin()
    }

    fn begin(&mut self) -> Option<String> {
        if self.draft == self.saved {
            if self.phase == SavePhase::Pending {
                self.phase = SavePhase::Idle;
            }
            return None;
        }
        self.phase = SavePhase::Saving;
        self.status = SaveStatus::Saving;
        self.in_flight = Some(self.draft.clone());
        self.in_flight.clone()
    }

    /// The backend accepted the in-flight text.
    pub fn saved(&mut self) {
        if let Some(text) = self.in_flight.take() {
            self.saved = text;
        }
        self.status = SaveStatus::Saved;
        self.phase = if self.deadline.is_some() {
            SavePhase::Pending
        } else {
            SavePhase::Idle
        };
    }

    /// The save failed. The draft stays as typed; there is no retry.
    pub fn failed(&mut self) {
        self.in_flight = None;
        self.status = SaveStatus::Error;
        self.phase = if self.deadline.is_some() {
            SavePhase::Pending
        } else {
            SavePhase::Error
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(800);

    fn at(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn burst_of_input_collapses_into_one_save() {
        let start = Instant::now();
        let mut autosave = NotesAutosave::new("", DEBOUNCE);

        autosave.input("h", start);
        autosave.input("he", at(start, 300));
        autosave.input("hel", at(start, 600));
        assert_eq!(autosave.poll(at(start, 1000)), None);
        assert_eq!(autosave.deadline(), Some(at(start, 1400)));

        assert_eq!(autosave.poll(at(start, 1400)).as_deref(), Some("hel"));
        assert_eq!(autosave.phase(), SavePhase::Saving);
        assert_eq!(autosave.status().label(), "Saving");
        assert_eq!(autosave.poll(at(start, 5000)), None);

        autosave.saved();
        assert_eq!(autosave.phase(), SavePhase::Idle);
        assert_eq!(autosave.status().label(), "Saved");
    }

    #[test]
    fn blur_saves_without_waiting() {
        let start = Instant::now();
        let mut autosave = NotesAutosave::new("a", DEBOUNCE);
        autosave.input("ab", start);
        assert_eq!(autosave.flush(at(start, 10)).as_deref(), Some("ab"));
        assert_eq!(autosave.deadline(), None);
    }

    #[test]
    fn unchanged_text_is_not_saved() {
        let start = Instant::now();
        let mut autosave = NotesAutosave::new("same", DEBOUNCE);
        assert_eq!(autosave.flush(start), None);

        autosave.input("same!", start);
        autosave.input("same", at(start, 100));
        assert_eq!(autosave.poll(at(start, 900)), None);
        assert_eq!(autosave.phase(), SavePhase::Idle);
        assert_eq!(autosave.status(), SaveStatus::Blank);
    }

    #[test]
    fn failure_keeps_the_draft_and_shows_error() {
        let start = Instant::now();
        let mut autosave = NotesAutosave::new("", DEBOUNCE);
        autosave.input("important", start);
        autosave.flush(start);
        autosave.failed();

        assert_eq!(autosave.phase(), SavePhase::Error);
        assert_eq!(autosave.status().label(), "Error");
        assert_eq!(autosave.draft(), "important");

        autosave.input("important!", at(start, 50));
        assert_eq!(autosave.phase(), SavePhase::Pending);
        assert_eq!(autosave.poll(at(start, 850)).as_deref(), Some("important!"));
    }

    #[test]
    fn input_during_a_save_is_saved_afterwards() {
        let start = Instant::now();
        let mut autosave = NotesAutosave::new("", DEBOUNCE);
        autosave.input("one", start);
        assert_eq!(autosave.flush(start).as_deref(), Some("one"));

        autosave.input("one two", at(start, 100));
        assert_eq!(autosave.phase(), SavePhase::Saving);
        assert_eq!(autosave.flush(at(start, 150)), None);

        autosave.saved();
        assert_eq!(autosave.phase(), SavePhase::Pending);
        assert_eq!(autosave.poll(at(start, 200)).as_deref(), Some("one two"));
    }
}
