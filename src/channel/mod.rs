pub mod listener;
pub mod message;

pub use listener::{Delivery, NotesEditState, PrimaryListener, RecordCache};
pub use message::{Envelope, SyncMessage};
