pub mod dispositions;
pub mod format;
pub mod model;
pub mod snapshot;

pub use dispositions::{DispositionOption, DispositionPalette, StandardPalette};
pub use model::LeadRecord;
pub use snapshot::{
    CapabilityToken, DisplayFields, RecordSnapshot, RecordSnapshotBuilder, SelectableDisposition,
};
