pub mod autosave;
pub mod backend;
pub mod factory;
pub mod surface;
pub mod template;

pub use autosave::{NotesAutosave, SavePhase, SaveStatus};
pub use backend::{HttpRecordWriter, RecordPatch, RecordWriter, SaveError};
pub use factory::{
    surface_label, DetachedSurfaceFactory, HeadlessHost, SurfaceHandle, SurfaceHost, SurfaceLaunch,
};
pub use surface::{
    run_surface, spawn_surface, DetachedSurface, SurfaceButton, SurfaceClock, SurfaceEvent,
    SurfaceRuntime, SurfaceTiming, SurfaceView,
};
pub use template::{render, render_with};
