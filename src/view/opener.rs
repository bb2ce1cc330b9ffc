use std::sync::Weak;

use super::primary::PrimaryWindow;
use crate::{
    actions::{ActionInvocation, Dispatch},
    channel::{Envelope, SyncMessage},
    log_debug,
};

const ENABLE_LOGS: bool = true;

/// A detached surface's handle back to the window that opened it.
///
/// Holds no ownership: once the primary window is gone every call turns into a
/// skipped no-op instead of an error.
#[derive(Debug, Clone)]
pub struct OpenerRef {
    window: Weak<PrimaryWindow>,
    /// Origin of the surface holding this reference.
    origin: String,
}

impl OpenerRef {
    pub(crate) fn new(window: Weak<PrimaryWindow>, origin: impl Into<String>) -> Self {
        Self {
            window,
            origin: origin.into(),
        }
    }

    /// A reference that never resolves, for surfaces opened without an opener.
    pub fn detached(origin: impl Into<String>) -> Self {
        Self::new(Weak::new(), origin)
    }

    pub fn is_open(&self) -> bool {
        self.window.strong_count() > 0
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Fire-and-forget post. `false` when nobody could receive it.
    pub fn post_message(&self, message: &SyncMessage) -> bool {
        let Some(window) = self.window.upgrade() else {
            log_debug!(
                "Opener closed; dropping {} for {}",
                message.kind(),
                message.record_id()
            );
            return false;
        };
        window.post_message(Envelope::new(self.origin.clone(), message))
    }

    /// Direct named call. Requires a live, same-origin opener with a mounted view.
    pub fn invoke(&self, invocation: &ActionInvocation) -> bool {
        let Some(window) = self.window.upgrade() else {
            log_debug!(
                "Opener closed; skipping {} for {}",
                invocation.action_name,
                invocation.record_id
            );
            return false;
        };
        if window.origin() != self.origin {
            log_debug!(
                "Opener origin {} differs from {}; skipping {}",
                window.origin(),
                self.origin,
                invocation.action_name
            );
            return false;
        }
        window.registry().dispatch(invocation) == Dispatch::Invoked
    }
}
