//! Named lead actions a detached surface can ask the primary view to run.
//!
//! The primary view injects a [`LeadActions`] implementation into its
//! [`ActionRegistry`] on mount; surfaces reach it through their opener reference.

pub mod registry;

pub use registry::{ActionInvocation, ActionName, ActionRegistry, Dispatch, LeadActions};
