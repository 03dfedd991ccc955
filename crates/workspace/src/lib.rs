//! Active-provider pointer.
//!
//! The workspace is a symlink inside the base directory that resolves to one
//! provider's private state directory. Its last path component names the
//! active provider and is the only place that fact is stored.

mod errors;
mod selector;

pub use errors::WorkspaceError;
pub use selector::{Selection, WorkspaceSelector};
