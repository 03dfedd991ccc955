//! Persisted `KEY=value` record describing the active provider.
//!
//! The file is meant to be sourced by shell tooling, so the format is kept
//! deliberately flat: one assignment per line, `#` comments, no nesting.

mod errors;
mod record;
mod store;

pub use errors::EnvStoreError;
pub use record::EnvRecord;
pub use store::EnvironmentStore;
