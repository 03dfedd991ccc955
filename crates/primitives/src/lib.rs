//! Collection of small data types shared by every provctl crate.

pub mod endpoint;
pub mod env_keys;
pub mod errors;
pub mod provider;
pub mod roles;

pub use endpoint::Endpoint;
pub use errors::PrimitivesError;
pub use provider::{ProviderId, ProviderKind};
pub use roles::Role;
