//! Account provisioning for the fixed demo roles.
//!
//! Keys come either from a throwaway run of the node, which prints the
//! accounts it generates from a fixed mnemonic, or from configuration.
//! The first [`Role::COUNT`](provctl_primitives::Role::COUNT) keys are
//! assigned to the roles in order.

mod account;
mod artifact;
mod errors;
mod keys;
mod output;
mod provisioner;
mod source;

pub use account::{
    assign_roles, build_env_record, initial_balance, AccountRecord, INITIAL_BALANCE_WEI,
};
pub use artifact::{alloc_for, AccountAlloc, AccountArtifact};
pub use errors::ProvisionError;
pub use keys::{parse_keys, PrivateKey};
pub use output::parse_private_keys;
pub use provisioner::AccountProvisioner;
pub use source::{AccountSource, StaticKeySource, ThrowawayNodeSource};
