//! The fixed cast of demo participants that receive funded accounts.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::PrimitivesError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Alice,
    Bob,
    Carol,
}

impl Role {
    /// Roles in assignment order: the i-th generated account goes to `ALL[i]`.
    pub const ALL: [Role; 3] = [Role::Alice, Role::Bob, Role::Carol];

    /// Number of accounts a provisioning run must produce.
    pub const COUNT: usize = Role::ALL.len();

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Alice => "alice",
            Role::Bob => "bob",
            Role::Carol => "carol",
        }
    }

    /// Prefix of the role's keys in the environment record.
    pub const fn env_prefix(&self) -> &'static str {
        match self {
            Role::Alice => "ALICE",
            Role::Bob => "BOB",
            Role::Carol => "CAROL",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| PrimitivesError::UnknownRole(s.to_owned()))
    }
}
