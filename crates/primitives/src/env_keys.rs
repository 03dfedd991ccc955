//! Names of the keys written into the environment record.
//!
//! Downstream tooling (client launcher, test runner) sources the record as
//! process environment, so these names are part of the external interface.

use crate::roles::Role;

pub const PROVIDER_NAME: &str = "PROVIDER_NAME";
pub const PROVIDER_HOST: &str = "PROVIDER_HOST";
pub const PROVIDER_PORT: &str = "PROVIDER_PORT";
pub const PROVIDER_URL: &str = "PROVIDER_URL";

/// Provider-level keys present after every successful `init`.
pub const PROVIDER_KEYS: [&str; 4] = [PROVIDER_NAME, PROVIDER_HOST, PROVIDER_PORT, PROVIDER_URL];

/// Key holding the role's account address.
pub fn address_key(role: Role) -> String {
    format!("{}_EOA_ADDRESS", role.env_prefix())
}

/// Key holding the role's hex private key.
pub fn private_key_key(role: Role) -> String {
    format!("{}_PRIVATE_KEY", role.env_prefix())
}

/// Every key `start` requires, in a stable order.
pub fn required_keys() -> Vec<String> {
    let mut keys: Vec<String> = PROVIDER_KEYS.iter().map(|k| (*k).to_owned()).collect();
    for role in Role::ALL {
        keys.push(address_key(role));
        keys.push(private_key_key(role));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_keys() {
        let keys = required_keys();
        assert_eq!(keys.len(), PROVIDER_KEYS.len() + 2 * Role::COUNT);
        assert!(keys.contains(&"ALICE_EOA_ADDRESS".to_owned()));
        assert!(keys.contains(&"CAROL_PRIVATE_KEY".to_owned()));
    }
}
