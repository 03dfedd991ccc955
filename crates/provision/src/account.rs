use alloy_primitives::{Address, U256};
use provctl_env_store::EnvRecord;
use provctl_primitives::{env_keys, Endpoint, ProviderId, Role};

use crate::{errors::ProvisionError, keys::PrivateKey};

/// Funding of every role account: 100 ether.
pub const INITIAL_BALANCE_WEI: u128 = 100 * 1_000_000_000_000_000_000;

pub fn initial_balance() -> U256 {
    U256::from(INITIAL_BALANCE_WEI)
}

/// A funded account assigned to one of the fixed roles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRecord {
    pub role: Role,
    pub key: PrivateKey,
    pub balance: U256,
}

impl AccountRecord {
    pub fn address(&self) -> Address {
        self.key.address()
    }
}

/// Assigns the first keys to the roles in their fixed order.
pub fn assign_roles(keys: Vec<PrivateKey>) -> Result<Vec<AccountRecord>, ProvisionError> {
    if keys.len() < Role::COUNT {
        return Err(ProvisionError::NotEnoughAccounts {
            needed: Role::COUNT,
            found: keys.len(),
        });
    }
    Ok(Role::ALL
        .into_iter()
        .zip(keys)
        .map(|(role, key)| AccountRecord {
            role,
            key,
            balance: initial_balance(),
        })
        .collect())
}

/// Full record `start` and downstream tooling need.
pub fn build_env_record(
    provider: ProviderId,
    endpoint: &Endpoint,
    accounts: &[AccountRecord],
) -> Result<EnvRecord, ProvisionError> {
    let mut record = EnvRecord::new();
    record.insert(env_keys::PROVIDER_NAME, provider.as_str())?;
    record.insert(env_keys::PROVIDER_HOST, endpoint.host.as_str())?;
    record.insert(env_keys::PROVIDER_PORT, endpoint.port.to_string())?;
    record.insert(env_keys::PROVIDER_URL, endpoint.url())?;
    for account in accounts {
        record.insert(
            env_keys::address_key(account.role),
            account.address().to_checksum(None),
        )?;
        record.insert(env_keys::private_key_key(account.role), account.key.as_str())?;
    }
    Ok(record)
}
