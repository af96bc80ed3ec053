//! Account cache backed by the operating system keyring.
//!
//! Signed-in accounts are stored as JSON in the keyring under one entry per
//! tenant and client id:
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - Windows: Credential Manager

use keyring::Entry;

use crate::auth::tokens::CachedAccount;
use crate::error::{PatissuerError, Result};

const SERVICE_NAME: &str = "patissuer";

/// Keyring-backed list of cached accounts, most recently added last.
pub struct AccountStore {
    entry: Entry,
}

impl AccountStore {
    /// Opens the cache entry for one tenant and client.
    ///
    /// # Errors
    ///
    /// Returns [`PatissuerError::CredentialStorage`] if the keyring entry cannot be created.
    pub fn new(tenant_id: &str, client_id: &str) -> Result<Self> {
        let entry = Entry::new(SERVICE_NAME, &format!("accounts:{tenant_id}:{client_id}"))
            .map_err(|e| PatissuerError::CredentialStorage(e.to_string()))?;
        Ok(Self { entry })
    }

    /// Loads all cached accounts.
    ///
    /// Returns an empty list if nothing is stored.
    pub fn load(&self) -> Result<Vec<CachedAccount>> {
        match self.entry.get_password() {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                PatissuerError::CredentialStorage(format!("cached accounts are corrupted: {e}"))
            }),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Inserts or refreshes `account`, keeping the order of existing entries.
    pub fn upsert(&self, account: CachedAccount) -> Result<()> {
        let mut accounts = self.load().unwrap_or_default();
        merge_account(&mut accounts, account);
        let json = serde_json::to_string(&accounts)?;
        self.entry.set_password(&json)?;
        Ok(())
    }
}

/// Replaces the entry with the same home account id, or appends.
fn merge_account(accounts: &mut Vec<CachedAccount>, account: CachedAccount) {
    match accounts
        .iter_mut()
        .find(|a| a.home_account_id == account.home_account_id)
    {
        Some(existing) => *existing = account,
        None => accounts.push(account),
    }
}
