use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

use super::entities::{AccountDraft, AccountId, AccountStats, SavedAccount};
use super::error::AccountStoreError;
use crate::storage::{KeyValueStore, StorageKeys};

/// Local collection of the accounts a user has logged in with.
///
/// Storage failures never reach the caller: they are logged and reported as
/// `false`, `None`, an empty list or zeroed stats. Mutations are serialized
/// through `write_lock`, so concurrent callers sharing one store cannot lose
/// each other's updates.
pub struct AccountStore<S: KeyValueStore> {
    storage: Arc<S>,
    keys: StorageKeys,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> AccountStore<S> {
    pub fn new(storage: Arc<S>, keys: StorageKeys) -> Self {
        Self {
            storage,
            keys,
            write_lock: Mutex::new(()),
        }
    }

    /// All saved accounts in insertion order
    pub async fn list(&self) -> Vec<SavedAccount> {
        self.load_accounts().await.unwrap_or_else(|e| {
            error!("Failed to load saved accounts: {}", e);
            Vec::new()
        })
    }

    /// Inserts or updates the account with the draft's phone number
    #[instrument(skip(self, draft), fields(phone_number = %draft.phone_number))]
    pub async fn save(&self, draft: AccountDraft) -> bool {
        let _guard = self.write_lock.lock().await;

        match self.upsert(draft).await {
            Ok(account) => {
                debug!("saved account {}", account.id);
                true
            }
            Err(e) => {
                error!("Failed to save account: {}", e);
                false
            }
        }
    }

    /// Removes an account. If it was the default, the first remaining
    /// account takes over.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &AccountId) -> bool {
        let _guard = self.write_lock.lock().await;

        match self.remove_inner(id).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to remove account: {}", e);
                false
            }
        }
    }

    /// Marks `id` as the only default account. An unknown id leaves no
    /// default at all.
    #[instrument(skip(self))]
    pub async fn set_default(&self, id: &AccountId) -> bool {
        let _guard = self.write_lock.lock().await;

        match self.set_default_inner(id).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to set default account: {}", e);
                false
            }
        }
    }

    /// The flagged default, falling back to the first account
    pub async fn get_default(&self) -> Option<SavedAccount> {
        let accounts = self.list().await;

        accounts
            .iter()
            .find(|account| account.is_default)
            .or_else(|| accounts.first())
            .cloned()
    }

    pub async fn set_current(&self, account: &SavedAccount) -> bool {
        match self.write_current(account).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to store current account: {}", e);
                false
            }
        }
    }

    pub async fn get_current(&self) -> Option<SavedAccount> {
        self.load_current().await.unwrap_or_else(|e| {
            error!("Failed to load current account: {}", e);
            None
        })
    }

    pub async fn find_by_phone(&self, phone_number: &str) -> Option<SavedAccount> {
        self.list()
            .await
            .into_iter()
            .find(|account| account.phone_number == phone_number)
    }

    /// Forgets every saved account and the current account
    pub async fn clear_all(&self) -> bool {
        let _guard = self.write_lock.lock().await;

        let keys = vec![
            self.keys.saved_accounts.clone(),
            self.keys.current_account.clone(),
        ];
        match self.storage.multi_remove(keys).await {
            Ok(()) => {
                debug!("cleared all saved accounts");
                true
            }
            Err(e) => {
                error!("Failed to clear accounts: {}", e);
                false
            }
        }
    }

    pub async fn stats(&self) -> AccountStats {
        match self.load_accounts().await {
            Ok(accounts) => AccountStats::from_accounts(&accounts),
            Err(e) => {
                error!("Failed to compute account stats: {}", e);
                AccountStats::default()
            }
        }
    }

    /// Records a login: saves the draft and makes the stored record the
    /// current account. Returns the stored record.
    ///
    /// Either both writes land or neither does: when the current account
    /// cannot be stored, the collection is put back as it was.
    #[instrument(skip(self, draft), fields(phone_number = %draft.phone_number))]
    pub async fn login(&self, draft: AccountDraft) -> Option<SavedAccount> {
        let _guard = self.write_lock.lock().await;

        match self.login_inner(draft).await {
            Ok(account) => {
                debug!("logged in as {}", account.id);
                Some(account)
            }
            Err(e) => {
                error!("Failed to log in: {}", e);
                None
            }
        }
    }

    async fn login_inner(&self, draft: AccountDraft) -> Result<SavedAccount, AccountStoreError> {
        let previous = self.storage.get(&self.keys.saved_accounts).await?;
        let account = self.upsert(draft).await?;

        if let Err(e) = self.write_current(&account).await {
            self.restore_accounts(previous).await;
            return Err(e);
        }
        Ok(account)
    }

    async fn restore_accounts(&self, previous: Option<String>) {
        let key = self.keys.saved_accounts.clone();
        let result = match previous {
            Some(json) => self.storage.set(&key, json).await,
            None => self.storage.multi_remove(vec![key]).await,
        };

        if let Err(e) = result {
            error!("Failed to restore saved accounts: {}", e);
        }
    }

    async fn upsert(&self, draft: AccountDraft) -> Result<SavedAccount, AccountStoreError> {
        let mut accounts = self.load_accounts().await?;
        let now = Utc::now();

        let saved_idx = match accounts
            .iter()
            .position(|account| account.phone_number == draft.phone_number)
        {
            Some(idx) => {
                accounts[idx] = accounts[idx].merge(draft, now);
                idx
            }
            None => {
                accounts.push(SavedAccount::from_draft(draft, now));
                accounts.len() - 1
            }
        };

        if accounts.len() == 1 {
            accounts[0].is_default = true;
        }

        if accounts[saved_idx].is_default {
            for (idx, account) in accounts.iter_mut().enumerate() {
                if idx != saved_idx {
                    account.is_default = false;
                }
            }
        }

        self.write_accounts(&accounts).await?;
        Ok(accounts.swap_remove(saved_idx))
    }

    async fn remove_inner(&self, id: &AccountId) -> Result<(), AccountStoreError> {
        let accounts = self.load_accounts().await?;

        let removed_was_default = accounts
            .iter()
            .any(|account| &account.id == id && account.is_default);

        let mut remaining: Vec<SavedAccount> = accounts
            .into_iter()
            .filter(|account| &account.id != id)
            .collect();

        if removed_was_default {
            if let Some(first) = remaining.first_mut() {
                first.is_default = true;
            }
        }

        self.write_accounts(&remaining).await
    }

    async fn set_default_inner(&self, id: &AccountId) -> Result<(), AccountStoreError> {
        let mut accounts = self.load_accounts().await?;

        for account in accounts.iter_mut() {
            account.is_default = &account.id == id;
        }

        self.write_accounts(&accounts).await
    }

    async fn load_accounts(&self) -> Result<Vec<SavedAccount>, AccountStoreError> {
        let Some(json) = self.storage.get(&self.keys.saved_accounts).await? else {
            return Ok(Vec::new());
        };

        Ok(serde_json::from_str(&json)?)
    }

    async fn write_accounts(&self, accounts: &[SavedAccount]) -> Result<(), AccountStoreError> {
        let json = serde_json::to_string(accounts)?;
        self.storage.set(&self.keys.saved_accounts, json).await?;
        Ok(())
    }

    async fn load_current(&self) -> Result<Option<SavedAccount>, AccountStoreError> {
        let Some(json) = self.storage.get(&self.keys.current_account).await? else {
            return Ok(None);
        };

        Ok(Some(serde_json::from_str(&json)?))
    }

    async fn write_current(&self, account: &SavedAccount) -> Result<(), AccountStoreError> {
        let json = serde_json::to_string(account)?;
        self.storage.set(&self.keys.current_account, json).await?;
        Ok(())
    }
}
