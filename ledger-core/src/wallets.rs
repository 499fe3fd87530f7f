//! Wallet resolution
//!
//! Strategies never create wallets themselves; they go through the
//! `WalletResolver` seam. Both lookups are find-or-create: currency
//! wallets are keyed by (owner, currency, name), temporary bridging
//! wallets by (owner, currency) alone, which is what makes concurrent
//! resolution of the same bridge idempotent.

use crate::error::Result;
use crate::storage::Storage;
use crate::types::{AccountId, Currency, Wallet, WalletId, WalletSpec};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

/// Account/wallet lookup and just-in-time creation
pub trait WalletResolver {
    /// Find or create a named wallet in one currency
    fn find_or_create_currency_wallet(
        &self,
        spec: &WalletSpec,
    ) -> impl std::future::Future<Output = Result<Wallet>> + Send;

    /// Find or create the temporary bridging wallet one account holds
    /// in a foreign currency
    ///
    /// Idempotent keyed by (account, currency): concurrent callers get
    /// the same wallet back.
    fn find_or_create_temporary_currency_wallet(
        &self,
        currency: &Currency,
        owner: &AccountId,
    ) -> impl std::future::Future<Output = Result<Wallet>> + Send;
}

fn lookup_key(owner: &AccountId, currency: &Currency, temporary: bool, name: &str) -> Vec<u8> {
    let mut key = owner.as_str().as_bytes().to_vec();
    key.push(b'|');
    key.extend_from_slice(currency.code().as_bytes());
    key.push(b'|');
    key.push(if temporary { b'1' } else { b'0' });
    key.push(b'|');
    // Temporary wallets are keyed by owner and currency only
    if !temporary {
        key.extend_from_slice(name.as_bytes());
    }
    key
}

/// RocksDB-backed resolver
///
/// The dashmap entry guard serializes concurrent find-or-create of one
/// key within this process; the storage lookup is re-checked under the
/// guard so racing callers converge on a single wallet.
pub struct WalletStore {
    storage: Arc<Storage>,
    guard: DashMap<Vec<u8>, WalletId>,
}

impl WalletStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            guard: DashMap::new(),
        }
    }

    fn find_or_create(
        &self,
        key: Vec<u8>,
        name: &str,
        currency: &Currency,
        owner: &AccountId,
        temporary: bool,
    ) -> Result<Wallet> {
        use dashmap::mapref::entry::Entry;

        match self.guard.entry(key.clone()) {
            Entry::Occupied(entry) => self.storage.get_wallet(*entry.get()),
            Entry::Vacant(entry) => {
                // Re-check under the entry guard: another process (or a
                // prior run) may have created it already
                if let Some(existing) = self.storage.lookup_wallet(&key)? {
                    entry.insert(existing.id);
                    return Ok(existing);
                }

                let wallet = Wallet {
                    id: WalletId::generate(),
                    name: name.to_string(),
                    currency: currency.clone(),
                    owner_account_id: owner.clone(),
                    temporary,
                    created_at: Utc::now(),
                };
                self.storage.put_wallet(&wallet, &key)?;
                entry.insert(wallet.id);
                Ok(wallet)
            }
        }
    }
}

impl WalletResolver for WalletStore {
    async fn find_or_create_currency_wallet(&self, spec: &WalletSpec) -> Result<Wallet> {
        let key = lookup_key(&spec.owner_account_id, &spec.currency, false, &spec.name);
        self.find_or_create(
            key,
            &spec.name,
            &spec.currency,
            &spec.owner_account_id,
            false,
        )
    }

    async fn find_or_create_temporary_currency_wallet(
        &self,
        currency: &Currency,
        owner: &AccountId,
    ) -> Result<Wallet> {
        let name = format!("temporary, {}, {}", owner, currency);
        let key = lookup_key(owner, currency, true, &name);
        self.find_or_create(key, &name, currency, owner, true)
    }
}

/// In-memory resolver for embedding and tests
#[derive(Default)]
pub struct MemoryWallets {
    wallets: parking_lot::RwLock<std::collections::HashMap<Vec<u8>, Wallet>>,
}

impl MemoryWallets {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_or_create(
        &self,
        key: Vec<u8>,
        name: &str,
        currency: &Currency,
        owner: &AccountId,
        temporary: bool,
    ) -> Wallet {
        let mut wallets = self.wallets.write();
        wallets
            .entry(key)
            .or_insert_with(|| Wallet {
                id: WalletId::generate(),
                name: name.to_string(),
                currency: currency.clone(),
                owner_account_id: owner.clone(),
                temporary,
                created_at: Utc::now(),
            })
            .clone()
    }
}

impl WalletResolver for MemoryWallets {
    async fn find_or_create_currency_wallet(&self, spec: &WalletSpec) -> Result<Wallet> {
        let key = lookup_key(&spec.owner_account_id, &spec.currency, false, &spec.name);
        Ok(self.find_or_create(
            key,
            &spec.name,
            &spec.currency,
            &spec.owner_account_id,
            false,
        ))
    }

    async fn find_or_create_temporary_currency_wallet(
        &self,
        currency: &Currency,
        owner: &AccountId,
    ) -> Result<Wallet> {
        let name = format!("temporary, {}, {}", owner, currency);
        let key = lookup_key(owner, currency, true, &name);
        Ok(self.find_or_create(key, &name, currency, owner, true))
    }
}
