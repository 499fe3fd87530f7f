//! Main ledger orchestration layer
//!
//! This module ties together request parsing, strategy expansion,
//! wallet resolution and storage into a high-level API for double-entry
//! transaction processing.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Config, Ledger, LegacyTransaction};
//!
//! #[tokio::main]
//! async fn main() -> ledger_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config)?;
//!
//!     let legacy = LegacyTransaction::from_json(r#"{
//!         "id": 1, "FromCollectiveId": 2, "CollectiveId": 3,
//!         "amount": 500, "currency": "USD"
//!     }"#)?;
//!     let rows = ledger.insert(&legacy).await?;
//!     assert_eq!(rows.len() % 2, 0);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    double_entry::GroupStamp,
    metrics::Metrics,
    request::{parse_legacy, LegacyTransaction, TransactionRequest},
    strategy,
    types::{AccountId, LedgerTransaction},
    wallets::{WalletResolver, WalletStore},
    Config, Error, Result, Storage,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Read filter for the paged query surface
///
/// Callers page over logical credit groups received by one account, not
/// raw rows.
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    /// Receiving account
    pub to_account_id: AccountId,

    /// Include cross-collective (hosted) rows when nominating groups
    pub include_hosted_collectives: bool,

    /// Page size in logical groups; the configured default when unset
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn for_account(to_account_id: AccountId) -> Self {
        Self {
            to_account_id,
            include_hosted_collectives: false,
            limit: None,
        }
    }
}

/// Main ledger interface
pub struct Ledger<R: WalletResolver = WalletStore> {
    /// Direct storage access
    storage: Arc<Storage>,

    /// Wallet lookup and just-in-time creation
    resolver: R,

    /// Configuration
    config: Config,

    /// Prometheus metrics
    metrics: Metrics,
}

impl Ledger<WalletStore> {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let resolver = WalletStore::new(storage.clone());
        Self::with_resolver(config, storage, resolver)
    }
}

impl<R: WalletResolver> Ledger<R> {
    /// Open ledger over an externally supplied wallet resolver
    pub fn with_resolver(config: Config, storage: Arc<Storage>, resolver: R) -> Result<Self> {
        let metrics = Metrics::new().map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            storage,
            resolver,
            config,
            metrics,
        })
    }

    /// Insert one legacy-shaped transaction
    ///
    /// Parses it into ledger form, expands it through the selected
    /// strategy and persists the batch atomically. Returns the rows in
    /// emission order.
    pub async fn insert(&self, legacy: &LegacyTransaction) -> Result<Vec<LedgerTransaction>> {
        let request = parse_legacy(legacy);
        self.insert_request(request).await
    }

    /// Insert one already-ledger-shaped request
    ///
    /// Every insert stamps a fresh transaction group id; resubmitting
    /// an identical request creates a new group. Deduplication is the
    /// caller's concern.
    pub async fn insert_request(
        &self,
        request: TransactionRequest,
    ) -> Result<Vec<LedgerTransaction>> {
        let started = Instant::now();

        let result = self.expand_and_persist(&request).await;

        match &result {
            Ok(rows) => {
                self.metrics.groups_total.inc();
                self.metrics.rows_total.inc_by(rows.len() as u64);
                self.metrics.batch_rows.observe(rows.len() as f64);
                self.metrics
                    .insert_duration
                    .observe(started.elapsed().as_secs_f64());
            }
            Err(error) => {
                self.metrics.insert_failures.inc();
                tracing::warn!(%error, "Insert rejected");
            }
        }

        result
    }

    async fn expand_and_persist(
        &self,
        request: &TransactionRequest,
    ) -> Result<Vec<LedgerTransaction>> {
        let stamp = GroupStamp {
            transaction_group_id: Uuid::new_v4(),
            total_amount: request.amount,
            total_amount_in_destination_currency: request.destination_amount,
            destination_amount: request.destination_amount,
            destination_currency: request.destination_currency.clone(),
            forex_rate: request.forex_rate,
            legacy_credit_transaction_id: request.legacy_credit_transaction_id,
            legacy_debit_transaction_id: request.legacy_debit_transaction_id,
            refund_transaction_group_id: request.refund_transaction_group_id,
            description: request.description.clone(),
            created_at: request.created_at.unwrap_or_else(Utc::now),
        };

        let rows = strategy::generate(
            &self.resolver,
            &self.config.platform,
            request,
            &stamp,
        )
        .await?;

        self.storage.write_group(&rows)?;

        tracing::info!(
            transaction_group_id = %stamp.transaction_group_id,
            rows = rows.len(),
            from = %request.from_account_id,
            to = %request.to_account_id,
            "Transaction group inserted"
        );

        Ok(rows)
    }

    /// Paged two-phase read
    ///
    /// Phase one resolves the most recent distinct logical credit
    /// groups for the receiving account; phase two fetches every row of
    /// the selected groups.
    pub fn get(&self, filter: &TransactionFilter) -> Result<Vec<LedgerTransaction>> {
        let limit = filter.limit.unwrap_or(self.config.read_page_size);
        let groups = self.storage.list_recent_groups(
            &filter.to_account_id,
            filter.include_hosted_collectives,
            limit,
        )?;

        let mut rows = Vec::new();
        for group_id in groups {
            rows.extend(self.storage.get_group(group_id)?);
        }
        Ok(rows)
    }

    /// All rows of one transaction group, in sequence order
    pub fn get_group(&self, group_id: Uuid) -> Result<Vec<LedgerTransaction>> {
        self.storage.get_group(group_id)
    }

    /// Metrics handle, for exposition by an embedding service
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Direct storage handle
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }
}
