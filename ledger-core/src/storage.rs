//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `rows` - Immutable ledger rows (key: row_id)
//! - `groups` - Group membership (key: group_id || sequence)
//! - `recent` - Receiving-account recency index for paged reads
//! - `wallets` - Wallet records (key: wallet_id)
//! - `wallet_index` - Wallet find-or-create lookup keys

use crate::{
    error::{Error, Result},
    types::{AccountId, Category, LedgerTransaction, Wallet, WalletId},
    Config,
};
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Options, WriteBatch, DB};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ROWS: &str = "rows";
const CF_GROUPS: &str = "groups";
const CF_RECENT: &str = "recent";
const CF_WALLETS: &str = "wallets";
const CF_WALLET_INDEX: &str = "wallet_index";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    // Column family handles are stored in DB, accessed by name
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ROWS, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_GROUPS, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_RECENT, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_WALLET_INDEX, Self::cf_options_indices()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_rows() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Wallets are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Persistence(format!("Column family {} not found", name)))
    }

    // Group operations (atomic)

    /// Persist one transaction group: all rows plus their index entries
    /// in a single WriteBatch
    ///
    /// The batch is validated first; a malformed batch surfaces
    /// `Persistence` and nothing becomes visible.
    pub fn write_group(&self, rows: &[LedgerTransaction]) -> Result<()> {
        validate_batch(rows)?;

        let cf_rows = self.cf_handle(CF_ROWS)?;
        let cf_groups = self.cf_handle(CF_GROUPS)?;
        let cf_recent = self.cf_handle(CF_RECENT)?;

        let mut batch = WriteBatch::default();
        for row in rows {
            let value = bincode::serialize(row)?;
            batch.put_cf(cf_rows, row.id.as_bytes(), &value);

            let group_key =
                Self::group_key(&row.transaction_group_id, row.transaction_group_sequence);
            batch.put_cf(cf_groups, &group_key, row.id.as_bytes());

            let recent_key = Self::recent_key(
                &row.to_account_id,
                row.created_at,
                row.category,
                &row.id,
            );
            batch.put_cf(
                cf_recent,
                &recent_key,
                Self::recent_value(&row.transaction_group_id, row.legacy_credit_transaction_id),
            );
        }

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(
            transaction_group_id = %rows[0].transaction_group_id,
            rows = rows.len(),
            "Transaction group persisted"
        );

        Ok(())
    }

    /// Get one row by id
    pub fn get_row(&self, row_id: Uuid) -> Result<LedgerTransaction> {
        let cf = self.cf_handle(CF_ROWS)?;

        let value = self
            .db
            .get_cf(cf, row_id.as_bytes())?
            .ok_or_else(|| Error::NotFound(row_id.to_string()))?;

        let row: LedgerTransaction = bincode::deserialize(&value)?;
        Ok(row)
    }

    /// Get all rows of one group, in sequence order
    pub fn get_group(&self, group_id: Uuid) -> Result<Vec<LedgerTransaction>> {
        let cf_groups = self.cf_handle(CF_GROUPS)?;

        // Scan: group_id || sequence, sequence big-endian so keys sort
        // in emission order
        let iter = self.db.prefix_iterator_cf(cf_groups, group_id.as_bytes());

        let mut rows = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(group_id.as_bytes()) {
                break;
            }
            let row_id_bytes: [u8; 16] = value[..].try_into().map_err(|_| {
                Error::Persistence(format!("corrupt group index entry for {}", group_id))
            })?;
            rows.push(self.get_row(Uuid::from_bytes(row_id_bytes))?);
        }

        Ok(rows)
    }

    /// Phase one of a paged read: the most recent distinct logical
    /// credit groups received by one account
    ///
    /// One legacy credit explodes into many ledger rows; callers page
    /// over logical groups, not raw rows. Unless `include_hosted` is
    /// set, only ACCOUNT-category rows nominate their group.
    pub fn list_recent_groups(
        &self,
        to_account: &AccountId,
        include_hosted: bool,
        limit: usize,
    ) -> Result<Vec<Uuid>> {
        let cf = self.cf_handle(CF_RECENT)?;

        let mut prefix = to_account.as_str().as_bytes().to_vec();
        prefix.push(b'|');

        let iter = self.db.prefix_iterator_cf(cf, &prefix);

        let mut seen: HashSet<Vec<u8>> = HashSet::new();
        let mut groups = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            if groups.len() >= limit {
                break;
            }

            // Category tag sits right behind the reversed timestamp
            let tag_pos = prefix.len() + 8;
            if !include_hosted {
                let tag = key.get(tag_pos).copied().unwrap_or(0);
                if tag != Category::Account.tag() {
                    continue;
                }
            }

            if value.len() < 25 {
                continue;
            }
            let group_bytes: [u8; 16] = value[..16].try_into().unwrap_or_default();
            // Distinctness is by legacy credit id when present, by
            // group id otherwise
            let dedupe = if value[16] == 1 {
                value[17..25].to_vec()
            } else {
                group_bytes.to_vec()
            };
            if seen.insert(dedupe) {
                groups.push(Uuid::from_bytes(group_bytes));
            }
        }

        Ok(groups)
    }

    // Wallet operations

    /// Persist a wallet together with its lookup key (atomic)
    pub fn put_wallet(&self, wallet: &Wallet, lookup_key: &[u8]) -> Result<()> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_index = self.cf_handle(CF_WALLET_INDEX)?;

        let mut batch = WriteBatch::default();
        let value = bincode::serialize(wallet)?;
        batch.put_cf(cf_wallets, wallet.id.as_uuid().as_bytes(), &value);
        batch.put_cf(cf_index, lookup_key, wallet.id.as_uuid().as_bytes());

        self.db.write(batch)?;

        tracing::debug!(
            wallet_id = %wallet.id,
            owner = %wallet.owner_account_id,
            currency = %wallet.currency,
            "Wallet created"
        );

        Ok(())
    }

    /// Get wallet by id
    pub fn get_wallet(&self, wallet_id: WalletId) -> Result<Wallet> {
        let cf = self.cf_handle(CF_WALLETS)?;

        let value = self
            .db
            .get_cf(cf, wallet_id.as_uuid().as_bytes())?
            .ok_or_else(|| Error::NotFound(wallet_id.to_string()))?;

        let wallet: Wallet = bincode::deserialize(&value)?;
        Ok(wallet)
    }

    /// Look a wallet up by its find-or-create key
    pub fn lookup_wallet(&self, lookup_key: &[u8]) -> Result<Option<Wallet>> {
        let cf = self.cf_handle(CF_WALLET_INDEX)?;

        match self.db.get_cf(cf, lookup_key)? {
            Some(value) => {
                let id_bytes: [u8; 16] = value[..]
                    .try_into()
                    .map_err(|_| Error::Persistence("corrupt wallet index entry".to_string()))?;
                Ok(Some(self.get_wallet(WalletId::from_uuid(Uuid::from_bytes(
                    id_bytes,
                )))?))
            }
            None => Ok(None),
        }
    }

    // Index key helpers

    fn group_key(group_id: &Uuid, sequence: u32) -> Vec<u8> {
        let mut key = group_id.as_bytes().to_vec();
        key.extend_from_slice(&sequence.to_be_bytes());
        key
    }

    /// account || '|' || reversed-timestamp || category tag || row_id
    ///
    /// The reversed timestamp makes an ascending prefix scan yield
    /// newest groups first.
    fn recent_key(
        account: &AccountId,
        created_at: DateTime<Utc>,
        category: Category,
        row_id: &Uuid,
    ) -> Vec<u8> {
        let micros = created_at.timestamp_micros().max(0) as u64;
        let mut key = account.as_str().as_bytes().to_vec();
        key.push(b'|');
        key.extend_from_slice(&(u64::MAX - micros).to_be_bytes());
        key.push(category.tag());
        key.extend_from_slice(row_id.as_bytes());
        key
    }

    /// group_id || credit-flag || legacy credit id
    fn recent_value(group_id: &Uuid, legacy_credit_id: Option<i64>) -> Vec<u8> {
        let mut value = group_id.as_bytes().to_vec();
        match legacy_credit_id {
            Some(credit) => {
                value.push(1);
                value.extend_from_slice(&credit.to_be_bytes());
            }
            None => {
                value.push(0);
                value.extend_from_slice(&[0u8; 8]);
            }
        }
        value
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Pre-commit batch validation
///
/// Checks everything the double-entry model guarantees: an even row
/// count, contiguous 0-based sequences, mirrored pairs, and a zero sum
/// per currency.
fn validate_batch(rows: &[LedgerTransaction]) -> Result<()> {
    if rows.is_empty() || rows.len() % 2 != 0 {
        return Err(Error::Persistence(format!(
            "batch must hold a positive even row count, got {}",
            rows.len()
        )));
    }

    let group_id = rows[0].transaction_group_id;
    for (index, row) in rows.iter().enumerate() {
        if row.transaction_group_id != group_id {
            return Err(Error::Persistence(
                "batch spans more than one transaction group".to_string(),
            ));
        }
        if row.transaction_group_sequence != index as u32 {
            return Err(Error::Persistence(format!(
                "non-contiguous group sequence at row {}: got {}",
                index, row.transaction_group_sequence
            )));
        }
    }

    for pair in rows.chunks(2) {
        if !pair[0].mirrors(&pair[1]) {
            return Err(Error::Persistence(format!(
                "rows {} and {} do not form a double-entry pair",
                pair[0].transaction_group_sequence, pair[1].transaction_group_sequence
            )));
        }
    }

    let mut sums: std::collections::HashMap<&str, i64> = std::collections::HashMap::new();
    for row in rows {
        *sums.entry(row.currency.code()).or_insert(0) += row.amount;
    }
    if let Some((currency, sum)) = sums.iter().find(|(_, sum)| **sum != 0) {
        return Err(Error::Persistence(format!(
            "batch does not conserve {}: residual {}",
            currency, sum
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::double_entry::{double_entry_pair, EntrySpec, GroupStamp};
    use crate::types::Currency;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    fn test_batch(legacy_credit_id: Option<i64>) -> Vec<LedgerTransaction> {
        let stamp = GroupStamp {
            transaction_group_id: Uuid::new_v4(),
            total_amount: 500,
            total_amount_in_destination_currency: None,
            destination_amount: None,
            destination_currency: None,
            forex_rate: None,
            legacy_credit_transaction_id: legacy_credit_id,
            legacy_debit_transaction_id: None,
            refund_transaction_group_id: None,
            description: None,
            created_at: Utc::now(),
        };
        let spec = EntrySpec {
            from_account: AccountId::new("donor"),
            to_account: AccountId::new("babel"),
            from_wallet: WalletId::generate(),
            to_wallet: WalletId::generate(),
            amount: 500,
            currency: Currency::new("USD"),
            category: Category::Account,
        };
        let mut rows = double_entry_pair(&spec, &stamp).to_vec();
        for (index, row) in rows.iter_mut().enumerate() {
            row.transaction_group_sequence = index as u32;
        }
        rows
    }

    #[test]
    fn test_write_and_read_group() {
        let (config, _dir) = test_config();
        let storage = Storage::open(&config).unwrap();

        let rows = test_batch(Some(42));
        storage.write_group(&rows).unwrap();

        let read = storage.get_group(rows[0].transaction_group_id).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].id, rows[0].id);
        assert_eq!(read[1].id, rows[1].id);
    }

    #[test]
    fn test_malformed_batch_persists_nothing() {
        let (config, _dir) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut rows = test_batch(None);
        rows[1].transaction_group_sequence = 9; // break contiguity on the final row

        assert!(storage.write_group(&rows).is_err());
        let read = storage.get_group(rows[0].transaction_group_id).unwrap();
        assert!(read.is_empty());
    }

    #[test]
    fn test_unbalanced_batch_rejected() {
        let (config, _dir) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut rows = test_batch(None);
        rows[1].amount += 1;

        assert!(storage.write_group(&rows).is_err());
    }

    #[test]
    fn test_recent_groups_distinct_and_newest_first() {
        let (config, _dir) = test_config();
        let storage = Storage::open(&config).unwrap();

        let older = test_batch(Some(1));
        let newer = {
            let mut rows = test_batch(Some(2));
            for row in rows.iter_mut() {
                row.created_at = Utc::now() + chrono::Duration::seconds(5);
            }
            rows
        };
        storage.write_group(&older).unwrap();
        storage.write_group(&newer).unwrap();

        let groups = storage
            .list_recent_groups(&AccountId::new("babel"), false, 20)
            .unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], newer[0].transaction_group_id);
        assert_eq!(groups[1], older[0].transaction_group_id);

        let paged = storage
            .list_recent_groups(&AccountId::new("babel"), false, 1)
            .unwrap();
        assert_eq!(paged, vec![newer[0].transaction_group_id]);
    }

    #[test]
    fn test_wallet_round_trip_via_lookup_key() {
        let (config, _dir) = test_config();
        let storage = Storage::open(&config).unwrap();

        let wallet = Wallet {
            id: WalletId::generate(),
            name: "owner: osc, account: babel, USD".to_string(),
            currency: Currency::new("USD"),
            owner_account_id: AccountId::new("30"),
            temporary: false,
            created_at: Utc::now(),
        };
        storage.put_wallet(&wallet, b"30|USD|0|osc").unwrap();

        let found = storage.lookup_wallet(b"30|USD|0|osc").unwrap().unwrap();
        assert_eq!(found.id, wallet.id);
        assert!(storage.lookup_wallet(b"30|USD|0|other").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_group_index_entry_is_surfaced() {
        let (config, _dir) = test_config();
        let storage = Storage::open(&config).unwrap();

        let group_id = Uuid::new_v4();
        let cf = storage.db.cf_handle(CF_GROUPS).unwrap();
        let key = Storage::group_key(&group_id, 0);
        storage.db.put_cf(cf, &key, b"short").unwrap();

        let err = storage.get_group(group_id).unwrap_err();
        assert!(err.to_string().contains("corrupt group index entry"));
    }

    #[test]
    fn test_corrupt_wallet_index_entry_is_surfaced() {
        let (config, _dir) = test_config();
        let storage = Storage::open(&config).unwrap();

        let cf = storage.db.cf_handle(CF_WALLET_INDEX).unwrap();
        storage.db.put_cf(cf, b"30|USD|0|osc", b"short").unwrap();

        let err = storage.lookup_wallet(b"30|USD|0|osc").unwrap_err();
        assert!(err.to_string().contains("corrupt wallet index entry"));
    }
}
