//! Collective Ledger Core
//!
//! Double-entry transaction generation and ledger consistency for a
//! multi-tenant donation platform.
//!
//! # Architecture
//!
//! - **Double Entry**: Every movement of funds is recorded as a
//!   mirrored DEBIT/CREDIT pair
//! - **Strategies**: Four expansion variants (regular, forex, refund,
//!   forex refund) chosen by a pure decision table
//! - **Fee Waterfall**: Wallet-provider, platform and payment-provider
//!   fee legs, each independently optional
//! - **Atomic Groups**: One request persists as one all-or-nothing
//!   RocksDB write batch
//!
//! # Invariants
//!
//! - Money conservation: every transaction group sums to zero per
//!   currency
//! - Pair mirroring: each DEBIT negates its CREDIT exactly, with
//!   accounts and wallets swapped
//! - Stable sequencing: group sequences are contiguous from zero in
//!   emission order
//! - Append-only: rows are never modified or deleted

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod conversion;
pub mod double_entry;
pub mod error;
pub mod fees;
pub mod ledger;
pub mod metrics;
pub mod request;
pub mod storage;
pub mod strategy;
pub mod types;
pub mod wallets;

// Re-exports
pub use config::Config;
pub use conversion::ConversionSide;
pub use error::{Error, Result};
pub use ledger::{Ledger, TransactionFilter};
pub use request::{LegacyTransaction, TransactionRequest};
pub use storage::Storage;
pub use strategy::Strategy;
pub use types::{
    AccountId, Category, Currency, EntryKind, FeeAmount, LedgerTransaction, Wallet, WalletId,
    WalletSpec,
};
pub use wallets::{MemoryWallets, WalletResolver, WalletStore};
