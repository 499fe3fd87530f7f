//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (i64 minor units for money, Decimal for rates)

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account identifier
///
/// Accounts come from the upstream platform and may be numeric ids or
/// synthesized composites (e.g. `"841_332"` for an order-scoped payment
/// provider), so the id is an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wallet identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletId(Uuid);

impl WalletId {
    /// Generate a fresh wallet id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing id
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code, plus the `MULTI` sentinel used by provider
/// wallets that hold balances in several currencies at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Multi-currency sentinel for provider wallets
    pub const MULTI_CODE: &'static str = "MULTI";

    /// Create from a code such as `"USD"`
    pub fn new(code: impl Into<String>) -> Self {
        let code: String = code.into();
        Self(code.to_ascii_uppercase())
    }

    /// The multi-currency sentinel
    pub fn multi() -> Self {
        Self(Self::MULTI_CODE.to_string())
    }

    /// ISO code (or `MULTI`)
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Whether this is the multi-currency sentinel
    pub fn is_multi(&self) -> bool {
        self.0 == Self::MULTI_CODE
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Side of a double-entry pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryKind {
    /// Negative-amount row, the payer's perspective
    Debit,
    /// Positive-amount row, the payee's perspective
    Credit,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Debit => write!(f, "DEBIT"),
            EntryKind::Credit => write!(f, "CREDIT"),
        }
    }
}

/// What a ledger row represents within its transaction group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Account-to-account principal transfer
    Account,
    /// Foreign-exchange bridging leg
    CurrencyConversion,
    /// Fee owed to the wallet provider (host)
    WalletProvider,
    /// Fee owed to the platform
    Platform,
    /// Fee owed to the payment provider (processor)
    PaymentProvider,
}

impl Category {
    /// Stable byte tag used in storage index keys
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Category::Account => 1,
            Category::CurrencyConversion => 2,
            Category::WalletProvider => 3,
            Category::Platform => 4,
            Category::PaymentProvider => 5,
        }
    }
}

/// One immutable row in the double-entry record set
///
/// Rows are only ever created by a strategy at generation time and are
/// never mutated after persistence; corrections are new transaction
/// groups (refunds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique row id
    pub id: Uuid,

    /// DEBIT or CREDIT
    pub kind: EntryKind,

    /// Paying account (as seen from this row)
    pub from_account_id: AccountId,

    /// Receiving account (as seen from this row)
    pub to_account_id: AccountId,

    /// Paying wallet
    pub from_wallet_id: WalletId,

    /// Receiving wallet
    pub to_wallet_id: WalletId,

    /// Amount in minor currency units; CREDIT positive, DEBIT negative
    pub amount: i64,

    /// Currency of `amount`
    pub currency: Currency,

    /// Shared by every row generated from one incoming request
    pub transaction_group_id: Uuid,

    /// 0-based emission order within the group
    pub transaction_group_sequence: u32,

    /// Shared only by the two rows of one double-entry pair
    pub double_entry_group_id: Uuid,

    /// Row category
    pub category: Category,

    /// Gross principal amount of the group, identical on every row
    pub transaction_group_total_amount: i64,

    /// Destination-currency counterpart of the group total (forex only)
    pub transaction_group_total_amount_in_destination_currency: Option<i64>,

    /// Amount to be received after conversion (forex only)
    pub destination_amount: Option<i64>,

    /// Currency to be received (forex only)
    pub destination_currency: Option<Currency>,

    /// Stated exchange rate (forex only)
    pub forex_rate: Option<Decimal>,

    /// Back-reference to the upstream legacy CREDIT transaction
    pub legacy_credit_transaction_id: Option<i64>,

    /// Back-reference to the upstream legacy DEBIT transaction
    pub legacy_debit_transaction_id: Option<i64>,

    /// Group being reversed, set on refund rows only
    pub refund_transaction_group_id: Option<Uuid>,

    /// Free-form description carried over from the request
    pub description: Option<String>,

    /// Row creation time
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// The two rows of a pair must negate each other exactly
    pub fn mirrors(&self, other: &LedgerTransaction) -> bool {
        self.double_entry_group_id == other.double_entry_group_id
            && self.amount == -other.amount
            && self.currency == other.currency
            && self.from_account_id == other.to_account_id
            && self.to_account_id == other.from_account_id
            && self.from_wallet_id == other.to_wallet_id
            && self.to_wallet_id == other.from_wallet_id
    }
}

/// A currency-scoped sub-account of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique wallet id
    pub id: WalletId,

    /// Display name
    pub name: String,

    /// Wallet currency (`MULTI` for provider wallets)
    pub currency: Currency,

    /// Owning account
    pub owner_account_id: AccountId,

    /// Scratch bridging wallet, created on demand and reused per
    /// (account, currency)
    pub temporary: bool,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Descriptor for a wallet that may not exist yet
///
/// The parser synthesizes these from legacy attribution fields; the
/// strategies hand them to the wallet resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSpec {
    /// Display name for just-in-time creation
    pub name: String,

    /// Wallet currency
    pub currency: Currency,

    /// Owning account
    pub owner_account_id: AccountId,
}

impl WalletSpec {
    /// Convenience constructor
    pub fn new(name: impl Into<String>, currency: Currency, owner_account_id: AccountId) -> Self {
        Self {
            name: name.into(),
            currency,
            owner_account_id,
        }
    }
}

/// Fee expression attached to a request
///
/// Fees are either a fixed amount in minor units or a percentage of the
/// fee base (the destination amount for forex groups, the principal
/// amount otherwise). Either way the billed total is rounded to an
/// integer minor unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FeeAmount {
    /// Absolute fee in minor units of the fee currency
    Fixed(i64),
    /// Fraction of the fee base, e.g. `0.05` for 5%
    Percent(Decimal),
}

impl FeeAmount {
    /// Billed total in minor units, rounded to the nearest unit with
    /// midpoints away from zero (half a unit always bills up)
    pub fn total(&self, base: i64) -> crate::Result<i64> {
        match self {
            FeeAmount::Fixed(amount) => Ok(*amount),
            FeeAmount::Percent(rate) => rate
                .checked_mul(Decimal::from(base))
                .map(|product| {
                    product.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                })
                .and_then(|product| product.to_i64())
                .ok_or_else(|| {
                    crate::Error::Persistence(format!(
                        "percent fee total out of range: {} of {}",
                        rate, base
                    ))
                }),
        }
    }
}
