//! Canonical double-entry pair builder
//!
//! Every movement of funds in the ledger is recorded twice: once from
//! the payer's perspective (DEBIT, negative amount) and once from the
//! payee's (CREDIT, positive amount). This module turns one provisional
//! entry into that canonical `[DEBIT, CREDIT]` pair.

use crate::types::{AccountId, Category, Currency, EntryKind, LedgerTransaction, WalletId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Group-level fields stamped onto every row of one transaction group
#[derive(Debug, Clone)]
pub struct GroupStamp {
    /// Shared group id for all rows of one request
    pub transaction_group_id: Uuid,

    /// Gross principal amount of the group
    pub total_amount: i64,

    /// Destination-currency counterpart of the group total
    pub total_amount_in_destination_currency: Option<i64>,

    /// Forex destination amount
    pub destination_amount: Option<i64>,

    /// Forex destination currency
    pub destination_currency: Option<Currency>,

    /// Stated forex rate
    pub forex_rate: Option<Decimal>,

    /// Upstream legacy credit id
    pub legacy_credit_transaction_id: Option<i64>,

    /// Upstream legacy debit id
    pub legacy_debit_transaction_id: Option<i64>,

    /// Group being reversed (refunds only)
    pub refund_transaction_group_id: Option<Uuid>,

    /// Request description
    pub description: Option<String>,

    /// Batch creation time
    pub created_at: DateTime<Utc>,
}

/// One provisional entry, before it is split into its pair
///
/// Callers express "sending X" versus "owed X" purely through the sign
/// of `amount`: a positive amount models the From party as payer, a
/// negative amount flips the roles.
#[derive(Debug, Clone)]
pub struct EntrySpec {
    /// Stated paying account
    pub from_account: AccountId,

    /// Stated receiving account
    pub to_account: AccountId,

    /// Stated paying wallet
    pub from_wallet: WalletId,

    /// Stated receiving wallet
    pub to_wallet: WalletId,

    /// Signed amount in minor units
    pub amount: i64,

    /// Entry currency
    pub currency: Currency,

    /// Row category
    pub category: Category,
}

impl EntrySpec {
    /// The same movement with payer and payee swapped
    ///
    /// Used by the refund strategies, which replay their counterpart's
    /// shape with every leg's parties inverted.
    pub fn inverted(&self) -> EntrySpec {
        EntrySpec {
            from_account: self.to_account.clone(),
            to_account: self.from_account.clone(),
            from_wallet: self.to_wallet,
            to_wallet: self.from_wallet,
            amount: self.amount,
            currency: self.currency.clone(),
            category: self.category,
        }
    }
}

/// Split one provisional entry into its `[DEBIT, CREDIT]` pair
///
/// Both rows share a fresh `double_entry_group_id` and negate each
/// other exactly. Sequence numbers are assigned later by the ledger
/// service, over the whole emitted batch. Pure besides group-id
/// generation; no error cases.
pub fn double_entry_pair(spec: &EntrySpec, stamp: &GroupStamp) -> [LedgerTransaction; 2] {
    let double_entry_group_id = Uuid::new_v4();
    let abs_amount = spec.amount.abs();

    // The sign selects which party is modeled as payer on the CREDIT
    // row; wallets travel with their accounts.
    let (payer, payee, payer_wallet, payee_wallet) = if spec.amount >= 0 {
        (
            spec.from_account.clone(),
            spec.to_account.clone(),
            spec.from_wallet,
            spec.to_wallet,
        )
    } else {
        (
            spec.to_account.clone(),
            spec.from_account.clone(),
            spec.to_wallet,
            spec.from_wallet,
        )
    };

    let row = |kind: EntryKind| {
        let (from_account, to_account, from_wallet, to_wallet, amount) = match kind {
            EntryKind::Debit => (
                payee.clone(),
                payer.clone(),
                payee_wallet,
                payer_wallet,
                -abs_amount,
            ),
            EntryKind::Credit => (
                payer.clone(),
                payee.clone(),
                payer_wallet,
                payee_wallet,
                abs_amount,
            ),
        };
        LedgerTransaction {
            id: Uuid::new_v4(),
            kind,
            from_account_id: from_account,
            to_account_id: to_account,
            from_wallet_id: from_wallet,
            to_wallet_id: to_wallet,
            amount,
            currency: spec.currency.clone(),
            transaction_group_id: stamp.transaction_group_id,
            transaction_group_sequence: 0, // stamped over the full batch
            double_entry_group_id,
            category: spec.category,
            transaction_group_total_amount: stamp.total_amount,
            transaction_group_total_amount_in_destination_currency: stamp
                .total_amount_in_destination_currency,
            destination_amount: stamp.destination_amount,
            destination_currency: stamp.destination_currency.clone(),
            forex_rate: stamp.forex_rate,
            legacy_credit_transaction_id: stamp.legacy_credit_transaction_id,
            legacy_debit_transaction_id: stamp.legacy_debit_transaction_id,
            refund_transaction_group_id: stamp.refund_transaction_group_id,
            description: stamp.description.clone(),
            created_at: stamp.created_at,
        }
    };

    [row(EntryKind::Debit), row(EntryKind::Credit)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> GroupStamp {
        GroupStamp {
            transaction_group_id: Uuid::new_v4(),
            total_amount: 3000,
            total_amount_in_destination_currency: None,
            destination_amount: None,
            destination_currency: None,
            forex_rate: None,
            legacy_credit_transaction_id: None,
            legacy_debit_transaction_id: None,
            refund_transaction_group_id: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    fn spec(amount: i64) -> EntrySpec {
        EntrySpec {
            from_account: AccountId::new("sender"),
            to_account: AccountId::new("receiver"),
            from_wallet: WalletId::generate(),
            to_wallet: WalletId::generate(),
            amount,
            currency: Currency::new("EUR"),
            category: Category::Account,
        }
    }

    #[test]
    fn test_pair_order_and_mirroring() {
        let spec = spec(3000);
        let [debit, credit] = double_entry_pair(&spec, &stamp());

        assert_eq!(debit.kind, EntryKind::Debit);
        assert_eq!(credit.kind, EntryKind::Credit);
        assert_eq!(debit.amount, -3000);
        assert_eq!(credit.amount, 3000);
        assert!(debit.mirrors(&credit));

        // positive amount: the stated From party is the payer
        assert_eq!(credit.from_account_id, spec.from_account);
        assert_eq!(credit.to_account_id, spec.to_account);
        assert_eq!(credit.from_wallet_id, spec.from_wallet);
        assert_eq!(credit.to_wallet_id, spec.to_wallet);
    }

    #[test]
    fn test_negative_amount_flips_payer() {
        let spec = spec(-3000);
        let [debit, credit] = double_entry_pair(&spec, &stamp());

        assert_eq!(debit.amount, -3000);
        assert_eq!(credit.amount, 3000);
        // negative amount: the stated To party is the payer
        assert_eq!(credit.from_account_id, spec.to_account);
        assert_eq!(credit.to_account_id, spec.from_account);
        assert_eq!(credit.from_wallet_id, spec.to_wallet);
        assert!(debit.mirrors(&credit));
    }

    #[test]
    fn test_pair_shares_double_entry_group() {
        let [debit, credit] = double_entry_pair(&spec(1234), &stamp());
        assert_eq!(debit.double_entry_group_id, credit.double_entry_group_id);
        assert_ne!(debit.id, credit.id);
        assert_eq!(debit.transaction_group_id, credit.transaction_group_id);
    }

    #[test]
    fn test_inverted_spec_swaps_parties() {
        let original = spec(500);
        let inverted = original.inverted();
        assert_eq!(inverted.from_account, original.to_account);
        assert_eq!(inverted.to_wallet, original.from_wallet);
        assert_eq!(inverted.amount, original.amount);
    }
}
