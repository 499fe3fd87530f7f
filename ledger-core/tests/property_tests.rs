//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Money conservation: every batch sums to zero per currency
//! - Pair mirroring: each DEBIT negates its CREDIT with parties swapped
//! - Stable sequencing: group sequences are contiguous from zero
//! - Group uniformity: stamped totals identical across every row

use ledger_core::{
    double_entry::{double_entry_pair, EntrySpec, GroupStamp},
    AccountId, Category, ConversionSide, Currency, FeeAmount, LedgerTransaction, MemoryWallets,
    TransactionRequest, WalletId, WalletSpec,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Strategy for generating signed amounts in minor units
fn amount_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![(-1_000_000_00i64..0), (1i64..1_000_000_00)]
}

/// Strategy for generating currencies
fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::new("USD")),
        Just(Currency::new("EUR")),
        Just(Currency::new("GBP")),
        Just(Currency::new("MXN")),
        Just(Currency::new("INR")),
    ]
}

/// Strategy for generating account IDs
fn account_id_strategy() -> impl Strategy<Value = AccountId> {
    "[a-z]{3,12}".prop_map(AccountId::new)
}

fn entry_spec_strategy() -> impl Strategy<Value = EntrySpec> {
    (
        amount_strategy(),
        currency_strategy(),
        account_id_strategy(),
        account_id_strategy(),
    )
        .prop_map(|(amount, currency, from_account, to_account)| EntrySpec {
            from_account,
            to_account,
            from_wallet: WalletId::generate(),
            to_wallet: WalletId::generate(),
            amount,
            currency,
            category: Category::Account,
        })
}

fn test_stamp() -> GroupStamp {
    GroupStamp {
        transaction_group_id: Uuid::new_v4(),
        total_amount: 0,
        total_amount_in_destination_currency: None,
        destination_amount: None,
        destination_currency: None,
        forex_rate: None,
        legacy_credit_transaction_id: None,
        legacy_debit_transaction_id: None,
        refund_transaction_group_id: None,
        description: None,
        created_at: chrono::Utc::now(),
    }
}

/// A forex request over arbitrary amounts and fee rates
fn forex_request_strategy() -> impl Strategy<Value = TransactionRequest> {
    (
        1i64..1_000_000_00,
        1i64..1_000_000_00,
        0u32..50,
        any::<bool>(),
    )
        .prop_map(|(amount, destination_amount, fee_pct, sender_pay_fees)| {
            TransactionRequest {
                from_account_id: AccountId::new("donor"),
                to_account_id: AccountId::new("babel"),
                amount,
                currency: Currency::new("EUR"),
                destination_amount: Some(destination_amount),
                destination_currency: Some(Currency::new("USD")),
                forex_rate: None,
                sender_pay_fees,
                conversion_side: ConversionSide::default(),
                wallet_provider_fee: Some(FeeAmount::Percent(Decimal::new(fee_pct as i64, 2))),
                platform_fee: None,
                payment_provider_fee: None,
                from_wallet: WalletSpec::new(
                    "donor, EUR",
                    Currency::new("EUR"),
                    AccountId::new("donor"),
                ),
                to_wallet: WalletSpec::new(
                    "babel, USD",
                    Currency::new("USD"),
                    AccountId::new("osc"),
                ),
                wallet_provider_wallet: Some(WalletSpec::new(
                    "osc, multi-currency",
                    Currency::multi(),
                    AccountId::new("osc"),
                )),
                payment_provider_wallet: Some(WalletSpec::new(
                    "creditcard",
                    Currency::multi(),
                    AccountId::new("stripe"),
                )),
                legacy_credit_transaction_id: None,
                legacy_debit_transaction_id: None,
                legacy_refund_transaction_id: None,
                refund_transaction_group_id: None,
                description: None,
                created_at: None,
            }
        })
}

fn conserves_money(rows: &[LedgerTransaction]) -> bool {
    let mut sums: std::collections::HashMap<String, i64> = Default::default();
    for row in rows {
        *sums.entry(row.currency.code().to_string()).or_insert(0) += row.amount;
    }
    sums.values().all(|sum| *sum == 0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: a pair always sums to zero with parties exactly swapped
    #[test]
    fn prop_pair_mirrors(spec in entry_spec_strategy()) {
        let [debit, credit] = double_entry_pair(&spec, &test_stamp());

        prop_assert_eq!(debit.amount + credit.amount, 0);
        prop_assert!(debit.amount <= 0);
        prop_assert!(credit.amount >= 0);
        prop_assert_eq!(debit.double_entry_group_id, credit.double_entry_group_id);
        prop_assert_eq!(&debit.from_account_id, &credit.to_account_id);
        prop_assert_eq!(&debit.to_account_id, &credit.from_account_id);
        prop_assert_eq!(debit.from_wallet_id, credit.to_wallet_id);
        prop_assert_eq!(debit.to_wallet_id, credit.from_wallet_id);
    }

    /// Property: a negative amount flips the payer, never the magnitude
    #[test]
    fn prop_sign_selects_payer(spec in entry_spec_strategy()) {
        let [_, credit] = double_entry_pair(&spec, &test_stamp());

        prop_assert_eq!(credit.amount, spec.amount.abs());
        if spec.amount >= 0 {
            prop_assert_eq!(&credit.from_account_id, &spec.from_account);
        } else {
            prop_assert_eq!(&credit.from_account_id, &spec.to_account);
        }
    }

    /// Property: every generated forex batch conserves money per
    /// currency and carries contiguous sequences
    #[test]
    fn prop_forex_batches_conserve_money(request in forex_request_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let wallets = MemoryWallets::new();
            let stamp = test_stamp();
            let rows = ledger_core::strategy::generate(
                &wallets,
                &ledger_core::config::PlatformConfig::default(),
                &request,
                &stamp,
            )
            .await
            .unwrap();

            prop_assert_eq!(rows.len(), 8);
            prop_assert!(conserves_money(&rows));
            for (index, row) in rows.iter().enumerate() {
                prop_assert_eq!(row.transaction_group_sequence, index as u32);
                prop_assert_eq!(row.transaction_group_id, stamp.transaction_group_id);
            }
            Ok(())
        })?;
    }

    /// Property: the receiver nets destination minus fee exactly when
    /// the sender absorbs the fees
    #[test]
    fn prop_sender_pay_fees_nets_principal(request in forex_request_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let wallets = MemoryWallets::new();
            let rows = ledger_core::strategy::generate(
                &wallets,
                &ledger_core::config::PlatformConfig::default(),
                &request,
                &test_stamp(),
            )
            .await
            .unwrap();

            let destination = request.destination_amount.unwrap();
            let fee = rows[7].amount;
            if request.sender_pay_fees {
                prop_assert_eq!(rows[1].amount, destination - fee);
            } else {
                prop_assert_eq!(rows[1].amount, destination);
            }
            Ok(())
        })?;
    }

    /// Property: refunds keep parity with their counterpart batch
    #[test]
    fn prop_refund_parity(request in forex_request_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let wallets = MemoryWallets::new();
            let platform = ledger_core::config::PlatformConfig::default();

            let original = ledger_core::strategy::generate(
                &wallets, &platform, &request, &test_stamp(),
            )
            .await
            .unwrap();

            let mut refund_request = request.clone();
            refund_request.refund_transaction_group_id = Some(Uuid::new_v4());
            let refund = ledger_core::strategy::generate(
                &wallets, &platform, &refund_request, &test_stamp(),
            )
            .await
            .unwrap();

            prop_assert_eq!(refund.len(), original.len());
            prop_assert!(conserves_money(&refund));
            for (original_row, refund_row) in original.iter().zip(refund.iter()) {
                prop_assert_eq!(refund_row.amount.abs(), original_row.amount.abs());
                prop_assert_eq!(&refund_row.from_account_id, &original_row.to_account_id);
                prop_assert_eq!(refund_row.from_wallet_id, original_row.to_wallet_id);
            }
            Ok(())
        })?;
    }
}
