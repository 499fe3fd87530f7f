//! Fee waterfall legs
//!
//! Up to three independently payable fee legs ride along with a
//! principal transfer: wallet provider (host), platform, and payment
//! provider. All three share one contract, parameterized by which
//! request fields supply the collector account, collector wallet and
//! fee amount. A fee with no amount set is inactive and produces zero
//! rows; an active fee with a missing collector reference is a caller
//! error and fails the whole batch.

use crate::double_entry::EntrySpec;
use crate::error::{Error, Result};
use crate::types::{AccountId, Category, Currency, FeeAmount, WalletId};

/// The party a fee is drawn from
///
/// By default the principal's payer and its destination-currency wallet
/// (the sender-side bridge when the principal was bridged); the forex
/// receiver-pays case overrides this to the receiver and their
/// true-currency wallet.
#[derive(Debug, Clone)]
pub struct FeePayer {
    /// Paying account
    pub account: AccountId,

    /// Destination-currency wallet the fee is drawn from
    pub wallet: WalletId,
}

/// One parameterized fee leg
#[derive(Debug, Clone)]
pub struct FeeLeg {
    collector_account: Option<AccountId>,
    collector_wallet: Option<WalletId>,
    amount: Option<FeeAmount>,
    category: Category,
    account_field: &'static str,
    wallet_field: &'static str,
    amount_field: &'static str,
}

impl FeeLeg {
    /// Fee owed to the wallet provider (host)
    pub fn wallet_provider(
        collector_account: Option<AccountId>,
        collector_wallet: Option<WalletId>,
        amount: Option<FeeAmount>,
    ) -> Self {
        Self {
            collector_account,
            collector_wallet,
            amount,
            category: Category::WalletProvider,
            account_field: "wallet_provider_account_id",
            wallet_field: "wallet_provider_wallet_id",
            amount_field: "wallet_provider_fee",
        }
    }

    /// Fee owed to the platform
    pub fn platform(
        collector_account: Option<AccountId>,
        collector_wallet: Option<WalletId>,
        amount: Option<FeeAmount>,
    ) -> Self {
        Self {
            collector_account,
            collector_wallet,
            amount,
            category: Category::Platform,
            account_field: "platform_account_id",
            wallet_field: "platform_wallet_id",
            amount_field: "platform_fee",
        }
    }

    /// Fee owed to the payment provider (processor)
    pub fn payment_provider(
        collector_account: Option<AccountId>,
        collector_wallet: Option<WalletId>,
        amount: Option<FeeAmount>,
    ) -> Self {
        Self {
            collector_account,
            collector_wallet,
            amount,
            category: Category::PaymentProvider,
            account_field: "payment_provider_account_id",
            wallet_field: "payment_provider_wallet_id",
            amount_field: "payment_provider_fee",
        }
    }

    /// Whether this fee participates in the batch at all
    pub fn is_active(&self) -> bool {
        self.amount.is_some()
    }

    /// Billed total in minor units, always rounded to an integer unit
    pub fn total_fee(&self, fee_base: i64) -> Result<i64> {
        let amount = self
            .amount
            .ok_or(Error::Configuration {
                field: self.amount_field,
            })?;
        amount.total(fee_base)
    }

    /// Build this fee's provisional entry
    ///
    /// Validates that the collector account, collector wallet and fee
    /// amount are all set, naming the missing field otherwise.
    pub fn entry_spec(
        &self,
        payer: &FeePayer,
        fee_base: i64,
        fee_currency: &Currency,
    ) -> Result<EntrySpec> {
        let collector_account =
            self.collector_account
                .clone()
                .ok_or(Error::Configuration {
                    field: self.account_field,
                })?;
        let collector_wallet = self.collector_wallet.ok_or(Error::Configuration {
            field: self.wallet_field,
        })?;
        let total = self.total_fee(fee_base)?;

        Ok(EntrySpec {
            from_account: payer.account.clone(),
            to_account: collector_account,
            from_wallet: payer.wallet,
            to_wallet: collector_wallet,
            amount: total,
            currency: fee_currency.clone(),
            category: self.category,
        })
    }
}
