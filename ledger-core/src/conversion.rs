//! Currency-conversion bridging legs
//!
//! A cross-currency transfer cannot move money between two wallets of
//! different denominations directly. Instead the exchange is modeled as
//! two double-entry pairs routed through the payment provider's
//! multi-currency wallet, at the rate stated on the request. Two
//! variants exist, distinguished by which side of the transfer stages
//! its funds through a scratch bridging wallet.
//!
//! Amounts are taken verbatim from the request (`amount` on the
//! source-currency leg, `destination_amount` on the destination leg);
//! nothing is re-derived from the rate.

use crate::double_entry::EntrySpec;
use crate::types::{AccountId, Category, Currency, WalletId};
use serde::{Deserialize, Serialize};

/// Which side of the transfer bridges the conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConversionSide {
    /// The sender converts into a temporary destination-currency wallet
    /// before the principal leg runs
    #[default]
    Sender,
    /// The principal leg runs first against a source-currency shadow of
    /// the receiver's wallet; conversion moves the funds onward
    Receiver,
}

/// Everything the bridging legs need besides the bridged party
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Payment provider's owning account
    pub provider_account: AccountId,

    /// Payment provider's multi-currency wallet
    pub provider_wallet: WalletId,

    /// Amount sent, in the source currency
    pub source_amount: i64,

    /// Source currency
    pub source_currency: Currency,

    /// Amount received, in the destination currency
    pub destination_amount: i64,

    /// Destination currency
    pub destination_currency: Currency,
}

/// Sender-side bridging legs
///
/// Leg one drains the sender's source-currency wallet into the payment
/// provider; leg two fills the sender's temporary destination-currency
/// bridge wallet from the provider.
pub fn sender_side_specs(
    exchange: &Exchange,
    sender: &AccountId,
    source_wallet: WalletId,
    bridge_wallet: WalletId,
) -> [EntrySpec; 2] {
    [
        EntrySpec {
            from_account: sender.clone(),
            to_account: exchange.provider_account.clone(),
            from_wallet: source_wallet,
            to_wallet: exchange.provider_wallet,
            amount: exchange.source_amount,
            currency: exchange.source_currency.clone(),
            category: Category::CurrencyConversion,
        },
        EntrySpec {
            from_account: exchange.provider_account.clone(),
            to_account: sender.clone(),
            from_wallet: exchange.provider_wallet,
            to_wallet: bridge_wallet,
            amount: exchange.destination_amount,
            currency: exchange.destination_currency.clone(),
            category: Category::CurrencyConversion,
        },
    ]
}

/// Receiver-side bridging legs
///
/// Leg one drains the receiver's source-currency shadow wallet into the
/// payment provider; leg two fills the receiver's true-currency wallet.
pub fn receiver_side_specs(
    exchange: &Exchange,
    receiver: &AccountId,
    shadow_wallet: WalletId,
    receiver_wallet: WalletId,
) -> [EntrySpec; 2] {
    [
        EntrySpec {
            from_account: receiver.clone(),
            to_account: exchange.provider_account.clone(),
            from_wallet: shadow_wallet,
            to_wallet: exchange.provider_wallet,
            amount: exchange.source_amount,
            currency: exchange.source_currency.clone(),
            category: Category::CurrencyConversion,
        },
        EntrySpec {
            from_account: exchange.provider_account.clone(),
            to_account: receiver.clone(),
            from_wallet: exchange.provider_wallet,
            to_wallet: receiver_wallet,
            amount: exchange.destination_amount,
            currency: exchange.destination_currency.clone(),
            category: Category::CurrencyConversion,
        },
    ]
}
