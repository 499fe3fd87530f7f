//! Transaction strategies
//!
//! One incoming request expands into an ordered batch of double-entry
//! rows. Which expansion runs is a pure function of the request shape;
//! the four variants cover domestic and cross-currency transfers and
//! their reversals. Emission order is part of the contract: group
//! sequencing derives from it, so each variant emits its legs in a
//! fixed relative order.

use crate::config::PlatformConfig;
use crate::conversion::{self, ConversionSide, Exchange};
use crate::double_entry::{double_entry_pair, EntrySpec, GroupStamp};
use crate::error::{Error, Result};
use crate::fees::{FeeLeg, FeePayer};
use crate::request::TransactionRequest;
use crate::types::{Category, Currency, LedgerTransaction, WalletSpec};
use crate::wallets::WalletResolver;

/// The four expansion variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Regular,
    Forex,
    Refund,
    ForexRefund,
}

impl Strategy {
    /// Pure decision table over the request shape
    pub fn select(request: &TransactionRequest) -> Strategy {
        match (request.is_forex(), request.is_refund()) {
            (false, false) => Strategy::Regular,
            (false, true) => Strategy::Refund,
            (true, false) => Strategy::Forex,
            (true, true) => Strategy::ForexRefund,
        }
    }
}

/// Expand one request into its full ordered batch
///
/// Rows come back with `transaction_group_sequence` stamped over the
/// whole batch in emission order. Wallet resolution failures abort
/// before anything is emitted.
pub async fn generate<R: WalletResolver>(
    resolver: &R,
    platform: &PlatformConfig,
    request: &TransactionRequest,
    stamp: &GroupStamp,
) -> Result<Vec<LedgerTransaction>> {
    let strategy = Strategy::select(request);

    let mut specs = match strategy {
        Strategy::Regular => regular_specs(resolver, platform, request).await?,
        Strategy::Forex => forex_specs(resolver, platform, request).await?,
        // Refunds replay the counterpart's shape with every leg's
        // parties inverted, in the same relative order
        Strategy::Refund => invert(regular_specs(resolver, platform, request).await?),
        Strategy::ForexRefund => invert(forex_specs(resolver, platform, request).await?),
    };

    tracing::debug!(
        ?strategy,
        legs = specs.len(),
        transaction_group_id = %stamp.transaction_group_id,
        "Expanding transaction request"
    );

    let mut rows = Vec::with_capacity(specs.len() * 2);
    for spec in specs.drain(..) {
        rows.extend(double_entry_pair(&spec, stamp));
    }
    for (index, row) in rows.iter_mut().enumerate() {
        row.transaction_group_sequence = index as u32;
    }
    Ok(rows)
}

fn invert(specs: Vec<EntrySpec>) -> Vec<EntrySpec> {
    specs.iter().map(EntrySpec::inverted).collect()
}

/// Domestic transfer: [principal, fees...]
///
/// The principal always carries the full stated amount; fees are drawn
/// from the sender's wallet as extra legs.
async fn regular_specs<R: WalletResolver>(
    resolver: &R,
    platform: &PlatformConfig,
    request: &TransactionRequest,
) -> Result<Vec<EntrySpec>> {
    let from_wallet = resolver
        .find_or_create_currency_wallet(&request.from_wallet)
        .await?;
    let to_wallet = resolver
        .find_or_create_currency_wallet(&request.to_wallet)
        .await?;

    let mut specs = vec![EntrySpec {
        from_account: request.from_account_id.clone(),
        to_account: request.to_account_id.clone(),
        from_wallet: from_wallet.id,
        to_wallet: to_wallet.id,
        amount: request.amount,
        currency: request.currency.clone(),
        category: Category::Account,
    }];

    let payer = FeePayer {
        account: request.from_account_id.clone(),
        wallet: from_wallet.id,
    };
    specs.extend(
        fee_specs(
            resolver,
            platform,
            request,
            &payer,
            request.amount.abs(),
            &request.currency,
        )
        .await?,
    );

    Ok(specs)
}

/// Cross-currency transfer: [principal, conversion legs, fees...]
///
/// The sender bridges by default: conversion runs out of the sender's
/// source-currency wallet, through the payment provider's
/// multi-currency wallet, into a temporary destination-currency wallet
/// the sender owns; the principal then runs bridge to receiver. When
/// the sender absorbs the fees the principal is reduced by their total
/// and the fee legs draw from the bridge; otherwise the receiver nets
/// the full destination amount and the fees draw from their wallet.
async fn forex_specs<R: WalletResolver>(
    resolver: &R,
    platform: &PlatformConfig,
    request: &TransactionRequest,
) -> Result<Vec<EntrySpec>> {
    // Mandatory before any resolution happens
    let destination_amount = request
        .destination_amount
        .ok_or(Error::missing("destination_amount"))?;
    let destination_currency = request
        .destination_currency
        .clone()
        .ok_or(Error::missing("destination_currency"))?;
    let provider_spec = request
        .payment_provider_wallet
        .as_ref()
        .ok_or(Error::missing("payment_provider_wallet"))?;

    let provider_wallet = resolver
        .find_or_create_currency_wallet(provider_spec)
        .await?;
    let from_wallet = resolver
        .find_or_create_currency_wallet(&request.from_wallet)
        .await?;
    let to_wallet = resolver
        .find_or_create_currency_wallet(&request.to_wallet)
        .await?;

    let exchange = Exchange {
        provider_account: provider_spec.owner_account_id.clone(),
        provider_wallet: provider_wallet.id,
        source_amount: request.amount,
        source_currency: request.currency.clone(),
        destination_amount,
        destination_currency: destination_currency.clone(),
    };

    match request.conversion_side {
        ConversionSide::Sender => {
            let bridge = resolver
                .find_or_create_temporary_currency_wallet(
                    &destination_currency,
                    &request.from_account_id,
                )
                .await?;
            let conversion_legs = conversion::sender_side_specs(
                &exchange,
                &request.from_account_id,
                from_wallet.id,
                bridge.id,
            );

            let payer = if request.sender_pay_fees {
                FeePayer {
                    account: request.from_account_id.clone(),
                    wallet: bridge.id,
                }
            } else {
                FeePayer {
                    account: request.to_account_id.clone(),
                    wallet: to_wallet.id,
                }
            };
            let fees = fee_specs(
                resolver,
                platform,
                request,
                &payer,
                destination_amount,
                &destination_currency,
            )
            .await?;

            // The receiver nets the full destination amount only when
            // the fees are not subtracted at the sender
            let fee_total: i64 = fees.iter().map(|fee| fee.amount).sum();
            let principal_amount = if request.sender_pay_fees {
                destination_amount - fee_total
            } else {
                destination_amount
            };

            let mut specs = vec![EntrySpec {
                from_account: request.from_account_id.clone(),
                to_account: request.to_account_id.clone(),
                from_wallet: bridge.id,
                to_wallet: to_wallet.id,
                amount: principal_amount,
                currency: destination_currency,
                category: Category::Account,
            }];
            specs.extend(conversion_legs);
            specs.extend(fees);
            Ok(specs)
        }
        ConversionSide::Receiver => {
            // Alternate path: the principal runs in the source currency
            // against a shadow of the receiver's wallet; conversion
            // then moves the funds into their true-currency wallet.
            // Fees always draw from the receiver here.
            let shadow = resolver
                .find_or_create_temporary_currency_wallet(
                    &request.currency,
                    &request.to_account_id,
                )
                .await?;
            let conversion_legs = conversion::receiver_side_specs(
                &exchange,
                &request.to_account_id,
                shadow.id,
                to_wallet.id,
            );

            let payer = FeePayer {
                account: request.to_account_id.clone(),
                wallet: to_wallet.id,
            };
            let fees = fee_specs(
                resolver,
                platform,
                request,
                &payer,
                destination_amount,
                &destination_currency,
            )
            .await?;

            let mut specs = vec![EntrySpec {
                from_account: request.from_account_id.clone(),
                to_account: request.to_account_id.clone(),
                from_wallet: from_wallet.id,
                to_wallet: shadow.id,
                amount: request.amount,
                currency: request.currency.clone(),
                category: Category::Account,
            }];
            specs.extend(conversion_legs);
            specs.extend(fees);
            Ok(specs)
        }
    }
}

/// The up-to-three fee legs, in waterfall order: payment provider,
/// platform, wallet provider
///
/// Inactive fees produce no legs and resolve no wallets. Active fees
/// with a missing collector reference fail the batch with the field
/// name.
async fn fee_specs<R: WalletResolver>(
    resolver: &R,
    platform: &PlatformConfig,
    request: &TransactionRequest,
    payer: &FeePayer,
    fee_base: i64,
    fee_currency: &Currency,
) -> Result<Vec<EntrySpec>> {
    let mut specs = Vec::new();

    if request.payment_provider_fee.is_some() {
        let (account, wallet) = match &request.payment_provider_wallet {
            Some(spec) => {
                let wallet = resolver.find_or_create_currency_wallet(spec).await?;
                (Some(spec.owner_account_id.clone()), Some(wallet.id))
            }
            None => (None, None),
        };
        let leg = FeeLeg::payment_provider(account, wallet, request.payment_provider_fee);
        specs.push(leg.entry_spec(payer, fee_base, fee_currency)?);
    }

    if request.platform_fee.is_some() {
        // The platform's collector wallet comes from service
        // configuration, not the request
        let spec = WalletSpec::new(
            platform.wallet_name.clone(),
            Currency::multi(),
            platform.account_id.clone(),
        );
        let wallet = resolver.find_or_create_currency_wallet(&spec).await?;
        let leg = FeeLeg::platform(
            Some(platform.account_id.clone()),
            Some(wallet.id),
            request.platform_fee,
        );
        specs.push(leg.entry_spec(payer, fee_base, fee_currency)?);
    }

    if request.wallet_provider_fee.is_some() {
        let (account, wallet) = match &request.wallet_provider_wallet {
            Some(spec) => {
                let wallet = resolver.find_or_create_currency_wallet(spec).await?;
                (Some(spec.owner_account_id.clone()), Some(wallet.id))
            }
            None => (None, None),
        };
        let leg = FeeLeg::wallet_provider(account, wallet, request.wallet_provider_fee);
        specs.push(leg.entry_spec(payer, fee_base, fee_currency)?);
    }

    Ok(specs)
}
