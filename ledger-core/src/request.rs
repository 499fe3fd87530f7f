//! Incoming transaction requests
//!
//! Two shapes come in from upstream. `TransactionRequest` is the
//! ledger-native form the strategies consume. `LegacyTransaction` is
//! the upstream platform's transaction model; `parse_legacy` maps its
//! field names, flips the stored-negative fee amounts positive, derives
//! display metadata for the from/to wallets and synthesizes the
//! wallet-provider / payment-provider wallet descriptors implied by the
//! host, payment-method, expense or order attribution.

use crate::conversion::ConversionSide;
use crate::types::{AccountId, Currency, FeeAmount, WalletSpec};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A transaction request in ledger form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Paying account
    pub from_account_id: AccountId,

    /// Receiving account
    pub to_account_id: AccountId,

    /// Amount to be sent, in minor units of `currency`
    pub amount: i64,

    /// Currency to be sent
    pub currency: Currency,

    /// Amount to be received (forex only)
    pub destination_amount: Option<i64>,

    /// Currency to be received (forex only)
    pub destination_currency: Option<Currency>,

    /// Stated exchange rate (forex only)
    pub forex_rate: Option<Decimal>,

    /// Whether the sender absorbs the fees (the receiver nets the full
    /// destination amount only when this is set)
    #[serde(default)]
    pub sender_pay_fees: bool,

    /// Which side bridges a currency conversion
    #[serde(default)]
    pub conversion_side: ConversionSide,

    /// Fee owed to the wallet provider, if any
    pub wallet_provider_fee: Option<FeeAmount>,

    /// Fee owed to the platform, if any
    pub platform_fee: Option<FeeAmount>,

    /// Fee owed to the payment provider, if any
    pub payment_provider_fee: Option<FeeAmount>,

    /// Sender's wallet descriptor
    pub from_wallet: WalletSpec,

    /// Receiver's wallet descriptor
    pub to_wallet: WalletSpec,

    /// Wallet-provider fee collector, when implied by the request
    pub wallet_provider_wallet: Option<WalletSpec>,

    /// Payment-provider wallet (conversion bridge counterparty and fee
    /// collector); mandatory for forex requests
    pub payment_provider_wallet: Option<WalletSpec>,

    /// Upstream legacy credit transaction id
    pub legacy_credit_transaction_id: Option<i64>,

    /// Upstream legacy debit transaction id
    pub legacy_debit_transaction_id: Option<i64>,

    /// Upstream legacy refund transaction id
    pub legacy_refund_transaction_id: Option<i64>,

    /// Ledger group being reversed (refunds only)
    pub refund_transaction_group_id: Option<Uuid>,

    /// Free-form description
    pub description: Option<String>,

    /// Request creation time; defaults to now at generation
    pub created_at: Option<DateTime<Utc>>,
}

impl TransactionRequest {
    /// Whether this request crosses currencies
    pub fn is_forex(&self) -> bool {
        match &self.destination_currency {
            Some(destination) => *destination != self.currency,
            None => false,
        }
    }

    /// Whether this request reverses an earlier one
    ///
    /// Either an explicit ledger group back-reference, or the legacy
    /// refund linkage: a credit id and a refund id both present with
    /// the credit created after the refund.
    pub fn is_refund(&self) -> bool {
        if self.refund_transaction_group_id.is_some() {
            return true;
        }
        matches!(
            (
                self.legacy_credit_transaction_id,
                self.legacy_refund_transaction_id,
            ),
            (Some(credit), Some(refund)) if credit > refund
        )
    }
}

/// The upstream platform's transaction model, as received
///
/// Field names follow the legacy wire shape verbatim; only the fields
/// the ledger consumes are declared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyTransaction {
    /// Legacy credit transaction id
    pub id: i64,

    /// Legacy debit transaction id
    #[serde(rename = "debitId", default)]
    pub debit_id: Option<i64>,

    /// Paying collective
    #[serde(rename = "FromCollectiveId")]
    pub from_collective_id: i64,

    /// Receiving collective
    #[serde(rename = "CollectiveId")]
    pub collective_id: i64,

    /// Receiving collective's fiscal host, when hosted
    #[serde(rename = "HostCollectiveId", default)]
    pub host_collective_id: Option<i64>,

    /// Receiving collective's standing host
    #[serde(rename = "CollectiveHostId", default)]
    pub collective_host_id: Option<i64>,

    /// Amount in minor units of `currency`
    pub amount: i64,

    /// Transaction currency
    pub currency: String,

    /// Host currency (destination currency for forex)
    #[serde(rename = "hostCurrency", default)]
    pub host_currency: Option<String>,

    /// Amount in host currency (destination amount for forex)
    #[serde(rename = "amountInHostCurrency", default)]
    pub amount_in_host_currency: Option<i64>,

    /// Stated exchange rate
    #[serde(rename = "hostCurrencyFxRate", default)]
    pub host_currency_fx_rate: Option<f64>,

    /// Host fee, stored negative upstream
    #[serde(rename = "hostFeeInHostCurrency", default)]
    pub host_fee_in_host_currency: Option<i64>,

    /// Platform fee, stored negative upstream
    #[serde(rename = "platformFeeInHostCurrency", default)]
    pub platform_fee_in_host_currency: Option<i64>,

    /// Payment processor fee, stored negative upstream
    #[serde(rename = "paymentProcessorFeeInHostCurrency", default)]
    pub payment_processor_fee_in_host_currency: Option<i64>,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Legacy refund linkage
    #[serde(rename = "RefundTransactionId", default)]
    pub refund_transaction_id: Option<i64>,

    /// Payment method attribution
    #[serde(rename = "PaymentMethodId", default)]
    pub payment_method_id: Option<i64>,

    /// Expense attribution
    #[serde(rename = "ExpenseId", default)]
    pub expense_id: Option<i64>,

    /// Order attribution
    #[serde(rename = "OrderId", default)]
    pub order_id: Option<i64>,

    /// Receiving collective slug
    #[serde(rename = "collectiveSlug", default)]
    pub collective_slug: Option<String>,

    /// Paying collective slug
    #[serde(rename = "fromCollectiveSlug", default)]
    pub from_collective_slug: Option<String>,

    /// Standing host slug
    #[serde(rename = "collectiveHostSlug", default)]
    pub collective_host_slug: Option<String>,

    /// Fiscal host slug
    #[serde(rename = "hostCollectiveSlug", default)]
    pub host_collective_slug: Option<String>,

    /// Payment method owner slug
    #[serde(rename = "paymentMethodCollectiveSlug", default)]
    pub payment_method_collective_slug: Option<String>,

    /// Payment method owner id
    #[serde(rename = "paymentMethodCollectiveId", default)]
    pub payment_method_collective_id: Option<i64>,

    /// Payment method service, e.g. `stripe`
    #[serde(rename = "paymentMethodService", default)]
    pub payment_method_service: Option<String>,

    /// Payment method type, e.g. `creditcard`
    #[serde(rename = "paymentMethodType", default)]
    pub payment_method_type: Option<String>,

    /// Expense payout method, e.g. `paypal`
    #[serde(rename = "expensePayoutMethod", default)]
    pub expense_payout_method: Option<String>,

    /// Expense owner slug
    #[serde(rename = "expenseCollectiveSlug", default)]
    pub expense_collective_slug: Option<String>,

    /// Expense owner id
    #[serde(rename = "expenseCollectiveId", default)]
    pub expense_collective_id: Option<i64>,

    /// Order payment method owner slug
    #[serde(rename = "orderPaymentMethodCollectiveSlug", default)]
    pub order_payment_method_collective_slug: Option<String>,

    /// Order payment method owner id
    #[serde(rename = "orderPaymentMethodCollectiveId", default)]
    pub order_payment_method_collective_id: Option<i64>,

    /// Order payment method service
    #[serde(rename = "orderPaymentMethodService", default)]
    pub order_payment_method_service: Option<String>,

    /// Order originator slug
    #[serde(rename = "orderFromCollectiveSlug", default)]
    pub order_from_collective_slug: Option<String>,

    /// Order originator id
    #[serde(rename = "orderFromCollectiveId", default)]
    pub order_from_collective_id: Option<i64>,

    /// Upstream creation time
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LegacyTransaction {
    /// Deserialize one legacy transaction from its JSON wire form
    pub fn from_json(payload: &str) -> crate::Result<Self> {
        serde_json::from_str(payload)
            .map_err(|e| crate::Error::Config(format!("bad legacy payload: {}", e)))
    }
}

/// Fees arrive negative on legacy CREDIT transactions; flip them
/// positive, dropping zeros (a zero fee is an inactive fee).
fn flip_fee(fee: Option<i64>) -> Option<FeeAmount> {
    match fee {
        Some(value) if value != 0 => Some(FeeAmount::Fixed(-value)),
        _ => None,
    }
}

fn slug_or_id(slug: &Option<String>, id: i64) -> String {
    slug.clone().unwrap_or_else(|| id.to_string())
}

/// Map a legacy transaction into ledger form
pub fn parse_legacy(legacy: &LegacyTransaction) -> TransactionRequest {
    let currency = Currency::new(legacy.currency.as_str());
    let host_currency = legacy
        .host_currency
        .as_deref()
        .map(Currency::new)
        .unwrap_or_else(|| currency.clone());
    let amount_in_host_currency = legacy.amount_in_host_currency.unwrap_or(legacy.amount);

    let from_account = AccountId::new(legacy.from_collective_id.to_string());
    let to_account = AccountId::new(legacy.collective_id.to_string());
    let collective_slug = slug_or_id(&legacy.collective_slug, legacy.collective_id);
    let from_slug = slug_or_id(&legacy.from_collective_slug, legacy.from_collective_id);

    let wallet_provider_fee = flip_fee(legacy.host_fee_in_host_currency);
    let platform_fee = flip_fee(legacy.platform_fee_in_host_currency);
    let payment_provider_fee = flip_fee(legacy.payment_processor_fee_in_host_currency);

    let to_wallet = derive_to_wallet(legacy, &host_currency, &collective_slug, &to_account);
    let wallet_provider_wallet = if wallet_provider_fee.is_some() {
        derive_wallet_provider(legacy)
    } else {
        None
    };
    let (from_wallet, payment_provider_wallet) =
        derive_from_and_payment_provider(legacy, &currency, &from_slug, &from_account);

    TransactionRequest {
        from_account_id: from_account,
        to_account_id: to_account,
        amount: legacy.amount,
        currency,
        destination_amount: Some(amount_in_host_currency),
        destination_currency: Some(host_currency),
        forex_rate: legacy
            .host_currency_fx_rate
            .and_then(Decimal::from_f64_retain),
        sender_pay_fees: false,
        conversion_side: ConversionSide::default(),
        wallet_provider_fee,
        platform_fee,
        payment_provider_fee,
        from_wallet,
        to_wallet,
        wallet_provider_wallet,
        payment_provider_wallet,
        legacy_credit_transaction_id: Some(legacy.id),
        legacy_debit_transaction_id: legacy.debit_id,
        legacy_refund_transaction_id: legacy.refund_transaction_id,
        refund_transaction_group_id: None,
        description: legacy.description.clone(),
        created_at: legacy.created_at,
    }
}

/// The receiver's wallet descriptor, owned by their host when hosted
fn derive_to_wallet(
    legacy: &LegacyTransaction,
    host_currency: &Currency,
    collective_slug: &str,
    to_account: &AccountId,
) -> WalletSpec {
    let (owner_slug, owner_id) = if let Some(host_id) = legacy.host_collective_id {
        (slug_or_id(&legacy.host_collective_slug, host_id), host_id.to_string())
    } else if let Some(host_id) = legacy.collective_host_id {
        (slug_or_id(&legacy.collective_host_slug, host_id), host_id.to_string())
    } else {
        (collective_slug.to_string(), to_account.as_str().to_string())
    };
    WalletSpec::new(
        format!(
            "owner: {}, account: {}, {}",
            owner_slug, collective_slug, host_currency
        ),
        host_currency.clone(),
        AccountId::new(owner_id),
    )
}

/// The host-fee collector, from the host, expense payout method, or
/// order payment method, in that priority order
fn derive_wallet_provider(legacy: &LegacyTransaction) -> Option<WalletSpec> {
    if let Some(host_id) = legacy.host_collective_id {
        let slug = slug_or_id(&legacy.host_collective_slug, host_id);
        return Some(WalletSpec::new(
            format!("owner and account: {}, multi-currency", slug),
            Currency::multi(),
            AccountId::new(host_id.to_string()),
        ));
    }
    if legacy.expense_id.is_some() {
        let payout = legacy.expense_payout_method.clone()?;
        return Some(WalletSpec::new(
            format!("owner and account: {}, multi-currency", payout),
            Currency::multi(),
            AccountId::new(payout),
        ));
    }
    let owner_id = legacy.order_payment_method_collective_id?;
    let slug = slug_or_id(&legacy.order_payment_method_collective_slug, owner_id);
    Some(WalletSpec::new(
        format!("owner and account: {}, multi-currency", slug),
        Currency::multi(),
        AccountId::new(owner_id.to_string()),
    ))
}

/// The sender's wallet plus the synthesized payment-provider wallet,
/// from the payment method, expense, or order attribution
fn derive_from_and_payment_provider(
    legacy: &LegacyTransaction,
    currency: &Currency,
    from_slug: &str,
    from_account: &AccountId,
) -> (WalletSpec, Option<WalletSpec>) {
    if let Some(owner_id) = legacy.payment_method_collective_id {
        let owner_slug = slug_or_id(&legacy.payment_method_collective_slug, owner_id);
        let from_wallet = WalletSpec::new(
            format!("owner: {}, account: {}, {}", owner_slug, from_slug, currency),
            currency.clone(),
            AccountId::new(owner_id.to_string()),
        );
        let service = legacy
            .payment_method_service
            .clone()
            .unwrap_or_else(|| "opencollective".to_string());
        let provider = WalletSpec::new(
            legacy
                .payment_method_type
                .clone()
                .unwrap_or_else(|| service.clone()),
            Currency::multi(),
            AccountId::new(service),
        );
        return (from_wallet, Some(provider));
    }

    if legacy.expense_id.is_some() {
        let owner_slug = legacy
            .expense_collective_slug
            .clone()
            .unwrap_or_else(|| from_slug.to_string());
        let owner_id = legacy
            .expense_collective_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| from_account.as_str().to_string());
        let from_wallet = WalletSpec::new(
            format!("owner: {}, account: {}, {}", owner_slug, from_slug, currency),
            currency.clone(),
            AccountId::new(owner_id),
        );
        let provider = legacy.expense_payout_method.clone().map(|payout| {
            WalletSpec::new(
                format!("owner and account: {}, multi-currency", payout),
                Currency::multi(),
                AccountId::new(payout),
            )
        });
        return (from_wallet, provider);
    }

    // Order attribution: the payment method owner when present, the
    // order originator otherwise.
    if let Some(owner_id) = legacy.order_payment_method_collective_id {
        let owner_slug = slug_or_id(&legacy.order_payment_method_collective_slug, owner_id);
        let from_wallet = WalletSpec::new(
            format!("owner: {}, account: {}, {}", owner_slug, from_slug, currency),
            currency.clone(),
            AccountId::new(owner_id.to_string()),
        );
        let service = legacy
            .order_payment_method_service
            .clone()
            .unwrap_or_else(|| "opencollective".to_string());
        let provider = WalletSpec::new(
            format!("account and owner: {}", service),
            Currency::multi(),
            AccountId::new(service),
        );
        return (from_wallet, Some(provider));
    }

    let owner_slug = legacy
        .order_from_collective_slug
        .clone()
        .unwrap_or_else(|| from_slug.to_string());
    let owner_id = legacy
        .order_from_collective_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| from_account.as_str().to_string());
    let from_wallet = WalletSpec::new(
        format!("owner: {}, account: {}, {}", owner_slug, from_slug, currency),
        currency.clone(),
        AccountId::new(owner_id.clone()),
    );
    let provider = legacy.order_id.map(|order_id| {
        let composite = format!("{}_{}", owner_id, order_id);
        WalletSpec::new(
            format!("payment provider, account and owner: {}", composite),
            Currency::multi(),
            AccountId::new(composite),
        )
    });
    (from_wallet, provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy() -> LegacyTransaction {
        LegacyTransaction {
            id: 100,
            debit_id: Some(99),
            from_collective_id: 10,
            collective_id: 20,
            host_collective_id: Some(30),
            amount: 3000,
            currency: "EUR".to_string(),
            host_currency: Some("USD".to_string()),
            amount_in_host_currency: Some(4500),
            host_currency_fx_rate: Some(1.5),
            host_fee_in_host_currency: Some(-225),
            platform_fee_in_host_currency: Some(-100),
            payment_processor_fee_in_host_currency: None,
            collective_slug: Some("babel".to_string()),
            from_collective_slug: Some("donor".to_string()),
            host_collective_slug: Some("osc".to_string()),
            payment_method_collective_id: Some(10),
            payment_method_collective_slug: Some("donor".to_string()),
            payment_method_service: Some("stripe".to_string()),
            payment_method_type: Some("creditcard".to_string()),
            payment_method_id: Some(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_fees_flip_positive() {
        let request = parse_legacy(&legacy());
        assert_eq!(request.wallet_provider_fee, Some(FeeAmount::Fixed(225)));
        assert_eq!(request.platform_fee, Some(FeeAmount::Fixed(100)));
        assert_eq!(request.payment_provider_fee, None);
    }

    #[test]
    fn test_host_currency_becomes_destination() {
        let request = parse_legacy(&legacy());
        assert_eq!(request.currency, Currency::new("EUR"));
        assert_eq!(request.destination_currency, Some(Currency::new("USD")));
        assert_eq!(request.destination_amount, Some(4500));
        assert!(request.is_forex());
    }

    #[test]
    fn test_domestic_defaults_destination_to_source() {
        let mut legacy = legacy();
        legacy.host_currency = None;
        legacy.amount_in_host_currency = None;
        let request = parse_legacy(&legacy);
        assert_eq!(request.destination_currency, Some(Currency::new("EUR")));
        assert_eq!(request.destination_amount, Some(3000));
        assert!(!request.is_forex());
    }

    #[test]
    fn test_hosted_receiver_wallet_owned_by_host() {
        let request = parse_legacy(&legacy());
        assert_eq!(request.to_wallet.owner_account_id, AccountId::new("30"));
        assert_eq!(request.to_wallet.name, "owner: osc, account: babel, USD");
        assert_eq!(request.to_wallet.currency, Currency::new("USD"));
    }

    #[test]
    fn test_wallet_provider_synthesized_from_host() {
        let request = parse_legacy(&legacy());
        let provider = request.wallet_provider_wallet.unwrap();
        assert_eq!(provider.owner_account_id, AccountId::new("30"));
        assert!(provider.currency.is_multi());
    }

    #[test]
    fn test_payment_provider_from_payment_method_service() {
        let request = parse_legacy(&legacy());
        let provider = request.payment_provider_wallet.unwrap();
        assert_eq!(provider.owner_account_id, AccountId::new("stripe"));
        assert_eq!(provider.name, "creditcard");
        assert!(provider.currency.is_multi());
    }

    #[test]
    fn test_order_without_payment_method_gets_composite_provider() {
        let mut legacy = legacy();
        legacy.payment_method_id = None;
        legacy.payment_method_collective_id = None;
        legacy.order_id = Some(77);
        legacy.order_from_collective_id = Some(10);
        legacy.order_from_collective_slug = Some("donor".to_string());
        let request = parse_legacy(&legacy);
        let provider = request.payment_provider_wallet.unwrap();
        assert_eq!(provider.owner_account_id, AccountId::new("10_77"));
    }

    #[test]
    fn test_legacy_refund_detection() {
        let mut request = parse_legacy(&legacy());
        assert!(!request.is_refund());
        request.legacy_refund_transaction_id = Some(50); // credit 100 > refund 50
        assert!(request.is_refund());
        request.legacy_refund_transaction_id = Some(150);
        assert!(!request.is_refund());
    }

    #[test]
    fn test_from_json() {
        let payload = r#"{
            "id": 1, "FromCollectiveId": 2, "CollectiveId": 3,
            "amount": 500, "currency": "usd",
            "platformFeeInHostCurrency": -25
        }"#;
        let legacy = LegacyTransaction::from_json(payload).unwrap();
        let request = parse_legacy(&legacy);
        assert_eq!(request.amount, 500);
        assert_eq!(request.platform_fee, Some(FeeAmount::Fixed(25)));
    }
}
