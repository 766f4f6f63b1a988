use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, trace};

use crate::helius_client::{RawTokenTransfer, RawTransaction};
use jitter_core::{TransferEvent, TransferSide, WalletTransaction};

/// Adapter from provider-specific transaction payloads to the canonical
/// transfer shape the engine consumes.
///
/// Direction is resolved here, against the analyzed wallet: a transfer out
/// of the wallet is a sell, into it a buy, and movements that touch neither
/// side are dropped. Malformed numeric fields degrade to zero instead of
/// failing the transaction.
pub struct TransactionNormalizer {
    wallet_address: String,
}

impl TransactionNormalizer {
    /// Create a normalizer for a specific wallet
    pub fn new(wallet_address: &str) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
        }
    }

    /// Normalize a raw transaction batch into canonical wallet transactions
    pub fn normalize(&self, raw_transactions: &[RawTransaction]) -> Vec<WalletTransaction> {
        let mut transactions = Vec::with_capacity(raw_transactions.len());

        for raw in raw_transactions {
            let timestamp: Option<DateTime<Utc>> = raw
                .timestamp
                .and_then(|unix| DateTime::from_timestamp(unix, 0));

            let transfers: Vec<TransferEvent> = raw
                .token_transfers
                .iter()
                .filter_map(|transfer| self.normalize_transfer(transfer))
                .collect();

            if transfers.is_empty() {
                trace!(
                    "Transaction {:?} carried no transfers touching wallet {}",
                    raw.signature,
                    self.wallet_address
                );
            }

            transactions.push(WalletTransaction {
                signature: raw.signature.clone(),
                timestamp,
                transfers,
            });
        }

        debug!(
            "Normalized {} raw transactions for wallet {}",
            transactions.len(),
            self.wallet_address
        );

        transactions
    }

    /// Normalize one raw transfer; None when it does not belong to the
    /// analyzed wallet or has no usable token identity
    fn normalize_transfer(&self, raw: &RawTokenTransfer) -> Option<TransferEvent> {
        let mint = raw.mint.as_deref()?.trim();
        if mint.is_empty() {
            return None;
        }

        // Out of the analyzed wallet = sell; into it = buy. Self-transfers
        // (both sides equal to the wallet) count as outgoing.
        let from_wallet = raw.from_user_account.as_deref() == Some(self.wallet_address.as_str());
        let to_wallet = raw.to_user_account.as_deref() == Some(self.wallet_address.as_str());
        let side = if from_wallet {
            TransferSide::Out
        } else if to_wallet {
            TransferSide::In
        } else {
            return None;
        };

        let amount = coerce_decimal(raw.token_amount.as_ref());

        // Per-token price if the provider gave one, otherwise derived from
        // the transfer's total USD value
        let mut price_usd = coerce_decimal(raw.price_usd.as_ref());
        if price_usd <= Decimal::ZERO && amount > Decimal::ZERO {
            let usd_value = coerce_decimal(raw.usd_value.as_ref());
            if usd_value > Decimal::ZERO {
                price_usd = usd_value.checked_div(amount).unwrap_or(Decimal::ZERO);
            }
        }

        Some(TransferEvent {
            mint: mint.to_string(),
            symbol: clean_label(raw.token_symbol.as_deref()),
            name: clean_label(raw.token_name.as_deref()),
            amount,
            price_usd,
            side,
        })
    }
}

/// Coerce a JSON number or numeric string to a Decimal, degrading anything
/// malformed (including NaN/Infinity) to zero
fn coerce_decimal(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

fn clean_label(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
