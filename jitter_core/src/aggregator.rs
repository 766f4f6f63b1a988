use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::{TokenAggregate, TokenStatus, TradeLeg, TransferEvent, TransferSide, WalletTransaction};

/// Transfer Aggregator: folds a flat transaction stream into per-token
/// position state.
///
/// Pure and deterministic for a given input ordering. The running price
/// averages are sequenced by event arrival order, so reordering the input
/// changes the computed averages for tokens with multiple observed prices.
pub struct TransferAggregator;

impl TransferAggregator {
    /// Group transfer events by token mint and accumulate running totals.
    ///
    /// Malformed numeric fields degrade to zero and one bad transfer never
    /// invalidates the rest of the wallet's history.
    pub fn aggregate(transactions: &[WalletTransaction]) -> HashMap<String, TokenAggregate> {
        let mut aggregates: HashMap<String, TokenAggregate> = HashMap::new();

        for transaction in transactions {
            if transaction.transfers.is_empty() {
                trace!(
                    "Skipping transaction {:?} with no transfer events",
                    transaction.signature
                );
                continue;
            }

            // Missing timestamps degrade to "now" rather than dropping the event
            let timestamp = transaction.timestamp.unwrap_or_else(Utc::now);

            for transfer in &transaction.transfers {
                Self::fold_transfer(&mut aggregates, transfer, timestamp);
            }
        }

        for aggregate in aggregates.values_mut() {
            Self::finalize(aggregate);
        }

        debug!(
            "Aggregated {} transactions into {} token positions",
            transactions.len(),
            aggregates.len()
        );

        aggregates
    }

    /// Fold a single transfer event into the aggregate for its token.
    ///
    /// The buy/sell averages use the incremental count-weighted running mean
    /// `(avg * n + p) / (n + 1)` over valid-priced observations, kept
    /// deliberately for behavioral compatibility with the historical
    /// calculation. Each transfer counts with equal weight regardless of its
    /// amount.
    fn fold_transfer(
        aggregates: &mut HashMap<String, TokenAggregate>,
        transfer: &TransferEvent,
        timestamp: DateTime<Utc>,
    ) {
        let aggregate = aggregates.entry(transfer.mint.clone()).or_insert_with(|| {
            TokenAggregate::new(
                &transfer.mint,
                transfer.symbol.as_deref(),
                transfer.name.as_deref(),
            )
        });

        // Identity fields: first plausible value wins, a later real value
        // only replaces the "Unknown" placeholder
        if aggregate.symbol == crate::UNKNOWN_LABEL {
            if let Some(symbol) = transfer.symbol.as_deref() {
                if !symbol.trim().is_empty() && symbol != crate::UNKNOWN_LABEL {
                    aggregate.symbol = symbol.to_string();
                }
            }
        }
        if aggregate.name == crate::UNKNOWN_LABEL {
            if let Some(name) = transfer.name.as_deref() {
                if !name.trim().is_empty() && name != crate::UNKNOWN_LABEL {
                    aggregate.name = name.to_string();
                }
            }
        }

        aggregate.total_transactions += 1;

        // Negative amounts clamp to zero; a transfer that ends up with a
        // non-positive amount contributes to total_transactions only
        let amount = transfer.amount.max(Decimal::ZERO);
        if amount <= Decimal::ZERO {
            trace!(
                "Transfer for {} has non-positive amount, counted but not accumulated",
                transfer.mint
            );
            return;
        }

        // A price of exactly zero means "unknown": it stays out of the
        // averages and best/worst tracking but the transfer still counts
        let price = transfer.price_usd.max(Decimal::ZERO);

        aggregate.legs.push(TradeLeg {
            timestamp,
            side: transfer.side,
            amount,
            price_usd: price,
        });

        match transfer.side {
            TransferSide::In => {
                aggregate.total_bought += amount;
                aggregate.buy_count += 1;
                aggregate.buy_dates.push(timestamp);
                update_date_range(
                    &mut aggregate.first_buy_date,
                    &mut aggregate.last_buy_date,
                    timestamp,
                );

                if price > Decimal::ZERO {
                    aggregate.avg_buy_price =
                        running_average(aggregate.avg_buy_price, aggregate.priced_buy_count, price);
                    aggregate.priced_buy_count += 1;
                    aggregate.best_buy_price = Some(match aggregate.best_buy_price {
                        Some(best) => best.min(price),
                        None => price,
                    });
                }
            }
            TransferSide::Out => {
                aggregate.total_sold += amount;
                aggregate.sell_count += 1;
                aggregate.sell_dates.push(timestamp);
                update_date_range(
                    &mut aggregate.first_sell_date,
                    &mut aggregate.last_sell_date,
                    timestamp,
                );

                if price > Decimal::ZERO {
                    aggregate.avg_sell_price = running_average(
                        aggregate.avg_sell_price,
                        aggregate.priced_sell_count,
                        price,
                    );
                    aggregate.priced_sell_count += 1;
                    // Minimum realized sale price = the worst individual exit
                    aggregate.worst_sell_price = Some(match aggregate.worst_sell_price {
                        Some(worst) => worst.min(price),
                        None => price,
                    });
                }
            }
        }
    }

    /// Close out an aggregate after all events have been folded in
    fn finalize(aggregate: &mut TokenAggregate) {
        // Excess sells beyond recorded buys clamp to zero, never negative
        aggregate.current_held =
            (aggregate.total_bought - aggregate.total_sold).max(Decimal::ZERO);
        aggregate.total_volume_traded = aggregate.total_bought + aggregate.total_sold;

        // Best/worst resolve to the realized average when no valid price
        // was ever observed
        if aggregate.best_buy_price.is_none() {
            aggregate.best_buy_price = Some(aggregate.avg_buy_price);
        }
        if aggregate.worst_sell_price.is_none() {
            aggregate.worst_sell_price = Some(aggregate.avg_sell_price);
        }

        aggregate.status = derive_status(aggregate.total_sold, aggregate.current_held);
    }
}

/// Incremental count-weighted running mean over valid-priced observations
fn running_average(avg: Decimal, observations: u32, price: Decimal) -> Decimal {
    if observations == 0 {
        price
    } else {
        let n = Decimal::from(observations);
        (avg * n + price) / (n + Decimal::ONE)
    }
}

/// Widen a chronological first/last pair to include a new timestamp
fn update_date_range(
    first: &mut Option<DateTime<Utc>>,
    last: &mut Option<DateTime<Utc>>,
    timestamp: DateTime<Utc>,
) {
    match first {
        Some(existing) if *existing <= timestamp => {}
        _ => *first = Some(timestamp),
    }
    match last {
        Some(existing) if *existing >= timestamp => {}
        _ => *last = Some(timestamp),
    }
}

/// Status follows purely from the totals
pub(crate) fn derive_status(total_sold: Decimal, current_held: Decimal) -> TokenStatus {
    if total_sold <= Decimal::ZERO {
        TokenStatus::NeverSold
    } else if current_held <= Decimal::ZERO {
        TokenStatus::Sold
    } else {
        TokenStatus::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn transfer(mint: &str, side: TransferSide, amount: i64, price: &str) -> TransferEvent {
        TransferEvent {
            mint: mint.to_string(),
            symbol: Some("TEST".to_string()),
            name: Some("Test Token".to_string()),
            amount: Decimal::from(amount),
            price_usd: price.parse().unwrap(),
            side,
        }
    }

    fn tx(unix: i64, transfers: Vec<TransferEvent>) -> WalletTransaction {
        WalletTransaction {
            signature: Some(format!("sig{}", unix)),
            timestamp: Some(Utc.timestamp_opt(unix, 0).unwrap()),
            transfers,
        }
    }

    #[test]
    fn empty_input_yields_empty_map() {
        let aggregates = TransferAggregator::aggregate(&[]);
        assert!(aggregates.is_empty());
    }

    #[test]
    fn running_average_is_order_dependent_for_three_prices() {
        let forward = TransferAggregator::aggregate(&[
            tx(1, vec![transfer("mint", TransferSide::In, 1, "10")]),
            tx(2, vec![transfer("mint", TransferSide::In, 1, "20")]),
            tx(3, vec![transfer("mint", TransferSide::In, 1, "40")]),
        ]);
        let reversed = TransferAggregator::aggregate(&[
            tx(1, vec![transfer("mint", TransferSide::In, 1, "40")]),
            tx(2, vec![transfer("mint", TransferSide::In, 1, "20")]),
            tx(3, vec![transfer("mint", TransferSide::In, 1, "10")]),
        ]);

        // ((10*1 + 20)/2 * 2 + 40) / 3 = 100/3
        let expected_forward = Decimal::from(100) / Decimal::from(3);
        // ((40*1 + 20)/2 * 2 + 10) / 3 = 70/3
        let expected_reversed = Decimal::from(70) / Decimal::from(3);

        assert_eq!(forward["mint"].avg_buy_price, expected_forward);
        assert_eq!(reversed["mint"].avg_buy_price, expected_reversed);
        assert_ne!(forward["mint"].avg_buy_price, reversed["mint"].avg_buy_price);
    }

    #[test]
    fn two_prices_average_to_midpoint() {
        let aggregates = TransferAggregator::aggregate(&[
            tx(1, vec![transfer("mint", TransferSide::In, 1, "10")]),
            tx(2, vec![transfer("mint", TransferSide::In, 1, "20")]),
        ]);
        assert_eq!(aggregates["mint"].avg_buy_price, Decimal::from(15));
    }

    #[test]
    fn negative_amounts_clamp_and_only_count_transactions() {
        let aggregates = TransferAggregator::aggregate(&[tx(
            1,
            vec![
                TransferEvent {
                    amount: Decimal::from(-50),
                    ..transfer("mint", TransferSide::In, 0, "2")
                },
                transfer("mint", TransferSide::In, 10, "2"),
            ],
        )]);

        let aggregate = &aggregates["mint"];
        assert_eq!(aggregate.total_bought, Decimal::from(10));
        assert_eq!(aggregate.buy_count, 1);
        assert_eq!(aggregate.total_transactions, 2);
        assert!(aggregate.total_bought >= Decimal::ZERO);
    }

    #[test]
    fn oversell_clamps_current_held_to_zero() {
        let aggregates = TransferAggregator::aggregate(&[
            tx(1, vec![transfer("mint", TransferSide::In, 100, "1")]),
            tx(2, vec![transfer("mint", TransferSide::Out, 250, "1")]),
        ]);

        let aggregate = &aggregates["mint"];
        assert_eq!(aggregate.current_held, Decimal::ZERO);
        assert_eq!(aggregate.total_sold, Decimal::from(250));
        assert_eq!(aggregate.total_volume_traded, Decimal::from(350));
        assert_eq!(aggregate.status, TokenStatus::Sold);
    }

    #[test]
    fn zero_price_is_excluded_from_averages_but_counts() {
        let aggregates = TransferAggregator::aggregate(&[
            tx(1, vec![transfer("mint", TransferSide::In, 10, "0")]),
            tx(2, vec![transfer("mint", TransferSide::In, 10, "4")]),
        ]);

        let aggregate = &aggregates["mint"];
        assert_eq!(aggregate.buy_count, 2);
        assert_eq!(aggregate.total_bought, Decimal::from(20));
        assert_eq!(aggregate.priced_buy_count, 1);
        assert_eq!(aggregate.avg_buy_price, Decimal::from(4));
        assert_eq!(aggregate.best_buy_price, Some(Decimal::from(4)));
    }

    #[test]
    fn best_and_worst_prices_resolve_to_average_when_never_priced() {
        let aggregates = TransferAggregator::aggregate(&[tx(
            1,
            vec![
                transfer("mint", TransferSide::In, 10, "0"),
                transfer("mint", TransferSide::Out, 5, "0"),
            ],
        )]);

        let aggregate = &aggregates["mint"];
        assert_eq!(aggregate.best_buy_price, Some(Decimal::ZERO));
        assert_eq!(aggregate.worst_sell_price, Some(Decimal::ZERO));
    }

    #[test]
    fn worst_sell_price_is_minimum_valid_sale() {
        let aggregates = TransferAggregator::aggregate(&[
            tx(1, vec![transfer("mint", TransferSide::Out, 10, "3")]),
            tx(2, vec![transfer("mint", TransferSide::Out, 10, "0.5")]),
            tx(3, vec![transfer("mint", TransferSide::Out, 10, "8")]),
        ]);
        assert_eq!(
            aggregates["mint"].worst_sell_price,
            Some("0.5".parse().unwrap())
        );
    }

    #[test]
    fn identity_fields_first_plausible_value_wins() {
        let unnamed = TransferEvent {
            symbol: None,
            name: None,
            ..transfer("mint", TransferSide::In, 1, "1")
        };
        let named = TransferEvent {
            symbol: Some("REAL".to_string()),
            name: Some("Real Token".to_string()),
            ..transfer("mint", TransferSide::In, 1, "1")
        };
        let renamed = TransferEvent {
            symbol: Some("LATER".to_string()),
            name: Some("Later Token".to_string()),
            ..transfer("mint", TransferSide::In, 1, "1")
        };

        let aggregates = TransferAggregator::aggregate(&[
            tx(1, vec![unnamed]),
            tx(2, vec![named]),
            tx(3, vec![renamed]),
        ]);

        // The "Unknown" default gives way to the first real value, which
        // then sticks
        assert_eq!(aggregates["mint"].symbol, "REAL");
        assert_eq!(aggregates["mint"].name, "Real Token");
    }

    #[test]
    fn date_ranges_track_chronology_not_arrival() {
        let aggregates = TransferAggregator::aggregate(&[
            tx(500, vec![transfer("mint", TransferSide::In, 1, "1")]),
            tx(100, vec![transfer("mint", TransferSide::In, 1, "1")]),
            tx(300, vec![transfer("mint", TransferSide::Out, 1, "1")]),
        ]);

        let aggregate = &aggregates["mint"];
        assert_eq!(
            aggregate.first_buy_date,
            Some(Utc.timestamp_opt(100, 0).unwrap())
        );
        assert_eq!(
            aggregate.last_buy_date,
            Some(Utc.timestamp_opt(500, 0).unwrap())
        );
        assert_eq!(
            aggregate.first_sell_date,
            Some(Utc.timestamp_opt(300, 0).unwrap())
        );
    }

    #[test]
    fn missing_timestamp_degrades_to_now() {
        let before = Utc::now();
        let aggregates = TransferAggregator::aggregate(&[WalletTransaction {
            signature: None,
            timestamp: None,
            transfers: vec![transfer("mint", TransferSide::In, 1, "1")],
        }]);
        let after = Utc::now();

        let first_buy = aggregates["mint"].first_buy_date.unwrap();
        assert!(first_buy >= before && first_buy <= after);
    }

    #[test]
    fn status_partial_when_both_sold_and_held() {
        let aggregates = TransferAggregator::aggregate(&[
            tx(1, vec![transfer("mint", TransferSide::In, 100, "1")]),
            tx(2, vec![transfer("mint", TransferSide::Out, 40, "2")]),
        ]);
        assert_eq!(aggregates["mint"].status, TokenStatus::Partial);
        assert_eq!(aggregates["mint"].current_held, Decimal::from(60));
    }
}
