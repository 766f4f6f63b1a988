use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{TokenAggregate, TokenMetrics};

const SECONDS_PER_DAY: i64 = 86_400;

/// Metrics Calculator: derive cost, proceeds, ROI, counterfactual value and
/// missed gains for one aggregated token position.
///
/// Pure function. Inputs are defensively clamped non-negative and every
/// degenerate division (zero cost basis and friends) yields zero, so every
/// output field is finite for any finite input.
pub fn compute_metrics(
    token: TokenAggregate,
    current_price: Decimal,
    ath_price: Decimal,
) -> TokenMetrics {
    let current_price = current_price.max(Decimal::ZERO);
    let ath_price = ath_price.max(Decimal::ZERO);

    let total_cost = token.total_bought * token.avg_buy_price;
    let actual_proceeds = token.total_sold * token.avg_sell_price;
    let current_value = token.current_held * current_price;

    let roi = if total_cost > Decimal::ZERO && token.total_sold > Decimal::ZERO {
        // Realized ROI against the proportional share of cost attributable
        // to the sold fraction
        let sold_fraction = token
            .total_sold
            .checked_div(token.total_bought)
            .unwrap_or(Decimal::ZERO);
        let sold_cost = sold_fraction * total_cost;
        percent_change(actual_proceeds, sold_cost)
    } else if total_cost > Decimal::ZERO {
        // Never sold: ROI reflects unrealized performance instead
        percent_change(current_value, total_cost)
    } else {
        Decimal::ZERO
    };

    // Counterfactual: held every bought token to the reference price
    let current_reference = first_nonzero(&[current_price, token.avg_buy_price]);
    let what_if_current_value = token.total_bought * current_reference;
    let missed_gains_current = missed_gains(what_if_current_value, actual_proceeds, token.total_sold);
    let roi_if_held_current = percent_change(what_if_current_value, total_cost);

    // Same pattern against the all-time high, with its longer fallback chain
    let ath_reference = first_nonzero(&[ath_price, current_price, token.avg_buy_price]);
    let what_if_ath_value = token.total_bought * ath_reference;
    let missed_gains_ath = missed_gains(what_if_ath_value, actual_proceeds, token.total_sold);
    let roi_if_held_ath = percent_change(what_if_ath_value, total_cost);

    let time_held_days = token
        .first_buy_date
        .map(|first_buy| {
            let end = token.last_sell_date.unwrap_or_else(Utc::now);
            let seconds = (end - first_buy).num_seconds().max(0);
            let days = Decimal::from(seconds)
                .checked_div(Decimal::from(SECONDS_PER_DAY))
                .unwrap_or(Decimal::ZERO);
            days.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .unwrap_or(0)
        })
        .unwrap_or(0);

    let price_change = if current_price > Decimal::ZERO && token.avg_buy_price > Decimal::ZERO {
        percent_change(current_price, token.avg_buy_price)
    } else {
        Decimal::ZERO
    };

    TokenMetrics {
        token,
        current_price_usd: current_price,
        ath_price_usd: ath_price,
        total_cost,
        actual_proceeds,
        current_value,
        roi,
        what_if_current_value,
        missed_gains_current,
        roi_if_held_current,
        what_if_ath_value,
        missed_gains_ath,
        roi_if_held_ath,
        time_held_days,
        price_change,
    }
}

/// Percentage change from `base` to `value`; zero when the base is not
/// positive
fn percent_change(value: Decimal, base: Decimal) -> Decimal {
    if base <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (value - base)
        .checked_div(base)
        .map(|ratio| ratio * Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
}

/// First candidate greater than zero, or zero when none is
fn first_nonzero(candidates: &[Decimal]) -> Decimal {
    candidates
        .iter()
        .copied()
        .find(|c| *c > Decimal::ZERO)
        .unwrap_or(Decimal::ZERO)
}

/// Gains left on the table: only meaningful once something was actually
/// sold, and never negative
fn missed_gains(what_if_value: Decimal, actual_proceeds: Decimal, total_sold: Decimal) -> Decimal {
    if total_sold > Decimal::ZERO {
        (what_if_value - actual_proceeds).max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TokenStatus, TransferAggregator, TransferEvent, TransferSide, WalletTransaction};
    use chrono::{TimeZone, Utc};

    fn position(buys: &[(i64, i64, &str)], sells: &[(i64, i64, &str)]) -> TokenAggregate {
        let mut transactions = Vec::new();
        for (unix, amount, price) in buys {
            transactions.push(leg_tx(*unix, TransferSide::In, *amount, price));
        }
        for (unix, amount, price) in sells {
            transactions.push(leg_tx(*unix, TransferSide::Out, *amount, price));
        }
        TransferAggregator::aggregate(&transactions)
            .remove("mint")
            .unwrap()
    }

    fn leg_tx(unix: i64, side: TransferSide, amount: i64, price: &str) -> WalletTransaction {
        WalletTransaction {
            signature: None,
            timestamp: Some(Utc.timestamp_opt(unix, 0).unwrap()),
            transfers: vec![TransferEvent {
                mint: "mint".to_string(),
                symbol: Some("TEST".to_string()),
                name: None,
                amount: Decimal::from(amount),
                price_usd: price.parse().unwrap(),
                side,
            }],
        }
    }

    #[test]
    fn full_exit_at_a_loss() {
        // Buy 100 @ $1, sell all 100 @ $0.50
        let token = position(&[(1, 100, "1")], &[(2, 100, "0.5")]);
        let metrics = compute_metrics(token, Decimal::ONE, Decimal::ONE);

        assert_eq!(metrics.total_cost, Decimal::from(100));
        assert_eq!(metrics.actual_proceeds, Decimal::from(50));
        assert_eq!(metrics.roi, Decimal::from(-50));
        assert_eq!(metrics.token.status, TokenStatus::Sold);
        assert_eq!(metrics.token.current_held, Decimal::ZERO);
    }

    #[test]
    fn never_sold_roi_is_unrealized_and_nothing_is_missed() {
        let token = position(&[(1, 100, "1")], &[]);
        let metrics = compute_metrics(token, Decimal::from(2), Decimal::ZERO);

        assert_eq!(metrics.token.status, TokenStatus::NeverSold);
        assert_eq!(metrics.roi, Decimal::from(100));
        assert_eq!(metrics.missed_gains_current, Decimal::ZERO);
        assert_eq!(metrics.missed_gains_ath, Decimal::ZERO);
        assert_eq!(metrics.what_if_current_value, Decimal::from(200));
    }

    #[test]
    fn partial_exit_missed_gains() {
        // Buy 100 @ $1, sell 50 @ $0.50, current price $3
        let token = position(&[(1, 100, "1")], &[(2, 50, "0.5")]);
        let metrics = compute_metrics(token, Decimal::from(3), Decimal::from(3));

        assert_eq!(metrics.token.status, TokenStatus::Partial);
        // soldCost = (50/100)*100 = 50; roi = (25-50)/50*100 = -50
        assert_eq!(metrics.roi, Decimal::from(-50));
        assert_eq!(metrics.current_value, Decimal::from(150));
        assert_eq!(metrics.what_if_current_value, Decimal::from(300));
        assert_eq!(metrics.missed_gains_current, Decimal::from(275));
    }

    #[test]
    fn zero_cost_basis_zeroes_every_ratio() {
        // Only unpriced activity: cost basis is zero
        let token = position(&[(1, 100, "0")], &[(2, 50, "0")]);
        let metrics = compute_metrics(token, Decimal::ZERO, Decimal::ZERO);

        assert_eq!(metrics.roi, Decimal::ZERO);
        assert_eq!(metrics.roi_if_held_current, Decimal::ZERO);
        assert_eq!(metrics.roi_if_held_ath, Decimal::ZERO);
        assert_eq!(metrics.price_change, Decimal::ZERO);
        assert_eq!(metrics.what_if_current_value, Decimal::ZERO);
    }

    #[test]
    fn negative_prices_are_clamped() {
        let token = position(&[(1, 100, "1")], &[]);
        let metrics = compute_metrics(token, Decimal::from(-5), Decimal::from(-10));

        assert_eq!(metrics.current_price_usd, Decimal::ZERO);
        assert_eq!(metrics.ath_price_usd, Decimal::ZERO);
        // Fallback chain lands on the avg buy price
        assert_eq!(metrics.what_if_current_value, Decimal::from(100));
        assert_eq!(metrics.what_if_ath_value, Decimal::from(100));
    }

    #[test]
    fn ath_fallback_chain_prefers_ath_then_current() {
        let token = position(&[(1, 10, "1")], &[(2, 10, "2")]);

        let with_ath = compute_metrics(token.clone(), Decimal::from(3), Decimal::from(9));
        assert_eq!(with_ath.what_if_ath_value, Decimal::from(90));

        let without_ath = compute_metrics(token.clone(), Decimal::from(3), Decimal::ZERO);
        assert_eq!(without_ath.what_if_ath_value, Decimal::from(30));

        let without_any = compute_metrics(token, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(without_any.what_if_ath_value, Decimal::from(10));
    }

    #[test]
    fn time_held_spans_first_buy_to_last_sell() {
        // Three and a half days between first buy and last sell
        let token = position(&[(0, 10, "1")], &[(302_400, 10, "2")]);
        let metrics = compute_metrics(token, Decimal::ONE, Decimal::ONE);
        assert_eq!(metrics.time_held_days, 4);
    }

    #[test]
    fn time_held_is_zero_without_a_buy() {
        let token = position(&[], &[(1, 10, "2")]);
        let metrics = compute_metrics(token, Decimal::ONE, Decimal::ONE);
        assert_eq!(metrics.time_held_days, 0);
    }

    #[test]
    fn price_change_requires_both_prices_positive() {
        let token = position(&[(1, 10, "2")], &[]);

        let up = compute_metrics(token.clone(), Decimal::from(3), Decimal::ZERO);
        assert_eq!(up.price_change, Decimal::from(50));

        let unknown = compute_metrics(token, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(unknown.price_change, Decimal::ZERO);
    }
}
