use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::{TokenMetrics, TokenStatus, WalletSummary};

const HOLD_TIME_HORIZON_DAYS: u32 = 30;

/// Portfolio Summarizer: one reduction pass over all per-token metrics.
///
/// Pure and idempotent; an empty input yields the all-zero summary with a
/// jitter score of 0. Ties for best/worst/biggest-miss go to the first
/// token encountered in scan order.
pub fn summarize(tokens: &[TokenMetrics]) -> WalletSummary {
    if tokens.is_empty() {
        return WalletSummary::default();
    }

    let mut summary = WalletSummary {
        token_count: tokens.len() as u32,
        ..WalletSummary::default()
    };

    let mut roi_sum = Decimal::ZERO;
    let mut roi_if_held_sum = Decimal::ZERO;
    let mut hold_days_sum = Decimal::ZERO;

    for token in tokens {
        summary.total_cost += token.total_cost;
        summary.total_proceeds += token.actual_proceeds;
        summary.total_current_value += token.current_value;
        summary.total_what_if_current_value += token.what_if_current_value;
        summary.total_what_if_ath_value += token.what_if_ath_value;
        summary.total_missed_gains_current += token.missed_gains_current;
        summary.total_missed_gains_ath += token.missed_gains_ath;

        roi_sum += token.roi;
        roi_if_held_sum += token.roi_if_held_current;
        hold_days_sum += Decimal::from(token.time_held_days);

        if token.token.status == TokenStatus::Sold {
            summary.tokens_sold_out += 1;
        }

        if exceeds(&summary.best_performer, token, |t| t.roi_if_held_current, true) {
            summary.best_performer = Some(token.clone());
        }
        if exceeds(&summary.worst_performer, token, |t| t.roi_if_held_current, false) {
            summary.worst_performer = Some(token.clone());
        }
        if exceeds(&summary.biggest_miss, token, |t| t.missed_gains_current, true) {
            summary.biggest_miss = Some(token.clone());
        }
    }

    let count = Decimal::from(tokens.len());
    summary.avg_roi = roi_sum.checked_div(count).unwrap_or(Decimal::ZERO);
    summary.avg_roi_if_held = roi_if_held_sum.checked_div(count).unwrap_or(Decimal::ZERO);
    summary.avg_hold_time_days = hold_days_sum.checked_div(count).unwrap_or(Decimal::ZERO);

    summary.jitter_score = jitter_score(
        summary.token_count,
        summary.tokens_sold_out,
        summary.avg_hold_time_days,
        summary.total_missed_gains_current,
        summary.total_cost,
    );

    debug!(
        "Summarized {} tokens: total_cost={}, missed_gains={}, jitter_score={}",
        summary.token_count,
        summary.total_cost,
        summary.total_missed_gains_current,
        summary.jitter_score
    );

    summary
}

/// Strictly-better comparison so that ties keep the first encountered token
fn exceeds(
    current: &Option<TokenMetrics>,
    candidate: &TokenMetrics,
    key: impl Fn(&TokenMetrics) -> Decimal,
    maximize: bool,
) -> bool {
    match current {
        None => true,
        Some(existing) => {
            if maximize {
                key(candidate) > key(existing)
            } else {
                key(candidate) < key(existing)
            }
        }
    }
}

/// Composite 0-100 trading-behavior score; higher means more impulsive
/// exits.
///
/// Weighs the share of fully exited tokens (40), gains left on the table
/// relative to cost (40) and short average hold time against a 30-day
/// horizon (20).
fn jitter_score(
    token_count: u32,
    tokens_sold_out: u32,
    avg_hold_time_days: Decimal,
    total_missed_gains: Decimal,
    total_cost: Decimal,
) -> u32 {
    if token_count == 0 {
        return 0;
    }

    let paperhand_ratio = Decimal::from(tokens_sold_out)
        .checked_div(Decimal::from(token_count))
        .unwrap_or(Decimal::ZERO);

    let hold_time_score = avg_hold_time_days
        .checked_div(Decimal::from(HOLD_TIME_HORIZON_DAYS))
        .unwrap_or(Decimal::ZERO)
        .min(Decimal::ONE);

    let missed_gains_ratio = if total_cost > Decimal::ZERO {
        total_missed_gains
            .checked_div(total_cost)
            .unwrap_or(Decimal::ZERO)
            .min(Decimal::ONE)
    } else {
        Decimal::ZERO
    };

    let score = paperhand_ratio * Decimal::from(40)
        + missed_gains_ratio * Decimal::from(40)
        + (Decimal::ONE - hold_time_score) * Decimal::from(20);

    score
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}
