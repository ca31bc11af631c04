//! Equity curve built by replaying the account event stream.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::trade::Trade;
use super::transfer::Transfer;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub at: DateTime<Utc>,
    pub balance: Decimal,
}

// Transfers sort before trades at equal timestamps so a deposit shows up as
// the cause of a balance step, not its aftermath.
const RANK_TRANSFER: u8 = 0;
const RANK_TRADE: u8 = 1;

/// Replay transfers and closed trades into a cumulative balance series.
///
/// One point per event, ordered by timestamp. The curve is always rebuilt from
/// the event log; nothing here is cached or mutated in place.
pub fn build_curve(
    transfers: &[Transfer],
    trades: &[Trade],
    opening_balance: Decimal,
) -> Vec<EquityPoint> {
    let mut events: Vec<(DateTime<Utc>, u8, i64, Decimal)> = transfers
        .iter()
        .map(|t| (t.at, RANK_TRANSFER, t.id, t.amount))
        .collect();
    events.extend(
        trades
            .iter()
            .filter_map(|t| t.closed_at.map(|at| (at, RANK_TRADE, t.id, t.net))),
    );
    events.sort_by_key(|&(at, rank, id, _)| (at, rank, id));

    let mut balance = opening_balance;
    events
        .into_iter()
        .map(|(at, _, _, delta)| {
            balance += delta;
            EquityPoint { at, balance }
        })
        .collect()
}
