//! CSV export of trade records.

use std::path::Path;

use serde::Serialize;

use crate::domain::error::JournalError;
use crate::domain::trade::Trade;

#[derive(Serialize)]
struct TradeRow<'a> {
    id: i64,
    symbol: &'a str,
    side: String,
    quantity: String,
    entry_price: String,
    exit_price: String,
    fees: String,
    gross_pnl: String,
    net_pnl: String,
    opened_at: String,
    closed_at: String,
    tags: String,
    notes: &'a str,
}

impl<'a> From<&'a Trade> for TradeRow<'a> {
    fn from(trade: &'a Trade) -> Self {
        TradeRow {
            id: trade.id,
            symbol: &trade.symbol,
            side: trade.side.to_string(),
            quantity: trade.quantity.to_string(),
            entry_price: trade.entry_price.to_string(),
            exit_price: trade.exit_price.to_string(),
            fees: trade.fees.to_string(),
            gross_pnl: trade.gross.to_string(),
            net_pnl: trade.net.to_string(),
            opened_at: trade.opened_at.to_rfc3339(),
            closed_at: trade
                .closed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            tags: trade.tags.join(","),
            notes: &trade.notes,
        }
    }
}

/// Writes trades to `path` as CSV with a header row. Amounts are emitted as
/// decimal strings, timestamps as RFC 3339, and an open trade leaves its
/// `closed_at` column empty.
pub fn write_trades_csv<P: AsRef<Path>>(path: P, trades: &[Trade]) -> Result<(), JournalError> {
    let mut writer = csv::Writer::from_path(path).map_err(JournalError::storage)?;
    for trade in trades {
        writer
            .serialize(TradeRow::from(trade))
            .map_err(JournalError::storage)?;
    }
    writer.flush()?;
    Ok(())
}
