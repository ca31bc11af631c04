//! Performance metrics over closed trades.
//!
//! Everything here is a pure function of the trade set handed in; callers
//! filter by account, date range, symbol, or tag before computing. Open trades
//! (no `closed_at`) are ignored.

use std::collections::BTreeMap;

use chrono::{FixedOffset, Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::JournalError;
use super::trade::Trade;

/// Timezone used to bucket closed trades into calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingZone {
    #[default]
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl GroupingZone {
    /// Parse a config value: `utc`, `local`, or a fixed offset like `+10:00`.
    pub fn parse(s: &str) -> Result<Self, JournalError> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "utc" => return Ok(GroupingZone::Utc),
            "local" => return Ok(GroupingZone::Local),
            _ => {}
        }
        let invalid = || JournalError::ConfigInvalid {
            section: "journal".into(),
            key: "timezone".into(),
            reason: format!("'{s}' is not 'utc', 'local', or an offset like '+10:00'"),
        };
        let (sign, rest) = match s.split_at_checked(1) {
            Some(("+", rest)) => (1, rest),
            Some(("-", rest)) => (-1, rest),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(GroupingZone::Fixed)
            .ok_or_else(invalid)
    }

    fn date_of(&self, at: chrono::DateTime<chrono::Utc>) -> NaiveDate {
        match self {
            GroupingZone::Utc => at.date_naive(),
            GroupingZone::Local => at.with_timezone(&Local).date_naive(),
            GroupingZone::Fixed(offset) => at.with_timezone(offset).date_naive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub break_even: usize,
    /// Wins over decisive (nonzero-net) trades; 0.0 when nothing is decisive.
    pub win_rate: f64,
    pub total_net: Decimal,
    pub average_net: Decimal,
    pub win_streak: usize,
    pub best_win_streak: usize,
}

impl Summary {
    pub fn compute(trades: &[Trade]) -> Self {
        let mut closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
        closed.sort_by_key(|t| (t.closed_at, t.id));

        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut break_even = 0usize;
        let mut total_net = Decimal::ZERO;
        let mut streak = 0usize;
        let mut best_streak = 0usize;

        for trade in &closed {
            total_net += trade.net;
            if trade.net > Decimal::ZERO {
                wins += 1;
                streak += 1;
                best_streak = best_streak.max(streak);
            } else {
                if trade.net < Decimal::ZERO {
                    losses += 1;
                } else {
                    break_even += 1;
                }
                streak = 0;
            }
        }

        let decisive = wins + losses;
        let win_rate = if decisive > 0 {
            wins as f64 / decisive as f64
        } else {
            0.0
        };
        let average_net = if closed.is_empty() {
            Decimal::ZERO
        } else {
            total_net / Decimal::from(closed.len() as i64)
        };

        Summary {
            total_trades: closed.len(),
            wins,
            losses,
            break_even,
            win_rate,
            total_net,
            average_net,
            win_streak: streak,
            best_win_streak: best_streak,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DayTotal {
    pub net: Decimal,
    pub trades: usize,
}

/// Net P&L per calendar day in the given zone. Days with no closed trades are
/// absent from the map.
pub fn daily_pnl(trades: &[Trade], zone: GroupingZone) -> BTreeMap<NaiveDate, DayTotal> {
    let mut days: BTreeMap<NaiveDate, DayTotal> = BTreeMap::new();
    for trade in trades {
        let Some(closed_at) = trade.closed_at else {
            continue;
        };
        let entry = days.entry(zone.date_of(closed_at)).or_default();
        entry.net += trade.net;
        entry.trades += 1;
    }
    days
}
