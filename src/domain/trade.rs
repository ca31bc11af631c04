//! Trade records and P&L computation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::JournalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "long" | "buy" => Ok(Side::Long),
            "short" | "sell" => Ok(Side::Short),
            other => Err(JournalError::validation(
                "trade",
                "side",
                format!("'{other}' is not 'long' or 'short'"),
            )),
        }
    }
}

/// A recorded trade. `closed_at` is `None` while the trade is open; only
/// closed trades contribute to metrics and the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub account_id: i64,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub fees: Decimal,
    pub gross: Decimal,
    pub net: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub notes: String,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Caller-supplied fields for recording or editing a trade. Identity and
/// derived P&L stay out; the ledger computes those.
#[derive(Debug, Clone)]
pub struct TradeDraft {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub fees: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Overrides the computed net when set; gross becomes `net + fees`.
    pub manual_net: Option<Decimal>,
    pub tags: Vec<String>,
    pub notes: String,
}

impl TradeDraft {
    /// Validate the draft and produce the (gross, net) pair.
    pub fn settle(&self) -> Result<(Decimal, Decimal), JournalError> {
        if self.symbol.trim().is_empty() {
            return Err(JournalError::validation(
                "trade",
                "symbol",
                "must not be empty",
            ));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(JournalError::validation(
                "trade",
                "quantity",
                format!("{} is not positive", self.quantity),
            ));
        }
        if let Some(closed) = self.closed_at {
            if closed < self.opened_at {
                return Err(JournalError::validation(
                    "trade",
                    "closed_at",
                    format!("{closed} is before opened_at {}", self.opened_at),
                ));
            }
        }
        Ok(match self.manual_net {
            Some(net) => (net + self.fees, net),
            None => compute_pnl(
                self.side,
                self.quantity,
                self.entry_price,
                self.exit_price,
                self.fees,
            ),
        })
    }
}

/// Gross and net P&L for a closed position.
pub fn compute_pnl(
    side: Side,
    quantity: Decimal,
    entry_price: Decimal,
    exit_price: Decimal,
    fees: Decimal,
) -> (Decimal, Decimal) {
    let gross = match side {
        Side::Long => (exit_price - entry_price) * quantity,
        Side::Short => (entry_price - exit_price) * quantity,
    };
    (gross, gross - fees)
}

/// Normalize a symbol the way the journal stores it.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Split a comma-separated tag string into trimmed, non-empty tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Image attached to a trade. Owned exclusively by its trade and removed with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime: String,
    pub content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn draft() -> TradeDraft {
        TradeDraft {
            symbol: "ES".into(),
            side: Side::Long,
            quantity: dec("2"),
            entry_price: dec("100"),
            exit_price: dec("110"),
            fees: dec("5"),
            opened_at: at(2024, 3, 1),
            closed_at: Some(at(2024, 3, 2)),
            manual_net: None,
            tags: vec![],
            notes: String::new(),
        }
    }

    #[test]
    fn long_pnl() {
        let (gross, net) = compute_pnl(Side::Long, dec("2"), dec("100"), dec("110"), dec("5"));
        assert_eq!(gross, dec("20"));
        assert_eq!(net, dec("15"));
    }

    #[test]
    fn short_pnl() {
        let (gross, net) = compute_pnl(Side::Short, dec("3"), dec("50"), dec("45"), dec("1.50"));
        assert_eq!(gross, dec("15"));
        assert_eq!(net, dec("13.50"));
    }

    #[test]
    fn settle_computes_from_prices() {
        let (gross, net) = draft().settle().unwrap();
        assert_eq!(gross, dec("20"));
        assert_eq!(net, dec("15"));
    }

    #[test]
    fn settle_manual_net_overrides_prices() {
        let mut d = draft();
        d.manual_net = Some(dec("-42"));
        let (gross, net) = d.settle().unwrap();
        assert_eq!(net, dec("-42"));
        assert_eq!(gross, dec("-37"));
    }

    #[test]
    fn settle_rejects_empty_symbol() {
        let mut d = draft();
        d.symbol = "  ".into();
        assert!(matches!(
            d.settle(),
            Err(JournalError::Validation { field: "symbol", .. })
        ));
    }

    #[test]
    fn settle_rejects_nonpositive_quantity() {
        let mut d = draft();
        d.quantity = Decimal::ZERO;
        assert!(matches!(
            d.settle(),
            Err(JournalError::Validation {
                field: "quantity",
                ..
            })
        ));
    }

    #[test]
    fn settle_rejects_close_before_open() {
        let mut d = draft();
        d.closed_at = Some(at(2024, 2, 1));
        assert!(matches!(
            d.settle(),
            Err(JournalError::Validation {
                field: "closed_at",
                ..
            })
        ));
    }

    #[test]
    fn side_parses_aliases() {
        assert_eq!("Long".parse::<Side>().unwrap(), Side::Long);
        assert_eq!("sell".parse::<Side>().unwrap(), Side::Short);
        assert!("sideways".parse::<Side>().is_err());
    }

    #[test]
    fn tags_split_and_trim() {
        assert_eq!(
            parse_tags("breakout, fomc ,, news"),
            vec!["breakout", "fomc", "news"]
        );
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn symbol_normalized_uppercase() {
        assert_eq!(normalize_symbol(" nq "), "NQ");
    }
}
