//! Cash transfers in and out of an account.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::JournalError;

/// A cash movement independent of trading activity. Positive amounts are
/// deposits, negative amounts withdrawals. A zero amount is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub account_id: i64,
    pub amount: Decimal,
    pub at: DateTime<Utc>,
    pub memo: Option<String>,
}

impl Transfer {
    pub fn is_deposit(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

/// Reject a zero transfer amount before anything is written.
pub fn validate_amount(amount: Decimal) -> Result<(), JournalError> {
    if amount.is_zero() {
        return Err(JournalError::validation(
            "transfer",
            "amount",
            "must be nonzero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_amount_rejected() {
        assert!(matches!(
            validate_amount(Decimal::ZERO),
            Err(JournalError::Validation { field: "amount", .. })
        ));
    }

    #[test]
    fn signed_amounts_accepted() {
        assert!(validate_amount("1000".parse().unwrap()).is_ok());
        assert!(validate_amount("-200.50".parse().unwrap()).is_ok());
    }
}
