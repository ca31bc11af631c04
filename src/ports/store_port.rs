//! Entity store port trait.
//!
//! The journal treats persistence as a transactional keyed store behind this
//! trait. `insert_*` methods ignore the record's `id` and return the id the
//! store assigned. `delete_account_cascade` must be all-or-nothing: either the
//! account and every dependent trade, attachment, and transfer are gone, or
//! nothing changed.

use chrono::NaiveDate;

use crate::domain::account::Account;
use crate::domain::error::JournalError;
use crate::domain::trade::{Attachment, Trade};
use crate::domain::transfer::Transfer;
use crate::domain::user::User;

/// Equality/range predicates for trade listings. `tags` requires every listed
/// tag to be present on a trade. Dates match the UTC calendar date of
/// `closed_at` (falling back to `opened_at` for open trades).
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub account_id: Option<i64>,
    pub symbol: Option<String>,
    pub tags: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub closed_only: bool,
}

impl TradeFilter {
    pub fn for_account(account_id: i64) -> Self {
        TradeFilter {
            account_id: Some(account_id),
            ..Default::default()
        }
    }

    pub fn closed_for_account(account_id: i64) -> Self {
        TradeFilter {
            account_id: Some(account_id),
            closed_only: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, trade: &Trade) -> bool {
        if let Some(account_id) = self.account_id {
            if trade.account_id != account_id {
                return false;
            }
        }
        if self.closed_only && !trade.is_closed() {
            return false;
        }
        if let Some(ref symbol) = self.symbol {
            if !trade.symbol.eq_ignore_ascii_case(symbol) {
                return false;
            }
        }
        if !self.tags.iter().all(|t| trade.has_tag(t)) {
            return false;
        }
        let date = trade
            .closed_at
            .unwrap_or(trade.opened_at)
            .date_naive();
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }
}

pub trait StorePort {
    fn insert_user(&self, user: &User) -> Result<i64, JournalError>;
    fn user(&self, id: i64) -> Result<Option<User>, JournalError>;
    fn user_by_name(&self, username: &str) -> Result<Option<User>, JournalError>;

    fn insert_account(&self, account: &Account) -> Result<i64, JournalError>;
    fn account(&self, id: i64) -> Result<Option<Account>, JournalError>;
    fn accounts_for_user(&self, user_id: i64) -> Result<Vec<Account>, JournalError>;
    fn delete_account_cascade(&self, account_id: i64) -> Result<(), JournalError>;

    fn insert_trade(&self, trade: &Trade) -> Result<i64, JournalError>;
    fn update_trade(&self, trade: &Trade) -> Result<(), JournalError>;
    fn trade(&self, id: i64) -> Result<Option<Trade>, JournalError>;
    fn trades(&self, filter: &TradeFilter) -> Result<Vec<Trade>, JournalError>;
    fn delete_trade(&self, id: i64) -> Result<(), JournalError>;

    fn insert_transfer(&self, transfer: &Transfer) -> Result<i64, JournalError>;
    fn transfers_for_account(&self, account_id: i64) -> Result<Vec<Transfer>, JournalError>;

    fn put_attachment(&self, trade_id: i64, image: &Attachment) -> Result<(), JournalError>;
    fn attachment(&self, trade_id: i64) -> Result<Option<Attachment>, JournalError>;
    fn delete_attachment(&self, trade_id: i64) -> Result<(), JournalError>;
}
