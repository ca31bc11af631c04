//! Ledger: validated writes of trades and transfers against an account.
//!
//! Every operation takes the acting user explicitly and fails fast before any
//! write: `NotFound` when the account or trade is absent, `Authorization` when
//! it belongs to someone else, `Validation` on malformed input.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::account::Account;
use super::error::JournalError;
use super::trade::{normalize_symbol, Attachment, Trade, TradeDraft};
use super::transfer::{self, Transfer};
use crate::ports::store_port::{StorePort, TradeFilter};

pub struct Ledger<'a> {
    store: &'a dyn StorePort,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a dyn StorePort) -> Self {
        Ledger { store }
    }

    /// Fetch an account and check it belongs to the acting user.
    pub fn owned_account(&self, user_id: i64, account_id: i64) -> Result<Account, JournalError> {
        let account = self
            .store
            .account(account_id)?
            .ok_or_else(|| JournalError::not_found("account", account_id))?;
        if account.user_id != user_id {
            return Err(JournalError::Authorization {
                entity: "account",
                id: account_id,
            });
        }
        Ok(account)
    }

    fn owned_trade(&self, user_id: i64, trade_id: i64) -> Result<Trade, JournalError> {
        let trade = self
            .store
            .trade(trade_id)?
            .ok_or_else(|| JournalError::not_found("trade", trade_id))?;
        // Ownership is resolved through the owning account.
        self.owned_account(user_id, trade.account_id)?;
        Ok(trade)
    }

    pub fn record_trade(
        &self,
        user_id: i64,
        account_id: i64,
        draft: TradeDraft,
    ) -> Result<i64, JournalError> {
        self.owned_account(user_id, account_id)?;
        let (gross, net) = draft.settle()?;
        let trade = Trade {
            id: 0,
            account_id,
            symbol: normalize_symbol(&draft.symbol),
            side: draft.side,
            quantity: draft.quantity,
            entry_price: draft.entry_price,
            exit_price: draft.exit_price,
            fees: draft.fees,
            gross,
            net,
            opened_at: draft.opened_at,
            closed_at: draft.closed_at,
            tags: draft.tags,
            notes: draft.notes.trim().to_string(),
        };
        self.store.insert_trade(&trade)
    }

    pub fn edit_trade(
        &self,
        user_id: i64,
        trade_id: i64,
        draft: TradeDraft,
    ) -> Result<(), JournalError> {
        let existing = self.owned_trade(user_id, trade_id)?;
        let (gross, net) = draft.settle()?;
        let trade = Trade {
            id: trade_id,
            account_id: existing.account_id,
            symbol: normalize_symbol(&draft.symbol),
            side: draft.side,
            quantity: draft.quantity,
            entry_price: draft.entry_price,
            exit_price: draft.exit_price,
            fees: draft.fees,
            gross,
            net,
            opened_at: draft.opened_at,
            closed_at: draft.closed_at,
            tags: draft.tags,
            notes: draft.notes.trim().to_string(),
        };
        self.store.update_trade(&trade)
    }

    /// Delete a trade and its attachment, if any.
    pub fn delete_trade(&self, user_id: i64, trade_id: i64) -> Result<(), JournalError> {
        self.owned_trade(user_id, trade_id)?;
        self.store.delete_attachment(trade_id)?;
        self.store.delete_trade(trade_id)
    }

    pub fn record_transfer(
        &self,
        user_id: i64,
        account_id: i64,
        amount: Decimal,
        at: DateTime<Utc>,
        memo: Option<String>,
    ) -> Result<i64, JournalError> {
        self.owned_account(user_id, account_id)?;
        transfer::validate_amount(amount)?;
        let transfer = Transfer {
            id: 0,
            account_id,
            amount,
            at,
            memo: memo.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()),
        };
        self.store.insert_transfer(&transfer)
    }

    pub fn attach_image(
        &self,
        user_id: i64,
        trade_id: i64,
        content: Vec<u8>,
        mime: String,
    ) -> Result<(), JournalError> {
        self.owned_trade(user_id, trade_id)?;
        if content.is_empty() {
            return Err(JournalError::validation(
                "attachment",
                "content",
                "must not be empty",
            ));
        }
        self.store.put_attachment(trade_id, &Attachment { mime, content })
    }

    pub fn attachment(
        &self,
        user_id: i64,
        trade_id: i64,
    ) -> Result<Option<Attachment>, JournalError> {
        self.owned_trade(user_id, trade_id)?;
        self.store.attachment(trade_id)
    }

    /// List trades, scoping the filter to an account the user owns.
    pub fn trades(
        &self,
        user_id: i64,
        account_id: i64,
        mut filter: TradeFilter,
    ) -> Result<Vec<Trade>, JournalError> {
        self.owned_account(user_id, account_id)?;
        filter.account_id = Some(account_id);
        self.store.trades(&filter)
    }

    pub fn transfers(&self, user_id: i64, account_id: i64) -> Result<Vec<Transfer>, JournalError> {
        self.owned_account(user_id, account_id)?;
        self.store.transfers_for_account(account_id)
    }
}
