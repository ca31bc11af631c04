#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tradebook::domain::account::Account;
use tradebook::domain::error::JournalError;
use tradebook::domain::trade::{Attachment, Side, Trade, TradeDraft};
use tradebook::domain::transfer::Transfer;
use tradebook::domain::user::User;
use tradebook::ports::store_port::{StorePort, TradeFilter};

/// In-memory entity store for exercising the domain layer without SQLite.
/// Rows live in maps keyed by id; the `fail_next` switch makes the next
/// mutating call report a storage error.
pub struct MockStore {
    state: RefCell<State>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    users: HashMap<i64, User>,
    accounts: HashMap<i64, Account>,
    trades: HashMap<i64, Trade>,
    transfers: HashMap<i64, Transfer>,
    attachments: HashMap<i64, Attachment>,
    fail_next: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn fail_next_call(&self) {
        self.state.borrow_mut().fail_next = true;
    }

    pub fn with_user(self, username: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.users.insert(
                id,
                User {
                    id,
                    username: username.to_string(),
                    email: None,
                    password_hash: "$argon2id$stub".into(),
                    created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                },
            );
        }
        self
    }

    pub fn trade_count(&self) -> usize {
        self.state.borrow().trades.len()
    }

    pub fn transfer_count(&self) -> usize {
        self.state.borrow().transfers.len()
    }

    fn check_failure(&self) -> Result<(), JournalError> {
        let mut state = self.state.borrow_mut();
        if state.fail_next {
            state.fail_next = false;
            return Err(JournalError::storage("injected failure"));
        }
        Ok(())
    }

    fn assign_id(&self) -> i64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        id
    }
}

impl StorePort for MockStore {
    fn insert_user(&self, user: &User) -> Result<i64, JournalError> {
        self.check_failure()?;
        let id = self.assign_id();
        let mut stored = user.clone();
        stored.id = id;
        self.state.borrow_mut().users.insert(id, stored);
        Ok(id)
    }

    fn user(&self, id: i64) -> Result<Option<User>, JournalError> {
        Ok(self.state.borrow().users.get(&id).cloned())
    }

    fn user_by_name(&self, username: &str) -> Result<Option<User>, JournalError> {
        Ok(self
            .state
            .borrow()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn insert_account(&self, account: &Account) -> Result<i64, JournalError> {
        self.check_failure()?;
        let id = self.assign_id();
        let mut stored = account.clone();
        stored.id = id;
        self.state.borrow_mut().accounts.insert(id, stored);
        Ok(id)
    }

    fn account(&self, id: i64) -> Result<Option<Account>, JournalError> {
        Ok(self.state.borrow().accounts.get(&id).cloned())
    }

    fn accounts_for_user(&self, user_id: i64) -> Result<Vec<Account>, JournalError> {
        let mut accounts: Vec<Account> = self
            .state
            .borrow()
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    fn delete_account_cascade(&self, account_id: i64) -> Result<(), JournalError> {
        self.check_failure()?;
        let mut state = self.state.borrow_mut();
        if state.accounts.remove(&account_id).is_none() {
            return Err(JournalError::not_found("account", account_id));
        }
        let trade_ids: Vec<i64> = state
            .trades
            .values()
            .filter(|t| t.account_id == account_id)
            .map(|t| t.id)
            .collect();
        for id in trade_ids {
            state.trades.remove(&id);
            state.attachments.remove(&id);
        }
        state.transfers.retain(|_, t| t.account_id != account_id);
        Ok(())
    }

    fn insert_trade(&self, trade: &Trade) -> Result<i64, JournalError> {
        self.check_failure()?;
        let id = self.assign_id();
        let mut stored = trade.clone();
        stored.id = id;
        self.state.borrow_mut().trades.insert(id, stored);
        Ok(id)
    }

    fn update_trade(&self, trade: &Trade) -> Result<(), JournalError> {
        self.check_failure()?;
        let mut state = self.state.borrow_mut();
        if !state.trades.contains_key(&trade.id) {
            return Err(JournalError::not_found("trade", trade.id));
        }
        state.trades.insert(trade.id, trade.clone());
        Ok(())
    }

    fn trade(&self, id: i64) -> Result<Option<Trade>, JournalError> {
        Ok(self.state.borrow().trades.get(&id).cloned())
    }

    fn trades(&self, filter: &TradeFilter) -> Result<Vec<Trade>, JournalError> {
        let mut trades: Vec<Trade> = self
            .state
            .borrow()
            .trades
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        trades.sort_by_key(|t| (t.closed_at.unwrap_or(t.opened_at), t.id));
        Ok(trades)
    }

    fn delete_trade(&self, id: i64) -> Result<(), JournalError> {
        self.check_failure()?;
        if self.state.borrow_mut().trades.remove(&id).is_none() {
            return Err(JournalError::not_found("trade", id));
        }
        Ok(())
    }

    fn insert_transfer(&self, transfer: &Transfer) -> Result<i64, JournalError> {
        self.check_failure()?;
        let id = self.assign_id();
        let mut stored = transfer.clone();
        stored.id = id;
        self.state.borrow_mut().transfers.insert(id, stored);
        Ok(id)
    }

    fn transfers_for_account(&self, account_id: i64) -> Result<Vec<Transfer>, JournalError> {
        let mut transfers: Vec<Transfer> = self
            .state
            .borrow()
            .transfers
            .values()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        transfers.sort_by_key(|t| (t.at, t.id));
        Ok(transfers)
    }

    fn put_attachment(&self, trade_id: i64, image: &Attachment) -> Result<(), JournalError> {
        self.check_failure()?;
        self.state
            .borrow_mut()
            .attachments
            .insert(trade_id, image.clone());
        Ok(())
    }

    fn attachment(&self, trade_id: i64) -> Result<Option<Attachment>, JournalError> {
        Ok(self.state.borrow().attachments.get(&trade_id).cloned())
    }

    fn delete_attachment(&self, trade_id: i64) -> Result<(), JournalError> {
        self.check_failure()?;
        self.state.borrow_mut().attachments.remove(&trade_id);
        Ok(())
    }
}

pub fn draft(
    symbol: &str,
    side: Side,
    entry: &str,
    exit: &str,
    closed_at: Option<DateTime<Utc>>,
) -> TradeDraft {
    TradeDraft {
        symbol: symbol.to_string(),
        side,
        quantity: Decimal::ONE,
        entry_price: entry.parse().unwrap(),
        exit_price: exit.parse().unwrap(),
        fees: Decimal::ZERO,
        opened_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
        closed_at,
        manual_net: None,
        tags: Vec::new(),
        notes: String::new(),
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}
