//! Account lifecycle: creation with seed deposit, derived balance, deletion.

use chrono::Utc;
use rust_decimal::Decimal;

use super::account::Account;
use super::error::JournalError;
use super::ledger::Ledger;
use super::transfer;
use crate::ports::store_port::{StorePort, TradeFilter};

pub struct AccountManager<'a> {
    store: &'a dyn StorePort,
    allow_duplicate_names: bool,
}

impl<'a> AccountManager<'a> {
    pub fn new(store: &'a dyn StorePort) -> Self {
        AccountManager {
            store,
            allow_duplicate_names: false,
        }
    }

    /// Duplicate account names per user are rejected by default; an installation
    /// can opt into allowing them via `[journal] allow_duplicate_account_names`.
    pub fn with_duplicate_names_allowed(mut self, allow: bool) -> Self {
        self.allow_duplicate_names = allow;
        self
    }

    /// Create an account. The optional initial deposit is recorded as an
    /// ordinary transfer dated at creation, so the equity curve and balance
    /// derive from the event log alone.
    pub fn create_account(
        &self,
        user_id: i64,
        name: &str,
        broker: Option<String>,
        kind: Option<String>,
        description: Option<String>,
        initial_deposit: Option<Decimal>,
    ) -> Result<i64, JournalError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(JournalError::validation(
                "account",
                "name",
                "must not be empty",
            ));
        }
        if !self.allow_duplicate_names {
            let taken = self
                .store
                .accounts_for_user(user_id)?
                .iter()
                .any(|a| a.name.eq_ignore_ascii_case(name));
            if taken {
                return Err(JournalError::validation(
                    "account",
                    "name",
                    format!("'{name}' already exists for this user"),
                ));
            }
        }
        if let Some(amount) = initial_deposit {
            transfer::validate_amount(amount)?;
        }

        let created_at = Utc::now();
        let account_id = self.store.insert_account(&Account {
            id: 0,
            user_id,
            name: name.to_string(),
            broker,
            kind,
            description,
            created_at,
        })?;

        if let Some(amount) = initial_deposit {
            Ledger::new(self.store).record_transfer(
                user_id,
                account_id,
                amount,
                created_at,
                Some("initial deposit".to_string()),
            )?;
        }

        Ok(account_id)
    }

    pub fn accounts(&self, user_id: i64) -> Result<Vec<Account>, JournalError> {
        self.store.accounts_for_user(user_id)
    }

    pub fn account_by_name(&self, user_id: i64, name: &str) -> Result<Account, JournalError> {
        self.store
            .accounts_for_user(user_id)?
            .into_iter()
            .find(|a| a.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| JournalError::validation(
                "account",
                "name",
                format!("no account named '{}' for this user", name.trim()),
            ))
    }

    /// Derived balance: sum of transfers plus sum of closed-trade nets.
    pub fn balance(&self, user_id: i64, account_id: i64) -> Result<Decimal, JournalError> {
        let ledger = Ledger::new(self.store);
        ledger.owned_account(user_id, account_id)?;
        let transfers: Decimal = self
            .store
            .transfers_for_account(account_id)?
            .iter()
            .map(|t| t.amount)
            .sum();
        let nets: Decimal = self
            .store
            .trades(&TradeFilter::closed_for_account(account_id))?
            .iter()
            .map(|t| t.net)
            .sum();
        Ok(transfers + nets)
    }

    /// Delete an account and everything that hangs off it. The cascade is a
    /// single atomic store operation; a failure leaves the store untouched.
    pub fn delete_account(&self, user_id: i64, account_id: i64) -> Result<(), JournalError> {
        Ledger::new(self.store).owned_account(user_id, account_id)?;
        self.store.delete_account_cascade(account_id)
    }
}
