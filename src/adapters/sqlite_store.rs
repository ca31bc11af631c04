//! SQLite entity store adapter.
//!
//! Monetary amounts are stored as TEXT decimal strings and timestamps as
//! RFC 3339 TEXT, so nothing round-trips through binary floating point.

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Row};
use rust_decimal::Decimal;

use crate::domain::account::Account;
use crate::domain::error::JournalError;
use crate::domain::trade::{parse_tags, Attachment, Side, Trade};
use crate::domain::transfer::Transfer;
use crate::domain::user::User;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{StorePort, TradeFilter};

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, JournalError> {
        let db_path =
            config
                .get_string("store", "path")
                .ok_or_else(|| JournalError::ConfigMissing {
                    section: "store".into(),
                    key: "path".into(),
                })?;
        let pool_size = config.get_int("store", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(JournalError::storage)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, JournalError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(JournalError::storage)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), JournalError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                broker TEXT,
                kind TEXT,
                description TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);

            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                symbol TEXT NOT NULL,
                side TEXT NOT NULL CHECK (side IN ('long', 'short')),
                quantity TEXT NOT NULL,
                entry_price TEXT NOT NULL,
                exit_price TEXT NOT NULL,
                fees TEXT NOT NULL DEFAULT '0',
                gross_pnl TEXT NOT NULL,
                net_pnl TEXT NOT NULL,
                opened_at TEXT NOT NULL,
                closed_at TEXT,
                tags TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_trades_account ON trades(account_id);
            CREATE INDEX IF NOT EXISTS idx_trades_closed ON trades(closed_at);

            CREATE TABLE IF NOT EXISTS transfers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                amount TEXT NOT NULL,
                at TEXT NOT NULL,
                memo TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_transfers_account ON transfers(account_id);

            CREATE TABLE IF NOT EXISTS attachments (
                trade_id INTEGER PRIMARY KEY REFERENCES trades(id) ON DELETE CASCADE,
                mime TEXT NOT NULL,
                content BLOB NOT NULL
            );",
        )
        .map_err(JournalError::storage)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, JournalError> {
        self.pool.get().map_err(JournalError::storage)
    }
}

fn decimal_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    text.parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn datetime_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_datetime_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn side_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Side> {
    let text: String = row.get(idx)?;
    text.parse::<Side>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: datetime_col(row, 4)?,
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        broker: row.get(3)?,
        kind: row.get(4)?,
        description: row.get(5)?,
        created_at: datetime_col(row, 6)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    let tags: String = row.get(12)?;
    Ok(Trade {
        id: row.get(0)?,
        account_id: row.get(1)?,
        symbol: row.get(2)?,
        side: side_col(row, 3)?,
        quantity: decimal_col(row, 4)?,
        entry_price: decimal_col(row, 5)?,
        exit_price: decimal_col(row, 6)?,
        fees: decimal_col(row, 7)?,
        gross: decimal_col(row, 8)?,
        net: decimal_col(row, 9)?,
        opened_at: datetime_col(row, 10)?,
        closed_at: optional_datetime_col(row, 11)?,
        tags: parse_tags(&tags),
        notes: row.get(13)?,
    })
}

fn transfer_from_row(row: &Row<'_>) -> rusqlite::Result<Transfer> {
    Ok(Transfer {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: decimal_col(row, 2)?,
        at: datetime_col(row, 3)?,
        memo: row.get(4)?,
    })
}

const TRADE_COLUMNS: &str = "id, account_id, symbol, side, quantity, entry_price, exit_price, \
                             fees, gross_pnl, net_pnl, opened_at, closed_at, tags, notes";

impl StorePort for SqliteStore {
    fn insert_user(&self, user: &User) -> Result<i64, JournalError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (username, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.username,
                user.email,
                user.password_hash,
                user.created_at.to_rfc3339()
            ],
        )
        .map_err(JournalError::storage)?;
        Ok(conn.last_insert_rowid())
    }

    fn user(&self, id: i64) -> Result<Option<User>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?1")
            .map_err(JournalError::storage)?;
        let mut rows = stmt
            .query_map(params![id], user_from_row)
            .map_err(JournalError::storage)?;
        rows.next().transpose().map_err(JournalError::storage)
    }

    fn user_by_name(&self, username: &str) -> Result<Option<User>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1",
            )
            .map_err(JournalError::storage)?;
        let mut rows = stmt
            .query_map(params![username], user_from_row)
            .map_err(JournalError::storage)?;
        rows.next().transpose().map_err(JournalError::storage)
    }

    fn insert_account(&self, account: &Account) -> Result<i64, JournalError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (user_id, name, broker, kind, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                account.user_id,
                account.name,
                account.broker,
                account.kind,
                account.description,
                account.created_at.to_rfc3339()
            ],
        )
        .map_err(JournalError::storage)?;
        Ok(conn.last_insert_rowid())
    }

    fn account(&self, id: i64) -> Result<Option<Account>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, name, broker, kind, description, created_at
                 FROM accounts WHERE id = ?1",
            )
            .map_err(JournalError::storage)?;
        let mut rows = stmt
            .query_map(params![id], account_from_row)
            .map_err(JournalError::storage)?;
        rows.next().transpose().map_err(JournalError::storage)
    }

    fn accounts_for_user(&self, user_id: i64) -> Result<Vec<Account>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, name, broker, kind, description, created_at
                 FROM accounts WHERE user_id = ?1 ORDER BY name",
            )
            .map_err(JournalError::storage)?;
        let rows = stmt
            .query_map(params![user_id], account_from_row)
            .map_err(JournalError::storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(JournalError::storage)
    }

    fn delete_account_cascade(&self, account_id: i64) -> Result<(), JournalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(JournalError::storage)?;

        tx.execute(
            "DELETE FROM attachments
             WHERE trade_id IN (SELECT id FROM trades WHERE account_id = ?1)",
            params![account_id],
        )
        .map_err(JournalError::storage)?;
        tx.execute("DELETE FROM trades WHERE account_id = ?1", params![account_id])
            .map_err(JournalError::storage)?;
        tx.execute(
            "DELETE FROM transfers WHERE account_id = ?1",
            params![account_id],
        )
        .map_err(JournalError::storage)?;
        let deleted = tx
            .execute("DELETE FROM accounts WHERE id = ?1", params![account_id])
            .map_err(JournalError::storage)?;
        if deleted == 0 {
            // Dropping the transaction rolls the dependent deletes back.
            return Err(JournalError::not_found("account", account_id));
        }

        tx.commit().map_err(JournalError::storage)
    }

    fn insert_trade(&self, trade: &Trade) -> Result<i64, JournalError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO trades (account_id, symbol, side, quantity, entry_price, exit_price,
                                 fees, gross_pnl, net_pnl, opened_at, closed_at, tags, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                trade.account_id,
                trade.symbol,
                trade.side.to_string(),
                trade.quantity.to_string(),
                trade.entry_price.to_string(),
                trade.exit_price.to_string(),
                trade.fees.to_string(),
                trade.gross.to_string(),
                trade.net.to_string(),
                trade.opened_at.to_rfc3339(),
                trade.closed_at.map(|t| t.to_rfc3339()),
                trade.tags.join(","),
                trade.notes
            ],
        )
        .map_err(JournalError::storage)?;
        Ok(conn.last_insert_rowid())
    }

    fn update_trade(&self, trade: &Trade) -> Result<(), JournalError> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE trades
                 SET symbol = ?1, side = ?2, quantity = ?3, entry_price = ?4, exit_price = ?5,
                     fees = ?6, gross_pnl = ?7, net_pnl = ?8, opened_at = ?9, closed_at = ?10,
                     tags = ?11, notes = ?12
                 WHERE id = ?13",
                params![
                    trade.symbol,
                    trade.side.to_string(),
                    trade.quantity.to_string(),
                    trade.entry_price.to_string(),
                    trade.exit_price.to_string(),
                    trade.fees.to_string(),
                    trade.gross.to_string(),
                    trade.net.to_string(),
                    trade.opened_at.to_rfc3339(),
                    trade.closed_at.map(|t| t.to_rfc3339()),
                    trade.tags.join(","),
                    trade.notes,
                    trade.id
                ],
            )
            .map_err(JournalError::storage)?;
        if updated == 0 {
            return Err(JournalError::not_found("trade", trade.id));
        }
        Ok(())
    }

    fn trade(&self, id: i64) -> Result<Option<Trade>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {TRADE_COLUMNS} FROM trades WHERE id = ?1"))
            .map_err(JournalError::storage)?;
        let mut rows = stmt
            .query_map(params![id], trade_from_row)
            .map_err(JournalError::storage)?;
        rows.next().transpose().map_err(JournalError::storage)
    }

    fn trades(&self, filter: &TradeFilter) -> Result<Vec<Trade>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TRADE_COLUMNS} FROM trades
                 WHERE (?1 IS NULL OR account_id = ?1)
                 ORDER BY COALESCE(closed_at, opened_at), id"
            ))
            .map_err(JournalError::storage)?;
        let rows = stmt
            .query_map(params![filter.account_id], trade_from_row)
            .map_err(JournalError::storage)?;

        // Symbol, tag, and date predicates run on the decoded records so the
        // semantics stay identical across store implementations.
        let mut trades = Vec::new();
        for row in rows {
            let trade = row.map_err(JournalError::storage)?;
            if filter.matches(&trade) {
                trades.push(trade);
            }
        }
        Ok(trades)
    }

    fn delete_trade(&self, id: i64) -> Result<(), JournalError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM trades WHERE id = ?1", params![id])
            .map_err(JournalError::storage)?;
        if deleted == 0 {
            return Err(JournalError::not_found("trade", id));
        }
        Ok(())
    }

    fn insert_transfer(&self, transfer: &Transfer) -> Result<i64, JournalError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO transfers (account_id, amount, at, memo) VALUES (?1, ?2, ?3, ?4)",
            params![
                transfer.account_id,
                transfer.amount.to_string(),
                transfer.at.to_rfc3339(),
                transfer.memo
            ],
        )
        .map_err(JournalError::storage)?;
        Ok(conn.last_insert_rowid())
    }

    fn transfers_for_account(&self, account_id: i64) -> Result<Vec<Transfer>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, account_id, amount, at, memo FROM transfers
                 WHERE account_id = ?1 ORDER BY at, id",
            )
            .map_err(JournalError::storage)?;
        let rows = stmt
            .query_map(params![account_id], transfer_from_row)
            .map_err(JournalError::storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(JournalError::storage)
    }

    fn put_attachment(&self, trade_id: i64, image: &Attachment) -> Result<(), JournalError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO attachments (trade_id, mime, content) VALUES (?1, ?2, ?3)
             ON CONFLICT (trade_id) DO UPDATE SET mime = excluded.mime, content = excluded.content",
            params![trade_id, image.mime, image.content],
        )
        .map_err(JournalError::storage)?;
        Ok(())
    }

    fn attachment(&self, trade_id: i64) -> Result<Option<Attachment>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT mime, content FROM attachments WHERE trade_id = ?1")
            .map_err(JournalError::storage)?;
        let mut rows = stmt
            .query_map(params![trade_id], |row| {
                Ok(Attachment {
                    mime: row.get(0)?,
                    content: row.get(1)?,
                })
            })
            .map_err(JournalError::storage)?;
        rows.next().transpose().map_err(JournalError::storage)
    }

    fn delete_attachment(&self, trade_id: i64) -> Result<(), JournalError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM attachments WHERE trade_id = ?1",
            params![trade_id],
        )
        .map_err(JournalError::storage)?;
        Ok(())
    }
}
