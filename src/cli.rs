//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_export::write_trades_csv;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::equity::build_curve;
use crate::domain::error::JournalError;
use crate::domain::ledger::Ledger;
use crate::domain::lifecycle::AccountManager;
use crate::domain::metrics::{daily_pnl, GroupingZone, Summary};
use crate::domain::trade::{parse_tags, Side, TradeDraft};
use crate::domain::user::{self, hash_password};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{StorePort, TradeFilter};

#[derive(Parser, Debug)]
#[command(name = "tradebook", about = "Personal trading journal")]
pub struct Cli {
    /// Path to the INI config file
    #[arg(short, long, global = true, default_value = "tradebook.ini")]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the journal database and schema
    Init,
    /// Register a user (password read from stdin)
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Output an argon2 hash for a password read from stdin
    HashPassword,
    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },
    /// Record and inspect trades
    Trade {
        #[command(subcommand)]
        command: TradeCommand,
    },
    /// Record deposits and withdrawals
    Transfer {
        #[command(subcommand)]
        command: TransferCommand,
    },
    /// Performance reports
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Export trades to CSV
    Export {
        #[arg(long)]
        user: String,
        #[arg(long)]
        account: String,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        closed_only: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Create an account, optionally with an initial deposit
    Add {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        broker: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        deposit: Option<Decimal>,
    },
    /// Delete an account and all of its trades, transfers, and attachments
    Rm {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
    },
    /// List accounts with derived balances
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TradeCommand {
    /// Record a trade
    Add {
        #[arg(long)]
        user: String,
        #[arg(long)]
        account: String,
        #[command(flatten)]
        fields: TradeFields,
    },
    /// Replace the fields of an existing trade
    Edit {
        #[arg(long)]
        user: String,
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        fields: TradeFields,
    },
    /// Delete a trade and its attachment
    Rm {
        #[arg(long)]
        user: String,
        #[arg(long)]
        id: i64,
    },
    /// List trades for an account
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        account: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        closed_only: bool,
        #[arg(long)]
        json: bool,
    },
    /// Attach a chart image to a trade
    Attach {
        #[arg(long)]
        user: String,
        #[arg(long)]
        id: i64,
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct TradeFields {
    #[arg(long)]
    pub symbol: String,
    #[arg(long)]
    pub side: Side,
    #[arg(long)]
    pub quantity: Decimal,
    #[arg(long)]
    pub entry: Decimal,
    #[arg(long)]
    pub exit: Decimal,
    #[arg(long, default_value = "0")]
    pub fees: Decimal,
    /// When the position was opened (RFC 3339, `YYYY-MM-DD HH:MM`, or a date)
    #[arg(long)]
    pub opened: String,
    /// When the position was closed; omit for an open trade
    #[arg(long)]
    pub closed: Option<String>,
    /// Record this net P&L instead of the computed one
    #[arg(long)]
    pub net: Option<Decimal>,
    /// Comma-separated tags
    #[arg(long, default_value = "")]
    pub tags: String,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Subcommand, Debug)]
pub enum TransferCommand {
    /// Deposit cash into an account
    Deposit {
        #[arg(long)]
        user: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        memo: Option<String>,
    },
    /// Withdraw cash from an account
    Withdraw {
        #[arg(long)]
        user: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        memo: Option<String>,
    },
    /// List transfers for an account
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Win rate, streaks, and totals over closed trades
    Summary {
        #[arg(long)]
        user: String,
        #[arg(long)]
        account: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Net P&L per calendar day
    Daily {
        #[arg(long)]
        user: String,
        #[arg(long)]
        account: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Balance-over-time curve from the event log
    Equity {
        #[arg(long)]
        user: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        json: bool,
    },
}

/// Filter flags shared by trade listings, reports, and export.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub symbol: Option<String>,
    /// May be given multiple times; every tag must match
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl FilterArgs {
    fn into_filter(self, closed_only: bool) -> TradeFilter {
        TradeFilter {
            account_id: None,
            symbol: self.symbol,
            tags: self.tags,
            from: self.from,
            to: self.to,
            closed_only,
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn dispatch(cli: Cli) -> Result<(), JournalError> {
    let config_path = cli.config;
    match cli.command {
        Command::Init => run_init(&config_path),
        Command::Register { username, email } => {
            run_register(&config_path, &username, email.as_deref())
        }
        Command::HashPassword => run_hash_password(),
        Command::Account { command } => run_account(&config_path, command),
        Command::Trade { command } => run_trade(&config_path, command),
        Command::Transfer { command } => run_transfer(&config_path, command),
        Command::Report { command } => run_report(&config_path, command),
        Command::Export {
            user,
            account,
            output,
            filter,
            closed_only,
        } => run_export(&config_path, &user, &account, &output, filter, closed_only),
    }
}

struct App {
    store: SqliteStore,
    zone: GroupingZone,
    allow_duplicate_names: bool,
}

impl App {
    fn open(config_path: &Path) -> Result<Self, JournalError> {
        let config =
            FileConfigAdapter::from_file(config_path).map_err(|e| JournalError::ConfigParse {
                file: config_path.display().to_string(),
                reason: e.to_string(),
            })?;
        let zone = match config.get_string("journal", "timezone") {
            Some(value) => GroupingZone::parse(&value)?,
            None => GroupingZone::Utc,
        };
        let allow_duplicate_names =
            config.get_bool("journal", "allow_duplicate_account_names", false);
        let store = SqliteStore::from_config(&config)?;
        Ok(App {
            store,
            zone,
            allow_duplicate_names,
        })
    }

    fn accounts(&self) -> AccountManager<'_> {
        AccountManager::new(&self.store)
            .with_duplicate_names_allowed(self.allow_duplicate_names)
    }

    fn ledger(&self) -> Ledger<'_> {
        Ledger::new(&self.store)
    }

    fn user_id(&self, username: &str) -> Result<i64, JournalError> {
        self.store
            .user_by_name(username.trim())?
            .map(|u| u.id)
            .ok_or_else(|| {
                JournalError::validation(
                    "user",
                    "username",
                    format!("no user named '{}'", username.trim()),
                )
            })
    }

    /// Resolve `--user`/`--account` names to (user_id, account_id).
    fn scope(&self, username: &str, account_name: &str) -> Result<(i64, i64), JournalError> {
        let user_id = self.user_id(username)?;
        let account = self.accounts().account_by_name(user_id, account_name)?;
        Ok((user_id, account.id))
    }
}

fn run_init(config_path: &Path) -> Result<(), JournalError> {
    let app = App::open(config_path)?;
    app.store.initialize_schema()?;
    eprintln!("journal initialized");
    Ok(())
}

fn run_register(
    config_path: &Path,
    username: &str,
    email: Option<&str>,
) -> Result<(), JournalError> {
    let app = App::open(config_path)?;
    let password = read_password()?;
    let id = user::register(&app.store, username, email, &password)?;
    println!("registered user '{}' (id {id})", username.trim());
    Ok(())
}

fn run_hash_password() -> Result<(), JournalError> {
    let password = read_password()?;
    println!("{}", hash_password(&password)?);
    Ok(())
}

fn read_password() -> Result<String, JournalError> {
    eprintln!("Enter password:");
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().transpose()?.unwrap_or_default();
    Ok(line.trim_end().to_string())
}

fn run_account(config_path: &Path, command: AccountCommand) -> Result<(), JournalError> {
    let app = App::open(config_path)?;
    match command {
        AccountCommand::Add {
            user,
            name,
            broker,
            kind,
            description,
            deposit,
        } => {
            let user_id = app.user_id(&user)?;
            let id = app
                .accounts()
                .create_account(user_id, &name, broker, kind, description, deposit)?;
            println!("created account '{}' (id {id})", name.trim());
            Ok(())
        }
        AccountCommand::Rm { user, name } => {
            let (user_id, account_id) = app.scope(&user, &name)?;
            app.accounts().delete_account(user_id, account_id)?;
            println!("deleted account '{}'", name.trim());
            Ok(())
        }
        AccountCommand::List { user, json } => {
            let user_id = app.user_id(&user)?;
            let manager = app.accounts();
            let accounts = manager.accounts(user_id)?;
            if json {
                let mut rows = Vec::new();
                for account in &accounts {
                    rows.push(serde_json::json!({
                        "id": account.id,
                        "name": account.name,
                        "broker": account.broker,
                        "kind": account.kind,
                        "balance": manager.balance(user_id, account.id)?,
                    }));
                }
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for account in &accounts {
                    let balance = manager.balance(user_id, account.id)?;
                    println!(
                        "{:<20} {:<12} {:<10} {:>14}",
                        account.name,
                        account.broker.as_deref().unwrap_or("-"),
                        account.kind.as_deref().unwrap_or("-"),
                        balance
                    );
                }
            }
            Ok(())
        }
    }
}

fn draft_from_fields(fields: TradeFields) -> Result<TradeDraft, JournalError> {
    let opened_at = parse_timestamp("opened", &fields.opened)?;
    let closed_at = fields
        .closed
        .as_deref()
        .map(|s| parse_timestamp("closed", s))
        .transpose()?;
    Ok(TradeDraft {
        symbol: fields.symbol,
        side: fields.side,
        quantity: fields.quantity,
        entry_price: fields.entry,
        exit_price: fields.exit,
        fees: fields.fees,
        opened_at,
        closed_at,
        manual_net: fields.net,
        tags: parse_tags(&fields.tags),
        notes: fields.notes,
    })
}

fn run_trade(config_path: &Path, command: TradeCommand) -> Result<(), JournalError> {
    let app = App::open(config_path)?;
    match command {
        TradeCommand::Add {
            user,
            account,
            fields,
        } => {
            let (user_id, account_id) = app.scope(&user, &account)?;
            let draft = draft_from_fields(fields)?;
            let id = app.ledger().record_trade(user_id, account_id, draft)?;
            println!("recorded trade {id}");
            Ok(())
        }
        TradeCommand::Edit { user, id, fields } => {
            let user_id = app.user_id(&user)?;
            let draft = draft_from_fields(fields)?;
            app.ledger().edit_trade(user_id, id, draft)?;
            println!("updated trade {id}");
            Ok(())
        }
        TradeCommand::Rm { user, id } => {
            let user_id = app.user_id(&user)?;
            app.ledger().delete_trade(user_id, id)?;
            println!("deleted trade {id}");
            Ok(())
        }
        TradeCommand::List {
            user,
            account,
            filter,
            closed_only,
            json,
        } => {
            let (user_id, account_id) = app.scope(&user, &account)?;
            let trades =
                app.ledger()
                    .trades(user_id, account_id, filter.into_filter(closed_only))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&trades)?);
            } else {
                for trade in &trades {
                    println!(
                        "{:>5}  {:<8} {:<5} {:>10} @ {:>10} -> {:>10}  net {:>12}  {}",
                        trade.id,
                        trade.symbol,
                        trade.side,
                        trade.quantity,
                        trade.entry_price,
                        trade.exit_price,
                        trade.net,
                        trade
                            .closed_at
                            .map(|t| t.format("%Y-%m-%d").to_string())
                            .unwrap_or_else(|| "open".to_string())
                    );
                }
            }
            Ok(())
        }
        TradeCommand::Attach { user, id, file } => {
            let user_id = app.user_id(&user)?;
            let content = fs::read(&file)?;
            let mime = mime_for(&file).to_string();
            app.ledger().attach_image(user_id, id, content, mime)?;
            println!("attached {} to trade {id}", file.display());
            Ok(())
        }
    }
}

fn run_transfer(config_path: &Path, command: TransferCommand) -> Result<(), JournalError> {
    let app = App::open(config_path)?;
    match command {
        TransferCommand::Deposit {
            user,
            account,
            amount,
            at,
            memo,
        } => record_transfer(&app, &user, &account, amount, at.as_deref(), memo),
        TransferCommand::Withdraw {
            user,
            account,
            amount,
            at,
            memo,
        } => record_transfer(&app, &user, &account, -amount, at.as_deref(), memo),
        TransferCommand::List {
            user,
            account,
            json,
        } => {
            let (user_id, account_id) = app.scope(&user, &account)?;
            let transfers = app.ledger().transfers(user_id, account_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&transfers)?);
            } else {
                for transfer in &transfers {
                    println!(
                        "{:>5}  {}  {:>14}  {}",
                        transfer.id,
                        transfer.at.format("%Y-%m-%d %H:%M"),
                        transfer.amount,
                        transfer.memo.as_deref().unwrap_or("")
                    );
                }
            }
            Ok(())
        }
    }
}

fn record_transfer(
    app: &App,
    user: &str,
    account: &str,
    amount: Decimal,
    at: Option<&str>,
    memo: Option<String>,
) -> Result<(), JournalError> {
    let (user_id, account_id) = app.scope(user, account)?;
    let at = match at {
        Some(s) => parse_timestamp("at", s)?,
        None => Utc::now(),
    };
    let id = app
        .ledger()
        .record_transfer(user_id, account_id, amount, at, memo)?;
    println!("recorded transfer {id}");
    Ok(())
}

fn run_report(config_path: &Path, command: ReportCommand) -> Result<(), JournalError> {
    let app = App::open(config_path)?;
    match command {
        ReportCommand::Summary {
            user,
            account,
            filter,
            json,
        } => {
            let (user_id, account_id) = app.scope(&user, &account)?;
            let trades = app
                .ledger()
                .trades(user_id, account_id, filter.into_filter(true))?;
            let summary = Summary::compute(&trades);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("trades:           {}", summary.total_trades);
                println!(
                    "wins/losses/even: {}/{}/{}",
                    summary.wins, summary.losses, summary.break_even
                );
                println!("win rate:         {:.1}%", summary.win_rate * 100.0);
                println!("total net:        {}", summary.total_net);
                println!("average net:      {}", summary.average_net);
                println!(
                    "win streak:       {} (best {})",
                    summary.win_streak, summary.best_win_streak
                );
            }
            Ok(())
        }
        ReportCommand::Daily {
            user,
            account,
            filter,
            json,
        } => {
            let (user_id, account_id) = app.scope(&user, &account)?;
            let trades = app
                .ledger()
                .trades(user_id, account_id, filter.into_filter(true))?;
            let days = daily_pnl(&trades, app.zone);
            if json {
                println!("{}", serde_json::to_string_pretty(&days)?);
            } else {
                for (day, total) in &days {
                    println!("{day}  {:>14}  ({} trades)", total.net, total.trades);
                }
            }
            Ok(())
        }
        ReportCommand::Equity {
            user,
            account,
            json,
        } => {
            let (user_id, account_id) = app.scope(&user, &account)?;
            let ledger = app.ledger();
            let transfers = ledger.transfers(user_id, account_id)?;
            let trades =
                ledger.trades(user_id, account_id, TradeFilter::closed_for_account(account_id))?;
            let curve = build_curve(&transfers, &trades, Decimal::ZERO);
            if json {
                println!("{}", serde_json::to_string_pretty(&curve)?);
            } else {
                for point in &curve {
                    println!(
                        "{}  {:>14}",
                        point.at.format("%Y-%m-%d %H:%M"),
                        point.balance
                    );
                }
            }
            Ok(())
        }
    }
}

fn run_export(
    config_path: &Path,
    user: &str,
    account: &str,
    output: &Path,
    filter: FilterArgs,
    closed_only: bool,
) -> Result<(), JournalError> {
    let app = App::open(config_path)?;
    let (user_id, account_id) = app.scope(user, account)?;
    let trades = app
        .ledger()
        .trades(user_id, account_id, filter.into_filter(closed_only))?;
    write_trades_csv(output, &trades)?;
    eprintln!("wrote {} trades to {}", trades.len(), output.display());
    Ok(())
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM`, or a bare
/// date (midnight). Naive inputs are taken as UTC.
fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, JournalError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(JournalError::validation(
        "trade",
        field,
        format!("'{raw}' is not a recognized timestamp"),
    ))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
