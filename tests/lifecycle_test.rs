mod common;

use common::{at, draft, MockStore};
use rust_decimal::Decimal;
use tradebook::domain::error::JournalError;
use tradebook::domain::ledger::Ledger;
use tradebook::domain::lifecycle::AccountManager;
use tradebook::domain::trade::Side;
use tradebook::ports::store_port::StorePort;

fn user(store: &MockStore, name: &str) -> i64 {
    store.user_by_name(name).unwrap().unwrap().id
}

#[test]
fn duplicate_names_rejected_by_default_case_insensitively() {
    let store = MockStore::new().with_user("sam");
    let sam = user(&store, "sam");
    let manager = AccountManager::new(&store);

    manager
        .create_account(sam, "Main", None, None, None, None)
        .unwrap();
    match manager.create_account(sam, "  main ", None, None, None, None) {
        Err(JournalError::Validation {
            entity: "account",
            field: "name",
            ..
        }) => {}
        other => panic!("expected duplicate-name rejection, got {other:?}"),
    }
}

#[test]
fn duplicate_names_allowed_when_opted_in() {
    let store = MockStore::new().with_user("sam");
    let sam = user(&store, "sam");
    let manager = AccountManager::new(&store).with_duplicate_names_allowed(true);

    manager
        .create_account(sam, "Main", None, None, None, None)
        .unwrap();
    manager
        .create_account(sam, "Main", None, None, None, None)
        .unwrap();
    assert_eq!(manager.accounts(sam).unwrap().len(), 2);
}

#[test]
fn same_name_under_different_users_is_fine() {
    let store = MockStore::new().with_user("sam").with_user("kim");
    let manager = AccountManager::new(&store);

    manager
        .create_account(user(&store, "sam"), "Main", None, None, None, None)
        .unwrap();
    manager
        .create_account(user(&store, "kim"), "Main", None, None, None, None)
        .unwrap();
}

#[test]
fn initial_deposit_is_recorded_as_a_transfer() {
    let store = MockStore::new().with_user("sam");
    let sam = user(&store, "sam");
    let manager = AccountManager::new(&store);

    let account_id = manager
        .create_account(
            sam,
            "Funded",
            Some("IBKR".into()),
            Some("Margin".into()),
            None,
            Some("2500".parse().unwrap()),
        )
        .unwrap();

    let transfers = store.transfers_for_account(account_id).unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].amount, "2500".parse::<Decimal>().unwrap());
    assert_eq!(transfers[0].memo.as_deref(), Some("initial deposit"));
    assert_eq!(
        manager.balance(sam, account_id).unwrap(),
        "2500".parse::<Decimal>().unwrap()
    );
}

#[test]
fn zero_initial_deposit_rejected_before_account_exists() {
    let store = MockStore::new().with_user("sam");
    let sam = user(&store, "sam");
    let manager = AccountManager::new(&store);

    assert!(manager
        .create_account(sam, "Funded", None, None, None, Some(Decimal::ZERO))
        .is_err());
    assert!(manager.accounts(sam).unwrap().is_empty());
}

#[test]
fn balance_derives_from_transfers_and_closed_trades() {
    let store = MockStore::new().with_user("sam");
    let sam = user(&store, "sam");
    let manager = AccountManager::new(&store);
    let ledger = Ledger::new(&store);

    let account_id = manager
        .create_account(sam, "Main", None, None, None, Some("1000".parse().unwrap()))
        .unwrap();
    ledger
        .record_trade(sam, account_id, draft("ES", Side::Long, "100", "150", Some(at(2, 16))))
        .unwrap();
    // An open trade contributes nothing.
    ledger
        .record_trade(sam, account_id, draft("NQ", Side::Long, "100", "90", None))
        .unwrap();
    ledger
        .record_transfer(sam, account_id, "-200".parse().unwrap(), at(3, 9), None)
        .unwrap();

    assert_eq!(
        manager.balance(sam, account_id).unwrap(),
        "850".parse::<Decimal>().unwrap()
    );
}

#[test]
fn account_lookup_by_name_ignores_case_and_whitespace() {
    let store = MockStore::new().with_user("sam");
    let sam = user(&store, "sam");
    let manager = AccountManager::new(&store);
    let account_id = manager
        .create_account(sam, "Swing Book", None, None, None, None)
        .unwrap();

    assert_eq!(
        manager.account_by_name(sam, " swing book ").unwrap().id,
        account_id
    );
    assert!(manager.account_by_name(sam, "missing").is_err());
}

#[test]
fn cascade_delete_empties_the_account_and_its_history() {
    let store = MockStore::new().with_user("sam");
    let sam = user(&store, "sam");
    let manager = AccountManager::new(&store);
    let ledger = Ledger::new(&store);

    let doomed = manager
        .create_account(sam, "Doomed", None, None, None, Some("500".parse().unwrap()))
        .unwrap();
    let kept = manager
        .create_account(sam, "Kept", None, None, None, None)
        .unwrap();
    let trade_id = ledger
        .record_trade(sam, doomed, draft("ES", Side::Long, "100", "110", Some(at(1, 16))))
        .unwrap();
    ledger
        .attach_image(sam, trade_id, vec![1], "image/png".into())
        .unwrap();
    ledger
        .record_trade(sam, kept, draft("NQ", Side::Long, "10", "11", None))
        .unwrap();

    manager.delete_account(sam, doomed).unwrap();

    assert!(store.account(doomed).unwrap().is_none());
    assert!(store.trade(trade_id).unwrap().is_none());
    assert!(store.attachment(trade_id).unwrap().is_none());
    assert!(store.transfers_for_account(doomed).unwrap().is_empty());
    assert_eq!(store.trade_count(), 1);
    assert!(matches!(
        manager.balance(sam, doomed),
        Err(JournalError::NotFound { .. })
    ));
}

#[test]
fn delete_account_checks_ownership() {
    let store = MockStore::new().with_user("sam").with_user("eve");
    let manager = AccountManager::new(&store);
    let account_id = manager
        .create_account(user(&store, "sam"), "Main", None, None, None, None)
        .unwrap();

    assert!(matches!(
        manager.delete_account(user(&store, "eve"), account_id),
        Err(JournalError::Authorization {
            entity: "account",
            ..
        })
    ));
    assert!(store.account(account_id).unwrap().is_some());
}
