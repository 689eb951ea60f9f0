use expense_core::{
    Amount, AmountRange, DbError, Expense, ExpenseStore, NewExpense, RepoError, StoreConfig,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn draft(title: &str, amount: &str) -> NewExpense {
    NewExpense::parse(title, amount).unwrap()
}

#[tokio::test]
async fn open_in_memory_and_roundtrip() {
    let store = ExpenseStore::open(&StoreConfig::in_memory()).await.unwrap();
    assert_eq!(store.name(), "expenses");

    let id = store.insert(draft("Coffee", "3.50")).await.unwrap();
    let loaded = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Coffee");
    assert_eq!(loaded.amount, Amount::from_cents(350));
}

#[tokio::test]
async fn file_store_persists_across_handles() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("expenses.db"));

    let first = ExpenseStore::open(&config).await.unwrap();
    let id = first.insert(draft("Rent", "1200")).await.unwrap();
    drop(first);

    let second = ExpenseStore::open(&config).await.unwrap();
    let loaded = second.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(loaded.amount, Amount::from_units(1200));
}

#[tokio::test]
async fn open_failure_is_reported_instead_of_a_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = ExpenseStore::open(&StoreConfig::file(&path)).await.unwrap_err();
    assert!(matches!(err, DbError::UnsupportedSchemaVersion { .. }));
}

#[tokio::test]
async fn blocked_open_surfaces_blocked_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let holder = Connection::open(&path).unwrap();
    holder
        .execute_batch("CREATE TABLE other_tab (x INTEGER); BEGIN EXCLUSIVE;")
        .unwrap();

    let config = StoreConfig::file(&path).with_busy_timeout(Duration::from_millis(50));
    let err = ExpenseStore::open(&config).await.unwrap_err();
    assert!(matches!(err, DbError::Blocked { .. }), "{err}");
}

#[tokio::test]
async fn update_missing_id_is_not_found() {
    let store = ExpenseStore::open(&StoreConfig::in_memory()).await.unwrap();

    let err = store.update(5, draft("x", "1")).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound(5)));
    assert!(store.search(AmountRange::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn range_callback_runs_per_match_and_reports_count() {
    let store = ExpenseStore::open(&StoreConfig::in_memory()).await.unwrap();
    for (title, amount) in [("a", "5"), ("b", "15"), ("c", "25"), ("d", "15")] {
        store.insert(draft(title, amount)).await.unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let matched = store
        .range_by_amount(
            AmountRange::parse("10", "20").unwrap(),
            move |expense: &Expense| sink.lock().unwrap().push(expense.title.clone()),
        )
        .await
        .unwrap();

    assert_eq!(matched, 2);
    let mut titles = seen.lock().unwrap().clone();
    titles.sort();
    assert_eq!(titles, vec!["b", "d"]);
}

#[tokio::test]
async fn range_with_no_matches_completes_with_zero() {
    let store = ExpenseStore::open(&StoreConfig::in_memory()).await.unwrap();
    store.insert(draft("a", "5")).await.unwrap();

    let matched = store
        .range_by_amount(AmountRange::parse("100", "10").unwrap(), |_: &Expense| {})
        .await
        .unwrap();
    assert_eq!(matched, 0);
}

#[tokio::test]
async fn panicking_visitor_fails_only_its_own_request() {
    let store = ExpenseStore::open(&StoreConfig::in_memory()).await.unwrap();
    let reader = store.clone();
    store.insert(draft("a", "1")).await.unwrap();

    let err = store
        .range_by_amount(AmountRange::all(), |_: &Expense| panic!("visitor gave up"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, RepoError::VisitorPanicked(message) if message.contains("visitor gave up")),
        "{err}"
    );

    let id = store.insert(draft("b", "2")).await.unwrap();
    assert_eq!(reader.get_by_id(id).await.unwrap().unwrap().title, "b");
    assert_eq!(reader.search(AmountRange::all()).await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_from_clones_all_complete() {
    let store = ExpenseStore::open(&StoreConfig::in_memory()).await.unwrap();

    let mut tasks = Vec::new();
    for n in 0..20 {
        let handle = store.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .insert(NewExpense::new(format!("item {n}"), Amount::from_units(n)).unwrap())
                .await
        }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);

    let all = store.search(AmountRange::all()).await.unwrap();
    assert_eq!(all.len(), 20);
}

#[tokio::test]
async fn requests_on_one_handle_complete_in_submission_order() {
    let store = ExpenseStore::open(&StoreConfig::in_memory()).await.unwrap();
    let id = store.insert(draft("Food", "45")).await.unwrap();

    // Issued back to back without awaiting in between.
    let update = store.update(id, draft("Food", "60"));
    let delete = store.delete_by_id(id);
    let (updated, deleted) = tokio::join!(update, delete);
    updated.unwrap();
    deleted.unwrap();

    assert!(store.get_by_id(id).await.unwrap().is_none());
}
