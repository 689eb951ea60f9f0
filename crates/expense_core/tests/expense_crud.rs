use expense_core::db::migrations::{latest_version, AMOUNT_INDEX};
use expense_core::db::open_db_in_memory;
use expense_core::{
    Amount, Expense, ExpenseRepository, ExpenseValidationError, NewExpense, RepoError,
    SqliteExpenseRepository,
};
use rusqlite::Connection;

fn draft(title: &str, amount: &str) -> NewExpense {
    NewExpense::parse(title, amount).unwrap()
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let id = repo.create_expense(&draft("Rent", "1200")).unwrap();

    let loaded = repo.get_expense(id).unwrap().unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.title, "Rent");
    assert_eq!(loaded.amount, Amount::from_units(1200));
}

#[test]
fn ids_increase_and_are_never_reused() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let first = repo.create_expense(&draft("a", "1")).unwrap();
    let second = repo.create_expense(&draft("b", "2")).unwrap();
    assert!(second > first);

    repo.delete_expense(second).unwrap();
    let third = repo.create_expense(&draft("c", "3")).unwrap();
    assert!(third > second);
}

#[test]
fn get_missing_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    assert!(repo.get_expense(42).unwrap().is_none());
}

#[test]
fn update_existing_expense_keeps_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let id = repo.create_expense(&draft("Food", "45")).unwrap();
    let changed = Expense {
        id,
        title: "Groceries".to_string(),
        amount: Amount::parse("52.30").unwrap(),
    };
    repo.update_expense(&changed).unwrap();

    let loaded = repo.get_expense(id).unwrap().unwrap();
    assert_eq!(loaded, changed);
}

#[test]
fn update_not_found_returns_not_found_and_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let ghost = Expense {
        id: 77,
        title: "ghost".to_string(),
        amount: Amount::ZERO,
    };
    let err = repo.update_expense(&ghost).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(77)));
    assert!(repo.get_expense(77).unwrap().is_none());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM expenses;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let id = repo.create_expense(&draft("Gym", "30")).unwrap();
    repo.delete_expense(id).unwrap();
    repo.delete_expense(id).unwrap();
    repo.delete_expense(9_999).unwrap();

    assert!(repo.get_expense(id).unwrap().is_none());
}

#[test]
fn validation_failure_blocks_create_and_update() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let blank = NewExpense {
        title: "   ".to_string(),
        amount: Amount::ZERO,
    };
    let create_err = repo.create_expense(&blank).unwrap_err();
    assert!(matches!(
        create_err,
        RepoError::Validation(ExpenseValidationError::EmptyTitle)
    ));

    let id = repo.create_expense(&draft("ok", "1")).unwrap();
    let update_err = repo
        .update_expense(&Expense {
            id,
            title: String::new(),
            amount: Amount::ZERO,
        })
        .unwrap_err();
    assert!(matches!(update_err, RepoError::Validation(_)));
    assert_eq!(repo.get_expense(id).unwrap().unwrap().title, "ok");
}

#[test]
fn padded_titles_from_struct_literals_are_stored_trimmed() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let id = repo
        .create_expense(&NewExpense {
            title: "  Rent  ".to_string(),
            amount: Amount::from_units(1200),
        })
        .unwrap();
    assert_eq!(repo.get_expense(id).unwrap().unwrap().title, "Rent");

    repo.update_expense(&Expense {
        id,
        title: "\tHousing ".to_string(),
        amount: Amount::from_units(1200),
    })
    .unwrap();
    let stored: String = conn
        .query_row("SELECT title FROM expenses WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(stored, "Housing");
}

#[test]
fn corrupted_row_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    conn.execute(
        "INSERT INTO expenses (title, amount_cents) VALUES ('', 100);",
        [],
    )
    .unwrap();
    let id = conn.last_insert_rowid();

    let err = repo.get_expense(id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn list_ids_by_title_follows_title_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let rent = repo.create_expense(&draft("Rent", "1200")).unwrap();
    let food = repo.create_expense(&draft("Food", "45")).unwrap();
    let bills = repo.create_expense(&draft("Bills", "80")).unwrap();

    assert_eq!(repo.list_ids_by_title().unwrap(), vec![bills, food, rent]);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteExpenseRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_expenses_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteExpenseRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("expenses"))
    ));
}

#[test]
fn repository_rejects_connection_without_amount_index() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(&format!("DROP INDEX {AMOUNT_INDEX};"))
        .unwrap();

    assert!(matches!(
        SqliteExpenseRepository::try_new(&conn),
        Err(RepoError::MissingRequiredIndex(name)) if name == AMOUNT_INDEX
    ));
}
