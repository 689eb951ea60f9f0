//! Store worker thread: owns the SQLite connection and services commands
//! one at a time, in submission order.

use crate::config::StoreConfig;
use crate::db::{open_with_config, DbResult};
use crate::model::expense::{Expense, ExpenseId, NewExpense};
use crate::logging::{panic_summary, panic_text};
use crate::repo::expense_repo::{
    ExpenseRepository, RepoError, RepoResult, SqliteExpenseRepository,
};
use crate::search::range::AmountRange;
use log::{error, info};
use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

pub(super) type Reply<T> = oneshot::Sender<RepoResult<T>>;

/// Per-row visitor run on the worker thread during an amount scan.
pub(super) type RowVisitor = Box<dyn FnMut(&Expense) + Send>;

pub(super) enum Command {
    Insert {
        draft: NewExpense,
        reply: Reply<ExpenseId>,
    },
    Get {
        id: ExpenseId,
        reply: Reply<Option<Expense>>,
    },
    Update {
        expense: Expense,
        reply: Reply<()>,
    },
    Delete {
        id: ExpenseId,
        reply: Reply<()>,
    },
    ScanAmount {
        range: AmountRange,
        on_each: RowVisitor,
        reply: Reply<usize>,
    },
    SearchAmount {
        range: AmountRange,
        reply: Reply<Vec<Expense>>,
    },
    ListIdsByTitle {
        reply: Reply<Vec<ExpenseId>>,
    },
}

/// Starts the worker. `ready` receives the open outcome before any command
/// is read, so queued commands only ever see a migrated store.
pub(super) fn spawn(
    config: StoreConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    ready: oneshot::Sender<DbResult<()>>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("expense-store-{}", config.name))
        .spawn(move || run(config, commands, ready))
}

fn run(
    config: StoreConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    ready: oneshot::Sender<DbResult<()>>,
) {
    let conn = match open_with_config(&config) {
        Ok(conn) => conn,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        // Nobody awaited the open; drop the connection right away.
        return;
    }

    info!(
        "event=store_worker module=store status=start store={}",
        config.name
    );
    let repo = SqliteExpenseRepository::new(&conn);
    let mut handled = 0u64;
    while let Some(command) = commands.blocking_recv() {
        // A panic drops that request's reply (its caller sees `StoreClosed`)
        // but the worker keeps serving the queue.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(&repo, command)));
        if let Err(payload) = outcome {
            error!(
                "event=store_worker module=store status=command_panicked store={} payload={}",
                config.name,
                panic_summary(payload.as_ref())
            );
        }
        handled += 1;
    }
    info!(
        "event=store_worker module=store status=stopped store={} commands={}",
        config.name, handled
    );
}

fn dispatch(repo: &impl ExpenseRepository, command: Command) {
    // A send error means the caller stopped waiting; the work is done anyway.
    match command {
        Command::Insert { draft, reply } => {
            let _ = reply.send(repo.create_expense(&draft));
        }
        Command::Get { id, reply } => {
            let _ = reply.send(repo.get_expense(id));
        }
        Command::Update { expense, reply } => {
            let _ = reply.send(repo.update_expense(&expense));
        }
        Command::Delete { id, reply } => {
            let _ = reply.send(repo.delete_expense(id));
        }
        Command::ScanAmount {
            range,
            mut on_each,
            reply,
        } => {
            let scanned = panic::catch_unwind(AssertUnwindSafe(|| {
                repo.scan_amount_range(range, &mut *on_each)
            }))
            .unwrap_or_else(|payload| {
                error!(
                    "event=amount_range_scan module=store status=visitor_panicked payload={}",
                    panic_summary(payload.as_ref())
                );
                Err(RepoError::VisitorPanicked(panic_text(payload.as_ref())))
            });
            let _ = reply.send(scanned);
        }
        Command::SearchAmount { range, reply } => {
            let mut found = Vec::new();
            let scanned = repo.scan_amount_range(range, &mut |expense: &Expense| {
                found.push(expense.clone());
            });
            let _ = reply.send(scanned.map(|_| found));
        }
        Command::ListIdsByTitle { reply } => {
            let _ = reply.send(repo.list_ids_by_title());
        }
    }
}
