use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AccountKind, CreateAccountCmd, CreateEntryCmd, Engine, EngineError, EntryKind,
    EntryListFilter, TransferCmd, UpdateEntryCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username) VALUES (?)",
        vec!["alice".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn account_with_balance(engine: &Engine, name: &str, balance_minor: i64) -> Uuid {
    engine
        .create_account(
            CreateAccountCmd::new("alice", name, AccountKind::Bank)
                .opening_balance_minor(balance_minor),
        )
        .await
        .unwrap()
        .id
}

async fn balance_of(engine: &Engine, account_id: Uuid) -> i64 {
    engine
        .account("alice", account_id)
        .await
        .unwrap()
        .balance_minor
}

#[tokio::test]
async fn expense_entry_decrements_linked_account() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 100).await;

    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 30, Utc::now())
                .account_id(account_id)
                .category("food"),
        )
        .await
        .unwrap();

    assert_eq!(balance_of(&engine, account_id).await, 70);
    assert!(!entry.is_deleted());
    assert_eq!(entry.category.as_deref(), Some("food"));
}

#[tokio::test]
async fn soft_delete_then_restore_round_trips_balance() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 100).await;

    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 30, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 70);

    engine
        .soft_delete_entry("alice", entry.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 100);
    let deleted = engine.entry("alice", entry.id).await.unwrap();
    assert!(deleted.is_deleted());
    assert_eq!(deleted.deleted_by.as_deref(), Some("alice"));

    let restored = engine.restore_entry("alice", entry.id).await.unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 70);
    assert!(!restored.is_deleted());
}

#[tokio::test]
async fn repeated_soft_delete_never_double_reverses() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 100).await;

    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Income, 40, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 140);

    engine
        .soft_delete_entry("alice", entry.id, Utc::now())
        .await
        .unwrap();
    let err = engine
        .soft_delete_entry("alice", entry.id, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Conflict("entry already deleted".to_string())
    );
    assert_eq!(balance_of(&engine, account_id).await, 100);

    engine.restore_entry("alice", entry.id).await.unwrap();
    let err = engine.restore_entry("alice", entry.id).await.unwrap_err();
    assert_eq!(err, EngineError::Conflict("entry is not deleted".to_string()));
    assert_eq!(balance_of(&engine, account_id).await, 140);
}

#[tokio::test]
async fn transfer_moves_amount_exactly_once() {
    let (engine, _db) = engine_with_db().await;
    let from_id = account_with_balance(&engine, "A", 50).await;
    let to_id = account_with_balance(&engine, "B", 0).await;

    let detail = engine
        .create_transfer(TransferCmd::new("alice", from_id, to_id, 50, Utc::now()))
        .await
        .unwrap();

    assert_eq!(detail.from_account.balance_minor, 0);
    assert_eq!(detail.to_account.balance_minor, 50);
    assert_eq!(detail.transfer.amount_minor, 50);

    let transfers = engine.list_transfers("alice", Some(from_id)).await.unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].id, detail.transfer.id);
}

#[tokio::test]
async fn insufficient_funds_rejects_expense_with_no_side_effects() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 10).await;

    let err = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 20, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientFunds("Checking".to_string()));
    assert_eq!(balance_of(&engine, account_id).await, 10);

    let entries = engine
        .list_entries(EntryListFilter::new("alice").include_deleted(true))
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn insufficient_funds_rejects_transfer_with_no_side_effects() {
    let (engine, _db) = engine_with_db().await;
    let from_id = account_with_balance(&engine, "A", 30).await;
    let to_id = account_with_balance(&engine, "B", 5).await;

    let err = engine
        .create_transfer(TransferCmd::new("alice", from_id, to_id, 31, Utc::now()))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientFunds("A".to_string()));

    assert_eq!(balance_of(&engine, from_id).await, 30);
    assert_eq!(balance_of(&engine, to_id).await, 5);
    assert!(engine.list_transfers("alice", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn amend_kind_flip_reverses_then_applies() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 100).await;

    // Expense 40 against a 100 opening balance: 60.
    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 40, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 60);

    // Flipping the kind keeps the magnitude: reverse -40 back to 100, then
    // apply +40.
    let amended = engine
        .update_entry(UpdateEntryCmd::new("alice", entry.id).kind(EntryKind::Income))
        .await
        .unwrap();
    assert_eq!(amended.kind, EntryKind::Income);
    assert_eq!(amended.amount_minor, 40);
    assert_eq!(balance_of(&engine, account_id).await, 140);
}

#[tokio::test]
async fn amend_amount_applies_net_delta() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 1000).await;

    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 100, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 900);

    let amended = engine
        .update_entry(UpdateEntryCmd::new("alice", entry.id).amount_minor(150))
        .await
        .unwrap();
    assert_eq!(amended.kind, EntryKind::Expense);
    assert_eq!(balance_of(&engine, account_id).await, 850);
}

#[tokio::test]
async fn amend_retarget_moves_effect_between_accounts() {
    let (engine, _db) = engine_with_db().await;
    let first_id = account_with_balance(&engine, "First", 500).await;
    let second_id = account_with_balance(&engine, "Second", 500).await;

    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 200, Utc::now())
                .account_id(first_id),
        )
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, first_id).await, 300);

    let amended = engine
        .update_entry(UpdateEntryCmd::new("alice", entry.id).account_id(second_id))
        .await
        .unwrap();
    assert_eq!(amended.account_id, Some(second_id));
    assert_eq!(balance_of(&engine, first_id).await, 500);
    assert_eq!(balance_of(&engine, second_id).await, 300);
}

#[tokio::test]
async fn amend_deleted_entry_is_a_conflict() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 100).await;

    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 10, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    engine
        .soft_delete_entry("alice", entry.id, Utc::now())
        .await
        .unwrap();

    let err = engine
        .update_entry(UpdateEntryCmd::new("alice", entry.id).amount_minor(20))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Conflict("cannot amend a deleted entry".to_string())
    );
    assert_eq!(balance_of(&engine, account_id).await, 100);
}

#[tokio::test]
async fn purge_active_entry_reverses_effect() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 100).await;

    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 25, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 75);

    engine.purge_entry("alice", entry.id).await.unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 100);

    let err = engine.entry("alice", entry.id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("entry not exists".to_string()));
}

#[tokio::test]
async fn purge_deleted_entry_leaves_balance_alone() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 100).await;

    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Income, 60, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    engine
        .soft_delete_entry("alice", entry.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 100);

    engine.purge_entry("alice", entry.id).await.unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 100);
}

#[tokio::test]
async fn restore_fails_when_account_hard_deleted() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Doomed", 100).await;

    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 30, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    engine
        .soft_delete_entry("alice", entry.id, Utc::now())
        .await
        .unwrap();
    engine.hard_delete_account("alice", account_id).await.unwrap();

    let err = engine.restore_entry("alice", entry.id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("account not exists".to_string()));

    // The entry stays deleted: no active entry may point at nothing.
    let entry = engine.entry("alice", entry.id).await.unwrap();
    assert!(entry.is_deleted());
}

#[tokio::test]
async fn entries_on_missing_accounts_are_rejected() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Income, 10, Utc::now())
                .account_id(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("account not exists".to_string()));
}

#[tokio::test]
async fn soft_deleted_account_rejects_new_entries() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Old", 100).await;
    engine.soft_delete_account("alice", account_id).await.unwrap();

    let err = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Income, 10, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("account not exists".to_string()));

    // Balance untouched by the soft delete itself.
    assert_eq!(balance_of(&engine, account_id).await, 100);
}

#[tokio::test]
async fn unlinked_entries_touch_no_account() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 100).await;

    let entry = engine
        .create_entry(CreateEntryCmd::new(
            "alice",
            EntryKind::Expense,
            9999,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(entry.account_id, None);
    assert_eq!(balance_of(&engine, account_id).await, 100);

    engine
        .soft_delete_entry("alice", entry.id, Utc::now())
        .await
        .unwrap();
    engine.restore_entry("alice", entry.id).await.unwrap();
    engine.purge_entry("alice", entry.id).await.unwrap();
    assert_eq!(balance_of(&engine, account_id).await, 100);
}

#[tokio::test]
async fn owner_scoping_hides_foreign_records() {
    let (engine, db) = engine_with_db().await;
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO users (username) VALUES (?)",
        vec!["mallory".into()],
    ))
    .await
    .unwrap();

    let account_id = account_with_balance(&engine, "Private", 100).await;
    let entry = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Income, 50, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();

    let err = engine.account("mallory", account_id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("account not exists".to_string()));
    let err = engine
        .soft_delete_entry("mallory", entry.id, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("entry not exists".to_string()));
}

#[tokio::test]
async fn duplicate_account_names_are_rejected_per_owner() {
    let (engine, _db) = engine_with_db().await;
    account_with_balance(&engine, "Checking", 0).await;

    let err = engine
        .create_account(CreateAccountCmd::new("alice", "Checking", AccountKind::Cash))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("Checking".to_string()));
}

#[tokio::test]
async fn lifecycle_sequences_keep_stored_balances_consistent() {
    let (engine, _db) = engine_with_db().await;
    let checking_id = account_with_balance(&engine, "Checking", 10_000).await;
    let savings_id = account_with_balance(&engine, "Savings", 0).await;

    let salary = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Income, 2_000, Utc::now())
                .account_id(checking_id)
                .category("salary"),
        )
        .await
        .unwrap();
    let rent = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Expense, 7_000, Utc::now())
                .account_id(checking_id)
                .category("rent"),
        )
        .await
        .unwrap();
    engine
        .create_transfer(TransferCmd::new(
            "alice",
            checking_id,
            savings_id,
            1_000,
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .update_entry(UpdateEntryCmd::new("alice", rent.id).amount_minor(6_500))
        .await
        .unwrap();
    engine
        .soft_delete_entry("alice", salary.id, Utc::now())
        .await
        .unwrap();
    engine.restore_entry("alice", salary.id).await.unwrap();

    // 10000 + 2000 - 6500 - 1000 = 4500; savings 0 + 1000.
    assert_eq!(balance_of(&engine, checking_id).await, 4_500);
    assert_eq!(balance_of(&engine, savings_id).await, 1_000);

    // The invariant check proper: stored balances equal the ledger-derived
    // values for every reachable state in this sequence.
    assert!(engine.audit_balances("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn recompute_repairs_corrupted_balances() {
    let (engine, db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 500).await;
    engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Income, 250, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();

    // Corrupt the denormalized balance directly in the DB.
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE accounts SET balance_minor = ? WHERE id = ?;",
        vec![99_999i64.into(), account_id.to_string().into()],
    ))
    .await
    .unwrap();

    let drifts = engine.audit_balances("alice").await.unwrap();
    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].stored_minor, 99_999);
    assert_eq!(drifts[0].derived_minor, 750);

    let rewritten = engine.recompute_balances("alice").await.unwrap();
    assert_eq!(rewritten, 1);
    assert_eq!(balance_of(&engine, account_id).await, 750);
    assert!(engine.audit_balances("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn list_entries_excludes_deleted_by_default() {
    let (engine, _db) = engine_with_db().await;
    let account_id = account_with_balance(&engine, "Checking", 100).await;

    let keep = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Income, 10, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    let trashed = engine
        .create_entry(
            CreateEntryCmd::new("alice", EntryKind::Income, 20, Utc::now())
                .account_id(account_id),
        )
        .await
        .unwrap();
    engine
        .soft_delete_entry("alice", trashed.id, Utc::now())
        .await
        .unwrap();

    let active = engine
        .list_entries(EntryListFilter::new("alice").account_id(account_id))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, keep.id);

    let all = engine
        .list_entries(
            EntryListFilter::new("alice")
                .account_id(account_id)
                .include_deleted(true),
        )
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}
