mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use finance_dashboard::cli::resources::{
    BudgetController, DeleteOutcome, SyncState, TransactionController, WriteOutcome,
};
use finance_dashboard::database::models::{BudgetDraft, BudgetStatus, Period, TransactionDraft, TxnKind};
use finance_dashboard::AppError;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn groceries(limit: i64) -> BudgetDraft {
    BudgetDraft {
        category: "Groceries".into(),
        amount: Decimal::from(limit),
        period: Period::Monthly,
        start_date: date(2024, 1, 1),
    }
}

fn expense(amount: i64, day: u32, description: &str) -> TransactionDraft {
    TransactionDraft {
        amount: Decimal::from(amount),
        category: "Groceries".into(),
        kind: TxnKind::Expense,
        date: date(2024, 1, day),
        description: description.into(),
    }
}

#[tokio::test]
async fn optimistic_budget_create_is_confirmed_with_backend_id() {
    let session = common::signed_in(common::sandbox().await).await;
    let mut budgets = BudgetController::new(session.api().clone());
    budgets.list().await.unwrap();

    let pending = budgets.stage_create(groceries(500));
    let local_id = pending.local_id;
    assert_eq!(budgets.entries()[0].state, SyncState::Pending);
    assert_eq!(budgets.entries()[0].record.id, local_id);
    assert_eq!(budgets.entries()[0].record.end_date, date(2024, 2, 1));

    let saved = budgets.commit_create(pending).await.unwrap();
    assert_ne!(saved.id, local_id);
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets.entries()[0].state, SyncState::Confirmed);
    assert_eq!(budgets.entries()[0].record.id, saved.id);
}

#[tokio::test]
async fn spent_comes_from_the_backend() {
    let session = common::signed_in(common::sandbox().await).await;
    let api = session.api().clone();
    let mut budgets = BudgetController::new(api.clone());
    let mut txns = TransactionController::new(api);

    let budget = budgets.create(groceries(100)).await.unwrap();
    txns.create(expense(85, 15, "Supermarket")).await.unwrap();

    budgets.list().await.unwrap();
    let b = budgets.get(budget.id).unwrap();
    assert_eq!(b.spent, Decimal::from(85));
    assert_eq!(b.status(), BudgetStatus::Warning);

    budgets.update(budget.id, &groceries(80)).await.unwrap();
    let b = budgets.get(budget.id).unwrap();
    assert_eq!(b.amount, Decimal::from(80));
    assert_eq!(b.status(), BudgetStatus::OverBudget);
}

#[tokio::test]
async fn new_transactions_go_to_the_front() {
    let session = common::signed_in(common::sandbox().await).await;
    let mut txns = TransactionController::new(session.api().clone());

    txns.create(expense(10, 1, "first")).await.unwrap();
    txns.create(expense(20, 2, "second")).await.unwrap();
    let descriptions: Vec<&str> = txns.records().map(|t| t.description.as_str()).collect();
    assert_eq!(descriptions, ["second", "first"]);
}

#[tokio::test]
async fn rejected_create_rolls_back() {
    let session = common::signed_in(common::sandbox().await).await;
    let mut txns = TransactionController::new(session.api().clone());
    txns.create(expense(10, 1, "kept")).await.unwrap();

    let err = txns.create(expense(0, 2, "refused")).await.unwrap_err();
    assert!(matches!(err, AppError::Api { status: 400, .. }), "got {err:?}");
    assert_eq!(txns.len(), 1);
    assert!(txns.entries().iter().all(|e| e.state == SyncState::Confirmed));
}

#[tokio::test]
async fn delete_asks_then_removes_by_id() {
    let session = common::signed_in(common::sandbox().await).await;
    let mut txns = TransactionController::new(session.api().clone());
    let a = txns.create(expense(10, 1, "a")).await.unwrap();
    let b = txns.create(expense(20, 2, "b")).await.unwrap();

    let outcome = txns.delete(a.id, |_| false).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(txns.len(), 2);

    let outcome = txns.delete(a.id, |t| t.description == "a").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(txns.get(a.id).is_none());
    assert!(txns.get(b.id).is_some());

    // The backend agrees.
    txns.list().await.unwrap();
    assert_eq!(txns.records().map(|t| t.id).collect::<Vec<_>>(), [b.id]);
}

#[tokio::test]
async fn failed_delete_keeps_the_record() {
    let session = common::signed_in(common::sandbox().await).await;
    let mut txns = TransactionController::new(session.api().clone());
    let t = txns.create(expense(10, 1, "a")).await.unwrap();

    session.logout().await;
    let err = txns.delete(t.id, |_| true).await.unwrap_err();
    assert!(matches!(err, AppError::Auth(_)), "got {err:?}");
    assert!(txns.get(t.id).is_some());
}

#[tokio::test]
async fn detached_writes_settle_when_applied() {
    let session = common::signed_in(common::sandbox().await).await;
    let mut budgets = BudgetController::new(session.api().clone());

    let pending = budgets.stage_create(groceries(500));
    let task = tokio::spawn(BudgetController::send_create(session.api().clone(), pending));
    assert_eq!(budgets.entries()[0].state, SyncState::Pending);

    budgets.apply(task.await.unwrap()).unwrap();
    let id = budgets.entries()[0].record.id;
    assert_eq!(budgets.entries()[0].state, SyncState::Confirmed);

    let outcome = BudgetController::send_update(session.api().clone(), id, groceries(650)).await;
    assert!(matches!(outcome, WriteOutcome::Updated { .. }));
    budgets.apply(outcome).unwrap();
    assert_eq!(budgets.get(id).unwrap().amount, Decimal::from(650));

    let outcome = BudgetController::send_delete(session.api().clone(), id).await;
    budgets.apply(outcome).unwrap();
    assert!(budgets.is_empty());
}
