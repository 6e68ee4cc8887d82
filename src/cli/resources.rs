//! List/create/update/delete lifecycle shared by budgets and transactions.
//!
//! Creates are optimistic: the row is shown as `Pending` before the backend
//! answers, then either confirmed with the backend's record or rolled back.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cli::api::{Client, Page};
use crate::cli::fallback::{self, DataSource};
use crate::database::models::{Budget, BudgetDraft, Transaction, TransactionDraft, TransactionFilter};
use crate::error::{AppError, AppResult};

pub type RecordId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    Front,
    Back,
}

pub trait Resource: Clone + DeserializeOwned + Send + Sync + 'static {
    type Draft: Serialize + Clone + Send + Sync;

    /// Collection path, with trailing slash.
    const PATH: &'static str;
    const NAME: &'static str;
    /// Where an optimistic row appears in the visible list.
    const INSERT_AT: InsertAt;

    fn id(&self) -> RecordId;

    /// Build the local stand-in shown while a create is in flight.
    fn from_draft(id: RecordId, draft: &Self::Draft) -> Self;

    fn sample() -> Vec<Self>;

    fn item_path(id: RecordId) -> String {
        format!("{}{}/", Self::PATH, id)
    }
}

impl Resource for Budget {
    type Draft = BudgetDraft;
    const PATH: &'static str = "/api/budgets/";
    const NAME: &'static str = "budget";
    const INSERT_AT: InsertAt = InsertAt::Back;

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_draft(id: RecordId, draft: &BudgetDraft) -> Self {
        Budget {
            id,
            category: draft.category.clone(),
            amount: draft.amount,
            spent: rust_decimal::Decimal::ZERO,
            period: draft.period,
            start_date: draft.start_date,
            end_date: draft.period.end_date(draft.start_date),
        }
    }

    fn sample() -> Vec<Self> {
        fallback::budgets()
    }
}

impl Resource for Transaction {
    type Draft = TransactionDraft;
    const PATH: &'static str = "/api/transactions/";
    const NAME: &'static str = "transaction";
    const INSERT_AT: InsertAt = InsertAt::Front;

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_draft(id: RecordId, draft: &TransactionDraft) -> Self {
        Transaction {
            id,
            amount: draft.amount,
            category: draft.category.clone(),
            kind: draft.kind,
            date: draft.date,
            description: draft.description.clone(),
        }
    }

    fn sample() -> Vec<Self> {
        fallback::transactions()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Shown locally, backend has not confirmed yet.
    Pending,
    Confirmed,
}

#[derive(Debug, Clone)]
pub struct Entry<R> {
    pub record: R,
    pub state: SyncState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

/// Ticket for a staged create; hand it back to [`ResourceController::commit_create`]
/// or [`ResourceController::send_create`].
#[must_use]
#[derive(Debug)]
pub struct PendingCreate<D> {
    pub local_id: RecordId,
    draft: D,
}

/// Result of a write that ran away from the controller.
#[derive(Debug)]
pub enum WriteOutcome<R> {
    Created { local_id: RecordId, result: AppResult<R> },
    /// The refetched collection after a successful PUT.
    Updated { id: RecordId, result: AppResult<Vec<R>> },
    Deleted { id: RecordId, result: AppResult<()> },
}

impl<R> WriteOutcome<R> {
    pub fn action(&self) -> &'static str {
        match self {
            WriteOutcome::Created { .. } => "created",
            WriteOutcome::Updated { .. } => "updated",
            WriteOutcome::Deleted { .. } => "deleted",
        }
    }
}

async fn fetch_all<R: Resource>(api: &Client) -> AppResult<Vec<R>> {
    Ok(api.get_json::<Page<R>>(R::PATH).await?.results)
}

pub struct ResourceController<R: Resource> {
    api: Client,
    entries: Vec<Entry<R>>,
    source: DataSource,
}

pub type BudgetController = ResourceController<Budget>;
pub type TransactionController = ResourceController<Transaction>;

impl<R: Resource> ResourceController<R> {
    pub fn new(api: Client) -> Self {
        Self {
            api,
            entries: Vec::new(),
            source: DataSource::Live,
        }
    }

    pub fn api(&self) -> &Client {
        &self.api
    }

    pub fn entries(&self) -> &[Entry<R>] {
        &self.entries
    }

    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn get(&self, id: RecordId) -> Option<&R> {
        self.records().find(|r| r.id() == id)
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.source = DataSource::Live;
    }

    /// Refetch everything. An unreachable backend swaps in the sample set;
    /// any other failure is returned and the current list is kept.
    pub async fn list(&mut self) -> AppResult<()> {
        match fetch_all::<R>(&self.api).await {
            Ok(records) => {
                self.replace(records, DataSource::Live);
                Ok(())
            }
            Err(e) if e.is_transport() => {
                tracing::warn!(resource = R::NAME, error = %e, "backend unreachable, showing sample data");
                self.replace(R::sample(), DataSource::Sample);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(resource = R::NAME, error = %e, "list failed");
                Err(e)
            }
        }
    }

    // Rows still waiting on a create survive a refetch.
    fn replace(&mut self, records: Vec<R>, source: DataSource) {
        let pending: Vec<Entry<R>> = self
            .entries
            .drain(..)
            .filter(|e| e.state == SyncState::Pending)
            .collect();
        self.entries = records
            .into_iter()
            .map(|record| Entry { record, state: SyncState::Confirmed })
            .collect();
        match R::INSERT_AT {
            InsertAt::Front => {
                let confirmed = std::mem::replace(&mut self.entries, pending);
                self.entries.extend(confirmed);
            }
            InsertAt::Back => self.entries.extend(pending),
        }
        self.source = source;
    }

    fn insert(&mut self, entry: Entry<R>) {
        match R::INSERT_AT {
            InsertAt::Front => self.entries.insert(0, entry),
            InsertAt::Back => self.entries.push(entry),
        }
    }

    /// Show the draft immediately as a `Pending` row with a timestamp id.
    pub fn stage_create(&mut self, draft: R::Draft) -> PendingCreate<R::Draft> {
        let local_id = self.next_local_id();
        self.insert(Entry {
            record: R::from_draft(local_id, &draft),
            state: SyncState::Pending,
        });
        PendingCreate { local_id, draft }
    }

    /// Send a staged create. The pending row becomes the backend's record, or
    /// is removed again if the backend refuses or cannot be reached.
    pub async fn commit_create(&mut self, pending: PendingCreate<R::Draft>) -> AppResult<R> {
        let local_id = pending.local_id;
        let result = self.api.post_json::<_, R>(R::PATH, &pending.draft).await;
        self.settle_create(local_id, result)
    }

    pub async fn create(&mut self, draft: R::Draft) -> AppResult<R> {
        let pending = self.stage_create(draft);
        self.commit_create(pending).await
    }

    /// Full replacement, then a full refetch. On failure nothing changes locally.
    pub async fn update(&mut self, id: RecordId, draft: &R::Draft) -> AppResult<()> {
        if let Err(e) = self.api.put(&R::item_path(id), draft).await {
            tracing::warn!(resource = R::NAME, id, error = %e, "update failed");
            return Err(e);
        }
        self.list().await
    }

    /// Asks `confirm` first; a declined delete never touches the network.
    /// A failed delete keeps the record in place.
    pub async fn delete<F>(&mut self, id: RecordId, confirm: F) -> AppResult<DeleteOutcome>
    where
        F: FnOnce(&R) -> bool,
    {
        let record = self
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("{} {}", R::NAME, id)))?;
        if !confirm(record) {
            return Ok(DeleteOutcome::Cancelled);
        }

        let result = self.api.delete(&R::item_path(id)).await;
        self.settle_delete(id, result)?;
        Ok(DeleteOutcome::Deleted)
    }

    // ============= Detached writes =============
    //
    // The terminal front-end cannot wait on the network inside a key press.
    // It stages locally, runs one of the `send_*` futures on a spawned task
    // and hands the outcome back to `apply` on its next tick.

    pub async fn send_create(api: Client, pending: PendingCreate<R::Draft>) -> WriteOutcome<R> {
        let result = api.post_json::<_, R>(R::PATH, &pending.draft).await;
        WriteOutcome::Created { local_id: pending.local_id, result }
    }

    /// PUT, then fetch the collection again.
    pub async fn send_update(api: Client, id: RecordId, draft: R::Draft) -> WriteOutcome<R> {
        let result = match api.put(&R::item_path(id), &draft).await {
            Ok(()) => fetch_all::<R>(&api).await,
            Err(e) => Err(e),
        };
        WriteOutcome::Updated { id, result }
    }

    pub async fn send_delete(api: Client, id: RecordId) -> WriteOutcome<R> {
        let result = api.delete(&R::item_path(id)).await;
        WriteOutcome::Deleted { id, result }
    }

    pub fn apply(&mut self, outcome: WriteOutcome<R>) -> AppResult<()> {
        match outcome {
            WriteOutcome::Created { local_id, result } => self.settle_create(local_id, result).map(|_| ()),
            WriteOutcome::Updated { id, result } => match result {
                Ok(records) => {
                    self.replace(records, DataSource::Live);
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(resource = R::NAME, id, error = %e, "update failed");
                    Err(e)
                }
            },
            WriteOutcome::Deleted { id, result } => self.settle_delete(id, result),
        }
    }

    fn settle_create(&mut self, local_id: RecordId, result: AppResult<R>) -> AppResult<R> {
        let slot = self
            .entries
            .iter()
            .position(|e| e.state == SyncState::Pending && e.record.id() == local_id);

        match result {
            Ok(saved) => {
                let fetched = self
                    .entries
                    .iter()
                    .any(|e| e.state == SyncState::Confirmed && e.record.id() == saved.id());
                // No slot means the list was cleared while the POST was out.
                match slot {
                    Some(i) if fetched => {
                        self.entries.remove(i);
                    }
                    Some(i) => self.entries[i] = Entry { record: saved.clone(), state: SyncState::Confirmed },
                    None => {}
                }
                Ok(saved)
            }
            Err(e) => {
                if let Some(i) = slot {
                    self.entries.remove(i);
                }
                tracing::warn!(resource = R::NAME, local_id, error = %e, "create failed, rolled back");
                Err(e)
            }
        }
    }

    fn settle_delete(&mut self, id: RecordId, result: AppResult<()>) -> AppResult<()> {
        if let Err(e) = result {
            tracing::warn!(resource = R::NAME, id, error = %e, "delete failed");
            return Err(e);
        }
        self.entries.retain(|e| e.record.id() != id);
        Ok(())
    }

    fn next_local_id(&self) -> RecordId {
        let mut id = chrono::Utc::now().timestamp_millis();
        while self.get(id).is_some() {
            id += 1;
        }
        id
    }
}

impl ResourceController<Transaction> {
    pub fn filtered(&self, filter: &TransactionFilter) -> Vec<&Transaction> {
        filter.apply(self.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Period, TxnKind};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn offline_client() -> Client {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        Client::new(format!("http://127.0.0.1:{port}"), Duration::from_millis(500)).unwrap()
    }

    fn budget_draft() -> BudgetDraft {
        BudgetDraft {
            category: "Education".into(),
            amount: Decimal::from(250),
            period: Period::Weekly,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn unreachable_backend_yields_sample_list() {
        let mut budgets = BudgetController::new(offline_client());
        budgets.list().await.unwrap();
        assert_eq!(budgets.source(), DataSource::Sample);
        assert_eq!(budgets.len(), fallback::budgets().len());
    }

    #[tokio::test]
    async fn staged_budget_is_pending_with_local_fields() {
        let mut budgets = BudgetController::new(offline_client());
        budgets.list().await.unwrap();
        let pending = budgets.stage_create(budget_draft());

        let last = budgets.entries().last().unwrap();
        assert_eq!(last.state, SyncState::Pending);
        assert_eq!(last.record.id, pending.local_id);
        assert_eq!(last.record.spent, Decimal::ZERO);
        assert_eq!(last.record.end_date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    }

    #[tokio::test]
    async fn failed_create_rolls_back() {
        let mut budgets = BudgetController::new(offline_client());
        budgets.list().await.unwrap();
        let before = budgets.len();

        let err = budgets.create(budget_draft()).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(budgets.len(), before);
        assert!(budgets.entries().iter().all(|e| e.state == SyncState::Confirmed));
    }

    #[tokio::test]
    async fn transactions_are_staged_at_the_front() {
        let mut txns = TransactionController::new(offline_client());
        txns.list().await.unwrap();
        let pending = txns.stage_create(TransactionDraft {
            amount: Decimal::new(1999, 2),
            category: "Shopping".into(),
            kind: TxnKind::Expense,
            date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            description: "Headphones".into(),
        });
        assert_eq!(txns.entries()[0].record.id, pending.local_id);
        assert_eq!(txns.entries()[0].state, SyncState::Pending);
    }

    #[tokio::test]
    async fn declined_delete_keeps_list_and_skips_network() {
        let mut txns = TransactionController::new(offline_client());
        txns.list().await.unwrap();
        let before = txns.len();

        // The backend is unreachable: reaching the network would be an error.
        let outcome = txns.delete(2, |_| false).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(txns.len(), before);

        let err = txns.delete(2, |_| true).await.unwrap_err();
        assert!(err.is_transport());
        assert!(txns.get(2).is_some());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_not_found() {
        let mut txns = TransactionController::new(offline_client());
        let err = txns.delete(42, |_| true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn filtered_view_over_controller() {
        let mut txns = TransactionController::new(offline_client());
        txns.list().await.unwrap();
        let filter = TransactionFilter { kind: crate::database::models::TypeFilter::Income, search: String::new() };
        assert!(txns.filtered(&filter).iter().all(|t| t.kind == TxnKind::Income));
        assert_eq!(txns.filtered(&filter).len(), 2);
    }

    #[tokio::test]
    async fn detached_create_keeps_the_row_pending_until_applied() {
        let mut budgets = BudgetController::new(offline_client());
        budgets.list().await.unwrap();
        let before = budgets.len();

        let pending = budgets.stage_create(budget_draft());
        let local_id = pending.local_id;
        let outcome = BudgetController::send_create(budgets.api().clone(), pending).await;
        assert_eq!(outcome.action(), "created");
        assert_eq!(budgets.get(local_id).map(|b| b.id), Some(local_id));

        let err = budgets.apply(outcome).unwrap_err();
        assert!(err.is_transport());
        assert_eq!(budgets.len(), before);
        assert!(budgets.get(local_id).is_none());
    }

    #[tokio::test]
    async fn confirmed_outcome_replaces_the_pending_row() {
        let mut budgets = BudgetController::new(offline_client());
        let pending = budgets.stage_create(budget_draft());
        let local_id = pending.local_id;
        let saved = Budget::from_draft(41, &budget_draft());

        budgets
            .apply(WriteOutcome::Created { local_id, result: Ok(saved) })
            .unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets.entries()[0].record.id, 41);
        assert_eq!(budgets.entries()[0].state, SyncState::Confirmed);
    }

    #[tokio::test]
    async fn refetch_keeps_rows_still_in_flight() {
        let mut txns = TransactionController::new(offline_client());
        let pending = txns.stage_create(TransactionDraft {
            amount: Decimal::from(12),
            category: "Dining".into(),
            kind: TxnKind::Expense,
            date: NaiveDate::from_ymd_opt(2024, 1, 21).unwrap(),
            description: "Lunch".into(),
        });
        txns.list().await.unwrap();
        assert_eq!(txns.len(), fallback::transactions().len() + 1);
        assert_eq!(txns.entries()[0].record.id, pending.local_id);
        assert_eq!(txns.entries()[0].state, SyncState::Pending);
    }

    #[test]
    fn item_paths() {
        assert_eq!(Budget::item_path(3), "/api/budgets/3/");
        assert_eq!(Transaction::item_path(12), "/api/transactions/12/");
    }
}
