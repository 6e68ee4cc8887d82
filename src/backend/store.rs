//! In-memory state behind the sandbox API. Every record belongs to the user
//! whose token created it; analytics are recomputed from transactions on
//! each read.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::database::models::{
    Budget, BudgetDraft, BudgetStatus, CategorySlice, DashboardStats, Impact, Insight, InsightKind, PatternPoint,
    Prediction, Transaction, TransactionDraft, TrendPoint, TxnKind, User,
};
use crate::error::{AppError, AppResult};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const TREND_MONTHS: usize = 6;
/// Largest amount a single budget or transaction may carry: 10^12.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

struct Account {
    user: User,
    password: String,
}

struct Owned<T> {
    owner: i64,
    record: T,
}

#[derive(Default)]
pub struct Store {
    accounts: Vec<Account>,
    tokens: HashMap<String, i64>,
    budgets: Vec<Owned<Budget>>,
    transactions: Vec<Owned<Transaction>>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    // ============= Accounts =============

    pub fn register(&mut self, username: &str, email: &str, password: &str) -> AppResult<User> {
        let (username, email) = (username.trim(), email.trim());
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("username, email and password are required".into()));
        }
        if self.accounts.iter().any(|a| a.user.email.eq_ignore_ascii_case(email)) {
            return Err(AppError::Validation("A user with that email already exists".into()));
        }

        let user = User { id: self.next_id(), email: email.to_string(), username: username.to_string() };
        self.accounts.push(Account { user: user.clone(), password: password.to_string() });
        Ok(user)
    }

    /// Issue a fresh token for valid credentials.
    pub fn login(&mut self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .accounts
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(email.trim()) && a.password == password)
            .map(|a| a.user.clone())
            .ok_or_else(|| AppError::Auth("No active account found with the given credentials".into()))?;

        let token = uuid::Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user.id);
        Ok((token, user))
    }

    pub fn user_for_token(&self, token: &str) -> Option<i64> {
        self.tokens.get(token).copied()
    }

    // ============= Budgets =============

    fn spent(&self, owner: i64, b: &Budget) -> Decimal {
        self.owned_txns(owner)
            .filter(|t| t.kind == TxnKind::Expense && t.category == b.category)
            .filter(|t| t.date >= b.start_date && t.date < b.end_date)
            .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.amount))
    }

    fn with_spent(&self, owner: i64, b: &Budget) -> Budget {
        Budget { spent: self.spent(owner, b), ..b.clone() }
    }

    pub fn budgets(&self, owner: i64) -> Vec<Budget> {
        self.budgets
            .iter()
            .filter(|o| o.owner == owner)
            .map(|o| self.with_spent(owner, &o.record))
            .collect()
    }

    pub fn create_budget(&mut self, owner: i64, draft: &BudgetDraft) -> AppResult<Budget> {
        validate_budget(draft)?;
        let budget = Budget {
            id: self.next_id(),
            category: draft.category.clone(),
            amount: draft.amount,
            spent: Decimal::ZERO,
            period: draft.period,
            start_date: draft.start_date,
            end_date: draft.period.end_date(draft.start_date),
        };
        self.budgets.push(Owned { owner, record: budget.clone() });
        Ok(self.with_spent(owner, &budget))
    }

    pub fn update_budget(&mut self, owner: i64, id: i64, draft: &BudgetDraft) -> AppResult<Budget> {
        validate_budget(draft)?;
        let slot = self
            .budgets
            .iter_mut()
            .find(|o| o.owner == owner && o.record.id == id)
            .ok_or_else(|| AppError::NotFound(format!("budget {id}")))?;

        let b = &mut slot.record;
        b.category = draft.category.clone();
        b.amount = draft.amount;
        b.period = draft.period;
        b.start_date = draft.start_date;
        b.end_date = draft.period.end_date(draft.start_date);
        let updated = b.clone();
        Ok(self.with_spent(owner, &updated))
    }

    pub fn delete_budget(&mut self, owner: i64, id: i64) -> AppResult<()> {
        let before = self.budgets.len();
        self.budgets.retain(|o| !(o.owner == owner && o.record.id == id));
        if self.budgets.len() == before {
            return Err(AppError::NotFound(format!("budget {id}")));
        }
        Ok(())
    }

    // ============= Transactions =============

    fn owned_txns(&self, owner: i64) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(move |o| o.owner == owner).map(|o| &o.record)
    }

    /// Newest first, optionally truncated.
    pub fn transactions(&self, owner: i64, limit: Option<usize>) -> Vec<Transaction> {
        let mut list: Vec<Transaction> = self.owned_txns(owner).cloned().collect();
        list.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        if let Some(n) = limit {
            list.truncate(n);
        }
        list
    }

    pub fn create_transaction(&mut self, owner: i64, draft: &TransactionDraft) -> AppResult<Transaction> {
        validate_txn(draft)?;
        let t = Transaction {
            id: self.next_id(),
            amount: draft.amount,
            category: draft.category.clone(),
            kind: draft.kind,
            date: draft.date,
            description: draft.description.clone(),
        };
        self.transactions.push(Owned { owner, record: t.clone() });
        Ok(t)
    }

    pub fn update_transaction(&mut self, owner: i64, id: i64, draft: &TransactionDraft) -> AppResult<Transaction> {
        validate_txn(draft)?;
        let slot = self
            .transactions
            .iter_mut()
            .find(|o| o.owner == owner && o.record.id == id)
            .ok_or_else(|| AppError::NotFound(format!("transaction {id}")))?;

        let t = &mut slot.record;
        t.amount = draft.amount;
        t.category = draft.category.clone();
        t.kind = draft.kind;
        t.date = draft.date;
        t.description = draft.description.clone();
        Ok(t.clone())
    }

    pub fn delete_transaction(&mut self, owner: i64, id: i64) -> AppResult<()> {
        let before = self.transactions.len();
        self.transactions.retain(|o| !(o.owner == owner && o.record.id == id));
        if self.transactions.len() == before {
            return Err(AppError::NotFound(format!("transaction {id}")));
        }
        Ok(())
    }

    // ============= Analytics =============

    fn totals_by_month(&self, owner: i64) -> BTreeMap<(i32, u32), (Decimal, Decimal)> {
        let mut months: BTreeMap<(i32, u32), (Decimal, Decimal)> = BTreeMap::new();
        for t in self.owned_txns(owner) {
            let slot = months.entry((t.date.year(), t.date.month())).or_default();
            match t.kind {
                TxnKind::Income => slot.0 = slot.0.saturating_add(t.amount),
                TxnKind::Expense => slot.1 = slot.1.saturating_add(t.amount),
            }
        }
        months
    }

    pub fn stats(&self, owner: i64) -> DashboardStats {
        let (mut income, mut expenses, mut count) = (Decimal::ZERO, Decimal::ZERO, 0u32);
        for t in self.owned_txns(owner) {
            match t.kind {
                TxnKind::Income => income = income.saturating_add(t.amount),
                TxnKind::Expense => expenses = expenses.saturating_add(t.amount),
            }
            count += 1;
        }

        // Latest month's expenses against the month before it.
        let months: Vec<Decimal> = self.totals_by_month(owner).values().map(|(_, e)| *e).collect();
        let monthly_change = match months.as_slice() {
            [.., prev, last] if !prev.is_zero() => percent(last.saturating_sub(*prev), *prev),
            _ => 0.0,
        };

        let budgets = self.budgets(owner);
        let limit = budgets.iter().fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.amount));
        let spent = budgets.iter().fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.spent));
        let budget_utilization = if limit.is_zero() { 0.0 } else { percent(spent, limit) };

        DashboardStats {
            total_income: income,
            total_expenses: expenses,
            balance: income.saturating_sub(expenses),
            monthly_change,
            transaction_count: count,
            budget_utilization,
        }
    }

    /// Expense totals per category, largest first.
    pub fn category_breakdown(&self, owner: i64) -> Vec<CategorySlice> {
        let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
        for t in self.owned_txns(owner).filter(|t| t.kind == TxnKind::Expense) {
            let total = totals.entry(t.category.as_str()).or_default();
            *total = total.saturating_add(t.amount);
        }
        let mut slices: Vec<CategorySlice> = totals
            .into_iter()
            .map(|(name, value)| CategorySlice { name: name.to_string(), value })
            .collect();
        slices.sort_by(|a, b| b.value.cmp(&a.value));
        slices
    }

    /// The most recent months that have any activity, oldest first.
    pub fn monthly_trend(&self, owner: i64) -> Vec<TrendPoint> {
        let months = self.totals_by_month(owner);
        let skip = months.len().saturating_sub(TREND_MONTHS);
        months
            .into_iter()
            .skip(skip)
            .map(|((y, m), (income, expenses))| TrendPoint {
                month: NaiveDate::from_ymd_opt(y, m, 1)
                    .map(|d| d.format("%b").to_string())
                    .unwrap_or_default(),
                income,
                expenses,
            })
            .collect()
    }

    /// Expense totals per weekday, Monday first.
    pub fn spending_pattern(&self, owner: i64) -> Vec<PatternPoint> {
        let mut days = [Decimal::ZERO; 7];
        for t in self.owned_txns(owner).filter(|t| t.kind == TxnKind::Expense) {
            let day = &mut days[t.date.weekday().num_days_from_monday() as usize];
            *day = day.saturating_add(t.amount);
        }
        WEEKDAYS
            .iter()
            .zip(days)
            .map(|(day, amount)| PatternPoint { day: day.to_string(), amount })
            .collect()
    }

    /// Next month's spend per category: the monthly average so far. More
    /// months of history mean more confidence.
    pub fn predictions(&self, owner: i64) -> Vec<Prediction> {
        let mut per_cat: BTreeMap<&str, (Decimal, Vec<(i32, u32)>)> = BTreeMap::new();
        for t in self.owned_txns(owner).filter(|t| t.kind == TxnKind::Expense) {
            let slot = per_cat.entry(t.category.as_str()).or_default();
            slot.0 = slot.0.saturating_add(t.amount);
            let month = (t.date.year(), t.date.month());
            if !slot.1.contains(&month) {
                slot.1.push(month);
            }
        }

        let mut out: Vec<Prediction> = per_cat
            .into_iter()
            .map(|(category, (total, months))| {
                let n = months.len().max(1);
                Prediction {
                    category: category.to_string(),
                    predicted: (total / Decimal::from(n)).round_dp(2),
                    confidence: (0.5 + 0.1 * n as f64).min(0.95),
                }
            })
            .collect();
        out.sort_by(|a, b| b.predicted.cmp(&a.predicted));
        out
    }

    pub fn insights(&self, owner: i64) -> Vec<Insight> {
        let mut out = Vec::new();
        let mut push = |kind, title: String, description: String, impact| {
            let id = out.len() as i64 + 1;
            out.push(Insight { id, kind, title, description, impact });
        };

        let budgets = self.budgets(owner);
        for b in &budgets {
            match b.status() {
                BudgetStatus::OverBudget => push(
                    InsightKind::Warning,
                    format!("{} Budget Alert", b.category),
                    format!(
                        "You've exceeded your {} budget by ${:.2}.",
                        b.category.to_lowercase(),
                        b.overspend().unwrap_or(b.spent)
                    ),
                    Impact::High,
                ),
                BudgetStatus::Warning => push(
                    InsightKind::Warning,
                    format!("{} Budget Nearly Used", b.category),
                    format!("{}% of your {} budget is spent.", b.percent_used(), b.category.to_lowercase()),
                    Impact::Medium,
                ),
                BudgetStatus::Normal => {}
            }
        }

        if let Some(top) = self.predictions(owner).into_iter().next() {
            push(
                InsightKind::Prediction,
                format!("Expect about ${:.2} on {}", top.predicted, top.category),
                format!("{} is your largest expense category. Plan for it next month.", top.category),
                Impact::Medium,
            );
        }

        let stats = self.stats(owner);
        if stats.balance > Decimal::ZERO {
            push(
                InsightKind::Tip,
                "Savings Opportunity".into(),
                format!("You kept ${:.2} of your income. Consider moving it to savings.", stats.balance),
                Impact::Low,
            );
        }
        out
    }
}

// A ratio outside `Decimal`'s range saturates. Callers rule out `whole == 0`.
fn percent(part: Decimal, whole: Decimal) -> f64 {
    let ratio = part.checked_div(whole).unwrap_or(if part.is_sign_negative() == whole.is_sign_negative() {
        Decimal::MAX
    } else {
        Decimal::MIN
    });
    ratio
        .saturating_mul(Decimal::ONE_HUNDRED)
        .round_dp(1)
        .to_f64()
        .unwrap_or(0.0)
}

fn validate_amount(amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("amount must be positive".into()));
    }
    if amount > MAX_AMOUNT {
        return Err(AppError::Validation(format!("amount must not exceed {MAX_AMOUNT}")));
    }
    Ok(())
}

fn validate_budget(d: &BudgetDraft) -> AppResult<()> {
    if d.category.trim().is_empty() {
        return Err(AppError::Validation("category is required".into()));
    }
    validate_amount(d.amount)
}

fn validate_txn(d: &TransactionDraft) -> AppResult<()> {
    if d.category.trim().is_empty() {
        return Err(AppError::Validation("category is required".into()));
    }
    validate_amount(d.amount)
}
