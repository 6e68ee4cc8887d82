//! Fixed data sets substituted when a read cannot reach the backend, so the
//! pages stay populated offline.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::database::models::{
    Budget, CategorySlice, DashboardStats, Impact, Insight, InsightKind, PatternPoint, Period, Prediction,
    Transaction, TrendPoint, TxnKind,
};

/// Where the data currently on screen came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
    #[default]
    Live,
    Sample,
}

impl DataSource {
    pub fn is_sample(&self) -> bool {
        matches!(self, DataSource::Sample)
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn cents(v: i64) -> Decimal {
    Decimal::new(v, 2)
}

fn budget(id: i64, category: &str, amount: i64, spent: i64) -> Budget {
    let start = day(2024, 1, 1);
    Budget {
        id,
        category: category.into(),
        amount: cents(amount),
        spent: cents(spent),
        period: Period::Monthly,
        start_date: start,
        end_date: Period::Monthly.end_date(start),
    }
}

pub fn budgets() -> Vec<Budget> {
    vec![
        budget(1, "Groceries", 50000, 38550),
        budget(2, "Transportation", 20000, 14500),
        budget(3, "Entertainment", 30000, 32000),
        budget(4, "Utilities", 15000, 12000),
    ]
}

fn txn(id: i64, amount: i64, category: &str, kind: TxnKind, date: NaiveDate, description: &str) -> Transaction {
    Transaction {
        id,
        amount: cents(amount),
        category: category.into(),
        kind,
        date,
        description: description.into(),
    }
}

pub fn transactions() -> Vec<Transaction> {
    use TxnKind::*;
    vec![
        txn(1, 300000, "Salary", Income, day(2024, 1, 14), "Monthly Salary"),
        txn(2, 8550, "Groceries", Expense, day(2024, 1, 15), "Supermarket"),
        txn(3, 4500, "Transportation", Expense, day(2024, 1, 13), "Gas"),
        txn(4, 12000, "Utilities", Expense, day(2024, 1, 12), "Electricity Bill"),
        txn(5, 20000, "Entertainment", Expense, day(2024, 1, 11), "Concert Tickets"),
        txn(6, 50000, "Freelance", Income, day(2024, 1, 10), "Web Design Project"),
    ]
}

/// The five most recent, newest first.
pub fn recent_transactions() -> Vec<Transaction> {
    let mut list = transactions();
    list.sort_by(|a, b| b.date.cmp(&a.date));
    list.truncate(5);
    list
}

pub fn dashboard_stats() -> DashboardStats {
    DashboardStats {
        total_income: Decimal::from(45000),
        total_expenses: Decimal::from(32500),
        balance: Decimal::from(12500),
        monthly_change: 8.5,
        transaction_count: 124,
        budget_utilization: 72.0,
    }
}

pub fn category_breakdown() -> Vec<CategorySlice> {
    [
        ("Groceries", 450),
        ("Transportation", 280),
        ("Utilities", 320),
        ("Entertainment", 200),
        ("Shopping", 380),
        ("Healthcare", 150),
    ]
    .into_iter()
    .map(|(name, value)| CategorySlice { name: name.into(), value: Decimal::from(value) })
    .collect()
}

pub fn monthly_trend() -> Vec<TrendPoint> {
    [
        ("Jul", 4200, 3200),
        ("Aug", 4500, 3400),
        ("Sep", 4100, 3100),
        ("Oct", 4800, 3600),
        ("Nov", 4600, 3300),
        ("Dec", 5000, 3500),
    ]
    .into_iter()
    .map(|(month, income, expenses)| TrendPoint {
        month: month.into(),
        income: Decimal::from(income),
        expenses: Decimal::from(expenses),
    })
    .collect()
}

pub fn insights() -> Vec<Insight> {
    vec![
        Insight {
            id: 1,
            kind: InsightKind::Warning,
            title: "Entertainment Budget Alert".into(),
            description: "You've exceeded your entertainment budget by $20. Consider reducing discretionary spending."
                .into(),
            impact: Impact::High,
        },
        Insight {
            id: 2,
            kind: InsightKind::Tip,
            title: "Savings Opportunity".into(),
            description: "Based on your spending patterns, you could save an additional $150/month by reducing dining out expenses.".into(),
            impact: Impact::Medium,
        },
        Insight {
            id: 3,
            kind: InsightKind::Prediction,
            title: "Upcoming Large Expense".into(),
            description: "A large expense is likely next month based on historical patterns. Consider setting aside extra funds.".into(),
            impact: Impact::High,
        },
        Insight {
            id: 4,
            kind: InsightKind::Tip,
            title: "Budget Optimization".into(),
            description: "Your grocery spending is 15% below average. You're doing great in this category!".into(),
            impact: Impact::Low,
        },
    ]
}

pub fn predictions() -> Vec<Prediction> {
    [
        ("Groceries", 485, 0.92),
        ("Transportation", 220, 0.87),
        ("Utilities", 135, 0.95),
        ("Entertainment", 180, 0.78),
        ("Shopping", 340, 0.82),
    ]
    .into_iter()
    .map(|(category, predicted, confidence)| Prediction {
        category: category.into(),
        predicted: Decimal::from(predicted),
        confidence,
    })
    .collect()
}

pub fn spending_pattern() -> Vec<PatternPoint> {
    [("Mon", 45), ("Tue", 120), ("Wed", 35), ("Thu", 85), ("Fri", 160), ("Sat", 95), ("Sun", 70)]
        .into_iter()
        .map(|(day, amount)| PatternPoint { day: day.into(), amount: Decimal::from(amount) })
        .collect()
}
