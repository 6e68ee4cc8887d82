pub mod analytics;
pub mod budget;
pub mod saving_goal;
pub mod transaction;
pub mod user;

pub use analytics::{
    category_shares, CategorySlice, DashboardStats, Impact, Insight, InsightKind, PatternPoint, Prediction,
    TrendPoint,
};
pub use budget::{Budget, BudgetDraft, BudgetStatus, Period, BUDGET_CATEGORIES};
pub use saving_goal::SavingsGoal;
pub use transaction::{
    Transaction, TransactionDraft, TransactionFilter, TxnKind, TypeFilter, EXPENSE_CATEGORIES, INCOME_CATEGORIES,
};
pub use user::{Session, User};
