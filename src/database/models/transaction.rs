use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const INCOME_CATEGORIES: [&str; 4] = ["Salary", "Freelance", "Investment", "Other Income"];

pub const EXPENSE_CATEGORIES: [&str; 8] = [
    "Groceries",
    "Transportation",
    "Utilities",
    "Entertainment",
    "Healthcare",
    "Shopping",
    "Education",
    "Other Expense",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnKind {
    Income,
    #[default]
    Expense,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Income => Self::Expense,
            Self::Expense => Self::Income,
        }
    }

    /// Categories offered by the form for this kind of transaction.
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            Self::Income => &INCOME_CATEGORIES,
            Self::Expense => &EXPENSE_CATEGORIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub amount: Decimal, // always positive; `kind` carries the direction
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TxnKind,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

impl Transaction {
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TxnKind::Income => self.amount,
            TxnKind::Expense => -self.amount,
        }
    }
}

/// Form payload for create and full-replacement update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub amount: Decimal,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TxnKind,
    pub date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Income,
    Expense,
}

impl TypeFilter {
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Income,
            Self::Income => Self::Expense,
            Self::Expense => Self::All,
        }
    }

    fn admits(&self, kind: TxnKind) -> bool {
        match self {
            Self::All => true,
            Self::Income => kind == TxnKind::Income,
            Self::Expense => kind == TxnKind::Expense,
        }
    }
}

/// Client-side list filter: type filter AND case-insensitive search over
/// description or category. An empty search term matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub kind: TypeFilter,
    pub search: String,
}

impl TransactionFilter {
    pub fn matches(&self, t: &Transaction) -> bool {
        if !self.kind.admits(t.kind) {
            return false;
        }
        let needle = self.search.to_lowercase();
        t.description.to_lowercase().contains(&needle) || t.category.to_lowercase().contains(&needle)
    }

    pub fn apply<'a, I>(&self, list: I) -> Vec<&'a Transaction>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        list.into_iter().filter(|t| self.matches(t)).collect()
    }
}
