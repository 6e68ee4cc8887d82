use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const BUDGET_CATEGORIES: [&str; 8] = [
    "Groceries",
    "Transportation",
    "Utilities",
    "Entertainment",
    "Healthcare",
    "Shopping",
    "Education",
    "Other",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Monthly,
    Weekly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Monthly => Self::Weekly,
            Self::Weekly => Self::Monthly,
        }
    }

    /// Monthly adds one calendar month (clamped to the end of a shorter
    /// month, so Jan 31 ends Feb 29 in a leap year); weekly adds seven days.
    pub fn end_date(&self, start: NaiveDate) -> NaiveDate {
        let end = match self {
            Self::Monthly => start.checked_add_months(Months::new(1)),
            Self::Weekly => start.checked_add_days(Days::new(7)),
        };
        end.unwrap_or(start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Normal,
    Warning,
    OverBudget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: i64,
    pub category: String,
    pub amount: Decimal,
    pub spent: Decimal, // owned by the backend, never edited here
    pub period: Period,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Budget {
    /// `spent / amount`, or `None` for a zero limit. A ratio too large for
    /// `Decimal` saturates, which still reads as over budget.
    pub fn utilization(&self) -> Option<Decimal> {
        if self.amount.is_zero() {
            return None;
        }
        Some(self.spent.checked_div(self.amount).unwrap_or_else(|| {
            if self.spent.is_sign_negative() == self.amount.is_sign_negative() {
                Decimal::MAX
            } else {
                Decimal::MIN
            }
        }))
    }

    pub fn status(&self) -> BudgetStatus {
        let warning = Decimal::new(8, 1);
        match self.utilization() {
            None if self.spent > Decimal::ZERO => BudgetStatus::OverBudget,
            None => BudgetStatus::Normal,
            Some(r) if r >= Decimal::ONE => BudgetStatus::OverBudget,
            Some(r) if r >= warning => BudgetStatus::Warning,
            Some(_) => BudgetStatus::Normal,
        }
    }

    pub fn percent_used(&self) -> Decimal {
        self.utilization()
            .map(|r| r.saturating_mul(Decimal::ONE_HUNDRED).round_dp(0))
            .unwrap_or(Decimal::ZERO)
    }

    /// Width of a progress bar in percent, capped at 100.
    pub fn bar_percent(&self) -> u16 {
        use rust_decimal::prelude::ToPrimitive;
        self.percent_used().min(Decimal::ONE_HUNDRED).to_u16().unwrap_or(0)
    }

    pub fn remaining(&self) -> Decimal {
        self.amount.saturating_sub(self.spent)
    }

    pub fn overspend(&self) -> Option<Decimal> {
        (self.spent > self.amount).then(|| self.spent.saturating_sub(self.amount))
    }
}

/// Form payload. `endDate` is left to whoever creates the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDraft {
    pub category: String,
    pub amount: Decimal,
    pub period: Period,
    pub start_date: NaiveDate,
}
