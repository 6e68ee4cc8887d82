use chrono::{Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub target: Decimal,
    pub current: Decimal,
    pub monthly_rate: Decimal,
}

impl Default for SavingsGoal {
    fn default() -> Self {
        Self {
            target: Decimal::from(5000),
            current: Decimal::from(1250),
            monthly_rate: Decimal::from(250),
        }
    }
}

impl SavingsGoal {
    /// `ceil((target - current) / monthly_rate)`. `Some(0)` once the goal is
    /// met, `None` when nothing is being saved or the answer does not fit.
    pub fn months_to_goal(&self) -> Option<u32> {
        let remaining = self.target.checked_sub(self.current)?;
        if remaining <= Decimal::ZERO {
            return Some(0);
        }
        if self.monthly_rate <= Decimal::ZERO {
            return None;
        }
        remaining.checked_div(self.monthly_rate)?.ceil().to_u32()
    }

    pub fn progress_percent(&self) -> Decimal {
        if self.target <= Decimal::ZERO {
            return Decimal::ONE_HUNDRED;
        }
        self.current
            .checked_div(self.target)
            .map(|r| r.saturating_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ONE_HUNDRED)
            .min(Decimal::ONE_HUNDRED)
            .round_dp(1)
    }

    pub fn projected_completion(&self, today: NaiveDate) -> Option<NaiveDate> {
        let months = self.months_to_goal()?;
        today.checked_add_months(Months::new(months))
    }
}
