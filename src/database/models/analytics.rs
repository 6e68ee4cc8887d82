// Read-only records served by the dashboard and insights endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
    pub monthly_change: f64, // percent vs. previous month
    pub transaction_count: u32,
    pub budget_utilization: f64, // percent
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySlice {
    pub name: String,
    pub value: Decimal,
}

/// Each slice as a whole-number percent of the total.
pub fn category_shares(slices: &[CategorySlice]) -> Vec<(String, Decimal)> {
    let total = slices
        .iter()
        .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.value));
    slices
        .iter()
        .map(|s| {
            let share = s
                .value
                .checked_div(total)
                .map(|r| r.saturating_mul(Decimal::ONE_HUNDRED).round_dp(0))
                .unwrap_or(Decimal::ZERO);
            (s.name.clone(), share)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: String,
    pub income: Decimal,
    pub expenses: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Warning,
    Tip,
    Prediction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub impact: Impact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub category: String,
    pub predicted: Decimal,
    pub confidence: f64, // 0.0..=1.0
}

impl Prediction {
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternPoint {
    pub day: String,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_round_to_whole_percent() {
        let slices = vec![
            CategorySlice { name: "Groceries".into(), value: Decimal::from(450) },
            CategorySlice { name: "Utilities".into(), value: Decimal::from(150) },
        ];
        let shares = category_shares(&slices);
        assert_eq!(shares[0], ("Groceries".to_string(), Decimal::from(75)));
        assert_eq!(shares[1], ("Utilities".to_string(), Decimal::from(25)));
        assert!(category_shares(&[]).is_empty());
    }

    #[test]
    fn shares_of_huge_totals_saturate() {
        let slices = vec![
            CategorySlice { name: "Housing".into(), value: Decimal::MAX },
            CategorySlice { name: "Dining".into(), value: Decimal::MAX },
        ];
        let shares = category_shares(&slices);
        assert_eq!(shares.len(), 2);
        assert!(shares.iter().all(|(_, p)| *p <= Decimal::ONE_HUNDRED));
    }

    #[test]
    fn confidence_percent_is_clamped() {
        let p = Prediction { category: "Groceries".into(), predicted: Decimal::from(485), confidence: 0.92 };
        assert_eq!(p.confidence_percent(), 92);
        let p = Prediction { confidence: 1.7, ..p };
        assert_eq!(p.confidence_percent(), 100);
    }
}
