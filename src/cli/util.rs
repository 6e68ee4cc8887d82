use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::database::models::Transaction;

pub fn fmt_money(d: &Decimal) -> String {
    let rounded = d.round_dp(2);
    if rounded.is_sign_negative() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded)
    }
}

/// `+$3000.00` for income, `-$85.50` for an expense.
pub fn fmt_signed(t: &Transaction) -> String {
    let v = t.signed_amount().round_dp(2);
    if v.is_sign_negative() {
        format!("-${:.2}", v.abs())
    } else {
        format!("+${:.2}", v)
    }
}

pub fn fmt_percent(d: &Decimal) -> String {
    format!("{}%", d.normalize())
}

/// Positive amounts only; the form carries the direction separately.
pub fn parse_money(s: &str) -> Option<Decimal> {
    let d: Decimal = s.trim().parse().ok()?;
    (d > Decimal::ZERO).then_some(d)
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn iso(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}
