//! Cash runway — a simple weeks-to-zero-balance estimate.
//!
//! Not a forecast: one week's net flow, extrapolated linearly, plus a
//! debt-to-income ratio for context.

use crate::{bill::Bill, types::{round_cents, Money}};
use serde::{Deserialize, Serialize};

/// Debt-to-income ratio reported when there is no income to divide by.
pub const NO_INCOME_RATIO: f64 = 100.0;

const WEEKS_PER_MONTH: f64 = 52.0 / 12.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CashflowSnapshot {
    pub available_cash:            Money,
    pub weekly_income:             Money,
    pub weekly_essential_expenses: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunwayEstimate {
    /// Income minus essential expenses minus the weekly share of minimum payments.
    pub weekly_net:               Money,
    /// `None` when the balance is not shrinking.
    pub weeks_to_zero:            Option<f64>,
    pub monthly_minimum_payments: Money,
    pub total_outstanding:        Money,
    /// Monthly minimum payments as a percentage of monthly income.
    pub debt_to_income_ratio:     f64,
}

fn non_negative(value: Money) -> Money {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

pub fn estimate_runway(snapshot: &CashflowSnapshot, bills: &[Bill]) -> RunwayEstimate {
    let payable: Vec<&Bill> = bills.iter().filter(|b| b.is_payable()).collect();

    let monthly_minimum_payments: Money = payable
        .iter()
        .map(|b| {
            if b.minimum_payment > 0.0 {
                b.minimum_payment.min(b.amount_due())
            } else {
                b.amount_due()
            }
        })
        .sum();
    let total_outstanding: Money = payable.iter().map(|b| b.amount_due()).sum();

    let income = non_negative(snapshot.weekly_income);
    let expenses = non_negative(snapshot.weekly_essential_expenses);
    let weekly_net = income - expenses - monthly_minimum_payments / WEEKS_PER_MONTH;

    let cash = non_negative(snapshot.available_cash);
    let weeks_to_zero = if weekly_net < 0.0 {
        Some(cash / -weekly_net)
    } else {
        None
    };

    let monthly_income = income * WEEKS_PER_MONTH;
    let debt_to_income_ratio = if monthly_income > 0.0 {
        monthly_minimum_payments / monthly_income * 100.0
    } else {
        NO_INCOME_RATIO
    };

    RunwayEstimate {
        weekly_net: round_cents(weekly_net),
        weeks_to_zero,
        monthly_minimum_payments: round_cents(monthly_minimum_payments),
        total_outstanding: round_cents(total_outstanding),
        debt_to_income_ratio,
    }
}
