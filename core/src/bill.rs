//! Bill entity — the record every engine component reads.
//!
//! A bill is created by intake, rescored whenever its due date, balance,
//! consequences or status change, and archived (never destroyed) when the
//! user removes it. `days_overdue`, `priority` and `priority_calculated_at`
//! are caches of the last scoring pass, not inputs.

use crate::{
    clock::days_between,
    consequence::Consequence,
    types::{BillId, Money, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Classification ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BillType {
    Electric,
    Gas,
    Water,
    Utility,
    Rent,
    Mortgage,
    AutoLoan,
    CreditCard,
    Medical,
    Phone,
    Internet,
    Insurance,
    StudentLoan,
    PersonalLoan,
    Other,
}

/// Keyword table for name-based inference. First match wins, so the more
/// specific phrases sit above the generic ones.
const NAME_KEYWORDS: &[(&str, BillType)] = &[
    ("mortgage", BillType::Mortgage),
    ("home loan", BillType::Mortgage),
    ("insurance", BillType::Insurance),
    ("credit card", BillType::CreditCard),
    ("visa", BillType::CreditCard),
    ("mastercard", BillType::CreditCard),
    ("amex", BillType::CreditCard),
    ("student", BillType::StudentLoan),
    ("rent", BillType::Rent),
    ("landlord", BillType::Rent),
    ("apartment", BillType::Rent),
    ("electric", BillType::Electric),
    ("power", BillType::Electric),
    ("gas", BillType::Gas),
    ("water", BillType::Water),
    ("sewer", BillType::Water),
    ("utility", BillType::Utility),
    ("utilities", BillType::Utility),
    ("car", BillType::AutoLoan),
    ("auto", BillType::AutoLoan),
    ("vehicle", BillType::AutoLoan),
    ("medical", BillType::Medical),
    ("hospital", BillType::Medical),
    ("doctor", BillType::Medical),
    ("clinic", BillType::Medical),
    ("phone", BillType::Phone),
    ("mobile", BillType::Phone),
    ("wireless", BillType::Phone),
    ("internet", BillType::Internet),
    ("broadband", BillType::Internet),
    ("loan", BillType::PersonalLoan),
];

impl BillType {
    /// Best-effort classification from a free-text bill name.
    /// Returns `None` when no keyword matches.
    pub fn infer_from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        NAME_KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, bill_type)| *bill_type)
    }

    pub fn category(&self) -> BillCategory {
        match self {
            Self::Electric | Self::Gas | Self::Water | Self::Utility
            | Self::Phone | Self::Internet => BillCategory::Utility,
            Self::Rent | Self::Mortgage => BillCategory::Housing,
            Self::AutoLoan => BillCategory::Transportation,
            Self::CreditCard | Self::StudentLoan | Self::PersonalLoan => BillCategory::Credit,
            Self::Medical => BillCategory::Medical,
            Self::Insurance | Self::Other => BillCategory::Other,
        }
    }

    pub fn is_utility(&self) -> bool {
        matches!(self, Self::Electric | Self::Gas | Self::Water | Self::Utility)
    }
}

/// Declaration order is the display order for help resources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BillCategory {
    Housing,
    Utility,
    Transportation,
    Credit,
    Medical,
    Other,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    #[default]
    Active,
    PaymentPlan,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::PaymentPlan => "PAYMENT_PLAN",
            Self::Paid => "PAID",
        }
    }
}

// ── Priority tier ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityTier {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityTier {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::Critical,
            s if s >= 60.0 => Self::High,
            s if s >= 40.0 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Days from "now" assumed before harm lands when no date is known.
    pub fn estimated_deadline_days(&self) -> i64 {
        match self {
            Self::Critical => 3,
            Self::High => 7,
            Self::Medium => 30,
            Self::Low => 60,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

// ── Payment terms ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaymentTerms {
    pub grace_period_days:  Option<i64>,
    pub late_fee_amount:    Option<Money>,
    /// Percent of the balance, e.g. 5.0 for 5%.
    pub late_fee_percentage: Option<f64>,
    pub is_compounding:     bool,
}

impl PaymentTerms {
    /// The larger of the flat and percentage late fee, zero when neither is set.
    pub fn late_fee_for(&self, balance: Money) -> Money {
        let flat = self.late_fee_amount.unwrap_or(0.0).max(0.0);
        let pct = self
            .late_fee_percentage
            .map(|p| balance.max(0.0) * p / 100.0)
            .unwrap_or(0.0)
            .max(0.0);
        flat.max(pct)
    }
}

// ── Bill ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    pub bill_id:           BillId,
    pub user_id:           UserId,
    pub name:              String,
    #[serde(default)]
    pub creditor:          Option<String>,
    #[serde(default)]
    pub bill_type:         Option<BillType>,
    #[serde(default)]
    pub status:            BillStatus,
    pub current_balance:   Money,
    #[serde(default)]
    pub original_amount:   Money,
    #[serde(default)]
    pub minimum_payment:   Money,
    /// Annual percentage rate, e.g. 24.0 for 24% APR.
    #[serde(default)]
    pub interest_rate:     f64,
    pub due_date:          DateTime<Utc>,
    #[serde(default)]
    pub original_due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub days_overdue:      i64,
    #[serde(default)]
    pub is_essential:      bool,
    #[serde(default)]
    pub consequences:      Vec<Consequence>,
    #[serde(default)]
    pub payment_terms:     PaymentTerms,
    #[serde(default)]
    pub priority:          Option<f64>,
    #[serde(default)]
    pub priority_calculated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived_at:       Option<DateTime<Utc>>,
}

impl Bill {
    /// A fresh active bill with a generated id. Balance doubles as the
    /// original amount until intake says otherwise.
    pub fn new(
        user_id: impl Into<UserId>,
        name: impl Into<String>,
        current_balance: Money,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            bill_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            creditor: None,
            bill_type: None,
            status: BillStatus::Active,
            current_balance,
            original_amount: current_balance,
            minimum_payment: 0.0,
            interest_rate: 0.0,
            due_date,
            original_due_date: Some(due_date),
            last_payment_date: None,
            days_overdue: 0,
            is_essential: false,
            consequences: Vec::new(),
            payment_terms: PaymentTerms::default(),
            priority: None,
            priority_calculated_at: None,
            archived_at: None,
        }
    }

    pub fn with_id(mut self, bill_id: impl Into<BillId>) -> Self {
        self.bill_id = bill_id.into();
        self
    }

    pub fn with_type(mut self, bill_type: BillType) -> Self {
        self.bill_type = Some(bill_type);
        self
    }

    pub fn essential(mut self) -> Self {
        self.is_essential = true;
        self
    }

    pub fn with_consequence(mut self, consequence: Consequence) -> Self {
        self.consequences.push(consequence);
        self
    }

    /// Explicit type first, name keywords second, `Other` last.
    pub fn effective_type(&self) -> BillType {
        self.bill_type
            .or_else(|| BillType::infer_from_name(&self.name))
            .unwrap_or(BillType::Other)
    }

    pub fn category(&self) -> BillCategory {
        self.effective_type().category()
    }

    /// What it takes to clear the bill today.
    pub fn amount_due(&self) -> Money {
        if self.current_balance.is_finite() {
            self.current_balance.max(0.0)
        } else {
            0.0
        }
    }

    /// Days past the due date as of `now`; zero when not yet due.
    pub fn days_overdue_at(&self, now: DateTime<Utc>) -> i64 {
        days_between(self.due_date, now).max(0)
    }

    /// Days until the due date as of `now`; negative once overdue.
    pub fn days_until_due(&self, now: DateTime<Utc>) -> i64 {
        days_between(now, self.due_date)
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn is_payable(&self) -> bool {
        !self.is_archived() && self.status != BillStatus::Paid && self.amount_due() > 0.0
    }

    /// Cached tier from the last scoring pass, if any.
    pub fn priority_tier(&self) -> Option<PriorityTier> {
        self.priority.map(PriorityTier::from_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn explicit_type_beats_name_keywords() {
        let bill = Bill::new("u1", "City Water & Power", 120.0, now()).with_type(BillType::Rent);
        assert_eq!(bill.effective_type(), BillType::Rent);

        let inferred = Bill::new("u1", "City Water & Power", 120.0, now());
        assert_eq!(inferred.effective_type(), BillType::Electric, "'power' is checked before 'water'");
    }

    #[test]
    fn specific_phrases_win_over_substrings() {
        let card = Bill::new("u1", "Chase Credit Card", 300.0, now());
        assert_eq!(card.effective_type(), BillType::CreditCard);
        let insurance = Bill::new("u1", "Car insurance", 140.0, now());
        assert_eq!(insurance.effective_type(), BillType::Insurance);
    }

    #[test]
    fn unknown_names_fall_back_to_other() {
        let bill = Bill::new("u1", "Gym membership", 40.0, now());
        assert_eq!(bill.effective_type(), BillType::Other);
        assert_eq!(bill.category(), BillCategory::Other);
    }

    #[test]
    fn days_overdue_never_negative() {
        let bill = Bill::new("u1", "Rent", 900.0, now() + Duration::days(4));
        assert_eq!(bill.days_overdue_at(now()), 0);
        assert_eq!(bill.days_until_due(now()), 4);

        let late = Bill::new("u1", "Rent", 900.0, now() - Duration::days(12));
        assert_eq!(late.days_overdue_at(now()), 12);
    }

    #[test]
    fn late_fee_takes_larger_of_flat_and_percentage() {
        let terms = PaymentTerms {
            late_fee_amount: Some(25.0),
            late_fee_percentage: Some(5.0),
            ..Default::default()
        };
        assert_eq!(terms.late_fee_for(1000.0), 50.0);
        assert_eq!(terms.late_fee_for(100.0), 25.0);
        assert_eq!(PaymentTerms::default().late_fee_for(500.0), 0.0);
    }

    #[test]
    fn paid_and_archived_bills_are_not_payable() {
        let mut bill = Bill::new("u1", "Electric", 80.0, now());
        assert!(bill.is_payable());
        bill.status = BillStatus::Paid;
        assert!(!bill.is_payable());
        bill.status = BillStatus::Active;
        bill.archived_at = Some(now());
        assert!(!bill.is_payable());
    }

    #[test]
    fn tiers_from_scores() {
        assert_eq!(PriorityTier::from_score(95.0), PriorityTier::Critical);
        assert_eq!(PriorityTier::from_score(80.0), PriorityTier::Critical);
        assert_eq!(PriorityTier::from_score(79.9), PriorityTier::High);
        assert_eq!(PriorityTier::from_score(40.0), PriorityTier::Medium);
        assert_eq!(PriorityTier::from_score(10.0), PriorityTier::Low);
    }
}
