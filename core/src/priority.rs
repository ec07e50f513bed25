//! Priority scorer — turns a bill into a single comparable 0–100 score.
//!
//! Five sub-scores, each 0–100, are weighted by `PriorityFactors` and
//! summed:
//!   1. Immediate consequence — the worst single harm, per-kind formula
//!   2. Financial impact      — late fees, interest, credit damage
//!   3. Recovery difficulty   — what it costs to undo the harm
//!   4. Due date              — how late, or how soon
//!   5. Amount                — balance relative to a typical bill
//!
//! RULES:
//!   - Scoring never mutates the bill and never reads the wall clock.
//!   - Missing optional data contributes zero; it never fails the bill.
//!   - Every ratio guards its denominator; no NaN or infinity escapes.

use crate::{
    bill::{Bill, BillType, PriorityTier},
    clock::days_between,
    config::{PriorityFactors, ScoringConfig},
    consequence::{Consequence, ConsequenceKind, SuspensionType},
    error::EngineResult,
    types::{BillId, Money},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Output types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SubScores {
    pub immediate_consequence: f64,
    pub financial_impact:      f64,
    pub recovery_difficulty:   f64,
    pub due_date:              f64,
    pub amount:                f64,
}

impl SubScores {
    pub fn weighted_total(&self, factors: &PriorityFactors) -> f64 {
        let total = self.immediate_consequence * factors.immediate_consequence_weight
            + self.financial_impact * factors.financial_impact_weight
            + self.recovery_difficulty * factors.recovery_difficulty_weight
            + self.due_date * factors.due_date_weight
            + self.amount * factors.amount_weight;
        clamp_score(total)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriorityReasoning {
    pub primary_reason:  String,
    pub risk_factors:    Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorityCalculation {
    pub bill_id:       BillId,
    pub final_score:   f64,
    pub tier:          PriorityTier,
    pub scores:        SubScores,
    pub reasoning:     PriorityReasoning,
    pub days_overdue:  i64,
    pub calculated_at: DateTime<Utc>,
    /// Zero-padded score for lexicographic range queries.
    pub sort_key:      String,
}

// ── Scorer ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityScorer {
    config: ScoringConfig,
}

impl PriorityScorer {
    /// Fails fast on weights that do not sum to 1.0 or a non-positive baseline.
    pub fn new(config: ScoringConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// A new scorer with different weights. `self` is left untouched.
    pub fn with_factors(&self, factors: PriorityFactors) -> EngineResult<Self> {
        Self::new(ScoringConfig { factors, ..self.config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn calculate_priority(&self, bill: &Bill, now: DateTime<Utc>) -> PriorityCalculation {
        note_data_quality(bill);

        let days_overdue = bill.days_overdue_at(now);
        let scores = SubScores {
            immediate_consequence: immediate_consequence_score(bill, now),
            financial_impact:      financial_impact_score(bill),
            recovery_difficulty:   recovery_difficulty_score(bill),
            due_date:              due_date_score(bill, now),
            amount:                amount_score(bill.amount_due(), self.config.typical_bill_amount),
        };
        let final_score = scores.weighted_total(&self.config.factors);
        let reasoning = build_reasoning(bill, &scores, now);

        log::debug!(
            "user={} bill={} priority: final={final_score:.1} ic={:.1} fi={:.1} rd={:.1} dd={:.1} amt={:.1}",
            bill.user_id,
            bill.bill_id,
            scores.immediate_consequence,
            scores.financial_impact,
            scores.recovery_difficulty,
            scores.due_date,
            scores.amount,
        );

        PriorityCalculation {
            bill_id: bill.bill_id.clone(),
            final_score,
            tier: PriorityTier::from_score(final_score),
            scores,
            reasoning,
            days_overdue,
            calculated_at: now,
            sort_key: priority_sort_key(final_score),
        }
    }

    /// Score a batch against one shared instant.
    pub fn calculate_all(&self, bills: &[Bill], now: DateTime<Utc>) -> Vec<PriorityCalculation> {
        bills.iter().map(|b| self.calculate_priority(b, now)).collect()
    }
}

/// Copy the cached scoring fields onto the bill.
pub fn apply_priority(bill: &mut Bill, calc: &PriorityCalculation) {
    bill.priority = Some(calc.final_score);
    bill.priority_calculated_at = Some(calc.calculated_at);
    bill.days_overdue = calc.days_overdue;
}

/// Score 95 → "000095". Rounded to the nearest integer, clamped to 0–100.
pub fn priority_sort_key(score: f64) -> String {
    let whole = clamp_score(score).round() as u32;
    format!("{whole:06}")
}

fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// `numerator / denominator`, or `fallback` when the denominator is not positive.
fn guarded_ratio(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() && numerator.is_finite() {
        numerator / denominator
    } else {
        fallback
    }
}

fn note_data_quality(bill: &Bill) {
    if bill.original_amount <= 0.0 && !bill.consequences.is_empty() {
        log::warn!(
            "user={} bill={} priority: original amount is zero, recovery ratios use sentinel",
            bill.user_id, bill.bill_id
        );
    }
    if !bill.current_balance.is_finite() {
        log::warn!(
            "user={} bill={} priority: non-finite balance treated as zero",
            bill.user_id, bill.bill_id
        );
    }
    if bill.bill_type.is_none() && BillType::infer_from_name(&bill.name).is_none() {
        log::debug!(
            "user={} bill={} priority: no bill type and no keyword match for '{}'",
            bill.user_id, bill.bill_id, bill.name
        );
    }
}

// ── 1. Immediate consequence ─────────────────────────────────────────────────

fn shutoff_urgency_bonus(estimated_days: Option<i64>) -> f64 {
    match estimated_days {
        Some(d) if d <= 3 => 40.0,
        Some(d) if d <= 7 => 30.0,
        Some(d) if d <= 14 => 20.0,
        _ => 10.0,
    }
}

/// Score of one consequence under its kind's formula.
pub fn consequence_score(consequence: &Consequence, now: DateTime<Utc>) -> f64 {
    let severity = consequence.severity();
    let raw = match &consequence.kind {
        ConsequenceKind::Shutoff(d) => {
            let essential_bonus = match d.utility_type {
                Some(u) if u.is_essential() => 20.0,
                _ => 0.0,
            };
            let days = consequence
                .estimated_days
                .or_else(|| d.shutoff_date.map(|date| days_between(now, date)));
            let score = severity * 0.6 + shutoff_urgency_bonus(days) + essential_bonus;
            if d.winter_moratorium { score * 0.7 } else { score }
        }
        ConsequenceKind::Eviction(d) | ConsequenceKind::Foreclosure(d) => {
            match d.court_date.map(|date| days_between(now, date)) {
                Some(days) if days <= 7 => 100.0,
                Some(days) if days <= 30 => 95.0,
                _ => 90.0,
            }
        }
        ConsequenceKind::Repossession(d) => {
            let base = match consequence.estimated_days {
                Some(days) if days <= 5 => 100.0,
                Some(days) if days <= 14 => 90.0,
                _ => 85.0,
            };
            let deficiency_bonus = match (d.deficiency_balance, d.vehicle_value) {
                (Some(deficiency), Some(value)) if deficiency > value * 0.5 => 10.0,
                _ => 0.0,
            };
            base + deficiency_bonus
        }
        ConsequenceKind::LicenseSuspension(d) => match d.suspension_type {
            SuspensionType::ProfessionalLicense => 90.0,
            SuspensionType::DriversLicense => 85.0,
            SuspensionType::VehicleRegistration | SuspensionType::Other => 70.0,
        },
        ConsequenceKind::CreditDamage(_)
        | ConsequenceKind::LateFees(_)
        | ConsequenceKind::Garnishment(_)
        | ConsequenceKind::ServiceLoss(_) => {
            severity * 0.8 + consequence.urgency.generic_bonus()
        }
    };
    clamp_score(raw)
}

/// The worst single consequence drives the score; no consequences scores zero.
pub fn immediate_consequence_score(bill: &Bill, now: DateTime<Utc>) -> f64 {
    bill.consequences
        .iter()
        .map(|c| consequence_score(c, now))
        .fold(0.0, f64::max)
}

// ── 2. Financial impact ──────────────────────────────────────────────────────

fn late_fee_amount(bill: &Bill) -> Money {
    let from_terms = bill.payment_terms.late_fee_for(bill.amount_due());
    let from_consequences = bill
        .consequences
        .iter()
        .filter_map(|c| match &c.kind {
            ConsequenceKind::LateFees(d) => d.late_fee_amount,
            _ => None,
        })
        .fold(0.0, f64::max);
    from_terms.max(from_consequences)
}

fn has_compounding_fees(bill: &Bill) -> bool {
    bill.payment_terms.is_compounding
        || bill.consequences.iter().any(|c| {
            matches!(&c.kind, ConsequenceKind::LateFees(d) if d.is_compounding)
        })
}

pub fn financial_impact_score(bill: &Bill) -> f64 {
    let balance = bill.amount_due();

    // A fee on a zero balance is all penalty.
    let late_fee = late_fee_amount(bill);
    let fee_component = if late_fee > 0.0 {
        (guarded_ratio(late_fee, balance, 1.0) * 100.0).min(30.0)
    } else {
        0.0
    };

    let monthly_interest = balance * (bill.interest_rate.max(0.0) / 100.0) / 12.0;
    let interest_ratio = guarded_ratio(monthly_interest, balance, 0.0);
    let interest_component = (interest_ratio * 1000.0).min(25.0);

    let worst_drop = bill
        .consequences
        .iter()
        .filter_map(|c| match &c.kind {
            ConsequenceKind::CreditDamage(d) => d.estimated_score_drop,
            _ => None,
        })
        .fold(0.0, f64::max);
    let credit_component = (worst_drop * 0.5).min(30.0);

    let compounding_component = if has_compounding_fees(bill) { 15.0 } else { 0.0 };

    clamp_score(fee_component + interest_component + credit_component + compounding_component)
}

// ── 3. Recovery difficulty ───────────────────────────────────────────────────

fn recovery_component(consequence: &Consequence, original_amount: Money) -> f64 {
    let cost = consequence.recovery_cost.unwrap_or(0.0).max(0.0);
    let cost_component = if cost > 0.0 {
        (guarded_ratio(cost, original_amount, 1.0) * 100.0).min(40.0)
    } else {
        0.0
    };
    let months = consequence.recovery_time_months.unwrap_or(0.0).max(0.0);
    let time_component = (months * 2.0).min(30.0);
    let unrecoverable = if consequence.recoverable { 0.0 } else { 50.0 };
    let unpreventable = if consequence.preventable { 0.0 } else { 20.0 };
    cost_component + time_component + unrecoverable + unpreventable
}

pub fn recovery_difficulty_score(bill: &Bill) -> f64 {
    let total: f64 = bill
        .consequences
        .iter()
        .map(|c| recovery_component(c, bill.original_amount))
        .sum();
    clamp_score(total)
}

// ── 4. Due date ──────────────────────────────────────────────────────────────

pub fn due_date_score(bill: &Bill, now: DateTime<Utc>) -> f64 {
    let days_overdue = bill.days_overdue_at(now);
    if days_overdue > 0 {
        return match days_overdue {
            d if d >= 90 => 100.0,
            d if d >= 60 => 90.0,
            d if d >= 30 => 80.0,
            d if d >= 14 => 70.0,
            d if d >= 7 => 60.0,
            d => 50.0 + d as f64,
        };
    }
    match bill.days_until_due(now) {
        d if d <= 3 => 40.0,
        d if d <= 7 => 30.0,
        d if d <= 14 => 20.0,
        d if d <= 30 => 10.0,
        _ => 5.0,
    }
}

// ── 5. Amount ────────────────────────────────────────────────────────────────

pub fn amount_score(balance: Money, typical_bill_amount: Money) -> f64 {
    match guarded_ratio(balance, typical_bill_amount, 0.0) {
        r if r >= 10.0 => 100.0,
        r if r >= 5.0 => 80.0,
        r if r >= 2.0 => 60.0,
        r if r >= 1.0 => 40.0,
        _ => 20.0,
    }
}

// ── Reasoning ────────────────────────────────────────────────────────────────

const IMMEDIATE_REASON_THRESHOLD: f64 = 60.0;
const FINANCIAL_REASON_THRESHOLD: f64 = 50.0;
const RECOVERY_REASON_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Driver {
    ImmediateConsequence,
    FinancialImpact,
    RecoveryDifficulty,
    DueDate,
    Amount,
}

fn dominant_driver(scores: &SubScores) -> Driver {
    let ranked = [
        (Driver::ImmediateConsequence, scores.immediate_consequence),
        (Driver::FinancialImpact, scores.financial_impact),
        (Driver::RecoveryDifficulty, scores.recovery_difficulty),
        (Driver::DueDate, scores.due_date),
        (Driver::Amount, scores.amount),
    ];
    // Earlier entries win ties.
    ranked
        .iter()
        .fold((Driver::Amount, f64::NEG_INFINITY), |best, &(driver, score)| {
            if score > best.1 { (driver, score) } else { best }
        })
        .0
}

/// Overdue long enough to be worth a call, or a creditor type that routinely
/// settles, with nothing already past the point of prevention.
pub fn has_negotiation_opportunity(bill: &Bill, now: DateTime<Utc>) -> bool {
    let negotiable_type = matches!(bill.effective_type(), BillType::Medical | BillType::CreditCard);
    let all_preventable = bill.consequences.iter().all(|c| c.preventable);
    (bill.days_overdue_at(now) >= 30 || negotiable_type) && all_preventable
}

fn describe(consequence: &Consequence) -> String {
    if consequence.description.trim().is_empty() {
        format!("{:?}", consequence.consequence_type())
    } else {
        consequence.description.clone()
    }
}

fn build_reasoning(bill: &Bill, scores: &SubScores, now: DateTime<Utc>) -> PriorityReasoning {
    let mut reasoning = PriorityReasoning::default();
    let worst = bill
        .consequences
        .iter()
        .map(|c| (c, consequence_score(c, now)))
        .fold(None::<(&Consequence, f64)>, |best, (c, s)| match best {
            Some((_, bs)) if bs >= s => best,
            _ => Some((c, s)),
        });

    match dominant_driver(scores) {
        Driver::ImmediateConsequence
            if scores.immediate_consequence > IMMEDIATE_REASON_THRESHOLD =>
        {
            let what = worst.map(|(c, _)| describe(c)).unwrap_or_else(|| "serious harm".into());
            reasoning.primary_reason = format!("Immediate risk: {what}");
            reasoning.risk_factors.extend(
                bill.consequences
                    .iter()
                    .filter(|c| consequence_score(c, now) > IMMEDIATE_REASON_THRESHOLD)
                    .map(describe),
            );
            reasoning
                .recommendations
                .push(format!("Contact {} immediately to prevent {}", creditor_name(bill), what.to_lowercase()));
        }
        Driver::FinancialImpact if scores.financial_impact > FINANCIAL_REASON_THRESHOLD => {
            reasoning.primary_reason = "High financial impact from fees, interest and credit damage".into();
            reasoning.risk_factors.extend(
                bill.consequences
                    .iter()
                    .filter(|c| matches!(c.kind, ConsequenceKind::LateFees(_) | ConsequenceKind::CreditDamage(_)))
                    .map(describe),
            );
            let minimum = if bill.minimum_payment > 0.0 { bill.minimum_payment } else { bill.amount_due() };
            reasoning
                .recommendations
                .push(format!("Make at least the minimum payment of ${minimum:.2} to stop fees from growing"));
        }
        Driver::RecoveryDifficulty if scores.recovery_difficulty > RECOVERY_REASON_THRESHOLD => {
            reasoning.primary_reason = "Costly or impossible to recover from once it happens".into();
            reasoning.risk_factors.extend(
                bill.consequences
                    .iter()
                    .filter(|c| !c.recoverable || !c.preventable || c.recovery_cost.unwrap_or(0.0) > 0.0)
                    .map(describe),
            );
            let recovery_cost: Money = bill.consequences.iter().filter_map(|c| c.recovery_cost).sum();
            if recovery_cost > bill.amount_due() {
                reasoning.recommendations.push(format!(
                    "Prevent default: recovering would cost ${recovery_cost:.2}, more than the ${:.2} balance",
                    bill.amount_due()
                ));
            } else {
                reasoning.recommendations.push("Pay before the consequence takes effect; undoing it is slow".into());
            }
        }
        _ => {
            let overdue = bill.days_overdue_at(now);
            reasoning.primary_reason = if overdue > 0 {
                format!("{overdue} days overdue")
            } else {
                format!("Due in {} days", bill.days_until_due(now))
            };
            reasoning.recommendations.push("Schedule payment before the due date".into());
        }
    }

    if bill.is_essential {
        reasoning
            .risk_factors
            .push("Essential service: losing it affects housing, utilities or transportation".into());
        reasoning
            .recommendations
            .push("Pay this ahead of non-essential bills".into());
    }
    if has_negotiation_opportunity(bill, now) {
        reasoning
            .recommendations
            .push("Ask the creditor about a hardship plan or reduced payment arrangement".into());
    }

    reasoning
}

fn creditor_name(bill: &Bill) -> &str {
    bill.creditor.as_deref().unwrap_or("the creditor")
}
