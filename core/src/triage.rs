//! Crisis triage — spends a limited amount of cash across urgent bills.
//!
//! The allocator is a greedy walk over urgent bills ordered by nearest
//! deadline. It is deliberately not an optimiser: every action it emits
//! can be explained in one sentence ("this shuts off first").
//!
//! ALGORITHM:
//!   1. Resolve a deadline per bill (scheduled date, consequence estimate,
//!      or an estimate from the priority tier).
//!   2. Keep bills that are CRITICAL or due within 7 days.
//!   3. Sort by days until deadline, ascending. Ties keep input order.
//!   4. Pay in full while cash lasts, then one partial payment if the
//!      remainder clears the minimum threshold, then call or get help.
//!
//! RULE: the allocator never spends more than `usable_amount`. The part
//! of the available cash withheld by the strategy is never allocated.

use crate::{
    bill::{Bill, BillCategory, PriorityTier},
    clock::{add_days, days_between},
    config::TriageConfig,
    priority::due_date_score,
    types::{round_cents, BillId, Money},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Deadlines at or inside this many days are "urgent".
pub const URGENT_WINDOW_DAYS: i64 = 7;

/// Deadlines at or inside this many days escalate to GET_HELP when unpayable.
pub const EMERGENCY_WINDOW_DAYS: i64 = 3;

// ── Strategy ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStrategy {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl PaymentStrategy {
    /// Fraction of available cash the allocator may spend.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Conservative => 0.5,
            Self::Balanced => 0.7,
            Self::Aggressive => 0.9,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for PaymentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "balanced" => Ok(Self::Balanced),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(format!(
                "Unknown strategy '{other}' (expected conservative, balanced or aggressive)"
            )),
        }
    }
}

// ── Deadlines ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineSource {
    /// A date the creditor scheduled (shutoff date, court date).
    Scheduled,
    /// The nearest consequence's `estimated_days`.
    ConsequenceEstimate,
    /// Estimated from the cached priority tier.
    PriorityTier,
    /// No cached priority: tier derived from the due date alone.
    DueDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillDeadline {
    pub bill_id:    BillId,
    pub deadline:   DateTime<Utc>,
    pub days_until: i64,
    pub tier:       PriorityTier,
    pub source:     DeadlineSource,
}

/// Tier from the cached score, or from the due-date sub-score when the
/// bill has never been scored.
fn effective_tier(bill: &Bill, now: DateTime<Utc>) -> (PriorityTier, bool) {
    match bill.priority_tier() {
        Some(tier) => (tier, true),
        None => (PriorityTier::from_score(due_date_score(bill, now)), false),
    }
}

pub fn bill_deadline(bill: &Bill, now: DateTime<Utc>) -> BillDeadline {
    let (tier, scored) = effective_tier(bill, now);

    let scheduled = bill.consequences.iter().filter_map(|c| c.kind.scheduled_date()).min();
    let estimated = bill.consequences.iter().filter_map(|c| c.estimated_days).min();

    let (deadline, source) = match (scheduled, estimated) {
        (Some(date), _) => (date, DeadlineSource::Scheduled),
        (None, Some(days)) => (add_days(now, days), DeadlineSource::ConsequenceEstimate),
        (None, None) => {
            let source = if scored { DeadlineSource::PriorityTier } else { DeadlineSource::DueDate };
            (add_days(now, tier.estimated_deadline_days()), source)
        }
    };

    BillDeadline {
        bill_id: bill.bill_id.clone(),
        deadline,
        days_until: days_between(now, deadline),
        tier,
        source,
    }
}

// ── Actions ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    PayNow,
    PartialPayment,
    CallCreditor,
    GetHelp,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PayNow => "PAY_NOW",
            Self::PartialPayment => "PARTIAL_PAYMENT",
            Self::CallCreditor => "CALL_CREDITOR",
            Self::GetHelp => "GET_HELP",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionUrgency {
    Immediate,
    ThisWeek,
    NextPaycheck,
}

impl ActionUrgency {
    fn from_days(days_until: i64) -> Self {
        match days_until {
            d if d <= EMERGENCY_WINDOW_DAYS => Self::Immediate,
            d if d <= URGENT_WINDOW_DAYS => Self::ThisWeek,
            _ => Self::NextPaycheck,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageAction {
    #[serde(rename = "type")]
    pub action_type:       ActionType,
    pub bill_id:           BillId,
    pub bill_name:         String,
    /// Cash allocated to this bill. Zero for CALL_CREDITOR and GET_HELP.
    pub amount:            Money,
    /// What is still owed after `amount`.
    pub remaining_balance: Money,
    pub days_until:        i64,
    pub reason:            String,
    pub instructions:      String,
    pub urgency:           ActionUrgency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HelpResource {
    pub name:        String,
    pub description: String,
    pub contact:     String,
    pub category:    Option<BillCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageResult {
    pub strategy:           PaymentStrategy,
    pub available_amount:   Money,
    pub usable_amount:      Money,
    /// Cash the strategy holds back. Never allocated.
    pub reserved_buffer:    Money,
    pub total_allocated:    Money,
    pub unallocated_amount: Money,
    pub is_crisis:          bool,
    pub actions:            Vec<TriageAction>,
    pub immediate_actions:  Vec<TriageAction>,
    pub consequences:       Vec<String>,
    pub help_resources:     Vec<HelpResource>,
    pub next_steps:         Vec<String>,
}

// ── Help resources ───────────────────────────────────────────────────────────

fn resource_for(category: BillCategory) -> Option<HelpResource> {
    let (name, description, contact) = match category {
        BillCategory::Utility => (
            "LIHEAP energy assistance",
            "Federal Low Income Home Energy Assistance Program; can pay utility arrears and stop a shutoff",
            "1-866-674-6327",
        ),
        BillCategory::Housing => (
            "Emergency rental assistance",
            "Local rental and mortgage assistance programs; ask about eviction diversion",
            "Local housing authority, or dial 211",
        ),
        BillCategory::Transportation => (
            "Legal aid",
            "Free legal help on repossession rights, redemption and deficiency balances",
            "www.lawhelp.org",
        ),
        BillCategory::Credit => (
            "Nonprofit credit counseling (NFCC)",
            "Certified counselors can set up a debt management plan with card issuers",
            "1-800-388-2227",
        ),
        BillCategory::Medical => (
            "Hospital financial assistance",
            "Non-profit hospitals must offer charity care; ask billing for the application",
            "The provider's billing office",
        ),
        BillCategory::Other => return None,
    };
    Some(HelpResource {
        name: name.into(),
        description: description.into(),
        contact: contact.into(),
        category: Some(category),
    })
}

fn emergency_hotline() -> HelpResource {
    HelpResource {
        name: "211 emergency hotline".into(),
        description: "Free, confidential referrals to local emergency financial assistance".into(),
        contact: "Dial 211".into(),
        category: None,
    }
}

fn help_resources_for(categories: &BTreeSet<BillCategory>) -> Vec<HelpResource> {
    let mut resources: Vec<HelpResource> =
        categories.iter().filter_map(|c| resource_for(*c)).collect();
    resources.push(emergency_hotline());
    resources
}

// ── Allocation ───────────────────────────────────────────────────────────────

/// Triage with the default configuration ($25 partial-payment threshold).
pub fn triage_payments(
    bills: &[Bill],
    available_amount: Money,
    strategy: PaymentStrategy,
    now: DateTime<Utc>,
) -> TriageResult {
    triage_payments_with(&TriageConfig::default(), bills, available_amount, strategy, now)
}

pub fn triage_payments_with(
    config: &TriageConfig,
    bills: &[Bill],
    available_amount: Money,
    strategy: PaymentStrategy,
    now: DateTime<Utc>,
) -> TriageResult {
    // Negative or non-finite cash is valid input; it simply buys nothing.
    let spendable = if available_amount.is_finite() { available_amount.max(0.0) } else { 0.0 };
    let usable_amount = round_cents(spendable * strategy.multiplier());
    let reserved_buffer = round_cents(spendable - usable_amount);

    let mut urgent: Vec<(&Bill, BillDeadline)> = bills
        .iter()
        .filter(|b| b.is_payable())
        .map(|b| (b, bill_deadline(b, now)))
        .filter(|(_, d)| d.tier == PriorityTier::Critical || d.days_until <= URGENT_WINDOW_DAYS)
        .collect();

    if urgent.is_empty() {
        log::info!("triage: no urgent bills among {} ({strategy})", bills.len());
        return TriageResult {
            strategy,
            available_amount,
            usable_amount,
            reserved_buffer,
            total_allocated: 0.0,
            unallocated_amount: usable_amount,
            is_crisis: false,
            actions: Vec::new(),
            immediate_actions: Vec::new(),
            consequences: Vec::new(),
            help_resources: vec![emergency_hotline()],
            next_steps: vec![
                "No urgent action needed: nothing is critical or due within 7 days".into(),
                "Schedule upcoming payments by due date and keep your buffer intact".into(),
            ],
        };
    }

    // Stable sort: equal deadlines keep the caller's order.
    urgent.sort_by_key(|(_, d)| d.days_until);

    let urgent_total: Money = urgent.iter().map(|(b, _)| round_cents(b.amount_due())).sum();
    let is_crisis = urgent_total > usable_amount;

    let threshold = config.minimum_payment_threshold;
    let mut remaining = usable_amount;
    let mut actions = Vec::with_capacity(urgent.len());
    let mut consequences = Vec::new();
    let mut unmet_categories = BTreeSet::new();

    for (bill, deadline) in &urgent {
        let amount_due = round_cents(bill.amount_due());
        let days = deadline.days_until;
        let harm = worst_harm(bill);

        let action = if remaining >= amount_due {
            remaining = round_cents(remaining - amount_due);
            TriageAction {
                action_type: ActionType::PayNow,
                bill_id: bill.bill_id.clone(),
                bill_name: bill.name.clone(),
                amount: amount_due,
                remaining_balance: 0.0,
                days_until: days,
                reason: format!("{harm} in {}; nearest deadline you can cover in full", days_phrase(days)),
                instructions: format!("Pay ${amount_due:.2} to {} now and keep the confirmation number", payee(bill)),
                urgency: ActionUrgency::from_days(days),
            }
        } else if remaining > 0.0 && remaining >= threshold {
            let paid = remaining;
            let left = round_cents(amount_due - paid);
            remaining = 0.0;
            consequences.push(format!(
                "{}: ${left:.2} still owed after a partial payment; {} may still follow in {}",
                bill.name, harm.to_lowercase(), days_phrase(days)
            ));
            unmet_categories.insert(bill.category());
            TriageAction {
                action_type: ActionType::PartialPayment,
                bill_id: bill.bill_id.clone(),
                bill_name: bill.name.clone(),
                amount: paid,
                remaining_balance: left,
                days_until: days,
                reason: format!("{harm} in {}; not enough cash to pay in full", days_phrase(days)),
                instructions: format!(
                    "Pay ${paid:.2} to {} now, then call them about the remaining ${left:.2} and ask for a payment arrangement",
                    payee(bill)
                ),
                urgency: ActionUrgency::from_days(days),
            }
        } else if days <= EMERGENCY_WINDOW_DAYS {
            consequences.push(format!(
                "{}: {} in {} with no money left to pay the ${amount_due:.2} due",
                bill.name, harm.to_lowercase(), days_phrase(days)
            ));
            unmet_categories.insert(bill.category());
            TriageAction {
                action_type: ActionType::GetHelp,
                bill_id: bill.bill_id.clone(),
                bill_name: bill.name.clone(),
                amount: 0.0,
                remaining_balance: amount_due,
                days_until: days,
                reason: format!("{harm} in {} and no funds remain", days_phrase(days)),
                instructions: format!(
                    "Seek emergency assistance today (dial 211) and call {} to request an extension",
                    payee(bill)
                ),
                urgency: ActionUrgency::Immediate,
            }
        } else {
            consequences.push(format!(
                "{}: {} in {} unless an arrangement is made for ${amount_due:.2}",
                bill.name, harm.to_lowercase(), days_phrase(days)
            ));
            unmet_categories.insert(bill.category());
            TriageAction {
                action_type: ActionType::CallCreditor,
                bill_id: bill.bill_id.clone(),
                bill_name: bill.name.clone(),
                amount: 0.0,
                remaining_balance: amount_due,
                days_until: days,
                reason: format!("{harm} in {}; no funds left in this round", days_phrase(days)),
                instructions: format!(
                    "Call {} before the deadline, explain the hardship and ask for an extension or payment plan",
                    payee(bill)
                ),
                urgency: ActionUrgency::from_days(days),
            }
        };
        actions.push(action);
    }

    let total_allocated = round_cents(actions.iter().map(|a| a.amount).sum());
    let immediate_actions: Vec<TriageAction> = actions
        .iter()
        .filter(|a| a.urgency == ActionUrgency::Immediate)
        .cloned()
        .collect();
    let next_steps = build_next_steps(&actions, is_crisis, reserved_buffer);

    log::info!(
        "triage: {} urgent bills, usable ${usable_amount:.2}, allocated ${total_allocated:.2}, crisis={is_crisis} ({strategy})",
        actions.len()
    );

    TriageResult {
        strategy,
        available_amount,
        usable_amount,
        reserved_buffer,
        total_allocated,
        unallocated_amount: round_cents(usable_amount - total_allocated),
        is_crisis,
        actions,
        immediate_actions,
        consequences,
        help_resources: help_resources_for(&unmet_categories),
        next_steps,
    }
}

fn worst_harm(bill: &Bill) -> String {
    bill.consequences
        .iter()
        .max_by(|a, b| a.severity().total_cmp(&b.severity()))
        .map(|c| c.description.clone())
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| "Payment deadline".into())
}

fn payee(bill: &Bill) -> &str {
    bill.creditor.as_deref().unwrap_or(&bill.name)
}

fn days_phrase(days: i64) -> String {
    match days {
        d if d < 0 => format!("{} days ago", -d),
        0 => "today".into(),
        1 => "1 day".into(),
        d => format!("{d} days"),
    }
}

fn build_next_steps(actions: &[TriageAction], is_crisis: bool, reserved_buffer: Money) -> Vec<String> {
    let mut steps = Vec::new();

    for a in actions.iter().filter(|a| a.urgency == ActionUrgency::Immediate) {
        steps.push(match a.action_type {
            ActionType::PayNow | ActionType::PartialPayment => {
                format!("Today: pay ${:.2} toward {}", a.amount, a.bill_name)
            }
            ActionType::GetHelp => format!("Today: get emergency help for {}", a.bill_name),
            ActionType::CallCreditor => format!("Today: call about {}", a.bill_name),
        });
    }

    let payments_this_week: Vec<&str> = actions
        .iter()
        .filter(|a| a.urgency != ActionUrgency::Immediate)
        .filter(|a| matches!(a.action_type, ActionType::PayNow | ActionType::PartialPayment))
        .map(|a| a.bill_name.as_str())
        .collect();
    if !payments_this_week.is_empty() {
        steps.push(format!("This week: pay {}", payments_this_week.join(", ")));
    }

    let calls: Vec<&str> = actions
        .iter()
        .filter(|a| a.urgency != ActionUrgency::Immediate)
        .filter(|a| matches!(a.action_type, ActionType::CallCreditor))
        .map(|a| a.bill_name.as_str())
        .collect();
    if !calls.is_empty() {
        steps.push(format!("Call before the deadline: {}", calls.join(", ")));
    }

    if is_crisis {
        steps.push("Contact the help resources listed for bills you cannot cover".into());
    }
    if reserved_buffer > 0.0 {
        steps.push(format!("Keep ${reserved_buffer:.2} in reserve for food and transportation"));
    }
    steps.push("Run triage again after your next paycheck".into());
    steps
}
