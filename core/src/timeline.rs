//! Consequence timeline — when each bill's harm lands, bucketed for display.
//!
//! Buckets: urgent (≤3d), this week (4–7d), next week (8–14d),
//! this month (15–30d), later (31–90d). Anything past 90 days is dropped
//! as not actionable. Past-due deadlines land in `urgent`.
//!
//! Deadlines come from the bill's consequences when it has dated or
//! estimated ones. Otherwise they are estimated from the bill type:
//! utilities shut off ~45 days after the last payment, rent ~30 days after
//! the due date, mortgages ~120, auto loans ~60, credit cards 30 from now.

use crate::{
    bill::{Bill, BillType},
    clock::{add_days, days_between},
    consequence::Consequence,
    triage::bill_deadline,
    types::{BillId, Money},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TIMELINE_HORIZON_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    pub bill_id:     BillId,
    pub bill_name:   String,
    pub deadline:    DateTime<Utc>,
    pub days_until:  i64,
    pub description: String,
    pub amount:      Money,
    pub severity:    f64,
    /// True when no consequence gave a date and the type heuristic was used.
    pub estimated:   bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BucketTotal {
    pub count:  usize,
    pub amount: Money,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimelineTotals {
    pub urgent:             BucketTotal,
    pub this_week:          BucketTotal,
    pub next_week:          BucketTotal,
    pub this_month:         BucketTotal,
    pub later:              BucketTotal,
    pub total_events:       usize,
    /// Balance on bills whose harm lands within 30 days.
    pub amount_at_risk_30d: Money,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsequenceTimeline {
    pub urgent:     Vec<TimelineEvent>,
    pub this_week:  Vec<TimelineEvent>,
    pub next_week:  Vec<TimelineEvent>,
    pub this_month: Vec<TimelineEvent>,
    pub later:      Vec<TimelineEvent>,
    pub totals:     TimelineTotals,
}

/// Days after the anchor date before a bill of this type typically turns
/// into a real consequence. `None` defers to the priority-tier estimate.
fn type_grace_days(bill_type: BillType) -> Option<(i64, Anchor)> {
    match bill_type {
        BillType::Electric | BillType::Gas | BillType::Water | BillType::Utility => {
            Some((45, Anchor::LastPayment))
        }
        BillType::Rent => Some((30, Anchor::DueDate)),
        BillType::Mortgage => Some((120, Anchor::DueDate)),
        BillType::AutoLoan => Some((60, Anchor::DueDate)),
        BillType::CreditCard => Some((30, Anchor::Now)),
        BillType::Medical
        | BillType::Phone
        | BillType::Internet
        | BillType::Insurance
        | BillType::StudentLoan
        | BillType::PersonalLoan
        | BillType::Other => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    LastPayment,
    DueDate,
    Now,
}

fn estimated_deadline(bill: &Bill, now: DateTime<Utc>) -> DateTime<Utc> {
    match type_grace_days(bill.effective_type()) {
        Some((days, anchor)) => {
            let start = match anchor {
                // No payment on record: count from when the bill first came due.
                Anchor::LastPayment => bill
                    .last_payment_date
                    .or(bill.original_due_date)
                    .unwrap_or(bill.due_date),
                Anchor::DueDate => bill.due_date,
                Anchor::Now => now,
            };
            add_days(start, days)
        }
        None => bill_deadline(bill, now).deadline,
    }
}

fn has_dated_consequence(bill: &Bill) -> bool {
    bill.consequences
        .iter()
        .any(|c| c.kind.scheduled_date().is_some() || c.estimated_days.is_some())
}

fn worst_consequence(bill: &Bill) -> Option<&Consequence> {
    bill.consequences
        .iter()
        .max_by(|a, b| a.severity().total_cmp(&b.severity()))
}

fn fallback_description(bill_type: BillType) -> &'static str {
    match bill_type {
        BillType::Electric | BillType::Gas | BillType::Water | BillType::Utility => {
            "Utility disconnection notice expected"
        }
        BillType::Rent => "Eviction filing possible",
        BillType::Mortgage => "Foreclosure process may begin",
        BillType::AutoLoan => "Vehicle repossession possible",
        BillType::CreditCard => "Account sent to collections",
        BillType::Medical => "Account sent to collections",
        BillType::Phone | BillType::Internet => "Service suspension",
        BillType::Insurance => "Policy lapse",
        BillType::StudentLoan | BillType::PersonalLoan => "Loan default reported",
        BillType::Other => "Late payment consequences",
    }
}

pub fn timeline_event(bill: &Bill, now: DateTime<Utc>) -> TimelineEvent {
    let estimated = !has_dated_consequence(bill);
    let deadline = if estimated {
        estimated_deadline(bill, now)
    } else {
        bill_deadline(bill, now).deadline
    };
    let worst = worst_consequence(bill);
    let description = worst
        .map(|c| c.description.clone())
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| fallback_description(bill.effective_type()).to_string());

    TimelineEvent {
        bill_id: bill.bill_id.clone(),
        bill_name: bill.name.clone(),
        deadline,
        days_until: days_between(now, deadline),
        description,
        amount: bill.amount_due(),
        severity: worst.map(|c| c.severity()).unwrap_or(0.0),
        estimated,
    }
}

pub fn create_timeline(bills: &[Bill], now: DateTime<Utc>) -> ConsequenceTimeline {
    let mut timeline = ConsequenceTimeline::default();
    let mut dropped = 0usize;

    let mut events: Vec<TimelineEvent> = bills
        .iter()
        .filter(|b| b.is_payable())
        .map(|b| timeline_event(b, now))
        .collect();
    events.sort_by(|a, b| {
        a.days_until
            .cmp(&b.days_until)
            .then_with(|| b.severity.total_cmp(&a.severity))
    });

    for event in events {
        let (bucket, total) = match event.days_until {
            d if d <= 3 => (&mut timeline.urgent, &mut timeline.totals.urgent),
            d if d <= 7 => (&mut timeline.this_week, &mut timeline.totals.this_week),
            d if d <= 14 => (&mut timeline.next_week, &mut timeline.totals.next_week),
            d if d <= 30 => (&mut timeline.this_month, &mut timeline.totals.this_month),
            d if d <= TIMELINE_HORIZON_DAYS => (&mut timeline.later, &mut timeline.totals.later),
            _ => {
                dropped += 1;
                continue;
            }
        };
        if event.days_until <= 30 {
            timeline.totals.amount_at_risk_30d += event.amount;
        }
        total.count += 1;
        total.amount += event.amount;
        timeline.totals.total_events += 1;
        bucket.push(event);
    }

    log::debug!(
        "timeline: {} events, {} beyond {TIMELINE_HORIZON_DAYS} days dropped",
        timeline.totals.total_events,
        dropped
    );
    timeline
}
