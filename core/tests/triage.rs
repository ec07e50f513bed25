use bill_triage_core::{
    bill::{Bill, BillStatus, BillType, PriorityTier},
    clock::MAX_OFFSET_DAYS,
    consequence::{Consequence, UtilityType},
    priority::{apply_priority, PriorityScorer},
    sample::HouseholdGenerator,
    triage::{
        bill_deadline, triage_payments, triage_payments_with, ActionType, ActionUrgency,
        PaymentStrategy, URGENT_WINDOW_DAYS,
    },
    config::{ScoringConfig, TriageConfig},
    types::round_cents,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap()
}

/// A five-days-overdue bill whose shutoff lands in `days`.
fn urgent_bill(id: &str, amount: f64, days: i64) -> Bill {
    Bill::new("u1", format!("Utility {id}"), amount, now() - Duration::days(5))
        .with_id(id)
        .with_type(BillType::Electric)
        .with_consequence(Consequence::shutoff(UtilityType::Electric, 80.0).in_days(days))
}

#[test]
fn shortfall_becomes_a_partial_payment_with_remainder() {
    let bills = vec![urgent_bill("power", 250.0, 4)];
    let result = triage_payments(&bills, 100.0, PaymentStrategy::Balanced, now());

    assert_eq!(result.usable_amount, 70.0);
    assert_eq!(result.reserved_buffer, 30.0);
    assert_eq!(result.actions.len(), 1);
    let action = &result.actions[0];
    assert_eq!(action.action_type, ActionType::PartialPayment);
    assert_eq!(action.amount, 70.0);
    assert_eq!(action.remaining_balance, 180.0);
    assert!(result.is_crisis);
    assert!(
        result.consequences.iter().any(|c| c.contains("180.00")),
        "remaining amount should be communicated; got {:?}",
        result.consequences
    );
}

#[test]
fn crumbs_before_an_imminent_deadline_mean_get_help() {
    let bills = vec![urgent_bill("water", 90.0, 2)];
    let result = triage_payments(&bills, 10.0, PaymentStrategy::Conservative, now());

    assert_eq!(result.usable_amount, 5.0);
    let action = &result.actions[0];
    assert_eq!(action.action_type, ActionType::GetHelp);
    assert_eq!(action.amount, 0.0);
    assert_eq!(action.urgency, ActionUrgency::Immediate);
    assert_eq!(result.total_allocated, 0.0);
    assert!(result.help_resources.iter().any(|r| r.contact.contains("211")));
}

#[test]
fn crumbs_with_time_left_mean_call_the_creditor() {
    let bills = vec![urgent_bill("gas", 90.0, 6)];
    let result = triage_payments(&bills, 10.0, PaymentStrategy::Conservative, now());
    assert_eq!(result.actions[0].action_type, ActionType::CallCreditor);
    assert_eq!(result.actions[0].remaining_balance, 90.0);
}

#[test]
fn nearest_deadline_is_paid_first() {
    // Input order deliberately reversed.
    let bills = vec![urgent_bill("later", 200.0, 5), urgent_bill("sooner", 100.0, 1)];
    let result = triage_payments(&bills, 200.0, PaymentStrategy::Balanced, now());

    assert_eq!(result.usable_amount, 140.0);
    assert_eq!(result.actions[0].bill_id, "sooner");
    assert_eq!(result.actions[0].action_type, ActionType::PayNow);
    assert_eq!(result.actions[0].amount, 100.0);

    assert_eq!(result.actions[1].bill_id, "later");
    assert_eq!(result.actions[1].action_type, ActionType::PartialPayment);
    assert_eq!(result.actions[1].amount, 40.0);
    assert_eq!(result.actions[1].remaining_balance, 160.0);
    assert_eq!(result.unallocated_amount, 0.0);
}

#[test]
fn leftover_below_threshold_is_not_sent_as_a_partial() {
    let bills = vec![urgent_bill("a", 60.0, 1), urgent_bill("b", 200.0, 5)];
    let result = triage_payments(&bills, 100.0, PaymentStrategy::Balanced, now());

    // 70 usable, 60 spent, 10 left is under the $25 threshold.
    assert_eq!(result.actions[0].action_type, ActionType::PayNow);
    assert_eq!(result.actions[1].action_type, ActionType::CallCreditor);
    assert_eq!(result.total_allocated, 60.0);
    assert_eq!(result.unallocated_amount, 10.0);
}

#[test]
fn custom_threshold_allows_smaller_partials() {
    let bills = vec![urgent_bill("a", 60.0, 1), urgent_bill("b", 200.0, 5)];
    let config = TriageConfig { minimum_payment_threshold: 5.0, ..TriageConfig::default() };
    let result = triage_payments_with(&config, &bills, 100.0, PaymentStrategy::Balanced, now());
    assert_eq!(result.actions[1].action_type, ActionType::PartialPayment);
    assert_eq!(result.actions[1].amount, 10.0);
}

#[test]
fn equal_deadlines_keep_input_order() {
    let bills = vec![
        urgent_bill("first", 50.0, 3),
        urgent_bill("second", 50.0, 3),
        urgent_bill("third", 50.0, 3),
    ];
    let result = triage_payments(&bills, 1000.0, PaymentStrategy::Aggressive, now());
    let order: Vec<&str> = result.actions.iter().map(|a| a.bill_id.as_str()).collect();
    assert_eq!(order, vec!["first", "second", "third"]);
}

#[test]
fn nothing_urgent_yields_informational_result() {
    let calm = Bill::new("u1", "Phone", 60.0, now() + Duration::days(20))
        .with_type(BillType::Phone)
        .with_consequence(Consequence::shutoff(UtilityType::Phone, 30.0).in_days(25));
    let result = triage_payments(&[calm], 500.0, PaymentStrategy::Balanced, now());

    assert!(result.actions.is_empty());
    assert!(!result.is_crisis);
    assert_eq!(result.total_allocated, 0.0);
    assert_eq!(result.unallocated_amount, 350.0);
    assert_eq!(result.help_resources.len(), 1);
    assert!(!result.next_steps.is_empty());
}

#[test]
fn negative_cash_allocates_nothing() {
    let bills = vec![urgent_bill("a", 60.0, 1), urgent_bill("b", 90.0, 6)];
    let result = triage_payments(&bills, -40.0, PaymentStrategy::Aggressive, now());
    assert_eq!(result.usable_amount, 0.0);
    assert_eq!(result.total_allocated, 0.0);
    assert_eq!(result.actions[0].action_type, ActionType::GetHelp);
    assert_eq!(result.actions[1].action_type, ActionType::CallCreditor);
}

#[test]
fn paid_and_archived_bills_are_ignored() {
    let mut paid = urgent_bill("paid", 100.0, 1);
    paid.status = BillStatus::Paid;
    let mut archived = urgent_bill("archived", 100.0, 1);
    archived.archived_at = Some(now());
    let live = urgent_bill("live", 100.0, 1);

    let result = triage_payments(&[paid, archived, live], 500.0, PaymentStrategy::Balanced, now());
    assert_eq!(result.actions.len(), 1);
    assert_eq!(result.actions[0].bill_id, "live");
}

#[test]
fn critical_bill_far_from_deadline_is_still_urgent() {
    let mut bill = Bill::new("u1", "Landlord", 1200.0, now() - Duration::days(40))
        .with_id("rent")
        .with_type(BillType::Rent);
    bill.priority = Some(92.0);
    let deadline = bill_deadline(&bill, now());
    assert_eq!(deadline.tier, PriorityTier::Critical);

    let result = triage_payments(&[bill], 2000.0, PaymentStrategy::Balanced, now());
    assert_eq!(result.actions.len(), 1);
    assert_eq!(result.actions[0].action_type, ActionType::PayNow);
}

#[test]
fn help_resources_follow_unpaid_categories() {
    let rent = Bill::new("u1", "Rent", 1500.0, now() - Duration::days(3))
        .with_id("rent")
        .with_type(BillType::Rent)
        .with_consequence(Consequence::shutoff(UtilityType::Electric, 10.0).in_days(2));
    let power = urgent_bill("power", 50.0, 1);
    let result = triage_payments(&[rent, power], 100.0, PaymentStrategy::Balanced, now());

    let names: Vec<&str> = result.help_resources.iter().map(|r| r.name.as_str()).collect();
    assert!(names.iter().any(|n| n.contains("rental")), "housing help expected: {names:?}");
    assert!(!names.iter().any(|n| n.contains("LIHEAP")), "power was paid in full: {names:?}");
    assert!(names.iter().any(|n| n.contains("211")));
}

#[test]
fn strategy_parses_case_insensitively() {
    assert_eq!("Aggressive".parse::<PaymentStrategy>(), Ok(PaymentStrategy::Aggressive));
    assert_eq!(" conservative ".parse::<PaymentStrategy>(), Ok(PaymentStrategy::Conservative));
    assert!("yolo".parse::<PaymentStrategy>().is_err());
}

// ── Properties over sample households ──────────────────────────────────────

fn scored_household(seed: u64) -> Vec<Bill> {
    let scorer = PriorityScorer::new(ScoringConfig::default()).unwrap();
    let mut bills = HouseholdGenerator::new(seed).generate("u1", 12, now());
    for bill in &mut bills {
        let calc = scorer.calculate_priority(bill, now());
        apply_priority(bill, &calc);
    }
    bills
}

#[test]
fn allocation_never_exceeds_usable_cash() {
    let strategies = [
        PaymentStrategy::Conservative,
        PaymentStrategy::Balanced,
        PaymentStrategy::Aggressive,
    ];
    for seed in 0..20u64 {
        let bills = scored_household(seed);
        for strategy in strategies {
            for cash in [0.0, 18.0, 140.0, 725.5, 5000.0] {
                let result = triage_payments(&bills, cash, strategy, now());
                assert_eq!(result.usable_amount, round_cents(cash * strategy.multiplier()));
                let allocated: f64 = result.actions.iter().map(|a| a.amount).sum();
                assert!(
                    allocated <= result.usable_amount + 1e-9,
                    "seed {seed} {strategy} cash {cash}: allocated {allocated} > usable {}",
                    result.usable_amount
                );
                assert!(result.actions.iter().all(|a| a.amount >= 0.0));
            }
        }
    }
}

#[test]
fn every_urgent_bill_gets_exactly_one_action() {
    for seed in 0..20u64 {
        let bills = scored_household(seed);
        let expected: HashSet<String> = bills
            .iter()
            .filter(|b| b.is_payable())
            .filter(|b| {
                let d = bill_deadline(b, now());
                d.tier == PriorityTier::Critical || d.days_until <= URGENT_WINDOW_DAYS
            })
            .map(|b| b.bill_id.clone())
            .collect();

        let result = triage_payments(&bills, 300.0, PaymentStrategy::Balanced, now());
        let seen: Vec<&String> = result.actions.iter().map(|a| &a.bill_id).collect();
        let unique: HashSet<String> = seen.iter().map(|s| (*s).clone()).collect();

        assert_eq!(seen.len(), unique.len(), "seed {seed}: duplicate actions");
        assert_eq!(unique, expected, "seed {seed}: urgent set mismatch");
    }
}

#[test]
fn absurd_consequence_estimates_do_not_break_the_round() {
    let bills = vec![
        urgent_bill("far", 120.0, 200_000_000),
        urgent_bill("past", 60.0, i64::MIN),
        urgent_bill("power", 80.0, 4),
    ];

    let result = triage_payments(&bills, 500.0, PaymentStrategy::Aggressive, now());

    let far_deadline = bill_deadline(&bills[0], now());
    assert_eq!(far_deadline.days_until, MAX_OFFSET_DAYS);
    assert_eq!(bill_deadline(&bills[1], now()).days_until, -MAX_OFFSET_DAYS);

    let ids: Vec<&str> = result.actions.iter().map(|a| a.bill_id.as_str()).collect();
    assert_eq!(ids, vec!["past", "power"], "a century-away deadline is not urgent");
    assert!(result.actions.iter().all(|a| a.action_type == ActionType::PayNow));
}
