use bill_triage_core::{
    bill::{Bill, BillStatus, BillType},
    clock::MAX_OFFSET_DAYS,
    consequence::{Consequence, ConsequenceKind, HousingLossDetails, UtilityType},
    timeline::{create_timeline, timeline_event},
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap()
}

fn bill_in(id: &str, days: i64, severity: f64, amount: f64) -> Bill {
    Bill::new("u1", format!("Bill {id}"), amount, now() - Duration::days(10))
        .with_id(id)
        .with_type(BillType::Electric)
        .with_consequence(
            Consequence::shutoff(UtilityType::Electric, severity)
                .in_days(days)
                .described(format!("Shutoff for {id}")),
        )
}

#[test]
fn events_land_in_their_buckets() {
    let bills = vec![
        bill_in("d2", 2, 80.0, 10.0),
        bill_in("d5", 5, 80.0, 20.0),
        bill_in("d10", 10, 80.0, 30.0),
        bill_in("d20", 20, 80.0, 40.0),
        bill_in("d60", 60, 80.0, 50.0),
        bill_in("d120", 120, 80.0, 60.0),
    ];
    let timeline = create_timeline(&bills, now());

    assert_eq!(timeline.urgent[0].bill_id, "d2");
    assert_eq!(timeline.this_week[0].bill_id, "d5");
    assert_eq!(timeline.next_week[0].bill_id, "d10");
    assert_eq!(timeline.this_month[0].bill_id, "d20");
    assert_eq!(timeline.later[0].bill_id, "d60");
    assert_eq!(timeline.totals.total_events, 5, "the 120-day event is past the horizon");
    assert_eq!(timeline.totals.amount_at_risk_30d, 100.0);
    assert_eq!(timeline.totals.later.amount, 50.0);
}

#[test]
fn same_day_events_put_the_most_severe_first() {
    let bills = vec![bill_in("mild", 2, 40.0, 10.0), bill_in("severe", 2, 90.0, 10.0)];
    let timeline = create_timeline(&bills, now());
    let ids: Vec<&str> = timeline.urgent.iter().map(|e| e.bill_id.as_str()).collect();
    assert_eq!(ids, vec!["severe", "mild"]);
}

#[test]
fn past_due_consequences_are_urgent() {
    let timeline = create_timeline(&[bill_in("late", -4, 70.0, 10.0)], now());
    assert_eq!(timeline.urgent.len(), 1);
    assert_eq!(timeline.urgent[0].days_until, -4);
}

#[test]
fn scheduled_court_date_beats_estimates() {
    let bill = Bill::new("u1", "Rent", 1400.0, now() - Duration::days(20))
        .with_type(BillType::Rent)
        .with_consequence(
            Consequence::new(
                ConsequenceKind::Eviction(HousingLossDetails {
                    court_date: Some(now() + Duration::days(12)),
                    ..Default::default()
                }),
                95.0,
            )
            .in_days(40),
        );
    let event = timeline_event(&bill, now());
    assert_eq!(event.days_until, 12);
    assert!(!event.estimated);
}

#[test]
fn utility_without_dates_counts_from_last_payment() {
    let mut bill = Bill::new("u1", "Water", 80.0, now() - Duration::days(15)).with_type(BillType::Water);
    bill.last_payment_date = Some(now() - Duration::days(40));
    let event = timeline_event(&bill, now());
    assert_eq!(event.days_until, 5);
    assert!(event.estimated);
    assert!(!event.description.is_empty());
}

#[test]
fn rent_without_dates_counts_from_due_date() {
    let bill = Bill::new("u1", "Rent", 1100.0, now() - Duration::days(25)).with_type(BillType::Rent);
    assert_eq!(timeline_event(&bill, now()).days_until, 5);
}

#[test]
fn credit_card_without_dates_lands_this_month() {
    let bill = Bill::new("u1", "Visa", 900.0, now() - Duration::days(60)).with_type(BillType::CreditCard);
    let timeline = create_timeline(&[bill], now());
    assert_eq!(timeline.this_month.len(), 1);
    assert_eq!(timeline.this_month[0].days_until, 30);
}

#[test]
fn keyword_inference_is_the_fallback_for_untyped_bills() {
    let bill = Bill::new("u1", "Apartment rent - March", 1000.0, now() - Duration::days(28));
    assert_eq!(timeline_event(&bill, now()).days_until, 2);
}

#[test]
fn settled_bills_are_left_off() {
    let mut paid = bill_in("paid", 2, 80.0, 10.0);
    paid.status = BillStatus::Paid;
    let mut archived = bill_in("archived", 2, 80.0, 10.0);
    archived.archived_at = Some(now());
    let mut zero = bill_in("zero", 2, 80.0, 10.0);
    zero.current_balance = 0.0;

    let timeline = create_timeline(&[paid, archived, zero], now());
    assert_eq!(timeline.totals.total_events, 0);
}

#[test]
fn absurd_consequence_estimates_are_clamped() {
    let far = bill_in("far", 200_000_000, 90.0, 40.0);
    let past = bill_in("past", i64::MIN, 90.0, 25.0);
    let timeline = create_timeline(&[far.clone(), past], now());

    assert_eq!(timeline_event(&far, now()).days_until, MAX_OFFSET_DAYS);
    assert_eq!(timeline.totals.total_events, 1, "the far event is past the horizon");
    assert_eq!(timeline.urgent[0].bill_id, "past");
    assert_eq!(timeline.urgent[0].days_until, -MAX_OFFSET_DAYS);
}

#[test]
fn dates_at_the_edge_of_the_calendar_do_not_panic() {
    let bill = Bill::new("u1", "Rent", 900.0, DateTime::<Utc>::MAX_UTC).with_type(BillType::Rent);
    let event = timeline_event(&bill, now());
    assert!(event.estimated);
    assert_eq!(event.deadline, DateTime::<Utc>::MAX_UTC);
    assert!(create_timeline(&[bill], now()).later.is_empty());
}
