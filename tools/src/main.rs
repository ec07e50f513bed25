//! triage-runner: headless bill triage report.
//!
//! Usage:
//!   triage-runner --bills bills.json --cash 400 --strategy balanced
//!   triage-runner --sample 8 --seed 12345 --cash 250 --now 2026-03-01
//!   triage-runner --sample 8 --cash 250 --income 600 --expenses 350 --json
//!
//! Flags:
//!   --bills PATH      JSON array of bills (overrides --sample)
//!   --sample N        generate N synthetic bills (default 8)
//!   --seed S          seed for --sample (default 42)
//!   --user ID         owner of the bills (default "demo")
//!   --cash AMOUNT     cash available right now
//!   --strategy NAME   conservative | balanced | aggressive
//!   --config PATH     engine config JSON
//!   --now WHEN        RFC 3339 instant or YYYY-MM-DD (default: wall clock)
//!   --db PATH         SQLite file (default: in memory)
//!   --income / --expenses   weekly amounts for the runway estimate
//!   --json            print the report as JSON

use anyhow::{anyhow, Result};
use bill_triage_core::{
    bill::{Bill, PriorityTier},
    clock::FixedClock,
    config::EngineConfig,
    engine::{RecalcSummary, TriageEngine},
    runway::{CashflowSnapshot, RunwayEstimate},
    sample::HouseholdGenerator,
    store::BillStore,
    timeline::{ConsequenceTimeline, TimelineEvent},
    triage::{PaymentStrategy, TriageResult},
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::env;

#[derive(serde::Serialize)]
struct Report {
    user_id:  String,
    now:      DateTime<Utc>,
    recalc:   RecalcSummary,
    bills:    Vec<RankedBill>,
    triage:   TriageResult,
    timeline: ConsequenceTimeline,
    runway:   RunwayEstimate,
}

#[derive(serde::Serialize)]
struct RankedBill {
    bill_id:  String,
    name:     String,
    balance:  f64,
    priority: Option<f64>,
    tier:     Option<PriorityTier>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let sample_size = parse_arg(&args, "--sample", 8usize);
    let cash = parse_arg(&args, "--cash", 0.0f64);
    let income = parse_arg(&args, "--income", 0.0f64);
    let expenses = parse_arg(&args, "--expenses", 0.0f64);
    let json = args.iter().any(|a| a == "--json");
    let user_id = arg_value(&args, "--user").unwrap_or("demo").to_string();
    let db = arg_value(&args, "--db").unwrap_or(":memory:");

    let config = match arg_value(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let strategy = arg_value(&args, "--strategy")
        .map(|s| s.parse::<PaymentStrategy>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let now = match arg_value(&args, "--now") {
        Some(raw) => parse_now(raw)?,
        None => Utc::now(),
    };

    let bills = match arg_value(&args, "--bills") {
        Some(path) => load_bills(path)?,
        None => HouseholdGenerator::new(seed).generate(&user_id, sample_size, now),
    };

    if !json {
        println!("triage-runner: bill triage report");
        println!("  user:      {user_id}");
        println!("  now:       {}", now.format("%Y-%m-%d %H:%M UTC"));
        println!("  bills:     {}", bills.len());
        println!("  cash:      ${cash:.2}");
        println!("  db:        {db}");
        println!();
    }

    let store = if db == ":memory:" {
        BillStore::in_memory()?
    } else {
        BillStore::open(db)?
    };
    store.migrate()?;

    let engine = TriageEngine::new(store, config, Box::new(FixedClock::new(now)))?;
    for mut bill in bills {
        bill.user_id = user_id.clone();
        engine.create_bill(bill)?;
    }

    let recalc = engine.recalculate_all(&user_id)?;
    let ranked = engine.bills_by_priority(&user_id, None)?;
    let triage = engine.triage(&user_id, cash, strategy)?;
    let timeline = engine.timeline(&user_id)?;
    let runway = engine.runway(
        &user_id,
        &CashflowSnapshot {
            available_cash: cash,
            weekly_income: income,
            weekly_essential_expenses: expenses,
        },
    )?;

    let report = Report {
        user_id,
        now,
        recalc,
        bills: ranked.iter().map(ranked_bill).collect(),
        triage,
        timeline,
        runway,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn ranked_bill(bill: &Bill) -> RankedBill {
    RankedBill {
        bill_id: bill.bill_id.clone(),
        name: bill.name.clone(),
        balance: bill.amount_due(),
        priority: bill.priority,
        tier: bill.priority_tier(),
    }
}

fn print_report(report: &Report) {
    println!("=== PRIORITIES ===");
    for (rank, bill) in report.bills.iter().enumerate() {
        let tier = bill.tier.map(|t| t.label()).unwrap_or("UNSCORED");
        println!(
            "  {:>2}. {:<28} ${:>9.2}  {:>5.1}  {tier}",
            rank + 1,
            bill.name,
            bill.balance,
            bill.priority.unwrap_or(0.0)
        );
    }
    for failure in &report.recalc.failures {
        println!("  ! {failure}");
    }

    let triage = &report.triage;
    println!();
    println!("=== TRIAGE ({}) ===", triage.strategy);
    println!("  available:   ${:.2}", triage.available_amount);
    println!("  usable:      ${:.2}", triage.usable_amount);
    println!("  reserved:    ${:.2}", triage.reserved_buffer);
    println!("  allocated:   ${:.2}", triage.total_allocated);
    println!("  crisis:      {}", if triage.is_crisis { "yes" } else { "no" });
    for action in &triage.actions {
        println!(
            "  {:<16} {:<28} ${:>9.2}  (owes ${:.2} after, {} days)",
            action.action_type.as_str(),
            action.bill_name,
            action.amount,
            action.remaining_balance,
            action.days_until
        );
        println!("      {}", action.instructions);
    }
    if !triage.consequences.is_empty() {
        println!("  Unpaid consequences:");
        for c in &triage.consequences {
            println!("    - {c}");
        }
    }
    if !triage.help_resources.is_empty() {
        println!("  Help:");
        for r in &triage.help_resources {
            println!("    - {}: {}", r.name, r.contact);
        }
    }
    for step in &triage.next_steps {
        println!("  > {step}");
    }

    let timeline = &report.timeline;
    println!();
    println!("=== CONSEQUENCE TIMELINE ===");
    print_bucket("Urgent (≤3 days)", &timeline.urgent);
    print_bucket("This week", &timeline.this_week);
    print_bucket("Next week", &timeline.next_week);
    print_bucket("This month", &timeline.this_month);
    print_bucket("Later (≤90 days)", &timeline.later);
    println!("  at risk in 30 days: ${:.2}", timeline.totals.amount_at_risk_30d);

    let runway = &report.runway;
    println!();
    println!("=== RUNWAY ===");
    println!("  weekly net:        ${:.2}", runway.weekly_net);
    match runway.weeks_to_zero {
        Some(weeks) => println!("  weeks to zero:     {weeks:.1}"),
        None => println!("  weeks to zero:     not shrinking"),
    }
    println!("  monthly minimums:  ${:.2}", runway.monthly_minimum_payments);
    println!("  outstanding:       ${:.2}", runway.total_outstanding);
    println!("  debt-to-income:    {:.1}%", runway.debt_to_income_ratio);
}

fn print_bucket(label: &str, events: &[TimelineEvent]) {
    if events.is_empty() {
        return;
    }
    println!("  {label}:");
    for e in events {
        let marker = if e.estimated { "~" } else { " " };
        println!(
            "    {marker}{:>3}d  {:<28} {}  (${:.2})",
            e.days_until, e.bill_name, e.description, e.amount
        );
    }
}

fn load_bills(path: &str) -> Result<Vec<Bill>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read {path}: {e}"))?;
    let bills: Vec<Bill> = serde_json::from_str(&content)
        .map_err(|e| anyhow!("Cannot parse {path}: {e}"))?;
    log::info!("runner: loaded {} bills from {path}", bills.len());
    Ok(bills)
}

/// RFC 3339, or a bare date taken as noon UTC.
fn parse_now(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| anyhow!("Cannot parse --now {raw}: {e}"))?;
    let noon = date
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| anyhow!("Cannot parse --now {raw}"))?;
    Ok(Utc.from_utc_datetime(&noon))
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
