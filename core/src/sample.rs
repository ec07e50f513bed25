//! Synthetic households — seeded, reproducible sets of overdue bills.
//!
//! Used by the runner's `--sample` mode and by property sweeps in tests.
//! Same seed, same `now`, same bills, down to the ids.

use crate::{
    bill::{Bill, BillType, PaymentTerms},
    consequence::{
        BorrowingImpact, CompoundingFrequency, Consequence, ConsequenceKind, CreditDamageDetails,
        HousingLossDetails, LateFeeDetails, LicenseSuspensionDetails, RepossessionDetails,
        ServiceLossDetails, SuspensionType, UtilityType,
    },
    rng::{RngBank, SampleRng, SampleStream},
    types::round_cents,
};
use chrono::{DateTime, Duration, Utc};

struct Template {
    name:         &'static str,
    bill_type:    BillType,
    balance:      (f64, f64),
    apr:          (f64, f64),
    is_essential: bool,
}

const TEMPLATES: &[Template] = &[
    Template { name: "City Electric",        bill_type: BillType::Electric,    balance: (60.0, 450.0),    apr: (0.0, 0.0),   is_essential: true },
    Template { name: "Metro Gas Service",    bill_type: BillType::Gas,         balance: (40.0, 300.0),    apr: (0.0, 0.0),   is_essential: true },
    Template { name: "County Water",         bill_type: BillType::Water,       balance: (30.0, 180.0),    apr: (0.0, 0.0),   is_essential: true },
    Template { name: "Apartment Rent",       bill_type: BillType::Rent,        balance: (700.0, 2200.0),  apr: (0.0, 0.0),   is_essential: true },
    Template { name: "Home Mortgage",        bill_type: BillType::Mortgage,    balance: (900.0, 3200.0),  apr: (3.0, 8.0),   is_essential: true },
    Template { name: "Car Loan",             bill_type: BillType::AutoLoan,    balance: (250.0, 900.0),   apr: (5.0, 22.0),  is_essential: true },
    Template { name: "Rewards Credit Card",  bill_type: BillType::CreditCard,  balance: (150.0, 6000.0),  apr: (18.0, 31.0), is_essential: false },
    Template { name: "Hospital Bill",        bill_type: BillType::Medical,     balance: (80.0, 4000.0),   apr: (0.0, 0.0),   is_essential: false },
    Template { name: "Mobile Phone",         bill_type: BillType::Phone,       balance: (40.0, 160.0),    apr: (0.0, 0.0),   is_essential: false },
    Template { name: "Home Internet",        bill_type: BillType::Internet,    balance: (50.0, 120.0),    apr: (0.0, 0.0),   is_essential: false },
    Template { name: "Auto Insurance",       bill_type: BillType::Insurance,   balance: (90.0, 300.0),    apr: (0.0, 0.0),   is_essential: true },
    Template { name: "Student Loan",         bill_type: BillType::StudentLoan, balance: (120.0, 600.0),   apr: (4.0, 9.0),   is_essential: false },
    Template { name: "Traffic Court Fine",   bill_type: BillType::Other,       balance: (100.0, 500.0),   apr: (0.0, 0.0),   is_essential: false },
];

pub struct HouseholdGenerator {
    bill_mix:     SampleRng,
    amounts:      SampleRng,
    dates:        SampleRng,
    consequences: SampleRng,
}

impl HouseholdGenerator {
    pub fn new(seed: u64) -> Self {
        let bank = RngBank::new(seed);
        Self {
            bill_mix:     bank.for_stream(SampleStream::BillMix),
            amounts:      bank.for_stream(SampleStream::Amounts),
            dates:        bank.for_stream(SampleStream::Dates),
            consequences: bank.for_stream(SampleStream::Consequences),
        }
    }

    pub fn generate(&mut self, user_id: &str, count: usize, now: DateTime<Utc>) -> Vec<Bill> {
        let bills: Vec<Bill> = (0..count).map(|i| self.generate_one(user_id, i, now)).collect();
        log::debug!("sample: generated {} bills for user={user_id}", bills.len());
        bills
    }

    fn generate_one(&mut self, user_id: &str, index: usize, now: DateTime<Utc>) -> Bill {
        let template = match self.bill_mix.pick(TEMPLATES) {
            Some(t) => t,
            None => &TEMPLATES[0],
        };

        let balance = round_cents(self.amounts.range_f64(template.balance.0, template.balance.1));
        let due_offset = self.dates.range_i64(-75, 25);
        let due_date = now + Duration::days(due_offset);

        let mut bill = Bill::new(user_id, template.name, balance, due_date)
            .with_id(format!("{user_id}-bill-{index:03}"))
            .with_type(template.bill_type);
        bill.is_essential = template.is_essential;
        bill.original_amount = round_cents(balance * self.amounts.range_f64(0.6, 1.0));
        bill.minimum_payment = round_cents((balance * 0.1).max(25.0).min(balance));
        bill.interest_rate = round_cents(self.amounts.range_f64(template.apr.0, template.apr.1 + 0.001));
        bill.payment_terms = PaymentTerms {
            grace_period_days: Some(self.dates.range_i64(0, 15)),
            late_fee_amount: Some(round_cents(self.amounts.range_f64(0.0, 40.0))),
            late_fee_percentage: None,
            is_compounding: template.apr.1 > 0.0 && self.consequences.chance(0.3),
        };
        if self.dates.chance(0.5) {
            bill.last_payment_date = Some(due_date - Duration::days(self.dates.range_i64(20, 40)));
        }
        bill.days_overdue = bill.days_overdue_at(now);
        bill.consequences = self.consequences_for(template.bill_type, due_offset, balance, now);
        bill
    }

    fn consequences_for(
        &mut self,
        bill_type: BillType,
        due_offset: i64,
        balance: f64,
        now: DateTime<Utc>,
    ) -> Vec<Consequence> {
        let rng = &mut self.consequences;
        // Overdue bills are closer to their consequence.
        let days = (rng.range_i64(1, 60) + due_offset).max(0);
        let mut out = Vec::new();

        match bill_type {
            BillType::Electric | BillType::Gas | BillType::Water => {
                let utility = match bill_type {
                    BillType::Gas => UtilityType::Gas,
                    BillType::Water => UtilityType::Water,
                    _ => UtilityType::Electric,
                };
                let mut c = Consequence::shutoff(utility, rng.range_f64(60.0, 95.0))
                    .in_days(days)
                    .with_recovery(rng.range_f64(25.0, 200.0), 0.0);
                if let ConsequenceKind::Shutoff(d) = &mut c.kind {
                    d.winter_moratorium = rng.chance(0.15);
                    d.reconnection_fee = c.recovery_cost;
                }
                out.push(c.described(format!("{utility:?} service shutoff")));
            }
            BillType::Rent | BillType::Mortgage => {
                let details = HousingLossDetails {
                    court_date: rng.chance(0.4).then(|| now + Duration::days(days)),
                    legal_fees: Some(rng.range_f64(300.0, 1500.0)),
                    moving_costs: Some(rng.range_f64(800.0, 3000.0)),
                    notice_date: None,
                };
                let (kind, label) = if bill_type == BillType::Rent {
                    (ConsequenceKind::Eviction(details), "Eviction")
                } else {
                    (ConsequenceKind::Foreclosure(details), "Foreclosure")
                };
                out.push(
                    Consequence::new(kind, rng.range_f64(85.0, 100.0))
                        .in_days(days)
                        .with_recovery(rng.range_f64(1000.0, 5000.0), rng.range_f64(6.0, 24.0))
                        .unrecoverable()
                        .described(label),
                );
            }
            BillType::AutoLoan => {
                let vehicle_value = rng.range_f64(3000.0, 20000.0);
                out.push(
                    Consequence::new(
                        ConsequenceKind::Repossession(RepossessionDetails {
                            vehicle_value: Some(vehicle_value),
                            deficiency_balance: Some(vehicle_value * rng.range_f64(0.1, 0.8)),
                            redemption_period_days: Some(rng.range_i64(10, 30)),
                        }),
                        rng.range_f64(75.0, 95.0),
                    )
                    .in_days(days)
                    .with_recovery(rng.range_f64(400.0, 1200.0), rng.range_f64(1.0, 6.0))
                    .described("Vehicle repossession"),
                );
            }
            BillType::CreditCard | BillType::StudentLoan | BillType::Medical => {
                out.push(
                    Consequence::new(
                        ConsequenceKind::CreditDamage(CreditDamageDetails {
                            estimated_score_drop: Some(rng.range_f64(20.0, 110.0)),
                            years_on_report: Some(7.0),
                            impact_on_borrowing: BorrowingImpact::Moderate,
                        }),
                        rng.range_f64(40.0, 75.0),
                    )
                    .in_days(days + 30)
                    .with_recovery(0.0, rng.range_f64(12.0, 84.0))
                    .described("Credit score damage"),
                );
                out.push(
                    Consequence::new(
                        ConsequenceKind::LateFees(LateFeeDetails {
                            late_fee_amount: Some(round_cents(rng.range_f64(15.0, 40.0))),
                            is_compounding: bill_type == BillType::CreditCard,
                            compounding_frequency: Some(CompoundingFrequency::Monthly),
                        }),
                        rng.range_f64(20.0, 45.0),
                    )
                    .in_days(days)
                    .described("Late fees"),
                );
            }
            BillType::Insurance => {
                out.push(
                    Consequence::new(
                        ConsequenceKind::LicenseSuspension(LicenseSuspensionDetails {
                            suspension_type: SuspensionType::VehicleRegistration,
                            reinstatement_fee: Some(rng.range_f64(50.0, 250.0)),
                        }),
                        rng.range_f64(50.0, 80.0),
                    )
                    .in_days(days)
                    .described("Registration suspended for lapsed insurance"),
                );
            }
            BillType::Other => {
                out.push(
                    Consequence::new(
                        ConsequenceKind::LicenseSuspension(LicenseSuspensionDetails {
                            suspension_type: SuspensionType::DriversLicense,
                            reinstatement_fee: Some(rng.range_f64(50.0, 300.0)),
                        }),
                        rng.range_f64(60.0, 90.0),
                    )
                    .in_days(days)
                    .described("Driver's license suspension"),
                );
            }
            BillType::Phone | BillType::Internet | BillType::Utility | BillType::PersonalLoan => {
                out.push(
                    Consequence::new(
                        ConsequenceKind::ServiceLoss(ServiceLossDetails {
                            service_name: Some(format!("{bill_type:?}")),
                        }),
                        rng.range_f64(25.0, 55.0),
                    )
                    .in_days(days)
                    .with_recovery((balance * 0.1).min(50.0), 0.0)
                    .described("Service suspension"),
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn same_seed_same_household() {
        let a = HouseholdGenerator::new(7).generate("u1", 12, now());
        let b = HouseholdGenerator::new(7).generate("u1", 12, now());
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = HouseholdGenerator::new(7).generate("u1", 12, now());
        let b = HouseholdGenerator::new(8).generate("u1", 12, now());
        assert_ne!(a, b);
    }

    #[test]
    fn bills_are_payable_and_typed() {
        let bills = HouseholdGenerator::new(42).generate("u1", 30, now());
        assert_eq!(bills.len(), 30);
        for bill in &bills {
            assert!(bill.is_payable(), "{} not payable", bill.bill_id);
            assert!(bill.bill_type.is_some());
            assert!(!bill.consequences.is_empty());
            assert!(bill.minimum_payment <= bill.current_balance);
        }
        assert_eq!(bills[3].bill_id, "u1-bill-003");
    }
}
