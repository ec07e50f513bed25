//! The triage engine — the façade the bill-management side talks to.
//!
//! EXECUTION ORDER (per operation):
//!   1. Read `now` once from the injected clock.
//!   2. Load the user's bills from the repository.
//!   3. Run the pure scorer / allocator / timeline against that `now`.
//!   4. Persist scores (writes only; triage and timeline are never stored).
//!
//! RULES:
//!   - Only this module touches both the repository and the pure engine code.
//!   - A bill that fails to persist does not abort a batch; it is reported.
//!   - Re-running any operation with the same clock reading gives the same
//!     scores (last write wins on concurrent recalculation).

use crate::{
    bill::{Bill, BillStatus},
    clock::{Clock, SystemClock},
    config::{EngineConfig, TriageConfig},
    error::{EngineError, EngineResult},
    priority::{apply_priority, PriorityCalculation, PriorityScorer},
    runway::{estimate_runway, CashflowSnapshot, RunwayEstimate},
    store::BillRepository,
    timeline::{create_timeline, ConsequenceTimeline},
    triage::{triage_payments_with, PaymentStrategy, TriageResult},
    types::Money,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a bulk rescoring pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecalcSummary {
    pub updated:  usize,
    /// Paid bills, left with their last score.
    pub skipped:  usize,
    /// User-facing messages, one per bill that could not be rescored.
    pub failures: Vec<String>,
}

pub struct TriageEngine<R: BillRepository> {
    repo:   R,
    scorer: PriorityScorer,
    triage: TriageConfig,
    clock:  Box<dyn Clock>,
}

impl<R: BillRepository> TriageEngine<R> {
    /// Fails on an invalid configuration; nothing is clamped.
    pub fn new(repo: R, config: EngineConfig, clock: Box<dyn Clock>) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            repo,
            scorer: PriorityScorer::new(config.scoring)?,
            triage: config.triage,
            clock,
        })
    }

    pub fn with_system_clock(repo: R, config: EngineConfig) -> EngineResult<Self> {
        Self::new(repo, config, Box::new(SystemClock))
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn scorer(&self) -> &PriorityScorer {
        &self.scorer
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Bill lifecycle ───────────────────────────────────────────────────────

    /// Score a new bill and store it with its first history entry.
    pub fn create_bill(&self, mut bill: Bill) -> EngineResult<PriorityCalculation> {
        let now = self.clock.now();
        let calc = self.score_and_store(&mut bill, now)?;
        log::info!(
            "user={} bill={} created: priority={:.1} tier={}",
            bill.user_id,
            bill.bill_id,
            calc.final_score,
            calc.tier.label()
        );
        Ok(calc)
    }

    /// Replace an existing bill and rescore it.
    pub fn update_bill(&self, mut bill: Bill) -> EngineResult<PriorityCalculation> {
        let now = self.clock.now();
        if self.repo.get_bill(&bill.user_id, &bill.bill_id)?.is_none() {
            return Err(EngineError::BillNotFound {
                user_id: bill.user_id,
                bill_id: bill.bill_id,
            });
        }
        let calc = self.score_and_store(&mut bill, now)?;
        log::info!(
            "user={} bill={} updated: priority={:.1}",
            bill.user_id,
            bill.bill_id,
            calc.final_score
        );
        Ok(calc)
    }

    /// Soft delete. History stays in the repository.
    pub fn archive_bill(&self, user_id: &str, bill_id: &str) -> EngineResult<()> {
        let now = self.clock.now();
        if self.repo.archive_bill(user_id, bill_id, now)? {
            Ok(())
        } else {
            Err(EngineError::BillNotFound {
                user_id: user_id.to_string(),
                bill_id: bill_id.to_string(),
            })
        }
    }

    fn score_and_store(&self, bill: &mut Bill, now: DateTime<Utc>) -> EngineResult<PriorityCalculation> {
        let calc = self.scorer.calculate_priority(bill, now);
        apply_priority(bill, &calc);
        self.repo.save_scored(bill, &calc)?;
        Ok(calc)
    }

    /// Rescore every active bill for a user against one `now`.
    ///
    /// Per-bill failures are collected as "unable to calculate priority for
    /// bill X" and the pass continues. Only a failure to load the bills at
    /// all is returned as an error.
    pub fn recalculate_all(&self, user_id: &str) -> EngineResult<RecalcSummary> {
        let now = self.clock.now();
        let bills = self.repo.active_bills(user_id)?;
        let mut summary = RecalcSummary::default();

        for mut bill in bills {
            if bill.status == BillStatus::Paid {
                summary.skipped += 1;
                continue;
            }
            match self.score_and_store(&mut bill, now) {
                Ok(_) => summary.updated += 1,
                Err(e) => {
                    log::warn!("user={user_id} bill={} recalculation failed: {e}", bill.bill_id);
                    summary
                        .failures
                        .push(format!("unable to calculate priority for bill {}", bill.name));
                }
            }
        }

        log::info!(
            "user={user_id} recalculated: updated={} skipped={} failed={}",
            summary.updated,
            summary.skipped,
            summary.failures.len()
        );
        Ok(summary)
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Stored bills in descending cached priority.
    pub fn bills_by_priority(&self, user_id: &str, limit: Option<usize>) -> EngineResult<Vec<Bill>> {
        self.repo.bills_by_priority(user_id, limit)
    }

    /// Active bills scored in memory against `now`. Nothing is persisted.
    fn scored_bills(&self, user_id: &str, now: DateTime<Utc>) -> EngineResult<Vec<Bill>> {
        let mut bills = self.repo.active_bills(user_id)?;
        for bill in &mut bills {
            let calc = self.scorer.calculate_priority(bill, now);
            apply_priority(bill, &calc);
        }
        Ok(bills)
    }

    /// Allocate `available` across the user's urgent bills. Falls back to
    /// the configured default strategy.
    pub fn triage(
        &self,
        user_id: &str,
        available: Money,
        strategy: Option<PaymentStrategy>,
    ) -> EngineResult<TriageResult> {
        let now = self.clock.now();
        let bills = self.scored_bills(user_id, now)?;
        let strategy = strategy.unwrap_or(self.triage.default_strategy);
        let result = triage_payments_with(&self.triage, &bills, available, strategy, now);
        log::info!(
            "user={user_id} triage: {} actions, allocated ${:.2} of ${:.2}, crisis={}",
            result.actions.len(),
            result.total_allocated,
            result.usable_amount,
            result.is_crisis
        );
        Ok(result)
    }

    pub fn timeline(&self, user_id: &str) -> EngineResult<ConsequenceTimeline> {
        let now = self.clock.now();
        let bills = self.scored_bills(user_id, now)?;
        Ok(create_timeline(&bills, now))
    }

    pub fn runway(&self, user_id: &str, snapshot: &CashflowSnapshot) -> EngineResult<RunwayEstimate> {
        let bills = self.repo.active_bills(user_id)?;
        Ok(estimate_runway(snapshot, &bills))
    }
}
