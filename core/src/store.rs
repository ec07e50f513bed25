//! SQLite persistence layer — the reference bill repository.
//!
//! RULE: Only store.rs talks to the database.
//! The engine talks to `BillRepository`; scoring, triage and the timeline
//! never see storage at all.
//!
//! Bills are stored whole as JSON payloads. The columns beside the payload
//! exist only to be filtered and sorted on: owner, archive flag, and the
//! zero-padded priority sort key that lists bills in descending priority.

use crate::{
    bill::Bill,
    error::{EngineError, EngineResult},
    priority::{priority_sort_key, PriorityCalculation},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// The persistence collaborator the engine depends on.
pub trait BillRepository {
    /// Insert or replace a bill, keyed by (user, bill). `at` is the write time.
    fn upsert_bill(&self, bill: &Bill, at: DateTime<Utc>) -> EngineResult<()>;

    fn get_bill(&self, user_id: &str, bill_id: &str) -> EngineResult<Option<Bill>>;

    /// Non-archived bills in insertion order.
    fn active_bills(&self, user_id: &str) -> EngineResult<Vec<Bill>>;

    /// Non-archived bills, highest priority first. Unscored bills last.
    fn bills_by_priority(&self, user_id: &str, limit: Option<usize>) -> EngineResult<Vec<Bill>>;

    /// Append a scoring result to the bill's history.
    fn record_priority(&self, user_id: &str, calc: &PriorityCalculation) -> EngineResult<()>;

    /// Store a freshly scored bill together with its history entry.
    ///
    /// History goes first, so a failed bill write never leaves a cached
    /// score without a matching history row. Stores that can should make
    /// the pair atomic.
    fn save_scored(&self, bill: &Bill, calc: &PriorityCalculation) -> EngineResult<()> {
        self.record_priority(&bill.user_id, calc)?;
        self.upsert_bill(bill, calc.calculated_at)
    }

    /// Soft delete. Returns false when the bill does not exist.
    fn archive_bill(&self, user_id: &str, bill_id: &str, at: DateTime<Utc>) -> EngineResult<bool>;
}

pub struct BillStore {
    conn: Connection,
}

impl BillStore {
    /// Open (or create) the bill database at `path`.
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only matters for real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests and the runner's dry runs).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../migrations/001_bills.sql"))?;
        Ok(())
    }

    // ── History ────────────────────────────────────────────────

    /// Every recorded calculation for a bill, oldest first.
    pub fn priority_history(
        &self,
        user_id: &str,
        bill_id: &str,
    ) -> EngineResult<Vec<PriorityCalculation>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM priority_history
             WHERE user_id = ?1 AND bill_id = ?2
             ORDER BY id ASC",
        )?;
        let payloads = stmt
            .query_map(params![user_id, bill_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str::<PriorityCalculation>(p).map_err(EngineError::from))
            .collect()
    }

    pub fn bill_count(&self, user_id: &str, include_archived: bool) -> EngineResult<i64> {
        let sql = if include_archived {
            "SELECT COUNT(*) FROM bill WHERE user_id = ?1"
        } else {
            "SELECT COUNT(*) FROM bill WHERE user_id = ?1 AND archived_at IS NULL"
        };
        let count = self.conn.query_row(sql, params![user_id], |row| row.get(0))?;
        Ok(count)
    }

    fn decode_bills(&self, sql: &str, user_id: &str, limit: i64) -> EngineResult<Vec<Bill>> {
        let mut stmt = self.conn.prepare(sql)?;
        let payloads = stmt
            .query_map(params![user_id, limit], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str::<Bill>(p).map_err(EngineError::from))
            .collect()
    }
}

fn rfc3339(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(|t| t.to_rfc3339())
}

fn write_bill(conn: &Connection, bill: &Bill, at: DateTime<Utc>) -> EngineResult<()> {
    let payload = serde_json::to_string(bill)?;
    let sort_key = bill.priority.map(priority_sort_key);
    conn.execute(
        "INSERT INTO bill (
            user_id, bill_id, name, status, current_balance, due_date,
            priority, priority_sort_key, priority_calculated_at,
            archived_at, payload, updated_at
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
        ON CONFLICT(user_id, bill_id) DO UPDATE SET
            name                   = excluded.name,
            status                 = excluded.status,
            current_balance        = excluded.current_balance,
            due_date               = excluded.due_date,
            priority               = excluded.priority,
            priority_sort_key      = excluded.priority_sort_key,
            priority_calculated_at = excluded.priority_calculated_at,
            archived_at            = excluded.archived_at,
            payload                = excluded.payload,
            updated_at             = excluded.updated_at",
        params![
            bill.user_id,
            bill.bill_id,
            bill.name,
            bill.status.as_str(),
            bill.current_balance,
            bill.due_date.to_rfc3339(),
            bill.priority,
            sort_key,
            rfc3339(bill.priority_calculated_at),
            rfc3339(bill.archived_at),
            payload,
            at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn write_history(conn: &Connection, user_id: &str, calc: &PriorityCalculation) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO priority_history (
            user_id, bill_id, final_score, sort_key, calculated_at, payload
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user_id,
            calc.bill_id,
            calc.final_score,
            calc.sort_key,
            calc.calculated_at.to_rfc3339(),
            serde_json::to_string(calc)?,
        ],
    )?;
    Ok(())
}

impl BillRepository for BillStore {
    fn upsert_bill(&self, bill: &Bill, at: DateTime<Utc>) -> EngineResult<()> {
        write_bill(&self.conn, bill, at)
    }

    fn get_bill(&self, user_id: &str, bill_id: &str) -> EngineResult<Option<Bill>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM bill WHERE user_id = ?1 AND bill_id = ?2",
                params![user_id, bill_id],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    fn active_bills(&self, user_id: &str) -> EngineResult<Vec<Bill>> {
        self.decode_bills(
            "SELECT payload FROM bill
             WHERE user_id = ?1 AND archived_at IS NULL
             ORDER BY rowid ASC LIMIT ?2",
            user_id,
            -1,
        )
    }

    fn bills_by_priority(&self, user_id: &str, limit: Option<usize>) -> EngineResult<Vec<Bill>> {
        // SQLite sorts NULL lowest, so unscored bills trail in DESC order.
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        self.decode_bills(
            "SELECT payload FROM bill
             WHERE user_id = ?1 AND archived_at IS NULL
             ORDER BY priority_sort_key DESC, bill_id ASC LIMIT ?2",
            user_id,
            limit,
        )
    }

    fn record_priority(&self, user_id: &str, calc: &PriorityCalculation) -> EngineResult<()> {
        write_history(&self.conn, user_id, calc)
    }

    /// Both rows in one transaction: either the score and its history
    /// land together or neither does.
    fn save_scored(&self, bill: &Bill, calc: &PriorityCalculation) -> EngineResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_history(&tx, &bill.user_id, calc)?;
        write_bill(&tx, bill, calc.calculated_at)?;
        tx.commit()?;
        Ok(())
    }

    fn archive_bill(&self, user_id: &str, bill_id: &str, at: DateTime<Utc>) -> EngineResult<bool> {
        let Some(mut bill) = self.get_bill(user_id, bill_id)? else {
            return Ok(false);
        };
        bill.archived_at = Some(at);
        self.upsert_bill(&bill, at)?;
        log::info!("user={user_id} bill={bill_id} store: archived");
        Ok(true)
    }
}
