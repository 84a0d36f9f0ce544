//! Spendgate Ledger - Append-only decision log for agent payments
//!
//! The ledger is:
//! - Append-only (records are never updated or deleted)
//! - Verdict-inclusive (denials are recorded for audit, not discarded)
//! - The sole source of truth for rolling-window budget checks
//!
//! # Invariants
//!
//! 1. Every evaluated transaction produces exactly one record
//! 2. `spend_in_window` reflects every `record` call that completed before
//!    it was invoked (read-after-write on a single store instance)
//! 3. Only allowed records count toward window spend
//!
//! The connection pool is capped at a single connection, which serializes
//! every write ahead of subsequent reads. The same cap keeps `:memory:`
//! stores coherent; each SQLite connection would otherwise get its own
//! private database.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use spendgate_policy::SpendQuery;
use spendgate_types::{Decision, LedgerRecord, LedgerStats, RecordFilters, Transaction, Verdict};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

/// Errors that can occur in ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt ledger record {id}: {message}")]
    Corrupt { id: i64, message: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// The Spendgate transaction ledger.
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Open (or create) a file-backed ledger at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        Self::connect(options).await
    }

    /// Open an in-memory ledger, gone when the handle is dropped.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let ledger = Self { pool };
        ledger.migrate().await?;
        Ok(ledger)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id TEXT NOT NULL,
                resource_url TEXT NOT NULL,
                amount REAL NOT NULL,
                currency TEXT NOT NULL,
                scheme TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                decision TEXT NOT NULL,
                reason TEXT NOT NULL,
                matched_policy TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_agent_timestamp
             ON transactions(agent_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append one immutable record for an evaluated transaction, stamping
    /// the write-time epoch-millisecond timestamp. Returns the assigned id.
    pub async fn record(&self, tx: &Transaction, verdict: &Verdict) -> Result<i64> {
        self.record_at(tx, verdict, Utc::now().timestamp_millis()).await
    }

    /// Append a record with an explicit timestamp (imports, backdating in
    /// tests). `record` is the write-time-stamped form used on the hot path.
    pub async fn record_at(
        &self,
        tx: &Transaction,
        verdict: &Verdict,
        timestamp_ms: i64,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO transactions
             (agent_id, resource_url, amount, currency, scheme, timestamp,
              decision, reason, matched_policy)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&tx.agent_id)
        .bind(&tx.resource_url)
        .bind(tx.amount)
        .bind(&tx.currency)
        .bind(&tx.scheme)
        .bind(timestamp_ms)
        .bind(verdict.decision.as_str())
        .bind(&verdict.reason)
        .bind(&verdict.matched_policy)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Total approved spend for an agent within the trailing window.
    ///
    /// Denied records never count. Returns `0.0` for an agent with no
    /// matching history.
    pub async fn spend_in_window(&self, agent_id: &str, window_ms: i64) -> Result<f64> {
        let cutoff = Utc::now().timestamp_millis() - window_ms;
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount), 0.0) AS total FROM transactions
             WHERE agent_id = ? AND timestamp >= ? AND decision = 'allow'",
        )
        .bind(agent_id)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("total")?)
    }

    /// Query records, newest first. `since` is an inclusive lower bound on
    /// the record timestamp; an absent filter imposes no constraint.
    pub async fn transactions(&self, filters: &RecordFilters) -> Result<Vec<LedgerRecord>> {
        let mut sql = String::from(
            "SELECT id, agent_id, resource_url, amount, currency, scheme,
                    timestamp, decision, reason, matched_policy
             FROM transactions WHERE 1=1",
        );
        if filters.agent_id.is_some() {
            sql.push_str(" AND agent_id = ?");
        }
        if filters.since.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC");
        if filters.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(agent_id) = &filters.agent_id {
            query = query.bind(agent_id);
        }
        if let Some(since) = filters.since {
            query = query.bind(since);
        }
        if let Some(limit) = filters.limit {
            query = query.bind(limit as i64);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Aggregate readout: record count, total volume across both verdicts,
    /// and distinct-agent count.
    pub async fn stats(&self) -> Result<LedgerStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count,
                    COALESCE(SUM(amount), 0.0) AS total_volume,
                    COUNT(DISTINCT agent_id) AS agents
             FROM transactions",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(LedgerStats {
            count: row.try_get("count")?,
            total_volume: row.try_get("total_volume")?,
            agents: row.try_get("agents")?,
        })
    }
}

fn row_to_record(row: &SqliteRow) -> Result<LedgerRecord> {
    let id: i64 = row.try_get("id")?;
    let decision: String = row.try_get("decision")?;
    let decision = match decision.as_str() {
        "allow" => Decision::Allow,
        "deny" => Decision::Deny,
        other => {
            return Err(LedgerError::Corrupt {
                id,
                message: format!("unknown decision {other:?}"),
            })
        }
    };
    Ok(LedgerRecord {
        id,
        agent_id: row.try_get("agent_id")?,
        resource_url: row.try_get("resource_url")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        scheme: row.try_get("scheme")?,
        timestamp: row.try_get("timestamp")?,
        decision,
        reason: row.try_get("reason")?,
        matched_policy: row.try_get("matched_policy")?,
    })
}

#[async_trait]
impl SpendQuery for Ledger {
    async fn spend_in_window(&self, agent_id: &str, window_ms: i64) -> spendgate_policy::Result<f64> {
        Ledger::spend_in_window(self, agent_id, window_ms)
            .await
            .map_err(|e| spendgate_policy::PolicyError::SpendQuery(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tx(agent_id: &str, amount: f64) -> Transaction {
        Transaction {
            agent_id: agent_id.to_string(),
            resource_url: "https://api.example.com/data".to_string(),
            amount,
            currency: "USDC".to_string(),
            scheme: "exact".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn allowed() -> Verdict {
        Verdict::allow("transaction within policy limits", "default")
    }

    fn denied() -> Verdict {
        Verdict::deny("amount exceeds per-transaction limit (100 > 5)", "default")
    }

    #[tokio::test]
    async fn records_and_retrieves() {
        let ledger = Ledger::in_memory().await.unwrap();
        ledger.record(&test_tx("bot-1", 2.5), &allowed()).await.unwrap();

        let records = ledger.transactions(&RecordFilters::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_id, "bot-1");
        assert_eq!(records[0].amount, 2.5);
        assert_eq!(records[0].decision, Decision::Allow);
    }

    #[tokio::test]
    async fn assigns_monotonic_ids() {
        let ledger = Ledger::in_memory().await.unwrap();
        let first = ledger.record(&test_tx("bot-1", 1.0), &allowed()).await.unwrap();
        let second = ledger.record(&test_tx("bot-1", 1.0), &allowed()).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn filters_by_agent() {
        let ledger = Ledger::in_memory().await.unwrap();
        ledger.record(&test_tx("bot-1", 2.5), &allowed()).await.unwrap();
        ledger.record(&test_tx("bot-2", 1.0), &allowed()).await.unwrap();

        let records = ledger.transactions(&RecordFilters::for_agent("bot-1")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_id, "bot-1");
    }

    #[tokio::test]
    async fn filters_by_since_inclusive() {
        let ledger = Ledger::in_memory().await.unwrap();
        let now = Utc::now().timestamp_millis();
        ledger.record_at(&test_tx("bot-1", 1.0), &allowed(), now - 100_000).await.unwrap();
        ledger.record_at(&test_tx("bot-1", 2.0), &allowed(), now).await.unwrap();

        let filters = RecordFilters {
            since: Some(now - 1_000),
            ..RecordFilters::default()
        };
        let records = ledger.transactions(&filters).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 2.0);

        // The bound is inclusive: a record exactly at `since` is returned.
        let filters = RecordFilters {
            since: Some(now),
            ..RecordFilters::default()
        };
        assert_eq!(ledger.transactions(&filters).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn respects_limit_and_orders_newest_first() {
        let ledger = Ledger::in_memory().await.unwrap();
        let now = Utc::now().timestamp_millis();
        for i in 0..5 {
            ledger
                .record_at(&test_tx("bot-1", i as f64), &allowed(), now + i)
                .await
                .unwrap();
        }

        let filters = RecordFilters {
            limit: Some(3),
            ..RecordFilters::default()
        };
        let records = ledger.transactions(&filters).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(records[0].amount, 4.0);
    }

    #[tokio::test]
    async fn window_sum_excludes_denied_and_stale_records() {
        let ledger = Ledger::in_memory().await.unwrap();
        let now = Utc::now().timestamp_millis();

        ledger.record_at(&test_tx("bot-1", 5.0), &allowed(), now - 1_000).await.unwrap();
        ledger.record_at(&test_tx("bot-1", 3.0), &allowed(), now - 2_000).await.unwrap();
        ledger.record_at(&test_tx("bot-1", 2.0), &allowed(), now - 3_000).await.unwrap();
        // Denied: never counts.
        ledger.record_at(&test_tx("bot-1", 100.0), &denied(), now - 500).await.unwrap();
        // Allowed but outside the one-minute window.
        ledger.record_at(&test_tx("bot-1", 50.0), &allowed(), now - 200_000).await.unwrap();

        let spend = ledger.spend_in_window("bot-1", 60_000).await.unwrap();
        assert_eq!(spend, 10.0);
    }

    #[tokio::test]
    async fn empty_window_sums_to_zero() {
        let ledger = Ledger::in_memory().await.unwrap();
        let spend = ledger.spend_in_window("nonexistent", 60_000).await.unwrap();
        assert_eq!(spend, 0.0);
    }

    #[tokio::test]
    async fn spend_reflects_completed_writes() {
        let ledger = Ledger::in_memory().await.unwrap();
        ledger.record(&test_tx("bot-1", 4.0), &allowed()).await.unwrap();
        assert_eq!(ledger.spend_in_window("bot-1", 60_000).await.unwrap(), 4.0);

        ledger.record(&test_tx("bot-1", 1.5), &allowed()).await.unwrap();
        assert_eq!(ledger.spend_in_window("bot-1", 60_000).await.unwrap(), 5.5);
    }

    #[tokio::test]
    async fn stats_cover_both_verdicts() {
        let ledger = Ledger::in_memory().await.unwrap();
        ledger.record(&test_tx("bot-1", 2.5), &allowed()).await.unwrap();
        ledger.record(&test_tx("bot-2", 7.5), &denied()).await.unwrap();

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_volume, 10.0);
        assert_eq!(stats.agents, 2);
    }

    #[tokio::test]
    async fn implements_the_spend_query_capability() {
        let ledger = Ledger::in_memory().await.unwrap();
        ledger.record(&test_tx("bot-1", 3.0), &allowed()).await.unwrap();

        let spend_query: &dyn SpendQuery = &ledger;
        let spend = spend_query.spend_in_window("bot-1", 60_000).await.unwrap();
        assert_eq!(spend, 3.0);
    }
}
