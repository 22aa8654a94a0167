//! Ledger store trait and the SQLite implementation.

use crate::error::{LedgerError, LedgerResult};
use crate::models::{CandidateCounts, CandidateRow};
use crate::repos::candidates::SEED_BATCH_SIZE;
use crate::repos::{CandidateRepo, DiscoveryRepo};
use async_trait::async_trait;
use backfill_core::NewCandidate;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;

const SCHEMA_SQL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS candidate (
        id INTEGER PRIMARY KEY,
        source_cid TEXT NOT NULL,
        user_id TEXT NOT NULL,
        checked_at TEXT,
        applied_at TEXT,
        CHECK (applied_at IS NULL OR checked_at IS NOT NULL)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS url (
        candidate_id INTEGER NOT NULL REFERENCES candidate(id),
        url TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_url_candidate ON url(candidate_id)",
    "CREATE INDEX IF NOT EXISTS idx_candidate_checked ON candidate(checked_at)",
];

/// Combined ledger trait.
#[async_trait]
pub trait LedgerStore: CandidateRepo + DiscoveryRepo + Send + Sync {
    /// Create the schema if absent. Safe to run against an existing ledger.
    async fn migrate(&self) -> LedgerResult<()>;

    /// Check the ledger file is readable.
    async fn health_check(&self) -> LedgerResult<()>;
}

/// File-backed SQLite ledger.
///
/// Uses a rollback journal rather than WAL so the ledger is one
/// self-contained file that can be copied between machines.
pub struct SqliteLedger {
    pool: Pool<Sqlite>,
    path: PathBuf,
}

impl SqliteLedger {
    /// Open or create the ledger at `path`, creating the schema if needed.
    pub async fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .synchronous(SqliteSynchronous::Full)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // One connection: the ledger has a single writer and reads must see
        // that writer's commits immediately.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let ledger = Self { pool, path };
        ledger.migrate().await?;

        tracing::debug!(path = %ledger.path.display(), "Ledger opened");
        Ok(ledger)
    }

    /// Path the ledger was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Release the ledger file. Pending writes are already durable.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!(path = %self.path.display(), "Ledger closed");
    }
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn migrate(&self) -> LedgerResult<()> {
        for statement in SCHEMA_SQL {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> LedgerResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CandidateRepo for SqliteLedger {
    async fn add_candidates(&self, candidates: &[NewCandidate]) -> LedgerResult<()> {
        if candidates.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for batch in candidates.chunks(SEED_BATCH_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO candidate (id, source_cid, user_id) ");
            builder.push_values(batch, |mut row, candidate| {
                row.push_bind(candidate.id)
                    .push_bind(candidate.source_cid.as_str())
                    .push_bind(candidate.user_id.as_str());
            });

            builder.build().execute(&mut *tx).await.map_err(|e| {
                LedgerError::from_insert(e, || {
                    let first = batch.first().map(|c| c.id).unwrap_or_default();
                    format!("candidate batch starting at id {first} already seeded")
                })
            })?;
        }

        tx.commit().await?;
        tracing::debug!(count = candidates.len(), "Seeded candidates");
        Ok(())
    }

    async fn get_unchecked_candidates(&self) -> LedgerResult<Vec<CandidateRow>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            "SELECT id, source_cid, user_id, checked_at, applied_at
             FROM candidate WHERE checked_at IS NULL",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_backfillable(&self, limit: u32) -> LedgerResult<Vec<CandidateRow>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            "SELECT id, source_cid, user_id, checked_at, applied_at
             FROM candidate
             WHERE checked_at IS NOT NULL AND applied_at IS NULL
             ORDER BY id
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_candidate(&self, candidate_id: i64) -> LedgerResult<Option<CandidateRow>> {
        let row = sqlx::query_as::<_, CandidateRow>(
            "SELECT id, source_cid, user_id, checked_at, applied_at
             FROM candidate WHERE id = ?",
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn mark_applied(&self, candidate_id: i64, at: OffsetDateTime) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE candidate SET applied_at = ?
             WHERE id = ? AND checked_at IS NOT NULL AND applied_at IS NULL",
        )
        .bind(at)
        .bind(candidate_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.get_candidate(candidate_id).await? {
            None => Err(LedgerError::NotFound(format!("candidate {candidate_id}"))),
            Some(row) if !row.is_checked() => Err(LedgerError::InvalidState(format!(
                "candidate {candidate_id} cannot be applied before discovery"
            ))),
            // Already applied.
            Some(_) => Ok(()),
        }
    }

    async fn get_counts(&self) -> LedgerResult<CandidateCounts> {
        let counts = sqlx::query_as::<_, CandidateCounts>(
            "SELECT COUNT(*) AS total,
                    COUNT(checked_at) AS checked,
                    COUNT(applied_at) AS applied
             FROM candidate",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }
}

#[async_trait]
impl DiscoveryRepo for SqliteLedger {
    async fn record_discovery(
        &self,
        candidate_id: i64,
        urls: &[String],
        at: OffsetDateTime,
    ) -> LedgerResult<()> {
        // Dropping `tx` on any early return rolls back.
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE candidate SET checked_at = ? WHERE id = ? AND checked_at IS NULL",
        )
        .bind(at)
        .bind(candidate_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM candidate WHERE id = ?)")
                    .bind(candidate_id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                LedgerError::Conflict(format!("candidate {candidate_id} already discovered"))
            } else {
                LedgerError::NotFound(format!("candidate {candidate_id}"))
            });
        }

        for batch in urls.chunks(SEED_BATCH_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO url (candidate_id, url) ");
            builder.push_values(batch, |mut row, url| {
                row.push_bind(candidate_id).push_bind(url.as_str());
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_discovered_urls(&self, candidate_id: i64) -> LedgerResult<Vec<String>> {
        let urls = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT url FROM url WHERE candidate_id = ? ORDER BY url",
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(urls)
    }
}
