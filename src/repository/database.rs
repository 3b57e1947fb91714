use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, QueryBuilder, Row, Sqlite, Transaction};
use std::str::FromStr;
use time::OffsetDateTime;
use tracing::debug;

use crate::model::{AddVersionsResult, Change, FileStat, RecordQuery, StoredRecordSummary, VersionRecord};

use super::SCHEMA_VERSION;

/// A persisted version as listed by `history`, without its content
#[derive(Debug, Clone)]
pub struct StoredVersion {
    pub id: i64,
    pub path: String,
    pub change: Option<Change>,
    pub date: OffsetDateTime,
    pub stat: Option<FileStat>,
    pub content_len: Option<i64>,
}

/// JSON shape of the `stat` column
#[derive(Debug, Serialize, Deserialize)]
struct StatColumn {
    size: u64,
    mtime: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime: Option<String>,
}

/// A version record flattened into column values
struct EncodedRecord<'a> {
    path: &'a str,
    change: Option<&'static str>,
    date: i64,
    stat: Option<String>,
    content: Option<&'a [u8]>,
}

impl<'a> EncodedRecord<'a> {
    fn encode(record: &'a VersionRecord) -> Result<Self> {
        let stat = record
            .stat
            .as_ref()
            .map(|s| {
                serde_json::to_string(&StatColumn {
                    size: s.size,
                    mtime: to_nanos(s.mtime)?,
                    mime: s.mime.clone(),
                })
                .context("Failed to encode stat")
            })
            .transpose()?;

        Ok(Self {
            path: &record.path,
            change: record.change.map(Change::as_str),
            date: to_nanos(record.date)?,
            stat,
            content: record.content.as_deref(),
        })
    }
}

fn to_nanos(at: OffsetDateTime) -> Result<i64> {
    i64::try_from(at.unix_timestamp_nanos())
        .with_context(|| format!("Timestamp out of range: {}", at))
}

fn from_nanos(nanos: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .with_context(|| format!("Invalid stored timestamp: {}", nanos))
}

fn decode_stat(json: &str) -> Result<FileStat> {
    let col: StatColumn = serde_json::from_str(json).context("Failed to decode stat")?;
    Ok(FileStat {
        size: col.size,
        mtime: from_nanos(col.mtime)?,
        mime: col.mime,
    })
}

/// Append-only SQLite version store
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Configure connection options with PRAGMAs applied to every connection
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", "-64000"); // 64MB cache

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Initialize database schema, returns true if it was created by this call.
    ///
    /// Version history is never dropped: a database written by another
    /// schema version is rejected instead.
    pub async fn init_schema(&self) -> Result<bool> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        let stored_version: Option<String> = sqlx::query("SELECT value FROM metadata WHERE key = 'schema_version'")
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("value"));

        match stored_version.as_deref() {
            Some(SCHEMA_VERSION) => return Ok(false),
            Some(other) => bail!(
                "Database uses schema version {}, expected {}",
                other,
                SCHEMA_VERSION
            ),
            None => {}
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL,
                change TEXT,
                date INTEGER NOT NULL,
                stat TEXT,
                content BLOB
            )"
        ).execute(&self.pool).await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS versions_by_path ON versions (path, id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)")
            .bind(SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;

        debug!(version = SCHEMA_VERSION, "created version store schema");
        Ok(true)
    }

    /// Get metadata value by key
    pub async fn get_metadata(&self, key: &str) -> Option<String> {
        sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
            .map(|row| row.get("value"))
    }

    /// Set metadata value
    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Look up `{path, date}` summaries matching a query, ordered by path
    pub async fn query_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecordSummary>> {
        if query.paths.as_ref().is_some_and(|p| p.is_empty()) {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT v.path, v.date FROM versions v");
        if query.newest {
            qb.push(
                " JOIN (SELECT path, MAX(id) AS id FROM versions GROUP BY path) latest \
                 ON latest.id = v.id"
            );
        }
        qb.push(" WHERE 1 = 1");
        if let Some(exists) = query.exists {
            qb.push(if exists { " AND v.change IS NULL" } else { " AND v.change IS NOT NULL" });
        }
        if let Some(paths) = &query.paths {
            qb.push(" AND v.path IN (");
            let mut list = qb.separated(", ");
            for path in paths {
                list.push_bind(path.as_str());
            }
            list.push_unseparated(")");
        }
        qb.push(" ORDER BY v.path, v.id");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| -> Result<StoredRecordSummary> {
                Ok(StoredRecordSummary {
                    path: row.get("path"),
                    date: from_nanos(row.get("date"))?,
                })
            })
            .collect()
    }

    /// Insert a single version, returning its id
    pub async fn insert_version(&self, record: &VersionRecord) -> Result<i64> {
        let enc = EncodedRecord::encode(record)?;
        let done = sqlx::query(
            "INSERT INTO versions (path, change, date, stat, content) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(enc.path)
        .bind(enc.change)
        .bind(enc.date)
        .bind(enc.stat)
        .bind(enc.content)
        .execute(&self.pool)
        .await?;
        Ok(done.last_insert_rowid())
    }

    /// Insert many versions in ONE transaction.
    ///
    /// With `only_import_new`, a record whose path, date and change kind
    /// match an existing version is ignored, which makes the call safe to
    /// repeat.
    pub async fn add_versions(
        &self,
        records: &[VersionRecord],
        only_import_new: bool,
    ) -> Result<AddVersionsResult> {
        let encoded = records
            .iter()
            .map(EncodedRecord::encode)
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self.pool.begin().await?;
        let result = if only_import_new {
            self.insert_new_in_tx(&mut tx, &encoded).await?
        } else {
            self.insert_all_in_tx(&mut tx, &encoded).await?
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn insert_new_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        records: &[EncodedRecord<'_>],
    ) -> Result<AddVersionsResult> {
        let mut result = AddVersionsResult::default();
        for rec in records {
            let done = sqlx::query(
                "INSERT INTO versions (path, change, date, stat, content) \
                 SELECT ?, ?, ?, ?, ? \
                 WHERE NOT EXISTS ( \
                    SELECT 1 FROM versions WHERE path = ? AND date = ? AND change IS ? \
                 )"
            )
            .bind(rec.path)
            .bind(rec.change)
            .bind(rec.date)
            .bind(rec.stat.as_deref())
            .bind(rec.content)
            .bind(rec.path)
            .bind(rec.date)
            .bind(rec.change)
            .execute(&mut **tx)
            .await?;

            if done.rows_affected() > 0 {
                result.inserted += 1;
            } else {
                result.ignored += 1;
            }
        }
        Ok(result)
    }

    async fn insert_all_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        records: &[EncodedRecord<'_>],
    ) -> Result<AddVersionsResult> {
        const BATCH_SIZE: usize = 500;

        for chunk in records.chunks(BATCH_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO versions (path, change, date, stat, content) "
            );
            qb.push_values(chunk, |mut row, rec| {
                row.push_bind(rec.path)
                    .push_bind(rec.change)
                    .push_bind(rec.date)
                    .push_bind(rec.stat.as_deref())
                    .push_bind(rec.content);
            });
            qb.build().execute(&mut **tx).await?;
        }

        Ok(AddVersionsResult { inserted: records.len(), ignored: 0 })
    }

    /// All versions of a path, oldest first
    pub async fn history(&self, path: &str) -> Result<Vec<StoredVersion>> {
        let rows = sqlx::query(
            "SELECT id, path, change, date, stat, length(content) AS content_len \
             FROM versions WHERE path = ? ORDER BY id"
        )
        .bind(path)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<StoredVersion> {
                let change: Option<String> = row.get("change");
                let stat: Option<String> = row.get("stat");
                Ok(StoredVersion {
                    id: row.get("id"),
                    path: row.get("path"),
                    change: change.as_deref().and_then(Change::parse),
                    date: from_nanos(row.get("date"))?,
                    stat: stat.as_deref().map(decode_stat).transpose()?,
                    content_len: row.get("content_len"),
                })
            })
            .collect()
    }

    /// Stored content of one version; None for deletions or unknown ids
    pub async fn version_content(&self, id: i64) -> Result<Option<Vec<u8>>> {
        let content: Option<Option<Vec<u8>>> =
            sqlx::query_scalar("SELECT content FROM versions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(content.flatten())
    }

    /// Total number of stored versions
    pub async fn count_versions(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM versions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
