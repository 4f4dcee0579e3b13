//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. All timestamps are written
//! as RFC 3339 with fixed microsecond precision so that string comparison
//! in SQL matches chronological order.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::qualify::types::Criteria;
use crate::store::migrations;
use crate::store::traits::{Buyer, Database, SavedSearch};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn select_buyer(&self, phone: &str) -> Result<Option<Buyer>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, phone, phone_verified, created_at FROM buyers WHERE phone = ?1",
                params![phone],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to query buyer: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read buyer row: {e}")))?;

        match row {
            Some(row) => Ok(Some(row_to_buyer(&row)?)),
            None => Ok(None),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical timestamp format for storage (fixed width, Z suffix).
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 datetime string from the database.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Serialization(format!("Invalid UUID '{s}': {e}")))
}

fn row_to_buyer(row: &libsql::Row) -> Result<Buyer, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("Failed to read buyer id: {e}")))?;
    let phone: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("Failed to read buyer phone: {e}")))?;
    let verified: i64 = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("Failed to read buyer verified flag: {e}")))?;
    let created_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("Failed to read buyer created_at: {e}")))?;

    Ok(Buyer {
        id: parse_uuid(&id_str)?,
        phone,
        phone_verified: verified != 0,
        created_at: parse_datetime(&created_str),
    })
}

/// Column order: 0:id, 1:buyer_id, 2:criteria, 3:version, 4:created_at
fn row_to_saved_search(row: &libsql::Row) -> Result<SavedSearch, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("Failed to read search id: {e}")))?;
    let buyer_str: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("Failed to read search buyer_id: {e}")))?;
    let criteria_json: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("Failed to read search criteria: {e}")))?;
    let version: i64 = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("Failed to read search version: {e}")))?;
    let created_str: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("Failed to read search created_at: {e}")))?;

    let criteria: Criteria = serde_json::from_str(&criteria_json)
        .map_err(|e| DatabaseError::Serialization(format!("Invalid criteria JSON: {e}")))?;

    Ok(SavedSearch {
        id: parse_uuid(&id_str)?,
        buyer_id: parse_uuid(&buyer_str)?,
        criteria,
        version,
        created_at: parse_datetime(&created_str),
    })
}

fn criteria_to_json(criteria: &Criteria) -> Result<String, DatabaseError> {
    serde_json::to_string(criteria)
        .map_err(|e| DatabaseError::Serialization(format!("Failed to encode criteria: {e}")))
}

// ── Database trait ──────────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn upsert_buyer(&self, phone: &str) -> Result<Buyer, DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO buyers (id, phone, phone_verified, created_at)
                 VALUES (?1, ?2, 0, ?3)
                 ON CONFLICT(phone) DO NOTHING",
                params![Uuid::new_v4().to_string(), phone, format_ts(Utc::now())],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to upsert buyer: {e}")))?;

        self.select_buyer(phone).await?.ok_or(DatabaseError::NotFound {
            entity: "buyer".into(),
            key: phone.into(),
        })
    }

    async fn mark_phone_verified(&self, phone: &str) -> Result<Buyer, DatabaseError> {
        self.upsert_buyer(phone).await?;

        self.conn()
            .execute(
                "UPDATE buyers SET phone_verified = 1 WHERE phone = ?1",
                params![phone],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to mark buyer verified: {e}")))?;

        self.select_buyer(phone).await?.ok_or(DatabaseError::NotFound {
            entity: "buyer".into(),
            key: phone.into(),
        })
    }

    async fn get_buyer_by_phone(&self, phone: &str) -> Result<Option<Buyer>, DatabaseError> {
        self.select_buyer(phone).await
    }

    async fn insert_otp(
        &self,
        phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO otp_codes (id, phone, code, expires_at, used, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    phone,
                    code,
                    format_ts(expires_at),
                    format_ts(Utc::now())
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert OTP code: {e}")))?;
        Ok(())
    }

    async fn consume_otp(
        &self,
        phone: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        // Single statement so the select-newest and mark-used steps cannot
        // interleave with a concurrent caller: exactly one row transitions.
        let changed = self
            .conn()
            .execute(
                "UPDATE otp_codes SET used = 1
                 WHERE id = (
                     SELECT id FROM otp_codes
                     WHERE phone = ?1 AND code = ?2 AND used = 0 AND expires_at > ?3
                     ORDER BY expires_at DESC
                     LIMIT 1
                 )
                 AND used = 0",
                params![phone, code, format_ts(now)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to consume OTP code: {e}")))?;

        Ok(changed == 1)
    }

    async fn get_saved_search(
        &self,
        buyer_id: Uuid,
    ) -> Result<Option<SavedSearch>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, buyer_id, criteria, version, created_at
                 FROM saved_searches
                 WHERE buyer_id = ?1
                 ORDER BY created_at ASC
                 LIMIT 1",
                params![buyer_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to query saved search: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read saved search row: {e}")))?;

        match row {
            Some(row) => Ok(Some(row_to_saved_search(&row)?)),
            None => Ok(None),
        }
    }

    async fn try_create_saved_search(
        &self,
        buyer_id: Uuid,
        criteria: &Criteria,
    ) -> Result<Option<SavedSearch>, DatabaseError> {
        let changed = self
            .conn()
            .execute(
                "INSERT INTO saved_searches (id, buyer_id, criteria, version, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)
                 ON CONFLICT(buyer_id) DO NOTHING",
                params![
                    Uuid::new_v4().to_string(),
                    buyer_id.to_string(),
                    criteria_to_json(criteria)?,
                    format_ts(Utc::now())
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to create saved search: {e}")))?;

        if changed == 0 {
            // Lost the creation race (or one already existed).
            return Ok(None);
        }

        self.get_saved_search(buyer_id).await
    }

    async fn update_saved_search(
        &self,
        id: Uuid,
        criteria: &Criteria,
        expected_version: i64,
    ) -> Result<bool, DatabaseError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE saved_searches SET criteria = ?1, version = version + 1
                 WHERE id = ?2 AND version = ?3",
                params![criteria_to_json(criteria)?, id.to_string(), expected_version],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to update saved search: {e}")))?;

        Ok(changed == 1)
    }

    async fn count_saved_searches(&self) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM saved_searches", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to count saved searches: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read count row: {e}")))?;

        match row {
            Some(row) => row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("Failed to parse count: {e}"))),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn backend() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn local_file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.upsert_buyer("+13185551234").await.unwrap();
        }

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let buyer = db.get_buyer_by_phone("+13185551234").await.unwrap();
        assert!(buyer.is_some());
    }

    #[tokio::test]
    async fn upsert_buyer_is_idempotent() {
        let db = backend().await;
        let first = db.upsert_buyer("+13185551234").await.unwrap();
        let second = db.upsert_buyer("+13185551234").await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(!second.phone_verified);
    }

    #[tokio::test]
    async fn mark_phone_verified_creates_and_flags() {
        let db = backend().await;
        let buyer = db.mark_phone_verified("+13185550000").await.unwrap();
        assert!(buyer.phone_verified);

        // Upserting again must not clear the flag.
        let again = db.upsert_buyer("+13185550000").await.unwrap();
        assert!(again.phone_verified);
        assert_eq!(again.id, buyer.id);
    }

    #[tokio::test]
    async fn consume_otp_requires_exact_unused_unexpired_match() {
        let db = backend().await;
        let future = Utc::now() + Duration::minutes(10);
        db.insert_otp("+13185551234", "123456", future).await.unwrap();

        // Wrong code
        assert!(!db.consume_otp("+13185551234", "654321", Utc::now()).await.unwrap());
        // Wrong phone
        assert!(!db.consume_otp("+13185559999", "123456", Utc::now()).await.unwrap());
        // Exact match succeeds once
        assert!(db.consume_otp("+13185551234", "123456", Utc::now()).await.unwrap());
        // Already used
        assert!(!db.consume_otp("+13185551234", "123456", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn expired_codes_are_rejected() {
        let db = backend().await;
        let past = Utc::now() - Duration::minutes(1);
        db.insert_otp("+13185551234", "123456", past).await.unwrap();
        assert!(!db.consume_otp("+13185551234", "123456", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn multiple_outstanding_codes_are_independently_valid() {
        let db = backend().await;
        let future = Utc::now() + Duration::minutes(10);
        db.insert_otp("+13185551234", "111111", future).await.unwrap();
        db.insert_otp("+13185551234", "222222", future + Duration::minutes(1))
            .await
            .unwrap();

        assert!(db.consume_otp("+13185551234", "111111", Utc::now()).await.unwrap());
        assert!(db.consume_otp("+13185551234", "222222", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn saved_search_round_trip() {
        let db = backend().await;
        let buyer_id = Uuid::new_v4();
        assert!(db.get_saved_search(buyer_id).await.unwrap().is_none());

        let criteria = Criteria {
            beds_min: Some(3),
            ..Default::default()
        };
        let created = db
            .try_create_saved_search(buyer_id, &criteria)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.criteria, criteria);
        assert_eq!(created.version, 0);

        let fetched = db.get_saved_search(buyer_id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.criteria, criteria);
    }

    #[tokio::test]
    async fn second_create_for_same_buyer_returns_none() {
        let db = backend().await;
        let buyer_id = Uuid::new_v4();
        let criteria = Criteria::default();

        assert!(db.try_create_saved_search(buyer_id, &criteria).await.unwrap().is_some());
        assert!(db.try_create_saved_search(buyer_id, &criteria).await.unwrap().is_none());
        assert_eq!(db.count_saved_searches().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stale_version_update_is_rejected() {
        let db = backend().await;
        let buyer_id = Uuid::new_v4();
        let search = db
            .try_create_saved_search(buyer_id, &Criteria::default())
            .await
            .unwrap()
            .unwrap();

        let update = Criteria {
            price_max: Some(450_000),
            ..Default::default()
        };
        assert!(db.update_saved_search(search.id, &update, 0).await.unwrap());
        // Same expected version again — stale, must be rejected.
        assert!(!db.update_saved_search(search.id, &update, 0).await.unwrap());

        let fetched = db.get_saved_search(buyer_id).await.unwrap().unwrap();
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.criteria.price_max, Some(450_000));
    }
}
