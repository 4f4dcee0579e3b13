//! Backend-agnostic `Database` trait — single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::qualify::types::Criteria;

/// A buyer, identified uniquely by phone number.
#[derive(Debug, Clone)]
pub struct Buyer {
    pub id: Uuid,
    pub phone: String,
    pub phone_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// A buyer's persistent saved search.
#[derive(Debug, Clone)]
pub struct SavedSearch {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub criteria: Criteria,
    /// Optimistic-concurrency version; bumped on every criteria write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic database trait covering buyers, OTP codes, and saved searches.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Buyers ──────────────────────────────────────────────────────

    /// Insert a buyer for `phone` if none exists, then return the row.
    /// An existing buyer is returned unchanged, never duplicated.
    async fn upsert_buyer(&self, phone: &str) -> Result<Buyer, DatabaseError>;

    /// Upsert the buyer for `phone` and set its verified flag true.
    async fn mark_phone_verified(&self, phone: &str) -> Result<Buyer, DatabaseError>;

    /// Look up a buyer by phone.
    async fn get_buyer_by_phone(&self, phone: &str) -> Result<Option<Buyer>, DatabaseError>;

    // ── OTP codes ───────────────────────────────────────────────────

    /// Store a newly issued code. Multiple outstanding codes per phone
    /// are permitted; each is independently valid until used or expired.
    async fn insert_otp(
        &self,
        phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Atomically consume the most recently issued unused, unexpired code
    /// exactly matching `phone` and `code` (expiry-descending order, exact
    /// string match). Returns true iff exactly one record transitioned to
    /// used; a concurrent caller presenting the same code loses the race.
    async fn consume_otp(
        &self,
        phone: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    // ── Saved searches ──────────────────────────────────────────────

    /// Get the buyer's earliest-created saved search, if any.
    async fn get_saved_search(&self, buyer_id: Uuid)
    -> Result<Option<SavedSearch>, DatabaseError>;

    /// Create a saved search for the buyer. Returns `None` if one already
    /// exists (at most one per buyer, enforced by a uniqueness constraint).
    async fn try_create_saved_search(
        &self,
        buyer_id: Uuid,
        criteria: &Criteria,
    ) -> Result<Option<SavedSearch>, DatabaseError>;

    /// Write merged criteria back onto an existing saved search, guarded by
    /// an optimistic version check. Returns false when the stored version no
    /// longer matches `expected_version` (caller re-reads and retries).
    async fn update_saved_search(
        &self,
        id: Uuid,
        criteria: &Criteria,
        expected_version: i64,
    ) -> Result<bool, DatabaseError>;

    /// Total number of saved searches (used by the match sweep).
    async fn count_saved_searches(&self) -> Result<i64, DatabaseError>;
}
