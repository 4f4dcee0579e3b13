//! Saved-search persistence and merging.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::qualify::types::Criteria;
use crate::store::Database;

/// Attempts before giving up on an optimistic-concurrency conflict.
const MAX_MERGE_ATTEMPTS: u32 = 4;

/// Merges partial criteria into the buyer's single saved search.
pub struct SavedSearchMerger {
    db: Arc<dyn Database>,
}

impl SavedSearchMerger {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Merge `partial` into the buyer's saved search.
    ///
    /// An empty partial skips the merge entirely — the existing record is
    /// left unread and `None` is returned. Otherwise the partial is
    /// shallow-merged over the stored criteria (right-biased per field) and
    /// written back under a version check, or a new record is created when
    /// the buyer has none yet. Returns the merged criteria.
    pub async fn merge(
        &self,
        buyer_id: Uuid,
        partial: &Criteria,
    ) -> Result<Option<Criteria>, DatabaseError> {
        if partial.is_empty() {
            return Ok(None);
        }

        for attempt in 0..MAX_MERGE_ATTEMPTS {
            match self.db.get_saved_search(buyer_id).await? {
                Some(existing) => {
                    let merged = existing.criteria.merged_with(partial);
                    if self
                        .db
                        .update_saved_search(existing.id, &merged, existing.version)
                        .await?
                    {
                        return Ok(Some(merged));
                    }
                    // Concurrent writer bumped the version; re-read and retry.
                    debug!(buyer_id = %buyer_id, attempt, "Saved-search version conflict, retrying");
                }
                None => {
                    if let Some(created) =
                        self.db.try_create_saved_search(buyer_id, partial).await?
                    {
                        return Ok(Some(created.criteria));
                    }
                    // Lost the creation race; loop into the merge path.
                    debug!(buyer_id = %buyer_id, attempt, "Saved-search created concurrently, retrying");
                }
            }
        }

        Err(DatabaseError::Constraint(format!(
            "Saved search for buyer {buyer_id} kept changing under us"
        )))
    }
}
