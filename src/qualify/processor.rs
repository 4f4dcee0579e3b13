//! Conversation processor — one inbound message, one qualified turn.
//!
//! Flow per message:
//! 1. Extract a partial criteria record from the text (pure, rule-based)
//! 2. Merge it into the buyer's saved search (skipped when nothing matched)
//! 3. Pick the next follow-up question from the merged criteria

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::qualify::followup::next_question;
use crate::qualify::merger::SavedSearchMerger;
use crate::qualify::rules::CriteriaExtractor;
use crate::qualify::types::Criteria;
use crate::store::Database;

/// Result of one conversation turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The deterministic follow-up question to send back.
    pub reply: String,
    /// The merged criteria, or `None` when nothing was extracted this turn
    /// (the stored search, if any, is left untouched and unread).
    pub saved_search: Option<Criteria>,
}

/// Composes extractor, merger, and follow-up policy.
pub struct ConversationProcessor {
    extractor: CriteriaExtractor,
    merger: SavedSearchMerger,
}

impl ConversationProcessor {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            extractor: CriteriaExtractor::new(),
            merger: SavedSearchMerger::new(db),
        }
    }

    /// Handle one inbound message for `buyer_id`.
    pub async fn handle_message(
        &self,
        buyer_id: Uuid,
        message: &str,
    ) -> Result<TurnOutcome, DatabaseError> {
        let partial = self.extractor.extract(message);
        let merged = self.merger.merge(buyer_id, &partial).await?;

        // When the merge was skipped the policy sees empty criteria and
        // starts over from the price question.
        let reply = next_question(merged.as_ref().unwrap_or(&Criteria::default())).to_string();

        info!(
            buyer_id = %buyer_id,
            extracted = !partial.is_empty(),
            "Conversation turn handled"
        );

        Ok(TurnOutcome {
            reply,
            saved_search: merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualify::followup::{BEDS_QUESTION, MUST_HAVES_QUESTION, PRICE_QUESTION};
    use crate::store::LibSqlBackend;

    async fn processor() -> ConversationProcessor {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        ConversationProcessor::new(db)
    }

    #[tokio::test]
    async fn full_message_creates_search_and_asks_for_must_haves() {
        let p = processor().await;
        let buyer_id = Uuid::new_v4();

        let outcome = p
            .handle_message(buyer_id, "$250000 - $450000, 3 bed, Sterlington")
            .await
            .unwrap();

        let criteria = outcome.saved_search.unwrap();
        assert_eq!(criteria.price_min, Some(250_000));
        assert_eq!(criteria.price_max, Some(450_000));
        assert_eq!(criteria.beds_min, Some(3));
        assert_eq!(criteria.zones, Some(vec!["Sterlington".to_string()]));
        assert_eq!(outcome.reply, MUST_HAVES_QUESTION);
    }

    #[tokio::test]
    async fn criteria_accumulate_across_turns() {
        let p = processor().await;
        let buyer_id = Uuid::new_v4();

        let first = p.handle_message(buyer_id, "3 bed").await.unwrap();
        assert_eq!(first.reply, PRICE_QUESTION);

        let second = p.handle_message(buyer_id, "250000-450000").await.unwrap();
        let criteria = second.saved_search.unwrap();
        assert_eq!(criteria.beds_min, Some(3));
        assert_eq!(criteria.price_min, Some(250_000));
        assert_eq!(criteria.price_max, Some(450_000));
        assert_eq!(second.reply, MUST_HAVES_QUESTION);
    }

    #[tokio::test]
    async fn unrelated_message_skips_merge_and_asks_for_price() {
        let p = processor().await;
        let buyer_id = Uuid::new_v4();

        let outcome = p.handle_message(buyer_id, "hello!").await.unwrap();
        assert!(outcome.saved_search.is_none());
        assert_eq!(outcome.reply, PRICE_QUESTION);
    }

    #[tokio::test]
    async fn price_only_turn_asks_for_beds() {
        let p = processor().await;
        let buyer_id = Uuid::new_v4();

        let outcome = p.handle_message(buyer_id, "$300000 - $400000").await.unwrap();
        assert_eq!(outcome.reply, BEDS_QUESTION);
    }
}
