//! Lead qualification — criteria extraction, merging, and follow-up steering.

pub mod followup;
pub mod merger;
pub mod processor;
pub mod rules;
pub mod types;

pub use merger::SavedSearchMerger;
pub use processor::{ConversationProcessor, TurnOutcome};
pub use rules::CriteriaExtractor;
pub use types::Criteria;
