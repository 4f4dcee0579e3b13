//! Deterministic follow-up question policy.

use crate::qualify::types::Criteria;

pub const PRICE_QUESTION: &str =
    "What price range are you shopping in? Something like \"$250000 - $450000\" works.";
pub const BEDS_QUESTION: &str = "Got it. How many bedrooms do you need at minimum?";
pub const MUST_HAVES_QUESTION: &str =
    "Great. Any must-haves or dealbreakers I should know about? (pool, big yard, a particular school zone...)";

/// Pick the next question from the merged criteria, in fixed priority
/// order: price, then bedrooms, then must-haves. Total function with
/// exactly three outputs; it never tracks how often a question was asked.
pub fn next_question(criteria: &Criteria) -> &'static str {
    if criteria.price_max.is_none() {
        PRICE_QUESTION
    } else if criteria.beds_min.is_none() {
        BEDS_QUESTION
    } else {
        MUST_HAVES_QUESTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_criteria_asks_for_price() {
        assert_eq!(next_question(&Criteria::default()), PRICE_QUESTION);
    }

    #[test]
    fn price_set_asks_for_beds() {
        let c = Criteria {
            price_max: Some(450_000),
            ..Default::default()
        };
        assert_eq!(next_question(&c), BEDS_QUESTION);
    }

    #[test]
    fn price_and_beds_set_asks_for_must_haves() {
        let c = Criteria {
            price_max: Some(450_000),
            beds_min: Some(3),
            ..Default::default()
        };
        assert_eq!(next_question(&c), MUST_HAVES_QUESTION);
    }

    #[test]
    fn beds_alone_still_asks_for_price() {
        // Priority is fixed: price is asked before bedrooms.
        let c = Criteria {
            beds_min: Some(3),
            ..Default::default()
        };
        assert_eq!(next_question(&c), PRICE_QUESTION);
    }

    #[test]
    fn price_min_alone_is_not_enough() {
        // The policy keys on price_max specifically.
        let c = Criteria {
            price_min: Some(250_000),
            ..Default::default()
        };
        assert_eq!(next_question(&c), PRICE_QUESTION);
    }
}
