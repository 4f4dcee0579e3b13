//! Search criteria value object.

use serde::{Deserialize, Serialize};

/// Structured search criteria for one buyer.
///
/// Every field is optional; a field absent from the JSON form is omitted
/// entirely rather than written as null. A `Criteria` with no fields set
/// doubles as the "nothing extracted" result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub beds_min: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub baths_min: Option<u32>,

    /// Preferred zone names (canonical spelling).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_haves: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avoid: Option<Vec<String>>,
}

impl Criteria {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.price_min.is_none()
            && self.price_max.is_none()
            && self.beds_min.is_none()
            && self.baths_min.is_none()
            && self.zones.is_none()
            && self.must_haves.is_none()
            && self.avoid.is_none()
    }

    /// Shallow right-biased merge: every field set in `other` overwrites
    /// the same field in `self`; fields absent from `other` are untouched.
    pub fn merged_with(&self, other: &Criteria) -> Criteria {
        Criteria {
            price_min: other.price_min.or(self.price_min),
            price_max: other.price_max.or(self.price_max),
            beds_min: other.beds_min.or(self.beds_min),
            baths_min: other.baths_min.or(self.baths_min),
            zones: other.zones.clone().or_else(|| self.zones.clone()),
            must_haves: other.must_haves.clone().or_else(|| self.must_haves.clone()),
            avoid: other.avoid.clone().or_else(|| self.avoid.clone()),
        }
    }
}
