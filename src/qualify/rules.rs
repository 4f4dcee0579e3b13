//! Pattern-rule criteria extraction.
//!
//! A declarative table of (regex, target field) rules maps free text to a
//! partial [`Criteria`]. Rules are independent and non-exclusive: a message
//! may match zero, one, or several. Extraction is deterministic and
//! side-effect-free; fields whose pattern did not match are left unset.

use regex::Regex;
use tracing::debug;

use crate::qualify::types::Criteria;

/// Which criteria field a rule populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleTarget {
    /// Two captures: min then max. No min <= max validation.
    PriceRange,
    BedsMin,
    BathsMin,
    /// Single capture: a recognized zone name. First match wins; the zone
    /// set becomes a singleton of the canonical spelling.
    Zone,
}

/// A single extraction rule with a compiled regex.
#[derive(Debug, Clone)]
struct ExtractionRule {
    /// Human-readable rule name for logging.
    name: &'static str,
    regex: Regex,
    target: RuleTarget,
}

/// Closed vocabulary of recognized zones: (lowercase match key, canonical name).
/// Multi-word names come before their substrings so "West Monroe" never
/// canonicalizes to "Monroe".
const ZONES: &[(&str, &str)] = &[
    ("west monroe", "West Monroe"),
    ("west ouachita", "West Ouachita"),
    ("sterlington", "Sterlington"),
    ("monroe", "Monroe"),
    ("calhoun", "Calhoun"),
    ("swartz", "Swartz"),
    ("ruston", "Ruston"),
];

/// Rule-based criteria extractor.
pub struct CriteriaExtractor {
    rules: Vec<ExtractionRule>,
}

impl Default for CriteriaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CriteriaExtractor {
    /// Build the extractor with the default rule table.
    pub fn new() -> Self {
        let zone_alternation = ZONES
            .iter()
            .map(|(key, _)| regex::escape(key))
            .collect::<Vec<_>>()
            .join("|");

        let rules = vec![
            // "NNN - NNN", optional $ on either side, at least 3 digits each
            ExtractionRule {
                name: "price_range",
                regex: Regex::new(r"\$?\s*(\d{3,})\s*-\s*\$?\s*(\d{3,})").unwrap(),
                target: RuleTarget::PriceRange,
            },
            ExtractionRule {
                name: "beds",
                regex: Regex::new(r"(?i)(\d+)\s*(?:beds?|br)").unwrap(),
                target: RuleTarget::BedsMin,
            },
            ExtractionRule {
                name: "baths",
                regex: Regex::new(r"(?i)(\d+)\s*(?:baths?|ba)").unwrap(),
                target: RuleTarget::BathsMin,
            },
            ExtractionRule {
                name: "zone",
                regex: Regex::new(&format!(r"(?i)\b(?:{zone_alternation})\b")).unwrap(),
                target: RuleTarget::Zone,
            },
        ];

        Self { rules }
    }

    /// Canonical spelling for a matched zone, by lowercase key.
    fn canonical_zone(matched: &str) -> Option<&'static str> {
        let key = matched.to_lowercase();
        ZONES
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, canonical)| *canonical)
    }

    /// Extract a partial criteria record from free text.
    pub fn extract(&self, text: &str) -> Criteria {
        let mut out = Criteria::default();

        for rule in &self.rules {
            let Some(caps) = rule.regex.captures(text) else {
                continue;
            };

            match rule.target {
                RuleTarget::PriceRange => {
                    let min = caps.get(1).and_then(|m| m.as_str().parse::<i64>().ok());
                    let max = caps.get(2).and_then(|m| m.as_str().parse::<i64>().ok());
                    if let (Some(min), Some(max)) = (min, max) {
                        out.price_min = Some(min);
                        out.price_max = Some(max);
                    }
                }
                RuleTarget::BedsMin => {
                    out.beds_min = caps.get(1).and_then(|m| m.as_str().parse().ok());
                }
                RuleTarget::BathsMin => {
                    out.baths_min = caps.get(1).and_then(|m| m.as_str().parse().ok());
                }
                RuleTarget::Zone => {
                    if let Some(canonical) = Self::canonical_zone(&caps[0]) {
                        out.zones = Some(vec![canonical.to_string()]);
                    }
                }
            }

            debug!(rule = rule.name, "Extraction rule matched");
        }

        out
    }
}
