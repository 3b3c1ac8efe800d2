//! Match resolution: the terminal decision for one document.
//!
//! Pure policy over the validator's scores. Thresholds are fixed constants,
//! applied strictly greater-than, so 0.8 exactly suggests and 0.6 exactly
//! goes to manual review.

use crate::models::{IdentifierSet, RankedCandidate, Resolution, ValidatedMatch};

/// Above this, link without asking a human.
pub const LINK_THRESHOLD: f64 = 0.8;
/// Above this (and at or below [`LINK_THRESHOLD`]), suggest for review.
pub const SUGGEST_THRESHOLD: f64 = 0.6;
/// Confidence reported when no candidates exist; creating a new customer
/// is unambiguous.
pub const NEW_CUSTOMER_CONFIDENCE: f64 = 0.8;
/// Runner-ups carried on a suggestion.
pub const MAX_ALTERNATIVES: usize = 2;
/// Ranked candidates carried into manual review.
pub const MAX_REVIEW_CANDIDATES: usize = 5;

/// Decide what to do with the document given the validated matches.
///
/// Matches are sorted descending by confidence and the thresholds applied
/// against the top entry. `identifiers` rides along into manual review so a
/// human can create or link by hand.
pub fn resolve_matches(mut matches: Vec<ValidatedMatch>, identifiers: &IdentifierSet) -> Resolution {
    if matches.is_empty() {
        return Resolution::CreateNewCustomer {
            confidence: NEW_CUSTOMER_CONFIDENCE,
        };
    }

    matches.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let best = &matches[0];

    if best.confidence > LINK_THRESHOLD {
        return Resolution::LinkToExisting {
            contact_id: best.contact_id.clone(),
            confidence: best.confidence,
            reasoning: best.reasoning.clone(),
        };
    }

    if best.confidence > SUGGEST_THRESHOLD {
        let alternatives = matches
            .iter()
            .skip(1)
            .take(MAX_ALTERNATIVES)
            .map(ranked)
            .collect();
        return Resolution::SuggestMatch {
            contact_id: best.contact_id.clone(),
            contact_name: best.contact_name.clone(),
            confidence: best.confidence,
            reasoning: best.reasoning.clone(),
            alternatives,
        };
    }

    Resolution::ManualReview {
        candidates: matches.iter().take(MAX_REVIEW_CANDIDATES).map(ranked).collect(),
        identifiers: identifiers.clone(),
    }
}

fn ranked(m: &ValidatedMatch) -> RankedCandidate {
    RankedCandidate {
        contact_id: m.contact_id.clone(),
        contact_name: m.contact_name.clone(),
        confidence: m.confidence,
        reasoning: m.reasoning.clone(),
    }
}
