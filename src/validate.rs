//! Match validation stage.
//!
//! Asks the model to score every candidate against the document context.
//! The contract is one validated entry per input candidate: entries the model
//! omits, and the whole list when the call fails, fall back to
//! [`FALLBACK_CONFIDENCE`] so the resolver always has something to threshold
//! against.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::model::{ModelClient, ModelRequest, RequestKind};
use crate::models::{CandidateMatch, DocumentAnalysis, MatchQuality, ValidatedMatch};

/// Confidence substituted when the validator cannot run.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Default, Deserialize)]
struct ValidationResponse {
    #[serde(default)]
    matches: Vec<ValidationEntry>,
}

#[derive(Debug, Deserialize)]
struct ValidationEntry {
    contact_id: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// Score each candidate in [0,1] with reasoning and a quality label.
pub async fn validate_candidates(
    client: &dyn ModelClient,
    candidates: &[CandidateMatch],
    analysis: &DocumentAnalysis,
    file_name: &str,
) -> Vec<ValidatedMatch> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let scored = match request_scores(client, candidates, analysis, file_name).await {
        Ok(scored) => scored,
        Err(e) => {
            warn!(error = %e, file_name, "match validation call failed, using fallback confidence");
            HashMap::new()
        }
    };

    candidates
        .iter()
        .map(|candidate| {
            let (confidence, reasoning) = scored
                .get(&candidate.contact.id)
                .cloned()
                .unwrap_or_else(|| {
                    (
                        FALLBACK_CONFIDENCE,
                        "Validation unavailable; default confidence applied".to_string(),
                    )
                });
            let confidence = confidence.clamp(0.0, 1.0);
            let mut matched_kinds: Vec<_> = Vec::new();
            for (kind, _) in &candidate.hits {
                if !matched_kinds.contains(kind) {
                    matched_kinds.push(*kind);
                }
            }

            ValidatedMatch {
                contact_id: candidate.contact.id.clone(),
                contact_name: candidate.contact.display_name(),
                confidence,
                reasoning,
                quality: MatchQuality::from_confidence(confidence),
                matched_kinds,
            }
        })
        .collect()
}

async fn request_scores(
    client: &dyn ModelClient,
    candidates: &[CandidateMatch],
    analysis: &DocumentAnalysis,
    file_name: &str,
) -> anyhow::Result<HashMap<String, (f64, String)>> {
    let system = "You judge whether CRM contacts are the true owner of a document. \
                  For every candidate return a confidence in [0,1] and one sentence of \
                  reasoning. Return JSON: {\"matches\": [{\"contact_id\": \"...\", \
                  \"confidence\": 0.0, \"reasoning\": \"...\"}]} with one entry per candidate.";

    let mut listing = String::new();
    for candidate in candidates {
        let hits: Vec<String> = candidate
            .hits
            .iter()
            .map(|(kind, value)| format!("{:?}={}", kind, value))
            .collect();
        listing.push_str(&format!(
            "- id={} name={} email={} phone={} address={} matched_on=[{}]\n",
            candidate.contact.id,
            candidate.contact.display_name(),
            candidate.contact.email.as_deref().unwrap_or("-"),
            candidate.contact.phone.as_deref().unwrap_or("-"),
            candidate.contact.address.as_deref().unwrap_or("-"),
            hits.join(", ")
        ));
    }

    let user = format!(
        "Document: {} (category: {})\n\nDocument text:\n{}\n\nCandidates:\n{}",
        file_name,
        analysis.category,
        truncate(&analysis.text, 8_000),
        listing
    );

    let value = client
        .complete(ModelRequest::new(RequestKind::MatchValidation, system, user))
        .await?;
    let response: ValidationResponse = serde_json::from_value(value)?;

    Ok(response
        .matches
        .into_iter()
        .map(|entry| (entry.contact_id, (entry.confidence, entry.reasoning)))
        .collect())
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contact, IdentifierKind};
    use anyhow::bail;
    use async_trait::async_trait;

    fn contact(id: &str, first: &str, last: &str) -> Contact {
        Contact {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            company: None,
            email: None,
            phone: None,
            address: None,
            lead_status: "new".to_string(),
            assigned_to: None,
            created_by: "test".to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn candidate(id: &str) -> CandidateMatch {
        CandidateMatch {
            contact: contact(id, "Jane", "Doe"),
            hits: vec![
                (IdentifierKind::Name, "Jane Doe".to_string()),
                (IdentifierKind::Name, "Doe".to_string()),
                (IdentifierKind::Email, "jane@example.com".to_string()),
            ],
        }
    }

    fn analysis() -> DocumentAnalysis {
        DocumentAnalysis {
            text: "Invoice for Jane Doe".to_string(),
            category: "invoice".to_string(),
            confidence: 0.9,
            fields: serde_json::Map::new(),
        }
    }

    struct FailingClient;

    #[async_trait]
    impl ModelClient for FailingClient {
        async fn complete(&self, _request: ModelRequest) -> anyhow::Result<serde_json::Value> {
            bail!("timeout")
        }
    }

    #[tokio::test]
    async fn failing_call_scores_every_candidate_at_fallback() {
        let candidates = vec![candidate("c1"), candidate("c2")];
        let validated =
            validate_candidates(&FailingClient, &candidates, &analysis(), "a.pdf").await;
        assert_eq!(validated.len(), 2);
        for v in &validated {
            assert_eq!(v.confidence, FALLBACK_CONFIDENCE);
            assert_eq!(v.quality, MatchQuality::Poor);
        }
    }

    struct PartialScorer;

    #[async_trait]
    impl ModelClient for PartialScorer {
        async fn complete(&self, _request: ModelRequest) -> anyhow::Result<serde_json::Value> {
            // Scores c1 but omits c2; also overshoots the scale on c1.
            Ok(serde_json::json!({
                "matches": [
                    { "contact_id": "c1", "confidence": 1.4, "reasoning": "exact email match" }
                ]
            }))
        }
    }

    #[tokio::test]
    async fn omitted_candidates_get_fallback_and_scores_are_clamped() {
        let candidates = vec![candidate("c1"), candidate("c2")];
        let validated =
            validate_candidates(&PartialScorer, &candidates, &analysis(), "a.pdf").await;
        assert_eq!(validated.len(), 2);

        let c1 = validated.iter().find(|v| v.contact_id == "c1").unwrap();
        assert_eq!(c1.confidence, 1.0);
        assert_eq!(c1.quality, MatchQuality::Excellent);

        let c2 = validated.iter().find(|v| v.contact_id == "c2").unwrap();
        assert_eq!(c2.confidence, FALLBACK_CONFIDENCE);
    }

    #[tokio::test]
    async fn matched_kinds_are_deduplicated() {
        let candidates = vec![candidate("c1")];
        let validated =
            validate_candidates(&FailingClient, &candidates, &analysis(), "a.pdf").await;
        assert_eq!(
            validated[0].matched_kinds,
            vec![IdentifierKind::Name, IdentifierKind::Email]
        );
    }

    #[tokio::test]
    async fn empty_candidate_list_makes_no_model_call() {
        struct PanickingClient;
        #[async_trait]
        impl ModelClient for PanickingClient {
            async fn complete(&self, _request: ModelRequest) -> anyhow::Result<serde_json::Value> {
                panic!("should not be called");
            }
        }
        let validated =
            validate_candidates(&PanickingClient, &[], &analysis(), "a.pdf").await;
        assert!(validated.is_empty());
    }
}
