//! Per-document pipeline orchestration.
//!
//! Stages run strictly in sequence — extraction, analysis, identifier
//! extraction, candidate search, validation, resolution, storage — because
//! each stage's output feeds the next. Model-backed stages degrade to
//! defaults on failure; only setup errors (unreadable file, unsupported
//! extension, database failure) propagate to the caller.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analysis::analyze_document;
use crate::candidates::search_candidates;
use crate::extract::extract_document;
use crate::identify::extract_identifiers;
use crate::model::ModelClient;
use crate::models::{IdentifierSet, NewContact, ProcessedDocument, Resolution};
use crate::resolve::resolve_matches;
use crate::store::{self, DocumentRecord};
use crate::validate::validate_candidates;

pub struct Pipeline {
    pool: SqlitePool,
    model: Arc<dyn ModelClient>,
}

impl Pipeline {
    pub fn new(pool: SqlitePool, model: Arc<dyn ModelClient>) -> Self {
        Self { pool, model }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Process a file on disk.
    pub async fn process_path(&self, path: &Path, actor: &str) -> Result<ProcessedDocument> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.process_bytes(&bytes, &file_name, Some(&path.display().to_string()), actor)
            .await
    }

    /// Process an in-memory buffer (HTTP upload path).
    pub async fn process_bytes(
        &self,
        bytes: &[u8],
        file_name: &str,
        source_path: Option<&str>,
        actor: &str,
    ) -> Result<ProcessedDocument> {
        let content = extract_document(bytes, file_name)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Extraction failed for {}", file_name))?;

        let analysis = analyze_document(self.model.as_ref(), &content, file_name).await;
        debug!(
            file_name,
            category = %analysis.category,
            confidence = analysis.confidence,
            "analysis complete"
        );

        let identifiers = extract_identifiers(self.model.as_ref(), &analysis, file_name).await;
        let candidates = search_candidates(&self.pool, &identifiers).await;
        debug!(file_name, candidates = candidates.len(), "candidate search complete");

        let validated =
            validate_candidates(self.model.as_ref(), &candidates, &analysis, file_name).await;
        let resolution = resolve_matches(validated, &identifiers);

        let new_contact = match resolution {
            Resolution::CreateNewCustomer { .. } => contact_from_identifiers(&identifiers),
            _ => None,
        };

        let record = DocumentRecord {
            file_name: file_name.to_string(),
            source_path: source_path.map(|s| s.to_string()),
            content_type: content.content_type.clone(),
            content_hash: content_hash(bytes),
            extracted_text: analysis.text.clone(),
            analysis_json: serde_json::to_string(&analysis)?,
            category: analysis.category.clone(),
            confidence: analysis.confidence,
        };

        let stored = store::persist_resolution(
            &self.pool,
            &record,
            &resolution,
            new_contact.as_ref(),
            actor,
        )
        .await
        .with_context(|| format!("Failed to store resolution for {}", file_name))?;

        info!(
            file_name,
            document_id = %stored.document_id,
            resolution = resolution.action(),
            customer_id = stored.customer_id.as_deref().unwrap_or("-"),
            "document processed"
        );

        Ok(ProcessedDocument {
            document_id: stored.document_id,
            file_name: file_name.to_string(),
            category: analysis.category,
            confidence: analysis.confidence,
            customer_id: stored.customer_id,
            resolution,
        })
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Build contact fields for the create-new-customer path from whatever the
/// extractor found. Returns `None` when there is nothing usable; storage
/// then falls back to a placeholder contact flagged for review.
fn contact_from_identifiers(ids: &IdentifierSet) -> Option<NewContact> {
    let name = ids.names.first()?;
    let mut parts = name.split_whitespace();
    let first_name = parts.next().unwrap_or_default().to_string();
    let last_name = parts.collect::<Vec<_>>().join(" ");

    Some(NewContact {
        first_name,
        last_name,
        company: None,
        email: ids.emails.first().cloned(),
        phone: ids.phones.first().cloned(),
        address: ids.addresses.first().cloned(),
        lead_status: "new".to_string(),
    })
}
