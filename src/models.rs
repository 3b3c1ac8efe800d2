//! Core data types used throughout the intake pipeline.
//!
//! Contacts and documents are persisted in SQLite; identifier sets, candidate
//! matches, and validated matches live only for the duration of a single
//! pipeline run.

use serde::{Deserialize, Serialize};

/// A customer/lead record in the contact store.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub lead_status: String,
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Contact {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.company.clone().unwrap_or_default()
        } else {
            name.to_string()
        }
    }
}

/// Fields for a contact that does not exist yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewContact {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_lead_status")]
    pub lead_status: String,
}

fn default_lead_status() -> String {
    "new".to_string()
}

/// Identifier categories the candidate search queries against the contact
/// store. Account/property/project/financial identifiers are extracted for
/// explainability but have no corresponding contact column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Name,
    Address,
    Phone,
    Email,
}

/// Everything the identifier extractor pulled out of one document.
///
/// Produced by one model call; every field defaults to empty so a partial
/// or failed response degrades to "no identifiers" instead of an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentifierSet {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub account_numbers: Vec<String>,
    #[serde(default)]
    pub property_identifiers: Vec<String>,
    #[serde(default)]
    pub project_identifiers: Vec<String>,
    #[serde(default)]
    pub financial_identifiers: Vec<String>,
    #[serde(default)]
    pub filename_clues: Vec<String>,
    #[serde(default)]
    pub context_clues: Vec<String>,
}

impl IdentifierSet {
    /// True when no searchable category holds a value. Filename and context
    /// clues are advisory and do not count.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
            && self.addresses.is_empty()
            && self.phones.is_empty()
            && self.emails.is_empty()
            && self.account_numbers.is_empty()
            && self.property_identifiers.is_empty()
            && self.project_identifiers.is_empty()
            && self.financial_identifiers.is_empty()
    }
}

/// A contact surfaced by the candidate search, with the identifier hits that
/// produced it. Deduplicated by contact id before validation.
#[derive(Debug, Clone)]
pub struct CandidateMatch {
    pub contact: Contact,
    pub hits: Vec<(IdentifierKind, String)>,
}

/// Coarse quality label derived from the validator's confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl MatchQuality {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.9 {
            MatchQuality::Excellent
        } else if confidence > 0.75 {
            MatchQuality::Good
        } else if confidence > 0.5 {
            MatchQuality::Fair
        } else {
            MatchQuality::Poor
        }
    }
}

/// A candidate enriched with the validator's verdict. Consumed immediately
/// by the resolver; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedMatch {
    pub contact_id: String,
    pub contact_name: String,
    pub confidence: f64,
    pub reasoning: String,
    pub quality: MatchQuality,
    pub matched_kinds: Vec<IdentifierKind>,
}

/// A ranked candidate surfaced alongside a suggested or manual-review
/// resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub contact_id: String,
    pub contact_name: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Terminal decision for one document. Exactly one is selected per run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Resolution {
    CreateNewCustomer {
        confidence: f64,
    },
    LinkToExisting {
        contact_id: String,
        confidence: f64,
        reasoning: String,
    },
    SuggestMatch {
        contact_id: String,
        contact_name: String,
        confidence: f64,
        reasoning: String,
        alternatives: Vec<RankedCandidate>,
    },
    ManualReview {
        candidates: Vec<RankedCandidate>,
        identifiers: IdentifierSet,
    },
}

impl Resolution {
    /// Short name persisted in the document row's `resolution` column.
    pub fn action(&self) -> &'static str {
        match self {
            Resolution::CreateNewCustomer { .. } => "create_new_customer",
            Resolution::LinkToExisting { .. } => "link_to_existing",
            Resolution::SuggestMatch { .. } => "suggest_match",
            Resolution::ManualReview { .. } => "manual_review",
        }
    }
}

/// Merged output of the three concurrent analysis model calls.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    /// Extracted (and, when the transcription call succeeded, cleaned-up) text.
    pub text: String,
    pub category: String,
    pub confidence: f64,
    /// Structured fields keyed by field name.
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Final outcome of one document's pipeline run, after storage.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    pub document_id: String,
    pub file_name: String,
    pub category: String,
    pub confidence: f64,
    pub customer_id: Option<String>,
    pub resolution: Resolution,
}

/// Per-file outcome inside a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file_name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<ProcessedDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated result of a folder/archive walk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<FileResult>,
}

impl BatchSummary {
    pub fn merge(&mut self, other: BatchSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.results.extend(other.results);
    }

    pub fn record_success(&mut self, file_name: String, path: String, doc: ProcessedDocument) {
        self.total += 1;
        self.succeeded += 1;
        self.results.push(FileResult {
            file_name,
            path,
            document: Some(doc),
            error: None,
        });
    }

    pub fn record_failure(&mut self, file_name: String, path: String, error: String) {
        self.total += 1;
        self.failed += 1;
        self.results.push(FileResult {
            file_name,
            path,
            document: None,
            error: Some(error),
        });
    }
}
