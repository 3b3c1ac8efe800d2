//! Document analysis stage ("OCR engine").
//!
//! Issues three model calls concurrently — transcription, classification, and
//! structured-field extraction — and merges the results after all settle.
//! Each call that fails is replaced by its empty default, so analysis never
//! fails the pipeline; the worst case is raw extracted text with category
//! `other` and no structured fields.

use serde::Deserialize;
use tracing::warn;

use crate::extract::ExtractedContent;
use crate::model::{ModelClient, ModelRequest, RequestKind};
use crate::models::DocumentAnalysis;

const DEFAULT_CATEGORY: &str = "other";
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Categories the classifier is asked to choose from. Free-form answers
/// outside this list are kept as-is; the set only steers the prompt.
const CATEGORIES: &[&str] = &[
    "invoice",
    "quote",
    "contract",
    "permit",
    "inspection_report",
    "warranty",
    "correspondence",
    "site_photo",
    "drawing",
    "other",
];

#[derive(Debug, Default, Deserialize)]
struct TranscriptionResult {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ClassificationResult {
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self {
            category: default_category(),
            confidence: default_confidence(),
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}
fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

#[derive(Debug, Default, Deserialize)]
struct FieldExtractionResult {
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

/// Run the three analysis calls concurrently and merge the results.
pub async fn analyze_document(
    client: &dyn ModelClient,
    content: &ExtractedContent,
    file_name: &str,
) -> DocumentAnalysis {
    let (transcription, classification, fields) = tokio::join!(
        transcribe(client, content, file_name),
        classify(client, content, file_name),
        extract_fields(client, content, file_name),
    );

    let text = if transcription.text.trim().is_empty() {
        content.text.clone()
    } else {
        transcription.text
    };

    DocumentAnalysis {
        text,
        category: classification.category,
        confidence: classification.confidence.clamp(0.0, 1.0),
        fields: fields.fields,
    }
}

async fn transcribe(
    client: &dyn ModelClient,
    content: &ExtractedContent,
    file_name: &str,
) -> TranscriptionResult {
    // Nothing to transcribe when there is neither text nor an image.
    if content.text.trim().is_empty() && content.image_base64.is_none() {
        return TranscriptionResult::default();
    }

    let system = "You transcribe business documents. Return JSON: \
                  {\"text\": \"<full cleaned-up document text>\"}.";
    let user = if content.image_base64.is_some() {
        format!("Transcribe every word visible in this document image ({}).", file_name)
    } else {
        format!(
            "Clean up this extracted document text ({}). Fix OCR artifacts, keep all content.\n\n{}",
            file_name,
            truncate(&content.text, 12_000)
        )
    };

    let mut request = ModelRequest::new(RequestKind::Transcription, system, user);
    if let Some(image) = &content.image_base64 {
        request = request.with_images(vec![image.clone()]);
    }

    run_stage(client, request).await.unwrap_or_default()
}

async fn classify(
    client: &dyn ModelClient,
    content: &ExtractedContent,
    file_name: &str,
) -> ClassificationResult {
    let system = format!(
        "You classify business documents for a solar/coatings contractor CRM. \
         Categories: {}. Return JSON: {{\"category\": \"...\", \"confidence\": 0.0}}.",
        CATEGORIES.join(", ")
    );
    let user = format!(
        "Filename: {}\n\nDocument text:\n{}",
        file_name,
        truncate(&content.text, 8_000)
    );

    let mut request = ModelRequest::new(RequestKind::Classification, system, user);
    if let Some(image) = &content.image_base64 {
        request = request.with_images(vec![image.clone()]);
    }

    run_stage(client, request).await.unwrap_or_default()
}

async fn extract_fields(
    client: &dyn ModelClient,
    content: &ExtractedContent,
    file_name: &str,
) -> FieldExtractionResult {
    let system = "You extract structured data from business documents. Return JSON: \
                  {\"fields\": {\"<field name>\": <value>, ...}} with dates, amounts, \
                  addresses, reference numbers, and parties found in the document.";
    let user = format!(
        "Filename: {}\n\nDocument text:\n{}",
        file_name,
        truncate(&content.text, 8_000)
    );

    let mut request = ModelRequest::new(RequestKind::FieldExtraction, system, user);
    if let Some(image) = &content.image_base64 {
        request = request.with_images(vec![image.clone()]);
    }

    run_stage(client, request).await.unwrap_or_default()
}

/// Issue one stage call and parse its JSON into `T`. Failures are logged and
/// surfaced as `None` so the caller substitutes the stage default.
async fn run_stage<T: serde::de::DeserializeOwned>(
    client: &dyn ModelClient,
    request: ModelRequest,
) -> Option<T> {
    let kind = request.kind;
    match client.complete(request).await {
        Ok(value) => match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(stage = kind.as_str(), error = %e, "model response failed validation, using default");
                None
            }
        },
        Err(e) => {
            warn!(stage = kind.as_str(), error = %e, "model call failed, using default");
            None
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
