//! Identifier extraction stage.
//!
//! One model call pulls every customer-identifying string out of the analyzed
//! document. The contract is total: on any model or parse failure the stage
//! returns an all-empty [`IdentifierSet`], so the pipeline degrades to the
//! no-match path instead of halting.

use tracing::warn;

use crate::model::{ModelClient, ModelRequest, RequestKind};
use crate::models::{DocumentAnalysis, IdentifierSet};

/// Extract customer identifiers from the document analysis. Never fails.
pub async fn extract_identifiers(
    client: &dyn ModelClient,
    analysis: &DocumentAnalysis,
    file_name: &str,
) -> IdentifierSet {
    let system = "You extract customer-identifying strings from business documents. \
                  Return JSON with these keys, each an array of strings (empty when \
                  nothing found): names, addresses, phones, emails, account_numbers, \
                  property_identifiers, project_identifiers, financial_identifiers, \
                  filename_clues, context_clues.";

    let fields_json =
        serde_json::to_string(&analysis.fields).unwrap_or_else(|_| "{}".to_string());
    let user = format!(
        "Filename: {}\nCategory: {}\nStructured fields: {}\n\nDocument text:\n{}",
        file_name,
        analysis.category,
        fields_json,
        truncate(&analysis.text, 10_000)
    );

    let request = ModelRequest::new(RequestKind::IdentifierExtraction, system, user);

    match client.complete(request).await {
        Ok(value) => match serde_json::from_value::<IdentifierSet>(value) {
            Ok(mut ids) => {
                tidy(&mut ids);
                ids
            }
            Err(e) => {
                warn!(error = %e, file_name, "identifier response failed validation, returning empty set");
                IdentifierSet::default()
            }
        },
        Err(e) => {
            warn!(error = %e, file_name, "identifier extraction call failed, returning empty set");
            IdentifierSet::default()
        }
    }
}

/// Trim whitespace and drop blank entries in every category.
fn tidy(ids: &mut IdentifierSet) {
    for list in [
        &mut ids.names,
        &mut ids.addresses,
        &mut ids.phones,
        &mut ids.emails,
        &mut ids.account_numbers,
        &mut ids.property_identifiers,
        &mut ids.project_identifiers,
        &mut ids.financial_identifiers,
        &mut ids.filename_clues,
        &mut ids.context_clues,
    ] {
        for value in list.iter_mut() {
            *value = value.trim().to_string();
        }
        list.retain(|v| !v.is_empty());
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
