//! Candidate search stage.
//!
//! Fans out one substring query per extracted identifier against the contact
//! store and unions the results, deduplicated by contact id. Each query is
//! independent so one malformed identifier cannot suppress hits from the
//! others; a failing query is logged and swallowed. Identifiers shorter than
//! [`MIN_IDENTIFIER_LEN`] are skipped to avoid overmatching on short tokens.

use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::warn;

use crate::models::{CandidateMatch, Contact, IdentifierKind, IdentifierSet};

/// Identifiers at or below this length match too much to be useful.
pub const MIN_IDENTIFIER_LEN: usize = 3;

/// Search the contact store for every plausible owner of the document.
///
/// The result is a set: deduplicated by contact id, ordered by id for
/// determinism, each entry carrying the (category, value) pairs that hit it.
pub async fn search_candidates(pool: &SqlitePool, ids: &IdentifierSet) -> Vec<CandidateMatch> {
    let mut by_contact: BTreeMap<String, CandidateMatch> = BTreeMap::new();

    for (kind, value) in searchable_identifiers(ids) {
        let contacts = match query_category(pool, kind, &value).await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(
                    category = ?kind,
                    identifier = %value,
                    error = %e,
                    "candidate query failed, continuing with remaining identifiers"
                );
                continue;
            }
        };

        for contact in contacts {
            by_contact
                .entry(contact.id.clone())
                .or_insert_with(|| CandidateMatch {
                    contact,
                    hits: Vec::new(),
                })
                .hits
                .push((kind, value.clone()));
        }
    }

    by_contact.into_values().collect()
}

/// Flatten the set into (category, value) pairs worth querying.
fn searchable_identifiers(ids: &IdentifierSet) -> Vec<(IdentifierKind, String)> {
    let mut out = Vec::new();
    for (kind, values) in [
        (IdentifierKind::Name, &ids.names),
        (IdentifierKind::Address, &ids.addresses),
        (IdentifierKind::Phone, &ids.phones),
        (IdentifierKind::Email, &ids.emails),
    ] {
        for value in values {
            let trimmed = value.trim();
            if trimmed.len() > MIN_IDENTIFIER_LEN {
                out.push((kind, trimmed.to_string()));
            }
        }
    }
    out
}

async fn query_category(
    pool: &SqlitePool,
    kind: IdentifierKind,
    value: &str,
) -> Result<Vec<Contact>, sqlx::Error> {
    let pattern = like_pattern(value);
    let sql = match kind {
        IdentifierKind::Name => {
            r#"SELECT * FROM contacts
               WHERE first_name LIKE ?1 ESCAPE '\'
                  OR last_name LIKE ?1 ESCAPE '\'
                  OR company LIKE ?1 ESCAPE '\'"#
        }
        IdentifierKind::Address => r#"SELECT * FROM contacts WHERE address LIKE ?1 ESCAPE '\'"#,
        IdentifierKind::Phone => r#"SELECT * FROM contacts WHERE phone LIKE ?1 ESCAPE '\'"#,
        IdentifierKind::Email => r#"SELECT * FROM contacts WHERE email LIKE ?1 ESCAPE '\'"#,
    };

    sqlx::query_as::<_, Contact>(sql)
        .bind(pattern)
        .fetch_all(pool)
        .await
}

/// Substring pattern with LIKE wildcards in the identifier escaped.
fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{}%", escaped)
}
