//! Contact and document persistence.
//!
//! The matching stages are read-only; every write happens here, after the
//! resolution is final. Creating a new customer and linking the document to
//! it are one transaction, so a crash cannot leave an orphaned contact
//! without its document. Every write carries a caller-supplied actor id for
//! the audit columns.

use anyhow::{Context, Result};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{Contact, NewContact, Resolution};

/// Inputs for the document row, assembled by the pipeline before storage.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub file_name: String,
    pub source_path: Option<String>,
    pub content_type: String,
    pub content_hash: String,
    pub extracted_text: String,
    pub analysis_json: String,
    pub category: String,
    pub confidence: f64,
}

/// Outcome of storage: the persisted document id and, when resolved, the
/// owning contact.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub document_id: String,
    pub customer_id: Option<String>,
}

pub async fn list_contacts(pool: &SqlitePool, limit: i64) -> Result<Vec<Contact>> {
    let contacts =
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts ORDER BY created_at DESC LIMIT ?")
            .bind(limit)
            .fetch_all(pool)
            .await?;
    Ok(contacts)
}

pub async fn get_contact(pool: &SqlitePool, id: &str) -> Result<Option<Contact>> {
    let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(contact)
}

/// Insert a contact directly (HTTP contact-create path).
pub async fn create_contact(pool: &SqlitePool, new: &NewContact, actor: &str) -> Result<Contact> {
    let mut conn = pool.acquire().await?;
    insert_contact(&mut conn, new, actor).await
}

async fn insert_contact(
    conn: &mut SqliteConnection,
    new: &NewContact,
    actor: &str,
) -> Result<Contact> {
    let now = chrono::Utc::now().timestamp();
    let contact = Contact {
        id: Uuid::new_v4().to_string(),
        first_name: new.first_name.clone(),
        last_name: new.last_name.clone(),
        company: new.company.clone(),
        email: new.email.as_deref().map(|e| e.trim().to_lowercase()),
        phone: new.phone.clone(),
        address: new.address.clone(),
        lead_status: new.lead_status.clone(),
        assigned_to: None,
        created_by: actor.to_string(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO contacts (id, first_name, last_name, company, email, phone, address,
                              lead_status, assigned_to, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&contact.id)
    .bind(&contact.first_name)
    .bind(&contact.last_name)
    .bind(&contact.company)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(&contact.address)
    .bind(&contact.lead_status)
    .bind(&contact.assigned_to)
    .bind(&contact.created_by)
    .bind(contact.created_at)
    .bind(contact.updated_at)
    .execute(conn)
    .await?;

    Ok(contact)
}

/// Look for an existing contact carrying the same normalized email, then the
/// same phone. Used inside the storage transaction so two documents with
/// overlapping identifiers reuse one contact instead of creating duplicates.
async fn find_duplicate_contact(
    conn: &mut SqliteConnection,
    new: &NewContact,
) -> Result<Option<String>> {
    if let Some(email) = new.email.as_deref() {
        let email = email.trim().to_lowercase();
        if !email.is_empty() {
            let id: Option<String> =
                sqlx::query_scalar("SELECT id FROM contacts WHERE lower(email) = ? LIMIT 1")
                    .bind(&email)
                    .fetch_optional(&mut *conn)
                    .await?;
            if id.is_some() {
                return Ok(id);
            }
        }
    }

    if let Some(phone) = new.phone.as_deref() {
        let phone = phone.trim();
        if !phone.is_empty() {
            let id: Option<String> =
                sqlx::query_scalar("SELECT id FROM contacts WHERE phone = ? LIMIT 1")
                    .bind(phone)
                    .fetch_optional(&mut *conn)
                    .await?;
            if id.is_some() {
                return Ok(id);
            }
        }
    }

    Ok(None)
}

/// Persist the document and apply the resolution atomically.
///
/// `new_contact` supplies the fields for the `CreateNewCustomer` path; it is
/// ignored for every other resolution. Suggest/manual outcomes store the
/// document unlinked with the full resolution JSON for human follow-up.
pub async fn persist_resolution(
    pool: &SqlitePool,
    record: &DocumentRecord,
    resolution: &Resolution,
    new_contact: Option<&NewContact>,
    actor: &str,
) -> Result<StoredDocument> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let customer_id = match resolution {
        Resolution::LinkToExisting { contact_id, .. } => Some(contact_id.clone()),
        Resolution::CreateNewCustomer { .. } => {
            let new = new_contact
                .cloned()
                .unwrap_or_else(|| placeholder_contact(&record.file_name));
            match find_duplicate_contact(&mut tx, &new).await? {
                Some(existing) => Some(existing),
                None => Some(insert_contact(&mut tx, &new, actor).await?.id),
            }
        }
        Resolution::SuggestMatch { .. } | Resolution::ManualReview { .. } => None,
    };

    let document_id = Uuid::new_v4().to_string();
    let resolution_json = serde_json::to_string(resolution)?;
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO documents (id, file_name, source_path, content_type, content_hash,
                               extracted_text, analysis_json, category, confidence,
                               customer_id, resolution, resolution_json, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&document_id)
    .bind(&record.file_name)
    .bind(&record.source_path)
    .bind(&record.content_type)
    .bind(&record.content_hash)
    .bind(&record.extracted_text)
    .bind(&record.analysis_json)
    .bind(&record.category)
    .bind(record.confidence)
    .bind(&customer_id)
    .bind(resolution.action())
    .bind(&resolution_json)
    .bind(actor)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await.context("Failed to commit resolution")?;

    Ok(StoredDocument {
        document_id,
        customer_id,
    })
}

/// Contact created when a document resolves to a new customer but carries no
/// usable name. The lead status flags it for enrichment.
fn placeholder_contact(file_name: &str) -> NewContact {
    NewContact {
        first_name: "Unknown".to_string(),
        last_name: format!("({})", file_name),
        lead_status: "needs_review".to_string(),
        ..Default::default()
    }
}
