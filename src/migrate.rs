use anyhow::Result;

use crate::config::Config;
use crate::db;

/// Create the contact and document tables. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            company TEXT,
            email TEXT,
            phone TEXT,
            address TEXT,
            lead_status TEXT NOT NULL DEFAULT 'new',
            assigned_to TEXT,
            created_by TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            source_path TEXT,
            content_type TEXT NOT NULL DEFAULT 'application/octet-stream',
            content_hash TEXT NOT NULL,
            extracted_text TEXT NOT NULL DEFAULT '',
            analysis_json TEXT NOT NULL DEFAULT '{}',
            category TEXT NOT NULL DEFAULT 'other',
            confidence REAL NOT NULL DEFAULT 0.0,
            customer_id TEXT,
            resolution TEXT NOT NULL,
            resolution_json TEXT NOT NULL DEFAULT '{}',
            created_by TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (customer_id) REFERENCES contacts(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_email ON contacts(email)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_phone ON contacts(phone)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_customer_id ON documents(customer_id)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_resolution ON documents(resolution)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
