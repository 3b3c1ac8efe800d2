//! Shared fixtures for integration tests: a temp database with migrations
//! applied, scripted model clients, and minimal document fixtures.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

use doc_intake::config::{Config, DbConfig, ModelConfig, ServerConfig, WalkerConfig};
use doc_intake::model::{ModelClient, ModelRequest, RequestKind};
use doc_intake::models::NewContact;
use doc_intake::{db, migrate, store};

pub fn test_config(root: &TempDir) -> Config {
    Config {
        db: DbConfig {
            path: root.path().join("data/intake.sqlite"),
        },
        model: ModelConfig::default(),
        server: ServerConfig::default(),
        walker: WalkerConfig::default(),
    }
}

pub async fn setup_db(root: &TempDir) -> SqlitePool {
    let config = test_config(root);
    migrate::run_migrations(&config).await.unwrap();
    db::connect(&config).await.unwrap()
}

pub async fn seed_contact(
    pool: &SqlitePool,
    first: &str,
    last: &str,
    email: Option<&str>,
    phone: Option<&str>,
) -> String {
    let new = NewContact {
        first_name: first.to_string(),
        last_name: last.to_string(),
        company: None,
        email: email.map(|s| s.to_string()),
        phone: phone.map(|s| s.to_string()),
        address: None,
        lead_status: "new".to_string(),
    };
    store::create_contact(pool, &new, "seed").await.unwrap().id
}

/// A model whose every call fails; all stages degrade to their defaults.
pub struct FailingModel;

#[async_trait]
impl ModelClient for FailingModel {
    async fn complete(&self, _request: ModelRequest) -> Result<serde_json::Value> {
        anyhow::bail!("model unavailable")
    }
}

/// A model scripted per stage. Analysis stages answer `{}` (pure defaults)
/// unless overridden; identifier and validation responses are injected by
/// the test.
pub struct ScriptedModel {
    pub identifiers: serde_json::Value,
    pub validation: Option<serde_json::Value>,
}

impl ScriptedModel {
    pub fn new(identifiers: serde_json::Value, validation: Option<serde_json::Value>) -> Self {
        Self {
            identifiers,
            validation,
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, request: ModelRequest) -> Result<serde_json::Value> {
        match request.kind {
            RequestKind::IdentifierExtraction => Ok(self.identifiers.clone()),
            RequestKind::MatchValidation => match &self.validation {
                Some(v) => Ok(v.clone()),
                None => anyhow::bail!("validation scripted to fail"),
            },
            _ => Ok(serde_json::json!({})),
        }
    }
}

/// Minimal valid PDF containing `phrase`, with a correct xref table so
/// pdf-extract can parse it.
pub fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET\n", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}endstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// A zip archive with the given (name, bytes) entries.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, bytes) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

/// Temp directories left behind by archive extraction, if any.
pub fn leftover_archive_workspaces() -> Vec<PathBuf> {
    let tmp = std::env::temp_dir();
    std::fs::read_dir(&tmp)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .map(|n| n.to_string_lossy().starts_with("intake-archive-"))
                        .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default()
}
