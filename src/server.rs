//! JSON HTTP API.
//!
//! A thin collaborator surface over the pipeline and the contact store.
//! Every response uses the `{success, data}` / `{success, error}` envelope;
//! detailed errors are logged server-side and callers get a generic message.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Version check |
//! | `GET`  | `/api/contacts` | List contacts (most recent first) |
//! | `POST` | `/api/contacts` | Create a contact |
//! | `GET`  | `/api/contacts/{id}` | Fetch one contact |
//! | `POST` | `/api/documents/process` | Upload a document and run the pipeline |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::config::Config;
use crate::model::ModelClient;
use crate::models::NewContact;
use crate::pipeline::Pipeline;
use crate::store;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(Envelope {
            success: true,
            data: Some(data),
            error: None,
        }),
    )
        .into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(Envelope::<()> {
            success: false,
            data: None,
            error: Some(message.to_string()),
        }),
    )
        .into_response()
}

/// Start the HTTP API on the configured bind address.
pub async fn run_server(
    config: &Config,
    pool: sqlx::SqlitePool,
    model: Arc<dyn ModelClient>,
) -> anyhow::Result<()> {
    let state = AppState {
        pipeline: Arc::new(Pipeline::new(pool, model)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/contacts/{id}", get(get_contact))
        .route("/api/documents/process", post(process_document))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("intake API listening on {}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Response {
    ok(
        StatusCode::OK,
        serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }),
    )
}

async fn list_contacts(State(state): State<AppState>) -> Response {
    match store::list_contacts(state.pipeline.pool(), 100).await {
        Ok(contacts) => ok(StatusCode::OK, contacts),
        Err(e) => {
            error!(error = %e, "contact listing failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list contacts")
        }
    }
}

async fn get_contact(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match store::get_contact(state.pipeline.pool(), &id).await {
        Ok(Some(contact)) => ok(StatusCode::OK, contact),
        Ok(None) => fail(StatusCode::NOT_FOUND, "Contact not found"),
        Err(e) => {
            error!(error = %e, contact_id = %id, "contact fetch failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch contact")
        }
    }
}

#[derive(Deserialize)]
struct CreateContactRequest {
    #[serde(flatten)]
    contact: NewContact,
    actor: String,
}

async fn create_contact(
    State(state): State<AppState>,
    Json(req): Json<CreateContactRequest>,
) -> Response {
    if req.contact.first_name.trim().is_empty() && req.contact.last_name.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Contact name must not be empty");
    }
    if req.actor.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "actor is required");
    }

    match store::create_contact(state.pipeline.pool(), &req.contact, &req.actor).await {
        Ok(contact) => ok(StatusCode::CREATED, contact),
        Err(e) => {
            error!(error = %e, "contact creation failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create contact")
        }
    }
}

#[derive(Deserialize)]
struct ProcessDocumentRequest {
    file_name: String,
    content_base64: String,
    actor: String,
}

async fn process_document(
    State(state): State<AppState>,
    Json(req): Json<ProcessDocumentRequest>,
) -> Response {
    if req.file_name.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "file_name must not be empty");
    }
    if req.actor.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "actor is required");
    }

    let bytes = match base64::engine::general_purpose::STANDARD.decode(&req.content_base64) {
        Ok(bytes) => bytes,
        Err(_) => return fail(StatusCode::BAD_REQUEST, "content_base64 is not valid base64"),
    };

    match state
        .pipeline
        .process_bytes(&bytes, &req.file_name, None, &req.actor)
        .await
    {
        Ok(doc) => ok(StatusCode::OK, doc),
        Err(e) => {
            error!(error = %e, file_name = %req.file_name, "document processing failed");
            fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Document processing failed",
            )
        }
    }
}
