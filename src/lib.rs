//! # doc-intake
//!
//! CRM document intake: AI-assisted extraction, customer matching, and
//! resolution.
//!
//! The pipeline takes an uploaded or on-disk document, extracts its text,
//! analyzes it with an external AI model, pulls out customer-identifying
//! strings, matches them against the contact store with confidence scoring,
//! and resolves the document to an existing or new customer record.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────────────────┐   ┌──────────┐
//! │  Walker   │──▶│  Pipeline                    │──▶│  SQLite  │
//! │ fs + zip  │   │ extract → analyze → identify │   │ contacts │
//! └───────────┘   │ → search → validate → resolve│   │ documents│
//! ┌───────────┐   └───────────────┬──────────────┘   └──────────┘
//! │HTTP upload│──────────────────▶│
//! └───────────┘          ┌────────┴────────┐
//!                        ▼                 ▼
//!                  ┌──────────┐      ┌──────────┐
//!                  │   CLI    │      │   HTTP   │
//!                  │ (intake) │      │ (axum)   │
//!                  └──────────┘      └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Multi-format content extraction |
//! | [`model`] | AI model boundary (chat-completion JSON calls) |
//! | [`analysis`] | Concurrent transcription/classification/field extraction |
//! | [`identify`] | Customer-identifier extraction |
//! | [`candidates`] | Substring candidate search over the contact store |
//! | [`validate`] | Model-scored match validation |
//! | [`resolve`] | Threshold-based resolution state machine |
//! | [`walker`] | Recursive folder/archive walking |
//! | [`pipeline`] | Per-document stage orchestration |
//! | [`store`] | Contact/document persistence |
//! | [`server`] | JSON HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod analysis;
pub mod candidates;
pub mod config;
pub mod db;
pub mod extract;
pub mod identify;
pub mod migrate;
pub mod model;
pub mod models;
pub mod pipeline;
pub mod resolve;
pub mod server;
pub mod store;
pub mod validate;
pub mod walker;
