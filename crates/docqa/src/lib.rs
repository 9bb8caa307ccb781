//! # docqa
//!
//! **Upload a document, then ask questions answered from its own text.**
//!
//! The retrieval pipeline (chunking, nearest-neighbor search, adaptive
//! top-k, outlier filtering) lives in [`docqa_core`]. This crate supplies
//! everything around it: SQLite storage, remote embedding and answer
//! providers, text extraction, the `docqa` CLI, and a JSON HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────┐
//! │ Extract  │──▶│ Chunk+Embed  │──▶│  SQLite   │
//! │ PDF/text │   │ (docqa-core) │   │ passages  │
//! └──────────┘   └──────────────┘   └─────┬─────┘
//!                                         │ top-k, L2
//!                      ┌──────────────────┤
//!                      ▼                  ▼
//!                 ┌──────────┐      ┌──────────┐
//!                 │   CLI    │      │   HTTP   │
//!                 │ (docqa)  │      │  (axum)  │
//!                 └──────────┘      └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL and foreign keys |
//! | [`migrate`] | Idempotent schema creation |
//! | [`sqlite_store`] | `PassageStore` over SQLite |
//! | [`http`] | JSON POST with retry/backoff for providers |
//! | [`embedding`] | OpenAI, Gemini, Ollama, and disabled embedders |
//! | [`answer`] | Gemini, OpenAI, and disabled answer providers |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`upload`] | Notebook wiring and the upload path |
//! | [`server`] | HTTP API with CORS |

pub mod answer;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
pub mod upload;

pub use docqa_core::{store, Error};
