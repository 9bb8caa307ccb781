//! # docqa Core
//!
//! Retrieval pipeline for docqa: data models, chunking, the passage store
//! abstraction, adaptive top-k sizing, statistical outlier filtering, and
//! the notebook service that ties them to the embedding and answer ports.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or network
//! dependencies. Concrete stores and providers live in the `docqa` app crate.
//!
//! ```text
//! ingest:  text ─▶ chunk ─▶ Embedder ─▶ PassageStore
//! ask:     question ─▶ Embedder ─▶ select_k ─▶ query_nearest
//!                   ─▶ filter_outliers ─▶ join_context ─▶ AnswerSynthesizer
//! ```

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod models;
pub mod notebook;
pub mod retrieve;
pub mod select;
pub mod store;

pub use error::{Error, Result};
