//! SQLite-backed [`PassageStore`] implementation.
//!
//! Vectors are stored as little-endian `f32` BLOBs next to the passage
//! text and scored in process with the same L2 distance the in-memory
//! store uses. Every write is either a single statement or a transaction
//! that opens with a write, so concurrent uploads queue on SQLite's busy
//! timeout rather than failing.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docqa_core::embedding::{blob_to_vec, l2_distance, vec_to_blob};
use docqa_core::models::{format_ts_iso, Document, DocumentSummary, Passage, ScoredPassage};
use docqa_core::store::{rank_nearest, PassageStore};

/// SQLite implementation of the [`PassageStore`] trait.
///
/// Expects the schema created by [`migrate_pool`](crate::migrate::migrate_pool).
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_passage(row: &SqliteRow) -> Passage {
    let idx: i64 = row.get("idx");
    let blob: Vec<u8> = row.get("embedding");
    Passage {
        id: row.get("id"),
        document_id: row.get("document_id"),
        index: idx as usize,
        text: row.get("text"),
        hash: row.get("hash"),
        embedding: blob_to_vec(&blob),
    }
}

#[async_trait]
impl PassageStore for SqliteStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query("INSERT INTO documents (id, name, text, created_at) VALUES (?, ?, ?, ?)")
            .bind(&doc.id)
            .bind(&doc.name)
            .bind(&doc.text)
            .bind(doc.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_passage(&self, document_id: &str, passage: &Passage) -> Result<()> {
        let dims = passage.embedding.len() as i64;

        // One statement, so the write lock is taken up front and concurrent
        // writers wait on the busy timeout instead of failing a lock upgrade.
        let inserted = sqlx::query(
            r#"
            INSERT INTO passages (id, document_id, idx, text, hash, embedding, dims)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
            WHERE EXISTS (SELECT 1 FROM documents WHERE id = ?2)
              AND (?7 = 0 OR NOT EXISTS (
                  SELECT 1 FROM passages
                  WHERE document_id = ?2 AND dims > 0 AND dims != ?7 AND idx != ?3
              ))
            ON CONFLICT(document_id, idx) DO UPDATE SET
                id = excluded.id,
                text = excluded.text,
                hash = excluded.hash,
                embedding = excluded.embedding,
                dims = excluded.dims
            "#,
        )
        .bind(&passage.id)
        .bind(document_id)
        .bind(passage.index as i64)
        .bind(&passage.text)
        .bind(&passage.hash)
        .bind(vec_to_blob(&passage.embedding))
        .bind(dims)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            return Ok(());
        }

        if self.get_document(document_id).await?.is_none() {
            bail!("cannot attach passage to unknown document {}", document_id);
        }
        let expected: Option<i64> = sqlx::query_scalar(
            "SELECT dims FROM passages WHERE document_id = ? AND dims > 0 AND idx != ? LIMIT 1",
        )
        .bind(document_id)
        .bind(passage.index as i64)
        .fetch_optional(&self.pool)
        .await?;
        bail!(
            "embedding dimension mismatch for document {}: expected {}, got {}",
            document_id,
            expected.unwrap_or_default(),
            dims
        );
    }

    async fn query_nearest(
        &self,
        document_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, document_id, idx, text, hash, embedding
            FROM passages
            WHERE document_id = ? AND dims = ?
            "#,
        )
        .bind(document_id)
        .bind(query.len() as i64)
        .fetch_all(&self.pool)
        .await?;

        let scored: Vec<ScoredPassage> = rows
            .iter()
            .map(row_to_passage)
            .filter_map(|passage| {
                l2_distance(query, &passage.embedding)
                    .map(|distance| ScoredPassage { passage, distance })
            })
            .collect();

        Ok(rank_nearest(scored, k))
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT id, name, text, created_at FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Document {
            id: r.get("id"),
            name: r.get("name"),
            text: r.get("text"),
            created_at: r.get("created_at"),
        }))
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.name, d.created_at,
                   COUNT(p.id) AS passages,
                   COALESCE(SUM(CASE WHEN p.dims > 0 THEN 1 ELSE 0 END), 0) AS embedded
            FROM documents d
            LEFT JOIN passages p ON p.document_id = d.id
            GROUP BY d.id
            ORDER BY d.created_at ASC, d.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let created_at: i64 = r.get("created_at");
                let passages: i64 = r.get("passages");
                let embedded: i64 = r.get("embedded");
                DocumentSummary {
                    id: r.get("id"),
                    name: r.get("name"),
                    created_at: format_ts_iso(created_at),
                    passages: passages as usize,
                    embedded: embedded as usize,
                }
            })
            .collect())
    }

    async fn passages(&self, document_id: &str) -> Result<Vec<Passage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, idx, text, hash, embedding
            FROM passages
            WHERE document_id = ?
            ORDER BY idx ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_passage).collect())
    }

    async fn delete_passages(&self, document_id: &str) -> Result<usize> {
        let removed = sqlx::query("DELETE FROM passages WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed as usize)
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM passages WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn delete_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM passages").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM documents").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}
