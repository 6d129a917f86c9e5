//! SQLite store for documents, chunks and conversations.
//!
//! Uses a single SQLite database file with three tables:
//! - `documents`: one row per (assistant, filename, owner); shared
//!   documents store owner `''`
//! - `chunks`: embedded slices, cascading on document deletion; the
//!   embedding is a little-endian f32 BLOB
//! - `messages`: conversation turns keyed by (user, assistant)
//!
//! Integer rowids give chunks and messages a stable insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ragdesk_core::document::{Chunk, Document, DocumentStatus};
use ragdesk_core::error::StoreError;
use ragdesk_core::message::{ConversationKey, Message, Role};
use ragdesk_core::store::{DocumentStore, MessageStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// A SQLite-backed document and message store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// The database and all tables/indexes are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // Every connection to ":memory:" is a separate database.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements: [(&str, &str); 6] = [
            (
                "documents table",
                r#"
                CREATE TABLE IF NOT EXISTS documents (
                    id          TEXT PRIMARY KEY,
                    assistant   TEXT NOT NULL,
                    filename    TEXT NOT NULL,
                    owner       TEXT NOT NULL DEFAULT '',
                    status      TEXT NOT NULL,
                    created_at  TEXT NOT NULL,
                    UNIQUE (assistant, filename, owner)
                )
                "#,
            ),
            (
                "chunks table",
                r#"
                CREATE TABLE IF NOT EXISTS chunks (
                    iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                    id           TEXT UNIQUE NOT NULL,
                    document_id  TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                    assistant    TEXT NOT NULL,
                    content      TEXT NOT NULL,
                    embedding    BLOB NOT NULL
                )
                "#,
            ),
            (
                "chunks assistant index",
                "CREATE INDEX IF NOT EXISTS idx_chunks_assistant ON chunks(assistant, iid)",
            ),
            (
                "chunks document index",
                "CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id)",
            ),
            (
                "messages table",
                r#"
                CREATE TABLE IF NOT EXISTS messages (
                    iid         INTEGER PRIMARY KEY AUTOINCREMENT,
                    id          TEXT UNIQUE NOT NULL,
                    user_id     TEXT NOT NULL,
                    assistant   TEXT NOT NULL,
                    role        TEXT NOT NULL,
                    content     TEXT NOT NULL,
                    created_at  TEXT NOT NULL
                )
                "#,
            ),
            (
                "messages key index",
                "CREATE INDEX IF NOT EXISTS idx_messages_key ON messages(user_id, assistant, iid)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{what}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
    where
        T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
    {
        row.try_get(name)
            .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
    }

    fn parse_time(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_document(row: &SqliteRow) -> Result<Document, StoreError> {
        let owner: String = Self::column(row, "owner")?;
        let status: String = Self::column(row, "status")?;
        let created_at: String = Self::column(row, "created_at")?;

        Ok(Document {
            id: Self::column(row, "id")?,
            assistant: Self::column(row, "assistant")?,
            filename: Self::column(row, "filename")?,
            owner: (!owner.is_empty()).then_some(owner),
            status: DocumentStatus::from_str(&status).map_err(StoreError::QueryFailed)?,
            created_at: Self::parse_time(&created_at),
        })
    }

    fn row_to_chunk(row: &SqliteRow) -> Result<Chunk, StoreError> {
        let blob: Vec<u8> = Self::column(row, "embedding")?;
        Ok(Chunk {
            id: Self::column(row, "id")?,
            document_id: Self::column(row, "document_id")?,
            assistant: Self::column(row, "assistant")?,
            content: Self::column(row, "content")?,
            embedding: Self::blob_to_embedding(&blob),
        })
    }

    fn row_to_message(row: &SqliteRow) -> Result<Message, StoreError> {
        let role: String = Self::column(row, "role")?;
        let created_at: String = Self::column(row, "created_at")?;
        Ok(Message {
            id: Self::column(row, "id")?,
            role: Role::from_str(&role).map_err(StoreError::QueryFailed)?,
            content: Self::column(row, "content")?,
            timestamp: Self::parse_time(&created_at),
        })
    }

    /// Serialize an embedding vector to bytes.
    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert_document(
        &self,
        assistant: &str,
        filename: &str,
        owner: Option<&str>,
    ) -> Result<Document, StoreError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            r#"
            INSERT INTO documents (id, assistant, filename, owner, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(assistant, filename, owner) DO UPDATE SET filename = excluded.filename
            RETURNING id, assistant, filename, owner, status, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(assistant)
        .bind(filename)
        .bind(owner.unwrap_or(""))
        .bind(DocumentStatus::Uploaded.as_str())
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Document upsert failed: {e}")))?;

        Self::row_to_document(&row)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET document: {e}")))?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn set_document_status(&self, id: &str, status: DocumentStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE documents SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("Status update failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {id}")));
        }
        Ok(())
    }

    async fn list_documents(
        &self,
        assistant: &str,
        owner: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM documents
            WHERE assistant = ?1 AND (?2 IS NULL OR owner = ?2)
            ORDER BY created_at, rowid
            "#,
        )
        .bind(assistant)
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("List documents: {e}")))?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn delete_document(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        for chunk in &chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, document_id, assistant, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(&chunk.assistant)
            .bind(&chunk.content)
            .bind(Self::embedding_to_blob(&chunk.embedding))
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("Chunk insert failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(count = chunks.len(), "Stored chunks");
        Ok(())
    }

    async fn count_document_chunks(&self, document_id: &str) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM chunks WHERE document_id = ?1")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT chunks: {e}")))?;

        let cnt: i64 = Self::column(&row, "cnt")?;
        Ok(cnt as usize)
    }

    async fn count_assistant_chunks(&self, assistant: &str) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM chunks WHERE assistant = ?1")
            .bind(assistant)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT chunks: {e}")))?;

        let cnt: i64 = Self::column(&row, "cnt")?;
        Ok(cnt as usize)
    }

    async fn scan_chunks(&self, assistant: &str, owner: Option<&str>) -> Result<Vec<Chunk>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.document_id, c.assistant, c.content, c.embedding
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE c.assistant = ?1
              AND (?2 IS NULL OR d.owner = '' OR d.owner = ?2)
            ORDER BY c.iid
            "#,
        )
        .bind(assistant)
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Chunk scan: {e}")))?;

        rows.iter().map(Self::row_to_chunk).collect()
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append_message(&self, key: &ConversationKey, message: Message) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, user_id, assistant, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&message.id)
        .bind(&key.user)
        .bind(&key.assistant)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Message insert failed: {e}")))?;

        Ok(())
    }

    async fn recent_messages(&self, key: &ConversationKey, limit: usize) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT * FROM messages
                WHERE user_id = ?1 AND assistant = ?2
                ORDER BY iid DESC
                LIMIT ?3
            ) ORDER BY iid ASC
            "#,
        )
        .bind(&key.user)
        .bind(&key.assistant)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Recent messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn all_messages(&self, key: &ConversationKey) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE user_id = ?1 AND assistant = ?2 ORDER BY iid",
        )
        .bind(&key.user)
        .bind(&key.assistant)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("All messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn count_non_system(&self, key: &ConversationKey) -> Result<usize, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt FROM messages
            WHERE user_id = ?1 AND assistant = ?2 AND role != 'system'
            "#,
        )
        .bind(&key.user)
        .bind(&key.assistant)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("COUNT messages: {e}")))?;

        let cnt: i64 = Self::column(&row, "cnt")?;
        Ok(cnt as usize)
    }

    async fn replace_conversation(&self, key: &ConversationKey, replacement: Message) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        sqlx::query("DELETE FROM messages WHERE user_id = ?1 AND assistant = ?2")
            .bind(&key.user)
            .bind(&key.assistant)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("Conversation delete failed: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO messages (id, user_id, assistant, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&replacement.id)
        .bind(&key.user)
        .bind(&key.assistant)
        .bind(replacement.role.as_str())
        .bind(&replacement.content)
        .bind(replacement.timestamp.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Storage(format!("Summary insert failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(conversation = %key, "Conversation replaced by summary");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn upsert_returns_existing_document() {
        let db = test_store().await;
        let a = db.upsert_document("shop", "faq.txt", None).await.unwrap();
        let b = db.upsert_document("shop", "faq.txt", None).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.status, DocumentStatus::Uploaded);
        assert!(a.owner.is_none());

        let owned = db.upsert_document("shop", "faq.txt", Some("42")).await.unwrap();
        assert_ne!(owned.id, a.id);
        assert_eq!(owned.owner.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn status_transitions_persist() {
        let db = test_store().await;
        let doc = db.upsert_document("shop", "faq.txt", None).await.unwrap();
        db.set_document_status(&doc.id, DocumentStatus::Processing).await.unwrap();
        db.set_document_status(&doc.id, DocumentStatus::Ready).await.unwrap();
        let fetched = db.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Ready);

        let again = db.upsert_document("shop", "faq.txt", None).await.unwrap();
        assert_eq!(again.status, DocumentStatus::Ready);
    }

    #[tokio::test]
    async fn status_of_unknown_document_is_not_found() {
        let db = test_store().await;
        let err = db.set_document_status("nope", DocumentStatus::Ready).await;
        assert!(matches!(err, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn embedding_round_trip() {
        let db = test_store().await;
        let doc = db.upsert_document("shop", "faq.txt", None).await.unwrap();
        let emb = vec![0.25, -1.5, 3.0];
        db.insert_chunks(vec![Chunk::new(&doc, "text".into(), emb.clone())])
            .await
            .unwrap();

        let chunks = db.scan_chunks("shop", None).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].embedding, emb);
        assert_eq!(db.count_document_chunks(&doc.id).await.unwrap(), 1);
        assert_eq!(db.count_assistant_chunks("shop").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scan_preserves_insertion_order_and_owner_filter() {
        let db = test_store().await;
        let shared = db.upsert_document("shop", "faq.txt", None).await.unwrap();
        let private = db.upsert_document("shop", "notes.txt", Some("7")).await.unwrap();
        db.insert_chunks(vec![
            Chunk::new(&shared, "c1".into(), vec![1.0]),
            Chunk::new(&private, "c2".into(), vec![1.0]),
            Chunk::new(&shared, "c3".into(), vec![1.0]),
        ])
        .await
        .unwrap();

        let all: Vec<_> = db
            .scan_chunks("shop", None)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(all, vec!["c1", "c2", "c3"]);

        assert_eq!(db.scan_chunks("shop", Some("7")).await.unwrap().len(), 3);
        assert_eq!(db.scan_chunks("shop", Some("8")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_batch_inserts_nothing() {
        let db = test_store().await;
        let doc = db.upsert_document("shop", "faq.txt", None).await.unwrap();
        let ghost = Document::new("shop", "ghost.txt", None);
        let result = db
            .insert_chunks(vec![
                Chunk::new(&doc, "ok".into(), vec![1.0]),
                Chunk::new(&ghost, "orphan".into(), vec![1.0]),
            ])
            .await;
        assert!(result.is_err());
        assert_eq!(db.count_document_chunks(&doc.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_cascades_to_chunks() {
        let db = test_store().await;
        let doc = db.upsert_document("shop", "faq.txt", None).await.unwrap();
        db.insert_chunks(vec![Chunk::new(&doc, "a".into(), vec![1.0])])
            .await
            .unwrap();

        assert!(db.delete_document(&doc.id).await.unwrap());
        assert!(!db.delete_document(&doc.id).await.unwrap());
        assert_eq!(db.count_assistant_chunks("shop").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_documents_filters_by_owner() {
        let db = test_store().await;
        db.upsert_document("shop", "a.txt", None).await.unwrap();
        db.upsert_document("shop", "b.txt", Some("1")).await.unwrap();
        db.upsert_document("other", "c.txt", None).await.unwrap();

        assert_eq!(db.list_documents("shop", None).await.unwrap().len(), 2);
        let mine = db.list_documents("shop", Some("1")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].filename, "b.txt");
    }

    #[tokio::test]
    async fn recent_messages_are_oldest_first() {
        let db = test_store().await;
        let key = ConversationKey::new("u1", "shop");
        for i in 0..15 {
            db.append_message(&key, Message::user(format!("m{i}"))).await.unwrap();
        }
        let recent = db.recent_messages(&key, 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "m5");
        assert_eq!(recent[9].content, "m14");

        let other = ConversationKey::new("u2", "shop");
        assert!(db.recent_messages(&other, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_conversation_is_atomic_swap() {
        let db = test_store().await;
        let key = ConversationKey::new("u1", "shop");
        db.append_message(&key, Message::user("q")).await.unwrap();
        db.append_message(&key, Message::assistant("a")).await.unwrap();
        db.append_message(&key, Message::system("old summary")).await.unwrap();
        assert_eq!(db.count_non_system(&key).await.unwrap(), 2);

        db.replace_conversation(&key, Message::system("new summary")).await.unwrap();
        let all = db.all_messages(&key).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].role, Role::System);
        assert_eq!(all[0].content, "new summary");
    }

    #[tokio::test]
    async fn store_name() {
        assert_eq!(test_store().await.name(), "sqlite");
    }
}
