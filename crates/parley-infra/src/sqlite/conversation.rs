//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `parley-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, and RFC 3339 timestamps.

use parley_core::repository::conversation::ConversationRepository;
use parley_types::conversation::{Conversation, ConversationSummary, MessageRole, Utterance};
use parley_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationRepository`.
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn list_summaries(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM conversation_summaries WHERE conversation_id = ? ORDER BY created_at ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let summary_row =
                SummaryRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            summaries.push(summary_row.into_summary()?);
        }

        Ok(summaries)
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: String,
    character_id: String,
    created_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            character_id: row.try_get("character_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

struct UtteranceRow {
    id: String,
    conversation_id: String,
    role: String,
    sender: String,
    text: String,
    tokens: i64,
    created_at: String,
    summarized_by: Option<String>,
}

impl UtteranceRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            role: row.try_get("role")?,
            sender: row.try_get("sender")?,
            text: row.try_get("text")?,
            tokens: row.try_get("tokens")?,
            created_at: row.try_get("created_at")?,
            summarized_by: row.try_get("summarized_by")?,
        })
    }

    fn into_utterance(self) -> Result<Utterance, RepositoryError> {
        let id = parse_uuid(&self.id, "utterance id")?;
        let conversation_id = parse_uuid(&self.conversation_id, "conversation_id")?;
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let created_at = parse_datetime(&self.created_at)?;
        let summarized_by = self
            .summarized_by
            .as_deref()
            .map(|s| parse_uuid(s, "summarized_by"))
            .transpose()?;

        Ok(Utterance {
            id,
            conversation_id,
            role,
            sender: self.sender,
            text: self.text,
            tokens: self.tokens as u32,
            created_at,
            summarized_by,
        })
    }
}

struct SummaryRow {
    id: String,
    conversation_id: String,
    text: String,
    tokens: i64,
    utterance_count: i64,
    created_at: String,
}

impl SummaryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            text: row.try_get("text")?,
            tokens: row.try_get("tokens")?,
            utterance_count: row.try_get("utterance_count")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_summary(self) -> Result<ConversationSummary, RepositoryError> {
        Ok(ConversationSummary {
            id: parse_uuid(&self.id, "summary id")?,
            conversation_id: parse_uuid(&self.conversation_id, "conversation_id")?,
            text: self.text,
            tokens: self.tokens as u32,
            utterance_count: self.utterance_count as u32,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str, field: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {field}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// ConversationRepository implementation
// ---------------------------------------------------------------------------

impl ConversationRepository for SqliteConversationRepository {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO conversations (id, character_id, created_at) VALUES (?, ?, ?)")
            .bind(conversation.id.to_string())
            .bind(&conversation.character_id)
            .bind(format_datetime(&conversation.created_at))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.message().contains("UNIQUE") {
                        return RepositoryError::Conflict(format!(
                            "conversation {} already exists",
                            conversation.id
                        ));
                    }
                }
                RepositoryError::Query(e.to_string())
            })?;

        Ok(())
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let conversation_row =
            ConversationRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;

        let utterances = self.list_utterances(id).await?;
        let summaries = self.list_summaries(id).await?;

        Ok(Some(Conversation::restore(
            parse_uuid(&conversation_row.id, "conversation id")?,
            conversation_row.character_id,
            parse_datetime(&conversation_row.created_at)?,
            utterances,
            summaries,
        )))
    }

    async fn append_utterance(&self, utterance: &Utterance) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO utterances (id, conversation_id, role, sender, text, tokens, created_at, summarized_by)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(utterance.id.to_string())
        .bind(utterance.conversation_id.to_string())
        .bind(utterance.role.to_string())
        .bind(&utterance.sender)
        .bind(&utterance.text)
        .bind(utterance.tokens as i64)
        .bind(format_datetime(&utterance.created_at))
        .bind(utterance.summarized_by.map(|id| id.to_string()))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update_utterance(&self, utterance: &Utterance) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE utterances SET text = ?, tokens = ?, summarized_by = ? WHERE id = ?",
        )
        .bind(&utterance.text)
        .bind(utterance.tokens as i64)
        .bind(utterance.summarized_by.map(|id| id.to_string()))
        .bind(utterance.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_utterances(&self, conversation_id: &Uuid) -> Result<Vec<Utterance>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM utterances WHERE conversation_id = ? ORDER BY seq ASC")
            .bind(conversation_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut utterances = Vec::with_capacity(rows.len());
        for row in &rows {
            let utterance_row =
                UtteranceRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            utterances.push(utterance_row.into_utterance()?);
        }

        Ok(utterances)
    }

    async fn save_summary(
        &self,
        summary: &ConversationSummary,
        folded: &[Uuid],
    ) -> Result<(), RepositoryError> {
        // Summary insert and utterance marking land together or not at all
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO conversation_summaries (id, conversation_id, text, tokens, utterance_count, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(summary.id.to_string())
        .bind(summary.conversation_id.to_string())
        .bind(&summary.text)
        .bind(summary.tokens as i64)
        .bind(summary.utterance_count as i64)
        .bind(format_datetime(&summary.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for utterance_id in folded {
            sqlx::query(
                "UPDATE utterances SET summarized_by = ? WHERE id = ? AND conversation_id = ?",
            )
            .bind(summary.id.to_string())
            .bind(utterance_id.to_string())
            .bind(summary.conversation_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}
