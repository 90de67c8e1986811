use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Stored document: a unique key plus free-form text content.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub key: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Default)]
pub struct DocumentChanges {
    pub key: Option<String>,
    pub content: Option<String>,
}

impl Document {
    pub async fn create(db: &PgPool, key: &str, content: &str) -> anyhow::Result<Document> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (key, content)
            VALUES ($1, $2)
            RETURNING id, key, content, created_at, updated_at
            "#,
        )
        .bind(key)
        .bind(content)
        .fetch_one(db)
        .await?;
        Ok(document)
    }

    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, key, content, created_at, updated_at
            FROM documents
            ORDER BY created_at
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(documents)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, key, content, created_at, updated_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(document)
    }

    /// Partial update; absent fields keep their stored value.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: &DocumentChanges,
    ) -> anyhow::Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET key = COALESCE($2, key),
                content = COALESCE($3, content),
                updated_at = now()
            WHERE id = $1
            RETURNING id, key, content, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.key.as_deref())
        .bind(changes.content.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(document)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
