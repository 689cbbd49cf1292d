use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub type DbPool = PgPool;

pub async fn create_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Bring up the document tables on a fresh database. Subjects are
/// seeded by the wider product; this server only reads them.
pub async fn init_schema(pool: &DbPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            title TEXT NOT NULL,
            collaborators UUID[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id UUID PRIMARY KEY,
            subject_id UUID NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
            parent_id UUID,
            author_id UUID NOT NULL,
            author_display_name TEXT NOT NULL,
            author_avatar_url TEXT,
            text TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            edited_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS comments_subject_created_idx
         ON comments (subject_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
