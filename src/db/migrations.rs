//! Embedded PostgreSQL schema migrations.
//!
//! Each migration is a list of single statements applied inside one
//! transaction and recorded in `schema_migrations`, so restarts only apply
//! what is new.

use sqlx::PgPool;
use crate::{AppError, Result};

#[derive(Debug, Clone)]
pub struct Migration {
    /// Unique, applied in ascending order
    pub version: i32,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                full_name TEXT,
                bio TEXT,
                avatar_url TEXT,
                location TEXT,
                website TEXT,
                user_type TEXT NOT NULL DEFAULT 'individual',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username_lower ON users (LOWER(username))",
        ],
    },
    Migration {
        version: 2,
        name: "create_content",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id UUID PRIMARY KEY,
                owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT,
                repository_url TEXT,
                tags TEXT[] NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id UUID PRIMARY KEY,
                author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                summary TEXT,
                cover_image_url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id UUID PRIMARY KEY,
                author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                image_url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects (owner_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_articles_author ON articles (author_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts (author_id, created_at DESC)",
        ],
    },
    Migration {
        version: 3,
        name: "create_engagement",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id UUID PRIMARY KEY,
                target_kind TEXT NOT NULL,
                target_id UUID NOT NULL,
                author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_comments_target ON comments (target_kind, target_id, created_at)",
            r#"
            CREATE TABLE IF NOT EXISTS likes (
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                target_kind TEXT NOT NULL,
                target_id UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (user_id, target_kind, target_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_likes_target ON likes (target_kind, target_id)",
            r#"
            CREATE TABLE IF NOT EXISTS follows (
                follower_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                followee_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id <> followee_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows (followee_id)",
            r#"
            CREATE TABLE IF NOT EXISTS watches (
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (user_id, project_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_watches_project ON watches (project_id)",
        ],
    },
];

/// Applies pending migrations and returns how many ran.
pub async fn run_migrations(pool: &PgPool) -> Result<usize> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to create schema_migrations: {}", e)))?;

    let applied: Vec<i32> = sqlx::query_scalar("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read applied migrations: {}", e)))?;

    let mut ran = 0;
    for migration in pending(MIGRATIONS, &applied) {
        tracing::info!("🔄 DATABASE: Applying migration {} ({})", migration.version, migration.name);

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to start migration transaction: {}", e)))?;

        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                AppError::DatabaseError(format!("Migration {} failed: {}", migration.name, e))
            })?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to record migration: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit migration {}: {}", migration.name, e)))?;
        ran += 1;
    }

    if ran > 0 {
        tracing::info!("✅ DATABASE: Applied {} migration(s)", ran);
    }
    Ok(ran)
}

fn pending<'a>(migrations: &'a [Migration], applied: &[i32]) -> Vec<&'a Migration> {
    let mut pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect();
    pending.sort_by_key(|m| m.version);
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_versions_are_unique() {
        let versions: HashSet<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert_eq!(versions.len(), MIGRATIONS.len());
    }

    #[test]
    fn test_pending_skips_applied() {
        let pending = pending(MIGRATIONS, &[1]);
        let versions: Vec<i32> = pending.iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![2, 3]);
    }

    #[test]
    fn test_statements_are_single() {
        // The extended query protocol rejects multi-statement strings
        for migration in MIGRATIONS {
            for statement in migration.statements {
                assert!(!statement.trim().trim_end_matches(';').contains(';'), "{}", migration.name);
            }
        }
    }
}
