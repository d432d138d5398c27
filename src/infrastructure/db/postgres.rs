use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::domain::error::{AppError, Result};
use crate::domain::paper::{Dismissal, Paper, Vote};

use super::TriageStore;

const SCHEMA: &str = include_str!("../../../resources/schema_postgres.sql");

/// Managed relational backend. The interest and seen tables carry real
/// composite uniqueness constraints, so duplicate inserts are rejected at
/// the store rather than only by the ballot delta.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn init(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        apply_schema(&pool).await?;

        Ok(Self { pool })
    }
}

async fn apply_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA.split(';') {
        let stmt = statement.trim();
        if stmt.is_empty() {
            continue;
        }
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to apply schema: {}", e)))?;
    }
    Ok(())
}

#[async_trait]
impl TriageStore for PostgresStore {
    async fn list_papers(&self) -> Result<Vec<Paper>> {
        let rows = sqlx::query_as::<_, PaperRow>(
            "SELECT doi, title, authors, abstract, link, category, date FROM papers",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list papers: {}", e)))?;

        Ok(rows.into_iter().map(PaperRow::into_paper).collect())
    }

    async fn list_papers_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Paper>> {
        let rows = sqlx::query_as::<_, PaperRow>(
            "SELECT doi, title, authors, abstract, link, category, date FROM papers
             WHERE date >= $1 AND date <= $2 ORDER BY date DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list papers: {}", e)))?;

        Ok(rows.into_iter().map(PaperRow::into_paper).collect())
    }

    async fn known_dois(&self) -> Result<HashSet<String>> {
        let dois: Vec<String> = sqlx::query_scalar("SELECT doi FROM papers")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch DOIs: {}", e)))?;
        Ok(dois.into_iter().collect())
    }

    async fn insert_papers(&self, papers: &[Paper]) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let mut inserted = 0u64;
        for paper in papers {
            let result = sqlx::query(
                "INSERT INTO papers (doi, title, authors, abstract, link, category, date)
                 VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (doi) DO NOTHING",
            )
            .bind(&paper.doi)
            .bind(&paper.title)
            .bind(&paper.authors)
            .bind(&paper.abstract_text)
            .bind(&paper.link)
            .bind(&paper.category)
            .bind(paper.date)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert paper: {}", e)))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit: {}", e)))?;
        Ok(inserted)
    }

    async fn list_votes(&self) -> Result<Vec<Vote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            r#"SELECT doi, "user", "timestamp" FROM interest"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list votes: {}", e)))?;

        Ok(rows.into_iter().map(VoteRow::into_vote).collect())
    }

    async fn voted_dois_for_user(&self, user: &str) -> Result<HashSet<String>> {
        let dois: Vec<String> =
            sqlx::query_scalar(r#"SELECT doi FROM interest WHERE "user" = $1"#)
                .bind(user)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to fetch votes: {}", e)))?;
        Ok(dois.into_iter().collect())
    }

    async fn insert_votes(&self, votes: &[Vote]) -> Result<u64> {
        let mut inserted = 0u64;
        for vote in votes {
            let result = sqlx::query(
                r#"INSERT INTO interest (doi, "user", "timestamp") VALUES ($1, $2, $3)
                   ON CONFLICT (doi, "user") DO NOTHING"#,
            )
            .bind(&vote.doi)
            .bind(&vote.user)
            .bind(vote.timestamp)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert vote: {}", e)))?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn delete_votes(&self, user: &str, dois: &[String]) -> Result<u64> {
        let result =
            sqlx::query(r#"DELETE FROM interest WHERE "user" = $1 AND doi = ANY($2)"#)
                .bind(user)
                .bind(dois)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to delete votes: {}", e)))?;
        Ok(result.rows_affected())
    }

    async fn dismissed_dois_for_user(&self, user: &str) -> Result<HashSet<String>> {
        let dois: Vec<String> = sqlx::query_scalar(r#"SELECT doi FROM seen WHERE "user" = $1"#)
            .bind(user)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch dismissals: {}", e)))?;
        Ok(dois.into_iter().collect())
    }

    async fn insert_dismissals(&self, dismissals: &[Dismissal]) -> Result<u64> {
        let mut inserted = 0u64;
        for dismissal in dismissals {
            let result = sqlx::query(
                r#"INSERT INTO seen (doi, "user") VALUES ($1, $2)
                   ON CONFLICT (doi, "user") DO NOTHING"#,
            )
            .bind(&dismissal.doi)
            .bind(&dismissal.user)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to insert dismissal: {}", e))
            })?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }
}

// Internal entities for database mapping.
#[derive(sqlx::FromRow)]
struct PaperRow {
    doi: String,
    title: String,
    authors: String,
    #[sqlx(rename = "abstract")]
    abstract_text: String,
    link: String,
    category: String,
    date: NaiveDate,
}

impl PaperRow {
    fn into_paper(self) -> Paper {
        Paper {
            doi: self.doi,
            title: self.title,
            authors: self.authors,
            abstract_text: self.abstract_text,
            link: self.link,
            category: self.category,
            date: self.date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    doi: String,
    user: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl VoteRow {
    fn into_vote(self) -> Vote {
        Vote {
            doi: self.doi,
            user: self.user,
            timestamp: self.timestamp,
        }
    }
}
