use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::domain::error::{AppError, Result};
use crate::domain::paper::{Dismissal, Paper, Vote};

use super::TriageStore;

const SCHEMA: &str = include_str!("../../../resources/schema_sqlite.sql");

/// Embedded file database backend.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn init(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        apply_schema(&pool).await?;

        Ok(Self { pool })
    }
}

async fn apply_schema(pool: &SqlitePool) -> Result<()> {
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
impl TriageStore for SqliteStore {
    async fn list_papers(&self) -> Result<Vec<Paper>> {
        let rows = sqlx::query_as::<_, PaperRow>(
            "SELECT doi, title, authors, abstract, link, category, date FROM papers",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list papers: {}", e)))?;

        rows.into_iter().map(PaperRow::into_paper).collect()
    }

    async fn list_papers_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Paper>> {
        // Dates are stored as ISO-8601 text, so string comparison orders
        // them correctly.
        let rows = sqlx::query_as::<_, PaperRow>(
            "SELECT doi, title, authors, abstract, link, category, date FROM papers
             WHERE date >= ? AND date <= ? ORDER BY date DESC",
        )
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list papers: {}", e)))?;

        rows.into_iter().map(PaperRow::into_paper).collect()
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
                "INSERT OR IGNORE INTO papers (doi, title, authors, abstract, link, category, date)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&paper.doi)
            .bind(&paper.title)
            .bind(&paper.authors)
            .bind(&paper.abstract_text)
            .bind(&paper.link)
            .bind(&paper.category)
            .bind(paper.date.to_string())
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
        let rows =
            sqlx::query_as::<_, VoteRow>("SELECT doi, user, timestamp FROM interest")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to list votes: {}", e)))?;

        rows.into_iter().map(VoteRow::into_vote).collect()
    }

    async fn voted_dois_for_user(&self, user: &str) -> Result<HashSet<String>> {
        let dois: Vec<String> = sqlx::query_scalar("SELECT doi FROM interest WHERE user = ?")
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
                "INSERT OR IGNORE INTO interest (doi, user, timestamp) VALUES (?, ?, ?)",
            )
            .bind(&vote.doi)
            .bind(&vote.user)
            .bind(vote.timestamp.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert vote: {}", e)))?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn delete_votes(&self, user: &str, dois: &[String]) -> Result<u64> {
        let mut deleted = 0u64;
        for doi in dois {
            let result = sqlx::query("DELETE FROM interest WHERE user = ? AND doi = ?")
                .bind(user)
                .bind(doi)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to delete vote: {}", e)))?;
            deleted += result.rows_affected();
        }
        Ok(deleted)
    }

    async fn dismissed_dois_for_user(&self, user: &str) -> Result<HashSet<String>> {
        let dois: Vec<String> = sqlx::query_scalar("SELECT doi FROM seen WHERE user = ?")
            .bind(user)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch dismissals: {}", e)))?;
        Ok(dois.into_iter().collect())
    }

    async fn insert_dismissals(&self, dismissals: &[Dismissal]) -> Result<u64> {
        let mut inserted = 0u64;
        for dismissal in dismissals {
            let result =
                sqlx::query("INSERT OR IGNORE INTO seen (doi, user) VALUES (?, ?)")
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
    date: String,
}

impl PaperRow {
    fn into_paper(self) -> Result<Paper> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|e| AppError::ParseError(format!("Invalid stored date: {}", e)))?;
        Ok(Paper {
            doi: self.doi,
            title: self.title,
            authors: self.authors,
            abstract_text: self.abstract_text,
            link: self.link,
            category: self.category,
            date,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    doi: String,
    user: String,
    timestamp: String,
}

impl VoteRow {
    fn into_vote(self) -> Result<Vote> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| AppError::ParseError(format!("Invalid stored timestamp: {}", e)))?
            .with_timezone(&Utc);
        Ok(Vote {
            doi: self.doi,
            user: self.user,
            timestamp,
        })
    }
}
