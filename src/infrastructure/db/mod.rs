pub mod jsonfile;
pub mod postgres;
pub mod sqlite;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::error::Result;
use crate::domain::paper::{Dismissal, Paper, Vote};
use crate::infrastructure::config::{StorageBackend, StorageSettings};

use jsonfile::JsonFileStore;
use postgres::PostgresStore;
use sqlite::SqliteStore;

/// Get/insert/delete-by-filter over the three triage collections
/// (papers, interest, seen). Each backend is a drop-in replacement.
#[async_trait]
pub trait TriageStore: Send + Sync {
    async fn list_papers(&self) -> Result<Vec<Paper>>;
    async fn list_papers_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Paper>>;
    async fn known_dois(&self) -> Result<HashSet<String>>;
    async fn insert_papers(&self, papers: &[Paper]) -> Result<u64>;

    async fn list_votes(&self) -> Result<Vec<Vote>>;
    async fn voted_dois_for_user(&self, user: &str) -> Result<HashSet<String>>;
    async fn insert_votes(&self, votes: &[Vote]) -> Result<u64>;
    async fn delete_votes(&self, user: &str, dois: &[String]) -> Result<u64>;

    async fn dismissed_dois_for_user(&self, user: &str) -> Result<HashSet<String>>;
    async fn insert_dismissals(&self, dismissals: &[Dismissal]) -> Result<u64>;
}

pub async fn connect_store(settings: &StorageSettings) -> Result<Arc<dyn TriageStore>> {
    match settings.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::init(&settings.database_url).await?)),
        StorageBackend::Postgres => {
            Ok(Arc::new(PostgresStore::init(&settings.database_url).await?))
        }
        StorageBackend::Json => Ok(Arc::new(JsonFileStore::init(Path::new(
            &settings.json_path,
        ))?)),
    }
}
