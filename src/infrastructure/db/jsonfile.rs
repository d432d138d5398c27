use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};
use crate::domain::paper::{Dismissal, Paper, Vote};

use super::TriageStore;

/// Single-document file backend. Every mutation reloads the document,
/// applies the change, and rewrites the whole file. Concurrent writers are
/// last-write-wins, same as the spreadsheet-backed variants this replaces.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    papers: Vec<Paper>,
    #[serde(default)]
    interest: Vec<Vote>,
    #[serde(default)]
    seen: Vec<Dismissal>,
}

impl JsonFileStore {
    pub fn init(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        };

        if !path.exists() {
            store.save(&Collections::default())?;
        } else {
            // Fail fast on a corrupt document instead of clobbering it later.
            store.load()?;
        }

        Ok(store)
    }

    fn load(&self) -> Result<Collections> {
        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::ParseError(format!(
                "Invalid store document {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, collections: &Collections) -> Result<()> {
        let raw = serde_json::to_string_pretty(collections)
            .map_err(|e| AppError::Internal(format!("Failed to serialize store: {}", e)))?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl TriageStore for JsonFileStore {
    async fn list_papers(&self) -> Result<Vec<Paper>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.load()?.papers)
    }

    async fn list_papers_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Paper>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut papers = self.load()?.papers;
        papers.retain(|p| p.date >= start && p.date <= end);
        papers.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(papers)
    }

    async fn known_dois(&self) -> Result<HashSet<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.load()?.papers.into_iter().map(|p| p.doi).collect())
    }

    async fn insert_papers(&self, papers: &[Paper]) -> Result<u64> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut collections = self.load()?;
        let known: HashSet<String> = collections.papers.iter().map(|p| p.doi.clone()).collect();

        let mut inserted = 0u64;
        for paper in papers {
            if known.contains(&paper.doi) {
                continue;
            }
            collections.papers.push(paper.clone());
            inserted += 1;
        }

        if inserted > 0 {
            self.save(&collections)?;
        }
        Ok(inserted)
    }

    async fn list_votes(&self) -> Result<Vec<Vote>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.load()?.interest)
    }

    async fn voted_dois_for_user(&self, user: &str) -> Result<HashSet<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self
            .load()?
            .interest
            .into_iter()
            .filter(|v| v.user == user)
            .map(|v| v.doi)
            .collect())
    }

    async fn insert_votes(&self, votes: &[Vote]) -> Result<u64> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut collections = self.load()?;

        let mut inserted = 0u64;
        for vote in votes {
            let exists = collections
                .interest
                .iter()
                .any(|v| v.doi == vote.doi && v.user == vote.user);
            if exists {
                continue;
            }
            collections.interest.push(vote.clone());
            inserted += 1;
        }

        if inserted > 0 {
            self.save(&collections)?;
        }
        Ok(inserted)
    }

    async fn delete_votes(&self, user: &str, dois: &[String]) -> Result<u64> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut collections = self.load()?;

        let before = collections.interest.len();
        collections
            .interest
            .retain(|v| !(v.user == user && dois.contains(&v.doi)));
        let deleted = (before - collections.interest.len()) as u64;

        if deleted > 0 {
            self.save(&collections)?;
        }
        Ok(deleted)
    }

    async fn dismissed_dois_for_user(&self, user: &str) -> Result<HashSet<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self
            .load()?
            .seen
            .into_iter()
            .filter(|d| d.user == user)
            .map(|d| d.doi)
            .collect())
    }

    async fn insert_dismissals(&self, dismissals: &[Dismissal]) -> Result<u64> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut collections = self.load()?;

        let mut inserted = 0u64;
        for dismissal in dismissals {
            let exists = collections
                .seen
                .iter()
                .any(|d| d.doi == dismissal.doi && d.user == dismissal.user);
            if exists {
                continue;
            }
            collections.seen.push(dismissal.clone());
            inserted += 1;
        }

        if inserted > 0 {
            self.save(&collections)?;
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn paper(doi: &str, date: &str) -> Paper {
        Paper {
            doi: doi.to_string(),
            title: format!("Paper {}", doi),
            authors: "Doe, J.".to_string(),
            abstract_text: "An abstract.".to_string(),
            link: format!("https://www.biorxiv.org/content/{}v1", doi),
            category: "neuroscience".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    fn temp_store(name: &str) -> JsonFileStore {
        let path = std::env::temp_dir().join(format!(
            "labrxiv-json-{}-{}.json",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        JsonFileStore::init(&path).unwrap()
    }

    #[tokio::test]
    async fn test_empty_document_on_init() {
        let store = temp_store("init");
        assert!(store.list_papers().await.unwrap().is_empty());
        assert!(store.list_votes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_papers_survive_reopen() {
        let path = std::env::temp_dir().join(format!(
            "labrxiv-json-reopen-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        {
            let store = JsonFileStore::init(&path).unwrap();
            store
                .insert_papers(&[paper("10.1101/a", "2024-03-01")])
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::init(&path).unwrap();
        let papers = reopened.list_papers().await.unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].doi, "10.1101/a");
    }

    #[tokio::test]
    async fn test_duplicate_inserts_are_ignored() {
        let store = temp_store("dedupe");
        let papers = vec![paper("10.1101/a", "2024-03-01")];
        assert_eq!(store.insert_papers(&papers).await.unwrap(), 1);
        assert_eq!(store.insert_papers(&papers).await.unwrap(), 0);

        let vote = Vote {
            doi: "10.1101/a".to_string(),
            user: "Albert".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(store.insert_votes(&[vote.clone()]).await.unwrap(), 1);
        assert_eq!(store.insert_votes(&[vote]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_votes_only_touches_named_user() {
        let store = temp_store("delete");
        let now = Utc::now();
        store
            .insert_votes(&[
                Vote {
                    doi: "10.1101/a".to_string(),
                    user: "Albert".to_string(),
                    timestamp: now,
                },
                Vote {
                    doi: "10.1101/a".to_string(),
                    user: "Brian".to_string(),
                    timestamp: now,
                },
            ])
            .await
            .unwrap();

        let deleted = store
            .delete_votes("Albert", &["10.1101/a".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let remaining = store.list_votes().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user, "Brian");
    }

    #[tokio::test]
    async fn test_range_filter() {
        let store = temp_store("range");
        store
            .insert_papers(&[
                paper("10.1101/a", "2024-03-01"),
                paper("10.1101/b", "2024-03-05"),
                paper("10.1101/c", "2024-02-01"),
            ])
            .await
            .unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let in_range = store.list_papers_in_range(start, end).await.unwrap();

        assert_eq!(in_range.len(), 2);
        assert_eq!(in_range[0].doi, "10.1101/b");
    }
}
