//! In-memory store double shared by the use case tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::error::Result;
use crate::domain::paper::{Dismissal, Paper, Vote};
use crate::infrastructure::db::TriageStore;

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    papers: Vec<Paper>,
    interest: Vec<Vote>,
    seen: Vec<Dismissal>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_papers(papers: Vec<Paper>) -> Self {
        let store = Self::new();
        store.inner.lock().unwrap().papers = papers;
        store
    }

    pub fn paper_count(&self) -> usize {
        self.inner.lock().unwrap().papers.len()
    }

    pub fn vote_count(&self) -> usize {
        self.inner.lock().unwrap().interest.len()
    }

    pub fn seed_votes(&self, votes: Vec<Vote>) {
        self.inner.lock().unwrap().interest = votes;
    }

    pub fn seed_dismissals(&self, dismissals: Vec<Dismissal>) {
        self.inner.lock().unwrap().seen = dismissals;
    }
}

#[async_trait]
impl TriageStore for MemoryStore {
    async fn list_papers(&self) -> Result<Vec<Paper>> {
        Ok(self.inner.lock().unwrap().papers.clone())
    }

    async fn list_papers_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Paper>> {
        let mut papers = self.inner.lock().unwrap().papers.clone();
        papers.retain(|p| p.date >= start && p.date <= end);
        papers.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(papers)
    }

    async fn known_dois(&self) -> Result<HashSet<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .papers
            .iter()
            .map(|p| p.doi.clone())
            .collect())
    }

    async fn insert_papers(&self, papers: &[Paper]) -> Result<u64> {
        let mut state = self.inner.lock().unwrap();
        let known: HashSet<String> = state.papers.iter().map(|p| p.doi.clone()).collect();
        let mut inserted = 0u64;
        for paper in papers {
            if !known.contains(&paper.doi) {
                state.papers.push(paper.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn list_votes(&self) -> Result<Vec<Vote>> {
        Ok(self.inner.lock().unwrap().interest.clone())
    }

    async fn voted_dois_for_user(&self, user: &str) -> Result<HashSet<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .interest
            .iter()
            .filter(|v| v.user == user)
            .map(|v| v.doi.clone())
            .collect())
    }

    async fn insert_votes(&self, votes: &[Vote]) -> Result<u64> {
        let mut state = self.inner.lock().unwrap();
        for vote in votes {
            state.interest.push(vote.clone());
        }
        Ok(votes.len() as u64)
    }

    async fn delete_votes(&self, user: &str, dois: &[String]) -> Result<u64> {
        let mut state = self.inner.lock().unwrap();
        let before = state.interest.len();
        state
            .interest
            .retain(|v| !(v.user == user && dois.contains(&v.doi)));
        Ok((before - state.interest.len()) as u64)
    }

    async fn dismissed_dois_for_user(&self, user: &str) -> Result<HashSet<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .seen
            .iter()
            .filter(|d| d.user == user)
            .map(|d| d.doi.clone())
            .collect())
    }

    async fn insert_dismissals(&self, dismissals: &[Dismissal]) -> Result<u64> {
        let mut state = self.inner.lock().unwrap();
        for dismissal in dismissals {
            state.seen.push(dismissal.clone());
        }
        Ok(dismissals.len() as u64)
    }
}

pub fn paper(doi: &str, date: &str) -> Paper {
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

pub fn vote(doi: &str, user: &str) -> Vote {
    Vote {
        doi: doi.to_string(),
        user: user.to_string(),
        timestamp: chrono::Utc::now(),
    }
}
