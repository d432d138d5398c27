use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::error::Result;
use crate::domain::paper::{Paper, RankedPaper, Vote};
use crate::infrastructure::db::TriageStore;

#[derive(Debug, Serialize)]
pub struct ShortlistView {
    pub rows: Vec<RankedPaper>,
    pub total_votes: i64,
}

/// Inner-join papers with votes and rank by (vote count desc, date desc).
/// Dismissals are deliberately not consulted: once any member votes for a
/// paper it stays on everyone's shortlist.
pub fn rank_shortlist(papers: Vec<Paper>, votes: &[Vote], current_user: &str) -> Vec<RankedPaper> {
    let mut voters_by_doi: HashMap<&str, Vec<String>> = HashMap::new();
    for vote in votes {
        voters_by_doi
            .entry(vote.doi.as_str())
            .or_default()
            .push(vote.user.clone());
    }

    let mut rows: Vec<RankedPaper> = papers
        .into_iter()
        .filter_map(|paper| {
            let voters = voters_by_doi.remove(paper.doi.as_str())?;
            let my_vote = voters.iter().any(|v| v == current_user);
            Some(RankedPaper {
                total_votes: voters.len() as i64,
                voters,
                my_vote,
                paper,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_votes
            .cmp(&a.total_votes)
            .then(b.paper.date.cmp(&a.paper.date))
    });
    rows
}

pub struct ShortlistUseCase {
    store: Arc<dyn TriageStore>,
}

impl ShortlistUseCase {
    pub fn new(store: Arc<dyn TriageStore>) -> Self {
        Self { store }
    }

    pub async fn view(&self, user: &str) -> Result<ShortlistView> {
        let papers = self.store.list_papers().await?;
        let votes = self.store.list_votes().await?;

        let rows = rank_shortlist(papers, &votes, user);
        let total_votes = rows.iter().map(|r| r.total_votes).sum();

        Ok(ShortlistView { rows, total_votes })
    }
}
