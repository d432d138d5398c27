use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::error::{AppError, Result};
use crate::domain::paper::Paper;
use crate::infrastructure::db::TriageStore;

#[derive(Debug, Serialize)]
pub struct FreshStream {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub papers: Vec<Paper>,
}

/// Keep papers nobody has voted for and the current user has not dismissed,
/// newest first. A vote from any member pulls the paper out of every
/// member's stream (it lives on the shortlist instead); a dismissal only
/// hides it from the dismissing user.
pub fn filter_fresh(
    mut papers: Vec<Paper>,
    voted: &HashSet<String>,
    my_dismissed: &HashSet<String>,
) -> Vec<Paper> {
    papers.retain(|p| !voted.contains(&p.doi) && !my_dismissed.contains(&p.doi));
    papers.sort_by(|a, b| b.date.cmp(&a.date));
    papers
}

pub struct FreshStreamUseCase {
    store: Arc<dyn TriageStore>,
    window_days: i64,
}

impl FreshStreamUseCase {
    pub fn new(store: Arc<dyn TriageStore>, window_days: i64) -> Self {
        Self { store, window_days }
    }

    /// The default window is the trailing `window_days` ending today.
    pub async fn view(
        &self,
        user: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<FreshStream> {
        let end = end.unwrap_or_else(|| Utc::now().date_naive());
        let start = start.unwrap_or(end - Duration::days(self.window_days));
        if start > end {
            return Err(AppError::ValidationError(format!(
                "Invalid date range: {} > {}",
                start, end
            )));
        }

        let papers = self.store.list_papers_in_range(start, end).await?;
        let voted: HashSet<String> = self
            .store
            .list_votes()
            .await?
            .into_iter()
            .map(|v| v.doi)
            .collect();
        let my_dismissed = self.store.dismissed_dois_for_user(user).await?;

        Ok(FreshStream {
            start,
            end,
            papers: filter_fresh(papers, &voted, &my_dismissed),
        })
    }
}
