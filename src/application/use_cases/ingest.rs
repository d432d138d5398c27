use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::error::Result;
use crate::domain::paper::Paper;
use crate::infrastructure::biorxiv::{PreprintSource, FULL_PAGE};
use crate::infrastructure::config::IngestSettings;
use crate::infrastructure::db::TriageStore;

pub struct IngestUseCase {
    source: Arc<dyn PreprintSource>,
    store: Arc<dyn TriageStore>,
    settings: IngestSettings,
}

impl IngestUseCase {
    pub fn new(
        source: Arc<dyn PreprintSource>,
        store: Arc<dyn TriageStore>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    /// Paginate the upstream listing for the date range, keep records in
    /// the configured category that are not already stored, and bulk-insert
    /// the rest. Returns the number of new papers.
    ///
    /// Upstream failures truncate the scan: whatever was collected before
    /// the error still lands in the store. There is no retry.
    pub async fn fetch_range(&self, start: NaiveDate, end: NaiveDate) -> Result<usize> {
        let mut known = self.store.known_dois().await?;
        let mut new_papers: Vec<Paper> = Vec::new();
        let mut cursor = 0usize;

        for page in 0..self.settings.max_pages {
            let response = match self.source.fetch_page(start, end, cursor).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, page, cursor, "Upstream fetch failed, stopping scan");
                    break;
                }
            };

            if response.no_posts_found() || response.collection.is_empty() {
                break;
            }

            let page_len = response.collection.len();
            for record in response.collection {
                if !record.category.eq_ignore_ascii_case(&self.settings.category) {
                    continue;
                }
                if known.contains(&record.doi) {
                    continue;
                }
                match record.into_paper() {
                    Ok(paper) => {
                        known.insert(paper.doi.clone());
                        new_papers.push(paper);
                    }
                    Err(e) => warn!(error = %e, "Skipping malformed record"),
                }
            }

            cursor += page_len;
            if page_len < FULL_PAGE {
                break;
            }

            tokio::time::sleep(Duration::from_millis(self.settings.page_delay_ms)).await;
        }

        if new_papers.is_empty() {
            return Ok(0);
        }

        self.store.insert_papers(&new_papers).await?;
        info!(added = new_papers.len(), %start, %end, "Ingest complete");
        Ok(new_papers.len())
    }
}
