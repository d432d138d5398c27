use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::error::{AppError, Result};
use crate::domain::paper::Paper;

/// Page size the bioRxiv details API serves; a shorter page means the
/// listing is exhausted.
pub const FULL_PAGE: usize = 100;

const DEFAULT_BASE_URL: &str = "https://api.biorxiv.org/details/biorxiv";
const NO_POSTS_STATUS: &str = "no posts found";

#[derive(Debug, Default, Deserialize)]
pub struct DetailsResponse {
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
    #[serde(default)]
    pub collection: Vec<PreprintRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreprintRecord {
    pub doi: String,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub category: String,
    pub date: String,
}

impl DetailsResponse {
    pub fn no_posts_found(&self) -> bool {
        self.messages
            .first()
            .map(|m| m.status == NO_POSTS_STATUS)
            .unwrap_or(false)
    }
}

impl PreprintRecord {
    /// The public landing page for a preprint is derived from its DOI; the
    /// API does not return a link field.
    pub fn into_paper(self) -> Result<Paper> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|e| {
            AppError::ParseError(format!("Invalid date '{}' for {}: {}", self.date, self.doi, e))
        })?;
        let link = format!("https://www.biorxiv.org/content/{}v1", self.doi);

        Ok(Paper {
            doi: self.doi,
            title: self.title,
            authors: self.authors,
            abstract_text: self.abstract_text,
            link,
            category: self.category,
            date,
        })
    }
}

/// Upstream preprint listing, one page at a time. Tests substitute a
/// scripted source.
#[async_trait]
pub trait PreprintSource: Send + Sync {
    async fn fetch_page(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cursor: usize,
    ) -> Result<DetailsResponse>;
}

pub struct BiorxivClient {
    client: reqwest::Client,
    base_url: String,
}

impl BiorxivClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into(),
        }
    }
}

impl Default for BiorxivClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreprintSource for BiorxivClient {
    async fn fetch_page(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cursor: usize,
    ) -> Result<DetailsResponse> {
        let url = format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            start,
            end,
            cursor
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::FetchError(format!("bioRxiv request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::FetchError(format!(
                "bioRxiv API error ({})",
                response.status()
            )));
        }

        response
            .json::<DetailsResponse>()
            .await
            .map_err(|e| AppError::FetchError(format!("Failed to parse bioRxiv response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"{
        "messages": [{"status": "ok", "count": 2}],
        "collection": [
            {
                "doi": "10.1101/2024.01.01.573001",
                "title": "Cortical dynamics of decision making",
                "authors": "Doe, J.; Roe, R.",
                "abstract": "We recorded from cortex.",
                "category": "neuroscience",
                "date": "2024-01-02",
                "version": "1"
            },
            {
                "doi": "10.1101/2024.01.01.573002",
                "title": "A new CRISPR screen",
                "authors": "Poe, E.",
                "abstract": "We screened everything.",
                "category": "genomics",
                "date": "2024-01-03"
            }
        ]
    }"#;

    #[test]
    fn test_deserialize_details_page() {
        let page: DetailsResponse = serde_json::from_str(SAMPLE_PAGE).unwrap();
        assert_eq!(page.collection.len(), 2);
        assert_eq!(page.collection[0].doi, "10.1101/2024.01.01.573001");
        assert_eq!(page.collection[1].category, "genomics");
        assert!(!page.no_posts_found());
    }

    #[test]
    fn test_no_posts_found() {
        let page: DetailsResponse =
            serde_json::from_str(r#"{"messages": [{"status": "no posts found"}]}"#).unwrap();
        assert!(page.no_posts_found());
        assert!(page.collection.is_empty());
    }

    #[test]
    fn test_record_into_paper_derives_link() {
        let page: DetailsResponse = serde_json::from_str(SAMPLE_PAGE).unwrap();
        let paper = page.collection[0].clone().into_paper().unwrap();

        assert_eq!(
            paper.link,
            "https://www.biorxiv.org/content/10.1101/2024.01.01.573001v1"
        );
        assert_eq!(paper.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(paper.abstract_text, "We recorded from cortex.");
    }

    #[test]
    fn test_record_with_bad_date_is_rejected() {
        let record = PreprintRecord {
            doi: "10.1101/x".to_string(),
            title: String::new(),
            authors: String::new(),
            abstract_text: String::new(),
            category: "neuroscience".to_string(),
            date: "02/01/2024".to_string(),
        };
        assert!(record.into_paper().is_err());
    }
}
