use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A preprint as stored after ingestion. Immutable: never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub doi: String,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub link: String,
    pub category: String,
    pub date: NaiveDate,
}

/// An interest record. At most one per (doi, user); uniqueness is enforced
/// by the ballot delta computation before anything reaches the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub doi: String,
    pub user: String,
    pub timestamp: DateTime<Utc>,
}

/// A seen record. Created when a user discards a paper from their fresh
/// stream, never deleted. Only filters that user's view of zero-vote papers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dismissal {
    pub doi: String,
    pub user: String,
}

/// A paper joined with its vote stats for the shortlist view.
#[derive(Debug, Clone, Serialize)]
pub struct RankedPaper {
    #[serde(flatten)]
    pub paper: Paper,
    pub total_votes: i64,
    pub voters: Vec<String>,
    pub my_vote: bool,
}
