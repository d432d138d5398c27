use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::paper::{Dismissal, Vote};
use crate::infrastructure::db::TriageStore;

/// What a submitted ballot changes, relative to the stored votes.
#[derive(Debug, Default, PartialEq)]
pub struct BallotDelta {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
    pub to_dismiss: BTreeSet<String>,
}

impl BallotDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.to_dismiss.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len() + self.to_dismiss.len()
    }
}

/// Delta between the stored votes and the checkboxes the user submitted.
/// A vote is only removed if its paper was visible on screen, so papers
/// scrolled out of the current view can never be un-voted by accident.
pub fn compute_delta(
    current: &HashSet<String>,
    selected: &HashSet<String>,
    trashed: &HashSet<String>,
    visible: &HashSet<String>,
    already_seen: &HashSet<String>,
) -> BallotDelta {
    let to_add = selected.difference(current).cloned().collect();
    let to_remove = current
        .difference(selected)
        .filter(|doi| visible.contains(*doi))
        .cloned()
        .collect();
    let to_dismiss = trashed.difference(already_seen).cloned().collect();

    BallotDelta {
        to_add,
        to_remove,
        to_dismiss,
    }
}

pub struct BallotUseCase {
    store: Arc<dyn TriageStore>,
    roster: Vec<String>,
}

impl BallotUseCase {
    pub fn new(store: Arc<dyn TriageStore>, roster: Vec<String>) -> Self {
        Self { store, roster }
    }

    /// Reconcile a user's submitted ballot with the store and return the
    /// number of applied changes. An empty delta performs no writes.
    pub async fn submit(
        &self,
        user: &str,
        selected: HashSet<String>,
        trashed: HashSet<String>,
        visible: HashSet<String>,
    ) -> Result<usize> {
        if user.trim().is_empty() {
            return Err(AppError::ValidationError("User is required.".to_string()));
        }
        if !self.roster.iter().any(|member| member == user) {
            return Err(AppError::ValidationError(format!(
                "Unknown user: {}",
                user
            )));
        }

        let current = self.store.voted_dois_for_user(user).await?;
        let already_seen = self.store.dismissed_dois_for_user(user).await?;
        let delta = compute_delta(&current, &selected, &trashed, &visible, &already_seen);

        if delta.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let changes = delta.len();

        if !delta.to_add.is_empty() {
            let votes: Vec<Vote> = delta
                .to_add
                .iter()
                .map(|doi| Vote {
                    doi: doi.clone(),
                    user: user.to_string(),
                    timestamp: now,
                })
                .collect();
            self.store.insert_votes(&votes).await?;
        }

        if !delta.to_remove.is_empty() {
            let dois: Vec<String> = delta.to_remove.iter().cloned().collect();
            self.store.delete_votes(user, &dois).await?;
        }

        if !delta.to_dismiss.is_empty() {
            let dismissals: Vec<Dismissal> = delta
                .to_dismiss
                .iter()
                .map(|doi| Dismissal {
                    doi: doi.clone(),
                    user: user.to_string(),
                })
                .collect();
            self.store.insert_dismissals(&dismissals).await?;
        }

        info!(
            user,
            added = delta.to_add.len(),
            removed = delta.to_remove.len(),
            dismissed = delta.to_dismiss.len(),
            "Ballot applied"
        );

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::testing::{vote, MemoryStore};

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_delta_adds_new_selections() {
        let delta = compute_delta(
            &set(&["a"]),
            &set(&["a", "b", "c"]),
            &set(&[]),
            &set(&["a", "b", "c"]),
            &set(&[]),
        );
        assert_eq!(delta.to_add, set(&["b", "c"]).into_iter().collect());
        assert!(delta.to_remove.is_empty());
    }

    #[test]
    fn test_delta_removes_deselected_visible_votes() {
        let delta = compute_delta(
            &set(&["a", "b"]),
            &set(&["a"]),
            &set(&[]),
            &set(&["a", "b"]),
            &set(&[]),
        );
        assert_eq!(delta.to_remove, set(&["b"]).into_iter().collect());
        assert!(delta.to_add.is_empty());
    }

    #[test]
    fn test_delta_never_removes_offscreen_votes() {
        // "b" is voted but was not rendered, so its absence from the
        // selection must not delete it.
        let delta = compute_delta(
            &set(&["a", "b"]),
            &set(&["a"]),
            &set(&[]),
            &set(&["a"]),
            &set(&[]),
        );
        assert!(delta.to_remove.is_empty());
    }

    #[test]
    fn test_delta_dedupes_dismissals() {
        let delta = compute_delta(
            &set(&[]),
            &set(&[]),
            &set(&["x", "y"]),
            &set(&["x", "y"]),
            &set(&["x"]),
        );
        assert_eq!(delta.to_dismiss, set(&["y"]).into_iter().collect());
    }

    #[test]
    fn test_delta_empty_when_nothing_changed() {
        let delta = compute_delta(
            &set(&["a"]),
            &set(&["a"]),
            &set(&[]),
            &set(&["a"]),
            &set(&[]),
        );
        assert!(delta.is_empty());
        assert_eq!(delta.len(), 0);
    }

    fn roster() -> Vec<String> {
        vec!["Albert".to_string(), "Brian".to_string()]
    }

    #[tokio::test]
    async fn test_submit_applies_adds_removes_and_dismissals() {
        let store = Arc::new(MemoryStore::new());
        store.seed_votes(vec![vote("a", "Albert"), vote("b", "Albert")]);

        let use_case = BallotUseCase::new(store.clone(), roster());
        let changes = use_case
            .submit(
                "Albert",
                set(&["a", "c"]),
                set(&["d"]),
                set(&["a", "b", "c", "d"]),
            )
            .await
            .unwrap();

        // +c, -b, dismiss d
        assert_eq!(changes, 3);
        let mine = store.voted_dois_for_user("Albert").await.unwrap();
        assert_eq!(mine, set(&["a", "c"]));
        let seen = store.dismissed_dois_for_user("Albert").await.unwrap();
        assert_eq!(seen, set(&["d"]));
    }

    #[tokio::test]
    async fn test_submit_leaves_other_users_votes_alone() {
        let store = Arc::new(MemoryStore::new());
        store.seed_votes(vec![vote("a", "Albert"), vote("a", "Brian")]);

        let use_case = BallotUseCase::new(store.clone(), roster());
        use_case
            .submit("Albert", set(&[]), set(&[]), set(&["a"]))
            .await
            .unwrap();

        assert!(store.voted_dois_for_user("Albert").await.unwrap().is_empty());
        assert_eq!(store.voted_dois_for_user("Brian").await.unwrap(), set(&["a"]));
    }

    #[tokio::test]
    async fn test_submit_no_changes_returns_zero() {
        let store = Arc::new(MemoryStore::new());
        let use_case = BallotUseCase::new(store.clone(), roster());
        let changes = use_case
            .submit("Brian", set(&[]), set(&[]), set(&[]))
            .await
            .unwrap();
        assert_eq!(changes, 0);
        assert_eq!(store.vote_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_user() {
        let store = Arc::new(MemoryStore::new());
        let use_case = BallotUseCase::new(store, roster());
        let err = use_case
            .submit("Mallory", set(&[]), set(&[]), set(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
