use serde::{Deserialize, Serialize};

/// A lab member on the triage roster. The color is used by the UI to render
/// voter badges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub color: String,
}

impl Member {
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}
