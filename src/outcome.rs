use serde::Serialize;
use serde_json::Value;

/// Result of one mutation, reported per item instead of aborting a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The write was submitted and accepted
    Applied { item: String, detail: Option<Value> },
    /// Nothing needed to change (existing object, no-op delta)
    Unchanged { item: String, reason: String },
    /// The item could not be applied; the run continues
    Failed { item: String, error: String },
}

impl Outcome {
    pub fn applied(item: impl Into<String>, detail: Option<Value>) -> Self {
        Outcome::Applied {
            item: item.into(),
            detail,
        }
    }

    pub fn unchanged(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Outcome::Unchanged {
            item: item.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(item: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Outcome::Failed {
            item: item.into(),
            error: error.to_string(),
        }
    }

    pub fn item(&self) -> &str {
        match self {
            Outcome::Applied { item, .. } | Outcome::Unchanged { item, .. } | Outcome::Failed { item, .. } => item,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}
