use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corpus::Category;
use crate::session::progress::CategoryProgress;

pub const SCHEMA_VERSION: u32 = 1;

/// Identifies one (text, category) progress record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub text_id: String,
    pub category: Category,
}

impl ProgressKey {
    pub fn new(text_id: &str, category: Category) -> Self {
        Self {
            text_id: text_id.to_string(),
            category,
        }
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "progress:{}:{}", self.text_id, self.category)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub schema_version: u32,
    pub text_id: String,
    pub category: Category,
    pub saved_at: DateTime<Utc>,
    pub progress: CategoryProgress,
}

impl ProgressRecord {
    pub fn new(key: &ProgressKey, progress: &CategoryProgress) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            text_id: key.text_id.clone(),
            category: key.category,
            saved_at: Utc::now(),
            progress: progress.clone(),
        }
    }

    /// Check if loaded data has a stale schema version and needs reset.
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }

    pub fn belongs_to(&self, key: &ProgressKey) -> bool {
        self.text_id == key.text_id && self.category == key.category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = ProgressKey::new("puella-et-nauta", Category::Verb);
        assert_eq!(key.to_string(), "progress:puella-et-nauta:Verb");
    }
}
