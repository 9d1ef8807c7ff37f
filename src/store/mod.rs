pub mod json_store;
pub mod schema;

use std::collections::HashMap;

use anyhow::Result;

use crate::corpus::{Category, Corpus};
use crate::session::progress::CategoryProgress;
use crate::store::schema::{ProgressKey, ProgressRecord};

/// Key-value persistence for per-(text, category) progress.
pub trait ProgressStore {
    /// The stored record, or `None` when absent or unreadable.
    fn load_record(&self, key: &ProgressKey) -> Option<ProgressRecord>;

    /// Persist `record`, replacing any prior value under the same key.
    fn save_record(&mut self, record: &ProgressRecord) -> Result<()>;

    /// Erase every record for every text and category.
    fn reset_all(&mut self) -> Result<()>;
}

/// Load progress for `key`, falling back to a fresh record when nothing is
/// stored or the stored record does not fit `corpus`.
pub fn load_progress(
    store: &dyn ProgressStore,
    key: &ProgressKey,
    corpus: &Corpus,
) -> CategoryProgress {
    let fresh = || CategoryProgress::fresh(corpus, key.category);

    let Some(record) = store.load_record(key) else {
        log::debug!("no stored progress for {key}");
        return fresh();
    };

    if record.needs_reset() {
        log::warn!(
            "discarding {key}: schema version {} is not supported",
            record.schema_version
        );
        return fresh();
    }
    if !record.belongs_to(key) {
        log::warn!(
            "discarding {key}: record belongs to progress:{}:{}",
            record.text_id,
            record.category
        );
        return fresh();
    }
    if !record.progress.fits(corpus, key.category) {
        log::warn!("discarding {key}: record does not match the loaded text");
        return fresh();
    }

    record.progress
}

pub fn save_progress(
    store: &mut dyn ProgressStore,
    key: &ProgressKey,
    progress: &CategoryProgress,
) -> Result<()> {
    store.save_record(&ProgressRecord::new(key, progress))
}

/// In-process store, used when no data directory is available.
#[derive(Default)]
pub struct MemoryStore {
    records: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw text under `key`, bypassing serialization.
    pub fn insert_raw(&mut self, key: &ProgressKey, raw: &str) {
        self.records.insert(key.to_string(), raw.to_string());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ProgressStore for MemoryStore {
    fn load_record(&self, key: &ProgressKey) -> Option<ProgressRecord> {
        let raw = self.records.get(&key.to_string())?;
        match serde_json::from_str(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("discarding unreadable progress {key}: {e}");
                None
            }
        }
    }

    fn save_record(&mut self, record: &ProgressRecord) -> Result<()> {
        let key = ProgressKey::new(&record.text_id, record.category);
        self.records
            .insert(key.to_string(), serde_json::to_string(record)?);
        Ok(())
    }

    fn reset_all(&mut self) -> Result<()> {
        self.records.clear();
        Ok(())
    }
}

/// Keys of every category for one text.
pub fn keys_for_text(text_id: &str) -> [ProgressKey; 3] {
    Category::ALL.map(|c| ProgressKey::new(text_id, c))
}
