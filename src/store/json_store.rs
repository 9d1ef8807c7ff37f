use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::store::ProgressStore;
use crate::store::schema::{ProgressKey, ProgressRecord};

/// One pretty-printed JSON file per (text, category) under `progress/`.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(crate::config::data_dir())
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(base_dir.join("progress"))?;
        Ok(Self { base_dir })
    }

    fn progress_dir(&self) -> PathBuf {
        self.base_dir.join("progress")
    }

    fn file_path(&self, key: &ProgressKey) -> PathBuf {
        self.progress_dir()
            .join(format!("{}.json", encode_key(&key.to_string())))
    }
}

impl ProgressStore for JsonStore {
    fn load_record(&self, key: &ProgressKey) -> Option<ProgressRecord> {
        let path = self.file_path(key);
        if !path.exists() {
            return None;
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("discarding unreadable progress {}: {e}", path.display());
                None
            }
        }
    }

    fn save_record(&mut self, record: &ProgressRecord) -> Result<()> {
        let key = ProgressKey::new(&record.text_id, record.category);
        let path = self.file_path(&key);
        let tmp_path = path.with_extension("tmp");

        // The progress dir may have been removed behind our back.
        fs::create_dir_all(self.progress_dir())?;

        let json = serde_json::to_string_pretty(record)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn reset_all(&mut self) -> Result<()> {
        let dir = self.progress_dir();
        if !dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|x| x.to_str());
            if matches!(ext, Some("json") | Some("tmp")) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Percent-encode everything but `[A-Za-z0-9_-]`, so distinct keys never map
/// to the same file name.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
