use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_embed::Embed;

use crate::corpus::{Corpus, CorpusError};

pub const DEFAULT_TEXT: &str = "puella-et-nauta";

#[derive(Embed)]
#[folder = "assets/texts/"]
struct TextAssets;

/// A loaded corpus together with the identifier its progress is keyed under.
pub struct LoadedText {
    pub id: String,
    pub corpus: Corpus,
}

/// Resolves text identifiers against the user texts directory first, then the
/// bundled texts.
pub struct TextLibrary {
    user_dir: Option<PathBuf>,
    downloads_enabled: bool,
}

impl TextLibrary {
    pub fn new(user_dir: Option<PathBuf>) -> Self {
        Self {
            user_dir,
            downloads_enabled: false,
        }
    }

    pub fn with_downloads(mut self, enabled: bool) -> Self {
        self.downloads_enabled = enabled;
        self
    }

    pub fn available_texts(&self) -> Vec<String> {
        let mut ids: BTreeSet<String> = TextAssets::iter()
            .filter_map(|f| f.strip_suffix(".json").map(|n| n.to_string()))
            .collect();

        if let Some(dir) = &self.user_dir {
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.filter_map(|e| e.ok()) {
                    let path = entry.path();
                    if path.extension().and_then(|x| x.to_str()) == Some("json") {
                        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                            ids.insert(stem.to_string());
                        }
                    }
                }
            }
        }

        ids.into_iter().collect()
    }

    /// Load a text by identifier. `None` selects the bundled default.
    pub fn load(&self, id: Option<&str>) -> Result<LoadedText, CorpusError> {
        let id = id.unwrap_or(DEFAULT_TEXT);

        if let Some(dir) = &self.user_dir {
            let path = dir.join(format!("{id}.json"));
            if path.exists() {
                log::info!("loading text {id:?} from {}", path.display());
                let json = read_file(&path)?;
                return Ok(LoadedText {
                    id: id.to_string(),
                    corpus: Corpus::from_json(&json)?,
                });
            }
        }

        let file = TextAssets::get(&format!("{id}.json"))
            .ok_or_else(|| CorpusError::UnknownText(id.to_string()))?;
        let json = std::str::from_utf8(file.data.as_ref()).map_err(|e| CorpusError::Unreadable {
            source_name: id.to_string(),
            reason: e.to_string(),
        })?;
        log::info!("loading bundled text {id:?}");
        Ok(LoadedText {
            id: id.to_string(),
            corpus: Corpus::from_json(json)?,
        })
    }

    /// Load a corpus from an explicit file path or URL. The identifier is the
    /// canonical path or the URL itself, so two files with the same name never
    /// share progress.
    pub fn load_location(&self, location: &str) -> Result<LoadedText, CorpusError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            if !self.downloads_enabled {
                return Err(CorpusError::Unreadable {
                    source_name: location.to_string(),
                    reason: "downloads are disabled (set corpus_downloads_enabled = true)"
                        .to_string(),
                });
            }
            let json = fetch_url(location)?;
            return Ok(LoadedText {
                id: location.to_string(),
                corpus: Corpus::from_json(&json)?,
            });
        }

        let path = Path::new(location);
        let canonical = fs::canonicalize(path).map_err(|e| CorpusError::Unreadable {
            source_name: location.to_string(),
            reason: e.to_string(),
        })?;
        let json = read_file(&canonical)?;
        Ok(LoadedText {
            id: canonical.to_string_lossy().to_string(),
            corpus: Corpus::from_json(&json)?,
        })
    }
}

fn read_file(path: &Path) -> Result<String, CorpusError> {
    fs::read_to_string(path).map_err(|e| CorpusError::Unreadable {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(feature = "network")]
fn fetch_url(url: &str) -> Result<String, CorpusError> {
    let unreadable = |reason: String| CorpusError::Unreadable {
        source_name: url.to_string(),
        reason,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| unreadable(e.to_string()))?;
    let response = client.get(url).send().map_err(|e| unreadable(e.to_string()))?;
    if !response.status().is_success() {
        return Err(unreadable(format!("HTTP {}", response.status())));
    }
    response.text().map_err(|e| unreadable(e.to_string()))
}

#[cfg(not(feature = "network"))]
fn fetch_url(url: &str) -> Result<String, CorpusError> {
    Err(CorpusError::Unreadable {
        source_name: url.to_string(),
        reason: "built without network support".to_string(),
    })
}
