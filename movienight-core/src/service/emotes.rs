//! Emote table loaded from the emote directory tree

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::Result;

const EMOTE_EXTENSIONS: [&str; 2] = ["png", "gif"];

/// How deep below the emote root subdirectories are scanned
const MAX_DEPTH: usize = 2;

pub struct EmoteTable {
    dir: PathBuf,
    emotes: RwLock<HashMap<String, String>>,
}

impl EmoteTable {
    /// An empty table rooted at `dir`; call [`EmoteTable::reload`] to fill it
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            emotes: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let table = Self::new(dir);
        table.reload()?;
        Ok(table)
    }

    /// Table with fixed entries (code -> path relative to the emote root)
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let emotes = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            dir: PathBuf::new(),
            emotes: RwLock::new(emotes),
        }
    }

    /// Rescan the emote directory and swap in the new table
    pub fn reload(&self) -> Result<usize> {
        let mut found = HashMap::new();
        scan_dir(&self.dir, &self.dir, 0, &mut found)?;

        let count = found.len();
        *self.emotes.write() = found;
        info!(dir = %self.dir.display(), count, "Emotes loaded");
        Ok(count)
    }

    /// Path of the emote named by `token`; `code`, `:code:` and `[code]` all match
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<String> {
        let code = token.trim_matches(|c| matches!(c, ':' | '[' | ']'));
        self.emotes.read().get(code).cloned()
    }

    /// Replace every emote word with its image tag
    #[must_use]
    pub fn substitute(&self, text: &str) -> String {
        let emotes = self.emotes.read();
        if emotes.is_empty() {
            return text.to_string();
        }

        text.split(' ')
            .map(|word| {
                let code = word.trim_matches(|c| matches!(c, ':' | '[' | ']'));
                match emotes.get(code) {
                    Some(path) => emote_html(code, path),
                    None => word.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Sorted code -> path view for clients
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.emotes
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.emotes.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emotes.read().is_empty()
    }
}

fn emote_html(code: &str, path: &str) -> String {
    format!(r#"<img src="/emotes/{path}" height="28px" title="{code}" />"#)
}

fn scan_dir(root: &Path, dir: &Path, depth: usize, found: &mut HashMap<String, String>) -> Result<()> {
    let entries = std::fs::read_dir(dir)?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Unreadable emote entry");
                continue;
            }
        };
        let path = entry.path();

        if path.is_dir() {
            if depth < MAX_DEPTH {
                // Nested directories are best effort
                if let Err(e) = scan_dir(root, &path, depth + 1, found) {
                    warn!(dir = %path.display(), error = %e, "Failed to scan emote directory");
                }
            }
            continue;
        }

        let is_emote = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EMOTE_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if !is_emote {
            continue;
        }

        let (Some(code), Ok(relative)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.strip_prefix(root),
        ) else {
            continue;
        };

        let url_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        debug!(code, path = %url_path, "Found emote");
        found.insert(code.to_string(), url_path);
    }

    Ok(())
}
