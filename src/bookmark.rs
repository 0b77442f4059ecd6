use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FolioError;

const BOOKMARKS: &str = "bookmarks";
const HIGHLIGHTS: &str = "highlights";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// 0-based page index
    pub index: usize,
    /// Vertical scroll offset within the page
    #[serde(default)]
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub start: usize,
    pub end: usize,
}

impl Highlight {
    /// A highlight covering `a..b` in either selection direction
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }
}

/// Bookmarks and highlights for every document, kept as a flat map of
/// `"bookmarks/<title>/<name>"` and `"highlights/<title>/<page>"` keys.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationStore {
    entries: BTreeMap<String, Value>,
    #[serde(skip)]
    file_path: Option<PathBuf>,
}

pub fn default_store_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("folio").join("annotations.json"))
}

impl AnnotationStore {
    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn with_file(file_path: &Path) -> Self {
        Self {
            entries: BTreeMap::new(),
            file_path: Some(file_path.to_path_buf()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&Path>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load annotations from {path:?}: {e}");
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        if !file_path.exists() {
            return Ok(Self::with_file(file_path));
        }
        let content = fs::read_to_string(file_path)?;
        let mut store: Self = serde_json::from_str(&content)?;
        store.file_path = Some(file_path.to_path_buf());
        Ok(store)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn save_logged(&self) {
        if let Err(e) = self.save() {
            log::error!("Failed to save annotations: {e}");
        }
    }

    /// Store a bookmark, replacing any bookmark with the same name
    pub fn set_bookmark(
        &mut self,
        title: &str,
        name: &str,
        index: usize,
        position: i64,
    ) -> Result<(), FolioError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FolioError::invalid("bookmark name must not be empty"));
        }
        if name.contains('/') {
            return Err(FolioError::invalid("bookmark name must not contain '/'"));
        }
        let bookmark = Bookmark {
            index,
            position,
            saved_at: Some(Utc::now()),
        };
        self.entries.insert(
            format!("{BOOKMARKS}/{title}/{name}"),
            serde_json::to_value(bookmark)?,
        );
        self.save_logged();
        Ok(())
    }

    pub fn bookmark(&self, title: &str, name: &str) -> Option<Bookmark> {
        let value = self.entries.get(&format!("{BOOKMARKS}/{title}/{name}"))?;
        serde_json::from_value(value.clone()).ok()
    }

    /// All bookmarks of `title`, ordered by name. Malformed entries are
    /// skipped.
    pub fn bookmarks(&self, title: &str) -> Vec<(String, Bookmark)> {
        let prefix = format!("{BOOKMARKS}/{title}/");
        self.entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, value)| {
                let name = &key[prefix.len()..];
                match serde_json::from_value::<Bookmark>(value.clone()) {
                    Ok(bookmark) => Some((name.to_string(), bookmark)),
                    Err(e) => {
                        log::warn!("Ignoring malformed bookmark {key:?}: {e}");
                        None
                    }
                }
            })
            .collect()
    }

    pub fn remove_bookmark(&mut self, title: &str, name: &str) -> bool {
        let removed = self
            .entries
            .remove(&format!("{BOOKMARKS}/{title}/{name}"))
            .is_some();
        if removed {
            self.save_logged();
        }
        removed
    }

    /// Append a highlight to the list of `title`'s page `page`
    pub fn add_highlight(&mut self, title: &str, page: usize, highlight: Highlight) {
        let mut list = self.highlights(title, page);
        list.push(highlight);
        match serde_json::to_value(&list) {
            Ok(value) => {
                self.entries
                    .insert(format!("{HIGHLIGHTS}/{title}/{page}"), value);
                self.save_logged();
            }
            Err(e) => log::error!("Failed to encode highlights: {e}"),
        }
    }

    /// Highlights of one page in the order they were added. A malformed list
    /// reads as empty.
    pub fn highlights(&self, title: &str, page: usize) -> Vec<Highlight> {
        let key = format!("{HIGHLIGHTS}/{title}/{page}");
        let Some(value) = self.entries.get(&key) else {
            return Vec::new();
        };
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed highlights {key:?}: {e}");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn last_write_wins_for_same_name() {
        let mut store = AnnotationStore::ephemeral();
        store.set_bookmark("book.pdf", "intro", 2, 0).unwrap();
        store.set_bookmark("book.pdf", "intro", 7, 40).unwrap();

        let bookmark = store.bookmark("book.pdf", "intro").unwrap();
        assert_eq!(bookmark.index, 7);
        assert_eq!(bookmark.position, 40);
        assert_eq!(store.bookmarks("book.pdf").len(), 1);
    }

    #[test]
    fn bookmarks_are_scoped_by_title() {
        let mut store = AnnotationStore::ephemeral();
        store.set_bookmark("a.pdf", "x", 1, 0).unwrap();
        store.set_bookmark("a.pdf", "y", 2, 0).unwrap();
        store.set_bookmark("a.pdf.bak", "z", 3, 0).unwrap();

        let names: Vec<_> = store
            .bookmarks("a.pdf")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn names_with_separator_are_rejected() {
        let mut store = AnnotationStore::ephemeral();
        assert!(store.set_bookmark("a.pdf", "ch/1", 1, 0).is_err());
        assert!(store.set_bookmark("a.pdf", "  ", 1, 0).is_err());
        assert!(store.bookmarks("a.pdf").is_empty());
    }

    #[test]
    fn highlights_append_in_order() {
        let mut store = AnnotationStore::ephemeral();
        store.add_highlight("b.epub", 3, Highlight::new(10, 20));
        store.add_highlight("b.epub", 3, Highlight::new(15, 5));
        store.add_highlight("b.epub", 3, Highlight::new(10, 20));

        assert_eq!(
            store.highlights("b.epub", 3),
            vec![
                Highlight { start: 10, end: 20 },
                Highlight { start: 5, end: 15 },
                Highlight { start: 10, end: 20 },
            ]
        );
        assert!(store.highlights("b.epub", 4).is_empty());
    }

    #[test]
    fn persisted_layout_uses_path_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotations.json");
        let mut store = AnnotationStore::with_file(&path);
        store.set_bookmark("doc.pdf", "mark", 4, 0).unwrap();
        store.add_highlight("doc.pdf", 4, Highlight::new(1, 2));

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["bookmarks/doc.pdf/mark"]["index"], 4);
        assert_eq!(raw["highlights/doc.pdf/4"][0]["end"], 2);

        let reloaded = AnnotationStore::load_or_ephemeral(Some(&path));
        assert_eq!(reloaded.bookmark("doc.pdf", "mark").unwrap().index, 4);
    }

    #[test]
    fn malformed_values_are_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotations.json");
        fs::write(
            &path,
            r#"{"bookmarks/d.pdf/bad": "oops", "bookmarks/d.pdf/good": {"index": 1, "position": 0}, "highlights/d.pdf/0": 5}"#,
        )
        .unwrap();

        let store = AnnotationStore::load_or_ephemeral(Some(&path));
        assert_eq!(store.bookmarks("d.pdf").len(), 1);
        assert!(store.highlights("d.pdf", 0).is_empty());
    }
}
