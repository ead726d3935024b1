//! Import resolution.
//!
//! `FsImporter` resolves `(from, path)` over the workspace root, the
//! importing file's directory, the built-in search paths, and the
//! user-configured `jpaths` — consulting the overlay first so unsaved
//! editor state wins over the disk. `CachingImporter` wraps any importer
//! with a forever-memo: within one evaluator session the same `(from,
//! path)` always yields byte-identical content, which the evaluator
//! requires.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;
use url::Url;

use crate::parse::ParseResult;
use jsonnet_overlay::Overlay;

/// A resolved import: the source text and the filename it was found at.
#[derive(Clone, Debug)]
pub struct Imported {
    pub contents: Arc<str>,
    pub found_at: String,
}

#[derive(Clone, Debug)]
pub struct ImportError {
    pub message: String,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ImportError {}

pub trait Importer: Send + Sync {
    fn import(&self, from: &str, path: &str) -> Result<Imported, ImportError>;
}

/// A directory entry for import-path completion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Directory listing across the workspace root and search paths, used by
/// the completion surface.
pub trait WorkspaceDirs: Send + Sync {
    /// Entries of `path` (relative to the root) under the root and every
    /// search path, de-duplicated by name, hidden files skipped.
    fn list_dir(&self, path: &str) -> Vec<DirEntry>;
}

/// Filesystem importer rooted at the workspace.
pub struct FsImporter {
    root: PathBuf,
    search_paths: Vec<String>,
    jpaths: Mutex<Vec<String>>,
    overlay: Arc<Overlay<ParseResult>>,
}

impl FsImporter {
    pub fn new(
        root: PathBuf,
        search_paths: Vec<String>,
        overlay: Arc<Overlay<ParseResult>>,
    ) -> Self {
        FsImporter {
            root,
            search_paths,
            jpaths: Mutex::new(Vec::new()),
            overlay,
        }
    }

    /// Replace the user-configured search paths (reconfigurable at runtime).
    pub fn set_jpaths(&self, jpaths: Vec<String>) {
        *self.jpaths.lock() = jpaths;
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, from: &str, path: &str) -> Vec<PathBuf> {
        let mut res = Vec::new();
        if Path::new(path).is_absolute() {
            res.push(PathBuf::from(path));
            return res;
        }

        res.push(self.root.join(path));
        if let Some(from_dir) = Path::new(from).parent() {
            if from_dir.is_absolute() {
                res.push(from_dir.join(path));
            } else {
                res.push(self.root.join(from_dir).join(path));
            }
        }
        for sp in &self.search_paths {
            res.push(self.root.join(sp).join(path));
        }
        for jp in self.jpaths.lock().iter() {
            let jp = Path::new(jp);
            if jp.is_absolute() {
                res.push(jp.join(path));
            } else {
                res.push(self.root.join(jp).join(path));
            }
        }
        res
    }

    /// Read a candidate, preferring the overlay's parsed snapshot (an
    /// unparsable buffer is not useful to importers).
    fn read_candidate(&self, candidate: &Path) -> Option<Arc<str>> {
        if let Ok(uri) = Url::from_file_path(candidate) {
            if let Some(entry) = self.overlay.parsed(&uri) {
                return Some(entry.contents.clone());
            }
        }
        std::fs::read_to_string(candidate)
            .ok()
            .map(|s| Arc::from(s.as_str()))
    }
}

impl Importer for FsImporter {
    fn import(&self, from: &str, path: &str) -> Result<Imported, ImportError> {
        let candidates = self.candidates(from, path);
        for candidate in &candidates {
            if let Some(contents) = self.read_candidate(candidate) {
                trace!(path, found_at = %candidate.display(), "import resolved");
                return Ok(Imported {
                    contents,
                    found_at: candidate.to_string_lossy().into_owned(),
                });
            }
        }
        Err(ImportError {
            message: format!(
                "path '{path}' not found in {} candidate locations",
                candidates.len()
            ),
        })
    }
}

impl WorkspaceDirs for FsImporter {
    fn list_dir(&self, path: &str) -> Vec<DirEntry> {
        let mut seen: FxHashMap<String, bool> = FxHashMap::default();
        let mut res = Vec::new();

        let mut bases = vec![String::new()];
        bases.extend(self.search_paths.iter().cloned());
        bases.extend(self.jpaths.lock().iter().cloned());

        for base in bases {
            let dir = self.root.join(&base).join(path);
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') || seen.contains_key(&name) {
                    continue;
                }
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                seen.insert(name.clone(), true);
                res.push(DirEntry { name, is_dir });
            }
        }
        res.sort_by(|a, b| a.name.cmp(&b.name));
        res
    }
}

/// Memoising wrapper. Keeps the contents of each imported file stable for
/// the lifetime of the session: the same `(from, path)` must return
/// byte-identical content across calls, and two imports landing on the
/// same resolved file must share one buffer.
pub struct CachingImporter {
    inner: Arc<dyn Importer>,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    found_at: FxHashMap<(String, String), String>,
    not_found: FxHashMap<(String, String), String>,
    contents: FxHashMap<String, Arc<str>>,
}

impl CachingImporter {
    pub fn new(inner: Arc<dyn Importer>) -> Self {
        CachingImporter {
            inner,
            state: Mutex::new(CacheState::default()),
        }
    }
}

impl Importer for CachingImporter {
    fn import(&self, from: &str, path: &str) -> Result<Imported, ImportError> {
        let key = (from.to_string(), path.to_string());
        let mut state = self.state.lock();

        if let Some(found_at) = state.found_at.get(&key) {
            // always serve from the cache: the evaluator panics if a file
            // changes underneath it
            let contents = state.contents[found_at].clone();
            return Ok(Imported {
                contents,
                found_at: found_at.clone(),
            });
        }
        if let Some(message) = state.not_found.get(&key) {
            return Err(ImportError {
                message: message.clone(),
            });
        }

        match self.inner.import(from, path) {
            Ok(imported) => {
                state.found_at.insert(key, imported.found_at.clone());
                let contents = state
                    .contents
                    .entry(imported.found_at.clone())
                    .or_insert_with(|| imported.contents.clone())
                    .clone();
                Ok(Imported {
                    contents,
                    found_at: imported.found_at,
                })
            }
            Err(err) => {
                state.not_found.insert(key, err.message.clone());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    fn importer(root: &Path) -> FsImporter {
        FsImporter::new(root.to_path_buf(), vec![], Arc::new(Overlay::new()))
    }

    #[test]
    fn resolves_relative_to_root_and_importer() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "lib/a.libsonnet", "{a: 1}");
        write_file(tmp.path(), "lib/b.libsonnet", "import 'a.libsonnet'");

        let imp = importer(tmp.path());
        // relative to the importing file's directory
        let from = tmp.path().join("lib/b.libsonnet");
        let got = imp.import(from.to_str().unwrap(), "a.libsonnet").unwrap();
        assert_eq!(&*got.contents, "{a: 1}");
    }

    #[test]
    fn jpaths_are_consulted() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "vendor/dep.libsonnet", "{dep: true}");

        let imp = importer(tmp.path());
        assert!(imp.import("main.jsonnet", "dep.libsonnet").is_err());

        imp.set_jpaths(vec!["vendor".to_string()]);
        let got = imp.import("main.jsonnet", "dep.libsonnet").unwrap();
        assert_eq!(&*got.contents, "{dep: true}");
    }

    #[test]
    fn overlay_wins_over_disk() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.libsonnet", "{stale: true}");

        let overlay: Arc<Overlay<ParseResult>> = Arc::new(Overlay::new());
        let uri = Url::from_file_path(tmp.path().join("a.libsonnet")).unwrap();
        overlay.replace(
            &uri,
            1,
            "{fresh: true}".to_string(),
            |text, last| (crate::parse::parse_with_recovery("a.libsonnet", text, last), true),
            |_| {},
        );

        let imp = FsImporter::new(tmp.path().to_path_buf(), vec![], overlay);
        let got = imp.import("main.jsonnet", "a.libsonnet").unwrap();
        assert_eq!(&*got.contents, "{fresh: true}");
    }

    #[test]
    fn caching_importer_replays_identically() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.libsonnet", "{v: 1}");

        let caching = CachingImporter::new(Arc::new(importer(tmp.path())));
        let first = caching.import("main.jsonnet", "a.libsonnet").unwrap();

        // mutate the file on disk; the session must not notice
        write_file(tmp.path(), "a.libsonnet", "{v: 2}");
        let second = caching.import("main.jsonnet", "a.libsonnet").unwrap();
        assert!(Arc::ptr_eq(&first.contents, &second.contents));

        // misses are cached too
        assert!(caching.import("main.jsonnet", "nope.libsonnet").is_err());
        assert!(caching.import("main.jsonnet", "nope.libsonnet").is_err());
    }

    #[test]
    fn dir_listing_dedups_and_skips_hidden() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.libsonnet", "");
        write_file(tmp.path(), ".hidden.libsonnet", "");
        write_file(tmp.path(), "sub/b.libsonnet", "");
        write_file(tmp.path(), "vendor/a.libsonnet", "");

        let imp = FsImporter::new(
            tmp.path().to_path_buf(),
            vec!["vendor".to_string()],
            Arc::new(Overlay::new()),
        );
        let entries = imp.list_dir("");
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"a.libsonnet"));
        assert!(names.contains(&"sub"));
        assert!(names.contains(&"vendor"));
        assert!(!names.iter().any(|n| n.starts_with('.')));
        // the root's a.libsonnet shadows vendor's
        assert_eq!(names.iter().filter(|n| **n == "a.libsonnet").count(), 1);
        let sub = entries.iter().find(|e| e.name == "sub").unwrap();
        assert!(sub.is_dir);
    }

    #[test]
    fn replay_is_byte_identical_for_same_from_path() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "x.libsonnet", "{x: 1}");
        let caching = CachingImporter::new(Arc::new(importer(tmp.path())));

        let a = caching.import("a.jsonnet", "x.libsonnet").unwrap();
        let b = caching.import("b.jsonnet", "x.libsonnet").unwrap();
        // distinct (from, path) keys landing on one file share a buffer
        assert!(Arc::ptr_eq(&a.contents, &b.contents));
    }
}
