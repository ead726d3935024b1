//! Document overlay.
//!
//! Per-URI versioned text entries with serialized delta application. Each
//! URI keeps two snapshots: `current` (the latest text) and `parsed` (the
//! latest entry whose parse succeeded, possibly via recovery), with
//! `parsed.version <= current.version`.
//!
//! Concurrency follows a two-lock scheme. An arrival lock guards the
//! pending-update queue and the file map; updates enqueue under it first so
//! ordering is preserved even when callers race. The per-file update lock
//! serializes application: the holder drains the queue (sorted by version,
//! defensively), applies each update, and invokes the caller's callback
//! once per drained batch *while still holding the lock*, so the callee can
//! serialize downstream work such as diagnostics publishing.
//!
//! Protocol invariants (a delta with no current entry, a version gap) drop
//! the file's entry and log an error; the next full replace recovers.

mod edits;

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{error, trace};
use url::Url;

pub use edits::{apply_edits, offset_of, EditError, TextEdit};

/// One immutable snapshot of a document.
#[derive(Debug)]
pub struct Entry<D> {
    pub contents: Arc<str>,
    pub version: i64,
    /// Caller data attached by the parse callback.
    pub data: D,
}

/// Snapshots handed to the update callback after a batch.
pub struct UpdateResult<D> {
    pub current: Option<Arc<Entry<D>>>,
    pub parsed: Option<Arc<Entry<D>>>,
}

/// Parse callback: receives the updated contents and the last edit of the
/// update (absent for full replaces). Returns the data to attach and
/// whether the parse succeeded.
pub type ParseOutcome<D> = (D, bool);

type BoxedParse<D> = Box<dyn FnOnce(&str, Option<&TextEdit>) -> ParseOutcome<D> + Send>;

enum UpdateKind<D> {
    Close,
    Replace(String, BoxedParse<D>),
    Edits(Vec<TextEdit>, BoxedParse<D>),
}

struct FileUpdate<D> {
    version: i64,
    kind: UpdateKind<D>,
}

#[derive(Default)]
struct EntryPair<D> {
    current: Option<Arc<Entry<D>>>,
    parsed: Option<Arc<Entry<D>>>,
}

struct OverlayFile<D> {
    /// Held while applying a batch and running the user callback.
    update_lock: Mutex<()>,
    /// Guards the entry pointers only; never held across callbacks.
    entries: Mutex<EntryPair<D>>,
}

impl<D> Default for OverlayFile<D> {
    fn default() -> Self {
        OverlayFile {
            update_lock: Mutex::new(()),
            entries: Mutex::new(EntryPair {
                current: None,
                parsed: None,
            }),
        }
    }
}

/// The overlay: a map of open documents with serialized updates.
pub struct Overlay<D> {
    /// Arrival lock: pending updates per URI.
    queue: Mutex<FxHashMap<Url, Vec<FileUpdate<D>>>>,
    files: Mutex<FxHashMap<Url, Arc<OverlayFile<D>>>>,
}

impl<D> Default for Overlay<D> {
    fn default() -> Self {
        Overlay {
            queue: Mutex::new(FxHashMap::default()),
            files: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<D: Clone> Overlay<D> {
    pub fn new() -> Self {
        Overlay::default()
    }

    /// Replace the whole document. Updates `parsed` only when the parse
    /// callback reports success.
    pub fn replace<P, F>(&self, uri: &Url, version: i64, text: String, parse: P, done: F)
    where
        P: FnOnce(&str, Option<&TextEdit>) -> ParseOutcome<D> + Send + 'static,
        F: FnOnce(UpdateResult<D>),
    {
        self.push_update(
            uri,
            FileUpdate {
                version,
                kind: UpdateKind::Replace(text, Box::new(parse)),
            },
            done,
        );
    }

    /// Apply delta edits on top of the current entry. Requires
    /// `version == current.version + 1`.
    pub fn update<P, F>(&self, uri: &Url, version: i64, edits: Vec<TextEdit>, parse: P, done: F)
    where
        P: FnOnce(&str, Option<&TextEdit>) -> ParseOutcome<D> + Send + 'static,
        F: FnOnce(UpdateResult<D>),
    {
        self.push_update(
            uri,
            FileUpdate {
                version,
                kind: UpdateKind::Edits(edits, Box::new(parse)),
            },
            done,
        );
    }

    /// Drop both entries for the document.
    pub fn close(&self, uri: &Url) {
        self.push_update(
            uri,
            FileUpdate {
                version: 0,
                kind: UpdateKind::Close,
            },
            |_| {},
        );
    }

    /// Non-blocking snapshot of the latest text.
    pub fn current(&self, uri: &Url) -> Option<Arc<Entry<D>>> {
        let file = self.files.lock().get(uri).cloned()?;
        let entries = file.entries.lock();
        entries.current.clone()
    }

    /// Non-blocking snapshot of the latest successfully parsed text.
    pub fn parsed(&self, uri: &Url) -> Option<Arc<Entry<D>>> {
        let file = self.files.lock().get(uri).cloned()?;
        let entries = file.entries.lock();
        entries.parsed.clone()
    }

    fn get_file(&self, uri: &Url) -> Arc<OverlayFile<D>> {
        let mut files = self.files.lock();
        files.entry(uri.clone()).or_default().clone()
    }

    fn push_update<F>(&self, uri: &Url, update: FileUpdate<D>, done: F)
    where
        F: FnOnce(UpdateResult<D>),
    {
        // enqueue first so ordering survives callers racing to the lock
        {
            let mut queue = self.queue.lock();
            queue.entry(uri.clone()).or_default().push(update);
        }

        let file = self.get_file(uri);
        let _guard = file.update_lock.lock();

        let mut pending = {
            let mut queue = self.queue.lock();
            queue.remove(uri).unwrap_or_default()
        };
        if pending.is_empty() {
            // another holder drained our update
            return;
        }
        // defensive ordering in case a batch arrived out of order
        pending.sort_by_key(|u| u.version);

        for update in pending {
            self.apply_one(uri, &file, update);
        }

        let (current, parsed) = {
            let entries = file.entries.lock();
            (entries.current.clone(), entries.parsed.clone())
        };
        // intentionally called under the update lock to linearize updates
        // and let the callee batch work like diagnostics publishing
        done(UpdateResult { current, parsed });
    }

    fn apply_one(&self, uri: &Url, file: &OverlayFile<D>, update: FileUpdate<D>) {
        match update.kind {
            UpdateKind::Close => {
                let mut entries = file.entries.lock();
                entries.current = None;
                entries.parsed = None;
            }
            UpdateKind::Replace(text, parse) => {
                let (data, ok) = parse(&text, None);
                let entry = Arc::new(Entry {
                    contents: Arc::from(text.as_str()),
                    version: update.version,
                    data,
                });
                let mut entries = file.entries.lock();
                entries.current = Some(entry.clone());
                if ok {
                    entries.parsed = Some(entry);
                }
            }
            UpdateKind::Edits(edits, parse) => {
                let (current, parsed_is_current) = {
                    let entries = file.entries.lock();
                    let parsed_is_current = match (&entries.current, &entries.parsed) {
                        (Some(c), Some(p)) => c.version == p.version,
                        _ => false,
                    };
                    (entries.current.clone(), parsed_is_current)
                };

                let Some(current) = current else {
                    error!(%uri, "invariant: delta update for a file with no entry");
                    self.drop_entries(file);
                    return;
                };
                if update.version != current.version + 1 {
                    error!(
                        %uri,
                        current = current.version,
                        new = update.version,
                        "invariant: out-of-order delta update"
                    );
                    self.drop_entries(file);
                    return;
                }

                if edits.is_empty() {
                    // version bump only: keep text and parse data, under a
                    // fresh entry so in-flight readers keep their snapshot
                    let entry = Arc::new(Entry {
                        contents: current.contents.clone(),
                        version: update.version,
                        data: current.data.clone(),
                    });
                    let mut entries = file.entries.lock();
                    entries.current = Some(entry.clone());
                    if parsed_is_current {
                        entries.parsed = Some(entry);
                    }
                    return;
                }

                let updated = match apply_edits(&current.contents, &edits) {
                    Ok(updated) => updated,
                    Err(err) => {
                        error!(%uri, %err, "invariant: delta edit does not apply");
                        self.drop_entries(file);
                        return;
                    }
                };
                let last_edit = edits.last();
                let (data, ok) = parse(&updated, last_edit);
                trace!(%uri, version = update.version, parsed = ok, "applied delta update");

                let entry = Arc::new(Entry {
                    contents: Arc::from(updated.as_str()),
                    version: update.version,
                    data,
                });
                let mut entries = file.entries.lock();
                entries.current = Some(entry.clone());
                if ok {
                    entries.parsed = Some(entry);
                }
            }
        }
    }

    fn drop_entries(&self, file: &OverlayFile<D>) {
        let mut entries = file.entries.lock();
        entries.current = None;
        entries.parsed = None;
    }
}

#[cfg(test)]
mod tests;
