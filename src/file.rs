//! File-Backed Containers
//!
//! Lists and maps whose content lives in a JSON file. Every read re-stats the
//! file and, only when its modification time moved, re-parses it and swaps
//! the new content in under the container's write lock. A failed stat, read
//! or parse is returned to the caller and leaves the last good content in
//! place.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};

type Parser<C> = Box<dyn Fn(&[u8]) -> Result<C> + Send + Sync>;

struct Loaded<C> {
    /// Modification time of the file the content was parsed from
    modified: Option<SystemTime>,
    content: C,
}

// == Lazy File ==
/// Content parsed from a file, reloaded on access when the file changes.
pub struct LazyFile<C> {
    path: PathBuf,
    parser: Parser<C>,
    loaded: RwLock<Loaded<C>>,
}

impl<C> fmt::Debug for LazyFile<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyFile")
            .field("path", &self.path)
            .field("modified", &self.loaded.read().modified)
            .finish()
    }
}

impl<C: DeserializeOwned + Default> LazyFile<C> {
    /// Creates a container parsing the file as JSON. Nothing is read until
    /// the first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_parser(path, |bytes| Ok(serde_json::from_slice(bytes)?))
    }
}

impl<C: Default> LazyFile<C> {
    /// Creates a container with a custom parser.
    pub fn with_parser<P>(path: impl Into<PathBuf>, parser: P) -> Self
    where
        P: Fn(&[u8]) -> Result<C> + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            parser: Box::new(parser),
            loaded: RwLock::new(Loaded {
                modified: None,
                content: C::default(),
            }),
        }
    }
}

impl<C> LazyFile<C> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time of the currently loaded content, if any was loaded.
    pub fn modified(&self) -> Option<SystemTime> {
        self.loaded.read().modified
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn stat(&self) -> Result<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map_err(|source| self.io_error(source))
    }

    // == Refresh ==
    /// Reloads the content if the file's modification time changed.
    ///
    /// Returns whether a reload happened.
    pub fn refresh(&self) -> Result<bool> {
        let modified = self.stat()?;
        if self.loaded.read().modified == Some(modified) {
            return Ok(false);
        }

        let mut loaded = self.loaded.write();
        // Another reader may have reloaded while we waited for the lock
        if loaded.modified == Some(modified) {
            return Ok(false);
        }

        let bytes = fs::read(&self.path).map_err(|source| self.io_error(source))?;
        let content = (self.parser)(&bytes).map_err(|err| {
            warn!(
                path = %self.path.display(),
                error = %err,
                "Keeping previous content after failed reload"
            );
            err
        })?;

        loaded.content = content;
        loaded.modified = Some(modified);
        debug!(path = %self.path.display(), "Reloaded file-backed content");
        Ok(true)
    }

    // == Read ==
    /// Refreshes, then runs `f` on the content under the shared lock.
    pub fn read<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&C) -> R,
    {
        self.refresh()?;
        Ok(f(&self.loaded.read().content))
    }

    /// Runs `f` on the last loaded content without touching the file.
    pub fn read_cached<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&C) -> R,
    {
        f(&self.loaded.read().content)
    }
}

// == File List ==
/// A list loaded from a JSON array file.
#[derive(Debug)]
pub struct FileList<T> {
    file: LazyFile<Vec<T>>,
}

impl<T: DeserializeOwned> FileList<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: LazyFile::new(path),
        }
    }
}

impl<T> FileList<T> {
    pub fn file(&self) -> &LazyFile<Vec<T>> {
        &self.file
    }

    pub fn len(&self) -> Result<usize> {
        self.file.read(Vec::len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Visits items in order until `f` returns false.
    pub fn range<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(usize, &T) -> bool,
    {
        self.file.read(|items| {
            for (index, item) in items.iter().enumerate() {
                if !f(index, item) {
                    break;
                }
            }
        })
    }
}

impl<T: Clone> FileList<T> {
    /// Returns the item at `index`.
    ///
    /// # Errors
    /// [`Error::IndexOutOfRange`] when `index` is past the end, besides any
    /// reload failure.
    pub fn get(&self, index: usize) -> Result<T> {
        self.file.read(|items| {
            items.get(index).cloned().ok_or(Error::IndexOutOfRange {
                index,
                len: items.len(),
            })
        })?
    }
}

// == File Map ==
/// A map loaded from a JSON object file.
#[derive(Debug)]
pub struct FileMap<K, V> {
    file: LazyFile<HashMap<K, V>>,
}

impl<K, V> FileMap<K, V>
where
    K: DeserializeOwned + Eq + Hash,
    V: DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: LazyFile::new(path),
        }
    }
}

impl<K, V> FileMap<K, V>
where
    K: Eq + Hash,
{
    pub fn file(&self) -> &LazyFile<HashMap<K, V>> {
        &self.file
    }

    pub fn len(&self) -> Result<usize> {
        self.file.read(HashMap::len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the value under `key`; a missing key is `Ok(None)`.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.file.read(|map| map.get(key).cloned())
    }

    /// Visits entries in no particular order until `f` returns false.
    pub fn range<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.file.read(|map| {
            for (key, value) in map {
                if !f(key, value) {
                    break;
                }
            }
        })
    }
}
