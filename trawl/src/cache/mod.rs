mod key;

pub use key::{cache_file_name, cache_key, CACHE_FILE_PREFIX};

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::{SearchError, SearchResult};
use crate::walk::{is_dir_marker, PathSource};

/// On-disk cache of traversal results, one file per root set.
///
/// Files hold one path per line, directories included with a trailing
/// separator. A file is never patched: it is either read whole or rebuilt whole.
#[derive(Debug)]
pub struct IndexCache {
    dir: PathBuf,
    ttl: Option<Duration>,
    include_dirs: bool,
    memo: HashMap<String, Vec<String>>,
}

impl IndexCache {
    /// Creates a cache storing its files under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: None,
            include_dirs: false,
            memo: HashMap::new(),
        }
    }

    /// The per-user cache directory, `$XDG_CACHE_HOME/trawl` on Linux
    pub fn default_dir() -> SearchResult<PathBuf> {
        dirs::cache_dir()
            .map(|d| d.join("trawl"))
            .ok_or_else(|| SearchError::cache_error("no cache directory for this platform"))
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Keep directory entries when loading
    pub fn include_dirs(mut self, yes: bool) -> Self {
        self.include_dirs = yes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the cache file for a set of roots
    pub fn path_for(&self, roots: &[PathBuf]) -> SearchResult<PathBuf> {
        Ok(self.dir.join(cache_file_name(roots)?))
    }

    /// True when a TTL is set and the file is at least that old
    pub fn is_expired(&self, path: &Path) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        let Ok(mtime) = fs::metadata(path).and_then(|m| m.modified()) else {
            return false;
        };
        match SystemTime::now().duration_since(mtime) {
            Ok(age) => age >= ttl,
            // written in the future, keep it
            Err(_) => false,
        }
    }

    /// Drops the cache file and memoized list for a set of roots
    pub fn reset(&mut self, roots: &[PathBuf]) -> SearchResult<()> {
        let key = cache_key(roots)?;
        self.memo.remove(&key);
        let path = self.dir.join(format!("{}{}", CACHE_FILE_PREFIX, key));
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed index cache {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SearchError::IoError(e)),
        }
    }

    /// Returns the path list for `roots`, from memory, disk, or a fresh walk
    pub fn load(
        &mut self,
        roots: &[PathBuf],
        source: &mut dyn PathSource,
    ) -> SearchResult<Vec<String>> {
        let key = cache_key(roots)?;
        let path = self.dir.join(format!("{}{}", CACHE_FILE_PREFIX, key));

        if self.is_expired(&path) {
            debug!("Index cache {} expired", path.display());
            self.reset(roots)?;
        }

        if let Some(paths) = self.memo.get(&key) {
            return Ok(self.filter(paths));
        }

        if let Some(paths) = read_cache_file(&path) {
            debug!(
                "Loaded {} paths from index cache {}",
                paths.len(),
                path.display()
            );
            let filtered = self.filter(&paths);
            self.memo.insert(key, paths);
            return Ok(filtered);
        }

        self.rebuild(roots, source)
    }

    /// Walks `roots` again and replaces the cache file
    pub fn rebuild(
        &mut self,
        roots: &[PathBuf],
        source: &mut dyn PathSource,
    ) -> SearchResult<Vec<String>> {
        let key = cache_key(roots)?;
        let path = self.dir.join(format!("{}{}", CACHE_FILE_PREFIX, key));

        debug!("Rebuilding index cache {}", path.display());
        let paths = source.collect_paths(roots)?;

        if let Err(e) = self.write_cache_file(&path, &paths) {
            warn!("Could not write index cache {}: {}", path.display(), e);
        }

        let filtered = self.filter(&paths);
        self.memo.insert(key, paths);
        Ok(filtered)
    }

    fn filter(&self, paths: &[String]) -> Vec<String> {
        if self.include_dirs {
            paths.to_vec()
        } else {
            paths.iter().filter(|p| !is_dir_marker(p)).cloned().collect()
        }
    }

    fn write_cache_file(&self, path: &Path, paths: &[String]) -> SearchResult<()> {
        fs::create_dir_all(&self.dir)?;

        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            for p in paths {
                writeln!(writer, "{}", p)?;
            }
            writer.flush()?;
        }

        tmp.persist(path).map_err(|e| SearchError::IoError(e.error))?;
        Ok(())
    }
}

/// Reads a cache file; anything missing, unreadable, non-UTF-8 or empty is a miss
fn read_cache_file(path: &Path) -> Option<Vec<String>> {
    let bytes = fs::read(path).ok()?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => {
            warn!("Ignoring malformed index cache {}", path.display());
            return None;
        }
    };

    let paths: Vec<String> = text
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    if paths.is_empty() {
        None
    } else {
        Some(paths)
    }
}
