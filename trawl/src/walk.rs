//! Depth-first directory traversal driven by an explicit worklist.
//!
//! Every popped path is stat'ed once and turned into a [`Decision`] by the
//! policy. Directories push their children in reverse name order, so entries
//! come out depth-first and sorted. Roots are always walked: the policy only
//! judges what lies beneath them.
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::{debug, trace, warn};

use crate::errors::{is_entry_error, retry_on_fd_exhaustion, SearchError, SearchResult};
use crate::metrics::ScanStats;
use crate::options::ScanOptions;
use crate::policy::{normalize_suffixes, Decision, PolicyView};

/// A filesystem entry that survived policy filtering
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Candidate {
    pub path: PathBuf,
    pub is_directory: bool,
    pub is_symlink: bool,
    pub suffix: Option<String>,
}

impl Candidate {
    pub fn new(path: PathBuf, is_directory: bool, is_symlink: bool) -> Self {
        let suffix = if is_directory {
            None
        } else {
            path.extension().map(|e| e.to_string_lossy().into_owned())
        };
        Self {
            path,
            is_directory,
            is_symlink,
            suffix,
        }
    }

    /// The path as text, with a trailing separator for directories
    pub fn display_path(&self) -> String {
        let mut s = self.path.to_string_lossy().into_owned();
        if self.is_directory && !s.ends_with(MAIN_SEPARATOR) {
            s.push(MAIN_SEPARATOR);
        }
        s
    }

    pub fn file_name(&self) -> String {
        base_name(&self.path)
    }
}

/// Anything that can produce the path list stored in the index cache
pub trait PathSource {
    fn collect_paths(&mut self, roots: &[PathBuf]) -> SearchResult<Vec<String>>;
}

/// Makes roots absolute, then sorts and de-duplicates them
pub fn normalize_roots(roots: &[PathBuf]) -> SearchResult<Vec<PathBuf>> {
    let mut absolute = roots
        .iter()
        .map(|r| std::path::absolute(r).map_err(SearchError::IoError))
        .collect::<SearchResult<Vec<_>>>()?;
    absolute.sort();
    absolute.dedup();
    Ok(absolute)
}

/// Returns true if a rendered path names a directory
pub fn is_dir_marker(path: &str) -> bool {
    path.ends_with(MAIN_SEPARATOR) || path.ends_with('/')
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Walks root paths under a prune/skip policy
pub struct Traversal<'a> {
    policy: &'a dyn PolicyView,
    suffixes: Vec<String>,
    follow_symlinks: bool,
    include_dirs: bool,
    verbose: bool,
    stats: ScanStats,
}

impl<'a> Traversal<'a> {
    pub fn new(policy: &'a dyn PolicyView, options: &ScanOptions) -> Self {
        let suffixes = match &options.suffixes {
            Some(s) => normalize_suffixes(s.clone()),
            None => policy.suffix_filter().to_vec(),
        };
        Self {
            policy,
            suffixes,
            follow_symlinks: options.follow_symlinks,
            include_dirs: options.include_dirs,
            verbose: options.verbose,
            stats: ScanStats::new(),
        }
    }

    pub fn include_dirs(mut self, yes: bool) -> Self {
        self.include_dirs = yes;
        self
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Walks every root and returns the sorted, de-duplicated candidates
    pub fn walk(&mut self, roots: &[PathBuf]) -> SearchResult<Vec<Candidate>> {
        let mut found = Vec::new();
        self.visit(roots, |candidate| {
            found.push(candidate);
            Ok(ControlFlow::Continue(()))
        })?;
        found.sort();
        found.dedup_by(|a, b| a.path == b.path);
        debug!("Traversal produced {} candidates", found.len());
        Ok(found)
    }

    /// Streams candidates to `f` in depth-first sorted order until it breaks
    pub fn visit<F>(&mut self, roots: &[PathBuf], mut f: F) -> SearchResult<()>
    where
        F: FnMut(Candidate) -> SearchResult<ControlFlow<()>>,
    {
        let roots = normalize_roots(roots)?;
        let mut stack: Vec<(PathBuf, bool)> = roots.into_iter().rev().map(|r| (r, true)).collect();
        let mut emitted: HashSet<PathBuf> = HashSet::new();
        let mut entered: HashSet<PathBuf> = HashSet::new();

        while let Some((path, is_root)) = stack.pop() {
            self.stats.entries_visited += 1;

            let meta = match retry_on_fd_exhaustion(&path, || self.stat(&path))? {
                Ok(meta) => meta,
                Err(e) if is_entry_error(&e) => {
                    self.log_unreadable(&path, &e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let is_dir = meta.is_dir();
            let is_symlink = if self.follow_symlinks {
                fs::symlink_metadata(&path)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false)
            } else {
                meta.file_type().is_symlink()
            };

            let decision = if is_root {
                if is_dir {
                    Decision::Descend
                } else {
                    Decision::EmitOnly
                }
            } else {
                self.policy.decide(&base_name(&path), is_dir)
            };

            match decision {
                Decision::PruneSubtree => {
                    trace!("Pruned {}", path.display());
                    self.stats.dirs_pruned += 1;
                    continue;
                }
                Decision::Skip => {
                    trace!("Skipped {}", path.display());
                    self.stats.entries_skipped += 1;
                    continue;
                }
                Decision::Descend | Decision::EmitOnly => {}
            }

            if !emitted.insert(path.clone()) {
                continue;
            }

            if !is_dir {
                let candidate = Candidate::new(path, false, is_symlink);
                if !self.accepts_suffix(&candidate) {
                    self.stats.entries_skipped += 1;
                    continue;
                }
                if f(candidate)?.is_break() {
                    return Ok(());
                }
                continue;
            }

            if self.follow_symlinks {
                if let Ok(canonical) = fs::canonicalize(&path) {
                    if !entered.insert(canonical) {
                        debug!("Already visited {}, not descending again", path.display());
                        continue;
                    }
                }
            }

            if self.include_dirs && f(Candidate::new(path.clone(), true, is_symlink))?.is_break() {
                return Ok(());
            }

            if let Some(children) = self.read_children(&path)? {
                stack.extend(children.into_iter().rev().map(|c| (c, false)));
            }
        }

        Ok(())
    }

    fn stat(&self, path: &Path) -> io::Result<fs::Metadata> {
        if self.follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
    }

    fn read_children(&mut self, dir: &Path) -> SearchResult<Option<Vec<PathBuf>>> {
        let listing = retry_on_fd_exhaustion(dir, || {
            fs::read_dir(dir)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<io::Result<Vec<_>>>()
        })?;

        match listing {
            Ok(mut children) => {
                children.sort();
                Ok(Some(children))
            }
            Err(e) if is_entry_error(&e) => {
                self.log_unreadable(dir, &e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn accepts_suffix(&self, candidate: &Candidate) -> bool {
        if self.suffixes.is_empty() {
            return true;
        }
        match &candidate.suffix {
            Some(ext) => self.suffixes.iter().any(|s| s.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    fn log_unreadable(&mut self, path: &Path, err: &io::Error) {
        self.stats.entries_unreadable += 1;
        if self.verbose {
            warn!("Skipping {}: {}", path.display(), err);
        } else {
            debug!("Skipping {}: {}", path.display(), err);
        }
    }
}

impl PathSource for Traversal<'_> {
    fn collect_paths(&mut self, roots: &[PathBuf]) -> SearchResult<Vec<String>> {
        Ok(self
            .walk(roots)?
            .iter()
            .map(Candidate::display_path)
            .collect())
    }
}
