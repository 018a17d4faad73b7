//! The `find` tool: fuzzy or regexp matching over the cached path index.
use serde::Serialize;
use std::path::{PathBuf, MAIN_SEPARATOR};
use tracing::{debug, info};

use crate::cache::IndexCache;
use crate::errors::SearchResult;
use crate::options::ScanOptions;
use crate::pattern::{Pattern, Span};
use crate::policy::{normalize_suffixes, PolicyView};
use crate::walk::{is_dir_marker, normalize_roots, Traversal};

/// A path whose root-relative part matched the pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundPath {
    pub path: String,
    pub is_directory: bool,
    /// Byte ranges into `path` to highlight
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone)]
pub struct FindRequest {
    pub pattern: Pattern,
    pub roots: Vec<PathBuf>,
}

impl FindRequest {
    pub fn new(pattern: Pattern, roots: Vec<PathBuf>) -> Self {
        Self { pattern, roots }
    }
}

/// Builds the index cache for a discovery run: TTL from the policy, directory
/// entries kept when the options ask for them
pub fn index_cache(
    dir: Option<PathBuf>,
    policy: &dyn PolicyView,
    options: &ScanOptions,
) -> SearchResult<IndexCache> {
    let dir = match dir {
        Some(dir) => dir,
        None => IndexCache::default_dir()?,
    };
    Ok(IndexCache::new(dir)
        .with_ttl(policy.index_ttl())
        .include_dirs(options.include_dirs))
}

/// Matches every indexed path under the request's roots.
///
/// The pattern sees each path relative to the root containing it, so the
/// root's own directories never produce hits. Results keep index order and
/// stop at the policy's `max_matches`.
pub fn find(
    request: &FindRequest,
    policy: &dyn PolicyView,
    options: &ScanOptions,
    cache: &mut IndexCache,
) -> SearchResult<Vec<FoundPath>> {
    let roots = normalize_roots(&request.roots)?;
    if options.force_reset {
        cache.reset(&roots)?;
    }

    // the index is shared by every suffix filter, so it is built without one
    let source_options = options.clone().suffixes(Some(Vec::new()));
    let mut source = Traversal::new(policy, &source_options).include_dirs(true);
    let paths = cache.load(&roots, &mut source)?;
    debug!("{} indexed paths for {} root(s)", paths.len(), roots.len());

    let suffixes = match &options.suffixes {
        Some(s) => normalize_suffixes(s.clone()),
        None => policy.suffix_filter().to_vec(),
    };
    let root_texts: Vec<String> = roots
        .iter()
        .map(|r| r.to_string_lossy().into_owned())
        .collect();
    let cap = policy.max_matches();

    let mut found = Vec::new();
    for path in paths {
        if cap.is_some_and(|cap| found.len() >= cap) {
            debug!("Reached match limit of {}", found.len());
            break;
        }

        let is_directory = is_dir_marker(&path);
        if !is_directory && !has_suffix(&path, &suffixes) {
            continue;
        }

        let offset = relative_offset(&path, &root_texts);
        let Some(spans) = request.pattern.find(&path[offset..]) else {
            continue;
        };
        let spans = spans
            .into_iter()
            .map(|(start, end)| (start + offset, end + offset))
            .collect();
        found.push(FoundPath {
            path,
            is_directory,
            spans,
        });
    }

    info!("Found {} paths matching '{}'", found.len(), request.pattern);
    Ok(found)
}

fn has_suffix(path: &str, suffixes: &[String]) -> bool {
    if suffixes.is_empty() {
        return true;
    }
    let name = path
        .rsplit(|c| c == '/' || c == MAIN_SEPARATOR)
        .next()
        .unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            suffixes.iter().any(|s| s.eq_ignore_ascii_case(ext))
        }
        _ => false,
    }
}

/// Byte offset where the path stops being part of its (longest) root
fn relative_offset(path: &str, roots: &[String]) -> usize {
    roots
        .iter()
        .filter_map(|root| {
            let rest = path.strip_prefix(root.as_str())?;
            if root.ends_with(MAIN_SEPARATOR) {
                Some(root.len())
            } else if rest.is_empty() {
                // the root is a file, match its base name
                Some(
                    root.rfind(MAIN_SEPARATOR)
                        .map_or(0, |i| i + MAIN_SEPARATOR.len_utf8()),
                )
            } else if rest.starts_with(MAIN_SEPARATOR) {
                Some(root.len() + MAIN_SEPARATOR.len_utf8())
            } else {
                None
            }
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;
    use std::fs;
    use tempfile::tempdir;

    fn fuzzy(raw: &str) -> Pattern {
        Pattern::fuzzy(raw, None, false).unwrap()
    }

    #[test]
    fn test_relative_offset() {
        let roots = vec!["/r".to_string(), "/r/sub".to_string()];
        assert_eq!(relative_offset("/r/a.txt", &roots), 3);
        assert_eq!(relative_offset("/r/sub/b.txt", &roots), 7);
        assert_eq!(relative_offset("/rx/c.txt", &roots), 0);

        let file_root = vec!["/r/src/foo_world.rs".to_string()];
        assert_eq!(relative_offset("/r/src/foo_world.rs", &file_root), 7);
    }

    #[test]
    fn test_has_suffix() {
        let suffixes = vec!["rs".to_string()];
        assert!(has_suffix("/r/main.RS", &suffixes));
        assert!(!has_suffix("/r/main.py", &suffixes));
        assert!(!has_suffix("/r/.rs", &suffixes));
        assert!(has_suffix("/r/anything", &[]));
    }

    #[test]
    fn test_find_matches_relative_paths() {
        let root = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        fs::create_dir_all(root.path().join("src")).unwrap();
        fs::write(root.path().join("src/foo_world.rs"), "").unwrap();
        fs::write(root.path().join("wolf.rs"), "").unwrap();

        let policy = Policy::permissive();
        let options = ScanOptions::new();
        let mut cache = index_cache(Some(cache_dir.path().to_path_buf()), &policy, &options).unwrap();
        let request = FindRequest::new(fuzzy("fw"), vec![root.path().to_path_buf()]);

        let found = find(&request, &policy, &options, &mut cache).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("foo_world.rs"));
        for &(start, end) in &found[0].spans {
            let piece = &found[0].path[start..end];
            assert!(piece == "f" || piece == "w");
        }
    }

    #[test]
    fn test_find_file_root() {
        let root = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        let file = root.path().join("foo_world.rs");
        fs::write(&file, "").unwrap();

        let policy = Policy::permissive();
        let options = ScanOptions::new();
        let mut cache = index_cache(Some(cache_dir.path().to_path_buf()), &policy, &options).unwrap();
        let request = FindRequest::new(fuzzy("fw"), vec![file.clone()]);

        let found = find(&request, &policy, &options, &mut cache).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, file.display().to_string());
        let base = found[0].path.len() - "foo_world.rs".len();
        assert!(found[0].spans.iter().all(|&(start, _)| start >= base));
    }

    #[test]
    fn test_find_uses_cache_until_reset() {
        let root = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        fs::write(root.path().join("first.txt"), "").unwrap();

        let policy = Policy::permissive();
        let options = ScanOptions::new();
        let request = FindRequest::new(fuzzy("txt"), vec![root.path().to_path_buf()]);

        let mut cache = index_cache(Some(cache_dir.path().to_path_buf()), &policy, &options).unwrap();
        assert_eq!(find(&request, &policy, &options, &mut cache).unwrap().len(), 1);

        fs::write(root.path().join("second.txt"), "").unwrap();
        let mut cache = index_cache(Some(cache_dir.path().to_path_buf()), &policy, &options).unwrap();
        assert_eq!(find(&request, &policy, &options, &mut cache).unwrap().len(), 1);

        let options = options.force_reset(true);
        assert_eq!(find(&request, &policy, &options, &mut cache).unwrap().len(), 2);
    }

    #[test]
    fn test_find_directories_and_cap() {
        let root = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        for name in ["alpha", "beta", "gamma"] {
            fs::create_dir_all(root.path().join(name)).unwrap();
            fs::write(root.path().join(name).join("a.txt"), "").unwrap();
        }

        let policy = Policy::permissive();
        let options = ScanOptions::new().include_dirs(true);
        let request = FindRequest::new(fuzzy("a"), vec![root.path().to_path_buf()]);
        let mut cache = index_cache(Some(cache_dir.path().to_path_buf()), &policy, &options).unwrap();
        let found = find(&request, &policy, &options, &mut cache).unwrap();
        assert!(found.iter().any(|f| f.is_directory && f.path.ends_with("alpha/")));

        let capped = policy.with_max_matches(Some(2));
        let found = find(&request, &capped, &options, &mut cache).unwrap();
        assert_eq!(found.len(), 2);
    }
}
