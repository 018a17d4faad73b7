//! Line-level rewriting of matched files: pattern substitution on referenced
//! lines, and trailing-whitespace stripping. Edits are planned in memory first
//! so callers can preview them, then written back atomically.
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::classify::{classify, Classification, SAMPLE_SIZE};
use crate::errors::{SearchError, SearchResult};
use crate::options::ScanOptions;
use crate::pattern::Pattern;
use crate::policy::PolicyView;
use crate::results::SearchOutput;
use crate::walk::Traversal;

/// One rewritten line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineEdit {
    pub line_number: usize,
    pub before: String,
    pub after: String,
}

/// All planned changes to a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileEdit {
    pub path: PathBuf,
    pub edits: Vec<LineEdit>,
    #[serde(skip)]
    original: String,
    #[serde(skip)]
    updated: String,
}

impl FileEdit {
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn updated(&self) -> &str {
        &self.updated
    }

    /// Writes the planned content, keeping the file's permissions
    pub fn apply(&self) -> SearchResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let permissions = fs::metadata(&self.path)?.permissions();

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(self.updated.as_bytes())?;
        tmp.flush()?;
        fs::set_permissions(tmp.path(), permissions)?;
        tmp.persist(&self.path)
            .map_err(|e| SearchError::IoError(e.error))?;

        debug!("Rewrote {} ({} lines)", self.path.display(), self.edits.len());
        Ok(())
    }
}

/// Applies every edit, returning how many files were written
pub fn apply_all(edits: &[FileEdit]) -> SearchResult<usize> {
    for edit in edits {
        edit.apply()?;
    }
    info!("Rewrote {} files", edits.len());
    Ok(edits.len())
}

/// Substitutes a regexp pattern on the lines a search referenced
#[derive(Debug, Clone)]
pub struct Replacer {
    pattern: Pattern,
    replacement: String,
}

impl Replacer {
    /// Fails for fuzzy patterns and for replacements naming missing groups
    pub fn new(pattern: Pattern, replacement: impl Into<String>) -> SearchResult<Self> {
        let replacement = replacement.into();
        pattern.check_replacement(&replacement)?;
        Ok(Self {
            pattern,
            replacement,
        })
    }

    /// Plans edits for every `path:line` reference in `output`.
    ///
    /// Files that are not valid UTF-8 are left alone.
    pub fn plan(&self, output: &SearchOutput) -> SearchResult<Vec<FileEdit>> {
        let mut plans = Vec::new();
        for result in &output.file_results {
            let lines: Vec<usize> = result.matches.iter().map(|m| m.line_number).collect();
            if let Some(edit) = self.plan_file(&result.path, &lines)? {
                plans.push(edit);
            }
        }
        Ok(plans)
    }

    /// Plans edits for the given 1-based lines of one file
    pub fn plan_file(&self, path: &Path, lines: &[usize]) -> SearchResult<Option<FileEdit>> {
        let Some(original) = read_text(path)? else {
            return Ok(None);
        };
        rewrite_lines(path, original, |n, content| {
            if !lines.contains(&n) {
                return Ok(None);
            }
            let replaced = self.pattern.replace_all(content, &self.replacement)?;
            Ok(Some(replaced.into_owned()))
        })
    }
}

/// Plans trailing-whitespace removal for one file
pub fn plan_strip(path: &Path) -> SearchResult<Option<FileEdit>> {
    let Some(original) = read_text(path)? else {
        return Ok(None);
    };
    rewrite_lines(path, original, |_, content| {
        Ok(Some(content.trim_end_matches([' ', '\t']).to_string()))
    })
}

/// Plans trailing-whitespace removal for every text file under `roots`
pub fn strip(
    roots: &[PathBuf],
    policy: &dyn PolicyView,
    options: &ScanOptions,
) -> SearchResult<Vec<FileEdit>> {
    let mut plans = Vec::new();
    let mut traversal = Traversal::new(policy, options).include_dirs(false);
    traversal.visit(roots, |candidate| {
        if candidate.is_symlink || !is_text(&candidate.path) {
            return Ok(ControlFlow::Continue(()));
        }
        if let Some(edit) = plan_strip(&candidate.path)? {
            plans.push(edit);
        }
        Ok(ControlFlow::Continue(()))
    })?;
    traversal.stats().log_stats();
    info!("{} files have trailing whitespace", plans.len());
    Ok(plans)
}

fn is_text(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut reader = BufReader::with_capacity(SAMPLE_SIZE, file);
    match reader.fill_buf() {
        Ok(sample) => classify(sample) != Classification::Binary,
        Err(_) => false,
    }
}

fn read_text(path: &Path) -> SearchResult<Option<String>> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Some(text)),
        Err(_) => {
            warn!("Not rewriting {}: not valid UTF-8", path.display());
            Ok(None)
        }
    }
}

/// Runs `f` over each line's content (line ending excluded) and reassembles
/// the file; `f` returns `None` to leave a line untouched
fn rewrite_lines<F>(path: &Path, original: String, mut f: F) -> SearchResult<Option<FileEdit>>
where
    F: FnMut(usize, &str) -> SearchResult<Option<String>>,
{
    let mut updated = String::with_capacity(original.len());
    let mut edits = Vec::new();

    for (i, raw) in original.split_inclusive('\n').enumerate() {
        let content = raw.trim_end_matches(['\n', '\r']);
        let ending = &raw[content.len()..];
        match f(i + 1, content)? {
            Some(new) if new != content => {
                updated.push_str(&new);
                edits.push(LineEdit {
                    line_number: i + 1,
                    before: content.to_string(),
                    after: new,
                });
            }
            _ => updated.push_str(content),
        }
        updated.push_str(ending);
    }

    if edits.is_empty() {
        return Ok(None);
    }
    Ok(Some(FileEdit {
        path: path.to_path_buf(),
        edits,
        original,
        updated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;
    use crate::results::{FileResult, Match};
    use crate::search::OutputMode;
    use tempfile::TempDir;

    fn regexp(raw: &str) -> Pattern {
        Pattern::regexp(raw, None, false).unwrap()
    }

    #[test]
    fn test_replace_referenced_lines_only() -> SearchResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("lib.rs");
        fs::write(&path, "fn old() {}\nfn old() {}\r\nfn old() {}")?;

        let replacer = Replacer::new(regexp(r"fn (\w+)\(\)"), "fn new_$1()")?;
        let edit = replacer.plan_file(&path, &[2, 3])?.unwrap();
        assert_eq!(edit.edits.len(), 2);
        assert_eq!(edit.edits[0].line_number, 2);
        assert_eq!(edit.updated(), "fn old() {}\nfn new_old() {}\r\nfn new_old() {}");

        edit.apply()?;
        assert_eq!(fs::read_to_string(&path)?, edit.updated());
        Ok(())
    }

    #[test]
    fn test_plan_from_search_output() -> SearchResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("a.txt");
        fs::write(&path, "TODO one\nkeep\nTODO two\n")?;

        let mut output = SearchOutput::new(OutputMode::Replace);
        output.add_file_result(FileResult {
            path: path.clone(),
            matches: vec![Match::new(1, "TODO one".to_string(), vec![(0, 4)])],
        });

        let plans = Replacer::new(regexp("TODO"), "DONE")?.plan(&output)?;
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].updated(), "DONE one\nkeep\nTODO two\n");
        assert_eq!(plans[0].original(), "TODO one\nkeep\nTODO two\n");
        assert_eq!(plans[0].edits[0].after, "DONE one");
        // nothing written yet
        assert_eq!(fs::read_to_string(&path)?, "TODO one\nkeep\nTODO two\n");
        Ok(())
    }

    #[test]
    fn test_no_change_is_no_plan() -> SearchResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("a.txt");
        fs::write(&path, "abc\n")?;
        let replacer = Replacer::new(regexp("zzz"), "y")?;
        assert!(replacer.plan_file(&path, &[1])?.is_none());
        Ok(())
    }

    #[test]
    fn test_fuzzy_and_bad_group_rejected() {
        let fuzzy = Pattern::fuzzy("abc", None, false).unwrap();
        assert!(Replacer::new(fuzzy, "x").is_err());
        assert!(Replacer::new(regexp("(a)"), "$3").is_err());
    }

    #[test]
    fn test_non_utf8_is_skipped() -> SearchResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [b'c', b'a', b'f', 0xe9, b'\n'])?;
        let replacer = Replacer::new(regexp("caf"), "CAF")?;
        assert!(replacer.plan_file(&path, &[1])?.is_none());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_apply_preserves_permissions() -> SearchResult<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new()?;
        let path = dir.path().join("run.sh");
        fs::write(&path, "echo hi  \n")?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;

        plan_strip(&path)?.unwrap().apply()?;
        assert_eq!(fs::read_to_string(&path)?, "echo hi\n");
        assert_eq!(fs::metadata(&path)?.permissions().mode() & 0o777, 0o755);
        Ok(())
    }

    #[test]
    fn test_strip_walks_text_files() -> SearchResult<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("a.txt"), "x \ny\t\n")?;
        fs::write(dir.path().join("b.txt"), "clean\n")?;
        fs::write(dir.path().join("c.bin"), b"\0\0 \n")?;
        fs::write(dir.path().join("d.md"), "trailing  \n")?;

        let policy = Policy::new(Vec::<String>::new(), [r"\.md\z"])?;
        let plans = strip(&[dir.path().to_path_buf()], &policy, &ScanOptions::new())?;
        assert_eq!(plans.len(), 1);
        assert!(plans[0].path.ends_with("a.txt"));
        assert_eq!(plans[0].updated(), "x\ny\n");
        assert_eq!(plans[0].edits.len(), 2);
        Ok(())
    }
}
