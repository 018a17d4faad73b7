//! Content search: streams candidates from a [`Traversal`](crate::walk::Traversal),
//! scans each one line by line and collects matches per [`OutputMode`].
pub mod blame;
pub mod context;
pub mod engine;
pub mod grepper;
pub mod reader;

pub use blame::{BlameInfo, Blamer, GitBlame};
pub use context::ContextQueue;
pub use engine::grep;
pub use grepper::Grepper;
pub use reader::LineReader;

use serde::Serialize;
use std::path::PathBuf;

use crate::pattern::Pattern;

/// What a scan records for each match and how it is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Matching lines framed by context
    #[default]
    Excerpt,
    /// Each matching file once; scanning continues to count matches
    PathsOnly,
    /// Each matching file once; scanning stops at the first hit
    FirstMatch,
    /// `path:line:content` for every matching line
    References,
    /// References annotated with version-control authorship
    Blame,
    /// Bare `path:line` references, one per line
    List,
    /// References fed to the replace collaborator
    Replace,
}

impl OutputMode {
    /// Modes that only care whether a file matched at all
    pub fn paths_only(self) -> bool {
        matches!(self, OutputMode::PathsOnly | OutputMode::FirstMatch)
    }

    pub fn stops_at_first(self) -> bool {
        self == OutputMode::FirstMatch
    }

    pub fn wants_context(self) -> bool {
        self == OutputMode::Excerpt
    }
}

/// Context line counts, already folded into effective before/after sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextSpec {
    pub before: usize,
    pub after: usize,
}

impl ContextSpec {
    /// `around` widens both sides, like `-C` does alongside `-B`/`-A`
    pub fn new(before: usize, after: usize, around: usize) -> Self {
        Self {
            before: before.max(around),
            after: after.max(around),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before == 0 && self.after == 0
    }
}

/// Everything a content search needs besides policy and options
#[derive(Debug, Clone)]
pub struct GrepRequest {
    pub pattern: Pattern,
    pub roots: Vec<PathBuf>,
    /// Only files whose path matches are scanned
    pub include: Option<Pattern>,
    /// Matching lines that also match this are dropped
    pub skip_content: Option<Pattern>,
    pub context: ContextSpec,
    pub mode: OutputMode,
    /// Case-insensitive author substring, blame mode only
    pub author: Option<String>,
}

impl GrepRequest {
    pub fn new(pattern: Pattern, roots: Vec<PathBuf>) -> Self {
        Self {
            pattern,
            roots,
            include: None,
            skip_content: None,
            context: ContextSpec::default(),
            mode: OutputMode::default(),
            author: None,
        }
    }

    pub fn include(mut self, include: Option<Pattern>) -> Self {
        self.include = include;
        self
    }

    pub fn skip_content(mut self, skip: Option<Pattern>) -> Self {
        self.skip_content = skip;
        self
    }

    pub fn context(mut self, context: ContextSpec) -> Self {
        self.context = context;
        self
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn author(mut self, author: Option<String>) -> Self {
        self.author = author.filter(|a| !a.is_empty());
        self
    }
}
