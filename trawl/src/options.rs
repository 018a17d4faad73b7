/// Flags threaded through traversal and matching for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Log per-entry skips at `warn` instead of `debug`
    pub verbose: bool,
    /// Use `stat` instead of `lstat` and descend into linked directories
    pub follow_symlinks: bool,
    /// Emit directories (with a trailing separator) as well as files
    pub include_dirs: bool,
    /// Drop the cached path index before loading it
    pub force_reset: bool,
    /// Scan files classified as binary
    pub search_binary: bool,
    /// Replaces the policy's suffix filter when set
    pub suffixes: Option<Vec<String>>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(mut self, yes: bool) -> Self {
        self.verbose = yes;
        self
    }

    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.follow_symlinks = yes;
        self
    }

    pub fn include_dirs(mut self, yes: bool) -> Self {
        self.include_dirs = yes;
        self
    }

    pub fn force_reset(mut self, yes: bool) -> Self {
        self.force_reset = yes;
        self
    }

    pub fn search_binary(mut self, yes: bool) -> Self {
        self.search_binary = yes;
        self
    }

    pub fn suffixes(mut self, suffixes: Option<Vec<String>>) -> Self {
        self.suffixes = suffixes;
        self
    }
}
