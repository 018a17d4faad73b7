use tracing::info;

/// Counters collected over one traversal or search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub entries_visited: u64,
    pub dirs_pruned: u64,
    pub entries_skipped: u64,
    pub entries_unreadable: u64,
    pub files_scanned: u64,
    pub binary_skipped: u64,
    pub lines_scanned: u64,
    pub matches: u64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds another set of counters to this one
    pub fn merge(&mut self, other: &ScanStats) {
        self.entries_visited += other.entries_visited;
        self.dirs_pruned += other.dirs_pruned;
        self.entries_skipped += other.entries_skipped;
        self.entries_unreadable += other.entries_unreadable;
        self.files_scanned += other.files_scanned;
        self.binary_skipped += other.binary_skipped;
        self.lines_scanned += other.lines_scanned;
        self.matches += other.matches;
    }

    /// Logs the counters at info level
    pub fn log_stats(&self) {
        info!(
            "Scan stats:\n\
             Entries visited: {}\n\
             Directories pruned: {}\n\
             Entries skipped: {}\n\
             Entries unreadable: {}\n\
             Files scanned: {} ({} binary skipped)\n\
             Lines scanned: {}\n\
             Matches: {}",
            self.entries_visited,
            self.dirs_pruned,
            self.entries_skipped,
            self.entries_unreadable,
            self.files_scanned,
            self.binary_skipped,
            self.lines_scanned,
            self.matches
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let mut a = ScanStats {
            entries_visited: 3,
            matches: 1,
            ..Default::default()
        };
        let b = ScanStats {
            entries_visited: 2,
            dirs_pruned: 1,
            matches: 4,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.entries_visited, 5);
        assert_eq!(a.dirs_pruned, 1);
        assert_eq!(a.matches, 5);
    }
}
