use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::metrics::ScanStats;
use crate::pattern::Span;
use crate::search::{BlameInfo, OutputMode};

/// Represents a single matching line in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    /// The line number where the match was found
    pub line_number: usize,
    /// The content of the line containing the match
    pub line_content: String,
    /// Regions of the line to highlight
    pub spans: Vec<Span>,
    /// Lines before the match for context
    pub context_before: Vec<(usize, String)>,
    /// Lines after the match for context
    pub context_after: Vec<(usize, String)>,
    /// Authorship of the line, in blame mode
    pub blame: Option<BlameInfo>,
}

impl Match {
    pub fn new(line_number: usize, line_content: String, spans: Vec<Span>) -> Self {
        Self {
            line_number,
            line_content,
            spans,
            context_before: Vec::new(),
            context_after: Vec::new(),
            blame: None,
        }
    }

    /// `path:line` reference for this match
    pub fn reference(&self, path: &Path) -> String {
        format!("{}:{}", path.display(), self.line_number)
    }
}

/// Represents all matches found in a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    /// The path to the file
    pub path: PathBuf,
    /// All matches found in the file
    pub matches: Vec<Match>,
}

impl FileResult {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            matches: Vec::new(),
        }
    }
}

/// Represents the complete search results
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutput {
    /// How the results were collected and should be rendered
    pub mode: OutputMode,
    /// Results per file
    pub file_results: Vec<FileResult>,
    /// Total number of matches found
    pub total_matches: usize,
    /// Total number of files searched
    pub files_searched: usize,
    /// Total number of files with matches
    pub files_with_matches: usize,
    /// Set when the match cap stopped the search early
    pub truncated: bool,
    #[serde(skip)]
    pub stats: ScanStats,
}

impl SearchOutput {
    /// Creates a new empty search result
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Adds a file result to the search results
    pub fn add_file_result(&mut self, file_result: FileResult) {
        if file_result.matches.is_empty() {
            return;
        }
        self.total_matches += file_result.matches.len();
        self.files_with_matches += 1;
        self.file_results.push(file_result);
    }

    /// Stable-sorts by file path, then by line number within each file,
    /// dropping repeated references
    pub fn sort(&mut self) {
        self.file_results.sort_by(|a, b| a.path.cmp(&b.path));

        let mut merged: Vec<FileResult> = Vec::with_capacity(self.file_results.len());
        for result in self.file_results.drain(..) {
            match merged.last_mut() {
                Some(last) if last.path == result.path => last.matches.extend(result.matches),
                _ => merged.push(result),
            }
        }
        for result in &mut merged {
            result.matches.sort_by_key(|m| m.line_number);
            result.matches.dedup_by_key(|m| m.line_number);
        }

        self.total_matches = merged.iter().map(|r| r.matches.len()).sum();
        self.files_with_matches = merged.len();
        self.file_results = merged;
    }

    /// Distinct file paths, in result order
    pub fn paths(&self) -> Vec<&Path> {
        self.file_results.iter().map(|r| r.path.as_path()).collect()
    }

    /// Every `path:line` reference, in result order
    pub fn references(&self) -> Vec<String> {
        self.file_results
            .iter()
            .flat_map(|r| r.matches.iter().map(move |m| m.reference(&r.path)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.file_results.is_empty()
    }
}
