//! Text and JSON rendering of search and discovery results.
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

use crate::discover::FoundPath;
use crate::errors::SearchResult;
use crate::pattern::Span;
use crate::results::{FileResult, Match, SearchOutput};
use crate::search::OutputMode;

/// Renders results as plain lines, with optional inverse-video highlighting
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Renders a content search in the format its mode asks for
    pub fn render(&self, output: &SearchOutput) -> String {
        let mut out = String::new();
        for result in &output.file_results {
            match output.mode {
                OutputMode::PathsOnly | OutputMode::FirstMatch => {
                    let _ = writeln!(out, "{}", self.path(&result.path));
                }
                OutputMode::List => {
                    for m in &result.matches {
                        let _ = writeln!(out, "{}", m.reference(&result.path));
                    }
                }
                OutputMode::References | OutputMode::Replace => {
                    for m in &result.matches {
                        let _ = writeln!(
                            out,
                            "{}:{}",
                            m.reference(&result.path),
                            self.highlight(&m.line_content, &m.spans)
                        );
                    }
                }
                OutputMode::Blame => {
                    for m in &result.matches {
                        self.blame_line(&mut out, &result.path, m);
                    }
                }
                OutputMode::Excerpt => self.excerpt(&mut out, result),
            }
        }
        out
    }

    /// One path per line, matched characters highlighted
    pub fn render_found(&self, found: &[FoundPath]) -> String {
        let mut out = String::new();
        for f in found {
            let _ = writeln!(out, "{}", self.highlight(&f.path, &f.spans));
        }
        out
    }

    /// One-line count summary
    pub fn summary(&self, output: &SearchOutput) -> String {
        let mut line = format!(
            "Found {} matches in {} files ({} searched)",
            output.total_matches, output.files_with_matches, output.files_searched
        );
        if output.truncated {
            line.push_str(", stopped at the match limit");
        }
        line
    }

    /// Wraps each span of `text` in inverse video
    pub fn highlight(&self, text: &str, spans: &[Span]) -> String {
        if !self.color || spans.is_empty() {
            return text.to_string();
        }
        split_spans(text, spans)
            .into_iter()
            .map(|(piece, hit)| {
                if hit {
                    piece.reversed().to_string()
                } else {
                    piece.to_string()
                }
            })
            .collect()
    }

    fn path(&self, path: &Path) -> String {
        let text = path.display().to_string();
        if self.color {
            text.blue().to_string()
        } else {
            text
        }
    }

    fn line_number(&self, n: usize, sep: char) -> String {
        let text = format!("{}{}", n, sep);
        if self.color {
            text.green().to_string()
        } else {
            text
        }
    }

    fn blame_line(&self, out: &mut String, path: &Path, m: &Match) {
        let reference = m.reference(path);
        let content = self.highlight(&m.line_content, &m.spans);
        match &m.blame {
            Some(info) => {
                let summary = if self.color {
                    info.summary_line().yellow().to_string()
                } else {
                    info.summary_line()
                };
                let _ = writeln!(out, "{}: {} | {}", reference, summary, content);
            }
            None => {
                let _ = writeln!(out, "{}: {}", reference, content);
            }
        }
    }

    /// Header line, then `N-` context and `N:` match lines. A gap in line
    /// numbers is marked with `--`, lines shared by two groups are printed
    /// once, and a context line that is itself a match prints as a match.
    fn excerpt(&self, out: &mut String, result: &FileResult) {
        let _ = writeln!(out, "{}", self.path(&result.path));
        let hits: HashMap<usize, &Match> = result
            .matches
            .iter()
            .map(|m| (m.line_number, m))
            .collect();
        let mut last_printed = 0usize;

        for m in &result.matches {
            for (n, line) in &m.context_before {
                self.excerpt_context(out, &mut last_printed, &hits, *n, line);
            }
            if m.line_number > last_printed {
                let content = self.highlight(&m.line_content, &m.spans);
                self.excerpt_line(out, &mut last_printed, m.line_number, ':', &content);
            }
            for (n, line) in &m.context_after {
                self.excerpt_context(out, &mut last_printed, &hits, *n, line);
            }
        }
        out.push('\n');
    }

    fn excerpt_context(
        &self,
        out: &mut String,
        last_printed: &mut usize,
        hits: &HashMap<usize, &Match>,
        n: usize,
        line: &str,
    ) {
        if n <= *last_printed {
            return;
        }
        match hits.get(&n) {
            Some(hit) => {
                let content = self.highlight(&hit.line_content, &hit.spans);
                self.excerpt_line(out, last_printed, n, ':', &content);
            }
            None => self.excerpt_line(out, last_printed, n, '-', line),
        }
    }

    fn excerpt_line(&self, out: &mut String, last_printed: &mut usize, n: usize, sep: char, text: &str) {
        if *last_printed > 0 && n > *last_printed + 1 {
            let _ = writeln!(out, "--");
        }
        let _ = writeln!(out, "{}{}", self.line_number(n, sep), text);
        *last_printed = n;
    }
}

/// Splits `text` into alternating plain and highlighted pieces.
///
/// Spans are byte ranges; overlapping or out-of-range spans are clamped, and
/// spans that do not fall on character boundaries are ignored.
pub fn split_spans<'t>(text: &'t str, spans: &[Span]) -> Vec<(&'t str, bool)> {
    let mut sorted: Vec<Span> = spans
        .iter()
        .map(|&(s, e)| (s.min(text.len()), e.min(text.len())))
        .filter(|&(s, e)| s < e && text.is_char_boundary(s) && text.is_char_boundary(e))
        .collect();
    sorted.sort();

    let mut pieces = Vec::new();
    let mut pos = 0;
    for (start, end) in sorted {
        let start = start.max(pos);
        if start >= end {
            continue;
        }
        if start > pos {
            pieces.push((&text[pos..start], false));
        }
        pieces.push((&text[start..end], true));
        pos = end;
    }
    if pos < text.len() {
        pieces.push((&text[pos..], false));
    }
    pieces
}

/// Pretty-printed JSON for tooling
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> SearchResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
