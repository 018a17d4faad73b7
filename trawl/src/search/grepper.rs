use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace, warn};

use super::blame::Blamer;
use super::context::ContextQueue;
use super::reader::LineReader;
use super::{GrepRequest, OutputMode};
use crate::classify::{classify, Classification, SAMPLE_SIZE};
use crate::errors::{retry_on_fd_exhaustion, SearchResult};
use crate::metrics::ScanStats;
use crate::options::ScanOptions;
use crate::results::{FileResult, Match};
use crate::walk::Candidate;

const BUFFER_CAPACITY: usize = 65536;

/// Scans candidate files for one [`GrepRequest`]
pub struct Grepper<'a> {
    request: &'a GrepRequest,
    options: &'a ScanOptions,
    blamer: &'a dyn Blamer,
    stats: ScanStats,
}

impl<'a> Grepper<'a> {
    pub fn new(request: &'a GrepRequest, options: &'a ScanOptions, blamer: &'a dyn Blamer) -> Self {
        Self {
            request,
            options,
            blamer,
            stats: ScanStats::new(),
        }
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Scans one candidate.
    ///
    /// Returns `Ok(None)` when the file was not scanned: filtered out by the
    /// include pattern, a directory, binary, or unreadable. Only descriptor
    /// exhaustion that survives a retry is an error.
    pub fn scan_file(&mut self, candidate: &Candidate) -> SearchResult<Option<FileResult>> {
        if candidate.is_directory {
            return Ok(None);
        }
        if let Some(include) = &self.request.include {
            if !include.is_match(&candidate.display_path()) {
                trace!("Not included: {}", candidate.path.display());
                return Ok(None);
            }
        }

        let path = candidate.path.as_path();
        if candidate.is_symlink && fs::metadata(path).is_ok_and(|m| m.is_dir()) {
            return Ok(None);
        }

        let file = match retry_on_fd_exhaustion(path, || File::open(path))? {
            Ok(file) => file,
            Err(e) => {
                self.log_unreadable(path, &e);
                return Ok(None);
            }
        };

        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY.max(SAMPLE_SIZE), file);
        let classification = match reader.fill_buf() {
            Ok(buf) => classify(&buf[..buf.len().min(SAMPLE_SIZE)]),
            Err(e) => {
                self.log_unreadable(path, &e);
                return Ok(None);
            }
        };
        if classification == Classification::Binary && !self.options.search_binary {
            trace!("Skipping binary file {}", path.display());
            self.stats.binary_skipped += 1;
            return Ok(None);
        }

        self.stats.files_scanned += 1;
        match self.scan_reader(path, reader) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                self.log_unreadable(path, &e);
                Ok(None)
            }
        }
    }

    /// Scans already-opened content, attributing matches to `path`
    pub fn scan_reader<R: BufRead>(&mut self, path: &Path, reader: R) -> io::Result<FileResult> {
        let mode = self.request.mode;
        let context = self.request.context;
        let mut result = FileResult::new(path.to_path_buf());
        let mut lines = LineReader::new(reader);
        let mut queue = ContextQueue::new(if mode.wants_context() {
            context.before
        } else {
            0
        });

        while let Some(line) = lines.next_line()? {
            let line_number = lines.line_number();
            self.stats.lines_scanned += 1;

            let Some(spans) = self.request.pattern.find(&line) else {
                queue.push(line_number, line);
                continue;
            };
            if let Some(skip) = &self.request.skip_content {
                if skip.is_match(&line) {
                    continue;
                }
            }

            if !mode.wants_context() {
                result.matches.push(Match::new(line_number, line, spans));
                if mode.stops_at_first() {
                    break;
                }
                continue;
            }

            let mut found = Match::new(line_number, line.clone(), spans);
            found.context_before = queue.drain();
            if context.after > 0 {
                found.context_after = lines
                    .peek(context.after)?
                    .into_iter()
                    .enumerate()
                    .map(|(i, l)| (line_number + 1 + i, l))
                    .collect();
            }
            result.matches.push(found);
            queue.push(line_number, line);
        }

        if mode == OutputMode::Blame {
            self.annotate(path, &mut result);
        }

        self.stats.matches += result.matches.len() as u64;
        if !result.matches.is_empty() {
            debug!("{} matches in {}", result.matches.len(), path.display());
        }
        Ok(result)
    }

    fn annotate(&self, path: &Path, result: &mut FileResult) {
        let author = self.request.author.as_deref();
        let blamer = self.blamer;
        result.matches.retain_mut(|m| {
            m.blame = blamer.blame(path, m.line_number);
            match (author, &m.blame) {
                (None, _) => true,
                (Some(filter), Some(info)) => info.author_matches(filter),
                (Some(_), None) => false,
            }
        });
    }

    fn log_unreadable(&mut self, path: &Path, err: &io::Error) {
        self.stats.entries_unreadable += 1;
        if self.options.verbose {
            warn!("Skipping {}: {}", path.display(), err);
        } else {
            debug!("Skipping {}: {}", path.display(), err);
        }
    }
}
