use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, UNIX_EPOCH};
use tracing::trace;

/// Who last touched a line, according to version control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlameInfo {
    pub commit: String,
    pub author: String,
    /// Seconds since the epoch
    pub author_time: Option<u64>,
    pub summary: String,
}

impl BlameInfo {
    /// Case-insensitive substring match on the author name
    pub fn author_matches(&self, filter: &str) -> bool {
        self.author
            .to_lowercase()
            .contains(&filter.to_lowercase())
    }

    /// `abcd1234 Jane Doe 2024-03-01 Fix parser`
    pub fn summary_line(&self) -> String {
        let short = &self.commit[..self.commit.len().min(8)];
        let date = self.author_time.and_then(format_date).unwrap_or_default();
        format!("{} {} {} {}", short, self.author, date, self.summary)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `YYYY-MM-DD` for a Unix timestamp, `None` when it is out of range
fn format_date(secs: u64) -> Option<String> {
    let time = UNIX_EPOCH.checked_add(Duration::from_secs(secs))?;
    let mut stamp = String::new();
    write!(stamp, "{}", humantime::format_rfc3339_seconds(time)).ok()?;
    stamp.get(..10).map(str::to_string)
}

/// Supplies authorship for a single line
pub trait Blamer {
    /// `None` when no information is available, for whatever reason
    fn blame(&self, path: &Path, line: usize) -> Option<BlameInfo>;
}

/// Runs `git blame --porcelain` once per line
#[derive(Debug, Clone, Copy, Default)]
pub struct GitBlame;

impl Blamer for GitBlame {
    fn blame(&self, path: &Path, line: usize) -> Option<BlameInfo> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty())?;
        let file = path.file_name()?;
        let range = format!("{},{}", line, line);

        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["blame", "--porcelain", "-L", &range, "--"])
            .arg(file)
            .output()
            .ok()?;

        if !output.status.success() {
            trace!(
                "git blame failed for {}:{}: {}",
                path.display(),
                line,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        parse_porcelain(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses the first entry of `git blame --porcelain` output
pub fn parse_porcelain(text: &str) -> Option<BlameInfo> {
    let mut lines = text.lines();
    let header = lines.next()?;
    let commit = header.split_whitespace().next()?;
    if commit.len() < 40 || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let mut info = BlameInfo {
        commit: commit.to_string(),
        author: String::new(),
        author_time: None,
        summary: String::new(),
    };

    for line in lines {
        if line.starts_with('\t') {
            break;
        }
        if let Some(author) = line.strip_prefix("author ") {
            info.author = author.to_string();
        } else if let Some(time) = line.strip_prefix("author-time ") {
            info.author_time = time.trim().parse().ok();
        } else if let Some(summary) = line.strip_prefix("summary ") {
            info.summary = summary.to_string();
        }
    }

    Some(info)
}
