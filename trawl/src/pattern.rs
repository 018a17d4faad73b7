use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::fmt;
use std::path::MAIN_SEPARATOR_STR;
use std::str::FromStr;

use crate::errors::{SearchError, SearchResult};

/// Byte range `(start, end)` of a highlighted region within a line or path
pub type Span = (usize, usize);

/// How a raw pattern string is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Characters must appear in order, not necessarily adjacent
    Fuzzy,
    /// The string is a regular expression
    Regexp,
}

impl FromStr for PatternKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "f" | "fuzzy" => Ok(Self::Fuzzy),
            "r" | "regex" | "regexp" => Ok(Self::Regexp),
            _ => Err(SearchError::invalid_pattern_kind(s)),
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::Regexp => write!(f, "regexp"),
        }
    }
}

/// A set of allowed characters, written like a `tr` argument: `a-z0-9_`.
/// A leading `^` inverts the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSet {
    negated: bool,
    ranges: Vec<(char, char)>,
}

impl CharSet {
    pub fn parse(spec: &str) -> Self {
        let (negated, body) = match spec.strip_prefix('^') {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, spec),
        };

        let chars: Vec<char> = body.chars().collect();
        let mut ranges = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i] <= chars[i + 2] {
                ranges.push((chars[i], chars[i + 2]));
                i += 3;
            } else {
                ranges.push((chars[i], chars[i]));
                i += 1;
            }
        }

        Self { negated, ranges }
    }

    pub fn contains(&self, c: char) -> bool {
        let hit = self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        hit != self.negated
    }

    /// Drops every character of `text` that is not in the set
    pub fn filter(&self, text: &str) -> String {
        text.chars().filter(|&c| self.contains(c)).collect()
    }
}

/// A compiled user pattern.
///
/// Both kinds compile down to a single [`Regex`]; callers only see
/// [`Pattern::find`], [`Pattern::is_match`] and [`Pattern::replace_all`].
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    kind: PatternKind,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    /// Builds a pattern of the given kind
    pub fn new(
        kind: PatternKind,
        raw: &str,
        charset: Option<&CharSet>,
        case_insensitive: bool,
    ) -> SearchResult<Self> {
        match kind {
            PatternKind::Fuzzy => Self::fuzzy(raw, charset, case_insensitive),
            PatternKind::Regexp => Self::regexp(raw, charset, case_insensitive),
        }
    }

    /// Compiles `raw` directly as a regular expression
    pub fn regexp(raw: &str, charset: Option<&CharSet>, case_insensitive: bool) -> SearchResult<Self> {
        let raw = filter_raw(raw, charset)?;
        let regex = RegexBuilder::new(&raw)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| SearchError::invalid_pattern(e.to_string()))?;

        Ok(Self {
            raw,
            kind: PatternKind::Regexp,
            case_insensitive,
            regex,
        })
    }

    /// Compiles `raw` as an ordered subsequence of characters.
    ///
    /// The expression has two alternatives anchored at the start of the text.
    /// The first only matches past a path separator and backtracks from the
    /// last one, so for paths the capture groups land in the base name whenever
    /// possible. The second matches anywhere. Any text accepted by the first is
    /// accepted by the second; the split only steers where the groups land.
    pub fn fuzzy(raw: &str, charset: Option<&CharSet>, case_insensitive: bool) -> SearchResult<Self> {
        let raw: String = filter_raw(raw, charset)?
            .chars()
            .filter(|c| !c.is_control())
            .collect();
        if raw.is_empty() {
            return Err(SearchError::invalid_pattern(
                "fuzzy pattern has no printable characters",
            ));
        }

        let sequence = raw
            .chars()
            .map(|c| format!("({})", regex::escape(c.encode_utf8(&mut [0; 4]))))
            .collect::<Vec<_>>()
            .join(".*?");
        let separator = regex::escape(MAIN_SEPARATOR_STR);
        let source = if separator == "/" {
            format!(r"\A(?:.*/.*?{sequence}|.*?{sequence})")
        } else {
            format!(r"\A(?:.*[/{separator}].*?{sequence}|.*?{sequence})")
        };

        let regex = RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| SearchError::invalid_pattern(e.to_string()))?;

        Ok(Self {
            raw,
            kind: PatternKind::Fuzzy,
            case_insensitive,
            regex,
        })
    }

    /// The pattern text after character filtering
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Matches `text`, returning the spans to highlight.
    ///
    /// Fuzzy patterns yield one span per pattern character, taken from whichever
    /// alternative's groups participated. Regexp patterns yield every
    /// non-overlapping, non-empty match. `None` means no match; a regexp that
    /// only matches the empty string gives `Some` with no spans.
    pub fn find(&self, text: &str) -> Option<Vec<Span>> {
        match self.kind {
            PatternKind::Fuzzy => {
                let caps = self.regex.captures(text)?;
                Some(
                    caps.iter()
                        .skip(1)
                        .flatten()
                        .map(|m| (m.start(), m.end()))
                        .collect(),
                )
            }
            PatternKind::Regexp => {
                let spans: Vec<Span> = self
                    .regex
                    .find_iter(text)
                    .filter(|m| !m.is_empty())
                    .map(|m| (m.start(), m.end()))
                    .collect();
                if spans.is_empty() && !self.regex.is_match(text) {
                    None
                } else {
                    Some(spans)
                }
            }
        }
    }

    /// Replaces every match in `text`. Only regexp patterns can replace.
    pub fn replace_all<'t>(&self, text: &'t str, replacement: &str) -> SearchResult<Cow<'t, str>> {
        match self.kind {
            PatternKind::Regexp => Ok(self.regex.replace_all(text, replacement)),
            PatternKind::Fuzzy => Err(SearchError::invalid_pattern(
                "replacement requires a regexp pattern",
            )),
        }
    }

    /// Checks that every `$N` in a replacement refers to an existing group
    pub fn check_replacement(&self, replacement: &str) -> SearchResult<()> {
        static GROUP_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{?(\d+)").unwrap());

        if self.kind == PatternKind::Fuzzy {
            return Err(SearchError::invalid_pattern(
                "replacement requires a regexp pattern",
            ));
        }
        // includes group 0
        let group_count = self.regex.captures_len();
        for cap in GROUP_REF.captures_iter(replacement) {
            if let Ok(num) = cap[1].parse::<usize>() {
                if num >= group_count {
                    return Err(SearchError::invalid_pattern(format!(
                        "capture group ${} does not exist",
                        num
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn filter_raw(raw: &str, charset: Option<&CharSet>) -> SearchResult<String> {
    let filtered = match charset {
        Some(set) => set.filter(raw),
        None => raw.to_string(),
    };
    if filtered.is_empty() {
        return Err(SearchError::invalid_pattern("pattern is empty"));
    }
    Ok(filtered)
}
