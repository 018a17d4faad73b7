use regex::RegexSet;
use std::time::Duration;

use crate::errors::{SearchError, SearchResult};

/// What traversal should do with a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Emit the directory and enqueue its children
    Descend,
    /// Emit the entry, nothing to enqueue
    EmitOnly,
    /// Drop the directory and everything below it
    PruneSubtree,
    /// Drop this entry only
    Skip,
}

/// The read-only capability surface traversal and search consume.
///
/// Predicates receive the entry's base name, never the full path.
pub trait PolicyView {
    fn prune(&self, name: &str) -> bool;
    fn skip(&self, name: &str) -> bool;

    /// Accepted file suffixes; empty accepts everything
    fn suffix_filter(&self) -> &[String] {
        &[]
    }

    fn index_ttl(&self) -> Option<Duration> {
        None
    }

    fn max_matches(&self) -> Option<usize> {
        None
    }

    /// Maps an entry to a traversal decision
    fn decide(&self, name: &str, is_dir: bool) -> Decision {
        if is_dir {
            if self.prune(name) {
                Decision::PruneSubtree
            } else {
                Decision::Descend
            }
        } else if self.skip(name) {
            Decision::Skip
        } else {
            Decision::EmitOnly
        }
    }
}

/// A policy compiled from regular expression lists
#[derive(Debug, Clone)]
pub struct Policy {
    prune: RegexSet,
    skip: RegexSet,
    suffixes: Vec<String>,
    index_ttl: Option<Duration>,
    max_matches: Option<usize>,
}

impl Policy {
    /// Compiles prune and skip expressions into a policy
    pub fn new<P, S>(prune: P, skip: S) -> SearchResult<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let prune = RegexSet::new(prune)
            .map_err(|e| SearchError::config_error(format!("invalid prune expression: {}", e)))?;
        let skip = RegexSet::new(skip)
            .map_err(|e| SearchError::config_error(format!("invalid skip expression: {}", e)))?;

        Ok(Self {
            prune,
            skip,
            suffixes: Vec::new(),
            index_ttl: None,
            max_matches: None,
        })
    }

    /// A policy that neither prunes nor skips anything
    pub fn permissive() -> Self {
        Self {
            prune: RegexSet::empty(),
            skip: RegexSet::empty(),
            suffixes: Vec::new(),
            index_ttl: None,
            max_matches: None,
        }
    }

    pub fn with_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.suffixes = normalize_suffixes(suffixes);
        self
    }

    pub fn with_index_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.index_ttl = ttl;
        self
    }

    pub fn with_max_matches(mut self, max: Option<usize>) -> Self {
        self.max_matches = max;
        self
    }
}

impl PolicyView for Policy {
    fn prune(&self, name: &str) -> bool {
        self.prune.is_match(name)
    }

    fn skip(&self, name: &str) -> bool {
        self.skip.is_match(name)
    }

    fn suffix_filter(&self) -> &[String] {
        &self.suffixes
    }

    fn index_ttl(&self) -> Option<Duration> {
        self.index_ttl
    }

    fn max_matches(&self) -> Option<usize> {
        self.max_matches
    }
}

/// Strips leading dots and blanks so `.rs`, `rs` and ` rs` compare equal
pub fn normalize_suffixes(suffixes: Vec<String>) -> Vec<String> {
    suffixes
        .into_iter()
        .map(|s| s.trim().trim_start_matches('.').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide() {
        let policy = Policy::new([r"\A\."], [r"\.swp\z"]).unwrap();

        assert_eq!(policy.decide(".git", true), Decision::PruneSubtree);
        assert_eq!(policy.decide("src", true), Decision::Descend);
        assert_eq!(policy.decide("main.rs.swp", false), Decision::Skip);
        assert_eq!(policy.decide("main.rs", false), Decision::EmitOnly);
        // prune only applies to directories, skip only to files
        assert_eq!(policy.decide(".gitignore", false), Decision::EmitOnly);
        assert_eq!(policy.decide("x.swp", true), Decision::Descend);
    }

    #[test]
    fn test_invalid_expression() {
        let result = Policy::new(["("], Vec::<String>::new());
        assert!(matches!(result, Err(SearchError::ConfigError(_))));
    }

    #[test]
    fn test_permissive() {
        let policy = Policy::permissive();
        assert_eq!(policy.decide(".git", true), Decision::Descend);
        assert_eq!(policy.decide("a.swp", false), Decision::EmitOnly);
        assert!(policy.suffix_filter().is_empty());
        assert_eq!(policy.index_ttl(), None);
    }

    #[test]
    fn test_normalize_suffixes() {
        let suffixes = normalize_suffixes(vec![".rs".into(), " toml".into(), "".into()]);
        assert_eq!(suffixes, vec!["rs".to_string(), "toml".to_string()]);
    }
}
