pub mod cache;
pub mod classify;
pub mod config;
pub mod discover;
pub mod errors;
pub mod metrics;
pub mod options;
pub mod output;
pub mod pattern;
pub mod policy;
pub mod replace;
pub mod results;
pub mod search;
pub mod walk;

pub use cache::IndexCache;
pub use config::{CliOverrides, Tool, ToolPolicy, TrawlConfig};
pub use discover::{find, FindRequest, FoundPath};
pub use errors::{SearchError, SearchResult};
pub use metrics::ScanStats;
pub use options::ScanOptions;
pub use output::Renderer;
pub use pattern::{CharSet, Pattern, PatternKind};
pub use policy::{Decision, Policy, PolicyView};
pub use replace::{FileEdit, Replacer};
pub use results::{FileResult, Match, SearchOutput};
pub use search::{grep, ContextSpec, GitBlame, GrepRequest, OutputMode};
pub use walk::{Candidate, Traversal};
