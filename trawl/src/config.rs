use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{SearchError, SearchResult};
use crate::policy::Policy;

/// Configuration for every tool, loaded from YAML.
///
/// # Configuration Locations
///
/// Files are merged in order, later ones taking precedence:
/// 1. Global `$XDG_CONFIG_HOME/trawl/config.yaml`
/// 2. Local `.trawl.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// # Configuration Format
///
/// ```yaml
/// search:
///   prune: ['\A\.', '\Atarget\z']
///   skip: ['\.min\.js\z']
///   suffixes: [rs, toml]
///   max_matches: 500
/// discover:
///   index_ttl: 1h        # humantime, or plain seconds
/// strip:
///   skip: ['\.md\z']
/// ```
///
/// A section that is left out keeps its defaults: hidden directories and
/// build output are pruned, editor swap and backup files are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrawlConfig {
    pub search: ToolPolicy,
    pub discover: ToolPolicy,
    pub strip: ToolPolicy,
}

/// The tools that carry their own policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Search,
    Discover,
    Strip,
}

/// Prune/skip expressions and limits for one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPolicy {
    /// Directory base names to prune, as regular expressions
    #[serde(default = "default_prune")]
    pub prune: Vec<String>,

    /// File base names to skip, as regular expressions
    #[serde(default = "default_skip")]
    pub skip: Vec<String>,

    /// File suffixes to accept; empty accepts everything
    #[serde(default)]
    pub suffixes: Vec<String>,

    /// How long a cached path index stays valid, e.g. `3600` or `1h`
    #[serde(default)]
    pub index_ttl: Option<String>,

    /// Stop collecting results after this many
    #[serde(default)]
    pub max_matches: Option<usize>,
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self {
            prune: default_prune(),
            skip: default_skip(),
            suffixes: Vec::new(),
            index_ttl: None,
            max_matches: None,
        }
    }
}

fn default_prune() -> Vec<String> {
    [r"\A\.", r"\Atarget\z", r"\Anode_modules\z"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_skip() -> Vec<String> {
    [r"\.sw[op]\z", r"~\z", r"\A#.*#\z", r"\.orig\z"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ToolPolicy {
    /// Compiles the expressions into a [`Policy`]
    pub fn compile(&self) -> SearchResult<Policy> {
        let ttl = self.index_ttl.as_deref().map(parse_ttl).transpose()?;
        Ok(Policy::new(&self.prune, &self.skip)?
            .with_suffixes(self.suffixes.clone())
            .with_index_ttl(ttl)
            .with_max_matches(self.max_matches))
    }
}

/// Parses a TTL given as whole seconds or a humantime duration (`90m`, `1h 30m`)
pub fn parse_ttl(text: &str) -> SearchResult<Duration> {
    let text = text.trim();
    if let Ok(secs) = text.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(text)
        .map_err(|e| SearchError::config_error(format!("invalid index_ttl '{}': {}", text, e)))
}

impl TrawlConfig {
    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus a specific file,
    /// which must exist
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("trawl/config.yaml")),
            Some(PathBuf::from(".trawl.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SearchError::config_error(e.to_string()))
    }

    pub fn policy(&self, tool: Tool) -> &ToolPolicy {
        match tool {
            Tool::Search => &self.search,
            Tool::Discover => &self.discover,
            Tool::Strip => &self.strip,
        }
    }

    /// Applies command-line overrides to one tool's policy.
    ///
    /// Only values actually given on the command line replace file values.
    pub fn merge_with_cli(mut self, tool: Tool, cli: CliOverrides) -> Self {
        let policy = match tool {
            Tool::Search => &mut self.search,
            Tool::Discover => &mut self.discover,
            Tool::Strip => &mut self.strip,
        };
        if let Some(suffixes) = cli.suffixes {
            policy.suffixes = suffixes;
        }
        if !cli.prune.is_empty() {
            policy.prune.extend(cli.prune);
        }
        if !cli.skip.is_empty() {
            policy.skip.extend(cli.skip);
        }
        if cli.index_ttl.is_some() {
            policy.index_ttl = cli.index_ttl;
        }
        if cli.max_matches.is_some() {
            policy.max_matches = cli.max_matches;
        }
        self
    }

    /// Renders the effective configuration as YAML
    pub fn to_yaml(&self) -> SearchResult<String> {
        serde_yaml::to_string(self).map_err(|e| SearchError::config_error(e.to_string()))
    }
}

/// Policy values taken from the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub suffixes: Option<Vec<String>>,
    /// Added to the configured prune expressions
    pub prune: Vec<String>,
    /// Added to the configured skip expressions
    pub skip: Vec<String>,
    pub index_ttl: Option<String>,
    pub max_matches: Option<usize>,
}
