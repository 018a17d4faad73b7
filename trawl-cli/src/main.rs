use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use trawl::{
    config::{CliOverrides, Tool},
    discover::{find, index_cache, FindRequest},
    output::{to_json, Renderer},
    replace::{self, FileEdit, Replacer},
    search::{grep, ContextSpec, GitBlame, GrepRequest, OutputMode},
    CharSet, Pattern, PatternKind, ScanOptions, TrawlConfig,
};

mod diff_utils;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file, merged over the global and local ones
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log skipped entries and scan statistics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Never colour output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every tool that walks a tree
#[derive(Args)]
struct WalkArgs {
    /// Only accept files with these suffixes (e.g. rs,toml)
    #[arg(short = 's', long = "suffix", value_delimiter = ',')]
    suffixes: Option<Vec<String>>,

    /// Extra directory names to prune (regular expression)
    #[arg(long)]
    prune: Vec<String>,

    /// Extra file names to skip (regular expression)
    #[arg(long)]
    skip: Vec<String>,

    /// Follow symbolic links
    #[arg(long)]
    follow: bool,

    /// Stop after this many results
    #[arg(long = "max")]
    max_matches: Option<usize>,
}

/// Options shared by the tools that take a pattern
#[derive(Args)]
struct PatternArgs {
    /// Pattern kind: f (fuzzy) or r (regexp)
    #[arg(short, long)]
    kind: Option<String>,

    /// Case-insensitive matching
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Drop pattern characters outside this set (e.g. a-z0-9_)
    #[arg(long)]
    charset: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find files and directories by name
    Find {
        /// Pattern to match against paths
        pattern: String,

        /// Roots to search under
        #[arg(default_value = ".")]
        roots: Vec<PathBuf>,

        #[command(flatten)]
        pattern_args: PatternArgs,

        #[command(flatten)]
        walk: WalkArgs,

        /// Include directories in the results
        #[arg(long)]
        dirs: bool,

        /// Rebuild the path index before searching
        #[arg(long)]
        reset_cache: bool,

        /// Directory holding the path index
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// How long the path index stays valid (e.g. 3600 or 1h)
        #[arg(long)]
        ttl: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search file contents
    Grep(Box<GrepArgs>),

    /// Remove trailing whitespace from text files
    Strip {
        /// Roots to clean
        #[arg(default_value = ".")]
        roots: Vec<PathBuf>,

        #[command(flatten)]
        walk: WalkArgs,

        /// Show the changes without writing them
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}

#[derive(Args)]
struct GrepArgs {
    /// Pattern to search for
    pattern: String,

    /// Roots to search under
    #[arg(default_value = ".")]
    roots: Vec<PathBuf>,

    #[command(flatten)]
    pattern_args: PatternArgs,

    #[command(flatten)]
    walk: WalkArgs,

    /// Number of context lines before match
    #[arg(short = 'B', long, default_value = "0")]
    before: usize,

    /// Number of context lines after match
    #[arg(short = 'A', long, default_value = "0")]
    after: usize,

    /// Number of context lines around match
    #[arg(short = 'C', long, default_value = "0")]
    context: usize,

    /// Only print the names of matching files
    #[arg(short = 'l', long, conflicts_with_all = ["first", "references", "list", "blame", "replace"])]
    files_with_matches: bool,

    /// Print each matching file once, stopping at its first match
    #[arg(long, conflicts_with_all = ["references", "list", "blame", "replace"])]
    first: bool,

    /// Print path:line:content references
    #[arg(short = 'n', long, conflicts_with_all = ["list", "blame", "replace"])]
    references: bool,

    /// Print bare path:line references
    #[arg(long, conflicts_with_all = ["blame", "replace"])]
    list: bool,

    /// Annotate matches with git blame
    #[arg(long, conflicts_with = "replace")]
    blame: bool,

    /// With --blame, only keep lines by this author
    #[arg(long, requires = "blame")]
    author: Option<String>,

    /// Replace matches on every matching line
    #[arg(long)]
    replace: Option<String>,

    /// With --replace, show a diff without writing
    #[arg(long, requires = "replace")]
    dry_run: bool,

    /// Only scan files whose path matches this regular expression
    #[arg(long)]
    include: Option<String>,

    /// Drop matching lines that also match this regular expression
    #[arg(long)]
    skip_content: Option<String>,

    /// Scan files that look binary
    #[arg(long)]
    binary: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

impl GrepArgs {
    fn mode(&self) -> OutputMode {
        if self.files_with_matches {
            OutputMode::PathsOnly
        } else if self.first {
            OutputMode::FirstMatch
        } else if self.references {
            OutputMode::References
        } else if self.list {
            OutputMode::List
        } else if self.blame {
            OutputMode::Blame
        } else if self.replace.is_some() {
            OutputMode::Replace
        } else {
            OutputMode::Excerpt
        }
    }
}

impl WalkArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            suffixes: self.suffixes.clone(),
            prune: self.prune.clone(),
            skip: self.skip.clone(),
            index_ttl: None,
            max_matches: self.max_matches,
        }
    }

    fn options(&self, verbose: bool) -> ScanOptions {
        ScanOptions::new()
            .verbose(verbose)
            .follow_symlinks(self.follow)
    }
}

impl PatternArgs {
    fn compile(&self, raw: &str, default_kind: PatternKind) -> Result<Pattern> {
        let kind = match &self.kind {
            Some(k) => k.parse::<PatternKind>()?,
            None => default_kind,
        };
        let charset = self.charset.as_deref().map(CharSet::parse);
        Ok(Pattern::new(kind, raw, charset.as_ref(), self.ignore_case)?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config =
        TrawlConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!("Effective configuration: {:?}", config);
    let color = !cli.no_color && std::io::stdout().is_terminal();
    if !color {
        colored::control::set_override(false);
    }
    let renderer = Renderer::new(color);

    match cli.command {
        Commands::Find {
            pattern,
            roots,
            pattern_args,
            walk,
            dirs,
            reset_cache,
            cache_dir,
            ttl,
            json,
        } => {
            let pattern = pattern_args.compile(&pattern, PatternKind::Fuzzy)?;
            let mut overrides = walk.overrides();
            overrides.index_ttl = ttl;
            let config = config.merge_with_cli(Tool::Discover, overrides);
            let policy = config.policy(Tool::Discover).compile()?;
            let options = walk
                .options(cli.verbose)
                .include_dirs(dirs)
                .force_reset(reset_cache);

            let mut cache = index_cache(cache_dir, &policy, &options)?;
            let found = find(&FindRequest::new(pattern, roots), &policy, &options, &mut cache)?;

            if json {
                println!("{}", to_json(&found)?);
            } else {
                print!("{}", renderer.render_found(&found));
            }
            Ok(())
        }
        Commands::Grep(args) => {
            let mode = args.mode();
            let pattern = args.pattern_args.compile(&args.pattern, PatternKind::Regexp)?;
            let include = args
                .include
                .as_deref()
                .map(|raw| Pattern::regexp(raw, None, false))
                .transpose()?;
            let skip_content = args
                .skip_content
                .as_deref()
                .map(|raw| Pattern::regexp(raw, None, false))
                .transpose()?;
            let replacer = args
                .replace
                .as_ref()
                .map(|text| Replacer::new(pattern.clone(), text.as_str()))
                .transpose()?;

            let config = config.merge_with_cli(Tool::Search, args.walk.overrides());
            let policy = config.policy(Tool::Search).compile()?;
            let options = args.walk.options(cli.verbose).search_binary(args.binary);

            let request = GrepRequest::new(pattern, args.roots.clone())
                .include(include)
                .skip_content(skip_content)
                .context(ContextSpec::new(args.before, args.after, args.context))
                .mode(mode)
                .author(args.author.clone());
            let output = grep(&request, &policy, &options, &GitBlame)?;

            if let Some(replacer) = replacer {
                let edits = replacer.plan(&output)?;
                return finish_edits(&edits, args.dry_run, color);
            }

            if args.json {
                println!("{}", to_json(&output)?);
                return Ok(());
            }
            print!("{}", renderer.render(&output));
            if mode == OutputMode::Excerpt {
                println!("{}", renderer.summary(&output));
            }
            Ok(())
        }
        Commands::Strip {
            roots,
            walk,
            dry_run,
        } => {
            let config = config.merge_with_cli(Tool::Strip, walk.overrides());
            let policy = config.policy(Tool::Strip).compile()?;
            let edits = replace::strip(&roots, &policy, &walk.options(cli.verbose))?;
            finish_edits(&edits, dry_run, color)
        }
        Commands::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

fn finish_edits(edits: &[FileEdit], dry_run: bool, color: bool) -> Result<()> {
    if dry_run {
        println!("Dry run - no changes will be made");
        for edit in edits {
            diff_utils::print_unified_diff(edit, color);
        }
        return Ok(());
    }

    let written = replace::apply_all(edits)?;
    for edit in edits {
        let path = edit.path.display().to_string();
        let path = if color { path.blue().to_string() } else { path };
        println!("{}: {} lines changed", path, edit.edits.len());
    }
    println!("Rewrote {} files", written);
    Ok(())
}
