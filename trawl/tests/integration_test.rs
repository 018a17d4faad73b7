use anyhow::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::{Duration, SystemTime};
use tempfile::tempdir;
use trawl::cache::IndexCache;
use trawl::discover::index_cache;
use trawl::search::{BlameInfo, Blamer};
use trawl::{
    find, grep, ContextSpec, FindRequest, GrepRequest, OutputMode, Pattern, Policy, Renderer,
    Replacer, ScanOptions, Traversal, TrawlConfig,
};

struct NoBlame;

impl Blamer for NoBlame {
    fn blame(&self, _path: &Path, _line: usize) -> Option<BlameInfo> {
        None
    }
}

fn create_test_files(dir: &Path, file_count: usize, lines_per_file: usize) -> Result<()> {
    for i in 0..file_count {
        let mut file = File::create(dir.join(format!("test_{}.txt", i)))?;
        for j in 0..lines_per_file {
            writeln!(file, "Line {} in file {}: TODO implement this", j, i)?;
            writeln!(file, "Another line {} in file {}: nothing special", j, i)?;
            writeln!(file, "FIXME: This is a bug in file {} line {}", i, j)?;
        }
    }
    Ok(())
}

fn regexp(raw: &str) -> Result<Pattern> {
    Ok(Pattern::regexp(raw, None, false)?)
}

#[test]
fn test_hidden_directories_are_pruned() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("a");
    fs::create_dir_all(root.join(".git"))?;
    fs::write(root.join("foo.rb"), "hello world")?;
    fs::write(root.join(".git/config"), "[core]")?;

    let policy = TrawlConfig::default().discover.compile()?;

    let with_dirs = ScanOptions::new().include_dirs(true);
    let paths: Vec<String> = Traversal::new(&policy, &with_dirs)
        .walk(&[root.clone()])?
        .iter()
        .map(|c| c.display_path())
        .collect();
    assert_eq!(
        paths,
        vec![
            format!("{}{}", root.display(), MAIN_SEPARATOR),
            root.join("foo.rb").display().to_string(),
        ]
    );

    let files = Traversal::new(&policy, &ScanOptions::new()).walk(&[root.clone()])?;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, root.join("foo.rb"));
    Ok(())
}

#[test]
fn test_simple_pattern() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), 10, 100)?;

    let request = GrepRequest::new(regexp("TODO")?, vec![dir.path().to_path_buf()])
        .context(ContextSpec::new(1, 1, 0));
    let output = grep(&request, &Policy::permissive(), &ScanOptions::new(), &NoBlame)?;
    assert_eq!(output.total_matches, 1000);
    assert_eq!(output.files_with_matches, 10);
    assert_eq!(output.files_searched, 10);
    Ok(())
}

#[test]
fn test_regex_pattern() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), 5, 20)?;

    let request = GrepRequest::new(
        regexp(r"FIXME:.*bug.*line \d+")?,
        vec![dir.path().to_path_buf()],
    )
    .mode(OutputMode::References);
    let output = grep(&request, &Policy::permissive(), &ScanOptions::new(), &NoBlame)?;
    assert_eq!(output.total_matches, 100);

    let references = output.references();
    assert!(references[0].ends_with("test_0.txt:3"));
    assert!(references[1].ends_with("test_0.txt:6"));
    Ok(())
}

#[test]
fn test_case_insensitive() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "Hello\nhello\nHELLO\n")?;

    let pattern = Pattern::regexp("hello", None, true)?;
    let request = GrepRequest::new(pattern, vec![dir.path().to_path_buf()])
        .mode(OutputMode::References);
    let output = grep(&request, &Policy::permissive(), &ScanOptions::new(), &NoBlame)?;
    assert_eq!(output.total_matches, 3);
    Ok(())
}

#[test]
fn test_excerpt_rendering() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("f.txt");
    fs::write(&path, "x\nMATCH\ny\nz\n")?;

    let request = GrepRequest::new(regexp("MATCH")?, vec![dir.path().to_path_buf()])
        .context(ContextSpec::new(0, 0, 1));
    let output = grep(&request, &Policy::permissive(), &ScanOptions::new(), &NoBlame)?;

    let text = Renderer::new(false).render(&output);
    assert_eq!(text, format!("{}\n1-x\n2:MATCH\n3-y\n\n", path.display()));
    Ok(())
}

#[test]
fn test_suffix_and_binary_filtering() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("main.rs"), "needle\n")?;
    fs::write(dir.path().join("notes.txt"), "needle\n")?;
    fs::write(dir.path().join("blob.rs"), b"needle\0\0\0")?;

    let request = GrepRequest::new(regexp("needle")?, vec![dir.path().to_path_buf()])
        .mode(OutputMode::PathsOnly);
    let options = ScanOptions::new().suffixes(Some(vec!["rs".to_string()]));
    let output = grep(&request, &Policy::permissive(), &options, &NoBlame)?;

    assert_eq!(output.paths(), vec![dir.path().join("main.rs").as_path()]);
    assert_eq!(output.stats.binary_skipped, 1);
    Ok(())
}

#[test]
fn test_find_with_expiring_cache() -> Result<()> {
    let root = tempdir()?;
    let cache_dir = tempdir()?;
    fs::create_dir_all(root.path().join("src"))?;
    fs::write(root.path().join("src/foo_world.rs"), "")?;

    let policy = Policy::permissive().with_index_ttl(Some(Duration::from_secs(3600)));
    let options = ScanOptions::new();
    let request = FindRequest::new(
        Pattern::fuzzy("fw", None, false)?,
        vec![root.path().to_path_buf()],
    );

    let mut cache = index_cache(Some(cache_dir.path().to_path_buf()), &policy, &options)?;
    assert_eq!(find(&request, &policy, &options, &mut cache)?.len(), 1);

    // a new file stays invisible while the cache is fresh
    fs::write(root.path().join("src/fast_walk.rs"), "")?;
    let mut cache = index_cache(Some(cache_dir.path().to_path_buf()), &policy, &options)?;
    assert_eq!(find(&request, &policy, &options, &mut cache)?.len(), 1);

    // age the cache file past its TTL
    let cache_file = cache.path_for(&[root.path().to_path_buf()])?;
    File::options()
        .write(true)
        .open(&cache_file)?
        .set_modified(SystemTime::now() - Duration::from_secs(7200))?;

    let mut cache = index_cache(Some(cache_dir.path().to_path_buf()), &policy, &options)?;
    let found = find(&request, &policy, &options, &mut cache)?;
    assert_eq!(found.len(), 2);
    Ok(())
}

#[test]
fn test_cache_key_is_order_independent() -> Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let cache = IndexCache::new(dir.path().join("cache"));
    assert_eq!(
        cache.path_for(&[a.clone(), b.clone()])?,
        cache.path_for(&[b, a.clone(), a])?
    );
    Ok(())
}

#[test]
fn test_replace_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("lib.rs");
    fs::write(&path, "fn old_name() {}\nlet x = old_name();\n")?;

    let pattern = regexp("old_name")?;
    let request = GrepRequest::new(pattern.clone(), vec![dir.path().to_path_buf()])
        .mode(OutputMode::Replace);
    let output = grep(&request, &Policy::permissive(), &ScanOptions::new(), &NoBlame)?;

    let edits = Replacer::new(pattern, "new_name")?.plan(&output)?;
    assert_eq!(edits.len(), 1);
    trawl::replace::apply_all(&edits)?;
    assert_eq!(
        fs::read_to_string(&path)?,
        "fn new_name() {}\nlet x = new_name();\n"
    );
    Ok(())
}

#[test]
fn test_missing_root_yields_nothing() -> Result<()> {
    let dir = tempdir()?;
    let missing: PathBuf = dir.path().join("does-not-exist");
    let request = GrepRequest::new(regexp("x")?, vec![missing]);
    let output = grep(&request, &Policy::permissive(), &ScanOptions::new(), &NoBlame)?;
    assert!(output.is_empty());
    assert_eq!(output.stats.entries_unreadable, 1);
    Ok(())
}
