use colored::Colorize;
use similar::{ChangeTag, DiffOp, TextDiff};
use std::fmt::Write;
use trawl::replace::FileEdit;

/// Prints a unified diff of the planned edit
pub fn print_unified_diff(edit: &FileEdit, color: bool) {
    print!("{}", format_unified_diff(edit, color));
}

/// Unified diff text for an edit, `-`/`+` lines coloured when asked
pub fn format_unified_diff(edit: &FileEdit, color: bool) -> String {
    let diff = TextDiff::from_lines(edit.original(), edit.updated());
    let name = edit.path.display().to_string();
    let mut out = String::new();

    let _ = writeln!(out, "--- {}", name);
    let _ = writeln!(out, "+++ {}", name);

    for group in diff.grouped_ops(3) {
        let (mut old_count, mut new_count) = (0, 0);
        let (old_start, new_start) = match group.first() {
            Some(op) => (op.old_range().start, op.new_range().start),
            None => continue,
        };
        for op in &group {
            match op {
                DiffOp::Delete { old_len, .. } => old_count += old_len,
                DiffOp::Insert { new_len, .. } => new_count += new_len,
                DiffOp::Replace {
                    old_len, new_len, ..
                } => {
                    old_count += old_len;
                    new_count += new_len;
                }
                DiffOp::Equal { len, .. } => {
                    old_count += len;
                    new_count += len;
                }
            }
        }

        let header = format!(
            "@@ -{},{} +{},{} @@",
            old_start + 1,
            old_count,
            new_start + 1,
            new_count
        );
        let _ = writeln!(out, "{}", if color { header.cyan().to_string() } else { header });

        for op in &group {
            for change in diff.iter_changes(op) {
                let (sign, value) = match change.tag() {
                    ChangeTag::Delete => ("-", change.value()),
                    ChangeTag::Insert => ("+", change.value()),
                    ChangeTag::Equal => (" ", change.value()),
                };
                let mut line = format!("{}{}", sign, value);
                if !line.ends_with('\n') {
                    line.push('\n');
                }
                let line = match (color, change.tag()) {
                    (true, ChangeTag::Delete) => line.red().to_string(),
                    (true, ChangeTag::Insert) => line.green().to_string(),
                    _ => line,
                };
                out.push_str(&line);
            }
        }
    }
    out
}
