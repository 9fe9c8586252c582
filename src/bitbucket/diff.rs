/// Rendering cutoff for diff bodies, in bytes.
pub const MAX_DIFF_SIZE: usize = 100_000;

const SECTION_DELIMITER: &str = "diff --git";

/// Line and file statistics for a raw unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSummary {
    /// Non-empty chunks between `diff --git` delimiters
    pub files_changed: usize,
    /// Lines starting with `+` but not `++`
    pub additions: usize,
    /// Lines starting with `-` but not `--`
    pub deletions: usize,
    /// Paths from each section's `a/<path> b/<path>` header, where one is present
    pub file_names: Vec<String>,
}

/// Summarize a unified diff as returned by the Bitbucket `/diff` endpoint.
///
/// File headers (`+++ b/...`, `--- a/...`) are excluded from the counts by the
/// doubled-prefix rule.
pub fn summarize(raw_diff: &str) -> DiffSummary {
    let sections: Vec<&str> = raw_diff
        .split(SECTION_DELIMITER)
        .filter(|section| !section.is_empty())
        .collect();

    let file_names = sections
        .iter()
        .filter_map(|section| section_path(section))
        .collect();

    let mut additions = 0;
    let mut deletions = 0;
    for line in raw_diff.lines() {
        if line.starts_with('+') && !line.starts_with("++") {
            additions += 1;
        } else if line.starts_with('-') && !line.starts_with("--") {
            deletions += 1;
        }
    }

    DiffSummary {
        files_changed: sections.len(),
        additions,
        deletions,
        file_names,
    }
}

/// Split `raw_diff` into the rendered prefix and the number of bytes left out.
///
/// The cut lands on the last char boundary at or before `max_bytes`.
pub fn truncate(raw_diff: &str, max_bytes: usize) -> (&str, usize) {
    if raw_diff.len() <= max_bytes {
        return (raw_diff, 0);
    }
    let mut cut = max_bytes;
    while !raw_diff.is_char_boundary(cut) {
        cut -= 1;
    }
    (&raw_diff[..cut], raw_diff.len() - cut)
}

/// Path between the first `a/` and the following ` b/` in a section header.
fn section_path(section: &str) -> Option<String> {
    let start = section.find("a/")? + 2;
    let rest = &section[start..];
    let end = rest.find(" b/")?;
    if end == 0 || rest[..end].contains('\n') {
        return None;
    }
    Some(rest[..end].to_string())
}
