pub mod review;
pub mod types;

pub use review::{render_comments, render_review};
pub use types::{ReviewReport, TaskOutcome};

use crate::bitbucket::diff::{self, MAX_DIFF_SIZE};
use crate::bitbucket::types::{Comment, PullRequestState};
use crate::bitbucket::{PullRequest, PullRequestRef, Task};

/// Date portion of an ISO-8601 timestamp.
pub(crate) fn date_of(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

/// `HH:MM` portion of an ISO-8601 timestamp, empty when absent.
pub(crate) fn time_of(timestamp: &str) -> String {
    timestamp
        .split_once('T')
        .map(|(_, time)| time.chars().take(5).collect())
        .unwrap_or_default()
}

/// Render a pull request listing.
pub fn render_pull_request_list(
    repo_name: &str,
    state: PullRequestState,
    prs: &[PullRequest],
) -> String {
    let state_name = state.as_str().to_lowercase();
    if prs.is_empty() {
        return format!("No {} pull requests found in {}.", state_name, repo_name);
    }

    let mut lines = vec![
        format!(
            "Found {} {} pull request(s) in {}:",
            prs.len(),
            state_name,
            repo_name
        ),
        String::new(),
    ];
    for pr in prs {
        lines.push(format!("PR #{}: {}", pr.id, pr.title));
        lines.push(format!("  Author: {}", pr.author_name()));
        lines.push(format!(
            "  Branch: {} → {}",
            pr.source.branch.name, pr.destination.branch.name
        ));
        lines.push(format!("  Created: {}", date_of(&pr.created_on)));
        lines.push(format!(
            "  Comments: {} | Tasks: {}",
            pr.comment_count, pr.task_count
        ));
        lines.push(format!("  URL: {}", pr.links.html_url()));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Render the full detail view of one pull request.
pub fn render_pull_request(pr: &PullRequest) -> String {
    let reviewers = if pr.reviewers.is_empty() {
        "None".to_string()
    } else {
        pr.reviewers
            .iter()
            .map(|r| r.display_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut lines = vec![
        format!("PR #{}: {}", pr.id, pr.title),
        format!("State: {}", pr.state),
        format!("Author: {}", pr.author_name()),
        format!(
            "Branch: {} → {}",
            pr.source.branch.name, pr.destination.branch.name
        ),
        format!("Reviewers: {}", reviewers),
        format!("Created: {}", pr.created_on),
        format!("Updated: {}", pr.updated_on),
        format!("Comments: {} | Tasks: {}", pr.comment_count, pr.task_count),
        format!("URL: {}", pr.links.html_url()),
    ];

    if !pr.description.is_empty() {
        lines.push(String::new());
        lines.push("--- Description ---".to_string());
        lines.push(pr.description.clone());
    }
    lines.join("\n")
}

/// Render a raw diff with a stats header, truncating very large bodies.
///
/// Only the rendering is cut; the stats and file list cover the whole diff.
pub fn render_diff(pr: &PullRequestRef, raw_diff: &str) -> String {
    if raw_diff.trim().is_empty() {
        return format!("PR #{} has no changes (empty diff).", pr.pr_id);
    }

    let summary = diff::summarize(raw_diff);
    let header = [
        format!("Diff for PR #{} in {}", pr.pr_id, pr.repo_name()),
        format!("Files changed: {}", summary.files_changed),
        format!(
            "Additions: +{} | Deletions: -{}",
            summary.additions, summary.deletions
        ),
        String::new(),
    ]
    .join("\n");

    if raw_diff.len() <= MAX_DIFF_SIZE {
        return format!("{}{}", header, raw_diff);
    }

    let (kept, omitted) = diff::truncate(raw_diff, MAX_DIFF_SIZE);
    let size_kb = (raw_diff.len() + 512) / 1024;

    let mut lines = vec![
        header,
        format!(
            "WARNING: Diff is large ({}KB). Showing truncated version.",
            size_kb
        ),
        String::new(),
        "Files in this PR:".to_string(),
    ];
    lines.extend(summary.file_names.iter().map(|f| format!("  - {}", f)));
    lines.push(String::new());
    lines.push("--- Truncated Diff ---".to_string());
    lines.push(kept.to_string());
    lines.push(String::new());
    lines.push(format!("... (truncated, {} bytes omitted)", omitted));
    lines.join("\n")
}

/// Confirmation for a newly posted comment.
pub fn render_posted_comment(pr_id: u64, comment: &Comment) -> String {
    let mut lines = vec![
        format!("Comment posted on PR #{}.", pr_id),
        format!("Comment ID: {}", comment.id),
    ];
    match &comment.inline {
        Some(inline) => lines.push(format!("Type: Inline comment on {}", inline.location())),
        None if comment.parent.is_none() => lines.push("Type: General comment".to_string()),
        None => {}
    }
    if let Some(parent) = comment.parent {
        lines.push(format!("Type: Reply to comment #{}", parent.id));
    }
    lines.push(format!("URL: {}", comment.links.html_url()));
    lines.join("\n")
}

/// Confirmation for a single resolved task.
pub fn render_resolved_task(pr_id: u64, task: &Task) -> String {
    [
        format!("Task #{} resolved on PR #{}.", task.id, pr_id),
        format!("State: {}", task.state),
        format!("Creator: {}", task.creator_name()),
        format!("Task: {}", task.content.raw),
    ]
    .join("\n")
}
