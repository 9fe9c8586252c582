use super::types::ReviewReport;
use super::{date_of, time_of};
use crate::bitbucket::types::Comment;
use crate::bitbucket::{PullRequestRef, Task};
use crate::review::JoinedComments;
use crate::tools::POST_COMMENT_TOOL;

fn location(comment: &Comment) -> String {
    comment
        .inline
        .as_ref()
        .map(|inline| inline.location())
        .unwrap_or_else(|| "General".to_string())
}

fn task_line(task: &Task) -> String {
    format!("  [Task #{}] {}: {}", task.id, task.state, task.content.raw)
}

fn push_standalone_tasks(lines: &mut Vec<String>, tasks: &[Task]) {
    if tasks.is_empty() {
        return;
    }
    lines.push("--- STANDALONE TASKS ---".to_string());
    lines.push(String::new());
    for task in tasks {
        let anchor = match task.comment_id() {
            Some(id) => format!("comment #{} not in fetched comments", id),
            None => "no comment".to_string(),
        };
        lines.push(format!(
            "[Task #{}] {}: {} ({})",
            task.id, task.state, task.content.raw, anchor
        ));
    }
    lines.push(String::new());
}

/// Render the standalone comment listing.
pub fn render_comments(pr: &PullRequestRef, joined: &JoinedComments) -> String {
    if joined.comments.is_empty() && joined.standalone_tasks.is_empty() {
        return format!("No comments on PR #{} in {}.", pr.pr_id, pr.repo_name());
    }

    let mut lines = vec![
        format!(
            "Found {} comment(s) on PR #{}:",
            joined.comments.len(),
            pr.pr_id
        ),
        String::new(),
    ];

    for entry in &joined.comments {
        let comment = &entry.comment;
        let stamp = format!("{} {}", date_of(&comment.created_on), time_of(&comment.created_on));
        match &comment.inline {
            Some(inline) => lines.push(format!(
                "[{}] #{} @{} — INLINE on {}",
                stamp,
                comment.id,
                comment.author_name(),
                inline.location()
            )),
            None => lines.push(format!(
                "[{}] #{} @{} — General comment",
                stamp,
                comment.id,
                comment.author_name()
            )),
        }
        if let Some(parent) = comment.parent {
            lines.push(format!("  (reply to comment #{})", parent.id));
        }
        lines.push(format!("  {}", comment.content.raw));
        lines.extend(entry.tasks.iter().map(task_line));
        lines.push(String::new());
    }

    push_standalone_tasks(&mut lines, &joined.standalone_tasks);
    lines.join("\n")
}

/// Render the fetch-and-resolve report.
///
/// Sections, in order: all comments, standalone tasks, human comments needing
/// attention, task resolution, summary.
pub fn render_review(report: &ReviewReport) -> String {
    let joined = &report.joined;
    let mut lines = vec![
        format!("PR #{} — {}", report.pr.pr_id, report.pr.repo_name()),
        String::new(),
        format!(
            "Fetched {} comment(s), {} task(s).",
            joined.comments.len(),
            report.task_count
        ),
        String::new(),
        "--- ALL COMMENTS ---".to_string(),
        String::new(),
    ];

    for entry in &joined.comments {
        let comment = &entry.comment;
        lines.push(format!(
            "[Comment #{}] {} @{} — {}",
            comment.id,
            entry.author.tag(),
            comment.author_name(),
            location(comment)
        ));
        if let Some(parent) = comment.parent {
            lines.push(format!("  (reply to #{})", parent.id));
        }
        lines.push(format!("  {}", comment.content.raw));
        lines.extend(entry.tasks.iter().map(task_line));
        lines.push(String::new());
    }

    push_standalone_tasks(&mut lines, &joined.standalone_tasks);

    let humans: Vec<_> = joined.human_comments().collect();
    if !humans.is_empty() {
        lines.push("--- HUMAN REVIEW COMMENTS REQUIRING ATTENTION ---".to_string());
        lines.push(String::new());
        for entry in &humans {
            let comment = &entry.comment;
            match &comment.inline {
                Some(inline) => lines.push(format!(
                    "[Comment #{}] @{} on {}",
                    comment.id,
                    comment.author_name(),
                    inline.location()
                )),
                None => lines.push(format!(
                    "[Comment #{}] @{} — General",
                    comment.id,
                    comment.author_name()
                )),
            }
            lines.push(format!("  \"{}\"", comment.content.raw));
            lines.push(format!(
                "  → Address this in code, then reply using {} with parent_id={}",
                POST_COMMENT_TOOL, comment.id
            ));
            lines.push(String::new());
        }
    }

    lines.push("--- TASK RESOLUTION ---".to_string());
    lines.push(String::new());
    if report.resolutions.is_empty() {
        lines.push("No unresolved tasks to resolve.".to_string());
    } else {
        lines.push(format!(
            "Resolving {} unresolved task(s)...",
            report.resolutions.len()
        ));
        lines.push(String::new());
        for outcome in &report.resolutions {
            let task = &outcome.task;
            match &outcome.result {
                Ok(_) => lines.push(format!("  ✓ Resolved Task #{}: {}", task.id, task.content.raw)),
                Err(err) => {
                    lines.push(format!("  ✗ Failed Task #{}: {}", task.id, task.content.raw));
                    lines.push(format!("    Error: {}", err));
                }
            }
        }
        lines.push(String::new());
        lines.push(format!(
            "Tasks done. {} resolved, {} failed.",
            report.resolved_count(),
            report.failed_count()
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "Summary: {} bot comment(s), {} human comment(s) needing review.",
        joined.bot_comments().count(),
        humans.len()
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbucket::types::TaskState;
    use crate::report::types::TaskOutcome;
    use crate::review::tests::{comment, inline_comment, task};
    use crate::review::{join_comments, BotPatterns};

    fn sample_report(resolve_ok: bool) -> ReviewReport {
        let comments = vec![
            comment(1, "Alice", None),
            inline_comment(2, "Bob", "src/auth.rs", 17),
            comment(3, "coderabbitai", None),
            comment(4, "Alice", Some(2)),
        ];
        let tasks = vec![task(10, 2, TaskState::Unresolved), task(11, 5, TaskState::Resolved)];
        let joined = join_comments(comments, &tasks, &BotPatterns::default());
        let result = if resolve_ok {
            Ok(task(10, 2, TaskState::Resolved))
        } else {
            Err("Bitbucket API 403: Forbidden".to_string())
        };
        ReviewReport {
            pr: PullRequestRef::new("acme", "widgets", 42),
            task_count: tasks.len(),
            joined,
            resolutions: vec![TaskOutcome {
                task: task(10, 2, TaskState::Unresolved),
                result,
            }],
        }
    }

    #[test]
    fn test_render_review_sections() {
        let text = render_review(&sample_report(true));
        assert!(text.starts_with("PR #42 — acme/widgets\n\nFetched 4 comment(s), 2 task(s)."));
        assert!(text.contains("[Comment #1] [HUMAN] @Alice — General\n  comment 1\n"));
        assert!(text.contains(
            "[Comment #2] [HUMAN] @Bob — src/auth.rs:17\n  comment 2\n  [Task #10] UNRESOLVED: task 10\n"
        ));
        assert!(text.contains("[Comment #3] [BOT] @coderabbitai — General"));
        assert!(text.contains("[Comment #4] [HUMAN] @Alice — General\n  (reply to #2)\n"));
        assert!(text.contains("--- STANDALONE TASKS ---\n\n[Task #11] RESOLVED: task 11 (comment #5 not in fetched comments)"));
        assert!(text.contains("[Comment #2] @Bob on src/auth.rs:17\n  \"comment 2\"\n"));
        assert!(text.contains("bitbucket_post_pr_comment with parent_id=1"));
        assert!(!text.contains("parent_id=4"));
        assert!(!text.contains("parent_id=3"));
        assert!(text.contains("  ✓ Resolved Task #10: task 10"));
        assert!(text.contains("Tasks done. 1 resolved, 0 failed."));
        assert!(text.ends_with("Summary: 1 bot comment(s), 2 human comment(s) needing review."));
    }

    #[test]
    fn test_render_review_reports_failures_inline() {
        let text = render_review(&sample_report(false));
        assert!(text.contains("  ✗ Failed Task #10: task 10\n    Error: Bitbucket API 403: Forbidden"));
        assert!(text.contains("Tasks done. 0 resolved, 1 failed."));
    }

    #[test]
    fn test_render_review_is_deterministic() {
        assert_eq!(render_review(&sample_report(true)), render_review(&sample_report(true)));
    }

    #[test]
    fn test_render_review_without_tasks() {
        let joined = join_comments(vec![comment(1, "renovate-bot", None)], &[], &BotPatterns::default());
        let report = ReviewReport {
            pr: PullRequestRef::new("acme", "widgets", 42),
            task_count: 0,
            joined,
            resolutions: vec![],
        };
        let text = render_review(&report);
        assert!(text.contains("No unresolved tasks to resolve."));
        assert!(!text.contains("HUMAN REVIEW COMMENTS"));
        assert!(!text.contains("STANDALONE TASKS"));
        assert!(text.ends_with("Summary: 1 bot comment(s), 0 human comment(s) needing review."));
    }

    #[test]
    fn test_render_comments_listing() {
        let comments = vec![
            inline_comment(2, "Bob", "src/auth.rs", 17),
            comment(4, "Alice", Some(2)),
        ];
        let tasks = vec![task(10, 2, TaskState::Unresolved), task(11, 5, TaskState::Resolved)];
        let joined = join_comments(comments, &tasks, &BotPatterns::default());
        let text = render_comments(&PullRequestRef::new("acme", "widgets", 42), &joined);
        assert!(text.starts_with("Found 2 comment(s) on PR #42:"));
        assert!(text.contains("[2025-03-01 10:15] #2 @Bob — INLINE on src/auth.rs:17\n  comment 2\n  [Task #10] UNRESOLVED: task 10"));
        assert!(text.contains("[2025-03-01 10:15] #4 @Alice — General comment\n  (reply to comment #2)"));
        assert!(text.contains("[Task #11] RESOLVED: task 11 (comment #5 not in fetched comments)"));
    }

    #[test]
    fn test_render_comments_empty() {
        let joined = join_comments(vec![], &[], &BotPatterns::default());
        let text = render_comments(&PullRequestRef::new("acme", "widgets", 42), &joined);
        assert_eq!(text, "No comments on PR #42 in acme/widgets.");
    }
}
