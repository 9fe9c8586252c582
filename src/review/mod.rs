pub mod bots;

pub use bots::{AuthorClassifier, BotPattern, BotPatterns};

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info_span, instrument, warn, Instrument};

use crate::bitbucket::types::TaskState;
use crate::bitbucket::{BitbucketClient, BitbucketError, Comment, PullRequestRef, Task};
use crate::report::{ReviewReport, TaskOutcome};

/// Upper bound on tasks fetched alongside comments.
pub const TASK_FETCH_LIMIT: usize = 100;

/// Upper bound on comments considered by fetch-and-resolve.
pub const REVIEW_COMMENT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorKind {
    Bot,
    Human,
}

impl AuthorKind {
    pub fn tag(&self) -> &'static str {
        match self {
            AuthorKind::Bot => "[BOT]",
            AuthorKind::Human => "[HUMAN]",
        }
    }
}

/// A fetched comment with the tasks that point at it.
#[derive(Debug, Clone)]
pub struct CommentWithTasks {
    pub comment: Comment,
    pub author: AuthorKind,
    pub tasks: Vec<Task>,
}

impl CommentWithTasks {
    pub fn is_top_level(&self) -> bool {
        !self.comment.is_reply()
    }
}

/// Comments in fetch order, joined with their tasks.
#[derive(Debug, Clone)]
pub struct JoinedComments {
    pub comments: Vec<CommentWithTasks>,
    /// Tasks whose comment is outside the fetched window (or missing entirely)
    pub standalone_tasks: Vec<Task>,
}

impl JoinedComments {
    fn top_level_by(&self, kind: AuthorKind) -> impl Iterator<Item = &CommentWithTasks> {
        self.comments
            .iter()
            .filter(move |c| c.is_top_level() && c.author == kind)
    }

    pub fn bot_comments(&self) -> impl Iterator<Item = &CommentWithTasks> {
        self.top_level_by(AuthorKind::Bot)
    }

    /// Top-level human comments; replies are never counted.
    pub fn human_comments(&self) -> impl Iterator<Item = &CommentWithTasks> {
        self.top_level_by(AuthorKind::Human)
    }
}

/// Group tasks by the comment they reference, keeping task order within each id.
pub fn group_tasks_by_comment(tasks: &[Task]) -> HashMap<u64, Vec<&Task>> {
    let mut grouped: HashMap<u64, Vec<&Task>> = HashMap::new();
    for task in tasks {
        if let Some(comment_id) = task.comment_id() {
            grouped.entry(comment_id).or_default().push(task);
        }
    }
    grouped
}

/// Attach tasks to comments and classify each author.
pub fn join_comments(
    comments: Vec<Comment>,
    tasks: &[Task],
    classifier: &dyn AuthorClassifier,
) -> JoinedComments {
    let grouped = group_tasks_by_comment(tasks);
    let fetched_ids: HashSet<u64> = comments.iter().map(|c| c.id).collect();

    let standalone_tasks = tasks
        .iter()
        .filter(|t| t.comment_id().map_or(true, |id| !fetched_ids.contains(&id)))
        .cloned()
        .collect();

    let comments = comments
        .into_iter()
        .map(|comment| {
            let author = if classifier.is_bot(comment.author_name()) {
                AuthorKind::Bot
            } else {
                AuthorKind::Human
            };
            let tasks = grouped
                .get(&comment.id)
                .map(|ts| ts.iter().map(|t| (*t).clone()).collect())
                .unwrap_or_default();
            CommentWithTasks { comment, author, tasks }
        })
        .collect();

    JoinedComments { comments, standalone_tasks }
}

/// Fetch comments and tasks concurrently.
///
/// Comments are mandatory. A failed task fetch is logged and treated as "no tasks".
#[instrument(skip(client), fields(pr = pr.pr_id))]
pub async fn fetch_comments_and_tasks(
    client: &BitbucketClient,
    pr: &PullRequestRef,
    comment_limit: usize,
) -> Result<(Vec<Comment>, Vec<Task>), BitbucketError> {
    let comments_path = pr.comments_path();
    let tasks_path = pr.tasks_path();

    let (comments, tasks) = tokio::join!(
        client
            .paginate::<Comment>(&comments_path, comment_limit)
            .instrument(info_span!("fetch", resource = "comments")),
        client
            .paginate::<Task>(&tasks_path, TASK_FETCH_LIMIT)
            .instrument(info_span!("fetch", resource = "tasks")),
    );

    let tasks = tasks.unwrap_or_else(|err| {
        warn!(error = %err, "task fetch failed, continuing without tasks");
        Vec::new()
    });
    let comments = comments?;
    debug!(comments = comments.len(), tasks = tasks.len(), "fetched review data");
    Ok((comments, tasks))
}

/// Resolve every task concurrently. Each outcome is kept at its task's index;
/// one failure never stops the others.
pub async fn resolve_tasks(
    client: &BitbucketClient,
    pr: &PullRequestRef,
    tasks: Vec<Task>,
) -> Vec<TaskOutcome> {
    let body = json!({ "state": TaskState::Resolved });
    let body = &body;

    let results = join_all(tasks.iter().map(|task| {
        let path = pr.task_path(task.id);
        async move { client.request::<Task>(Method::PUT, &path, Some(body)).await }
    }))
    .await;

    tasks
        .into_iter()
        .zip(results)
        .map(|(task, result)| {
            if let Err(err) = &result {
                warn!(task = task.id, error = %err, "task resolution failed");
            }
            TaskOutcome {
                task,
                result: result.map_err(|e| e.to_string()),
            }
        })
        .collect()
}

/// Fetch all review feedback on a pull request, resolve its open tasks, and
/// collect everything the report needs.
#[instrument(skip(client, classifier), fields(pr = pr.pr_id, repo = %pr.repo_name()))]
pub async fn fetch_and_resolve(
    client: &BitbucketClient,
    classifier: &dyn AuthorClassifier,
    pr: &PullRequestRef,
) -> Result<ReviewReport, BitbucketError> {
    let (comments, tasks) = fetch_comments_and_tasks(client, pr, REVIEW_COMMENT_LIMIT).await?;
    let task_count = tasks.len();
    let unresolved: Vec<Task> = tasks.iter().filter(|t| t.is_unresolved()).cloned().collect();
    let joined = join_comments(comments, &tasks, classifier);

    let resolutions = resolve_tasks(client, pr, unresolved).await;
    debug!(
        resolved = resolutions.iter().filter(|o| o.result.is_ok()).count(),
        failed = resolutions.iter().filter(|o| o.result.is_err()).count(),
        "task resolution finished"
    );

    Ok(ReviewReport {
        pr: pr.clone(),
        task_count,
        joined,
        resolutions,
    })
}
