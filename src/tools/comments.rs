use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::pull_requests::PullRequestArgs;
use crate::bitbucket::types::TaskState;
use crate::bitbucket::{classify, BitbucketClient, BitbucketError, Comment, Task};
use crate::report;
use crate::review::{self, AuthorClassifier};

#[derive(Debug, Clone, Deserialize)]
pub struct ListCommentsArgs {
    #[serde(flatten)]
    pub pr: PullRequestArgs,
    pub limit: usize,
}

/// File and line an inline comment is anchored to (new side of the diff).
#[derive(Debug, Clone, Deserialize)]
pub struct InlineAnchor {
    pub path: String,
    pub line: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostCommentArgs {
    #[serde(flatten)]
    pub pr: PullRequestArgs,
    pub content: String,
    pub inline: Option<InlineAnchor>,
    pub parent_id: Option<u64>,
}

impl PostCommentArgs {
    fn body(&self) -> Value {
        let mut body = json!({ "content": { "raw": self.content } });
        if let Some(inline) = &self.inline {
            body["inline"] = json!({ "to": inline.line, "path": inline.path });
        }
        if let Some(parent_id) = self.parent_id {
            body["parent"] = json!({ "id": parent_id });
        }
        body
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveTaskArgs {
    #[serde(flatten)]
    pub pr: PullRequestArgs,
    pub task_id: u64,
}

pub async fn list_comments(
    client: &BitbucketClient,
    classifier: &dyn AuthorClassifier,
    args: ListCommentsArgs,
) -> String {
    let operation = format!("listing comments on PR #{}", args.pr.pr_id);
    try_list_comments(client, classifier, &args)
        .await
        .unwrap_or_else(|err| classify(&err, &operation))
}

async fn try_list_comments(
    client: &BitbucketClient,
    classifier: &dyn AuthorClassifier,
    args: &ListCommentsArgs,
) -> Result<String, BitbucketError> {
    let pr = args.pr.resolve(client)?;
    let (comments, tasks) = review::fetch_comments_and_tasks(client, &pr, args.limit).await?;
    let joined = review::join_comments(comments, &tasks, classifier);
    Ok(report::render_comments(&pr, &joined))
}

pub async fn post_comment(client: &BitbucketClient, args: PostCommentArgs) -> String {
    let operation = format!("posting comment on PR #{}", args.pr.pr_id);
    try_post_comment(client, &args)
        .await
        .unwrap_or_else(|err| classify(&err, &operation))
}

async fn try_post_comment(
    client: &BitbucketClient,
    args: &PostCommentArgs,
) -> Result<String, BitbucketError> {
    let pr = args.pr.resolve(client)?;
    let comment: Comment = client
        .request(Method::POST, &pr.comments_path(), Some(&args.body()))
        .await?;
    info!(pr = pr.pr_id, comment = comment.id, "posted comment");
    Ok(report::render_posted_comment(pr.pr_id, &comment))
}

pub async fn resolve_task(client: &BitbucketClient, args: ResolveTaskArgs) -> String {
    let operation = format!("resolving task #{} on PR #{}", args.task_id, args.pr.pr_id);
    try_resolve_task(client, &args)
        .await
        .unwrap_or_else(|err| classify(&err, &operation))
}

async fn try_resolve_task(
    client: &BitbucketClient,
    args: &ResolveTaskArgs,
) -> Result<String, BitbucketError> {
    let pr = args.pr.resolve(client)?;
    let body = json!({ "state": TaskState::Resolved });
    let task: Task = client
        .request(Method::PUT, &pr.task_path(args.task_id), Some(&body))
        .await?;
    debug!(task = task.id, state = %task.state, "task updated");
    Ok(report::render_resolved_task(pr.pr_id, &task))
}

pub async fn fetch_and_resolve(
    client: &BitbucketClient,
    classifier: &dyn AuthorClassifier,
    args: PullRequestArgs,
) -> String {
    let operation = format!("fetching and resolving comments on PR #{}", args.pr_id);
    try_fetch_and_resolve(client, classifier, &args)
        .await
        .unwrap_or_else(|err| classify(&err, &operation))
}

async fn try_fetch_and_resolve(
    client: &BitbucketClient,
    classifier: &dyn AuthorClassifier,
    args: &PullRequestArgs,
) -> Result<String, BitbucketError> {
    let pr = args.resolve(client)?;
    let review = review::fetch_and_resolve(client, classifier, &pr).await?;
    Ok(report::render_review(&review))
}
