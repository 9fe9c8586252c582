use serde::{Deserialize, Serialize};

/// A Bitbucket account as embedded in pull requests, comments and tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub display_name: String,
}

/// Rich text body. Only the raw markdown is rendered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub raw: String,
}

/// A `{ "id": N }` pointer to another resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reference {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Href {
    #[serde(default)]
    pub href: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    pub html: Option<Href>,
}

impl Links {
    pub fn html_url(&self) -> &str {
        self.html.as_ref().map(|h| h.href.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub branch: Branch,
}

/// Lifecycle state of a pull request. Transitions happen on Bitbucket only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestState {
    Open,
    Merged,
    Declined,
    Superseded,
}

impl PullRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullRequestState::Open => "OPEN",
            PullRequestState::Merged => "MERGED",
            PullRequestState::Declined => "DECLINED",
            PullRequestState::Superseded => "SUPERSEDED",
        }
    }
}

impl std::fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull request metadata as returned by `/pullrequests` and `/pullrequests/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub state: PullRequestState,
    pub author: Option<User>,
    #[serde(default)]
    pub source: Endpoint,
    #[serde(default)]
    pub destination: Endpoint,
    #[serde(default)]
    pub reviewers: Vec<User>,
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub updated_on: String,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub task_count: u64,
    #[serde(default)]
    pub links: Links,
}

impl PullRequest {
    pub fn author_name(&self) -> &str {
        display_name(self.author.as_ref())
    }
}

/// File/line anchor of an inline comment. Either side of the diff may be absent.
#[derive(Debug, Clone, Deserialize)]
pub struct Inline {
    pub from: Option<u64>,
    pub to: Option<u64>,
    #[serde(default)]
    pub path: String,
}

impl Inline {
    /// `path:line`, preferring the new-side line number.
    pub fn location(&self) -> String {
        match self.to.or(self.from) {
            Some(line) => format!("{}:{}", self.path, line),
            None => format!("{}:?", self.path),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub content: Content,
    pub user: Option<User>,
    #[serde(default)]
    pub created_on: String,
    pub inline: Option<Inline>,
    pub parent: Option<Reference>,
    #[serde(default)]
    pub links: Links,
}

impl Comment {
    pub fn author_name(&self) -> &str {
        display_name(self.user.as_ref())
    }

    pub fn is_reply(&self) -> bool {
        self.parent.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Unresolved,
    Resolved,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Unresolved => write!(f, "UNRESOLVED"),
            TaskState::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// A task attached to a pull request comment.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: u64,
    #[serde(default)]
    pub content: Content,
    pub state: TaskState,
    pub creator: Option<User>,
    /// Owning comment. Bitbucket omits it for tasks created on the PR itself.
    pub comment: Option<Reference>,
}

impl Task {
    pub fn creator_name(&self) -> &str {
        display_name(self.creator.as_ref())
    }

    pub fn comment_id(&self) -> Option<u64> {
        self.comment.map(|c| c.id)
    }

    pub fn is_unresolved(&self) -> bool {
        self.state == TaskState::Unresolved
    }
}

/// One page of a cursor-paginated listing. No `next` means this is the last page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    pub next: Option<String>,
}

/// Identifies one pull request and builds the API paths under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub workspace: String,
    pub repo_slug: String,
    pub pr_id: u64,
}

impl PullRequestRef {
    pub fn new(workspace: impl Into<String>, repo_slug: impl Into<String>, pr_id: u64) -> Self {
        Self {
            workspace: workspace.into(),
            repo_slug: repo_slug.into(),
            pr_id,
        }
    }

    /// `workspace/repo_slug`, as shown in report headers.
    pub fn repo_name(&self) -> String {
        format!("{}/{}", self.workspace, self.repo_slug)
    }

    pub fn path(&self) -> String {
        format!(
            "{}/{}",
            pull_requests_path(&self.workspace, &self.repo_slug),
            self.pr_id
        )
    }

    pub fn comments_path(&self) -> String {
        format!("{}/comments", self.path())
    }

    pub fn tasks_path(&self) -> String {
        format!("{}/tasks", self.path())
    }

    pub fn task_path(&self, task_id: u64) -> String {
        format!("{}/tasks/{}", self.path(), task_id)
    }

    pub fn diff_path(&self) -> String {
        format!("{}/diff", self.path())
    }
}

pub fn pull_requests_path(workspace: &str, repo_slug: &str) -> String {
    format!("/repositories/{}/{}/pullrequests", workspace, repo_slug)
}

fn display_name(user: Option<&User>) -> &str {
    match user {
        Some(u) if !u.display_name.is_empty() => &u.display_name,
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_ref_paths() {
        let pr = PullRequestRef::new("acme", "widgets", 42);
        assert_eq!(pr.path(), "/repositories/acme/widgets/pullrequests/42");
        assert_eq!(pr.comments_path(), "/repositories/acme/widgets/pullrequests/42/comments");
        assert_eq!(pr.task_path(7), "/repositories/acme/widgets/pullrequests/42/tasks/7");
        assert_eq!(pr.diff_path(), "/repositories/acme/widgets/pullrequests/42/diff");
        assert_eq!(pr.repo_name(), "acme/widgets");
    }

    #[test]
    fn test_inline_location_prefers_new_side() {
        let inline = Inline { from: Some(3), to: Some(9), path: "src/lib.rs".to_string() };
        assert_eq!(inline.location(), "src/lib.rs:9");
        let inline = Inline { from: Some(3), to: None, path: "src/lib.rs".to_string() };
        assert_eq!(inline.location(), "src/lib.rs:3");
        let inline = Inline { from: None, to: None, path: "src/lib.rs".to_string() };
        assert_eq!(inline.location(), "src/lib.rs:?");
    }

    #[test]
    fn test_deserialize_comment_and_task() {
        let comment: Comment = serde_json::from_value(serde_json::json!({
            "id": 5,
            "content": { "raw": "Please rename", "markup": "markdown", "html": "" },
            "user": { "display_name": "Alice" },
            "created_on": "2025-03-01T10:15:00Z",
            "inline": { "from": null, "to": 12, "path": "src/main.rs" },
            "parent": { "id": 4 },
            "links": { "html": { "href": "https://bitbucket.org/c/5" } }
        }))
        .unwrap();
        assert_eq!(comment.author_name(), "Alice");
        assert!(comment.is_reply());
        assert_eq!(comment.inline.unwrap().location(), "src/main.rs:12");

        let task: Task = serde_json::from_value(serde_json::json!({
            "id": 9,
            "content": { "raw": "Fix it" },
            "state": "UNRESOLVED",
            "comment": { "id": 5 }
        }))
        .unwrap();
        assert!(task.is_unresolved());
        assert_eq!(task.comment_id(), Some(5));
    }

    #[test]
    fn test_page_without_values_is_empty() {
        let page: Page<Task> = serde_json::from_value(serde_json::json!({ "pagelen": 10 })).unwrap();
        assert!(page.values.is_empty());
        assert!(page.next.is_none());
    }
}
