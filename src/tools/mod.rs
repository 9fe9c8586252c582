pub mod comments;
pub mod pull_requests;
pub mod schema;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};

use crate::bitbucket::BitbucketClient;
use crate::review::AuthorClassifier;
use schema::{object_schema, DefaultValue, FieldKind, FieldSpec};

pub const LIST_PRS_TOOL: &str = "bitbucket_list_prs";
pub const GET_PR_TOOL: &str = "bitbucket_get_pr";
pub const GET_DIFF_TOOL: &str = "bitbucket_get_pr_diff";
pub const LIST_COMMENTS_TOOL: &str = "bitbucket_list_pr_comments";
pub const POST_COMMENT_TOOL: &str = "bitbucket_post_pr_comment";
pub const RESOLVE_TASK_TOOL: &str = "bitbucket_resolve_pr_task";
pub const FETCH_AND_RESOLVE_TOOL: &str = "bitbucket_fetch_and_resolve_pr_comments";

const WORKSPACE: FieldSpec = FieldSpec::optional(
    "workspace",
    FieldKind::String,
    "Bitbucket workspace slug (uses default if not set)",
);
const REPO_SLUG: FieldSpec = FieldSpec::required("repo_slug", FieldKind::String, "Repository slug");
const PR_ID: FieldSpec = FieldSpec::required("pr_id", FieldKind::Integer, "Pull request ID");

const PR_FIELDS: &[FieldSpec] = &[WORKSPACE, REPO_SLUG, PR_ID];

const LIST_PRS_FIELDS: &[FieldSpec] = &[
    WORKSPACE,
    REPO_SLUG,
    FieldSpec::optional("state", FieldKind::String, "PR state filter")
        .with_enum(&["OPEN", "MERGED", "DECLINED", "SUPERSEDED"])
        .with_default(DefaultValue::Str("OPEN")),
    FieldSpec::optional("limit", FieldKind::Integer, "Max results to return")
        .with_default(DefaultValue::Int(25)),
];

const LIST_COMMENTS_FIELDS: &[FieldSpec] = &[
    WORKSPACE,
    REPO_SLUG,
    PR_ID,
    FieldSpec::optional("limit", FieldKind::Integer, "Max comments to return")
        .with_default(DefaultValue::Int(100)),
];

const INLINE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("path", FieldKind::String, "File path for inline comment"),
    FieldSpec::required("line", FieldKind::Integer, "Line number for inline comment"),
];

const POST_COMMENT_FIELDS: &[FieldSpec] = &[
    WORKSPACE,
    REPO_SLUG,
    PR_ID,
    FieldSpec::required("content", FieldKind::String, "Comment content (markdown supported)"),
    FieldSpec::optional(
        "inline",
        FieldKind::Object(INLINE_FIELDS),
        "Set this for inline comments on a specific file and line",
    ),
    FieldSpec::optional(
        "parent_id",
        FieldKind::Integer,
        "Comment ID to reply to (creates a threaded reply)",
    ),
];

const RESOLVE_TASK_FIELDS: &[FieldSpec] = &[
    WORKSPACE,
    REPO_SLUG,
    PR_ID,
    FieldSpec::required("task_id", FieldKind::Integer, "Task ID to resolve"),
];

/// Which operation a declared tool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ListPullRequests,
    GetPullRequest,
    GetDiff,
    ListComments,
    PostComment,
    ResolveTask,
    FetchAndResolve,
}

/// Static declaration of one tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
    pub kind: ToolKind,
}

impl ToolSpec {
    /// Entry printed by `--list-tools`.
    pub fn declaration(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": object_schema(self.fields),
        })
    }

    /// The input schema as a JSON object map.
    pub fn input_schema(&self) -> Map<String, Value> {
        match object_schema(self.fields) {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: LIST_PRS_TOOL,
        description: "List pull requests for a Bitbucket Cloud repository. Returns PR titles, authors, branches, and URLs.",
        fields: LIST_PRS_FIELDS,
        kind: ToolKind::ListPullRequests,
    },
    ToolSpec {
        name: GET_PR_TOOL,
        description: "Get full details of a single pull request including description, reviewers, and status.",
        fields: PR_FIELDS,
        kind: ToolKind::GetPullRequest,
    },
    ToolSpec {
        name: GET_DIFF_TOOL,
        description: "Get the full diff (code changes) for a pull request. Use this to review what code was changed.",
        fields: PR_FIELDS,
        kind: ToolKind::GetDiff,
    },
    ToolSpec {
        name: LIST_COMMENTS_TOOL,
        description: "List all comments on a pull request, including inline code comments and general comments, with their tasks.",
        fields: LIST_COMMENTS_FIELDS,
        kind: ToolKind::ListComments,
    },
    ToolSpec {
        name: POST_COMMENT_TOOL,
        description: "Post a comment on a pull request. Supports general comments, inline comments on specific files/lines, and replies to existing comments.",
        fields: POST_COMMENT_FIELDS,
        kind: ToolKind::PostComment,
    },
    ToolSpec {
        name: RESOLVE_TASK_TOOL,
        description: "Mark a single pull request task as resolved.",
        fields: RESOLVE_TASK_FIELDS,
        kind: ToolKind::ResolveTask,
    },
    ToolSpec {
        name: FETCH_AND_RESOLVE_TOOL,
        description: "Fetch all comments and tasks on a pull request, tag bot and human reviewers, resolve every open task, and list the human comments that still need a reply.",
        fields: PR_FIELDS,
        kind: ToolKind::FetchAndResolve,
    },
];

pub fn find_tool(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|t| t.name == name)
}

/// Declarations of every tool, in registration order.
pub fn declarations() -> Vec<Value> {
    TOOLS.iter().map(ToolSpec::declaration).collect()
}

/// Text result of one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    /// Set for unknown tools and rejected arguments. Bitbucket failures are
    /// reported as ordinary text.
    pub is_error: bool,
}

impl ToolOutput {
    fn ok(text: String) -> Self {
        Self { text, is_error: false }
    }

    fn error(text: String) -> Self {
        Self { text, is_error: true }
    }
}

/// Dispatches tool calls to their operations.
#[derive(Clone)]
pub struct ToolRegistry {
    client: BitbucketClient,
    classifier: Arc<dyn AuthorClassifier>,
}

impl ToolRegistry {
    pub fn new(client: BitbucketClient, classifier: Arc<dyn AuthorClassifier>) -> Self {
        Self { client, classifier }
    }

    /// Validate `arguments` against the tool's descriptor table and run it.
    #[instrument(skip(self, arguments))]
    pub async fn call(&self, name: &str, arguments: Map<String, Value>) -> ToolOutput {
        let Some(spec) = find_tool(name) else {
            warn!("unknown tool requested");
            return ToolOutput::error(format!("Unknown tool: {}", name));
        };

        let args = match schema::validate(spec.fields, &arguments) {
            Ok(args) => Value::Object(args),
            Err(err) => {
                warn!(error = %err, "rejected tool arguments");
                return ToolOutput::error(format!("Invalid arguments for {}: {}", name, err));
            }
        };

        info!("tool called");
        match self.dispatch(spec.kind, args).await {
            Ok(text) => ToolOutput::ok(text),
            Err(err) => ToolOutput::error(format!("Invalid arguments for {}: {}", name, err)),
        }
    }

    async fn dispatch(&self, kind: ToolKind, args: Value) -> Result<String, serde_json::Error> {
        let client = &self.client;
        let text = match kind {
            ToolKind::ListPullRequests => {
                pull_requests::list_pull_requests(client, parse(args)?).await
            }
            ToolKind::GetPullRequest => pull_requests::get_pull_request(client, parse(args)?).await,
            ToolKind::GetDiff => pull_requests::get_diff(client, parse(args)?).await,
            ToolKind::ListComments => {
                comments::list_comments(client, self.classifier.as_ref(), parse(args)?).await
            }
            ToolKind::PostComment => comments::post_comment(client, parse(args)?).await,
            ToolKind::ResolveTask => comments::resolve_task(client, parse(args)?).await,
            ToolKind::FetchAndResolve => {
                comments::fetch_and_resolve(client, self.classifier.as_ref(), parse(args)?).await
            }
        };
        Ok(text)
    }
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(args)
}
