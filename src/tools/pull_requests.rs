use serde::Deserialize;
use tracing::{debug, instrument};

use crate::bitbucket::types::{pull_requests_path, PullRequestState};
use crate::bitbucket::{classify, BitbucketClient, BitbucketError, PullRequest, PullRequestRef};
use crate::report;

#[derive(Debug, Clone, Deserialize)]
pub struct ListPullRequestsArgs {
    pub workspace: Option<String>,
    pub repo_slug: String,
    pub state: PullRequestState,
    pub limit: usize,
}

/// Arguments shared by every tool that targets a single pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestArgs {
    pub workspace: Option<String>,
    pub repo_slug: String,
    pub pr_id: u64,
}

impl PullRequestArgs {
    /// Fails with `MissingWorkspace` before any request when no workspace is known.
    pub fn resolve(&self, client: &BitbucketClient) -> Result<PullRequestRef, BitbucketError> {
        let workspace = client.resolve_workspace(self.workspace.as_deref())?;
        Ok(PullRequestRef::new(workspace, self.repo_slug.clone(), self.pr_id))
    }
}

pub async fn list_pull_requests(client: &BitbucketClient, args: ListPullRequestsArgs) -> String {
    try_list_pull_requests(client, &args)
        .await
        .unwrap_or_else(|err| classify(&err, "listing pull requests"))
}

#[instrument(skip(client))]
async fn try_list_pull_requests(
    client: &BitbucketClient,
    args: &ListPullRequestsArgs,
) -> Result<String, BitbucketError> {
    let workspace = client.resolve_workspace(args.workspace.as_deref())?;
    let path = format!(
        "{}?state={}",
        pull_requests_path(&workspace, &args.repo_slug),
        args.state
    );
    let prs: Vec<PullRequest> = client.paginate(&path, args.limit).await?;
    debug!(count = prs.len(), "listed pull requests");

    let repo_name = format!("{}/{}", workspace, args.repo_slug);
    Ok(report::render_pull_request_list(&repo_name, args.state, &prs))
}

pub async fn get_pull_request(client: &BitbucketClient, args: PullRequestArgs) -> String {
    let operation = format!("getting PR #{}", args.pr_id);
    try_get_pull_request(client, &args)
        .await
        .unwrap_or_else(|err| classify(&err, &operation))
}

async fn try_get_pull_request(
    client: &BitbucketClient,
    args: &PullRequestArgs,
) -> Result<String, BitbucketError> {
    let pr = args.resolve(client)?;
    let pull_request: PullRequest = client.get(&pr.path()).await?;
    Ok(report::render_pull_request(&pull_request))
}

pub async fn get_diff(client: &BitbucketClient, args: PullRequestArgs) -> String {
    let operation = format!("getting diff for PR #{}", args.pr_id);
    try_get_diff(client, &args)
        .await
        .unwrap_or_else(|err| classify(&err, &operation))
}

#[instrument(skip(client))]
async fn try_get_diff(client: &BitbucketClient, args: &PullRequestArgs) -> Result<String, BitbucketError> {
    let pr = args.resolve(client)?;
    let raw_diff = client.request_raw(&pr.diff_path()).await?;
    debug!(bytes = raw_diff.len(), "fetched diff");
    Ok(report::render_diff(&pr, &raw_diff))
}
