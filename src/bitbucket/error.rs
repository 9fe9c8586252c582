use thiserror::Error;
use tracing::error;

/// Where to create a Bitbucket API token, quoted in credential remedies.
pub const API_TOKEN_URL: &str = "https://bitbucket.org/account/settings/api-tokens/";

const DETAIL_FALLBACK_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum BitbucketError {
    #[error("No workspace specified. Provide workspace parameter or set BITBUCKET_WORKSPACE env var.")]
    MissingWorkspace,

    #[error("network error during {context}: {message}")]
    Network { context: String, message: String },

    #[error("Bitbucket API {status}: {status_text}")]
    Api {
        status: u16,
        status_text: String,
        body: String,
        /// `METHOD path` of the failed request
        context: String,
    },

    #[error("unexpected response for {context}: {message}")]
    Decode { context: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Stable categories used to pick the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingWorkspace,
    NetworkUnreachable,
    AuthenticationFailed,
    PermissionDenied,
    NotFound,
    RateLimited,
    OtherApiError(u16),
    Decode,
    Unrecognized,
}

impl BitbucketError {
    /// Map a reqwest failure while sending a request or reading its body.
    /// Response decoding happens after the body is read, so anything that
    /// reaches here is a transport problem unless the request never got built.
    pub fn transport(context: &str, err: reqwest::Error) -> Self {
        if err.is_builder() {
            BitbucketError::Client(err.to_string())
        } else {
            BitbucketError::Network {
                context: context.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BitbucketError::MissingWorkspace => ErrorKind::MissingWorkspace,
            BitbucketError::Network { .. } => ErrorKind::NetworkUnreachable,
            BitbucketError::Api { status, .. } => match status {
                401 => ErrorKind::AuthenticationFailed,
                403 => ErrorKind::PermissionDenied,
                404 => ErrorKind::NotFound,
                429 => ErrorKind::RateLimited,
                other => ErrorKind::OtherApiError(*other),
            },
            BitbucketError::Decode { .. } => ErrorKind::Decode,
            BitbucketError::Client(_) => ErrorKind::Unrecognized,
        }
    }

    /// Message for the tool caller. `operation` names what the tool was doing.
    pub fn user_message(&self, operation: &str) -> String {
        match self {
            BitbucketError::Network { .. } => {
                "Network error: Could not connect to Bitbucket API. Check your internet connection."
                    .to_string()
            }
            BitbucketError::Api { status, body, context, .. } => {
                api_message(*status, &extract_detail(body), context)
            }
            BitbucketError::MissingWorkspace | BitbucketError::Decode { .. } => {
                format!("Error in {}: {}", operation, self)
            }
            BitbucketError::Client(_) => format!("Unknown error in {}", operation),
        }
    }
}

/// Turn any failure into the text returned to the tool caller, logging the raw error.
pub fn classify(err: &(dyn std::error::Error + 'static), operation: &str) -> String {
    match err.downcast_ref::<BitbucketError>() {
        Some(bitbucket) => {
            error!(operation, kind = ?bitbucket.kind(), error = %err, "tool operation failed");
            bitbucket.user_message(operation)
        }
        None => {
            error!(operation, error = %err, "tool operation failed");
            format!("Unknown error in {}", operation)
        }
    }
}

/// Machine-readable detail from an error body: `error.message`, then `message`,
/// then the first 200 characters when the body is not JSON.
pub fn extract_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(parsed) => parsed
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .or_else(|| parsed.get("message").and_then(|v| v.as_str()))
            .unwrap_or_default()
            .to_string(),
        Err(_) => body.chars().take(DETAIL_FALLBACK_CHARS).collect(),
    }
}

fn api_message(status: u16, detail: &str, context: &str) -> String {
    let detail_line = |lines: &mut Vec<String>| {
        if !detail.is_empty() {
            lines.push(format!("Detail: {}", detail));
        }
    };

    let mut lines = Vec::new();
    match status {
        401 => {
            lines.push(format!("Authentication failed ({}).", context));
            lines.push(String::new());
            lines.push("Check that:".to_string());
            lines.push("1. BITBUCKET_EMAIL is your Atlassian account email".to_string());
            lines.push(
                "2. BITBUCKET_API_TOKEN is a valid API token with required scopes".to_string(),
            );
            lines.push(
                "3. Token has scopes: pullrequest:read, pullrequest:write, repository:read"
                    .to_string(),
            );
            lines.push(String::new());
            lines.push(format!("Create an API token at: {}", API_TOKEN_URL));
        }
        403 => {
            lines.push(format!("Permission denied ({}).", context));
            detail_line(&mut lines);
            lines.push(String::new());
            lines.push("Ensure your API token has the required scopes.".to_string());
        }
        404 => {
            lines.push(format!("Not found ({}).", context));
            detail_line(&mut lines);
            lines.push(String::new());
            lines.push(
                "Check that the workspace, repository slug, and PR ID are correct.".to_string(),
            );
        }
        429 => {
            lines.push(format!("Rate limit exceeded ({}).", context));
            lines.push(String::new());
            lines.push(
                "Bitbucket API rate limit hit. Wait a few minutes before retrying.".to_string(),
            );
        }
        other => {
            lines.push(format!("Bitbucket API error {} ({}).", other, context));
            detail_line(&mut lines);
        }
    }
    lines.join("\n")
}
