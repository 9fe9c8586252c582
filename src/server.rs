//! MCP server handler. The tool list and dispatch both come from the
//! `tools::TOOLS` descriptor table; rmcp owns the JSON-RPC framing.

use std::sync::Arc;

use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer};
use tracing::debug;

use crate::tools::{ToolRegistry, ToolSpec, TOOLS};

pub const SERVER_NAME: &str = "bitbucket-cloud-mcp";

#[derive(Clone)]
pub struct BitbucketMcpServer {
    registry: ToolRegistry,
}

impl BitbucketMcpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }
}

fn tool(spec: &ToolSpec) -> Tool {
    Tool::new(spec.name, spec.description, Arc::new(spec.input_schema()))
}

impl ServerHandler for BitbucketMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: Some("Bitbucket Cloud MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Pull request review tools for Bitbucket Cloud. Use \
                 bitbucket_fetch_and_resolve_pr_comments to resolve open tasks and see \
                 which human comments still need a reply, then answer them with \
                 bitbucket_post_pr_comment and parent_id."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        debug!(tools = TOOLS.len(), "listing tools");
        Ok(ListToolsResult::with_all_items(TOOLS.iter().map(tool).collect()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let output = self
            .registry
            .call(request.name.as_ref(), request.arguments.unwrap_or_default())
            .await;
        let content = vec![Content::text(output.text)];
        if output.is_error {
            Ok(CallToolResult::error(content))
        } else {
            Ok(CallToolResult::success(content))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbucket::tests::test_client;
    use crate::review::BotPatterns;
    use rmcp::model::ClientInfo;
    use rmcp::service::RunningService;
    use rmcp::{ClientHandler, RoleClient, ServiceExt};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Clone, Default)]
    struct DummyClient;

    impl ClientHandler for DummyClient {
        fn get_info(&self) -> ClientInfo {
            ClientInfo::default()
        }
    }

    fn server(mock: &MockServer) -> BitbucketMcpServer {
        BitbucketMcpServer::new(ToolRegistry::new(
            test_client(mock, Some("acme")),
            Arc::new(BotPatterns::default()),
        ))
    }

    async fn connect(
        server: BitbucketMcpServer,
    ) -> (RunningService<RoleClient, DummyClient>, tokio::task::JoinHandle<()>) {
        let (server_transport, client_transport) = tokio::io::duplex(4096);
        let handle = tokio::spawn(async move {
            let service = server.serve(server_transport).await.unwrap();
            service.waiting().await.unwrap();
        });
        let client = DummyClient.serve(client_transport).await.unwrap();
        (client, handle)
    }

    fn first_text(result: &CallToolResult) -> &str {
        result
            .content
            .first()
            .and_then(|c| c.raw.as_text())
            .map(|t| t.text.as_str())
            .unwrap()
    }

    #[tokio::test]
    async fn test_server_info() {
        let mock = MockServer::start().await;
        let server = server(&mock);
        let info = server.get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("parent_id"));
    }

    #[tokio::test]
    async fn test_list_tools_declares_all_tools() {
        let mock = MockServer::start().await;
        let (client, handle) = connect(server(&mock)).await;

        let tools = client.list_tools(None).await.unwrap().tools;
        assert_eq!(tools.len(), 7);
        assert!(tools
            .iter()
            .all(|t| t.input_schema.get("type") == Some(&json!("object"))));
        let fetch = tools
            .iter()
            .find(|t| t.name == "bitbucket_fetch_and_resolve_pr_comments")
            .unwrap();
        assert_eq!(fetch.input_schema["required"], json!(["repo_slug", "pr_id"]));

        client.cancel().await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_call_tool_wraps_text() {
        let mock = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repositories/acme/widgets/pullrequests/42/tasks/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "content": { "raw": "Rename helper" }, "state": "RESOLVED"
            })))
            .expect(1)
            .mount(&mock)
            .await;
        let (client, handle) = connect(server(&mock)).await;

        let result = client
            .call_tool(CallToolRequestParams {
                meta: None,
                name: "bitbucket_resolve_pr_task".into(),
                arguments: json!({ "repo_slug": "widgets", "pr_id": 42, "task_id": 7 })
                    .as_object()
                    .cloned(),
                task: None,
            })
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        assert!(first_text(&result).starts_with("Task #7 resolved on PR #42."));

        client.cancel().await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_call_unknown_tool_is_error_result() {
        let mock = MockServer::start().await;
        let (client, handle) = connect(server(&mock)).await;

        let result = client
            .call_tool(CallToolRequestParams {
                meta: None,
                name: "nope".into(),
                arguments: None,
                task: None,
            })
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(first_text(&result), "Unknown tool: nope");

        client.cancel().await.unwrap();
        handle.await.unwrap();
    }
}
