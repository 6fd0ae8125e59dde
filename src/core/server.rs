//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler that implements the MCP
//! protocol by delegating to domain-specific services.
//!
//! The ToolRouter is built from the endpoint catalog in
//! `domains/tools/router.rs`; every route runs through the shared
//! [`SpotifyToolFacade`].

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, handler::server::tool::ToolRouter, model::*,
    service::RequestContext, tool_handler,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::config::Config;
use crate::domains::{
    resources::{ResourceService, service_description},
    tools::{SpotifyToolFacade, ToolRegistry, build_tool_router},
};

const INSTRUCTIONS: &str = "Spotify Web API tools. Every call needs a Spotify OAuth access \
token (Authorization: Bearer header over HTTP, MCP_SPOTIFY_ACCESS_TOKEN otherwise); the token \
is checked against Spotify on every call. Read tools accept a `format` argument: raw, full, \
compact (default) or minimal. Pagination is explicit through limit/offset or cursors. \
Playback tools need Spotify Premium and an active device.";

/// The main MCP server handler.
///
/// This struct implements the `ServerHandler` trait from rmcp and coordinates
/// between different domain services to handle MCP protocol messages.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Service for handling resource-related requests.
    resource_service: Arc<ResourceService>,

    /// Tool metadata and header-aware dispatch.
    tool_registry: ToolRegistry,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    ///
    /// Fails only if the upstream HTTP client cannot be built.
    pub fn new(config: Config) -> crate::core::Result<Self> {
        let config = Arc::new(config);

        let facade = Arc::new(SpotifyToolFacade::new(&config.api)?);
        let resource_service = Arc::new(ResourceService::new(config.clone()));

        Ok(Self {
            tool_router: build_tool_router::<Self>(
                facade.clone(),
                config.credentials.access_token.as_deref(),
            ),
            tool_registry: ToolRegistry::new(facade),
            config,
            resource_service,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Whether header-less transports have a credential to send.
    pub fn has_configured_token(&self) -> bool {
        self.config.credentials.access_token.is_some()
    }

    /// Formats, tool categories and authentication requirements.
    pub fn service_description(&self) -> serde_json::Value {
        service_description(&self.config)
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// List all available tools (for HTTP transport).
    pub fn list_tools(&self) -> Vec<serde_json::Value> {
        self.tool_registry
            .get_all_tools()
            .into_iter()
            .map(|t| serde_json::to_value(t).unwrap_or_default())
            .collect()
    }

    /// Call a tool with the request's `Authorization` header (for HTTP transport).
    #[cfg(feature = "http")]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
        authorization: Option<&str>,
    ) -> serde_json::Value {
        self.tool_registry
            .call_tool(name, arguments, authorization)
            .await
    }

    /// List all available resources (for HTTP transport).
    pub async fn list_resources(&self) -> Vec<serde_json::Value> {
        let resources = self.resource_service.list_resources().await;

        resources
            .into_iter()
            .map(|r| {
                serde_json::json!({
                    "uri": r.uri,
                    "name": r.name,
                    "description": r.description,
                    "mimeType": r.mime_type
                })
            })
            .collect()
    }

    /// Read a resource by URI (for HTTP transport).
    pub async fn read_resource(&self, uri: &str) -> Result<serde_json::Value, String> {
        match self.resource_service.read_resource(uri).await {
            Ok(result) => Ok(serde_json::json!({
                "contents": result.contents
            })),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// ServerHandler implementation with tool_handler macro for automatic tool routing.
#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    #[instrument(skip(self, _context))]
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        info!("Listing resources");
        let resources = self.resource_service.list_resources().await;
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, _context))]
    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        info!("Reading resource: {}", request.uri);
        self.resource_service
            .read_resource(&request.uri)
            .await
            .map_err(|e| McpError::resource_not_found(e.to_string(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_builds_full_catalog() {
        let server = McpServer::new(Config::default()).unwrap();
        assert_eq!(server.list_tools().len(), 37);
        assert_eq!(server.tool_router.list_all().len(), 37);
        assert!(!server.has_configured_token());
    }

    #[test]
    fn test_server_info() {
        let server = McpServer::new(Config::default()).unwrap();
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
        assert!(info.capabilities.prompts.is_none());
        assert_eq!(info.server_info.name, "spotify-mcp");
        assert!(info.instructions.unwrap().contains("compact"));
    }

    #[tokio::test]
    async fn test_http_support_methods() {
        let server = McpServer::new(Config::default()).unwrap();
        let resources = server.list_resources().await;
        assert_eq!(resources[0]["uri"], "spotify://server/info");

        let read = server.read_resource("spotify://server/info").await.unwrap();
        assert_eq!(read["contents"][0]["uri"], "spotify://server/info");
        assert!(server.read_resource("spotify://nope").await.is_err());
    }
}
