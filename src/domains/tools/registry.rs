//! Tool Registry - tool metadata and HTTP dispatch.
//!
//! This module provides:
//! - MCP `Tool` metadata generated from catalog descriptors
//! - HTTP dispatch for tool calls (when http feature is enabled)

use std::sync::Arc;

use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{Tool, ToolAnnotations};

use crate::domains::spotify::endpoint::{HttpMethod, ResponseShape, ToolDescriptor};

use super::definitions::MutationAck;
use super::facade::SpotifyToolFacade;

/// Build the MCP tool metadata for a catalog entry.
pub fn to_tool(descriptor: &ToolDescriptor) -> Tool {
    let output_schema = match descriptor.response {
        ResponseShape::Ack { .. } => Some(cached_schema_for_type::<MutationAck>()),
        _ => None,
    };

    Tool {
        name: descriptor.name.into(),
        description: Some(descriptor.description.into()),
        input_schema: Arc::new(descriptor.input_schema()),
        annotations: Some(annotations_for_method(descriptor.method)),
        output_schema,
        icons: None,
        meta: None,
        title: None,
    }
}

/// Behaviour hints derived from the upstream HTTP method.
pub fn annotations_for_method(method: HttpMethod) -> ToolAnnotations {
    let (read_only, destructive, idempotent) = match method {
        HttpMethod::Get => (true, false, true),
        HttpMethod::Post => (false, false, false),
        HttpMethod::Put => (false, true, true),
        HttpMethod::Delete => (false, true, true),
    };
    ToolAnnotations {
        title: None,
        read_only_hint: Some(read_only),
        destructive_hint: Some(destructive),
        idempotent_hint: Some(idempotent),
        open_world_hint: Some(true),
    }
}

/// Tool registry - lists tools and dispatches HTTP tool calls.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    facade: Arc<SpotifyToolFacade>,
}

impl ToolRegistry {
    /// Create a new tool registry.
    pub fn new(facade: Arc<SpotifyToolFacade>) -> Self {
        Self { facade }
    }

    /// Get all tool names, in catalog order.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.facade.catalog().names()
    }

    /// Get all tools as Tool models (metadata).
    pub fn get_all_tools(&self) -> Vec<Tool> {
        self.facade.catalog().descriptors().map(to_tool).collect()
    }

    /// Dispatch an HTTP tool call with the request's `Authorization` header.
    ///
    /// Tool failures come back as MCP tool results with `isError` set, not as
    /// JSON-RPC errors.
    #[cfg(feature = "http")]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
        authorization: Option<&str>,
    ) -> serde_json::Value {
        use crate::domains::spotify::Credential;
        use tracing::debug;

        let args = match arguments {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        let credential = match Credential::from_authorization_header(authorization) {
            Ok(credential) => Some(credential),
            Err(err) => {
                debug!("No usable bearer credential on request: {}", err);
                None
            }
        };
        let result = self.facade.call_tool(name, args, credential.as_ref()).await;

        serde_json::to_value(&result).unwrap_or_else(|e| {
            serde_json::json!({
                "content": [{"type": "text", "text": format!("Failed to encode result: {e}")}],
                "isError": true,
            })
        })
    }
}
