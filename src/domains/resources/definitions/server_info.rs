//! Server info resource definition.
//!
//! The same service description is served by `GET /` on the HTTP transport.

use serde_json::{Value, json};

use super::ResourceDefinition;
use crate::core::config::Config;
use crate::domains::resources::service::{DynamicResourceType, ResourceContent};
use crate::domains::spotify::FormatTier;
use crate::domains::spotify::endpoint::Category;
use crate::domains::tools::EndpointCatalog;

/// Service description resource (dynamic).
pub struct ServerInfoResource;

impl ResourceDefinition for ServerInfoResource {
    const URI: &'static str = "spotify://server/info";
    const NAME: &'static str = "Server Information";
    const DESCRIPTION: &'static str =
        "Response formats, tool categories and authentication requirements of this server";
    const MIME_TYPE: &'static str = "application/json";

    fn content() -> ResourceContent {
        ResourceContent::Dynamic(DynamicResourceType::ServiceDescription)
    }
}

/// Describe the running service: formats, categories and authentication.
///
/// Secrets are reported only as configured or not.
pub fn service_description(config: &Config) -> Value {
    let catalog = EndpointCatalog::global();

    let formats: Vec<Value> = FormatTier::ALL
        .iter()
        .map(|tier| {
            json!({
                "name": tier.as_str(),
                "description": tier.description(),
                "default": *tier == FormatTier::default(),
            })
        })
        .collect();

    let categories: Vec<Value> = Category::ALL
        .iter()
        .map(|category| {
            let tools: Vec<&str> = catalog
                .by_category(*category)
                .iter()
                .map(|d| d.name)
                .collect();
            json!({
                "name": category.key(),
                "tool_count": tools.len(),
                "tools": tools,
            })
        })
        .collect();

    json!({
        "server": config.server.name,
        "version": config.server.version,
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "transport": config.transport.description(),
        "total_tools": catalog.len(),
        "formats": formats,
        "categories": categories,
        "authentication": {
            "scheme": "Bearer",
            "header": "Authorization",
            "validated_on_every_call": true,
            "identity_endpoint": config.api.identity_endpoint(),
            "header_less_token_configured": config.credentials.access_token.is_some(),
            "client_id_configured": config.credentials.client_id.is_some(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_metadata() {
        assert_eq!(ServerInfoResource::URI, "spotify://server/info");
        assert_eq!(ServerInfoResource::MIME_TYPE, "application/json");
    }

    #[test]
    fn test_service_description() {
        let description = service_description(&Config::default());
        assert_eq!(description["total_tools"], 37);
        assert_eq!(description["formats"].as_array().unwrap().len(), 4);
        assert_eq!(description["formats"][2]["name"], "compact");
        assert_eq!(description["formats"][2]["default"], true);

        let counts: Vec<u64> = description["categories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["tool_count"].as_u64().unwrap())
            .collect();
        assert_eq!(counts, vec![3, 8, 8, 12, 6]);
        assert_eq!(description["authentication"]["scheme"], "Bearer");
    }

    #[test]
    fn test_service_description_hides_secrets() {
        let mut config = Config::default();
        config.credentials.access_token = Some("BQD_secret".to_string());
        config.credentials.client_secret = Some("shh_client".to_string());

        let text = service_description(&config).to_string();
        assert!(!text.contains("BQD_secret"));
        assert!(!text.contains("shh_client"));
        assert!(text.contains("\"header_less_token_configured\":true"));
    }
}
