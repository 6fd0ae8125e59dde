//! Spotify MCP Server Library
//!
//! A Model Context Protocol server that exposes the Spotify Web API as a
//! catalog of tools. Every call is authenticated with a caller-supplied
//! OAuth bearer token, validated against Spotify before the call is made,
//! and the upstream response is reshaped to the requested fidelity tier.
//!
//! # Architecture
//!
//! - **core**: Configuration, error handling, the MCP server and transports
//! - **domains**: Business logic organized by bounded contexts
//!   - **spotify**: Credential validation, endpoint descriptors, request
//!     dispatch and response shaping
//!   - **tools**: The endpoint catalog, the tool façade and the MCP tool surface
//!   - **resources**: The service description resource
//!
//! # Example
//!
//! ```rust,no_run
//! use spotify_mcp_server::{core::Config, core::McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config)?;
//!     // Start the server...
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
