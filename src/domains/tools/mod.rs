//! Tools domain module.
//!
//! Every Spotify Web API operation the server exposes is an MCP tool. Tools
//! are not hand-written: each one is a descriptor in the endpoint catalog and
//! all of them run through the same façade.
//!
//! ## Architecture
//!
//! - `definitions/` - Static descriptor tables, one file per category
//! - `catalog.rs` - Name lookup over the descriptor tables
//! - `facade.rs` - Validate, authenticate, dispatch and shape a tool call
//! - `router.rs` - Dynamic ToolRouter builder for STDIO/TCP transport
//! - `registry.rs` - Tool metadata and HTTP dispatch
//! - `error.rs` - Tool error taxonomy
//!
//! ## Adding a New Tool
//!
//! 1. Add a `ToolDescriptor` to the matching table in `definitions/`
//! 2. If the response holds a new entity type, add its projection in
//!    `spotify::transform::projections`
//!
//! The router, registry and HTTP transport pick the new entry up on their own.

pub mod catalog;
pub mod definitions;
mod error;
pub mod facade;
mod registry;
pub mod router;

pub use catalog::EndpointCatalog;
pub use error::{BatchReport, ToolError};
pub use facade::SpotifyToolFacade;
pub use registry::{ToolRegistry, annotations_for_method, to_tool};
pub use router::build_tool_router;
