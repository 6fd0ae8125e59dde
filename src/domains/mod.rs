//! Domains module containing business logic organized by bounded contexts.
//!
//! - `spotify` - Upstream Web API client: credentials, catalog types,
//!   dispatch and response shaping
//! - `tools` - The MCP tool surface built on top of `spotify`
//! - `resources` - Read-only documents describing the service

pub mod resources;
pub mod spotify;
pub mod tools;
