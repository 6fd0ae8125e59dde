//! Upstream Web API plumbing.
//!
//! - [`auth`]: bearer credentials and per-call identity validation
//! - [`endpoint`]: declarative descriptors for catalog entries
//! - [`dispatcher`]: parameter validation, pagination, batching, status mapping
//! - [`transform`]: fidelity-tier projections of upstream payloads

pub mod auth;
pub mod dispatcher;
pub mod endpoint;
pub mod transform;

#[cfg(test)]
pub(crate) mod mock;

pub use auth::{Credential, SpotifyTokenValidator, TokenValidator, UserIdentity};
pub use dispatcher::{DispatchOutcome, JsonObject, RequestDispatcher, ValidatedParams};
pub use endpoint::{Category, ToolDescriptor};
pub use transform::{EntityKind, FormatTier, NormalizedResult};
