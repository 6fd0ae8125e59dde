//! Common utilities shared across tool definitions.
//!
//! Shared parameter specs, pagination presets, the mutation acknowledgement
//! payload and result helpers.

use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::domains::spotify::endpoint::{Pagination, ParamDefault, ParamKind, ParamLocation, ParamSpec};
use crate::domains::tools::{BatchReport, ToolError};

/// Default page size for offset/limit and cursor collections.
pub const DEFAULT_LIMIT: u32 = 20;

/// Upstream page-size cap for most collections.
pub const MAX_LIMIT: u32 = 50;

/// Offset/limit paging with the common defaults.
pub const PAGED: Pagination = Pagination::OffsetLimit {
    default_limit: DEFAULT_LIMIT,
    max_limit: MAX_LIMIT,
};

/// Cursor paging with the common defaults.
pub const CURSOR: Pagination = Pagination::Cursor {
    default_limit: DEFAULT_LIMIT,
    max_limit: MAX_LIMIT,
};

pub const MARKET: ParamSpec = ParamSpec::optional(
    "market",
    ParamKind::Str,
    ParamLocation::Query("market"),
    "ISO 3166-1 alpha-2 market code, e.g. 'US'",
);

pub const MARKET_US: ParamSpec = MARKET.with_default(ParamDefault::Str("US"));

pub const COUNTRY: ParamSpec = ParamSpec::optional(
    "country",
    ParamKind::Str,
    ParamLocation::Query("country"),
    "ISO 3166-1 alpha-2 country code",
);

pub const ADDITIONAL_TYPES: ParamSpec = ParamSpec::optional(
    "additional_types",
    ParamKind::EnumList(&["track", "episode"]),
    ParamLocation::Query("additional_types"),
    "Item types to include besides tracks: 'track', 'episode'",
);

pub const DEVICE_ID: ParamSpec = ParamSpec::optional(
    "device_id",
    ParamKind::Str,
    ParamLocation::Query("device_id"),
    "Target device ID (defaults to the active device)",
);

pub const PLAYLIST_ID: ParamSpec = ParamSpec::required(
    "playlist_id",
    ParamKind::Str,
    ParamLocation::Path,
    "Playlist ID",
);

/// Acknowledgement returned by mutation tools.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MutationAck {
    pub success: bool,
    pub message: String,
    /// Committed batches, in submission order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batches: Option<Vec<BatchReport>>,
    /// Playlist snapshot after the last committed batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    /// Echo of the validated request parameters.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Create an error result carrying the structured error payload.
pub fn error_result(error: &ToolError) -> CallToolResult {
    warn!("{}", error);
    let mut result = CallToolResult::structured_error(error.to_payload());
    result.content = vec![Content::text(error.to_string())];
    result
}
