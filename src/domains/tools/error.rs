//! Tool-specific error types.
//!
//! Every failure a tool call can produce is one of these variants, and each
//! carries enough structure for the caller to act on it (which parameter,
//! which batch, how long to wait). Nothing is folded into a generic failure.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// One sub-batch of a multi-call mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct BatchReport {
    /// Zero-based position of the batch in submission order.
    pub index: usize,
    /// The IDs (or URIs) carried by this batch, in input order.
    pub ids: Vec<String>,
}

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Missing, revoked, expired, or otherwise rejected bearer credential.
    #[error("Unauthorized: {reason}")]
    Unauthorized {
        /// Upstream status code, when the upstream answered at all.
        status: Option<u16>,
        reason: String,
    },

    /// A caller-supplied parameter violates the catalog contract.
    #[error("Invalid parameter '{param}': {message}")]
    Validation { param: String, message: String },

    /// The requested tool is not in the catalog.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Upstream answered 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream answered 429. `retry_after` is the upstream header, verbatim.
    #[error("Rate limited by upstream (retry after: {})", .retry_after.as_deref().unwrap_or("unspecified"))]
    RateLimited { retry_after: Option<String> },

    /// Upstream answered 5xx, could not be reached, or timed out.
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        status: Option<u16>,
        timed_out: bool,
        message: String,
    },

    /// Upstream rejected the request with a 4xx status not covered above.
    #[error("Upstream rejected request ({status}): {message}")]
    UpstreamRejected { status: u16, message: String },

    /// A multi-batch mutation committed some batches before one failed.
    #[error(
        "Partial failure: {} batch(es) committed, batch {} failed: {}",
        .committed.len(),
        .failed.index,
        .cause
    )]
    PartialFailure {
        committed: Vec<BatchReport>,
        failed: BatchReport,
        not_attempted: Vec<BatchReport>,
        cause: Box<ToolError>,
    },

    /// The upstream payload did not have the shape the transformer expects.
    #[error("Malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "unauthorized" error.
    pub fn unauthorized(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            status,
            reason: reason.into(),
        }
    }

    /// Create a new "validation" error naming the offending parameter.
    pub fn validation(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a new "unknown tool" error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    /// Create a new "malformed upstream response" error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedUpstreamResponse(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::Validation { .. } => "validation_error",
            Self::UnknownTool(_) => "unknown_tool",
            Self::NotFound(_) => "not_found",
            Self::RateLimited { .. } => "rate_limited",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::PartialFailure { .. } => "partial_failure",
            Self::MalformedUpstreamResponse(_) => "malformed_upstream_response",
            Self::Internal(_) => "internal",
        }
    }

    /// Structured payload returned to MCP clients alongside the message.
    pub fn to_payload(&self) -> Value {
        let mut detail = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });

        let extra = match self {
            Self::Unauthorized { status, .. } => json!({ "status": status }),
            Self::Validation { param, .. } => json!({ "param": param }),
            Self::UnknownTool(name) => json!({ "tool": name }),
            Self::RateLimited { retry_after } => json!({ "retry_after": retry_after }),
            Self::UpstreamUnavailable {
                status, timed_out, ..
            } => json!({ "status": status, "timed_out": timed_out }),
            Self::UpstreamRejected { status, .. } => json!({ "status": status }),
            Self::PartialFailure {
                committed,
                failed,
                not_attempted,
                cause,
            } => json!({
                "committed": committed,
                "failed": failed,
                "not_attempted": not_attempted,
                "cause": cause.to_payload()["error"].clone(),
            }),
            _ => Value::Null,
        };

        if let (Some(detail), Value::Object(extra)) = (detail.as_object_mut(), extra) {
            detail.extend(extra);
        }

        json!({ "error": detail })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_payload_names_param() {
        let err = ToolError::validation("query", "missing required parameter");
        let payload = err.to_payload();
        assert_eq!(payload["error"]["kind"], "validation_error");
        assert_eq!(payload["error"]["param"], "query");
    }

    #[test]
    fn test_rate_limited_carries_retry_after_verbatim() {
        let err = ToolError::RateLimited {
            retry_after: Some("17".to_string()),
        };
        assert_eq!(err.to_payload()["error"]["retry_after"], "17");
        assert!(err.to_string().contains("17"));
    }

    #[test]
    fn test_partial_failure_payload_lists_batches() {
        let err = ToolError::PartialFailure {
            committed: vec![BatchReport {
                index: 0,
                ids: vec!["a".into()],
            }],
            failed: BatchReport {
                index: 1,
                ids: vec!["b".into()],
            },
            not_attempted: vec![BatchReport {
                index: 2,
                ids: vec!["c".into()],
            }],
            cause: Box::new(ToolError::UpstreamUnavailable {
                status: Some(502),
                timed_out: false,
                message: "bad gateway".into(),
            }),
        };
        let payload = err.to_payload();
        assert_eq!(payload["error"]["committed"][0]["index"], 0);
        assert_eq!(payload["error"]["failed"]["index"], 1);
        assert_eq!(payload["error"]["not_attempted"][0]["ids"][0], "c");
        assert_eq!(payload["error"]["cause"]["kind"], "upstream_unavailable");
    }
}
