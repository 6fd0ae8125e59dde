//! Bearer credential validation.
//!
//! Every tool call presents a credential which is checked against the
//! upstream identity endpoint before anything else reaches the network.
//! The outcome is never cached, so a token revoked between two calls is
//! rejected on the second one.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domains::tools::ToolError;

/// An opaque bearer token. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token. Blank tokens are rejected.
    pub fn new(token: impl Into<String>) -> Result<Self, ToolError> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Err(ToolError::unauthorized(None, "empty bearer token"));
        }
        Ok(Self(token.to_string()))
    }

    /// Parse an `Authorization: Bearer <token>` header value.
    pub fn from_authorization_header(header: Option<&str>) -> Result<Self, ToolError> {
        let header = header.ok_or_else(|| {
            ToolError::unauthorized(None, "missing Authorization header (expected 'Bearer <token>')")
        })?;
        let (scheme, token) = header.trim().split_once(' ').ok_or_else(|| {
            ToolError::unauthorized(None, "malformed Authorization header (expected 'Bearer <token>')")
        })?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(ToolError::unauthorized(
                None,
                format!("unsupported authorization scheme '{scheme}'"),
            ));
        }
        Self::new(token)
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// The value of the upstream `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// The account a credential belongs to, as reported by the identity endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserIdentity {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub product: Option<String>,
    pub followers: Option<u64>,
}

impl UserIdentity {
    fn from_upstream(body: &Value) -> Option<Self> {
        let user_id = body.get("id")?.as_str()?.to_string();
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            user_id,
            display_name: text("display_name"),
            email: text("email"),
            country: text("country"),
            product: text("product"),
            followers: body
                .get("followers")
                .and_then(|f| f.get("total"))
                .and_then(Value::as_u64),
        })
    }
}

/// Resolves a credential to the identity it belongs to.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, credential: &Credential) -> Result<UserIdentity, ToolError>;
}

/// Validator backed by the upstream `GET /me` endpoint.
#[derive(Debug, Clone)]
pub struct SpotifyTokenValidator {
    client: reqwest::Client,
    endpoint: String,
}

impl SpotifyTokenValidator {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TokenValidator for SpotifyTokenValidator {
    async fn validate(&self, credential: &Credential) -> Result<UserIdentity, ToolError> {
        debug!("Validating bearer credential against {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, credential.bearer_header())
            .send()
            .await
            .map_err(|e| {
                warn!("Identity endpoint unreachable: {}", e);
                ToolError::unauthorized(None, format!("token validation failed: {e}"))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ToolError::unauthorized(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            let reason = upstream_error_message(&text)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "token rejected".to_string());
            warn!("Bearer credential rejected ({}): {}", status.as_u16(), reason);
            return Err(ToolError::unauthorized(Some(status.as_u16()), reason));
        }

        let body: Value = serde_json::from_str(&text).map_err(|_| {
            ToolError::unauthorized(Some(status.as_u16()), "identity endpoint returned non-JSON body")
        })?;

        if let Some(reason) = body.get("error").map(|_| upstream_error_message(&text)) {
            return Err(ToolError::unauthorized(
                Some(status.as_u16()),
                reason.unwrap_or_else(|| "identity endpoint reported an error".to_string()),
            ));
        }

        UserIdentity::from_upstream(&body).ok_or_else(|| {
            ToolError::unauthorized(
                Some(status.as_u16()),
                "identity endpoint response carries no user id",
            )
        })
    }
}

/// Extract `error.message` (or a bare string `error`) from an upstream error body.
pub fn upstream_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .or_else(|| obj.get("error_description"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
