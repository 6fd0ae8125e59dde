//! Tool façade.
//!
//! Every tool call runs the same pipeline: catalog lookup, parameter
//! validation, credential validation, dispatch, shaping. Validation happens
//! before the credential check so a malformed call never reaches the
//! network. The credential is re-validated on every call.

use std::sync::Arc;

use rmcp::model::CallToolResult;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::core::config::ApiConfig;
use crate::domains::spotify::dispatcher::{DispatchOutcome, JsonObject, RequestDispatcher, ValidatedParams};
use crate::domains::spotify::endpoint::{FIELD_FILTER, KindRule, ResponseShape, ToolDescriptor};
use crate::domains::spotify::transform::{self, EntityKind, FormatTier, Layout, NormalizedResult};
use crate::domains::spotify::{Credential, SpotifyTokenValidator, TokenValidator};

use super::ToolError;
use super::catalog::EndpointCatalog;
use super::definitions::MutationAck;
use super::definitions::common::error_result;

/// Entry point for every tool invocation, whatever the transport.
pub struct SpotifyToolFacade {
    catalog: &'static EndpointCatalog,
    validator: Arc<dyn TokenValidator>,
    dispatcher: RequestDispatcher,
}

impl std::fmt::Debug for SpotifyToolFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyToolFacade")
            .field("tools", &self.catalog.len())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl SpotifyToolFacade {
    /// Build the façade with one shared HTTP client for validation and dispatch.
    pub fn new(api: &ApiConfig) -> crate::core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(api.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let validator = Arc::new(SpotifyTokenValidator::new(
            client.clone(),
            api.identity_endpoint(),
        ));
        let dispatcher = RequestDispatcher::new(client, &api.base_url)?;
        Ok(Self::with_parts(validator, dispatcher))
    }

    pub fn with_parts(validator: Arc<dyn TokenValidator>, dispatcher: RequestDispatcher) -> Self {
        Self {
            catalog: EndpointCatalog::global(),
            validator,
            dispatcher,
        }
    }

    pub fn catalog(&self) -> &'static EndpointCatalog {
        self.catalog
    }

    /// Run a tool call and return its shaped result or typed error.
    #[instrument(skip(self, args, credential), fields(tool = %name))]
    pub async fn invoke(
        &self,
        name: &str,
        mut args: JsonObject,
        credential: Option<&Credential>,
    ) -> Result<NormalizedResult, ToolError> {
        let descriptor = self.catalog.lookup(name)?;
        let tier = take_format(descriptor, &mut args)?;
        let params = RequestDispatcher::validate(descriptor, &args)?;

        let credential = credential
            .ok_or_else(|| ToolError::unauthorized(None, "no bearer credential supplied"))?;
        let identity = self.validator.validate(credential).await?;
        debug!(user = %identity.user_id, "Credential validated");

        let outcome = self
            .dispatcher
            .dispatch(descriptor, &params, credential, &identity)
            .await?;

        shape(descriptor, &params, outcome, tier)
    }

    /// Run a tool call and render the outcome as an MCP tool result.
    pub async fn call_tool(
        &self,
        name: &str,
        args: JsonObject,
        credential: Option<&Credential>,
    ) -> CallToolResult {
        info!("Tool call: {}", name);
        match self.invoke(name, args, credential).await {
            Ok(result) => result.into_call_result(),
            Err(err) => error_result(&err),
        }
    }
}

fn take_format(descriptor: &ToolDescriptor, args: &mut JsonObject) -> Result<FormatTier, ToolError> {
    match args.remove("format") {
        None | Some(Value::Null) => Ok(FormatTier::default()),
        Some(_) if !descriptor.accepts_format() => Err(ToolError::validation(
            "format",
            format!("unknown parameter for tool '{}'", descriptor.name),
        )),
        Some(Value::String(s)) => s.parse(),
        Some(_) => Err(ToolError::validation("format", "must be a string")),
    }
}

fn shape(
    descriptor: &ToolDescriptor,
    params: &ValidatedParams,
    outcome: DispatchOutcome,
    tier: FormatTier,
) -> Result<NormalizedResult, ToolError> {
    let layout = match descriptor.response {
        ResponseShape::Ack { message } => {
            return acknowledge(descriptor, params, outcome, message).map(NormalizedResult::Shaped);
        }
        ResponseShape::Search => Layout::Search,
        ResponseShape::Entity(kind) => Layout::Entity(kind),
        ResponseShape::List { key, kind } => Layout::List { key, kind },
        ResponseShape::Page { key, kind, wrapper } => Layout::Page {
            key,
            kind: resolve_kind(kind, params)?,
            wrapper,
        },
    };
    if params.get(FIELD_FILTER).is_some() {
        transform::transform_filtered(&outcome.response.body, layout, tier)
    } else {
        transform::transform_layout(&outcome.response.body, layout, tier)
    }
}

fn resolve_kind(rule: KindRule, params: &ValidatedParams) -> Result<EntityKind, ToolError> {
    match rule {
        KindRule::Fixed(kind) => Ok(kind),
        KindRule::FromParam(name) => params
            .str(name)
            .and_then(EntityKind::from_plural)
            .ok_or_else(|| ToolError::validation(name, "does not name an item kind")),
    }
}

fn acknowledge(
    descriptor: &ToolDescriptor,
    params: &ValidatedParams,
    outcome: DispatchOutcome,
    message: &str,
) -> Result<Value, ToolError> {
    let batch_param = descriptor.batch.map(|b| b.param);
    let details = match params.to_json() {
        Value::Object(mut map) => {
            if let Some(param) = batch_param {
                map.remove(param);
            }
            map
        }
        _ => JsonObject::new(),
    };

    let ack = MutationAck {
        success: true,
        message: message.to_string(),
        batches: batch_param.map(|_| outcome.batches),
        snapshot_id: outcome.snapshot_id,
        details,
    };
    serde_json::to_value(ack).map_err(|e| ToolError::internal(e.to_string()))
}
