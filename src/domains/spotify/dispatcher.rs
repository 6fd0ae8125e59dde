//! Request dispatcher.
//!
//! Turns a validated tool invocation into one or more upstream HTTP calls
//! and maps upstream failures onto [`ToolError`]. Parameter validation is a
//! pure step that completes before anything touches the network; the only
//! way to obtain [`ValidatedParams`] is through [`RequestDispatcher::validate`].

use std::collections::BTreeMap;

use reqwest::Url;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, RETRY_AFTER};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::auth::{Credential, UserIdentity, upstream_error_message};
use super::endpoint::{
    BatchEncoding, BatchSpec, CURRENT_USER, HttpMethod, Pagination, ParamKind, ParamLocation,
    ParamSpec, ToolDescriptor,
};
use crate::domains::tools::{BatchReport, ToolError};

/// Tool arguments as received from MCP clients.
pub type JsonObject = Map<String, Value>;

/// Parameters that passed validation, with defaults applied and values
/// normalized (enums lowercased, lists split, limits clamped).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParams {
    values: BTreeMap<&'static str, Value>,
}

impl ValidatedParams {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Items of a list parameter, in input order.
    pub fn list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All validated values as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }
}

/// One fully resolved upstream HTTP call.
#[derive(Clone)]
pub struct UpstreamRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub body: Option<Value>,
    authorization: String,
}

impl std::fmt::Debug for UpstreamRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("body", &self.body)
            .field("authorization", &"[REDACTED]")
            .finish()
    }
}

/// A successful (2xx) upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

/// Result of a dispatched tool call.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The response of the last upstream call.
    pub response: UpstreamResponse,
    /// Committed batches, for batched mutations. Empty otherwise.
    pub batches: Vec<BatchReport>,
    /// Latest playlist snapshot reported by the upstream, if any.
    pub snapshot_id: Option<String>,
}

struct PlannedCall {
    request: UpstreamRequest,
    report: Option<BatchReport>,
}

/// Executes catalog calls against the upstream Web API.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    client: reqwest::Client,
    base_url: Url,
}

impl RequestDispatcher {
    pub fn new(client: reqwest::Client, base_url: &str) -> crate::core::Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            crate::core::Error::config(format!("invalid upstream base URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(crate::core::Error::config(format!(
                "upstream base URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Check caller arguments against the descriptor. Pure: no I/O.
    pub fn validate(
        descriptor: &ToolDescriptor,
        args: &JsonObject,
    ) -> Result<ValidatedParams, ToolError> {
        let paged = descriptor.pagination.limits();
        let offset_paged = matches!(descriptor.pagination, Pagination::OffsetLimit { .. });

        for key in args.keys() {
            let known = descriptor.param(key).is_some()
                || (key == "limit" && paged.is_some())
                || (key == "offset" && offset_paged);
            if !known {
                return Err(ToolError::validation(
                    key.as_str(),
                    format!("unknown parameter for tool '{}'", descriptor.name),
                ));
            }
        }

        let supplied = |name: &str| args.get(name).is_some_and(|v| !v.is_null());

        for &(a, b) in descriptor.exclusive {
            if supplied(a) && supplied(b) {
                return Err(ToolError::validation(
                    b,
                    format!("cannot be combined with '{a}'"),
                ));
            }
        }

        if !descriptor.at_least_one.is_empty()
            && !descriptor.at_least_one.iter().any(|&name| supplied(name))
        {
            return Err(ToolError::validation(
                descriptor.at_least_one[0],
                format!(
                    "at least one of {} is required",
                    descriptor.at_least_one.join(", ")
                ),
            ));
        }

        let mut values = BTreeMap::new();

        for spec in descriptor.params {
            match args.get(spec.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    values.insert(spec.name, coerce(spec, value)?);
                }
                None if spec.required => {
                    return Err(ToolError::validation(spec.name, "missing required parameter"));
                }
                None => {
                    if let Some(default) = spec.default {
                        values.insert(spec.name, default.to_value());
                    }
                }
            }
        }

        if let Some((default_limit, max_limit)) = paged {
            let limit = match args.get("limit").filter(|v| !v.is_null()) {
                Some(v) => v
                    .as_i64()
                    .ok_or_else(|| ToolError::validation("limit", "must be an integer"))?
                    .clamp(1, i64::from(max_limit)),
                None => i64::from(default_limit),
            };
            values.insert("limit", Value::from(limit));
        }

        if offset_paged {
            let offset = match args.get("offset").filter(|v| !v.is_null()) {
                Some(v) => v
                    .as_i64()
                    .ok_or_else(|| ToolError::validation("offset", "must be an integer"))?,
                None => 0,
            };
            if offset < 0 {
                return Err(ToolError::validation("offset", "must be >= 0"));
            }
            values.insert("offset", Value::from(offset));
        }

        Ok(ValidatedParams { values })
    }

    /// Execute a validated call.
    ///
    /// Batched mutations run sequentially in input order. When a batch fails
    /// after earlier ones committed, the error is a `PartialFailure` naming
    /// the committed, failed and never-attempted batches.
    pub async fn dispatch(
        &self,
        descriptor: &ToolDescriptor,
        params: &ValidatedParams,
        credential: &Credential,
        identity: &UserIdentity,
    ) -> Result<DispatchOutcome, ToolError> {
        let calls = self.plan(descriptor, params, credential, identity)?;
        let reports: Vec<BatchReport> = calls.iter().filter_map(|c| c.report.clone()).collect();
        let thread_snapshot = descriptor.batch.is_some_and(|b| b.thread_snapshot);

        let mut committed = Vec::new();
        let mut snapshot_id: Option<String> = None;
        let mut last = None;

        for (index, call) in calls.into_iter().enumerate() {
            let mut request = call.request;
            if thread_snapshot {
                if let (Some(snapshot), Some(Value::Object(body))) = (&snapshot_id, &mut request.body)
                {
                    body.insert("snapshot_id".to_string(), Value::String(snapshot.clone()));
                }
            }

            match self.send(&request).await {
                Ok(response) => {
                    if let Some(id) = snapshot_of(&response.body) {
                        snapshot_id = Some(id);
                    }
                    if let Some(report) = call.report {
                        committed.push(report);
                    }
                    last = Some(response);
                }
                Err(cause) => {
                    let Some(failed) = call.report else {
                        return Err(cause);
                    };
                    if committed.is_empty() {
                        return Err(cause);
                    }
                    warn!(
                        "{}: batch {} failed after {} committed batch(es): {}",
                        descriptor.name,
                        failed.index,
                        committed.len(),
                        cause
                    );
                    return Err(ToolError::PartialFailure {
                        committed,
                        failed,
                        not_attempted: reports[index + 1..].to_vec(),
                        cause: Box::new(cause),
                    });
                }
            }
        }

        let response = last.ok_or_else(|| ToolError::internal("no upstream call was planned"))?;
        if !committed.is_empty() {
            info!("{}: committed {} batch(es)", descriptor.name, committed.len());
        }

        Ok(DispatchOutcome {
            response,
            batches: committed,
            snapshot_id,
        })
    }

    fn plan(
        &self,
        descriptor: &ToolDescriptor,
        params: &ValidatedParams,
        credential: &Credential,
        identity: &UserIdentity,
    ) -> Result<Vec<PlannedCall>, ToolError> {
        let url = self.resolve_url(descriptor, params, identity)?;
        let body = build_body(descriptor, params);
        let authorization = credential.bearer_header();

        let Some(batch) = descriptor.batch else {
            return Ok(vec![PlannedCall {
                request: UpstreamRequest {
                    method: descriptor.method,
                    url,
                    body,
                    authorization,
                },
                report: None,
            }]);
        };

        let ids = batch_ids(&batch, params);
        let base_position = batch
            .position_param
            .and_then(|p| params.get(p))
            .and_then(Value::as_i64);

        let mut calls = Vec::new();
        let mut sent = 0usize;
        for (index, chunk) in ids.chunks(batch.ceiling.max(1)).enumerate() {
            let mut chunk_body = match &body {
                Some(Value::Object(map)) => map.clone(),
                _ => Map::new(),
            };
            encode_batch(&batch, chunk, &mut chunk_body);
            if let (Some(param), Some(base)) = (batch.position_param, base_position) {
                chunk_body.insert(param.to_string(), Value::from(base + sent as i64));
            }
            sent += chunk.len();

            calls.push(PlannedCall {
                request: UpstreamRequest {
                    method: descriptor.method,
                    url: url.clone(),
                    body: Some(Value::Object(chunk_body)),
                    authorization: authorization.clone(),
                },
                report: Some(BatchReport {
                    index,
                    ids: chunk.to_vec(),
                }),
            });
        }

        Ok(calls)
    }

    fn resolve_url(
        &self,
        descriptor: &ToolDescriptor,
        params: &ValidatedParams,
        identity: &UserIdentity,
    ) -> Result<Url, ToolError> {
        let mut segments = Vec::new();
        for segment in descriptor.path.split('/').filter(|s| !s.is_empty()) {
            let resolved = match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(CURRENT_USER) => identity.user_id.clone(),
                Some(name) => params
                    .str(name)
                    .map(str::to_string)
                    .ok_or_else(|| ToolError::validation(name, "missing path parameter"))?,
                None => segment.to_string(),
            };
            segments.push(resolved);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ToolError::internal("upstream base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(&segments);

        let mut query: Vec<(String, String)> = descriptor
            .fixed_query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        for spec in descriptor.params {
            if let ParamLocation::Query(upstream) = spec.location {
                if let Some(value) = params.get(spec.name) {
                    query.push((upstream.to_string(), query_value(value)));
                }
            }
        }
        for key in ["limit", "offset"] {
            if let Some(value) = params.get(key) {
                query.push((key.to_string(), query_value(value)));
            }
        }

        if !query.is_empty() {
            let encoded = serde_urlencoded::to_string(&query)
                .map_err(|e| ToolError::internal(format!("query encoding failed: {e}")))?;
            url.set_query(Some(&encoded));
        }

        Ok(url)
    }

    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, ToolError> {
        debug!(
            method = ?request.method,
            path = request.url.path(),
            "Dispatching upstream request"
        );

        let mut builder = self
            .client
            .request(request.method.as_reqwest(), request.url.clone())
            .header(AUTHORIZATION, &request.authorization);
        match &request.body {
            Some(body) => builder = builder.json(body),
            // Bodiless writes still need an explicit length or the upstream answers 411.
            None if !request.method.is_read_only() => {
                builder = builder.header(CONTENT_LENGTH, "0");
            }
            None => {}
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(transport_error)?;

        if (200..300).contains(&status) {
            debug!(status, bytes = body.len(), "Upstream request succeeded");
            Ok(UpstreamResponse { status, body })
        } else {
            let err = map_status(status, retry_after, &body);
            warn!(status, "Upstream request failed: {}", err);
            Err(err)
        }
    }
}

/// Map a non-2xx upstream status onto the error taxonomy.
pub fn map_status(status: u16, retry_after: Option<String>, body: &str) -> ToolError {
    let message = upstream_error_message(body).unwrap_or_else(|| {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {status}"))
    });

    match status {
        401 | 403 => ToolError::Unauthorized {
            status: Some(status),
            reason: message,
        },
        404 => ToolError::NotFound(message),
        429 => ToolError::RateLimited { retry_after },
        500..=599 => ToolError::UpstreamUnavailable {
            status: Some(status),
            timed_out: false,
            message,
        },
        _ => ToolError::UpstreamRejected { status, message },
    }
}

fn transport_error(err: reqwest::Error) -> ToolError {
    ToolError::UpstreamUnavailable {
        status: err.status().map(|s| s.as_u16()),
        timed_out: err.is_timeout(),
        message: err.to_string(),
    }
}

fn coerce(spec: &ParamSpec, value: &Value) -> Result<Value, ToolError> {
    let name = spec.name;
    match spec.kind {
        ParamKind::Str => {
            let s = value
                .as_str()
                .ok_or_else(|| ToolError::validation(name, "must be a string"))?;
            if spec.required && s.trim().is_empty() {
                return Err(ToolError::validation(name, "must not be empty"));
            }
            Ok(Value::String(s.to_string()))
        }
        ParamKind::Int { min, max } => {
            let n = value
                .as_i64()
                .ok_or_else(|| ToolError::validation(name, "must be an integer"))?;
            if let Some(min) = min.filter(|min| n < *min) {
                return Err(ToolError::validation(name, format!("must be >= {min}")));
            }
            if let Some(max) = max.filter(|max| n > *max) {
                return Err(ToolError::validation(name, format!("must be <= {max}")));
            }
            Ok(Value::from(n))
        }
        ParamKind::Bool => value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| ToolError::validation(name, "must be a boolean")),
        ParamKind::Enum(allowed) => {
            let s = value
                .as_str()
                .ok_or_else(|| ToolError::validation(name, "must be a string"))?;
            Ok(Value::String(one_of(name, s, allowed)?))
        }
        ParamKind::EnumList(allowed) => {
            let mut out: Vec<Value> = Vec::new();
            for item in parse_list(name, value)? {
                let item = Value::String(one_of(name, &item, allowed)?);
                if !out.contains(&item) {
                    out.push(item);
                }
            }
            Ok(Value::Array(out))
        }
        ParamKind::IdList { max } => {
            let items = parse_list(name, value)?;
            if let Some(max) = max.filter(|max| items.len() > *max) {
                return Err(ToolError::validation(
                    name,
                    format!("at most {max} IDs per call, got {}", items.len()),
                ));
            }
            Ok(Value::Array(items.into_iter().map(Value::String).collect()))
        }
    }
}

fn one_of(name: &str, value: &str, allowed: &[&str]) -> Result<String, ToolError> {
    let lowered = value.trim().to_lowercase();
    if allowed.contains(&lowered.as_str()) {
        Ok(lowered)
    } else {
        Err(ToolError::validation(
            name,
            format!("'{value}' is not one of {}", allowed.join(", ")),
        ))
    }
}

/// Accept a JSON array of strings or a comma-separated string.
fn parse_list(name: &str, value: &Value) -> Result<Vec<String>, ToolError> {
    let items: Vec<String> = match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ToolError::validation(name, "list entries must be non-empty strings"))
            })
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(ToolError::validation(
                name,
                "must be an array of strings or a comma-separated string",
            ));
        }
    };

    if items.is_empty() {
        return Err(ToolError::validation(name, "must contain at least one entry"));
    }
    Ok(items)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(query_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn build_body(descriptor: &ToolDescriptor, params: &ValidatedParams) -> Option<Value> {
    let mut body = Map::new();
    for spec in descriptor.params {
        let Some(value) = params.get(spec.name) else {
            continue;
        };
        match spec.location {
            ParamLocation::Body(key) => {
                body.insert(key.to_string(), value.clone());
            }
            ParamLocation::BodyNested(outer, inner) => {
                if let Value::Object(nested) = body
                    .entry(outer.to_string())
                    .or_insert_with(|| Value::Object(Map::new()))
                {
                    nested.insert(inner.to_string(), value.clone());
                }
            }
            ParamLocation::BodyList(key) => {
                body.insert(key.to_string(), Value::Array(vec![value.clone()]));
            }
            ParamLocation::Path | ParamLocation::Query(_) | ParamLocation::Batch => {}
        }
    }

    if body.is_empty() && descriptor.batch.is_none() {
        None
    } else {
        Some(Value::Object(body))
    }
}

fn batch_ids(batch: &BatchSpec, params: &ValidatedParams) -> Vec<String> {
    let ids = params.list(batch.param);
    if !batch.dedupe {
        return ids;
    }
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

fn encode_batch(batch: &BatchSpec, chunk: &[String], body: &mut Map<String, Value>) {
    match batch.encoding {
        BatchEncoding::Ids(key) => {
            body.insert(
                key.to_string(),
                Value::Array(chunk.iter().cloned().map(Value::String).collect()),
            );
        }
        BatchEncoding::TrackObjects => {
            let tracks = chunk
                .iter()
                .map(|uri| serde_json::json!({ "uri": uri }))
                .collect();
            body.insert("tracks".to_string(), Value::Array(tracks));
        }
    }
}

fn snapshot_of(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("snapshot_id")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::spotify::endpoint::{Category, ParamDefault, ResponseShape};
    use crate::domains::spotify::mock::{MockResponse, MockUpstream, RecordedRequest};
    use crate::domains::spotify::transform::EntityKind;
    use crate::domains::tools::EndpointCatalog;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const SEARCH_PARAMS: &[ParamSpec] = &[
        ParamSpec::required("query", ParamKind::Str, ParamLocation::Query("q"), "query"),
        ParamSpec::required(
            "type",
            ParamKind::EnumList(&["track", "artist", "album"]),
            ParamLocation::Query("type"),
            "types",
        ),
        ParamSpec::optional("market", ParamKind::Str, ParamLocation::Query("market"), "market")
            .with_default(ParamDefault::Str("US")),
    ];

    const SEARCH: ToolDescriptor = ToolDescriptor {
        name: "test_search",
        category: Category::SearchDiscovery,
        description: "test descriptor",
        method: HttpMethod::Get,
        path: "/search",
        params: SEARCH_PARAMS,
        fixed_query: &[],
        pagination: Pagination::OffsetLimit {
            default_limit: 20,
            max_limit: 50,
        },
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Search,
    };

    const SAVE: ToolDescriptor = ToolDescriptor {
        name: "test_save",
        category: Category::LibraryManagement,
        description: "test descriptor",
        method: HttpMethod::Put,
        path: "/me/tracks",
        params: &[ParamSpec::required(
            "track_ids",
            ParamKind::IdList { max: None },
            ParamLocation::Batch,
            "ids",
        )],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: Some(BatchSpec {
            param: "track_ids",
            encoding: BatchEncoding::Ids("ids"),
            ceiling: 50,
            dedupe: true,
            position_param: None,
            thread_snapshot: false,
        }),
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack { message: "saved" },
    };

    const ADD: ToolDescriptor = ToolDescriptor {
        name: "test_add",
        category: Category::PlaylistManagement,
        description: "test descriptor",
        method: HttpMethod::Post,
        path: "/playlists/{playlist_id}/tracks",
        params: &[
            ParamSpec::required("playlist_id", ParamKind::Str, ParamLocation::Path, "id"),
            ParamSpec::required(
                "track_uris",
                ParamKind::IdList { max: None },
                ParamLocation::Batch,
                "uris",
            ),
            ParamSpec::optional(
                "position",
                ParamKind::Int {
                    min: Some(0),
                    max: None,
                },
                ParamLocation::Body("position"),
                "position",
            ),
        ],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: Some(BatchSpec {
            param: "track_uris",
            encoding: BatchEncoding::Ids("uris"),
            ceiling: 100,
            dedupe: false,
            position_param: Some("position"),
            thread_snapshot: false,
        }),
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack { message: "added" },
    };

    const REMOVE: ToolDescriptor = ToolDescriptor {
        name: "test_remove",
        category: Category::PlaylistManagement,
        description: "test descriptor",
        method: HttpMethod::Delete,
        path: "/playlists/{playlist_id}/tracks",
        params: &[
            ParamSpec::required("playlist_id", ParamKind::Str, ParamLocation::Path, "id"),
            ParamSpec::required(
                "track_uris",
                ParamKind::IdList { max: None },
                ParamLocation::Batch,
                "uris",
            ),
        ],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: Some(BatchSpec {
            param: "track_uris",
            encoding: BatchEncoding::TrackObjects,
            ceiling: 100,
            dedupe: false,
            position_param: None,
            thread_snapshot: true,
        }),
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack { message: "removed" },
    };

    const CREATE: ToolDescriptor = ToolDescriptor {
        name: "test_create",
        category: Category::PlaylistManagement,
        description: "test descriptor",
        method: HttpMethod::Post,
        path: "/users/{current_user}/playlists",
        params: &[ParamSpec::required("name", ParamKind::Str, ParamLocation::Body("name"), "name")],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Entity(EntityKind::Playlist),
    };

    fn args(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    fn identity() -> UserIdentity {
        UserIdentity {
            user_id: "alice smith".to_string(),
            display_name: None,
            email: None,
            country: None,
            product: None,
            followers: None,
        }
    }

    fn dispatcher(mock: &MockUpstream) -> RequestDispatcher {
        RequestDispatcher::new(reqwest::Client::new(), &mock.base_url).unwrap()
    }

    fn credential() -> Credential {
        Credential::new("token").unwrap()
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("id{i:03}")).collect()
    }

    #[test]
    fn test_validate_missing_required() {
        let err = RequestDispatcher::validate(&SEARCH, &args(json!({"type": "track"}))).unwrap_err();
        assert!(matches!(err, ToolError::Validation { ref param, .. } if param == "query"));
    }

    #[test]
    fn test_validate_unknown_parameter() {
        let err = RequestDispatcher::validate(
            &SEARCH,
            &args(json!({"query": "x", "type": "track", "verbose": true})),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Validation { ref param, .. } if param == "verbose"));
    }

    #[test]
    fn test_validate_applies_defaults_and_clamps_limit() {
        let params = RequestDispatcher::validate(
            &SEARCH,
            &args(json!({"query": "Drake", "type": "Track,ARTIST", "limit": 500})),
        )
        .unwrap();
        assert_eq!(params.get("limit"), Some(&json!(50)));
        assert_eq!(params.get("offset"), Some(&json!(0)));
        assert_eq!(params.str("market"), Some("US"));
        assert_eq!(params.list("type"), vec!["track", "artist"]);

        let params = RequestDispatcher::validate(
            &SEARCH,
            &args(json!({"query": "Drake", "type": ["track"], "limit": 0})),
        )
        .unwrap();
        assert_eq!(params.get("limit"), Some(&json!(1)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_enum = args(json!({"query": "x", "type": "podcast"}));
        let err = RequestDispatcher::validate(&SEARCH, &bad_enum).unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let bad_offset = args(json!({"query": "x", "type": "track", "offset": -1}));
        let err = RequestDispatcher::validate(&SEARCH, &bad_offset).unwrap_err();
        assert!(matches!(err, ToolError::Validation { ref param, .. } if param == "offset"));

        let bad_type = args(json!({"query": 42, "type": "track"}));
        let err = RequestDispatcher::validate(&SEARCH, &bad_type).unwrap_err();
        assert!(matches!(err, ToolError::Validation { ref param, .. } if param == "query"));
    }

    #[test]
    fn test_map_status() {
        let body = r#"{"error":{"status":400,"message":"Bad search type"}}"#;
        match map_status(400, None, body) {
            ToolError::UpstreamRejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Bad search type");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(map_status(401, None, "").kind(), "unauthorized");
        assert_eq!(map_status(403, None, "").kind(), "unauthorized");
        assert_eq!(map_status(404, None, "").kind(), "not_found");
        assert_eq!(map_status(503, None, "").kind(), "upstream_unavailable");
        match map_status(429, Some("7".to_string()), "") {
            ToolError::RateLimited { retry_after } => assert_eq!(retry_after.as_deref(), Some("7")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_string_and_single_call() {
        let mock = MockUpstream::start(|_| MockResponse::json(200, json!({"tracks": {"items": []}}))).await;
        let params = RequestDispatcher::validate(
            &SEARCH,
            &args(json!({"query": "Drake & co", "type": "track", "limit": 10})),
        )
        .unwrap();

        let outcome = dispatcher(&mock)
            .dispatch(&SEARCH, &params, &credential(), &identity())
            .await
            .unwrap();
        assert_eq!(outcome.response.status, 200);
        assert!(outcome.batches.is_empty());

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/v1/search");
        assert_eq!(requests[0].query_param("q").as_deref(), Some("Drake & co"));
        assert_eq!(requests[0].query_param("type").as_deref(), Some("track"));
        assert_eq!(requests[0].query_param("limit").as_deref(), Some("10"));
        assert_eq!(requests[0].query_param("market").as_deref(), Some("US"));
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer token"));
    }

    #[tokio::test]
    async fn test_pages_do_not_overlap() {
        let mock = MockUpstream::start(|req| {
            let offset: usize = req.query_param("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
            let limit: usize = req.query_param("limit").and_then(|l| l.parse().ok()).unwrap_or(20);
            let items: Vec<_> = (offset..offset + limit).map(|i| json!({"n": i})).collect();
            MockResponse::json(200, json!({"items": items}))
        })
        .await;
        let dispatcher = dispatcher(&mock);

        let mut seen = Vec::new();
        for offset in [0, 5] {
            let params = RequestDispatcher::validate(
                &SEARCH,
                &args(json!({"query": "x", "type": "track", "limit": 5, "offset": offset})),
            )
            .unwrap();
            let outcome = dispatcher
                .dispatch(&SEARCH, &params, &credential(), &identity())
                .await
                .unwrap();
            let body: Value = serde_json::from_str(&outcome.response.body).unwrap();
            for item in body["items"].as_array().unwrap() {
                assert!(!seen.contains(item));
                seen.push(item.clone());
            }
        }
        assert_eq!(seen.len(), 10);
    }

    #[tokio::test]
    async fn test_path_resolves_current_user() {
        let mock = MockUpstream::start(|_| {
            MockResponse::json(201, json!({"id": "p1", "name": "Mix"}))
        })
        .await;
        let params = RequestDispatcher::validate(&CREATE, &args(json!({"name": "Mix"}))).unwrap();
        dispatcher(&mock)
            .dispatch(&CREATE, &params, &credential(), &identity())
            .await
            .unwrap();
        let request = &mock.requests()[0];
        assert_eq!(request.path, "/v1/users/alice%20smith/playlists");
        assert_eq!(request.json_body(), json!({"name": "Mix"}));
    }

    #[tokio::test]
    async fn test_save_deduplicates_and_is_idempotent() {
        let mock = MockUpstream::start(|_| MockResponse::empty(200)).await;
        let dispatcher = dispatcher(&mock);
        let params =
            RequestDispatcher::validate(&SAVE, &args(json!({"track_ids": "a, b, a"}))).unwrap();

        for _ in 0..2 {
            let outcome = dispatcher
                .dispatch(&SAVE, &params, &credential(), &identity())
                .await
                .unwrap();
            assert_eq!(outcome.batches.len(), 1);
            assert_eq!(outcome.batches[0].ids, vec!["a", "b"]);
        }
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].json_body(), requests[1].json_body());
        assert_eq!(requests[0].json_body(), json!({"ids": ["a", "b"]}));
    }

    #[tokio::test]
    async fn test_partial_failure_reports_batches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mock = MockUpstream::start(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                MockResponse::json(502, json!({"error": {"status": 502, "message": "Bad gateway"}}))
            } else {
                MockResponse::empty(200)
            }
        })
        .await;

        let all = ids(120);
        let params = RequestDispatcher::validate(&SAVE, &args(json!({"track_ids": all.clone()}))).unwrap();
        let err = dispatcher(&mock)
            .dispatch(&SAVE, &params, &credential(), &identity())
            .await
            .unwrap_err();

        match err {
            ToolError::PartialFailure {
                committed,
                failed,
                not_attempted,
                cause,
            } => {
                assert_eq!(committed.len(), 1);
                assert_eq!(committed[0].ids, all[..50].to_vec());
                assert_eq!(failed.index, 1);
                assert_eq!(failed.ids, all[50..100].to_vec());
                assert_eq!(not_attempted.len(), 1);
                assert_eq!(not_attempted[0].ids, all[100..].to_vec());
                assert_eq!(cause.kind(), "upstream_unavailable");
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_first_batch_failure_is_underlying_error() {
        let mock = MockUpstream::start(|_| MockResponse::empty(404)).await;
        let params = RequestDispatcher::validate(&SAVE, &args(json!({"track_ids": ids(60)}))).unwrap();
        let err = dispatcher(&mock)
            .dispatch(&SAVE, &params, &credential(), &identity())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_add_advances_position_in_order() {
        let mock = MockUpstream::start(|_| MockResponse::json(201, json!({"snapshot_id": "s"}))).await;
        let uris: Vec<String> = (0..150).map(|i| format!("spotify:track:{i}")).collect();
        let params = RequestDispatcher::validate(
            &ADD,
            &args(json!({"playlist_id": "pl1", "track_uris": uris, "position": 10})),
        )
        .unwrap();
        let outcome = dispatcher(&mock)
            .dispatch(&ADD, &params, &credential(), &identity())
            .await
            .unwrap();

        assert_eq!(outcome.batches.len(), 2);
        let bodies: Vec<Value> = mock.requests().iter().map(|r| r.json_body()).collect();
        assert_eq!(bodies[0]["position"], 10);
        assert_eq!(bodies[1]["position"], 110);
        assert_eq!(bodies[0]["uris"][0], "spotify:track:0");
        assert_eq!(bodies[1]["uris"][0], "spotify:track:100");
        assert_eq!(bodies[1]["uris"].as_array().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_remove_threads_snapshot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mock = MockUpstream::start(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            MockResponse::json(200, json!({"snapshot_id": format!("s{n}")}))
        })
        .await;
        let uris: Vec<String> = (0..150).map(|i| format!("spotify:track:{i}")).collect();
        let params = RequestDispatcher::validate(
            &REMOVE,
            &args(json!({"playlist_id": "pl1", "track_uris": uris})),
        )
        .unwrap();
        let outcome = dispatcher(&mock)
            .dispatch(&REMOVE, &params, &credential(), &identity())
            .await
            .unwrap();

        assert_eq!(outcome.snapshot_id.as_deref(), Some("s2"));
        let bodies: Vec<Value> = mock.requests().iter().map(|r| r.json_body()).collect();
        assert!(bodies[0].get("snapshot_id").is_none());
        assert_eq!(bodies[1]["snapshot_id"], "s1");
        assert_eq!(bodies[0]["tracks"][0], json!({"uri": "spotify:track:0"}));
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let mock =
            MockUpstream::start(|_| MockResponse::empty(429).with_header("retry-after", "17")).await;
        let params =
            RequestDispatcher::validate(&SEARCH, &args(json!({"query": "x", "type": "track"}))).unwrap();
        let err = dispatcher(&mock)
            .dispatch(&SEARCH, &params, &credential(), &identity())
            .await
            .unwrap_err();
        match err {
            ToolError::RateLimited { retry_after } => assert_eq!(retry_after.as_deref(), Some("17")),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_upstream_unavailable() {
        let mock = MockUpstream::start(|_| {
            MockResponse::json(200, json!({})).delayed(Duration::from_millis(500))
        })
        .await;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let dispatcher = RequestDispatcher::new(client, &mock.base_url).unwrap();
        let params =
            RequestDispatcher::validate(&SEARCH, &args(json!({"query": "x", "type": "track"}))).unwrap();
        let err = dispatcher
            .dispatch(&SEARCH, &params, &credential(), &identity())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::UpstreamUnavailable { timed_out: true, .. }
        ));
    }

    fn catalog(name: &str) -> &'static ToolDescriptor {
        EndpointCatalog::global().lookup(name).unwrap()
    }

    async fn dispatch_catalog(name: &str, call: Value) -> RecordedRequest {
        let mock = MockUpstream::start(|_| MockResponse::empty(204)).await;
        let descriptor = catalog(name);
        let params = RequestDispatcher::validate(descriptor, &args(call)).unwrap();
        dispatcher(&mock)
            .dispatch(descriptor, &params, &credential(), &identity())
            .await
            .unwrap();
        let mut requests = mock.requests();
        assert_eq!(requests.len(), 1);
        requests.remove(0)
    }

    #[tokio::test]
    async fn test_bodiless_commands_send_zero_length() {
        let pause = dispatch_catalog("pause_playback", json!({})).await;
        assert_eq!(pause.method, "PUT");
        assert_eq!(pause.path, "/v1/me/player/pause");
        assert_eq!(pause.content_length.as_deref(), Some("0"));
        assert!(pause.body.is_empty());

        let next = dispatch_catalog("skip_to_next", json!({"device_id": "d1"})).await;
        assert_eq!(next.method, "POST");
        assert_eq!(next.content_length.as_deref(), Some("0"));
        assert_eq!(next.query_param("device_id").as_deref(), Some("d1"));

        let unfollow = dispatch_catalog("unfollow_playlist", json!({"playlist_id": "pl1"})).await;
        assert_eq!(unfollow.method, "DELETE");
        assert_eq!(unfollow.content_length.as_deref(), Some("0"));
    }

    #[test]
    fn test_exclusive_parameters_are_rejected() {
        let cases = [
            ("get_recently_played", json!({"after": 1, "before": 2}), "before"),
            ("start_playback", json!({"context_uri": "spotify:album:a", "uris": ["spotify:track:t"]}), "uris"),
            ("start_playback", json!({"offset_position": 3, "offset_uri": "spotify:track:t"}), "offset_uri"),
        ];
        for (tool, call, rejected) in cases {
            let err = RequestDispatcher::validate(catalog(tool), &args(call)).unwrap_err();
            assert!(
                matches!(err, ToolError::Validation { ref param, .. } if param == rejected),
                "{tool}: {err:?}"
            );
        }

        // Either one alone is fine, and a null does not count as supplied.
        let ok = args(json!({"after": 1, "before": null}));
        assert!(RequestDispatcher::validate(catalog("get_recently_played"), &ok).is_ok());
    }

    #[test]
    fn test_update_details_needs_one_field() {
        let descriptor = catalog("update_playlist_details");
        let err = RequestDispatcher::validate(descriptor, &args(json!({"playlist_id": "pl1"})))
            .unwrap_err();
        match err {
            ToolError::Validation { param, message } => {
                assert_eq!(param, "name");
                assert!(message.contains("collaborative"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }

        let ok = args(json!({"playlist_id": "pl1", "public": false}));
        assert!(RequestDispatcher::validate(descriptor, &ok).is_ok());
    }

    #[tokio::test]
    async fn test_start_playback_nests_offset() {
        let request = dispatch_catalog(
            "start_playback",
            json!({
                "context_uri": "spotify:album:a1",
                "offset_position": 4,
                "position_ms": 1500,
                "device_id": "d1",
            }),
        )
        .await;
        assert_eq!(request.method, "PUT");
        assert_eq!(request.path, "/v1/me/player/play");
        assert_eq!(request.query_param("device_id").as_deref(), Some("d1"));
        assert_eq!(
            request.json_body(),
            json!({
                "context_uri": "spotify:album:a1",
                "offset": {"position": 4},
                "position_ms": 1500,
            })
        );
    }

    #[tokio::test]
    async fn test_transfer_playback_wraps_device() {
        let request = dispatch_catalog(
            "transfer_playback",
            json!({"device_id": "d2", "force_play": true}),
        )
        .await;
        assert_eq!(request.method, "PUT");
        assert_eq!(request.path, "/v1/me/player");
        assert_eq!(request.query, "");
        assert_eq!(request.json_body(), json!({"device_ids": ["d2"], "play": true}));
    }

    #[tokio::test]
    async fn test_settings_travel_in_query() {
        let volume = dispatch_catalog(
            "set_volume",
            json!({"volume_percent": 35, "device_id": "d1"}),
        )
        .await;
        assert_eq!(volume.path, "/v1/me/player/volume");
        assert_eq!(volume.query_param("volume_percent").as_deref(), Some("35"));
        assert_eq!(volume.query_param("device_id").as_deref(), Some("d1"));
        assert!(volume.body.is_empty());
        assert_eq!(volume.content_length.as_deref(), Some("0"));

        let seek = dispatch_catalog("seek_to_position", json!({"position_ms": 90000})).await;
        assert_eq!(seek.path, "/v1/me/player/seek");
        assert_eq!(seek.query_pairs(), vec![("position_ms".to_string(), "90000".to_string())]);
        assert!(seek.body.is_empty());
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        assert!(RequestDispatcher::new(reqwest::Client::new(), "not a url").is_err());
    }
}
