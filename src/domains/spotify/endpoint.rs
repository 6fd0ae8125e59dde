//! Declarative endpoint descriptors.
//!
//! A [`ToolDescriptor`] is everything the dispatcher needs to turn a tool
//! invocation into upstream HTTP calls: method, path template, parameter
//! placement and constraints, pagination class, batching rules and the shape
//! of the response. Descriptors are `'static` data; nothing here mutates
//! after the catalog is built.

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::transform::{EntityKind, FormatTier};

/// HTTP method of an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Get)
    }
}

/// Tool grouping, as advertised to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SearchDiscovery,
    LibraryManagement,
    PlaylistManagement,
    PlaybackControl,
    MusicAnalysis,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::SearchDiscovery,
        Category::LibraryManagement,
        Category::PlaylistManagement,
        Category::PlaybackControl,
        Category::MusicAnalysis,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::SearchDiscovery => "search_discovery",
            Self::LibraryManagement => "library_management",
            Self::PlaylistManagement => "playlist_management",
            Self::PlaybackControl => "playback_control",
            Self::MusicAnalysis => "music_analysis",
        }
    }
}

/// How a tool pages through upstream collections.
///
/// Paging is always caller-driven: the dispatcher issues exactly one call
/// with the caller's `limit`/`offset` (or cursor) and never follows `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    None,
    /// Implies `limit` and `offset` parameters.
    OffsetLimit { default_limit: u32, max_limit: u32 },
    /// Implies a `limit` parameter; cursor parameters are declared explicitly.
    Cursor { default_limit: u32, max_limit: u32 },
}

impl Pagination {
    pub fn limits(self) -> Option<(u32, u32)> {
        match self {
            Self::None => None,
            Self::OffsetLimit {
                default_limit,
                max_limit,
            }
            | Self::Cursor {
                default_limit,
                max_limit,
            } => Some((default_limit, max_limit)),
        }
    }
}

/// Type and value constraints of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Int { min: Option<i64>, max: Option<i64> },
    Bool,
    /// One of a fixed set of lowercase values (matched case-insensitively).
    Enum(&'static [&'static str]),
    /// A list of values from a fixed set; array or comma-separated string.
    EnumList(&'static [&'static str]),
    /// A list of IDs or URIs; array or comma-separated string.
    IdList { max: Option<usize> },
}

/// Where a validated parameter ends up in the upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    /// Substituted into `{name}` in the path template.
    Path,
    /// Sent as a query-string parameter under the given upstream name.
    Query(&'static str),
    /// Sent as a top-level JSON body field under the given upstream name.
    Body(&'static str),
    /// Sent as `{outer: {inner: value}}` in the JSON body.
    BodyNested(&'static str, &'static str),
    /// Sent as a one-element JSON array under the given upstream name.
    BodyList(&'static str),
    /// Consumed by the batch splitter (see [`BatchSpec`]).
    Batch,
}

/// Static default applied when the caller omits a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Str(&'static str),
    Int(i64),
    Bool(bool),
}

impl ParamDefault {
    pub fn to_value(self) -> Value {
        match self {
            Self::Str(s) => Value::String(s.to_string()),
            Self::Int(i) => Value::from(i),
            Self::Bool(b) => Value::Bool(b),
        }
    }
}

/// One caller-facing parameter of a tool.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub location: ParamLocation,
    pub required: bool,
    pub default: Option<ParamDefault>,
}

impl ParamSpec {
    /// A required parameter.
    pub const fn required(
        name: &'static str,
        kind: ParamKind,
        location: ParamLocation,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            kind,
            location,
            required: true,
            default: None,
        }
    }

    /// An optional parameter without default.
    pub const fn optional(
        name: &'static str,
        kind: ParamKind,
        location: ParamLocation,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            kind,
            location,
            required: false,
            default: None,
        }
    }

    /// Attach a default used when the caller omits this parameter.
    pub const fn with_default(mut self, default: ParamDefault) -> Self {
        self.default = Some(default);
        self
    }

    fn json_schema(&self) -> Value {
        let mut schema = match self.kind {
            ParamKind::Str => json!({ "type": "string" }),
            ParamKind::Int { min, max } => {
                let mut s = json!({ "type": "integer" });
                if let Some(min) = min {
                    s["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    s["maximum"] = json!(max);
                }
                s
            }
            ParamKind::Bool => json!({ "type": "boolean" }),
            ParamKind::Enum(values) => json!({ "type": "string", "enum": values }),
            ParamKind::EnumList(values) => json!({
                "type": ["string", "array"],
                "items": { "type": "string", "enum": values },
            }),
            ParamKind::IdList { max } => {
                let mut s = json!({
                    "type": ["string", "array"],
                    "items": { "type": "string" },
                });
                if let Some(max) = max {
                    s["maxItems"] = json!(max);
                }
                s
            }
        };
        schema["description"] = json!(self.description);
        if let Some(default) = self.default {
            schema["default"] = default.to_value();
        }
        schema
    }
}

/// How a batched ID list is encoded into each upstream request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEncoding {
    /// `{"<key>": ["id", ...]}`
    Ids(&'static str),
    /// `{"tracks": [{"uri": "..."}, ...]}`
    TrackObjects,
}

/// Batching rules for mutation tools that accept ID lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSpec {
    /// The `ParamLocation::Batch` parameter holding the list.
    pub param: &'static str,
    pub encoding: BatchEncoding,
    /// Upstream per-request ID ceiling.
    pub ceiling: usize,
    /// Drop repeated IDs (first occurrence wins). For set-like collections.
    pub dedupe: bool,
    /// Optional insert-position parameter advanced by the size of each
    /// committed batch so input order is preserved.
    pub position_param: Option<&'static str>,
    /// Thread the `snapshot_id` returned by each batch into the next one.
    pub thread_snapshot: bool,
}

/// How the entity kind of page items is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindRule {
    Fixed(EntityKind),
    /// Chosen by a validated parameter holding a plural kind ("tracks").
    FromParam(&'static str),
}

/// Items that arrive wrapped, e.g. `{"added_at": ..., "track": {...}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wrapper {
    pub entity_key: &'static str,
    pub timestamp_key: &'static str,
}

/// The upstream response layout of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Search results: one page per requested type.
    Search,
    /// A paging object, optionally nested under `key`.
    Page {
        key: Option<&'static str>,
        kind: KindRule,
        wrapper: Option<Wrapper>,
    },
    /// A plain array under `key`.
    List { key: &'static str, kind: EntityKind },
    /// A single entity.
    Entity(EntityKind),
    /// A mutation acknowledgement.
    Ack { message: &'static str },
}

/// Immutable catalog record for one tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub method: HttpMethod,
    pub path: &'static str,
    pub params: &'static [ParamSpec],
    /// Query parameters sent on every call, e.g. `type=artist`.
    pub fixed_query: &'static [(&'static str, &'static str)],
    pub pagination: Pagination,
    pub batch: Option<BatchSpec>,
    /// Pairs of parameters that may not both be supplied.
    pub exclusive: &'static [(&'static str, &'static str)],
    /// At least one of these parameters must be supplied (empty = no rule).
    pub at_least_one: &'static [&'static str],
    pub response: ResponseShape,
}

/// Placeholder resolved from the validated identity rather than the caller.
pub const CURRENT_USER: &str = "current_user";

/// Parameter forwarding the upstream `fields` filter. Responses shaped
/// under it may lack any key.
pub const FIELD_FILTER: &str = "fields";

impl ToolDescriptor {
    /// Whether the tool accepts a `format` fidelity tier.
    pub fn accepts_format(&self) -> bool {
        !matches!(self.response, ResponseShape::Ack { .. })
    }

    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON Schema of the tool input, generated from the parameter table.
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in self.params {
            properties.insert(param.name.to_string(), param.json_schema());
            if param.required {
                required.push(Value::String(param.name.to_string()));
            }
        }

        if let Some((default_limit, max_limit)) = self.pagination.limits() {
            properties.insert(
                "limit".to_string(),
                json!({
                    "type": "integer",
                    "description": format!(
                        "Maximum number of items to return (values above {max_limit} are clamped)"
                    ),
                    "default": default_limit,
                }),
            );
        }
        if matches!(self.pagination, Pagination::OffsetLimit { .. }) {
            properties.insert(
                "offset".to_string(),
                json!({
                    "type": "integer",
                    "minimum": 0,
                    "description": "Index of the first item to return",
                    "default": 0,
                }),
            );
        }
        if self.accepts_format() {
            properties.insert("format".to_string(), FormatTier::json_schema());
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema.insert("additionalProperties".to_string(), json!(false));
        schema
    }
}
