//! Response shaping.
//!
//! Upstream payloads are reduced to one of four fidelity tiers. RAW returns
//! the upstream body untouched; the other tiers are pure projections
//! driven by the per-kind tables in [`projections`]. Shaping never touches
//! the network and never fills in values the upstream did not send.

mod projections;

use std::fmt;
use std::str::FromStr;

use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::endpoint::Wrapper;
use crate::domains::tools::ToolError;

use projections::Checks;

pub use projections::{extract_year, format_duration, normalize_timestamp};

/// Fidelity tier requested by the caller.
///
/// Ordered by content: every key present at MINIMAL is present at COMPACT,
/// and every key present at COMPACT is present at FULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FormatTier {
    Raw,
    Full,
    #[default]
    Compact,
    Minimal,
}

impl FormatTier {
    pub const ALL: [FormatTier; 4] = [Self::Raw, Self::Full, Self::Compact, Self::Minimal];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Full => "full",
            Self::Compact => "compact",
            Self::Minimal => "minimal",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Raw => "Upstream response body, unmodified",
            Self::Full => "All upstream fields with normalized durations, years and timestamps",
            Self::Compact => "Essential fields per entity (default)",
            Self::Minimal => "Identifier and display name only",
        }
    }

    /// JSON Schema of the `format` tool parameter.
    pub fn json_schema() -> Value {
        let mut schema = Value::from(schemars::schema_for!(FormatTier));
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
            obj.insert(
                "description".to_string(),
                json!("Response fidelity: raw, full, compact (default) or minimal"),
            );
            obj.insert("default".to_string(), json!("compact"));
        }
        schema
    }
}

impl fmt::Display for FormatTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatTier {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ToolError::validation(
                    "format",
                    format!("'{s}' is not one of raw, full, compact, minimal"),
                )
            })
    }
}

/// Kind of upstream entity, selecting a projection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Track,
    Album,
    Artist,
    Playlist,
    PlaybackState,
    Device,
    Category,
    AudioFeatures,
    AudioAnalysis,
    Show,
    Episode,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Playlist => "playlist",
            Self::PlaybackState => "playback_state",
            Self::Device => "device",
            Self::Category => "category",
            Self::AudioFeatures => "audio_features",
            Self::AudioAnalysis => "audio_analysis",
            Self::Show => "show",
            Self::Episode => "episode",
        }
    }

    /// Map a plural collection name ("tracks", "artists") to its kind.
    pub fn from_plural(name: &str) -> Option<Self> {
        match name {
            "tracks" => Some(Self::Track),
            "albums" => Some(Self::Album),
            "artists" => Some(Self::Artist),
            "playlists" => Some(Self::Playlist),
            "shows" => Some(Self::Show),
            "episodes" => Some(Self::Episode),
            "categories" => Some(Self::Category),
            "devices" => Some(Self::Device),
            _ => None,
        }
    }
}

/// Result keys of a search response, in output order.
const SEARCH_KEYS: [&str; 6] = ["tracks", "artists", "albums", "playlists", "shows", "episodes"];

/// Pagination metadata carried over from upstream paging objects.
const PAGE_META: [&str; 6] = ["total", "limit", "offset", "next", "previous", "cursors"];

/// Layout of an upstream body, resolved from the endpoint's response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Entity(EntityKind),
    Page {
        key: Option<&'static str>,
        kind: EntityKind,
        wrapper: Option<Wrapper>,
    },
    List {
        key: &'static str,
        kind: EntityKind,
    },
    Search,
}

/// A shaped tool result.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// Upstream body text, unchanged.
    Raw(String),
    /// A projected JSON document.
    Shaped(Value),
}

impl NormalizedResult {
    pub fn into_call_result(self) -> CallToolResult {
        match self {
            Self::Raw(body) => CallToolResult::success(vec![Content::text(body)]),
            Self::Shaped(value) => CallToolResult::structured(value),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Shaped(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

/// Shape a single upstream entity.
pub fn transform(raw: &str, kind: EntityKind, tier: FormatTier) -> Result<NormalizedResult, ToolError> {
    transform_layout(raw, Layout::Entity(kind), tier)
}

/// Shape an upstream body of the given layout.
pub fn transform_layout(
    raw: &str,
    layout: Layout,
    tier: FormatTier,
) -> Result<NormalizedResult, ToolError> {
    shape_body(raw, layout, tier, Checks::strict())
}

/// Shape a body the caller narrowed with an upstream field filter.
///
/// Identity fields and `items` arrays may have been filtered out, so only
/// the keys that are present are projected and nothing is required.
pub fn transform_filtered(
    raw: &str,
    layout: Layout,
    tier: FormatTier,
) -> Result<NormalizedResult, ToolError> {
    shape_body(raw, layout, tier, Checks::partial())
}

fn shape_body(
    raw: &str,
    layout: Layout,
    tier: FormatTier,
    checks: Checks,
) -> Result<NormalizedResult, ToolError> {
    if tier == FormatTier::Raw {
        return Ok(NormalizedResult::Raw(raw.to_string()));
    }

    if raw.trim().is_empty() {
        if layout == Layout::Entity(EntityKind::PlaybackState) {
            return Ok(NormalizedResult::Shaped(inactive_playback()));
        }
        return Err(ToolError::malformed("upstream returned an empty body"));
    }

    let body: Value = serde_json::from_str(raw)
        .map_err(|e| ToolError::malformed(format!("upstream body is not JSON: {e}")))?;

    let shaped = match layout {
        Layout::Entity(kind) if body.is_null() => {
            return Err(ToolError::malformed(format!(
                "upstream returned null instead of a {}",
                kind.as_str()
            )));
        }
        Layout::Entity(kind) => projections::project(&body, kind, tier, checks)?,
        Layout::Page { key, kind, wrapper } => {
            let page = match key {
                Some(key) => body
                    .get(key)
                    .ok_or_else(|| ToolError::malformed(format!("missing '{key}' page")))?,
                None => &body,
            };
            shape_page(page, kind, wrapper, tier, checks)?
        }
        Layout::List { key, kind } => {
            let items = body
                .get(key)
                .and_then(Value::as_array)
                .ok_or_else(|| ToolError::malformed(format!("missing '{key}' list")))?;
            json!({ "items": shape_items(items, kind, None, tier, checks)? })
        }
        Layout::Search => shape_search(&body, tier, checks)?,
    };

    Ok(NormalizedResult::Shaped(shaped))
}

/// The result reported when no playback session is active.
pub fn inactive_playback() -> Value {
    json!({
        "is_playing": false,
        "message": "No active playback session found",
    })
}

fn shape_page(
    page: &Value,
    kind: EntityKind,
    wrapper: Option<Wrapper>,
    tier: FormatTier,
    checks: Checks,
) -> Result<Value, ToolError> {
    let obj = page
        .as_object()
        .ok_or_else(|| ToolError::malformed("paging object is not a JSON object"))?;

    let mut out = Map::new();
    match obj.get("items") {
        Some(Value::Array(items)) => {
            out.insert(
                "items".to_string(),
                Value::Array(shape_items(items, kind, wrapper, tier, checks)?),
            );
        }
        None if checks.is_partial() => {}
        _ => return Err(ToolError::malformed("paging object has no 'items' array")),
    }
    for key in PAGE_META {
        if let Some(v) = obj.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }
    if tier == FormatTier::Full {
        if let Some(href) = obj.get("href") {
            out.insert("href".to_string(), href.clone());
        }
    }
    Ok(Value::Object(out))
}

fn shape_items(
    items: &[Value],
    kind: EntityKind,
    wrapper: Option<Wrapper>,
    tier: FormatTier,
    checks: Checks,
) -> Result<Vec<Value>, ToolError> {
    items
        .iter()
        .map(|item| match wrapper {
            Some(wrapper) => unwrap_item(item, kind, wrapper, tier, checks),
            None => projections::project(item, kind, tier, checks),
        })
        .collect()
}

/// Shape a wrapped item such as `{"added_at": ..., "track": {...}}`.
///
/// The entity is projected and the timestamp attached beside its fields at
/// COMPACT and FULL. FULL also keeps the remaining wrapper fields.
fn unwrap_item(
    item: &Value,
    kind: EntityKind,
    wrapper: Wrapper,
    tier: FormatTier,
    checks: Checks,
) -> Result<Value, ToolError> {
    let obj = match item {
        Value::Null => return Ok(Value::Null),
        Value::Object(obj) => obj,
        _ => return Err(ToolError::malformed("wrapped item is not a JSON object")),
    };

    let entity = obj.get(wrapper.entity_key).unwrap_or(&Value::Null);
    let mut shaped = projections::project(entity, kind, tier, checks)?;

    if let Value::Object(out) = &mut shaped {
        if tier != FormatTier::Minimal {
            if let Some(ts) = obj.get(wrapper.timestamp_key) {
                let ts = match ts.as_str() {
                    Some(s) => Value::String(normalize_timestamp(s)),
                    None => ts.clone(),
                };
                out.insert(wrapper.timestamp_key.to_string(), ts);
            }
        }
        if tier == FormatTier::Full {
            for (key, value) in obj {
                if key != wrapper.entity_key && !out.contains_key(key) {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
    }

    Ok(shaped)
}

fn shape_search(body: &Value, tier: FormatTier, checks: Checks) -> Result<Value, ToolError> {
    let mut out = Map::new();
    let mut total_results = 0u64;

    for key in SEARCH_KEYS {
        let Some(page) = body.get(key) else {
            continue;
        };
        let Some(kind) = EntityKind::from_plural(key) else {
            continue;
        };
        total_results += page.get("total").and_then(Value::as_u64).unwrap_or(0);
        out.insert(key.to_string(), shape_page(page, kind, None, tier, checks)?);
    }

    out.insert("total_results".to_string(), json!(total_results));
    out.insert("format_used".to_string(), json!(tier.as_str()));
    Ok(Value::Object(out))
}
