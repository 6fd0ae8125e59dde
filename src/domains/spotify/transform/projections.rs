//! Per-kind projection tables.
//!
//! Each entity kind declares the fields it keeps at MINIMAL, the fields
//! COMPACT adds on top, and the normalizations FULL adds on top of the
//! complete upstream object. Nesting keeps the tiers ordered: every key at
//! a lower tier is also present at every higher tier.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::{EntityKind, FormatTier};
use crate::domains::spotify::endpoint::Wrapper;
use crate::domains::tools::ToolError;

type Object = Map<String, Value>;

/// Identity requirements for one projected subtree.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Checks {
    /// Inside a local file, where `id` may be null.
    local: bool,
    /// The caller filtered the upstream fields, so nothing is required.
    partial: bool,
}

impl Checks {
    pub(super) fn strict() -> Self {
        Self::default()
    }

    pub(super) fn partial() -> Self {
        Self {
            local: false,
            partial: true,
        }
    }

    pub(super) fn is_partial(self) -> bool {
        self.partial
    }
}

/// One projected field.
pub(super) enum Field {
    /// Keep an upstream key as-is when present.
    Keep(&'static str),
    /// A nested entity, rendered at `tier` (or lower) below FULL.
    Entity {
        key: &'static str,
        kind: EntityKind,
        tier: FormatTier,
    },
    /// A nested list of entities, rendered at `tier` (or lower) below FULL.
    Entities {
        key: &'static str,
        kind: EntityKind,
        tier: FormatTier,
    },
    /// A nested paging object whose items are rendered at FULL. Pages
    /// without an `items` array (`{href, total}` summaries) stay as sent.
    Page {
        key: &'static str,
        kind: EntityKind,
        wrapper: Option<Wrapper>,
    },
    /// A nested object reduced to a subset of its keys below FULL.
    Pick {
        key: &'static str,
        keys: &'static [&'static str],
    },
    /// A value computed from the upstream object.
    Derived {
        key: &'static str,
        derive: fn(&Object) -> Option<Value>,
    },
}

pub(super) struct Projection {
    pub minimal: &'static [Field],
    pub compact: &'static [Field],
    pub full: &'static [Field],
}

use Field::{Derived, Entities, Entity, Keep, Page, Pick};

const ID_NAME: &[Field] = &[Keep("id"), Keep("name")];

const ADDED_TRACK: Wrapper = Wrapper {
    entity_key: "track",
    timestamp_key: "added_at",
};

const TRACK: Projection = Projection {
    minimal: ID_NAME,
    compact: &[
        Keep("uri"),
        Derived {
            key: "primary_artist",
            derive: primary_artist,
        },
        Entities {
            key: "artists",
            kind: EntityKind::Artist,
            tier: FormatTier::Minimal,
        },
        Entity {
            key: "album",
            kind: EntityKind::Album,
            tier: FormatTier::Minimal,
        },
        Keep("duration_ms"),
        Keep("explicit"),
        Keep("popularity"),
        Keep("preview_url"),
    ],
    full: &[Derived {
        key: "duration",
        derive: duration,
    }],
};

const ALBUM: Projection = Projection {
    minimal: ID_NAME,
    compact: &[
        Keep("uri"),
        Entities {
            key: "artists",
            kind: EntityKind::Artist,
            tier: FormatTier::Minimal,
        },
        Keep("album_type"),
        Keep("total_tracks"),
        Keep("release_date"),
        Keep("images"),
    ],
    full: &[
        Derived {
            key: "release_year",
            derive: release_year,
        },
        Page {
            key: "tracks",
            kind: EntityKind::Track,
            wrapper: None,
        },
    ],
};

const ARTIST: Projection = Projection {
    minimal: ID_NAME,
    compact: &[Keep("uri"), Keep("images"), Keep("popularity")],
    full: &[],
};

const PLAYLIST: Projection = Projection {
    minimal: ID_NAME,
    compact: &[
        Keep("uri"),
        Keep("description"),
        Pick {
            key: "owner",
            keys: &["id", "display_name"],
        },
        Keep("public"),
        Keep("collaborative"),
        Pick {
            key: "tracks",
            keys: &["total"],
        },
        Keep("images"),
    ],
    full: &[Page {
        key: "tracks",
        kind: EntityKind::Track,
        wrapper: Some(ADDED_TRACK),
    }],
};

const PLAYBACK_STATE: Projection = Projection {
    minimal: &[
        Keep("is_playing"),
        Entity {
            key: "item",
            kind: EntityKind::Track,
            tier: FormatTier::Compact,
        },
    ],
    compact: &[
        Keep("progress_ms"),
        Keep("shuffle_state"),
        Keep("repeat_state"),
        Keep("currently_playing_type"),
        Entity {
            key: "device",
            kind: EntityKind::Device,
            tier: FormatTier::Compact,
        },
    ],
    full: &[
        Derived {
            key: "timestamp",
            derive: playback_timestamp,
        },
        Derived {
            key: "progress",
            derive: progress,
        },
    ],
};

const DEVICE: Projection = Projection {
    minimal: ID_NAME,
    compact: &[Keep("type"), Keep("is_active"), Keep("volume_percent")],
    full: &[],
};

const CATEGORY: Projection = Projection {
    minimal: ID_NAME,
    compact: &[Keep("icons")],
    full: &[],
};

const AUDIO_FEATURES: Projection = Projection {
    minimal: &[Keep("id"), Keep("tempo")],
    compact: &[
        Keep("key"),
        Keep("mode"),
        Keep("time_signature"),
        Keep("danceability"),
        Keep("energy"),
        Keep("valence"),
        Keep("acousticness"),
        Keep("instrumentalness"),
        Keep("liveness"),
        Keep("speechiness"),
        Keep("loudness"),
        Keep("duration_ms"),
    ],
    full: &[Derived {
        key: "duration",
        derive: duration,
    }],
};

const AUDIO_ANALYSIS: Projection = Projection {
    minimal: &[
        Derived {
            key: "duration",
            derive: analysis_duration,
        },
        Derived {
            key: "tempo",
            derive: |obj| track_section(obj, "tempo"),
        },
    ],
    compact: &[
        Derived {
            key: "key",
            derive: |obj| track_section(obj, "key"),
        },
        Derived {
            key: "mode",
            derive: |obj| track_section(obj, "mode"),
        },
        Derived {
            key: "time_signature",
            derive: |obj| track_section(obj, "time_signature"),
        },
        Derived {
            key: "loudness",
            derive: |obj| track_section(obj, "loudness"),
        },
        Derived {
            key: "section_count",
            derive: |obj| count(obj, "sections"),
        },
        Derived {
            key: "segment_count",
            derive: |obj| count(obj, "segments"),
        },
        Derived {
            key: "bar_count",
            derive: |obj| count(obj, "bars"),
        },
        Derived {
            key: "beat_count",
            derive: |obj| count(obj, "beats"),
        },
        Derived {
            key: "tatum_count",
            derive: |obj| count(obj, "tatums"),
        },
    ],
    full: &[],
};

const SHOW: Projection = Projection {
    minimal: ID_NAME,
    compact: &[
        Keep("uri"),
        Keep("publisher"),
        Keep("description"),
        Keep("total_episodes"),
        Keep("images"),
    ],
    full: &[],
};

const EPISODE: Projection = Projection {
    minimal: ID_NAME,
    compact: &[
        Keep("uri"),
        Keep("description"),
        Keep("duration_ms"),
        Keep("release_date"),
        Keep("explicit"),
        Keep("images"),
    ],
    full: &[
        Derived {
            key: "duration",
            derive: duration,
        },
        Derived {
            key: "release_year",
            derive: release_year,
        },
    ],
};

fn table(kind: EntityKind) -> &'static Projection {
    match kind {
        EntityKind::Track => &TRACK,
        EntityKind::Album => &ALBUM,
        EntityKind::Artist => &ARTIST,
        EntityKind::Playlist => &PLAYLIST,
        EntityKind::PlaybackState => &PLAYBACK_STATE,
        EntityKind::Device => &DEVICE,
        EntityKind::Category => &CATEGORY,
        EntityKind::AudioFeatures => &AUDIO_FEATURES,
        EntityKind::AudioAnalysis => &AUDIO_ANALYSIS,
        EntityKind::Show => &SHOW,
        EntityKind::Episode => &EPISODE,
    }
}

/// Project one upstream entity. `null` stays `null`.
pub(super) fn project(
    value: &Value,
    kind: EntityKind,
    tier: FormatTier,
    checks: Checks,
) -> Result<Value, ToolError> {
    let obj = match value {
        Value::Null => return Ok(Value::Null),
        Value::Object(obj) => obj,
        other => {
            return Err(ToolError::malformed(format!(
                "expected {} object, found {}",
                kind.as_str(),
                json_type(other)
            )));
        }
    };

    let checks = Checks {
        local: checks.local || obj.get("is_local").and_then(Value::as_bool).unwrap_or(false),
        ..checks
    };
    if !checks.partial {
        check_identity(kind, obj, checks.local)?;
    }

    let projection = table(kind);
    let mut out = Object::new();

    match tier {
        FormatTier::Minimal => {
            apply_all(projection.minimal, obj, &mut out, tier, checks)?;
        }
        FormatTier::Compact => {
            apply_all(projection.minimal, obj, &mut out, tier, checks)?;
            apply_all(projection.compact, obj, &mut out, tier, checks)?;
        }
        FormatTier::Full | FormatTier::Raw => {
            out = obj.clone();
            apply_all(projection.minimal, obj, &mut out, FormatTier::Full, checks)?;
            apply_all(projection.compact, obj, &mut out, FormatTier::Full, checks)?;
            apply_all(projection.full, obj, &mut out, FormatTier::Full, checks)?;
        }
    }

    Ok(Value::Object(out))
}

fn apply_all(
    fields: &[Field],
    obj: &Object,
    out: &mut Object,
    tier: FormatTier,
    checks: Checks,
) -> Result<(), ToolError> {
    let full = tier == FormatTier::Full;
    for field in fields {
        match field {
            Keep(key) => {
                if !full {
                    if let Some(v) = obj.get(*key) {
                        out.insert(key.to_string(), v.clone());
                    }
                }
            }
            Entity { key, kind, tier: declared } => {
                if let Some(v) = obj.get(*key) {
                    let nested = project(v, *kind, nested_tier(tier, *declared), checks)?;
                    out.insert(key.to_string(), nested);
                }
            }
            Entities { key, kind, tier: declared } => match obj.get(*key) {
                Some(Value::Array(items)) => {
                    let nested = items
                        .iter()
                        .map(|v| project(v, *kind, nested_tier(tier, *declared), checks))
                        .collect::<Result<Vec<_>, _>>()?;
                    out.insert(key.to_string(), Value::Array(nested));
                }
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(ToolError::malformed(format!(
                        "expected '{key}' to be an array, found {}",
                        json_type(other)
                    )));
                }
            },
            Page { key, kind, wrapper } => {
                let page = obj
                    .get(*key)
                    .filter(|p| p.get("items").is_some_and(Value::is_array));
                if let (true, Some(page)) = (full, page) {
                    let nested = super::shape_page(page, *kind, *wrapper, FormatTier::Full, checks)?;
                    out.insert(key.to_string(), nested);
                }
            }
            Pick { key, keys } => {
                if !full {
                    if let Some(v) = obj.get(*key) {
                        out.insert(key.to_string(), pick(v, keys));
                    }
                }
            }
            Derived { key, derive } => {
                if let Some(v) = derive(obj) {
                    out.insert(key.to_string(), v);
                }
            }
        }
    }
    Ok(())
}

fn nested_tier(requested: FormatTier, declared: FormatTier) -> FormatTier {
    match requested {
        FormatTier::Full | FormatTier::Raw => FormatTier::Full,
        FormatTier::Minimal => FormatTier::Minimal,
        FormatTier::Compact => declared,
    }
}

fn pick(value: &Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            keys.iter()
                .filter_map(|k| obj.get(*k).map(|v| (k.to_string(), v.clone())))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn check_identity(kind: EntityKind, obj: &Object, local: bool) -> Result<(), ToolError> {
    let require_str = |key: &str| -> Result<(), ToolError> {
        match obj.get(key) {
            Some(Value::String(_)) => Ok(()),
            _ => Err(ToolError::malformed(format!(
                "{} is missing required field '{key}'",
                kind.as_str()
            ))),
        }
    };
    let require_id = || -> Result<(), ToolError> {
        if local {
            match obj.get("id") {
                None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
                Some(_) => require_str("id"),
            }
        } else {
            require_str("id")
        }
    };

    match kind {
        EntityKind::PlaybackState => match obj.get("is_playing") {
            Some(Value::Bool(_)) => Ok(()),
            _ => Err(ToolError::malformed(
                "playback_state is missing required field 'is_playing'",
            )),
        },
        EntityKind::Device => require_str("name"),
        EntityKind::AudioFeatures => require_str("id"),
        EntityKind::AudioAnalysis => match obj.get("track") {
            Some(Value::Object(_)) => Ok(()),
            _ => Err(ToolError::malformed(
                "audio_analysis is missing required section 'track'",
            )),
        },
        _ => {
            require_id()?;
            require_str("name")
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Format a duration in milliseconds as `m:ss`.
pub fn format_duration(length_ms: u64) -> String {
    let duration_secs = length_ms / 1000;
    let minutes = duration_secs / 60;
    let seconds = duration_secs % 60;
    format!("{}:{:02}", minutes, seconds)
}

/// Extract the year from "YYYY-MM-DD", "YYYY-MM" or "YYYY".
pub fn extract_year(date_str: &str) -> Option<u32> {
    date_str.get(..4).and_then(|y| y.parse().ok())
}

/// Re-render an RFC 3339 timestamp in UTC. Unparseable input is returned unchanged.
pub fn normalize_timestamp(ts: &str) -> String {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::AutoSi, true)
        })
        .unwrap_or_else(|_| ts.to_string())
}

fn primary_artist(obj: &Object) -> Option<Value> {
    obj.get("artists")?
        .as_array()?
        .first()?
        .get("name")
        .cloned()
}

fn duration(obj: &Object) -> Option<Value> {
    let ms = obj.get("duration_ms")?.as_u64()?;
    Some(Value::String(format_duration(ms)))
}

fn progress(obj: &Object) -> Option<Value> {
    let ms = obj.get("progress_ms")?.as_u64()?;
    Some(Value::String(format_duration(ms)))
}

fn release_year(obj: &Object) -> Option<Value> {
    extract_year(obj.get("release_date")?.as_str()?).map(Value::from)
}

fn playback_timestamp(obj: &Object) -> Option<Value> {
    let ms = obj.get("timestamp")?.as_i64()?;
    let dt = DateTime::<Utc>::from_timestamp_millis(ms)?;
    Some(Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
}

fn track_section(obj: &Object, key: &str) -> Option<Value> {
    obj.get("track")?.get(key).cloned()
}

fn analysis_duration(obj: &Object) -> Option<Value> {
    let secs = obj.get("track")?.get("duration")?.as_f64()?;
    Some(Value::String(format_duration((secs * 1000.0).round() as u64)))
}

fn count(obj: &Object, key: &str) -> Option<Value> {
    obj.get(key)?.as_array().map(|a| Value::from(a.len()))
}
