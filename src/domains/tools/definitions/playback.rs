//! Playback control tools. All of them act on the user's active device
//! unless `device_id` is given.

use crate::domains::spotify::endpoint::{
    Category, HttpMethod, Pagination, ParamKind, ParamLocation, ParamSpec, ResponseShape,
    ToolDescriptor,
};
use crate::domains::spotify::transform::EntityKind;

use super::common::{ADDITIONAL_TYPES, DEVICE_ID, MARKET};

/// A bodiless playback command with only the optional device parameter.
const fn command(
    name: &'static str,
    description: &'static str,
    method: HttpMethod,
    path: &'static str,
    message: &'static str,
) -> ToolDescriptor {
    ToolDescriptor {
        name,
        category: Category::PlaybackControl,
        description,
        method,
        path,
        params: &[DEVICE_ID],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack { message },
    }
}

/// A playback setting sent as one required query parameter.
const fn setting(
    name: &'static str,
    description: &'static str,
    path: &'static str,
    params: &'static [ParamSpec],
    message: &'static str,
) -> ToolDescriptor {
    ToolDescriptor {
        name,
        category: Category::PlaybackControl,
        description,
        method: HttpMethod::Put,
        path,
        params,
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack { message },
    }
}

pub const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "get_current_playback",
        category: Category::PlaybackControl,
        description: "Get the current playback state: item, progress, device, shuffle \
                      and repeat. Reports an inactive state when nothing is playing.",
        method: HttpMethod::Get,
        path: "/me/player",
        params: &[MARKET, ADDITIONAL_TYPES],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Entity(EntityKind::PlaybackState),
    },
    ToolDescriptor {
        name: "get_available_devices",
        category: Category::PlaybackControl,
        description: "List the devices the user can play on.",
        method: HttpMethod::Get,
        path: "/me/player/devices",
        params: &[],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::List {
            key: "devices",
            kind: EntityKind::Device,
        },
    },
    ToolDescriptor {
        name: "start_playback",
        category: Category::PlaybackControl,
        description: "Start or resume playback, optionally of a context (album, artist, \
                      playlist) or an explicit list of track URIs.",
        method: HttpMethod::Put,
        path: "/me/player/play",
        params: &[
            DEVICE_ID,
            ParamSpec::optional(
                "context_uri",
                ParamKind::Str,
                ParamLocation::Body("context_uri"),
                "Album, artist or playlist URI to play",
            ),
            ParamSpec::optional(
                "uris",
                ParamKind::IdList { max: None },
                ParamLocation::Body("uris"),
                "Track URIs to play (array or comma-separated)",
            ),
            ParamSpec::optional(
                "offset_position",
                ParamKind::Int {
                    min: Some(0),
                    max: None,
                },
                ParamLocation::BodyNested("offset", "position"),
                "Zero-based index in the context to start from",
            ),
            ParamSpec::optional(
                "offset_uri",
                ParamKind::Str,
                ParamLocation::BodyNested("offset", "uri"),
                "URI of the item in the context to start from",
            ),
            ParamSpec::optional(
                "position_ms",
                ParamKind::Int {
                    min: Some(0),
                    max: None,
                },
                ParamLocation::Body("position_ms"),
                "Position in the first item to start from, in milliseconds",
            ),
        ],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[("context_uri", "uris"), ("offset_position", "offset_uri")],
        at_least_one: &[],
        response: ResponseShape::Ack {
            message: "Playback started",
        },
    },
    command(
        "pause_playback",
        "Pause playback.",
        HttpMethod::Put,
        "/me/player/pause",
        "Playback paused",
    ),
    command(
        "skip_to_next",
        "Skip to the next item in the queue.",
        HttpMethod::Post,
        "/me/player/next",
        "Skipped to next track",
    ),
    command(
        "skip_to_previous",
        "Skip to the previous item.",
        HttpMethod::Post,
        "/me/player/previous",
        "Skipped to previous track",
    ),
    setting(
        "seek_to_position",
        "Seek to a position in the current item.",
        "/me/player/seek",
        &[
            ParamSpec::required(
                "position_ms",
                ParamKind::Int {
                    min: Some(0),
                    max: None,
                },
                ParamLocation::Query("position_ms"),
                "Position in milliseconds",
            ),
            DEVICE_ID,
        ],
        "Playback position updated",
    ),
    setting(
        "set_volume",
        "Set the playback volume.",
        "/me/player/volume",
        &[
            ParamSpec::required(
                "volume_percent",
                ParamKind::Int {
                    min: Some(0),
                    max: Some(100),
                },
                ParamLocation::Query("volume_percent"),
                "Volume from 0 to 100",
            ),
            DEVICE_ID,
        ],
        "Volume updated",
    ),
    setting(
        "set_repeat_mode",
        "Set the repeat mode.",
        "/me/player/repeat",
        &[
            ParamSpec::required(
                "state",
                ParamKind::Enum(&["track", "context", "off"]),
                ParamLocation::Query("state"),
                "'track', 'context' or 'off'",
            ),
            DEVICE_ID,
        ],
        "Repeat mode updated",
    ),
    setting(
        "set_shuffle",
        "Turn shuffle on or off.",
        "/me/player/shuffle",
        &[
            ParamSpec::required(
                "state",
                ParamKind::Bool,
                ParamLocation::Query("state"),
                "true to shuffle, false to play in order",
            ),
            DEVICE_ID,
        ],
        "Shuffle updated",
    ),
    setting(
        "transfer_playback",
        "Move playback to another device.",
        "/me/player",
        &[
            ParamSpec::required(
                "device_id",
                ParamKind::Str,
                ParamLocation::BodyList("device_ids"),
                "Device to transfer playback to",
            ),
            ParamSpec::optional(
                "force_play",
                ParamKind::Bool,
                ParamLocation::Body("play"),
                "Start playing on the new device (default keeps the current state)",
            ),
        ],
        "Playback transferred",
    ),
    ToolDescriptor {
        name: "add_to_queue",
        category: Category::PlaybackControl,
        description: "Add a track or episode to the end of the playback queue.",
        method: HttpMethod::Post,
        path: "/me/player/queue",
        params: &[
            ParamSpec::required(
                "uri",
                ParamKind::Str,
                ParamLocation::Query("uri"),
                "Track or episode URI",
            ),
            DEVICE_ID,
        ],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack {
            message: "Added to queue",
        },
    },
];
