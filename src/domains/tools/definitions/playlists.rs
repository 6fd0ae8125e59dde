//! Playlist management tools.

use crate::domains::spotify::endpoint::{
    BatchEncoding, BatchSpec, Category, FIELD_FILTER, HttpMethod, KindRule, Pagination,
    ParamDefault, ParamKind, ParamLocation, ParamSpec, ResponseShape, ToolDescriptor, Wrapper,
};
use crate::domains::spotify::transform::EntityKind;

use super::common::{ADDITIONAL_TYPES, MARKET, PAGED, PLAYLIST_ID};

/// Upstream ceiling for playlist item mutations.
const PLAYLIST_BATCH: usize = 100;

const TRACK_URIS: ParamSpec = ParamSpec::required(
    "track_uris",
    ParamKind::IdList { max: None },
    ParamLocation::Batch,
    "Track or episode URIs (array or comma-separated). Lists above 100 are sent in \
     batches, in order.",
);

const FIELDS: ParamSpec = ParamSpec::optional(
    FIELD_FILTER,
    ParamKind::Str,
    ParamLocation::Query("fields"),
    "Upstream field filter, e.g. 'items(added_at,track(name))'. Shaped output \
     then holds only the fields that were kept.",
);

const NAME: ParamSpec = ParamSpec::optional(
    "name",
    ParamKind::Str,
    ParamLocation::Body("name"),
    "Playlist name",
);

const DESCRIPTION: ParamSpec = ParamSpec::optional(
    "description",
    ParamKind::Str,
    ParamLocation::Body("description"),
    "Playlist description",
);

const PUBLIC: ParamSpec = ParamSpec::optional(
    "public",
    ParamKind::Bool,
    ParamLocation::Body("public"),
    "Whether the playlist is public",
);

const COLLABORATIVE: ParamSpec = ParamSpec::optional(
    "collaborative",
    ParamKind::Bool,
    ParamLocation::Body("collaborative"),
    "Whether other users may modify the playlist",
);

pub const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "get_user_playlists",
        category: Category::PlaylistManagement,
        description: "List playlists owned or followed by the user.",
        method: HttpMethod::Get,
        path: "/me/playlists",
        params: &[],
        fixed_query: &[],
        pagination: PAGED,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: None,
            kind: KindRule::Fixed(EntityKind::Playlist),
            wrapper: None,
        },
    },
    ToolDescriptor {
        name: "create_playlist",
        category: Category::PlaylistManagement,
        description: "Create a playlist owned by the current user.",
        method: HttpMethod::Post,
        path: "/users/{current_user}/playlists",
        params: &[
            ParamSpec::required(
                "name",
                ParamKind::Str,
                ParamLocation::Body("name"),
                "Playlist name",
            ),
            DESCRIPTION,
            PUBLIC.with_default(ParamDefault::Bool(false)),
            COLLABORATIVE,
        ],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Entity(EntityKind::Playlist),
    },
    ToolDescriptor {
        name: "get_playlist",
        category: Category::PlaylistManagement,
        description: "Get a playlist by ID.",
        method: HttpMethod::Get,
        path: "/playlists/{playlist_id}",
        params: &[PLAYLIST_ID, MARKET, FIELDS, ADDITIONAL_TYPES],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Entity(EntityKind::Playlist),
    },
    ToolDescriptor {
        name: "get_playlist_tracks",
        category: Category::PlaylistManagement,
        description: "List the items of a playlist with the time each was added.",
        method: HttpMethod::Get,
        path: "/playlists/{playlist_id}/tracks",
        params: &[PLAYLIST_ID, MARKET, FIELDS, ADDITIONAL_TYPES],
        fixed_query: &[],
        pagination: Pagination::OffsetLimit {
            default_limit: 100,
            max_limit: 100,
        },
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: None,
            kind: KindRule::Fixed(EntityKind::Track),
            wrapper: Some(Wrapper {
                entity_key: "track",
                timestamp_key: "added_at",
            }),
        },
    },
    ToolDescriptor {
        name: "add_tracks_to_playlist",
        category: Category::PlaylistManagement,
        description: "Add items to a playlist, preserving input order. Returns the \
                      playlist snapshot after the last batch.",
        method: HttpMethod::Post,
        path: "/playlists/{playlist_id}/tracks",
        params: &[
            PLAYLIST_ID,
            TRACK_URIS,
            ParamSpec::optional(
                "position",
                ParamKind::Int {
                    min: Some(0),
                    max: None,
                },
                ParamLocation::Body("position"),
                "Zero-based insert position (defaults to appending)",
            ),
        ],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: Some(BatchSpec {
            param: "track_uris",
            encoding: BatchEncoding::Ids("uris"),
            ceiling: PLAYLIST_BATCH,
            dedupe: false,
            position_param: Some("position"),
            thread_snapshot: false,
        }),
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack {
            message: "Tracks added to playlist",
        },
    },
    ToolDescriptor {
        name: "remove_tracks_from_playlist",
        category: Category::PlaylistManagement,
        description: "Remove every occurrence of the given items from a playlist.",
        method: HttpMethod::Delete,
        path: "/playlists/{playlist_id}/tracks",
        params: &[
            PLAYLIST_ID,
            TRACK_URIS,
            ParamSpec::optional(
                "snapshot_id",
                ParamKind::Str,
                ParamLocation::Body("snapshot_id"),
                "Playlist snapshot to apply the removal against",
            ),
        ],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: Some(BatchSpec {
            param: "track_uris",
            encoding: BatchEncoding::TrackObjects,
            ceiling: PLAYLIST_BATCH,
            dedupe: false,
            position_param: None,
            thread_snapshot: true,
        }),
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack {
            message: "Tracks removed from playlist",
        },
    },
    ToolDescriptor {
        name: "update_playlist_details",
        category: Category::PlaylistManagement,
        description: "Change a playlist's name, description, visibility or \
                      collaborative flag.",
        method: HttpMethod::Put,
        path: "/playlists/{playlist_id}",
        params: &[PLAYLIST_ID, NAME, DESCRIPTION, PUBLIC, COLLABORATIVE],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &["name", "description", "public", "collaborative"],
        response: ResponseShape::Ack {
            message: "Playlist details updated",
        },
    },
    ToolDescriptor {
        name: "unfollow_playlist",
        category: Category::PlaylistManagement,
        description: "Unfollow a playlist. Unfollowing an owned playlist deletes it \
                      from the user's library.",
        method: HttpMethod::Delete,
        path: "/playlists/{playlist_id}/followers",
        params: &[PLAYLIST_ID],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack {
            message: "Playlist unfollowed",
        },
    },
];
