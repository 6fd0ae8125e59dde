//! Library management tools: saved items, follows, listening history.

use crate::domains::spotify::endpoint::{
    BatchEncoding, BatchSpec, Category, HttpMethod, KindRule, Pagination, ParamKind, ParamLocation,
    ParamSpec, ResponseShape, ToolDescriptor, Wrapper,
};
use crate::domains::spotify::transform::EntityKind;

use super::common::{CURSOR, MARKET, PAGED};

/// Upstream ceiling for library mutations.
const LIBRARY_BATCH: usize = 50;

const fn library_batch(param: &'static str) -> BatchSpec {
    BatchSpec {
        param,
        encoding: BatchEncoding::Ids("ids"),
        ceiling: LIBRARY_BATCH,
        dedupe: true,
        position_param: None,
        thread_snapshot: false,
    }
}

const TRACK_IDS: ParamSpec = ParamSpec::required(
    "track_ids",
    ParamKind::IdList { max: None },
    ParamLocation::Batch,
    "Track IDs (array or comma-separated). Lists above 50 are sent in batches.",
);

const SAVED_TRACK: Wrapper = Wrapper {
    entity_key: "track",
    timestamp_key: "added_at",
};

pub const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "get_saved_tracks",
        category: Category::LibraryManagement,
        description: "List the tracks saved in the user's library, newest first.",
        method: HttpMethod::Get,
        path: "/me/tracks",
        params: &[MARKET],
        fixed_query: &[],
        pagination: PAGED,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: None,
            kind: KindRule::Fixed(EntityKind::Track),
            wrapper: Some(SAVED_TRACK),
        },
    },
    ToolDescriptor {
        name: "get_saved_albums",
        category: Category::LibraryManagement,
        description: "List the albums saved in the user's library, newest first.",
        method: HttpMethod::Get,
        path: "/me/albums",
        params: &[MARKET],
        fixed_query: &[],
        pagination: PAGED,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: None,
            kind: KindRule::Fixed(EntityKind::Album),
            wrapper: Some(Wrapper {
                entity_key: "album",
                timestamp_key: "added_at",
            }),
        },
    },
    ToolDescriptor {
        name: "get_followed_artists",
        category: Category::LibraryManagement,
        description: "List the artists the user follows. Pass the returned cursor as \
                      'after' to fetch the next page.",
        method: HttpMethod::Get,
        path: "/me/following",
        params: &[ParamSpec::optional(
            "after",
            ParamKind::Str,
            ParamLocation::Query("after"),
            "Last artist ID of the previous page",
        )],
        fixed_query: &[("type", "artist")],
        pagination: CURSOR,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: Some("artists"),
            kind: KindRule::Fixed(EntityKind::Artist),
            wrapper: None,
        },
    },
    ToolDescriptor {
        name: "get_recently_played",
        category: Category::LibraryManagement,
        description: "List recently played tracks. Page with 'after' or 'before' \
                      (Unix milliseconds), not both.",
        method: HttpMethod::Get,
        path: "/me/player/recently-played",
        params: &[
            ParamSpec::optional(
                "after",
                ParamKind::Int {
                    min: Some(0),
                    max: None,
                },
                ParamLocation::Query("after"),
                "Return items played after this Unix timestamp (ms)",
            ),
            ParamSpec::optional(
                "before",
                ParamKind::Int {
                    min: Some(0),
                    max: None,
                },
                ParamLocation::Query("before"),
                "Return items played before this Unix timestamp (ms)",
            ),
        ],
        fixed_query: &[],
        pagination: CURSOR,
        batch: None,
        exclusive: &[("after", "before")],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: None,
            kind: KindRule::Fixed(EntityKind::Track),
            wrapper: Some(Wrapper {
                entity_key: "track",
                timestamp_key: "played_at",
            }),
        },
    },
    ToolDescriptor {
        name: "get_top_items",
        category: Category::LibraryManagement,
        description: "List the user's top artists or tracks over a time range.",
        method: HttpMethod::Get,
        path: "/me/top/{type}",
        params: &[
            ParamSpec::required(
                "type",
                ParamKind::Enum(&["artists", "tracks"]),
                ParamLocation::Path,
                "Either 'artists' or 'tracks'",
            ),
            ParamSpec::optional(
                "time_range",
                ParamKind::Enum(&["short_term", "medium_term", "long_term"]),
                ParamLocation::Query("time_range"),
                "short_term (~4 weeks), medium_term (~6 months) or long_term (~1 year)",
            ),
        ],
        fixed_query: &[],
        pagination: PAGED,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: None,
            kind: KindRule::FromParam("type"),
            wrapper: None,
        },
    },
    ToolDescriptor {
        name: "save_tracks",
        category: Category::LibraryManagement,
        description: "Save tracks to the user's library. Saving an already saved track \
                      is a no-op.",
        method: HttpMethod::Put,
        path: "/me/tracks",
        params: &[TRACK_IDS],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: Some(library_batch("track_ids")),
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack {
            message: "Tracks saved to library",
        },
    },
    ToolDescriptor {
        name: "remove_saved_tracks",
        category: Category::LibraryManagement,
        description: "Remove tracks from the user's library.",
        method: HttpMethod::Delete,
        path: "/me/tracks",
        params: &[TRACK_IDS],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: Some(library_batch("track_ids")),
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack {
            message: "Tracks removed from library",
        },
    },
    ToolDescriptor {
        name: "follow_artists",
        category: Category::LibraryManagement,
        description: "Follow one or more artists.",
        method: HttpMethod::Put,
        path: "/me/following",
        params: &[ParamSpec::required(
            "artist_ids",
            ParamKind::IdList { max: None },
            ParamLocation::Batch,
            "Artist IDs (array or comma-separated). Lists above 50 are sent in batches.",
        )],
        fixed_query: &[("type", "artist")],
        pagination: Pagination::None,
        batch: Some(library_batch("artist_ids")),
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Ack {
            message: "Artists followed",
        },
    },
];
