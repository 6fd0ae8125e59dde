//! Music analysis tools: audio features, audio analysis, artist and album lookups.

use crate::domains::spotify::endpoint::{
    Category, HttpMethod, KindRule, Pagination, ParamKind, ParamLocation, ParamSpec,
    ResponseShape, ToolDescriptor,
};
use crate::domains::spotify::transform::EntityKind;

use super::common::{MARKET, MARKET_US, PAGED};

const ARTIST_ID: ParamSpec =
    ParamSpec::required("artist_id", ParamKind::Str, ParamLocation::Path, "Artist ID");

pub const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "get_track_audio_features",
        category: Category::MusicAnalysis,
        description: "Get audio features (tempo, key, energy, danceability, ...) for up \
                      to 100 tracks.",
        method: HttpMethod::Get,
        path: "/audio-features",
        params: &[ParamSpec::required(
            "track_ids",
            ParamKind::IdList { max: Some(100) },
            ParamLocation::Query("ids"),
            "Track IDs (array or comma-separated, at most 100)",
        )],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::List {
            key: "audio_features",
            kind: EntityKind::AudioFeatures,
        },
    },
    ToolDescriptor {
        name: "get_track_audio_analysis",
        category: Category::MusicAnalysis,
        description: "Get the low-level audio analysis of a track: sections, segments, \
                      bars, beats and tatums.",
        method: HttpMethod::Get,
        path: "/audio-analysis/{track_id}",
        params: &[ParamSpec::required(
            "track_id",
            ParamKind::Str,
            ParamLocation::Path,
            "Track ID",
        )],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Entity(EntityKind::AudioAnalysis),
    },
    ToolDescriptor {
        name: "get_artist_info",
        category: Category::MusicAnalysis,
        description: "Get catalog information for up to 50 artists.",
        method: HttpMethod::Get,
        path: "/artists",
        params: &[ParamSpec::required(
            "artist_ids",
            ParamKind::IdList { max: Some(50) },
            ParamLocation::Query("ids"),
            "Artist IDs (array or comma-separated, at most 50)",
        )],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::List {
            key: "artists",
            kind: EntityKind::Artist,
        },
    },
    ToolDescriptor {
        name: "get_artist_top_tracks",
        category: Category::MusicAnalysis,
        description: "Get an artist's top tracks in a market.",
        method: HttpMethod::Get,
        path: "/artists/{artist_id}/top-tracks",
        params: &[ARTIST_ID, MARKET_US],
        fixed_query: &[],
        pagination: Pagination::None,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::List {
            key: "tracks",
            kind: EntityKind::Track,
        },
    },
    ToolDescriptor {
        name: "get_artist_albums",
        category: Category::MusicAnalysis,
        description: "List an artist's albums, singles, compilations and appearances.",
        method: HttpMethod::Get,
        path: "/artists/{artist_id}/albums",
        params: &[
            ARTIST_ID,
            ParamSpec::optional(
                "include_groups",
                ParamKind::EnumList(&["album", "single", "appears_on", "compilation"]),
                ParamLocation::Query("include_groups"),
                "Album groups to include: album, single, appears_on, compilation",
            ),
            MARKET,
        ],
        fixed_query: &[],
        pagination: PAGED,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: None,
            kind: KindRule::Fixed(EntityKind::Album),
            wrapper: None,
        },
    },
    ToolDescriptor {
        name: "get_album_tracks",
        category: Category::MusicAnalysis,
        description: "List the tracks of an album.",
        method: HttpMethod::Get,
        path: "/albums/{album_id}/tracks",
        params: &[
            ParamSpec::required("album_id", ParamKind::Str, ParamLocation::Path, "Album ID"),
            MARKET,
        ],
        fixed_query: &[],
        pagination: Pagination::OffsetLimit {
            default_limit: 50,
            max_limit: 50,
        },
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: None,
            kind: KindRule::Fixed(EntityKind::Track),
            wrapper: None,
        },
    },
];
