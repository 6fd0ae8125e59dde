//! Search & discovery tools.

use crate::domains::spotify::endpoint::{
    Category, HttpMethod, KindRule, ParamKind, ParamLocation, ParamSpec, ResponseShape,
    ToolDescriptor,
};
use crate::domains::spotify::transform::EntityKind;

use super::common::{COUNTRY, MARKET_US, PAGED};

/// Item types accepted by the search endpoint.
pub const SEARCH_TYPES: &[&str] = &["track", "artist", "album", "playlist", "show", "episode"];

pub const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "search_music",
        category: Category::SearchDiscovery,
        description: "Search the catalog for tracks, artists, albums, playlists, shows or \
                      episodes. Returns one page per requested type.",
        method: HttpMethod::Get,
        path: "/search",
        params: &[
            ParamSpec::required(
                "query",
                ParamKind::Str,
                ParamLocation::Query("q"),
                "Search query, e.g. 'Drake' or 'artist:Radiohead year:1997'",
            ),
            ParamSpec::required(
                "type",
                ParamKind::EnumList(SEARCH_TYPES),
                ParamLocation::Query("type"),
                "Item types to search: track, artist, album, playlist, show, episode \
                 (array or comma-separated)",
            ),
            MARKET_US,
        ],
        fixed_query: &[],
        pagination: PAGED,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Search,
    },
    ToolDescriptor {
        name: "browse_categories",
        category: Category::SearchDiscovery,
        description: "List the browse categories used to tag items in the catalog.",
        method: HttpMethod::Get,
        path: "/browse/categories",
        params: &[
            COUNTRY,
            ParamSpec::optional(
                "locale",
                ParamKind::Str,
                ParamLocation::Query("locale"),
                "Language and country, e.g. 'es_MX'",
            ),
        ],
        fixed_query: &[],
        pagination: PAGED,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: Some("categories"),
            kind: KindRule::Fixed(EntityKind::Category),
            wrapper: None,
        },
    },
    ToolDescriptor {
        name: "get_new_releases",
        category: Category::SearchDiscovery,
        description: "List newly released albums featured in the catalog.",
        method: HttpMethod::Get,
        path: "/browse/new-releases",
        params: &[COUNTRY],
        fixed_query: &[],
        pagination: PAGED,
        batch: None,
        exclusive: &[],
        at_least_one: &[],
        response: ResponseShape::Page {
            key: Some("albums"),
            kind: KindRule::Fixed(EntityKind::Album),
            wrapper: None,
        },
    },
];
