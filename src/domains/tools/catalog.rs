//! Endpoint catalog.
//!
//! The static, immutable table of every tool the server exposes. Built once
//! from the per-category definition tables and shared by reference.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::domains::spotify::endpoint::{Category, ToolDescriptor};

use super::ToolError;
use super::definitions::{analysis, library, playback, playlists, search};

static CATALOG: LazyLock<EndpointCatalog> = LazyLock::new(EndpointCatalog::build);

/// Lookup table of catalog entries, in declaration order.
#[derive(Debug)]
pub struct EndpointCatalog {
    entries: Vec<&'static ToolDescriptor>,
    by_name: HashMap<&'static str, &'static ToolDescriptor>,
}

impl EndpointCatalog {
    /// The process-wide catalog.
    pub fn global() -> &'static EndpointCatalog {
        &CATALOG
    }

    fn build() -> Self {
        let entries: Vec<&'static ToolDescriptor> = [
            search::TOOLS,
            library::TOOLS,
            playlists::TOOLS,
            playback::TOOLS,
            analysis::TOOLS,
        ]
        .into_iter()
        .flatten()
        .collect();

        let by_name = entries.iter().map(|d| (d.name, *d)).collect();
        Self { entries, by_name }
    }

    /// Find a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&'static ToolDescriptor, ToolError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ToolError::unknown_tool(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static ToolDescriptor> + '_ {
        self.entries.iter().copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|d| d.name).collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<&'static ToolDescriptor> {
        self.entries
            .iter()
            .copied()
            .filter(|d| d.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
