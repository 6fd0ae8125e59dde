//! Tool definitions module.
//!
//! Each category file declares its catalog entries as a static descriptor
//! table. Adding a tool means adding one descriptor to the right table.

pub mod analysis;
pub mod common;
pub mod library;
pub mod playback;
pub mod playlists;
pub mod search;

pub use common::MutationAck;
