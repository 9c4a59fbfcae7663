//! Cached directory of contacts, groups and group members.
//!
//! The directory is the single place display names are resolved. It serves
//! lookups from memory, falls back to a live vendor query for unknown ids,
//! and persists every membership mutation straight to disk so a restart
//! starts from the last known state instead of an empty map.

pub mod cache;
pub mod error;
pub mod source;
pub mod store;
pub mod types;

pub use {
    cache::Directory,
    error::{Error, Result},
    source::{DirectorySource, EmptySource},
    store::DirectoryStore,
    types::{Group, GroupMember, Identity},
};
