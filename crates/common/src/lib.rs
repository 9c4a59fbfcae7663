//! Shared message taxonomy and reply types used across all wegate crates.

pub mod kinds;
pub mod reply;

pub use {
    kinds::{ChatType, MessageKind},
    reply::{Reply, ReplyKind},
};
