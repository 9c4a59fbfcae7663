//! Official-account channel.
//!
//! Events arrive pre-parsed from an external webhook server; this crate
//! classifies them and answers through the account's customer-service
//! message API. Single chats only; the platform has no groups.

pub mod channel;
pub mod classify;
pub mod client;
pub mod event;
pub mod outbound;

#[cfg(test)]
pub(crate) mod testutil;

pub use {
    channel::{WechatmpChannel, WechatmpConfig},
    classify::classify,
    client::MpClient,
    event::MpEvent,
    outbound::MpOutbound,
};
