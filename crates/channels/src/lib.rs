//! Channel plugin system and conversation routing.
//!
//! Each messaging backend (desktop WeChat, enterprise WeChat, official
//! account) implements the [`Channel`] trait plus an outbound adapter; the
//! [`Router`] takes their normalized messages, filters replays, and hands a
//! context to the configured [`Responder`].

pub mod context;
pub mod error;
pub mod message;
pub mod plugin;
pub mod router;

pub use {
    context::MsgContext,
    error::{Error, Result},
    message::{MessageContent, NormalizedMessage, QuoteTarget},
    plugin::{Channel, ChannelOutbound, ChannelRegistry, Responder},
    router::Router,
};
