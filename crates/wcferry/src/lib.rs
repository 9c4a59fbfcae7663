//! Desktop WeChat channel, driven by an automation RPC client.
//!
//! The RPC bindings themselves live behind the [`WcfClient`] trait; this
//! crate owns event classification, reply dispatch, and the channel
//! lifecycle around them.

pub mod channel;
pub mod classify;
pub mod client;
pub mod event;
pub mod outbound;
pub mod xmlutil;

#[cfg(test)]
pub(crate) mod testutil;

pub use {
    channel::{WcferryChannel, WcferryConfig},
    classify::Classifier,
    client::{RichLink, SelfInfo, WcfClient},
    event::WcfEvent,
    outbound::WcfOutbound,
};
