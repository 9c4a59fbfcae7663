//! Enterprise WeChat channel.
//!
//! Same pipeline shape as the desktop channel, driven by the enterprise
//! client's much smaller event surface: text, image, voice and
//! member-joined notifications.

pub mod channel;
pub mod classify;
pub mod client;
pub mod event;
pub mod outbound;

#[cfg(test)]
pub(crate) mod testutil;

pub use {
    channel::{WeworkChannel, WeworkConfig},
    classify::Classifier,
    client::{CdnInfo, LoginInfo, WeworkClient},
    event::WeworkEvent,
    outbound::WeworkOutbound,
};
