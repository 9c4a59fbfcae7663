use std::collections::HashMap;

use {anyhow::Result, async_trait::async_trait, wegate_common::Reply};

use crate::context::MsgContext;

/// Core channel plugin trait. Each messaging backend implements this.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel identifier (e.g. "wcferry", "wework", "wechatmp").
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Perform the login handshake, load the directory snapshot, and start
    /// the event loop. Returns once the channel is running.
    async fn startup(&self) -> Result<()>;

    /// Cooperative shutdown: flush state, stop background tasks.
    async fn shutdown(&self) -> Result<()>;
}

/// Send a reply through a channel's vendor API.
///
/// Implementations map each reply kind onto the matching vendor primitive,
/// materializing remote media first. They log a `{kind, receiver, success}`
/// outcome per send and never panic past their boundary; the only error the
/// caller is expected to branch on is `Error::UnsupportedReply`.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send(&self, reply: &Reply, receiver: &str) -> crate::Result<()>;
}

/// The pluggable conversational backend.
///
/// `Ok(None)` means "nothing to say"; the router simply drops the event.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, ctx: &MsgContext) -> Result<Option<Reply>>;
}

/// Registry of the loaded channel plugins, keyed by id.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, Box<dyn Channel>>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    pub fn register(&mut self, channel: Box<dyn Channel>) {
        self.channels.insert(channel.id().to_string(), channel);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn Channel> {
        self.channels.get(id).map(|c| c.as_ref())
    }

    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.channels.keys().map(|s| s.as_str()).collect()
    }
}
