use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    tracing::{debug, info, warn},
};

use wegate_channels::{Channel, Error, Responder, Router};

use crate::{classify, client::MpClient, event::MpEvent, outbound::MpOutbound};

/// Channel settings lifted from the gateway config.
#[derive(Debug, Clone)]
pub struct WechatmpConfig {
    pub data_dir: PathBuf,
    pub media_max_bytes: u64,
    pub speech_recognition: bool,
    /// Announced display name; the platform API cannot query it.
    pub bot_name: Option<String>,
}

/// Official-account channel.
///
/// Unlike the polling channels there is no event loop to own: the webhook
/// serving layer feeds [`WechatmpChannel::handle_event`] directly.
pub struct WechatmpChannel {
    client: Arc<dyn MpClient>,
    config: WechatmpConfig,
    router: Arc<Router>,
}

impl WechatmpChannel {
    #[must_use]
    pub fn new(
        client: Arc<dyn MpClient>,
        responder: Arc<dyn Responder>,
        config: WechatmpConfig,
    ) -> Self {
        let outbound = Arc::new(MpOutbound::new(
            Arc::clone(&client),
            config.data_dir.clone(),
            config.media_max_bytes,
        ));
        let router = Arc::new(Router::new(responder, outbound, config.speech_recognition));
        Self {
            client,
            config,
            router,
        }
    }

    /// Entry point for the webhook serving layer.
    pub fn handle_event(&self, event: &MpEvent) {
        match classify(
            event,
            &self.client,
            self.config.bot_name.as_deref(),
            &self.config.data_dir,
        ) {
            Ok(msg) => self.router.route(msg),
            Err(Error::UnsupportedMessage { vendor_type }) => {
                debug!(%vendor_type, "webhook event skipped");
            }
            Err(e) => warn!(error = %e, "classification failed, dropping event"),
        }
    }
}

#[async_trait]
impl Channel for WechatmpChannel {
    fn id(&self) -> &str {
        "wechatmp"
    }

    fn name(&self) -> &str {
        "WeChat official account"
    }

    async fn startup(&self) -> anyhow::Result<()> {
        info!(
            bot_name = self.config.bot_name.as_deref().unwrap_or(""),
            "official-account channel ready"
        );
        Ok(())
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        info!("official-account channel stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {std::time::Duration, wegate_responder::EchoResponder};

    use super::*;
    use crate::{
        event::MpEventKind,
        testutil::{MockClient, Sent},
    };

    #[tokio::test]
    async fn webhook_text_event_round_trips_to_send() {
        let tmp = tempfile::tempdir().unwrap();
        let client = Arc::new(MockClient::default());
        let channel = WechatmpChannel::new(
            Arc::clone(&client) as Arc<dyn MpClient>,
            Arc::new(EchoResponder),
            WechatmpConfig {
                data_dir: tmp.path().to_path_buf(),
                media_max_bytes: 1024 * 1024,
                speech_recognition: false,
                bot_name: Some("assistant".into()),
            },
        );
        channel.startup().await.unwrap();

        channel.handle_event(&MpEvent {
            id: "m1".into(),
            kind: MpEventKind::Text,
            time: None,
            source: "openid-1".into(),
            target: "gh_acct".into(),
            content: "hello".into(),
            recognition: None,
            media_id: None,
            format: None,
        });
        // Routed tasks carry 1–2 s of jitter.
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(client.sent(), vec![Sent::Text {
            receiver: "openid-1".into(),
            text: "hello".into(),
        }]);
        channel.shutdown().await.unwrap();
    }
}
