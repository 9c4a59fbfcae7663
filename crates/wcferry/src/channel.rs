use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    rand::Rng,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {
    wegate_channels::{Channel, Error, Responder, Router},
    wegate_directory::{Directory, DirectorySource, DirectoryStore, Group, Identity},
};

use crate::{
    classify::Classifier,
    client::WcfClient,
    event::{WcfEvent, codes},
    outbound::WcfOutbound,
    xmlutil,
};

/// Delay before the first deep directory refresh: the desktop client needs
/// a moment after login to finish its own database sync.
const INITIAL_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Channel settings lifted from the gateway config.
#[derive(Debug, Clone)]
pub struct WcferryConfig {
    pub data_dir: PathBuf,
    pub media_max_bytes: u64,
    pub accept_friend: bool,
    pub speech_recognition: bool,
}

/// Desktop WeChat channel lifecycle: login handshake, directory snapshot,
/// event loop, background refresh, cooperative shutdown.
pub struct WcferryChannel {
    client: Arc<dyn WcfClient>,
    responder: Arc<dyn Responder>,
    config: WcferryConfig,
    directory: Arc<Directory>,
    cancel: CancellationToken,
    event_loop: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl WcferryChannel {
    /// Build the channel, seeding the directory from the on-disk snapshot
    /// (live fetches wait for the background refresh).
    pub fn new(
        client: Arc<dyn WcfClient>,
        responder: Arc<dyn Responder>,
        config: WcferryConfig,
    ) -> anyhow::Result<Self> {
        let source = Arc::new(ClientDirectorySource {
            client: Arc::clone(&client),
        });
        let store = DirectoryStore::new(&config.data_dir);
        let directory = Arc::new(Directory::load(source, store)?);
        Ok(Self {
            client,
            responder,
            config,
            directory,
            cancel: CancellationToken::new(),
            event_loop: std::sync::Mutex::new(None),
        })
    }

    #[must_use]
    pub fn directory(&self) -> Arc<Directory> {
        Arc::clone(&self.directory)
    }

    async fn run_event_loop(
        client: Arc<dyn WcfClient>,
        classifier: Classifier,
        router: Arc<Router>,
        accept_friend: bool,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => break,
                event = client.next_event() => event,
            };
            match event {
                Ok(Some(event)) => {
                    if event.type_code == codes::FRIEND_REQUEST {
                        handle_friend_request(&client, &event, accept_friend);
                        continue;
                    }
                    match classifier.classify(event).await {
                        Ok(msg) => router.route(msg),
                        Err(Error::UnsupportedMessage { vendor_type }) => {
                            debug!(%vendor_type, "message skipped");
                        }
                        Err(e) => {
                            warn!(error = %e, "classification failed, dropping event");
                        }
                    }
                }
                Ok(None) => {
                    info!("event stream closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "event receive failed, retrying");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
        info!("event loop stopped");
    }
}

#[async_trait]
impl Channel for WcferryChannel {
    fn id(&self) -> &str {
        "wcferry"
    }

    fn name(&self) -> &str {
        "WeChat (desktop)"
    }

    async fn startup(&self) -> anyhow::Result<()> {
        info!("waiting for wechat login");
        let self_info = self.client.get_self_info().await?;
        info!(user_id = %self_info.id, name = %self_info.name, "logged in");

        let classifier = Classifier::new(
            Arc::clone(&self.client),
            self.directory(),
            self_info,
            self.config.data_dir.clone(),
            self.config.media_max_bytes,
        );
        let outbound = Arc::new(WcfOutbound::new(
            Arc::clone(&self.client),
            self.directory(),
            self.config.data_dir.clone(),
            self.config.media_max_bytes,
        ));
        let router = Arc::new(Router::new(
            Arc::clone(&self.responder),
            outbound,
            self.config.speech_recognition,
        ));

        self.directory
            .spawn_refresh(INITIAL_REFRESH_DELAY, self.cancel.child_token());

        // Smoke message to the self-chat so the operator sees the login
        // completed; failures here are not fatal.
        let greeting = format!("wegate {} 启动成功！", env!("CARGO_PKG_VERSION"));
        if let Err(e) = self.client.send_text("filehelper", &greeting).await {
            warn!(error = %e, "startup greeting failed");
        }

        let handle = tokio::spawn(Self::run_event_loop(
            Arc::clone(&self.client),
            classifier,
            router,
            self.config.accept_friend,
            self.cancel.child_token(),
        ));
        *self.event_loop.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        info!("shutting down wcferry channel");
        self.cancel.cancel();
        let handle = self
            .event_loop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.directory.persist();
        Ok(())
    }
}

/// Friend requests carry their handshake parameters as root attributes.
fn parse_friend_request(xml: &str) -> Option<(String, String, i32)> {
    let encrypt_username = xmlutil::first_attr(xml, "msg", "encryptusername")?;
    let ticket = xmlutil::first_attr(xml, "msg", "ticket")?;
    let scene = xmlutil::first_attr(xml, "msg", "scene")?.parse().ok()?;
    Some((encrypt_username, ticket, scene))
}

fn handle_friend_request(client: &Arc<dyn WcfClient>, event: &WcfEvent, accept: bool) {
    if !accept {
        debug!("friend auto-accept disabled");
        return;
    }
    let Some((encrypt_username, ticket, scene)) = parse_friend_request(event.xml()) else {
        warn!("friend request with unparseable handshake payload");
        return;
    };

    // Accept after a randomized delay so it does not look scripted.
    let delay = {
        let mut rng = rand::rng();
        Duration::from_secs(rng.random_range(1..=180))
    };
    let client = Arc::clone(client);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = client
            .accept_friend_request(&encrypt_username, &ticket, scene)
            .await
        {
            warn!(error = %e, "friend accept failed");
        }
    });
}

/// Directory view over the automation client.
struct ClientDirectorySource {
    client: Arc<dyn WcfClient>,
}

#[async_trait]
impl DirectorySource for ClientDirectorySource {
    async fn fetch_contacts(
        &self,
    ) -> wegate_directory::Result<std::collections::HashMap<String, Identity>> {
        let contacts = self
            .client
            .get_contacts()
            .await
            .map_err(|e| wegate_directory::Error::vendor("fetch contacts", e))?;
        Ok(contacts.into_iter().map(|c| (c.id.clone(), c)).collect())
    }

    async fn fetch_groups(
        &self,
    ) -> wegate_directory::Result<std::collections::HashMap<String, Group>> {
        let groups = self
            .client
            .get_groups()
            .await
            .map_err(|e| wegate_directory::Error::vendor("fetch groups", e))?;
        Ok(groups.into_iter().map(|g| (g.id.clone(), g)).collect())
    }

    async fn query_display_name(&self, id: &str) -> wegate_directory::Result<Option<String>> {
        self.client
            .query_display_name(id)
            .await
            .map_err(|e| wegate_directory::Error::vendor("query display name", e))
    }
}
