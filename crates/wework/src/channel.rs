use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {
    wegate_channels::{Channel, Error, Responder, Router},
    wegate_directory::{Directory, DirectorySource, DirectoryStore, Group, Identity},
};

use crate::{classify::Classifier, client::WeworkClient, outbound::WeworkOutbound};

/// Delay before the first deep directory refresh after login.
const INITIAL_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Bounded retry for vendor directory queries; the client returns empty
/// results while its own sync is still warming up.
const FETCH_RETRIES: usize = 5;
const FETCH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Channel settings lifted from the gateway config.
#[derive(Debug, Clone)]
pub struct WeworkConfig {
    pub data_dir: PathBuf,
    pub media_max_bytes: u64,
    pub speech_recognition: bool,
}

/// Enterprise WeChat channel lifecycle.
pub struct WeworkChannel {
    client: Arc<dyn WeworkClient>,
    responder: Arc<dyn Responder>,
    config: WeworkConfig,
    directory: Arc<Directory>,
    cancel: CancellationToken,
    event_loop: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl WeworkChannel {
    pub fn new(
        client: Arc<dyn WeworkClient>,
        responder: Arc<dyn Responder>,
        config: WeworkConfig,
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
}

#[async_trait]
impl Channel for WeworkChannel {
    fn id(&self) -> &str {
        "wework"
    }

    fn name(&self) -> &str {
        "WeChat (enterprise)"
    }

    async fn startup(&self) -> anyhow::Result<()> {
        info!("waiting for enterprise wechat login");
        let login = self.client.get_login_info().await?;
        info!(user_id = %login.user_id, name = login.display_name(), "logged in");

        let classifier = Classifier::new(
            Arc::clone(&self.client),
            self.directory(),
            login,
            self.config.data_dir.clone(),
        );
        let outbound = Arc::new(WeworkOutbound::new(
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

        let client = Arc::clone(&self.client);
        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    () = cancel.cancelled() => break,
                    event = client.next_event() => event,
                };
                match event {
                    Ok(Some(event)) => match classifier.classify(event).await {
                        Ok(msg) => router.route(msg),
                        Err(Error::UnsupportedMessage { vendor_type }) => {
                            debug!(%vendor_type, "message skipped");
                        }
                        Err(e) => warn!(error = %e, "classification failed, dropping event"),
                    },
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
        });
        *self.event_loop.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        info!("shutting down wework channel");
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

/// Directory view over the enterprise client, with bounded retry around
/// the flaky warm-up window.
struct ClientDirectorySource {
    client: Arc<dyn WeworkClient>,
}

impl ClientDirectorySource {
    async fn rooms_with_rosters(&self) -> wegate_channels::Result<Vec<Group>> {
        let mut rooms = self.client.get_rooms().await?;
        for room in &mut rooms {
            match self.client.get_room_members(&room.id).await {
                Ok(members) => room.members = members,
                Err(e) => {
                    warn!(room_id = %room.id, error = %e, "roster fetch failed, keeping empty");
                }
            }
        }
        Ok(rooms)
    }
}

#[async_trait]
impl DirectorySource for ClientDirectorySource {
    async fn fetch_contacts(&self) -> wegate_directory::Result<HashMap<String, Identity>> {
        let mut last_err = None;
        for attempt in 1..=FETCH_RETRIES {
            match self.client.get_external_contacts().await {
                Ok(contacts) if !contacts.is_empty() => {
                    return Ok(contacts.into_iter().map(|c| (c.id.clone(), c)).collect());
                }
                Ok(_) => {
                    debug!(attempt, "contact list still empty, retrying");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "contact fetch failed");
                    last_err = Some(e);
                }
            }
            if attempt < FETCH_RETRIES {
                tokio::time::sleep(FETCH_RETRY_DELAY).await;
            }
        }
        match last_err {
            Some(e) => Err(wegate_directory::Error::vendor("fetch contacts", e)),
            None => Ok(HashMap::new()),
        }
    }

    async fn fetch_groups(&self) -> wegate_directory::Result<HashMap<String, Group>> {
        let mut last_err = None;
        for attempt in 1..=FETCH_RETRIES {
            match self.rooms_with_rosters().await {
                Ok(rooms) if !rooms.is_empty() => {
                    return Ok(rooms.into_iter().map(|g| (g.id.clone(), g)).collect());
                }
                Ok(_) => debug!(attempt, "room list still empty, retrying"),
                Err(e) => {
                    warn!(attempt, error = %e, "room fetch failed");
                    last_err = Some(e);
                }
            }
            if attempt < FETCH_RETRIES {
                tokio::time::sleep(FETCH_RETRY_DELAY).await;
            }
        }
        match last_err {
            Some(e) => Err(wegate_directory::Error::vendor("fetch rooms", e)),
            None => Ok(HashMap::new()),
        }
    }

    async fn query_display_name(&self, id: &str) -> wegate_directory::Result<Option<String>> {
        let detail = self
            .client
            .get_contact_detail(id)
            .await
            .map_err(|e| wegate_directory::Error::vendor("contact detail", e))?;
        Ok(detail.map(|c| c.name).filter(|n| !n.is_empty()))
    }
}
