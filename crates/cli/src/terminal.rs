use std::sync::Arc;

use {
    async_trait::async_trait,
    tokio::io::{AsyncBufReadExt, BufReader},
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use {
    wegate_channels::{
        Channel, ChannelOutbound, MessageContent, NormalizedMessage, Responder, Router,
    },
    wegate_common::{MessageKind, Reply},
};

/// Interactive channel over stdin/stdout, for trying a responder without
/// any vendor client.
pub struct TerminalChannel {
    router: Arc<Router>,
    cancel: CancellationToken,
    read_loop: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TerminalChannel {
    #[must_use]
    pub fn new(responder: Arc<dyn Responder>, speech_recognition: bool) -> Self {
        let router = Arc::new(Router::new(
            responder,
            Arc::new(StdoutOutbound),
            speech_recognition,
        ));
        Self {
            router,
            cancel: CancellationToken::new(),
            read_loop: std::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl Channel for TerminalChannel {
    fn id(&self) -> &str {
        "terminal"
    }

    fn name(&self) -> &str {
        "Terminal"
    }

    async fn startup(&self) -> anyhow::Result<()> {
        info!("terminal channel ready, type a message");
        let router = Arc::clone(&self.router);
        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = tokio::select! {
                    () = cancel.cancelled() => break,
                    line = lines.next_line() => line,
                };
                match line {
                    Ok(Some(line)) if !line.trim().is_empty() => {
                        router.route(line_message(line.trim()));
                    }
                    Ok(Some(_)) => {}
                    Ok(None) | Err(_) => break,
                }
            }
        });
        *self.read_loop.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        self.cancel.cancel();
        let handle = self
            .read_loop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        Ok(())
    }
}

fn line_message(line: &str) -> NormalizedMessage {
    NormalizedMessage {
        message_id: format!("term-{}", uuid_ish()),
        kind: MessageKind::Text,
        content: MessageContent::Text(line.to_string()),
        sender_id: "local".into(),
        sender_name: "local".into(),
        conversation_id: "local".into(),
        conversation_name: "terminal".into(),
        actual_sender_id: "local".into(),
        actual_sender_name: "local".into(),
        ..Default::default()
    }
}

/// Monotonic-enough id for console messages.
fn uuid_ish() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

struct StdoutOutbound;

#[async_trait]
impl ChannelOutbound for StdoutOutbound {
    async fn send(&self, reply: &Reply, _receiver: &str) -> wegate_channels::Result<()> {
        println!("[{}] {}", reply.kind, reply.content);
        Ok(())
    }
}
