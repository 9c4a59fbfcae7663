mod terminal;

use std::{path::PathBuf, sync::Arc};

use {
    chrono::{NaiveTime, Timelike},
    clap::Parser,
    tracing::{error, info, warn},
    tracing_subscriber::EnvFilter,
};

use {
    wegate_channels::{Channel, Responder},
    wegate_config::GateConfig,
    wegate_responder::EchoResponder,
};

/// Interval between maintenance checks (scheduled restart).
const MAINTENANCE_TICK_SECS: u64 = 30;

#[derive(Parser)]
#[command(name = "wegate", about = "wegate - WeChat bot gateway")]
struct Cli {
    /// Explicit config file (otherwise discovered in ./ and ~/.config/wegate/).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Run the interactive terminal channel instead of the configured one.
    #[arg(long, default_value_t = false)]
    cmd: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => wegate_config::load_config(path)?,
        None => wegate_config::discover_and_load(),
    };

    let level = if config.debug && cli.log_level == "info" {
        "debug"
    } else {
        cli.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let channel_type = if cli.cmd {
        "terminal".to_string()
    } else {
        config.channel_type.clone()
    };
    info!(%channel_type, "starting gateway");

    let responder: Arc<dyn Responder> = Arc::new(EchoResponder);
    let channel: Arc<dyn Channel> = build_channel(&channel_type, responder, &config)?;

    channel.startup().await?;

    if let Some(mark) = config.restart_mark() {
        spawn_restart_check(mark, Arc::clone(&channel));
    } else if config.restart_time.is_some() {
        error!(
            restart_time = config.restart_time.as_deref().unwrap_or(""),
            "invalid restart_time, expected HH:MM; scheduled restart disabled"
        );
    }

    wait_for_shutdown(channel).await
}

fn build_channel(
    channel_type: &str,
    responder: Arc<dyn Responder>,
    config: &GateConfig,
) -> anyhow::Result<Arc<dyn Channel>> {
    match channel_type {
        "terminal" => Ok(Arc::new(terminal::TerminalChannel::new(
            responder,
            config.speech_recognition,
        ))),
        // The messaging channels need their vendor client bindings, which
        // live outside this repository. Embed wegate as a library and hand
        // your client to WcferryChannel/WeworkChannel/WechatmpChannel.
        "wcferry" | "wework" | "wechatmp" => anyhow::bail!(
            "channel '{channel_type}' requires vendor client bindings; \
             run with --cmd for the terminal channel"
        ),
        other => anyhow::bail!("unknown channel_type '{other}'"),
    }
}

/// First interrupt: cooperative shutdown. Second interrupt: immediate exit.
async fn wait_for_shutdown(channel: Arc<dyn Channel>) -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");

    let shutdown = async {
        if let Err(e) = channel.shutdown().await {
            warn!(error = %e, "shutdown incomplete");
        }
    };
    tokio::select! {
        () = shutdown => Ok(()),
        result = tokio::signal::ctrl_c() => {
            result?;
            warn!("second interrupt, exiting immediately");
            std::process::exit(1);
        }
    }
}

/// Daily restart: once the local time crosses the configured mark, flush
/// and exit 0 so the external process manager brings the gateway back up.
fn spawn_restart_check(mark: (u32, u32), channel: Arc<dyn Channel>) {
    let Some(mark_time) = NaiveTime::from_hms_opt(mark.0, mark.1, 0) else {
        return;
    };
    tokio::spawn(async move {
        let mut previous = chrono::Local::now().time();
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(MAINTENANCE_TICK_SECS)).await;
            let now = chrono::Local::now().time();
            let crossed = if previous <= now {
                previous < mark_time && mark_time <= now
            } else {
                // Midnight wrap.
                mark_time > previous || mark_time <= now
            };
            if crossed {
                info!(
                    hour = mark_time.hour(),
                    minute = mark_time.minute(),
                    "daily restart time reached, shutting down"
                );
                if let Err(e) = channel.shutdown().await {
                    warn!(error = %e, "flush before restart failed");
                }
                std::process::exit(0);
            }
            previous = now;
        }
    });
}
