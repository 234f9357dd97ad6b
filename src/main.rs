//! live-channel entry point.
//!
//! Opens the live channel for a game page, prints inbound messages to
//! stdout, and sends a timestamp for every line read from stdin.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use live_channel::channel::{
    self, ActivationControl, ConnectOptions, DisconnectReason, SessionController,
    TerminalDisplay,
};
use live_channel::config::{ChannelConfig, LogFormat};
use live_channel::domain::LineFormat;
use live_channel::error::ChannelError;

/// Command-line flags; each overrides its environment variable.
#[derive(Debug, Parser)]
#[command(name = "live-channel", version, about = "Live message channel client for a game page")]
struct Cli {
    /// Game page URL, e.g. `http://localhost:7777/games/abc123/`.
    #[arg(env = "LIVE_CHANNEL_PAGE_URL")]
    page_url: Option<String>,

    /// Line format for inbound messages: plain, paragraph or json.
    #[arg(long)]
    format: Option<LineFormat>,

    /// Seconds allowed for the WebSocket handshake.
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// `Cookie` header sent with the upgrade request (player session).
    #[arg(long)]
    cookie: Option<String>,

    /// Do not read stdin; only print inbound messages until Ctrl-C.
    #[arg(long)]
    listen_only: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ChannelConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("live-channel: {e}");
            return ExitCode::from(e.exit_code());
        }
    };
    init_tracing(config.log_format);

    match run(cli, config).await {
        Ok(reason) if reason.is_clean() => ExitCode::SUCCESS,
        Ok(reason) => {
            tracing::error!(%reason, "session ended abnormally");
            ExitCode::from(74)
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "live-channel failed");
            ExitCode::from(
                e.downcast_ref::<ChannelError>()
                    .map_or(1, ChannelError::exit_code),
            )
        }
    }
}

async fn run(cli: Cli, config: ChannelConfig) -> anyhow::Result<DisconnectReason> {
    // wss endpoints need a process-wide rustls provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let page_url = cli
        .page_url
        .or(config.page_url.clone())
        .ok_or_else(|| ChannelError::Config("no page url given".to_string()))?;
    let format = cli.format.unwrap_or(config.line_format);
    let connect_timeout = cli
        .connect_timeout
        .map_or_else(|| config.connect_timeout(), std::time::Duration::from_secs);
    let mut options = ConnectOptions::new(connect_timeout);
    if let Some(cookie) = cli.cookie.or(config.cookie.clone()) {
        options = options.with_cookie(cookie);
    }

    let mut controller: SessionController<_> =
        SessionController::new(&page_url, format, TerminalDisplay::stdio())
            .with_context(|| format!("cannot start a session from {page_url}"))?;
    tracing::info!(
        session = %controller.session(),
        endpoint = %controller.endpoint(),
        %format,
        "starting live channel"
    );

    let (control, activations) = channel::activation::control(config.activation_buffer);
    let _held = if cli.listen_only {
        Some(control)
    } else {
        tokio::spawn(forward_stdin(control));
        None
    };

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        tracing::info!("interrupt received");
    };

    let reason = channel::run_session(&mut controller, activations, &options, shutdown)
        .await
        .with_context(|| format!("session {} failed", controller.session()))?;

    tracing::info!(
        received = controller.received_count(),
        sent = controller.sent_count(),
        %reason,
        "session finished"
    );
    Ok(reason)
}

/// Turns every stdin line into one activation; EOF drops the control.
async fn forward_stdin(control: ActivationControl) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(_)) => {
                if !control.activate().await {
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!("stdin closed");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
