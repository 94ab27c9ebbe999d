use std::sync::Arc;

use bubbletea_rs::Program;
use tracing::{error, info, warn};

use scene_countdown::{
    config::Config,
    error::Error,
    logging,
    overlay::{self, LaunchContext, OverlayController},
    ActionInvoker, ClientError, StreamerbotClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    logging::init(config.log_file.as_deref())?;

    if config.tick_is_suspect() {
        warn!(
            tick_ms = config.effective_tick_ms(),
            "a 1 ms tick keeps the event loop permanently busy; consider --tick-ms 10"
        );
    }

    let settings = config.overlay_settings()?;
    if settings.target.is_none() {
        warn!("no action configured; the countdown will only clear itself");
    }

    let options = config.client_options();
    let invoker = match StreamerbotClient::connect(&options).await {
        Ok(client) => {
            info!(url = %options.url(), "connected to Streamer.bot");
            ActionInvoker::new(Arc::new(client))
        }
        Err(err @ ClientError::Authentication(_)) => {
            warn!(error = %err, "Streamer.bot rejected the password, actions are disabled");
            ActionInvoker::disconnected()
        }
        Err(err) if options.reconnect_delay.is_some() => {
            warn!(error = %err, "Streamer.bot unavailable, retrying in the background");
            ActionInvoker::new(Arc::new(StreamerbotClient::connect_in_background(&options)))
        }
        Err(err) => {
            warn!(error = %err, "Streamer.bot unavailable, actions are disabled");
            ActionInvoker::disconnected()
        }
    };

    info!(
        duration_ms = settings.duration_ms,
        tick_ms = settings.tick_ms,
        "starting countdown overlay"
    );
    overlay::install(LaunchContext { settings, invoker });

    let program = Program::<OverlayController>::builder()
        .alt_screen(true)
        .build()
        .map_err(|err| Error::Terminal(err.to_string()))?;
    if let Err(err) = program.run().await {
        error!(error = %err, "overlay stopped unexpectedly");
        return Err(Error::Terminal(err.to_string()).into());
    }

    info!("overlay closed");
    Ok(())
}
