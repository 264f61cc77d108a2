use album_bot::config::Args;
use album_bot::http::HttpClient;
use album_bot::scheduler::{DailyScheduler, ScheduledJob};
use album_bot::shutdown::{wait_for_signal, Shutdown};
use album_bot::supervisor::supervise;
use album_bot::{Bot, DiscordClient, Gateway, GoogleSheetsSource, HistoryStore, RatingScale, SpotifyCatalog};
use anyhow::Context;
use clap::Parser;
use interfaces::defs::CatalogLookup;
use interfaces::NoCatalog;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const REACTION_QUEUE: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "album_bot=info".into()))
        .init();

    let config = Args::parse().into_config().context("Invalid configuration")?;
    info!(
        "Starting album bot: channel {}, daily post at {}, {}-point ratings",
        config.discord.channel_id, config.post_time, config.rating_scale
    );

    let http = HttpClient::new(config.http.clone()).context("Failed to create HTTP client")?;
    let source = Arc::new(GoogleSheetsSource::new(http.clone(), config.sheet.clone()));
    let catalog: Arc<dyn CatalogLookup> = match &config.spotify {
        Some(credentials) => Arc::new(SpotifyCatalog::new(http.clone(), credentials.clone())),
        None => {
            warn!("No Spotify credentials configured, albums will be posted without links or art");
            Arc::new(NoCatalog)
        }
    };
    let chat = Arc::new(DiscordClient::new(http.clone(), config.discord.clone())?);
    let history = HistoryStore::load(&config.history_path)
        .with_context(|| format!("Failed to load history from {}", config.history_path.display()))?;
    info!("{} albums already posted", history.len());
    let scale = RatingScale::keycaps(config.rating_scale)?;

    let bot = Arc::new(Bot::new(source, catalog, chat, history, scale));
    let (trigger, shutdown) = Shutdown::channel();
    let (reaction_tx, reaction_rx) = mpsc::channel(REACTION_QUEUE);

    let consumer = {
        let bot = bot.clone();
        tokio::spawn(async move { bot.process_reactions(reaction_rx).await })
    };

    let gateway_task = {
        let gateway = Arc::new(Gateway::new(config.discord.clone()));
        let policy = config.restart.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            supervise("discord gateway", &policy, shutdown.clone(), move || {
                let gateway = gateway.clone();
                let events = reaction_tx.clone();
                let shutdown = shutdown.clone();
                async move { gateway.run(events, shutdown).await }
            })
            .await
        })
    };

    if config.post_now {
        if let Err(e) = bot.post_next_album().await {
            error!("Immediate post failed: {}", e);
        }
    }

    let scheduler_task = {
        let scheduler = Arc::new(DailyScheduler::new(config.post_time));
        let job: Arc<dyn ScheduledJob> = bot.clone();
        let policy = config.restart.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            supervise("daily scheduler", &policy, shutdown.clone(), move || {
                let scheduler = scheduler.clone();
                let job = job.clone();
                let shutdown = shutdown.clone();
                async move { scheduler.run(job, shutdown).await }
            })
            .await
        })
    };

    wait_for_signal().await;
    info!("Shutting down");
    trigger.trigger();

    for (name, task) in [("scheduler", scheduler_task), ("gateway", gateway_task)] {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("{} ended with error: {}", name, e),
            Err(e) => error!("{} task failed: {}", name, e),
        }
    }
    // Every sender is gone once the gateway supervisor returns.
    let _ = consumer.await;

    info!("Album bot stopped");
    Ok(())
}
