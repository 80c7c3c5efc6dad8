use std::sync::Arc;

use tokio::sync::Notify;

mod error;
mod http;
mod simulation;

use simulation::command::channel;
use simulation::config::SimulationConfig;
use simulation::SimulationWorld;

/// Finds the most recently modified `checkpoint-*.json` file in `dir`, if any.
async fn latest_checkpoint(dir: &str) -> Option<(std::path::PathBuf, Vec<u8>)> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut newest: Option<(std::path::PathBuf, std::time::SystemTime)> = None;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_checkpoint = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("checkpoint-") && name.ends_with(".json"));
        if !is_checkpoint {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else { continue };
        let Ok(modified) = metadata.modified() else { continue };
        if newest.as_ref().is_none_or(|(_, t)| modified > *t) {
            newest = Some((path, modified));
        }
    }
    let (path, _) = newest?;
    let bytes = tokio::fs::read(&path).await.ok()?;
    Some((path, bytes))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SimulationConfig::from_env();
    let tick_duration = config.tick_duration;
    let host = config.host.clone();
    let port = config.port;

    if let Some(found) = latest_checkpoint(&config.checkpoint_dir).await {
        match simulation::snapshot::load_snapshot(&found.1) {
            Ok(document) => tracing::info!(
                path = %found.0.display(),
                tick = document.tick,
                era = %document.world.era,
                regions = document.metadata.regions,
                species = document.metadata.species,
                "found prior checkpoint on disk (world starts fresh; restoring live state from it is not supported)"
            ),
            Err(err) => tracing::warn!(path = %found.0.display(), error = %err, "found a checkpoint but failed to parse it"),
        }
    }

    let (command_sender, command_inbox) = channel();
    let mut simulation = SimulationWorld::new(config, command_inbox);
    let summary = simulation.summary.clone();

    let shutdown_notify = Arc::new(Notify::new());

    let tick_shutdown = shutdown_notify.clone();
    let tick_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_duration);
        loop {
            tokio::select! {
                _ = interval.tick() => simulation.tick(),
                _ = tick_shutdown.notified() => break,
            }
        }
    });

    let app_state = Arc::new(http::AppState::new(command_sender, summary));
    let router = http::build_router(app_state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "earthwatch listening");

    let http_shutdown = shutdown_notify.clone();
    let http_task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { http_shutdown.notified().await })
            .await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    shutdown_notify.notify_waiters();

    tick_task.await?;
    http_task.await??;

    Ok(())
}
