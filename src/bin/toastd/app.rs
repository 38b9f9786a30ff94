use std::path::PathBuf;
use std::sync::Arc;

use async_channel::{Sender, bounded};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use toast_engine::Result;
use toast_engine::config::Settings;
use toast_engine::container::ClassList;
use toast_engine::host::{Host, InstallOptions, install};
use toast_engine::registry::Registry;
use toast_engine::store::{JsonFileStore, KeyValueStore, MemoryStore};
use toast_engine::telemetry::init_tracing;
use toast_engine::transition::TimedTransitions;
use toast_engine::types::Direction;
use toast_engine::viewport::Viewport;
use toast_engine::Collaborators;
use tracing::{debug, info, warn};

use super::cli::Cli;
use super::commands::{Command, run_commands};

const DEFAULT_CONFIG: &str = "toasts.toml";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut settings = Settings::from_env_and_file(&config_path)?;
    apply_cli(&mut settings, &cli);

    let store: Arc<dyn KeyValueStore> = match &settings.store_path {
        Some(path) => Arc::new(JsonFileStore::open(path)),
        None => Arc::new(MemoryStore::new()),
    };
    let collaborators = Collaborators {
        transitions: Arc::new(TimedTransitions),
        store,
        viewport: Arc::new(Viewport::new(settings.constrained)),
        root: Arc::new(ClassList::new()),
    };

    let mut host = Host::new();
    let toaster = install(&mut host, InstallOptions::from_settings(&settings, collaborators));
    let container = toaster.open(toaster.default_container());
    info!(
        container = container.name(),
        collapsed = container.collapsed(),
        config = %config_path.display(),
        "toastd ready; reading commands from stdin"
    );

    let mut events = container.channel().subscribe();
    let event_log = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(toast = event.id(), ?event, "channel event");
        }
    });

    let name = container.name().to_string();
    let (tx, rx) = bounded(settings.engine.channel_capacity);
    let reader = tokio::spawn(read_commands(tx));
    let worker = tokio::spawn(run_commands(rx, toaster.clone(), container));

    let input_done = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("shutdown signal received, stopping");
            false
        }
        res = worker => {
            if let Err(err) = res {
                warn!(error = %err, "command worker terminated unexpectedly");
            }
            true
        }
    };
    if input_done {
        tokio::select! {
            _ = signal::ctrl_c() => info!("shutdown signal received, skipping drain"),
            () = drain_timed(toaster.registry(), &name) => {}
        }
    }

    event_log.abort();
    toaster.close_all();
    if !reader.is_finished() {
        reader.abort();
        return Ok(());
    }
    match reader.await {
        Ok(res) => res,
        Err(err) => {
            warn!(error = %err, "stdin reader terminated unexpectedly");
            Ok(())
        }
    }
}

/// Wait until only sticky toasts remain, so timed toasts and a pending
/// `clear` close through their handlers. A paused toast holds this open
/// until ctrl-c.
async fn drain_timed(registry: &Arc<Registry>, container: &str) {
    let mut toasts = registry.watch(container);
    loop {
        let pending = toasts.current().iter().filter(|record| !record.is_sticky()).count();
        if pending == 0 {
            return;
        }
        info!(container, pending, "end of input; waiting for timed toasts");
        if !toasts.changed().await {
            return;
        }
    }
}

fn apply_cli(settings: &mut Settings, cli: &Cli) {
    if let Some(container) = &cli.container {
        settings.default_container = Some(container.clone());
    }
    if cli.constrained {
        settings.constrained = true;
    }
    if cli.rtl {
        settings.direction = Direction::Rtl;
    }
    if let Some(store) = &cli.store {
        settings.store_path = Some(store.clone());
    }
}

/// Feed parsed stdin lines into the queue; closes it at end of input.
async fn read_commands(tx: Sender<Command>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let outcome = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(err) => break Err(err.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                if tx.send(command).await.is_err() {
                    break Ok(());
                }
            }
            Err(err) => warn!(error = %err, line = %line, "ignoring command"),
        }
    };
    tx.close();
    outcome
}

#[cfg(test)]
mod tests {
    use super::drain_timed;
    use std::sync::Arc;
    use std::time::Duration;
    use toast_engine::config::EngineSettings;
    use toast_engine::options::Defaults;
    use toast_engine::{Collaborators, CreateOptions, Registry, Toaster};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_timed_toasts_only() {
        let toaster = Toaster::new(
            Arc::new(Registry::new()),
            Arc::new(Defaults::default()),
            Collaborators::default(),
            EngineSettings::default(),
        );
        let _container = toaster.open("main");
        toaster.simple("pinned", CreateOptions::new().container("main").sticky());
        toaster.simple(
            "saved",
            CreateOptions::new()
                .container("main")
                .duration(Duration::from_secs(1)),
        );

        let started = Instant::now();
        drain_timed(toaster.registry(), "main").await;
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(toaster.registry().container_toasts("main").len(), 1);
    }
}
