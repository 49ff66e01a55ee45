// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use hookcast::config::{AgentConfig, InstanceStrategy};
use hookcast::control::spawn_signal_surface;
use hookcast::error::AgentError;
use hookcast::instance::LockFile;
use hookcast::spawn::DetachedSpawner;
use hookcast::startup::{self, Background, Interactive, SPAWN_GRACE};
use hookcast::transport::WsConnector;

#[tokio::main]
async fn main() {
    let config = AgentConfig::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    let code = if config.background { background(config).await } else { interactive(config).await };
    std::process::exit(code);
}

async fn interactive(config: AgentConfig) -> i32 {
    hookcast::logging::init_stderr(&config);

    let spawner = match DetachedSpawner::current_exe() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return e.exit_code();
        }
    };
    let launcher = Interactive {
        guard: startup::instance_guard(&config),
        connector: Arc::new(WsConnector),
        spawner: Box::new(spawner),
        grace: SPAWN_GRACE,
    };

    let result = launcher
        .run(&config, || {
            startup::prompt_address(&mut std::io::stdin().lock(), &mut std::io::stdout())
        })
        .await;

    match result {
        Ok(launched) => {
            println!(
                "hookcast is running in the background (pid {}), receiving from {}",
                launched.pid, launched.address
            );
            println!("logs: {}", config.log_dir.display());
            0
        }
        Err(AgentError::AlreadyRunning) => {
            println!("hookcast is already running in the background");
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

async fn background(config: AgentConfig) -> i32 {
    match hookcast::logging::init_file(&config) {
        Ok(path) => info!(path = %path.display(), "logging to file"),
        Err(e) => {
            eprintln!("error: {e:#}");
            return 1;
        }
    }

    let shutdown = CancellationToken::new();
    let (actions, rx) = mpsc::channel(8);
    if let Err(e) = spawn_signal_surface(actions, shutdown.clone()) {
        error!("cannot install signal handlers: {e:#}");
        return 1;
    }

    let notifier = startup::notifier(&config);
    let lock = match config.instance_strategy() {
        Ok(InstanceStrategy::Lockfile) => Some(LockFile::new(config.lock_path())),
        _ => None,
    };
    let worker = Background {
        guard: startup::instance_guard(&config),
        lock,
        connector: Arc::new(WsConnector),
        sink: startup::pipeline(Arc::clone(&notifier)),
        notifier,
    };

    match worker.run(&config, rx, shutdown).await {
        Ok(()) => 0,
        Err(AgentError::AlreadyRunning) => {
            info!("another background worker is active, exiting");
            0
        }
        Err(e) => {
            error!(code = e.as_str(), "fatal: {e}");
            e.exit_code()
        }
    }
}
