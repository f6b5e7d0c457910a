//! Multi-room Texas Hold'em server.
//!
//! All state is in-memory for the life of the process; the engine crate is
//! the single source of truth and this binary is the HTTP shell around it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use ctrlc::set_handler;
use pico_args::Arguments;
use holdem_rooms::store::{MemoryStore, StoreConfig};

use hr_server::{api, config::ServerConfig, logging, metrics};

const HELP: &str = "\
Run a multi-room Texas Hold'em server

USAGE:
  hr_server [OPTIONS]

OPTIONS:
  --bind        IP:PORT    HTTP bind address        [default: env HR_BIND or 127.0.0.1:8080]
  --static-dir  PATH       Static web UI directory  [default: env HR_STATIC_DIR or web/static]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  HR_BIND                  HTTP bind address (e.g. 0.0.0.0:8080)
  HR_METRICS_BIND          Prometheus exporter bind address
  HR_STATIC_DIR            Static web UI directory
  HR_STARTING_STACK        Chips a player sits down with
  HR_IDLE_TIMEOUT_SECS     Inactivity before a user is swept out
  HR_SWEEP_INTERVAL_SECS   Idle sweeper tick period
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // dotenvy does not override variables that are already set.
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }
    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let static_dir_override: Option<PathBuf> = pargs.opt_value_from_str("--static-dir")?;

    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, static_dir_override)?;
    config.validate()?;

    if let Err(e) = metrics::init_metrics(config.metrics_bind) {
        tracing::warn!("metrics unavailable: {e}");
    } else {
        tracing::info!(
            "metrics endpoint at http://{}/metrics",
            config.metrics_bind
        );
    }

    let store = Arc::new(MemoryStore::with_config(StoreConfig {
        starting_stack: config.starting_stack,
        idle_timeout_secs: config.idle_timeout_secs,
    }));

    // Idle-user sweeper: the victim list is computed without holding any
    // room work open, and removal goes through the public leave path.
    let sweeper_store = store.clone();
    let sweep_interval = config.sweep_interval_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            let removed = sweeper_store.sweep_idle();
            if !removed.is_empty() {
                tracing::info!("swept {} idle user(s)", removed.len());
                metrics::idle_users_swept_total(removed.len());
            }
            let (rooms, _) = sweeper_store.list_rooms();
            metrics::rooms_active(rooms.len());
        }
    });

    let state = api::AppState { store };
    let app = api::create_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {e}", config.bind))?;

    tracing::info!(
        "server running at http://{} (static ui from {})",
        config.bind,
        config.static_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    tracing::info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
}
