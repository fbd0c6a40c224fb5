use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use dupeguard_application::{EngineHandle, EngineState};
use dupeguard_domain::current_millis;
use dupeguard_infrastructure::{AppConfig, HttpSection, ReplaySource};
use dupeguard_interfaces_http::build_router;

use crate::context::AppContext;

const REPLAY_SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run_standalone(config: AppConfig, replay: Option<PathBuf>) -> Result<()> {
    let AppContext { config, engine } = AppContext::new(config).await?;

    let (http_shutdown_tx, http_shutdown_rx) = oneshot::channel::<()>();
    let http_task = if config.http.enabled {
        Some(spawn_http(&config.http, engine.state().clone(), http_shutdown_rx).await?)
    } else {
        None
    };

    match &replay {
        Some(path) => {
            tokio::select! {
                result = replay_file(&engine, path) => result?,
                _ = shutdown_signal() => info!("shutdown requested, stopping replay"),
            }
        }
        None => {
            info!("engine running, waiting for shutdown signal");
            shutdown_signal().await;
        }
    }

    let _ = http_shutdown_tx.send(());
    if let Some(task) = http_task {
        let _ = task.await;
    }

    let metrics = engine.state().metrics.clone();
    let report = engine
        .shutdown(Duration::from_millis(config.engine.shutdown_grace_ms))
        .await;
    if report.alerts_discarded > 0 || report.workers_aborted > 0 {
        warn!(
            "shutdown incomplete: {} workers aborted, {} evaluations and {} alerts discarded",
            report.workers_aborted, report.evaluations_discarded, report.alerts_discarded
        );
    }
    info!("final metrics: {}", serde_json::to_string(&metrics.snapshot())?);
    Ok(())
}

async fn spawn_http(
    http: &HttpSection,
    state: EngineState,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<JoinHandle<()>> {
    let addr: SocketAddr = http.bind.parse()?;
    let listener = TcpListener::bind(addr).await?;
    let app = build_router(state, Duration::from_millis(http.request_timeout_ms.max(1)));
    info!("operator http listening on {}", addr);

    Ok(tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(err) = served {
            error!("operator http exited: {}", err);
        }
    }))
}

async fn replay_file(engine: &EngineHandle, path: &Path) -> Result<()> {
    let mut source = ReplaySource::open(path).await?;
    source.rebase(current_millis());
    let total = source.len() as u64;
    info!("replaying {} events from {}", total, path.display());

    engine
        .attach_source(&source)
        .await
        .map_err(|err| anyhow!("replay task failed: {}", err))?;

    let settled = tokio::time::timeout(REPLAY_SETTLE_TIMEOUT, async {
        loop {
            let snapshot = engine.metrics().snapshot();
            if snapshot.events_received + snapshot.ingest_queue_full >= total
                && engine.state().scheduler.pending() == 0
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if settled.is_err() {
        warn!("replay did not settle within {:?}", REPLAY_SETTLE_TIMEOUT);
    }

    let snapshot = engine.metrics().snapshot();
    info!(
        "replay finished: {} events, {} verdicts, {} dropped on a full queue",
        snapshot.events_received, snapshot.verdicts, snapshot.ingest_queue_full
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler failed: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("sigterm handler failed: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_mode_runs_to_completion() {
        let dir = std::env::temp_dir().join(format!("dupeguard-run-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("dir");
        let replay = dir.join("events.jsonl");
        std::fs::write(
            &replay,
            concat!(
                r#"{"event_id":"a","event_type":"CONTAINER_MOVE","event_time":100,"actor_uuid":"p1","sequence":1,"item":{"item_type":"minecraft:diamond","amount":64},"source_container":"C1","dest_container":"C2"}"#,
                "\n",
                r#"{"event_id":"b","event_type":"CONTAINER_MOVE","event_time":101,"actor_uuid":"p1","sequence":2,"item":{"item_type":"minecraft:diamond","amount":64},"source_container":"C1","dest_container":"C3"}"#,
                "\n",
            ),
        )
        .expect("write replay");

        let mut config = AppConfig::default();
        config.exemptions_path = dir.join("exemptions.json").to_string_lossy().to_string();
        config.alerts.enabled = false;
        config.engine.shutdown_grace_ms = 500;

        run_standalone(config, Some(replay)).await.expect("run");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
