use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use chrono::Utc;
use clap::Parser;
use tower_http::trace::TraceLayer;
use url::Url;

use opsboard::alerts::dispatcher::AlertDispatcher;
use opsboard::alerts::ledger::NotificationLedger;
use opsboard::alerts::model::{Alert, Notification};
use opsboard::alerts::toast::{ToastChannel, TracingToastChannel};
use opsboard::snapshot::{self, HttpSnapshotSource, SnapshotSource};
use opsboard::store::{KeyValueStore, LocalFsKeyValueStore};
use opsboard::watchdog::api::{CrawlerApi, HttpCrawlerApi};
use opsboard::watchdog::model::{CrawlerJobStatus, TriggerResponse};
use opsboard::watchdog::orchestrator::CrawlerStatusOrchestrator;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Directory holding persisted state (the notification ledger).
    #[arg(long, default_value = "workspace-app")]
    data_dir: PathBuf,

    /// Base URL of the remote crawler service.
    #[arg(long)]
    crawler_api_base: Url,

    /// Base URL of the records service providing transactions and deadlines.
    #[arg(long)]
    records_api_base: Url,

    /// Crawler status poll interval.
    #[arg(long, default_value_t = 5)]
    poll_interval_secs: u64,
}

#[derive(Clone)]
struct AppState {
    ledger: Arc<NotificationLedger>,
    dispatcher: Arc<AlertDispatcher>,
    orchestrator: Arc<CrawlerStatusOrchestrator>,
    records: Arc<dyn SnapshotSource>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    opsboard::logging::init().context("init logging")?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting opsboard");

    let auth_token = std::env::var("OPSBOARD_CRAWLER_AUTH_TOKEN")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let store: Arc<dyn KeyValueStore> = Arc::new(LocalFsKeyValueStore::new(&args.data_dir));
    let ledger = Arc::new(NotificationLedger::load(store));
    let toasts: Arc<dyn ToastChannel> = Arc::new(TracingToastChannel);
    let dispatcher = Arc::new(AlertDispatcher::new(Arc::clone(&ledger), Arc::clone(&toasts)));

    let crawler_api: Arc<dyn CrawlerApi> =
        Arc::new(HttpCrawlerApi::new(args.crawler_api_base.clone(), auth_token));
    let orchestrator = Arc::new(CrawlerStatusOrchestrator::new(
        crawler_api,
        Arc::clone(&toasts),
        Duration::from_secs(args.poll_interval_secs.max(1)),
    ));
    orchestrator.start();

    let records: Arc<dyn SnapshotSource> =
        Arc::new(HttpSnapshotSource::new(args.records_api_base.clone()));

    let state = AppState {
        ledger,
        dispatcher,
        orchestrator: Arc::clone(&orchestrator),
        records,
    };

    let app = Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/:id/read", post(mark_read))
        .route("/api/alerts/evaluate", post(evaluate_alerts))
        .route("/api/watchdog/status", get(watchdog_status))
        .route("/api/watchdog/:job/run", post(run_crawler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.stop();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "install ctrl-c handler");
    }
}

/// Newest-first for display; the ledger itself keeps append order.
async fn list_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    let mut notifications = state.ledger.list();
    notifications.reverse();
    Json(notifications)
}

#[derive(serde::Serialize)]
struct UnreadCountResponse {
    unread: usize,
}

async fn unread_count(State(state): State<AppState>) -> Json<UnreadCountResponse> {
    Json(UnreadCountResponse {
        unread: state.ledger.unread_count(),
    })
}

async fn mark_read(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    state.ledger.mark_read(&id);
    StatusCode::NO_CONTENT
}

async fn evaluate_alerts(State(state): State<AppState>) -> Result<Json<Vec<Alert>>, StatusCode> {
    let snapshot = snapshot::fetch_snapshot(state.records.as_ref())
        .await
        .map_err(|err| {
            tracing::error!(?err, "fetch snapshot for alert evaluation");
            StatusCode::BAD_GATEWAY
        })?;
    let alerts = state.dispatcher.evaluate_and_dispatch(&snapshot, Utc::now());
    Ok(Json(alerts))
}

async fn watchdog_status(State(state): State<AppState>) -> Json<Vec<CrawlerJobStatus>> {
    Json(state.orchestrator.statuses())
}

async fn run_crawler(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> Result<Json<TriggerResponse>, StatusCode> {
    match state.orchestrator.trigger(&job).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            tracing::error!(?err, %job, "trigger crawler failed");
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}
