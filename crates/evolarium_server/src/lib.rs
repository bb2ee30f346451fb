//! HTTP and WebSocket front end for a running simulation.
//!
//! `/ws` streams snapshots to observers, `/api/*` exposes stats, the latest
//! snapshot, recent events and start/stop control.

pub mod cli;
pub mod fanout;
pub mod observer;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use evolarium_core::brain::{DecisionPolicy, QBrain, RandomPolicy};
use evolarium_core::config::{AppConfig, PolicyKind, ServerConfig};
use evolarium_core::scheduler::{self, SchedulerStatus};
use evolarium_core::{SchedulerHandle, World};
use evolarium_net::{ControlCommand, NetMessage, SnapshotFrame, StatsPayload};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub const API_KEY_VAR: &str = "EVOLARIUM_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverInfo {
    pub id: Uuid,
    pub joined_at_tick: u64,
}

/// Shared server state.
pub struct AppState {
    pub scheduler: SchedulerHandle,
    /// Pre-encoded frames for every observer
    pub frames: broadcast::Sender<Arc<SnapshotFrame>>,
    /// Connected observers
    pub observers: Arc<Mutex<HashMap<Uuid, ObserverInfo>>>,
    pub config: ServerConfig,
    /// API key for the control endpoint (None = open mode)
    pub api_key: Option<String>,
}

impl AppState {
    #[must_use]
    pub fn new(scheduler: SchedulerHandle, config: ServerConfig, api_key: Option<String>) -> Self {
        let (frames, _) = broadcast::channel(config.observer_buffer.max(1));
        Self {
            scheduler,
            frames,
            observers: Arc::new(Mutex::new(HashMap::new())),
            config,
            api_key,
        }
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// API key from the environment; empty means unset.
#[must_use]
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_VAR).ok().filter(|k| !k.is_empty())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/stats", get(get_stats))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/events", get(get_events))
        .route("/api/control", post(post_control))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A world wired to its scheduler, fan-out and router.
pub struct Simulation<P: DecisionPolicy> {
    pub router: Router,
    pub state: Arc<AppState>,
    pub stepper: JoinHandle<Option<World<P>>>,
    pub fanout: JoinHandle<()>,
}

/// Starts the scheduler for `world` and builds the router around it.
///
/// Must be called from within a tokio runtime.
pub fn build<P: DecisionPolicy>(
    world: World<P>,
    config: &AppConfig,
    api_key: Option<String>,
) -> Simulation<P> {
    let (handle, stepper) = scheduler::spawn(world, config.scheduler.clone());
    let state = Arc::new(AppState::new(handle, config.server.clone(), api_key));
    let fanout = fanout::spawn_fanout(&state.scheduler, state.frames.clone());
    Simulation {
        router: router(Arc::clone(&state)),
        state,
        stepper,
        fanout,
    }
}

/// Runs the server until Ctrl-C.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    match config.policy.kind {
        PolicyKind::QLearning => serve_with::<QBrain>(config).await,
        PolicyKind::Random => serve_with::<RandomPolicy>(config).await,
    }
}

async fn serve_with<P: DecisionPolicy>(config: AppConfig) -> anyhow::Result<()> {
    let api_key = api_key_from_env();
    if api_key.is_some() {
        tracing::info!("API key authentication enabled for the control endpoint");
    } else {
        tracing::warn!("No {API_KEY_VAR} set, control endpoint is open");
    }

    let world = World::<P>::new(config.clone()).context("failed to build world")?;
    let sim = build(world, &config, api_key);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.host))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!("Evolarium server listening on {}", addr);
    tracing::info!("    WebSocket: ws://{}/ws", addr);
    tracing::info!("    Stats API: http://{}/api/stats", addr);

    axum::serve(listener, sim.router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
        .context("server error")?;

    tracing::info!("Shutting down");
    // Already gone if the stepper died.
    let _ = sim.state.scheduler.shutdown();
    sim.fanout.abort();
    if let Ok(Some(world)) = sim.stepper.await {
        tracing::info!(
            tick = world.tick,
            generation = world.generation,
            population = world.population(),
            "Final world state"
        );
    }
    Ok(())
}

/// REST endpoint: current counters
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsPayload> {
    let snapshot = state.scheduler.latest_snapshot();
    let metrics = state.scheduler.metrics();
    Json(StatsPayload {
        tick: snapshot.tick,
        population: snapshot.population(),
        food: snapshot.food.len(),
        generation: snapshot.generation,
        observers: state.observer_count(),
        running: state.scheduler.status() == SchedulerStatus::Running,
        best_score: snapshot.best_score,
        historical_best_score: snapshot.historical_best_score,
        tick_failures: metrics.counter("tick_failed"),
    })
}

/// REST endpoint: latest published snapshot
async fn get_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler.latest_snapshot())
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    limit: Option<usize>,
}

/// REST endpoint: most recent simulation events
async fn get_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50).min(256);
    Json(state.scheduler.recent_events(limit))
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    command: ControlCommand,
}

/// Bearer-token gate for mutating endpoints; `None` lets the request through.
fn check_auth(state: &AppState, headers: &HeaderMap) -> Option<axum::response::Response> {
    let expected = state.api_key.as_deref()?;
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")));
    if presented == Some(expected) {
        return None;
    }
    tracing::warn!("Rejected control request: invalid or missing API key");
    Some(
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid or missing API key" })),
        )
            .into_response(),
    )
}

/// REST endpoint: start or stop the scheduler
async fn post_control(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ControlRequest>,
) -> impl IntoResponse {
    if let Some(resp) = check_auth(&state, &headers) {
        return resp;
    }
    let result = match request.command {
        ControlCommand::Start => state.scheduler.start(),
        ControlCommand::Stop => state.scheduler.stop(),
    };
    match result {
        Ok(()) => {
            tracing::info!(command = ?request.command, "Control command accepted");
            Json(serde_json::json!({ "success": true, "command": request.command }))
                .into_response()
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket(socket, state))
}

async fn websocket(stream: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = stream.split();
    let client_id = Uuid::new_v4();
    // Subscribe first so nothing published during the handshake is missed.
    let frames = state.frames.subscribe();
    let latest = state.scheduler.latest_snapshot();

    {
        let mut observers = state.observers.lock().unwrap_or_else(|e| e.into_inner());
        observers.insert(
            client_id,
            ObserverInfo {
                id: client_id,
                joined_at_tick: latest.tick,
            },
        );
        tracing::info!(
            "Observer connected: {}. Total observers: {}",
            client_id,
            observers.len()
        );
    }

    let greeting = async {
        let handshake = serde_json::to_string(&NetMessage::Handshake { client_id })?;
        sender.send(Message::Text(handshake)).await?;
        let initial = SnapshotFrame::encode(&latest)?;
        let message = if state.config.compress_initial {
            Message::Binary(initial.compressed()?.to_vec())
        } else {
            Message::Text(initial.text().to_owned())
        };
        sender.send(message).await?;
        anyhow::Ok(())
    };

    let greeted = greeting.await;
    if let Err(e) = greeted {
        tracing::debug!(observer = %client_id, error = %e, "Greeting failed");
    } else {
        let mut send_task = tokio::spawn(observer::forward_frames(
            client_id,
            sender,
            frames,
            Duration::from_millis(state.config.send_timeout_ms),
            state.config.recover_after,
        ));
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = receiver.next().await {
                if let Message::Close(_) = message {
                    break;
                }
            }
        });
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }
    }

    let mut observers = state.observers.lock().unwrap_or_else(|e| e.into_inner());
    observers.remove(&client_id);
    tracing::info!(
        "Observer disconnected: {}. Total observers: {}",
        client_id,
        observers.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.world.seed = Some(11);
        config.scheduler.autostart = false;
        config
    }

    fn create_app(api_key: Option<&str>) -> (Router, Arc<AppState>) {
        let config = config();
        let world = World::<RandomPolicy>::new(config.clone()).unwrap();
        let sim = build(world, &config, api_key.map(str::to_string));
        (sim.router, sim.state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn control(command: &str, key: Option<&str>) -> Request<axum::body::Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/control")
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {key}"));
        }
        builder
            .body(axum::body::Body::from(format!(r#"{{"command":"{command}"}}"#)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_stats() {
        let (app, _) = create_app(None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stats")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let stats = body_json(response).await;
        assert_eq!(stats["tick"], 0);
        assert_eq!(stats["population"], 20);
        assert_eq!(stats["food"], 50);
        assert_eq!(stats["observers"], 0);
        assert_eq!(stats["running"], false);
    }

    #[tokio::test]
    async fn test_get_snapshot_is_redacted() {
        let (app, _) = create_app(None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/snapshot")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let snapshot = body_json(response).await;
        let creatures = snapshot["creatures"].as_array().unwrap();
        assert_eq!(creatures.len(), 20);
        assert!(creatures[0].get("policy").is_none());
        assert!(creatures[0].get("foodEaten").is_some());
    }

    #[tokio::test]
    async fn test_get_events_empty_before_start() {
        let (app, _) = create_app(None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/events?limit=10")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_control_open_mode_starts_scheduler() {
        let (app, state) = create_app(None);
        let response = app.oneshot(control("start", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);

        let mut status = state.scheduler.status();
        for _ in 0..100 {
            if status == SchedulerStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            status = state.scheduler.status();
        }
        assert_eq!(status, SchedulerStatus::Running);
        state.scheduler.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_control_rejected_without_key() {
        let (app, _) = create_app(Some("test-secret-key"));
        let response = app.oneshot(control("start", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_control_rejected_with_wrong_key() {
        let (app, _) = create_app(Some("test-secret-key"));
        let response = app
            .oneshot(control("stop", Some("wrong-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_control_accepted_with_valid_key() {
        let (app, state) = create_app(Some("test-secret-key"));
        let response = app
            .oneshot(control("stop", Some("test-secret-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["command"], "stop");
        state.scheduler.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_command_rejected() {
        let (app, _) = create_app(None);
        let response = app.oneshot(control("explode", None)).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
