//! JSON API over a single engine: draw, edit and delete lines, move
//! parameter sliders, fetch snapshots and compile filters.

use std::{
    collections::BTreeMap,
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::{
    config::{LineSpec, ModelConfig},
    engine::{Engine, EngineError, InfrastructureLine, LineId, PassSummary},
    filter::{self, FilterError, FilterSpec},
    geometry::LonLat,
    snapshot::SnapshotError,
};

pub struct WebServerConfig {
    pub model: ModelConfig,
    pub engine: Engine,
    pub host: String,
    pub port: u16,
}

struct AppState {
    engine: Mutex<Engine>,
    model: ModelConfig,
    broadcaster: broadcast::Sender<String>,
}

impl AppState {
    fn engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().expect("engine lock poisoned")
    }

    /// Runs `f` against the engine on the blocking pool.
    async fn with_engine<T, F>(self: &Arc<Self>, f: F) -> ApiResult<T>
    where
        F: FnOnce(&mut Engine) -> std::result::Result<T, EngineError> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut engine = state.engine();
            f(&mut engine)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("engine task failed: {err}")))?
        .map_err(ApiError::from)
    }

    fn publish(&self, summary: &PassSummary) {
        if let Ok(payload) = serde_json::to_string(summary) {
            let _ = self.broadcaster.send(payload);
        }
    }
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownLine(_) => ApiError::NotFound(err.to_string()),
            EngineError::Config(_) => ApiError::BadRequest(err.to_string()),
            EngineError::InvalidSettings => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<SnapshotError> for ApiError {
    fn from(err: SnapshotError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn app_state(model: ModelConfig, engine: Engine) -> Arc<AppState> {
    let (tx, _) = broadcast::channel::<String>(256);
    Arc::new(AppState {
        engine: Mutex::new(engine),
        model,
        broadcaster: tx,
    })
}

pub fn router(model: ModelConfig, engine: Engine) -> Router {
    let state = app_state(model, engine);
    Router::new()
        .route("/api/config", get(model_config))
        .route("/api/grid", get(grid))
        .route("/api/lines", get(list_lines).post(draw_line))
        .route("/api/lines/:id", put(update_line).delete(delete_line))
        .route("/api/pars", get(list_pars).put(set_pars))
        .route("/api/filter", post(compile_filter))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        model,
        engine,
        host,
        port,
    } = config;
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let name = model.name.clone();
    let app = router(model, engine);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(target: "hexsite::web", %addr, model = %name, "web.listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(target: "hexsite::web", "web.shutdown");
}

async fn model_config(State(state): State<Arc<AppState>>) -> Json<ModelConfig> {
    Json(state.model.clone())
}

async fn grid(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let snapshot = state.engine().snapshot();
    let body = snapshot.to_geojson()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/geo+json".to_string()),
            (header::ETAG, format!("\"pass-{}\"", snapshot.pass())),
        ],
        body,
    )
        .into_response())
}

async fn list_lines(State(state): State<Arc<AppState>>) -> Json<Vec<InfrastructureLine>> {
    Json(state.engine().lines().cloned().collect())
}

#[derive(Serialize)]
struct DrawResponse {
    id: LineId,
    summary: PassSummary,
}

async fn draw_line(
    State(state): State<Arc<AppState>>,
    Json(line): Json<LineSpec>,
) -> ApiResult<Json<DrawResponse>> {
    let (id, summary) = state
        .with_engine(move |engine| engine.draw_line(line.kind, line.points))
        .await?;
    state.publish(&summary);
    Ok(Json(DrawResponse { id, summary }))
}

#[derive(Deserialize)]
struct UpdateLine {
    points: Vec<LonLat>,
}

async fn update_line(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<UpdateLine>,
) -> ApiResult<Json<PassSummary>> {
    let summary = state
        .with_engine(move |engine| engine.update_line(LineId::from_raw(id), body.points))
        .await?;
    state.publish(&summary);
    Ok(Json(summary))
}

async fn delete_line(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<PassSummary>> {
    let summary = state
        .with_engine(move |engine| engine.delete_line(LineId::from_raw(id)))
        .await?;
    state.publish(&summary);
    Ok(Json(summary))
}

async fn list_pars(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, f64>> {
    let engine = state.engine();
    Json(
        engine
            .params()
            .values()
            .map(|(id, value)| (id.to_string(), value))
            .collect(),
    )
}

async fn set_pars(
    State(state): State<Arc<AppState>>,
    Json(values): Json<BTreeMap<String, f64>>,
) -> ApiResult<Json<PassSummary>> {
    let summary = state
        .with_engine(move |engine| {
            engine.set_params(values.iter().map(|(id, value)| (id.as_str(), *value)))
        })
        .await?;
    state.publish(&summary);
    Ok(Json(summary))
}

async fn compile_filter(
    State(state): State<Arc<AppState>>,
    Json(spec): Json<FilterSpec>,
) -> ApiResult<Json<Value>> {
    let filter = filter::build(&spec)?;
    let snapshot = state.engine().snapshot();
    let visible = snapshot.visible(&filter).count();
    Ok(Json(json!({
        "expression": filter.to_expression(),
        "visible": visible,
        "pass": snapshot.pass(),
    })))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Constraint, Operator, Threshold};
    use crate::grid::{synthetic::SyntheticRegion, InfraKind};
    use crate::objective::FishModel;

    fn state() -> Arc<AppState> {
        let model = ModelConfig::builtin().unwrap();
        let region = SyntheticRegion::new(4, 4, 9);
        let engine = Engine::new(
            region.build().unwrap(),
            model.parameter_set().unwrap(),
            FishModel::new(),
            model.engine_settings(),
        )
        .unwrap();
        app_state(model, engine)
    }

    #[tokio::test]
    async fn engine_work_runs_off_the_async_workers() {
        let state = state();
        let centre = SyntheticRegion::new(4, 4, 9).centre(1, 1);
        let (id, summary) = state
            .with_engine(move |engine| engine.draw_line(InfraKind::Grid, vec![centre]))
            .await
            .unwrap();
        assert_eq!(summary.pass, 2);
        assert!(state.engine().line(id).is_some());

        let missing = state
            .with_engine(|engine| engine.delete_line(LineId::from_raw(99)))
            .await
            .unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(_)));
    }

    #[test]
    fn engine_errors_map_to_status_codes() {
        let missing = ApiError::from(EngineError::UnknownLine(3)).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let config = crate::config::ConfigError::UnknownParameter("tilapia".into());
        let rejected = ApiError::from(EngineError::from(config)).into_response();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_filter_is_a_bad_request() {
        let spec = vec![Constraint::new("tech", Operator::Gt, Threshold::Text("cage".into()))];
        let err = filter::build(&spec).unwrap_err();
        assert_eq!(ApiError::from(err).into_response().status(), StatusCode::BAD_REQUEST);
    }
}
