use crate::config::Config;
use crate::models::{MediaKind, Title, TitleCard, TitleDetail};
use crate::session::{
    load_catalog, DetailView, HeroView, PlayerError, PlayerLookup, PlayerView, ScreenView,
    Session, SessionView, Tab,
};
use crate::tmdb::{CatalogApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

type ApiResult<T> = Result<Json<T>, StatusCode>;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn CatalogApi>,
    pub config: Arc<Config>,
    pub session: Arc<Mutex<Session>>,
}

impl AppState {
    /// Must be called inside a tokio runtime (the session starts its timers).
    pub fn new(api: Arc<dyn CatalogApi>, config: Arc<Config>) -> Self {
        let session = Session::new(api.clone(), config.clone());
        Self {
            api,
            config,
            session: Arc::new(Mutex::new(session)),
        }
    }
}

pub async fn run_server() -> Result<()> {
    let config = Arc::new(Config::from_env()?);
    let api: Arc<dyn CatalogApi> = Arc::new(TmdbClient::new(&config)?);
    let state = AppState::new(api, config.clone());
    spawn_initial_load(&state);

    let app = build_router(state);
    info!("Listening on {}", config.listen);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Runs the initial fan-out fetch and clears the loading state once it settles.
pub fn spawn_initial_load(state: &AppState) -> JoinHandle<()> {
    let state = state.clone();
    tokio::spawn(async move {
        info!("Loading catalog");
        let catalog = load_catalog(state.api.as_ref(), state.config.min_loading_display).await;
        state.session.lock().await.finish_loading(catalog);
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/screen", get(screen))
        .route("/session", get(session_summary))
        .route("/tab/:tab", put(set_tab))
        .route("/search", get(search_results).put(set_query))
        .route("/hero", get(hero))
        .route("/hero/next", post(hero_next))
        .route("/hero/previous", post(hero_previous))
        .route("/hero/:index", post(hero_jump))
        .route("/detail", get(detail).delete(close_detail))
        .route("/detail/:kind/:id", post(open_detail))
        .route("/player", get(player).delete(close_player))
        .route("/play/:kind/:id", post(play))
        .route("/player/season/:season", put(select_season))
        .route("/player/episode/:episode", put(select_episode))
        .route("/player/next", post(next_episode))
        .route("/player/previous", post(previous_episode))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn screen(State(state): State<AppState>) -> Json<ScreenView> {
    Json(state.session.lock().await.screen())
}

async fn session_summary(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.session.lock().await.session_view())
}

async fn set_tab(State(state): State<AppState>, Path(tab): Path<String>) -> ApiResult<ScreenView> {
    let tab: Tab = tab.parse().map_err(|e| {
        warn!("Rejecting tab change: {}", e);
        StatusCode::BAD_REQUEST
    })?;
    let mut session = state.session.lock().await;
    session.set_tab(tab);
    Ok(Json(session.screen()))
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    query: String,
}

#[derive(Debug, Serialize)]
struct SearchView {
    query: String,
    results: Vec<TitleCard>,
}

async fn set_query(State(state): State<AppState>, Json(body): Json<SearchBody>) -> StatusCode {
    state.session.lock().await.search().set_query(&body.query);
    StatusCode::ACCEPTED
}

async fn search_results(State(state): State<AppState>) -> Json<SearchView> {
    let snapshot = state.session.lock().await.search().snapshot();
    Json(SearchView {
        query: snapshot.query,
        results: snapshot
            .results
            .iter()
            .map(|t| t.card(&state.config))
            .collect(),
    })
}

async fn hero(State(state): State<AppState>) -> Json<HeroView> {
    Json(state.session.lock().await.hero_view())
}

async fn hero_next(State(state): State<AppState>) -> Json<HeroView> {
    let session = state.session.lock().await;
    session.hero().next();
    Json(session.hero_view())
}

async fn hero_previous(State(state): State<AppState>) -> Json<HeroView> {
    let session = state.session.lock().await;
    session.hero().previous();
    Json(session.hero_view())
}

async fn hero_jump(State(state): State<AppState>, Path(index): Path<usize>) -> ApiResult<HeroView> {
    let session = state.session.lock().await;
    session
        .hero()
        .jump_to(index)
        .ok_or(StatusCode::BAD_REQUEST)?;
    Ok(Json(session.hero_view()))
}

async fn detail(State(state): State<AppState>) -> ApiResult<DetailView> {
    state
        .session
        .lock()
        .await
        .detail_view()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn open_detail(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<DetailView> {
    let kind = parse_kind(&kind)?;
    let selected = select_title(
        &state,
        kind,
        id,
        Session::preview_generation,
        Session::open_detail,
    )
    .await?;
    let detail = match selected.detail {
        Some(detail) => Some(detail),
        None => state.api.detail(kind, id).await,
    };
    let mut session = state.session.lock().await;
    if !session.apply_detail(selected.generation, detail) {
        return Err(superseded(kind, id));
    }
    session.detail_view().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn close_detail(State(state): State<AppState>) -> StatusCode {
    state.session.lock().await.close_detail();
    StatusCode::NO_CONTENT
}

async fn player(State(state): State<AppState>) -> ApiResult<PlayerView> {
    state
        .session
        .lock()
        .await
        .player_view()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn play(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<PlayerView> {
    let kind = parse_kind(&kind)?;
    let selected = select_title(
        &state,
        kind,
        id,
        Session::player_generation,
        Session::play,
    )
    .await?;
    let lookup = PlayerLookup::fetch(state.api.as_ref(), &selected.title).await;
    let mut session = state.session.lock().await;
    if !session.apply_player(selected.generation, lookup) {
        return Err(superseded(kind, id));
    }
    session.player_view().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn close_player(State(state): State<AppState>) -> StatusCode {
    state.session.lock().await.close_player();
    StatusCode::NO_CONTENT
}

async fn select_season(
    State(state): State<AppState>,
    Path(season): Path<u32>,
) -> ApiResult<PlayerView> {
    let mut session = state.session.lock().await;
    session
        .episodes_mut()
        .map_err(player_conflict)?
        .select_season(season);
    session.player_view().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn select_episode(
    State(state): State<AppState>,
    Path(episode): Path<u32>,
) -> ApiResult<PlayerView> {
    let mut session = state.session.lock().await;
    session
        .episodes_mut()
        .map_err(player_conflict)?
        .select_episode(episode);
    session.player_view().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn next_episode(State(state): State<AppState>) -> ApiResult<PlayerView> {
    let mut session = state.session.lock().await;
    session.episodes_mut().map_err(player_conflict)?.next();
    session.player_view().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn previous_episode(State(state): State<AppState>) -> ApiResult<PlayerView> {
    let mut session = state.session.lock().await;
    session.episodes_mut().map_err(player_conflict)?.previous();
    session.player_view().map(Json).ok_or(StatusCode::NOT_FOUND)
}

fn player_conflict(err: PlayerError) -> StatusCode {
    match err {
        PlayerError::NotPlaying => warn!("Episode navigation with no player open"),
        PlayerError::NotEpisodic => warn!("Episode navigation on a movie"),
    }
    StatusCode::CONFLICT
}

fn parse_kind(kind: &str) -> Result<MediaKind, StatusCode> {
    kind.parse().map_err(|e| {
        warn!("Rejecting media kind '{}': {}", kind, e);
        StatusCode::BAD_REQUEST
    })
}

struct Selected {
    generation: u64,
    title: Title,
    detail: Option<TitleDetail>,
}

/// Selects a title in the same lock section that finds it in the loaded
/// lists. Titles the session has never shown are resolved through a detail
/// lookup first; the selection is then refused if the slot changed while
/// the lookup was in flight.
async fn select_title(
    state: &AppState,
    kind: MediaKind,
    id: i64,
    current_generation: fn(&Session) -> u64,
    select: fn(&mut Session, Title) -> u64,
) -> Result<Selected, StatusCode> {
    let observed = {
        let mut session = state.session.lock().await;
        if let Some(title) = session.find_title(kind, id) {
            let generation = select(&mut *session, title.clone());
            return Ok(Selected {
                generation,
                title,
                detail: None,
            });
        }
        current_generation(&*session)
    };

    let Some(detail) = state.api.detail(kind, id).await else {
        warn!("No catalog entry for {} {}", kind, id);
        return Err(StatusCode::NOT_FOUND);
    };
    let title = detail.to_title();
    let mut session = state.session.lock().await;
    if current_generation(&*session) != observed {
        return Err(superseded(kind, id));
    }
    let generation = select(&mut *session, title.clone());
    Ok(Selected {
        generation,
        title,
        detail: Some(detail),
    })
}

fn superseded(kind: MediaKind, id: i64) -> StatusCode {
    info!("Selection of {} {} superseded before its lookup finished", kind, id);
    StatusCode::CONFLICT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopSignal {
    Interrupt,
    Terminate,
}

impl std::fmt::Display for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopSignal::Interrupt => f.write_str("Ctrl+C"),
            StopSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = first_stop_signal(ctrl_c, terminate).await;
    info!("{} received, stopping cinegrid server", received);
}

async fn first_stop_signal(
    interrupt: impl Future<Output = ()>,
    terminate: impl Future<Output = ()>,
) -> StopSignal {
    tokio::select! {
        _ = interrupt => StopSignal::Interrupt,
        _ = terminate => StopSignal::Terminate,
    }
}
