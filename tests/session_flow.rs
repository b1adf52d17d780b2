use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cinegrid::app::{build_router, spawn_initial_load, AppState};
use cinegrid::config::Config;
use cinegrid::models::{MediaKind, Title, TitleDetail};
use cinegrid::session::load_catalog;
use cinegrid::tmdb::{merge_search_results, CatalogApi};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

#[derive(Default)]
struct FakeCatalog {
    movies: Vec<Title>,
    shows: Vec<Title>,
    trending: Vec<Title>,
    trending_delay: Duration,
    details: HashMap<(MediaKind, i64), TitleDetail>,
    external: HashMap<(MediaKind, i64), String>,
    slow_ids: Vec<i64>,
    searches: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl CatalogApi for FakeCatalog {
    async fn popular_movies(&self, page: u32) -> Vec<Title> {
        assert_eq!(page, 1);
        self.movies.clone()
    }
    async fn popular_shows(&self, page: u32) -> Vec<Title> {
        assert_eq!(page, 1);
        self.shows.clone()
    }
    async fn trending_movies(&self) -> Vec<Title> {
        tokio::time::sleep(self.trending_delay).await;
        self.trending.clone()
    }
    async fn search_multi(&self, query: &str) -> Vec<Title> {
        self.searches.lock().unwrap().push(query.to_string());
        let q = query.to_lowercase();
        let hits = |list: &[Title]| {
            list.iter()
                .filter(|t| t.name.to_lowercase().contains(&q))
                .cloned()
                .collect::<Vec<_>>()
        };
        merge_search_results(hits(&self.movies), hits(&self.shows))
    }
    async fn movie_detail(&self, id: i64) -> Option<TitleDetail> {
        if self.slow_ids.contains(&id) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        self.details.get(&(MediaKind::Movie, id)).cloned()
    }
    async fn show_detail(&self, id: i64) -> Option<TitleDetail> {
        self.details.get(&(MediaKind::Tv, id)).cloned()
    }
    async fn external_id(&self, id: i64, kind: MediaKind) -> Option<String> {
        if self.slow_ids.contains(&id) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        self.external.get(&(kind, id)).cloned()
    }
}

fn title(kind: MediaKind, id: i64, name: &str) -> Title {
    Title {
        id,
        name: name.to_string(),
        overview: format!("{name} overview"),
        poster_path: Some(format!("/{id}.jpg")),
        backdrop_path: None,
        rating: 7.5,
        release_date: Some("2011-04-17".to_string()),
        kind,
    }
}

fn detail(kind: MediaKind, id: i64, name: &str, seasons: Option<u32>) -> TitleDetail {
    TitleDetail {
        id,
        kind,
        name: name.to_string(),
        overview: format!("{name} detail overview"),
        tagline: Some("Tagline".to_string()),
        poster_path: None,
        backdrop_path: Some("/backdrop.jpg".to_string()),
        rating: 8.0,
        vote_count: 100,
        release_date: None,
        runtime_minutes: Some(60),
        genres: vec!["Drama".to_string()],
        production_companies: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        spoken_languages: vec!["English".to_string()],
        number_of_seasons: seasons,
        number_of_episodes: seasons.map(|s| s * 10),
        status: Some("Ended".to_string()),
        cast: Vec::new(),
        director: None,
        producer: None,
        writer: None,
    }
}

fn fake_catalog() -> FakeCatalog {
    let movies: Vec<Title> = (0..15)
        .map(|i| title(MediaKind::Movie, 600 + i, &format!("Matrix {i}")))
        .chain([title(MediaKind::Movie, 603, "The Matrix")])
        .collect();
    let shows: Vec<Title> = (0..14)
        .map(|i| title(MediaKind::Tv, 1300 + i, &format!("Show {i}")))
        .chain([title(MediaKind::Tv, 1399, "Matrix of Thrones")])
        .collect();
    let trending = (0..7)
        .map(|i| title(MediaKind::Movie, 900 + i, &format!("Trending {i}")))
        .collect();
    FakeCatalog {
        movies,
        shows,
        trending,
        details: HashMap::from([
            (
                (MediaKind::Movie, 603),
                detail(MediaKind::Movie, 603, "The Matrix", None),
            ),
            (
                (MediaKind::Tv, 1399),
                detail(MediaKind::Tv, 1399, "Matrix of Thrones", Some(2)),
            ),
            (
                (MediaKind::Movie, 42),
                detail(MediaKind::Movie, 42, "Hidden Gem", None),
            ),
        ]),
        external: HashMap::from([((MediaKind::Movie, 603), "tt0133093".to_string())]),
        ..FakeCatalog::default()
    }
}

fn test_config() -> Arc<Config> {
    Arc::new(Config::new("test-key").with_min_loading_display(Duration::ZERO))
}

async fn loaded_app(catalog: FakeCatalog) -> (Router, Arc<FakeCatalog>) {
    let api = Arc::new(catalog);
    let state = AppState::new(api.clone(), test_config());
    spawn_initial_load(&state).await.expect("initial load task");
    (build_router(state), api)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app
        .clone()
        .oneshot(req.body(body).expect("failed to build request"))
        .await
        .expect("router call");
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn headings(screen: &Value) -> Vec<&str> {
    screen["sections"]
        .as_array()
        .expect("sections")
        .iter()
        .filter_map(|s| s["heading"].as_str())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn initial_load_waits_for_every_list_even_if_one_is_empty() {
    let catalog = FakeCatalog {
        movies: vec![title(MediaKind::Movie, 1, "A")],
        shows: vec![title(MediaKind::Tv, 2, "B")],
        trending: Vec::new(),
        trending_delay: Duration::from_secs(2),
        ..FakeCatalog::default()
    };
    let started = tokio::time::Instant::now();
    let loaded = load_catalog(&catalog, Duration::ZERO).await;
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(loaded.popular_movies.len(), 1);
    assert_eq!(loaded.popular_shows.len(), 1);
    assert!(loaded.trending.is_empty());
}

#[tokio::test(start_paused = true)]
async fn minimum_loading_display_runs_alongside_the_fetch() {
    let catalog = FakeCatalog {
        trending_delay: Duration::from_secs(2),
        ..FakeCatalog::default()
    };
    let started = tokio::time::Instant::now();
    load_catalog(&catalog, Duration::from_secs(3)).await;
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn screen_stays_loading_until_catalog_settles() {
    let api = Arc::new(FakeCatalog {
        trending_delay: Duration::from_secs(1),
        ..fake_catalog()
    });
    let state = AppState::new(api, test_config());
    let load = spawn_initial_load(&state);
    let app = build_router(state);

    let (status, screen) = call(&app, "GET", "/screen", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(screen["loading"], json!(true));
    assert!(screen["sections"].as_array().unwrap().is_empty());

    load.await.expect("initial load task");
    let (_, screen) = call(&app, "GET", "/screen", None).await;
    assert_eq!(screen["loading"], json!(false));
    assert_eq!(screen["tab"], json!("home"));
    assert_eq!(headings(&screen), vec!["Popular Movies", "Popular TV Shows"]);
    assert_eq!(screen["sections"][0]["items"].as_array().unwrap().len(), 12);
    assert_eq!(screen["hero"]["len"], json!(5));
    assert!(screen["hero"]["current"]["name"]
        .as_str()
        .unwrap()
        .starts_with("Trending"));
}

#[tokio::test(start_paused = true)]
async fn tabs_show_full_lists() {
    let (app, _) = loaded_app(fake_catalog()).await;
    let (status, screen) = call(&app, "PUT", "/tab/tv", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headings(&screen), vec!["Popular TV Shows"]);
    assert_eq!(screen["sections"][0]["items"].as_array().unwrap().len(), 15);
    assert!(screen["hero"].is_null());

    let (status, _) = call(&app, "PUT", "/tab/music", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn debounced_search_replaces_tab_content() {
    let (app, api) = loaded_app(fake_catalog()).await;
    for q in ["m", "ma", "matrix"] {
        let (status, _) = call(&app, "PUT", "/search", Some(json!({ "query": q }))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(*api.searches.lock().unwrap(), vec!["matrix".to_string()]);

    let (_, screen) = call(&app, "GET", "/screen", None).await;
    assert_eq!(screen["query"], json!("matrix"));
    assert_eq!(headings(&screen), vec!["Search Results"]);
    let items = screen["sections"][0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 17);
    assert_eq!(items.last().unwrap()["kind"], json!("tv"));
    assert!(items[..16].iter().all(|i| i["kind"] == json!("movie")));

    let (_, _) = call(&app, "PUT", "/search", Some(json!({ "query": "" }))).await;
    let (_, search) = call(&app, "GET", "/search", None).await;
    assert!(search["results"].as_array().unwrap().is_empty());
    let (_, screen) = call(&app, "GET", "/screen", None).await;
    assert_eq!(headings(&screen), vec!["Popular Movies", "Popular TV Shows"]);
}

#[tokio::test(start_paused = true)]
async fn play_closes_detail_and_prefers_external_id() {
    let (app, _) = loaded_app(fake_catalog()).await;

    let (status, detail) = call(&app, "POST", "/detail/movie/603", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["overview"], json!("The Matrix detail overview"));
    assert_eq!(detail["production_companies"].as_array().unwrap().len(), 3);
    let (_, session) = call(&app, "GET", "/session", None).await;
    assert_eq!(session["previewing"]["id"], json!(603));
    assert_eq!(session["scroll_locked"], json!(true));

    let (status, player) = call(&app, "POST", "/play/movie/603", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["embed_url"], json!("https://vidsrc.to/embed/movie/tt0133093"));
    assert!(player["cursor"].is_null());

    let (_, session) = call(&app, "GET", "/session", None).await;
    assert!(session["previewing"].is_null());
    assert_eq!(session["playing"]["id"], json!(603));
    let (status, _) = call(&app, "GET", "/detail", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "DELETE", "/player", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, session) = call(&app, "GET", "/session", None).await;
    assert!(session["playing"].is_null());
    assert_eq!(session["scroll_locked"], json!(false));
}

#[tokio::test(start_paused = true)]
async fn closing_detail_keeps_player_open() {
    let (app, _) = loaded_app(fake_catalog()).await;
    call(&app, "POST", "/play/movie/603", None).await;
    call(&app, "POST", "/detail/tv/1399", None).await;
    let (status, _) = call(&app, "DELETE", "/detail", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, session) = call(&app, "GET", "/session", None).await;
    assert_eq!(session["playing"]["id"], json!(603));
    assert!(session["previewing"].is_null());
    assert_eq!(session["scroll_locked"], json!(true));
}

#[tokio::test(start_paused = true)]
async fn show_episode_navigation_through_router() {
    let (app, _) = loaded_app(fake_catalog()).await;
    let (status, player) = call(&app, "POST", "/play/tv/1399", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["embed_url"], json!("https://vidsrc.to/embed/tv/1399/1/1"));
    assert_eq!(player["total_seasons"], json!(2));
    assert_eq!(player["can_go_previous"], json!(false));

    let (_, player) = call(&app, "POST", "/player/previous", None).await;
    assert_eq!(player["label"], json!("S01E01"));

    call(&app, "PUT", "/player/episode/7", None).await;
    let (_, player) = call(&app, "PUT", "/player/season/2", None).await;
    assert_eq!(player["cursor"], json!({ "season": 2, "episode": 1 }));

    let (_, player) = call(&app, "PUT", "/player/episode/20", None).await;
    assert_eq!(player["can_go_next"], json!(false));
    let (_, player) = call(&app, "POST", "/player/next", None).await;
    assert_eq!(player["embed_url"], json!("https://vidsrc.to/embed/tv/1399/2/20"));

    let (_, player) = call(&app, "PUT", "/player/season/9", None).await;
    assert_eq!(player["cursor"], json!({ "season": 2, "episode": 1 }));
    let (_, player) = call(&app, "POST", "/player/previous", None).await;
    assert_eq!(player["cursor"], json!({ "season": 1, "episode": 20 }));
}

#[tokio::test(start_paused = true)]
async fn episode_operations_need_an_episodic_player() {
    let (app, _) = loaded_app(fake_catalog()).await;
    let (status, _) = call(&app, "POST", "/player/next", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    call(&app, "POST", "/play/movie/603", None).await;
    let (status, _) = call(&app, "PUT", "/player/season/2", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(start_paused = true)]
async fn titles_outside_loaded_lists_resolve_through_detail() {
    let (app, _) = loaded_app(fake_catalog()).await;
    let (status, player) = call(&app, "POST", "/play/movie/42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["embed_url"], json!("https://vidsrc.to/embed/movie/42"));

    let (status, _) = call(&app, "POST", "/detail/movie/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "POST", "/detail/person/7", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn manual_hero_navigation_pauses_and_wraps() {
    let (app, _) = loaded_app(fake_catalog()).await;
    let (_, hero) = call(&app, "POST", "/hero/4", None).await;
    assert_eq!(hero["index"], json!(4));
    assert_eq!(hero["mode"], json!("paused"));

    let (_, hero) = call(&app, "POST", "/hero/next", None).await;
    assert_eq!(hero["index"], json!(0));
    let (_, hero) = call(&app, "POST", "/hero/previous", None).await;
    assert_eq!(hero["index"], json!(4));

    tokio::time::sleep(Duration::from_secs(30)).await;
    let (_, hero) = call(&app, "GET", "/hero", None).await;
    assert_eq!(hero["index"], json!(4));

    let (status, _) = call(&app, "POST", "/hero/5", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn slow_lookup_catalog() -> FakeCatalog {
    FakeCatalog {
        slow_ids: vec![603],
        ..fake_catalog()
    }
}

fn spawn_call(
    app: &Router,
    method: &'static str,
    uri: &'static str,
) -> tokio::task::JoinHandle<(StatusCode, Value)> {
    let app = app.clone();
    tokio::spawn(async move { call(&app, method, uri, None).await })
}

#[tokio::test(start_paused = true)]
async fn play_takes_effect_before_its_lookup_finishes() {
    let (app, _) = loaded_app(slow_lookup_catalog()).await;
    call(&app, "POST", "/detail/tv/1399", None).await;

    let slow = spawn_call(&app, "POST", "/play/movie/603");
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (_, session) = call(&app, "GET", "/session", None).await;
    assert!(session["previewing"].is_null());
    assert_eq!(session["playing"]["id"], json!(603));
    let (_, player) = call(&app, "GET", "/player", None).await;
    assert_eq!(player["resolving"], json!(true));
    assert_eq!(player["embed_url"], json!("https://vidsrc.to/embed/movie/603"));

    let (status, player) = slow.await.expect("play task");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["resolving"], json!(false));
    assert_eq!(player["embed_url"], json!("https://vidsrc.to/embed/movie/tt0133093"));
}

#[tokio::test(start_paused = true)]
async fn closing_player_during_lookup_stays_closed() {
    let (app, _) = loaded_app(slow_lookup_catalog()).await;
    let slow = spawn_call(&app, "POST", "/play/movie/603");
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (status, _) = call(&app, "DELETE", "/player", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = slow.await.expect("play task");
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, session) = call(&app, "GET", "/session", None).await;
    assert!(session["playing"].is_null());
    assert_eq!(session["scroll_locked"], json!(false));
}

#[tokio::test(start_paused = true)]
async fn later_play_wins_over_slow_earlier_play() {
    let (app, _) = loaded_app(slow_lookup_catalog()).await;
    let slow = spawn_call(&app, "POST", "/play/movie/603");
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (status, player) = call(&app, "POST", "/play/tv/1399", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["total_seasons"], json!(2));

    let (status, _) = slow.await.expect("play task");
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, player) = call(&app, "GET", "/player", None).await;
    assert_eq!(player["title"]["id"], json!(1399));
    assert_eq!(player["embed_url"], json!("https://vidsrc.to/embed/tv/1399/1/1"));
}

#[tokio::test(start_paused = true)]
async fn closing_preview_during_detail_lookup_stays_closed() {
    let (app, _) = loaded_app(slow_lookup_catalog()).await;
    let slow = spawn_call(&app, "POST", "/detail/movie/603");
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (_, detail) = call(&app, "GET", "/detail", None).await;
    assert_eq!(detail["resolving"], json!(true));
    assert_eq!(detail["card"]["id"], json!(603));
    call(&app, "DELETE", "/detail", None).await;

    let (status, _) = slow.await.expect("detail task");
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, session) = call(&app, "GET", "/session", None).await;
    assert!(session["previewing"].is_null());
    assert_eq!(session["scroll_locked"], json!(false));
}
