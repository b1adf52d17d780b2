//! One browsing session: the loaded catalog, the active tab, search, the
//! hero slideshow, and the detail/player panels. Everything here lives in
//! memory for the lifetime of the session only.

use crate::config::Config;
use crate::episodes::{EpisodeNavigator, PlaybackCursor};
use crate::models::{backdrop_url, poster_url, CastMember, MediaKind, Title, TitleCard, TitleDetail};
use crate::playback;
use crate::search::SearchCoordinator;
use crate::selection::{ScrollLock, Selection};
use crate::slideshow::{SlideshowController, SlideshowMode};
use crate::tmdb::CatalogApi;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const HOME_ROW_LIMIT: usize = 12;
const DETAIL_CAST_LIMIT: usize = 10;
const DETAIL_COMPANY_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Home,
    Movies,
    Tv,
    Trending,
}

impl FromStr for Tab {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "home" => Ok(Tab::Home),
            "movies" => Ok(Tab::Movies),
            "tv" => Ok(Tab::Tv),
            "trending" => Ok(Tab::Trending),
            other => Err(anyhow!("unknown tab '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub popular_movies: Vec<Title>,
    pub popular_shows: Vec<Title>,
    pub trending: Vec<Title>,
}

/// Initial bulk fetch. The three lists are requested concurrently and the
/// call returns once all of them have settled and `min_display` has elapsed;
/// the minimum display time runs alongside the fetches, not after them.
pub async fn load_catalog(api: &dyn CatalogApi, min_display: Duration) -> Catalog {
    let fetch = async {
        tokio::join!(
            api.popular_movies(1),
            api.popular_shows(1),
            api.trending_movies()
        )
    };
    let ((popular_movies, popular_shows, trending), ()) =
        tokio::join!(fetch, tokio::time::sleep(min_display));
    info!(
        "Catalog loaded: {} popular movies, {} popular shows, {} trending",
        popular_movies.len(),
        popular_shows.len(),
        trending.len()
    );
    Catalog {
        popular_movies,
        popular_shows,
        trending,
    }
}

#[derive(Debug, Clone)]
pub struct DetailPanel {
    pub title: Title,
    pub detail: Option<TitleDetail>,
    pub resolved: bool,
}

impl DetailPanel {
    /// A panel showing only the list entry until the detail record arrives.
    pub fn pending(title: Title) -> Self {
        Self {
            title,
            detail: None,
            resolved: false,
        }
    }

    pub fn apply(&mut self, detail: Option<TitleDetail>) {
        self.detail = detail;
        self.resolved = true;
    }

    pub fn view(&self, config: &Config) -> DetailView {
        // Without a detail record the panel falls back to the list entry.
        let title = self
            .detail
            .as_ref()
            .map(TitleDetail::to_title)
            .unwrap_or_else(|| self.title.clone());
        let backdrop = title
            .backdrop_path
            .as_deref()
            .or(title.poster_path.as_deref());
        let detail = self.detail.as_ref();
        DetailView {
            resolving: !self.resolved,
            card: title.card(config),
            overview: title.overview.clone(),
            backdrop_url: backdrop_url(config, backdrop),
            tagline: detail.and_then(|d| d.tagline.clone()),
            runtime_minutes: detail.and_then(|d| d.runtime_minutes),
            vote_count: detail.map(|d| d.vote_count).unwrap_or(0),
            genres: detail.map(|d| d.genres.clone()).unwrap_or_default(),
            cast: detail
                .map(|d| {
                    d.cast
                        .iter()
                        .take(DETAIL_CAST_LIMIT)
                        .map(|c| CastView::new(config, c))
                        .collect()
                })
                .unwrap_or_default(),
            director: detail.and_then(|d| d.director.clone()),
            producer: detail.and_then(|d| d.producer.clone()),
            writer: detail.and_then(|d| d.writer.clone()),
            production_companies: detail
                .map(|d| {
                    d.production_companies
                        .iter()
                        .take(DETAIL_COMPANY_LIMIT)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            spoken_languages: detail
                .map(|d| d.spoken_languages.clone())
                .unwrap_or_default(),
            number_of_seasons: detail.and_then(|d| d.number_of_seasons),
            number_of_episodes: detail.and_then(|d| d.number_of_episodes),
            status: detail.and_then(|d| d.status.clone()),
        }
    }
}

/// Data the player needs beyond the list entry.
#[derive(Debug, Clone, Default)]
pub struct PlayerLookup {
    pub external_id: Option<String>,
    pub show: Option<TitleDetail>,
}

impl PlayerLookup {
    /// Resolves the external id and, for shows, the season count.
    pub async fn fetch(api: &dyn CatalogApi, title: &Title) -> Self {
        let show_detail = async {
            match title.kind {
                MediaKind::Tv => api.show_detail(title.id).await,
                MediaKind::Movie => None,
            }
        };
        let (external_id, show) = tokio::join!(api.external_id(title.id, title.kind), show_detail);
        Self { external_id, show }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerPanel {
    pub title: Title,
    pub external_id: Option<String>,
    pub show: Option<TitleDetail>,
    pub episodes: Option<EpisodeNavigator>,
    pub resolved: bool,
}

impl PlayerPanel {
    /// Playable right away with the catalog id; shows start at S1E1 with an
    /// unknown season count.
    pub fn pending(title: Title) -> Self {
        let episodes = match title.kind {
            MediaKind::Tv => Some(EpisodeNavigator::new(None)),
            MediaKind::Movie => None,
        };
        Self {
            title,
            external_id: None,
            show: None,
            episodes,
            resolved: false,
        }
    }

    pub async fn prepare(api: &dyn CatalogApi, title: Title) -> Self {
        let lookup = PlayerLookup::fetch(api, &title).await;
        let mut panel = Self::pending(title);
        panel.apply(lookup);
        panel
    }

    /// Keeps the current cursor; a newly known season count re-clamps it.
    pub fn apply(&mut self, lookup: PlayerLookup) {
        let total = lookup.show.as_ref().and_then(|s| s.number_of_seasons);
        if let (Some(nav), Some(total)) = (self.episodes.as_mut(), total) {
            nav.set_total_seasons(total);
        }
        self.external_id = lookup.external_id;
        self.show = lookup.show;
        self.resolved = true;
    }

    pub fn cursor(&self) -> Option<PlaybackCursor> {
        self.episodes.as_ref().map(EpisodeNavigator::cursor)
    }

    pub fn embed_url(&self, config: &Config) -> String {
        playback::embed_url(
            &config.embed_host,
            self.title.id,
            self.title.kind,
            self.external_id.as_deref(),
            self.cursor().unwrap_or_default(),
        )
    }

    pub fn view(&self, config: &Config) -> PlayerView {
        let cursor = self.cursor();
        let frame_title = match cursor {
            Some(c) => format!("{} - S{}E{}", self.title.name, c.season, c.episode),
            None => self.title.name.clone(),
        };
        PlayerView {
            resolving: !self.resolved,
            title: self.title.card(config),
            embed_url: self.embed_url(config),
            frame_title,
            cursor,
            label: cursor.map(|c| c.to_string()),
            total_seasons: self.show.as_ref().and_then(|s| s.number_of_seasons),
            total_episodes: self.show.as_ref().and_then(|s| s.number_of_episodes),
            can_go_previous: self
                .episodes
                .as_ref()
                .is_some_and(EpisodeNavigator::can_go_previous),
            can_go_next: self
                .episodes
                .as_ref()
                .is_some_and(EpisodeNavigator::can_go_next),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CastView {
    pub name: String,
    pub character: Option<String>,
    pub profile_url: String,
}

impl CastView {
    fn new(config: &Config, member: &CastMember) -> Self {
        Self {
            name: member.name.clone(),
            character: member.character.clone(),
            profile_url: poster_url(config, member.profile_path.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub resolving: bool,
    pub card: TitleCard,
    pub overview: String,
    pub backdrop_url: String,
    pub tagline: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub vote_count: u32,
    pub genres: Vec<String>,
    pub cast: Vec<CastView>,
    pub director: Option<String>,
    pub producer: Option<String>,
    pub writer: Option<String>,
    pub production_companies: Vec<String>,
    pub spoken_languages: Vec<String>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub resolving: bool,
    pub title: TitleCard,
    pub embed_url: String,
    pub frame_title: String,
    pub cursor: Option<PlaybackCursor>,
    pub label: Option<String>,
    pub total_seasons: Option<u32>,
    pub total_episodes: Option<u32>,
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeroView {
    pub index: usize,
    pub len: usize,
    pub mode: SlideshowMode,
    pub current: Option<TitleCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub heading: &'static str,
    pub items: Vec<TitleCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenView {
    pub loading: bool,
    pub tab: Tab,
    pub query: String,
    pub hero: Option<HeroView>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub previewing: Option<TitleCard>,
    pub playing: Option<TitleCard>,
    pub scroll_locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerError {
    NotPlaying,
    NotEpisodic,
}

pub struct Session {
    config: Arc<Config>,
    catalog: Catalog,
    loading: bool,
    tab: Tab,
    search: SearchCoordinator,
    hero: SlideshowController,
    selection: Selection<DetailPanel, PlayerPanel>,
    preview_generation: u64,
    player_generation: u64,
}

impl Session {
    /// Starts in the loading state. Must be called inside a tokio runtime.
    pub fn new(api: Arc<dyn CatalogApi>, config: Arc<Config>) -> Self {
        let search = SearchCoordinator::new(api, config.search_quiet_period);
        let hero = SlideshowController::start(0, config.hero_window, config.hero_period);
        Self {
            config,
            catalog: Catalog::default(),
            loading: true,
            tab: Tab::default(),
            search,
            hero,
            selection: Selection::new(ScrollLock::default()),
            preview_generation: 0,
            player_generation: 0,
        }
    }

    pub fn finish_loading(&mut self, catalog: Catalog) {
        self.hero.set_item_count(catalog.trending.len());
        self.catalog = catalog;
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn search(&self) -> &SearchCoordinator {
        &self.search
    }

    pub fn hero(&self) -> &SlideshowController {
        &self.hero
    }

    /// Looks a title up in every list the session currently shows.
    pub fn find_title(&self, kind: MediaKind, id: i64) -> Option<Title> {
        let results = self.search.results();
        self.catalog
            .popular_movies
            .iter()
            .chain(&self.catalog.popular_shows)
            .chain(&self.catalog.trending)
            .chain(&results)
            .find(|t| t.is(kind, id))
            .cloned()
    }

    /// Bumped by every change to the preview slot.
    pub fn preview_generation(&self) -> u64 {
        self.preview_generation
    }

    /// Bumped by every change to the player slot.
    pub fn player_generation(&self) -> u64 {
        self.player_generation
    }

    /// Opens the preview immediately. The returned generation must be handed
    /// back to [`apply_detail`](Self::apply_detail) with the fetched record.
    pub fn open_detail(&mut self, title: Title) -> u64 {
        info!("Previewing '{}' ({} {})", title.name, title.kind, title.id);
        self.preview_generation += 1;
        self.selection.open_detail(DetailPanel::pending(title));
        self.preview_generation
    }

    /// Returns false when the preview changed since `generation` was issued.
    pub fn apply_detail(&mut self, generation: u64, detail: Option<TitleDetail>) -> bool {
        if generation != self.preview_generation {
            debug!("Discarding detail for superseded preview {}", generation);
            return false;
        }
        match self.selection.preview_mut() {
            Some(panel) => {
                panel.apply(detail);
                true
            }
            None => false,
        }
    }

    pub fn close_detail(&mut self) -> bool {
        self.preview_generation += 1;
        self.selection.close_detail().is_some()
    }

    /// Starts playback immediately and closes the preview. The returned
    /// generation must be handed back to [`apply_player`](Self::apply_player).
    pub fn play(&mut self, title: Title) -> u64 {
        info!("Playing '{}' ({} {})", title.name, title.kind, title.id);
        self.preview_generation += 1;
        self.player_generation += 1;
        self.selection.play(PlayerPanel::pending(title));
        self.player_generation
    }

    /// Returns false when the player changed since `generation` was issued.
    pub fn apply_player(&mut self, generation: u64, lookup: PlayerLookup) -> bool {
        if generation != self.player_generation {
            debug!("Discarding player lookup for superseded playback {}", generation);
            return false;
        }
        match self.selection.playing_mut() {
            Some(panel) => {
                panel.apply(lookup);
                true
            }
            None => false,
        }
    }

    pub fn close_player(&mut self) -> bool {
        self.player_generation += 1;
        self.selection.close_player().is_some()
    }

    pub fn episodes_mut(&mut self) -> Result<&mut EpisodeNavigator, PlayerError> {
        let player = self
            .selection
            .playing_mut()
            .ok_or(PlayerError::NotPlaying)?;
        player.episodes.as_mut().ok_or(PlayerError::NotEpisodic)
    }

    pub fn detail_view(&self) -> Option<DetailView> {
        self.selection.preview().map(|p| p.view(&self.config))
    }

    pub fn player_view(&self) -> Option<PlayerView> {
        self.selection.playing().map(|p| p.view(&self.config))
    }

    pub fn hero_view(&self) -> HeroView {
        let cursor = self.hero.snapshot();
        let current = if cursor.is_empty() {
            None
        } else {
            self.catalog
                .trending
                .get(cursor.index())
                .map(|t| t.card(&self.config))
        };
        HeroView {
            index: cursor.index(),
            len: cursor.len(),
            mode: cursor.mode(),
            current,
        }
    }

    pub fn session_view(&self) -> SessionView {
        SessionView {
            previewing: self.selection.preview().map(|p| p.title.card(&self.config)),
            playing: self.selection.playing().map(|p| p.title.card(&self.config)),
            scroll_locked: self.selection.scroll_locked(),
        }
    }

    /// What the main area shows right now. An active query replaces the tab
    /// content; an active query with no results shows nothing.
    pub fn screen(&self) -> ScreenView {
        let search = self.search.snapshot();
        let mut view = ScreenView {
            loading: self.loading,
            tab: self.tab,
            query: search.query.clone(),
            hero: None,
            sections: Vec::new(),
        };
        if self.loading {
            return view;
        }

        if !search.query.trim().is_empty() {
            if !search.results.is_empty() {
                view.sections
                    .push(self.section("Search Results", &search.results, usize::MAX));
            }
            return view;
        }

        let catalog = &self.catalog;
        match self.tab {
            Tab::Home => {
                view.hero = Some(self.hero_view()).filter(|h| h.current.is_some());
                view.sections.push(self.section(
                    "Popular Movies",
                    &catalog.popular_movies,
                    HOME_ROW_LIMIT,
                ));
                view.sections.push(self.section(
                    "Popular TV Shows",
                    &catalog.popular_shows,
                    HOME_ROW_LIMIT,
                ));
            }
            Tab::Movies => view.sections.push(self.section(
                "Popular Movies",
                &catalog.popular_movies,
                usize::MAX,
            )),
            Tab::Tv => view.sections.push(self.section(
                "Popular TV Shows",
                &catalog.popular_shows,
                usize::MAX,
            )),
            Tab::Trending => view.sections.push(self.section(
                "Trending Movies",
                &catalog.trending,
                usize::MAX,
            )),
        }
        view
    }

    fn section(&self, heading: &'static str, titles: &[Title], limit: usize) -> Section {
        Section {
            heading,
            items: titles
                .iter()
                .take(limit)
                .map(|t| t.card(&self.config))
                .collect(),
        }
    }
}
