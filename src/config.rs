use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/original";
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x450?text=No+Image";
pub const EMBED_HOST: &str = "https://vidsrc.to";

pub const HERO_WINDOW: usize = 5;
pub const HERO_PERIOD: Duration = Duration::from_secs(6);
pub const SEARCH_QUIET_PERIOD: Duration = Duration::from_millis(300);
pub const MIN_LOADING_DISPLAY: Duration = Duration::from_secs(3);

/// Session-wide settings. Only the catalog credential comes from the
/// environment; everything else is fixed at build time.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub catalog_base: String,
    pub poster_base: String,
    pub backdrop_base: String,
    pub placeholder_image: String,
    pub embed_host: String,
    pub hero_window: usize,
    pub hero_period: Duration,
    pub search_quiet_period: Duration,
    pub min_loading_display: Duration,
    pub listen: SocketAddr,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            catalog_base: TMDB_BASE.to_string(),
            poster_base: POSTER_BASE.to_string(),
            backdrop_base: BACKDROP_BASE.to_string(),
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
            embed_host: EMBED_HOST.to_string(),
            hero_window: HERO_WINDOW,
            hero_period: HERO_PERIOD,
            search_quiet_period: SEARCH_QUIET_PERIOD,
            min_loading_display: MIN_LOADING_DISPLAY,
            listen: SocketAddr::from(([0, 0, 0, 0], 3146)),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .context("TMDB_API_KEY must be set")?;
        Ok(Self::new(api_key))
    }

    pub fn with_catalog_base(mut self, base: impl Into<String>) -> Self {
        self.catalog_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// The hero banner cycles either the first 5 or the first 10 trending titles.
    pub fn with_hero_window(mut self, window: usize) -> Self {
        self.hero_window = window.max(1);
        self
    }

    pub fn with_min_loading_display(mut self, min: Duration) -> Self {
        self.min_loading_display = min;
        self
    }

    pub fn with_search_quiet_period(mut self, quiet: Duration) -> Self {
        self.search_quiet_period = quiet;
        self
    }

    pub fn with_hero_period(mut self, period: Duration) -> Self {
        self.hero_period = period;
        self
    }
}
