use crate::config::Config;
use crate::models::{CastMember, MediaKind, Title, TitleDetail};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const SEARCH_LIMIT: usize = 20;

/// Read-only view of the remote catalog.
///
/// Implementations never surface errors: a transport failure, a malformed
/// body and a legitimately empty answer all come back as an empty list or
/// `None`, so "no data" is the only failure signal callers see.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn popular_movies(&self, page: u32) -> Vec<Title>;
    async fn popular_shows(&self, page: u32) -> Vec<Title>;
    async fn trending_movies(&self) -> Vec<Title>;
    async fn search_multi(&self, query: &str) -> Vec<Title>;
    async fn movie_detail(&self, id: i64) -> Option<TitleDetail>;
    async fn show_detail(&self, id: i64) -> Option<TitleDetail>;
    async fn external_id(&self, id: i64, kind: MediaKind) -> Option<String>;

    async fn detail(&self, kind: MediaKind, id: i64) -> Option<TitleDetail> {
        match kind {
            MediaKind::Movie => self.movie_detail(id).await,
            MediaKind::Tv => self.show_detail(id).await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base: String,
}

impl TmdbClient {
    pub fn new(config: &Config) -> Result<Self> {
        let user_agent = format!("cinegrid/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build catalog HTTP client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base: config.catalog_base.clone(),
        })
    }

    async fn fetch_list(&self, url: &str, tag: Option<MediaKind>) -> Result<Vec<Title>> {
        let data: ListResponse = self.get_json(url).await?;
        Ok(data
            .results
            .into_iter()
            .map(|raw| raw.into_title(tag))
            .collect())
    }

    async fn list_or_empty(&self, op: &str, url: &str, tag: Option<MediaKind>) -> Vec<Title> {
        match self.fetch_list(url, tag).await {
            Ok(titles) => {
                debug!("{} returned {} titles", op, titles.len());
                titles
            }
            Err(e) => {
                warn!("Error fetching {}: {:#}", op, e);
                Vec::new()
            }
        }
    }

    async fn fetch_detail(&self, kind: MediaKind, id: i64) -> Result<TitleDetail> {
        let url = format!(
            "{}/{}/{id}?append_to_response=credits&language=en-US&api_key={}",
            self.base,
            kind.as_str(),
            self.api_key
        );
        let raw: RawDetail = self.get_json(&url).await?;
        Ok(raw.into_detail(kind))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("request to {} failed", redact(url)))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", redact(url), text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn popular_movies(&self, page: u32) -> Vec<Title> {
        let url = format!(
            "{}/movie/popular?api_key={}&language=en-US&page={page}",
            self.base, self.api_key
        );
        self.list_or_empty("popular movies", &url, None).await
    }

    async fn popular_shows(&self, page: u32) -> Vec<Title> {
        let url = format!(
            "{}/tv/popular?api_key={}&language=en-US&page={page}",
            self.base, self.api_key
        );
        self.list_or_empty("popular TV shows", &url, Some(MediaKind::Tv))
            .await
    }

    async fn trending_movies(&self) -> Vec<Title> {
        let url = format!("{}/trending/movie/week?api_key={}", self.base, self.api_key);
        self.list_or_empty("trending movies", &url, None).await
    }

    async fn search_multi(&self, query: &str) -> Vec<Title> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let encoded = urlencoding::encode(query);
        let url_movies = format!(
            "{}/search/movie?api_key={}&query={encoded}",
            self.base, self.api_key
        );
        let url_shows = format!(
            "{}/search/tv?api_key={}&query={encoded}",
            self.base, self.api_key
        );

        let joined = tokio::try_join!(
            self.fetch_list(&url_movies, Some(MediaKind::Movie)),
            self.fetch_list(&url_shows, Some(MediaKind::Tv)),
        );
        match joined {
            Ok((movies, shows)) => merge_search_results(movies, shows),
            Err(e) => {
                warn!("Error searching content for '{}': {:#}", query, e);
                Vec::new()
            }
        }
    }

    async fn movie_detail(&self, id: i64) -> Option<TitleDetail> {
        self.fetch_detail(MediaKind::Movie, id)
            .await
            .map_err(|e| warn!("Error fetching movie details for {}: {:#}", id, e))
            .ok()
    }

    async fn show_detail(&self, id: i64) -> Option<TitleDetail> {
        self.fetch_detail(MediaKind::Tv, id)
            .await
            .map_err(|e| warn!("Error fetching TV details for {}: {:#}", id, e))
            .ok()
    }

    async fn external_id(&self, id: i64, kind: MediaKind) -> Option<String> {
        let url = format!(
            "{}/{}/{id}/external_ids?api_key={}",
            self.base,
            kind.as_str(),
            self.api_key
        );
        match self.get_json::<ExternalIds>(&url).await {
            Ok(ids) => ids.imdb_id.filter(|s| !s.is_empty()),
            Err(e) => {
                warn!("Error fetching external IDs for {} {}: {:#}", kind, id, e);
                None
            }
        }
    }
}

/// Movies first, then shows, capped at [`SEARCH_LIMIT`].
pub fn merge_search_results(movies: Vec<Title>, shows: Vec<Title>) -> Vec<Title> {
    movies
        .into_iter()
        .map(|t| Title {
            kind: MediaKind::Movie,
            ..t
        })
        .chain(shows.into_iter().map(|t| Title {
            kind: MediaKind::Tv,
            ..t
        }))
        .take(SEARCH_LIMIT)
        .collect()
}

fn redact(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return "<unparseable url>".to_string();
    };
    if parsed.query().is_none() {
        return parsed.to_string();
    }
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "api_key" {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    results: Vec<RawTitle>,
}

#[derive(Debug, Deserialize)]
struct RawTitle {
    id: i64,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f32>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    media_type: Option<String>,
}

impl RawTitle {
    fn into_title(self, tag: Option<MediaKind>) -> Title {
        let kind = tag.unwrap_or_else(|| MediaKind::resolve(self.media_type.as_deref()));
        Title {
            id: self.id,
            name: self.title.or(self.name).unwrap_or_default(),
            overview: self.overview.unwrap_or_default(),
            poster_path: non_empty(self.poster_path),
            backdrop_path: non_empty(self.backdrop_path),
            rating: self.vote_average.unwrap_or(0.0),
            release_date: non_empty(self.release_date).or(non_empty(self.first_air_date)),
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpokenLanguage {
    english_name: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Credits {
    #[serde(default)]
    cast: Vec<RawCast>,
    #[serde(default)]
    crew: Vec<RawCrew>,
}

#[derive(Debug, Deserialize)]
struct RawCast {
    name: String,
    character: Option<String>,
    profile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCrew {
    name: String,
    job: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDetail {
    id: i64,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    tagline: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f32>,
    vote_count: Option<u32>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    runtime: Option<u32>,
    #[serde(default)]
    episode_run_time: Vec<u32>,
    #[serde(default)]
    genres: Vec<Named>,
    #[serde(default)]
    production_companies: Vec<Named>,
    #[serde(default)]
    spoken_languages: Vec<SpokenLanguage>,
    number_of_seasons: Option<u32>,
    number_of_episodes: Option<u32>,
    status: Option<String>,
    #[serde(default)]
    credits: Option<Credits>,
}

impl RawDetail {
    fn into_detail(self, kind: MediaKind) -> TitleDetail {
        let credits = self.credits.unwrap_or_default();
        let director = crew_member(&credits.crew, &["Director"]);
        let producer = crew_member(&credits.crew, &["Producer"]);
        let writer = crew_member(&credits.crew, &["Writer", "Screenplay"]);
        let cast = credits
            .cast
            .into_iter()
            .map(|c| CastMember {
                name: c.name,
                character: non_empty(c.character),
                profile_path: non_empty(c.profile_path),
            })
            .collect();

        TitleDetail {
            id: self.id,
            kind,
            name: self.title.or(self.name).unwrap_or_default(),
            overview: self.overview.unwrap_or_default(),
            tagline: non_empty(self.tagline),
            poster_path: non_empty(self.poster_path),
            backdrop_path: non_empty(self.backdrop_path),
            rating: self.vote_average.unwrap_or(0.0),
            vote_count: self.vote_count.unwrap_or(0),
            release_date: non_empty(self.release_date).or(non_empty(self.first_air_date)),
            runtime_minutes: self
                .runtime
                .filter(|r| *r > 0)
                .or(self.episode_run_time.first().copied()),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            production_companies: self
                .production_companies
                .into_iter()
                .map(|c| c.name)
                .collect(),
            spoken_languages: self
                .spoken_languages
                .into_iter()
                .filter_map(|l| non_empty(l.english_name).or(non_empty(l.name)))
                .collect(),
            number_of_seasons: self.number_of_seasons,
            number_of_episodes: self.number_of_episodes,
            status: non_empty(self.status),
            cast,
            director,
            producer,
            writer,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

fn crew_member(crew: &[RawCrew], jobs: &[&str]) -> Option<String> {
    crew.iter()
        .find(|c| c.job.as_deref().is_some_and(|j| jobs.contains(&j)))
        .map(|c| c.name.clone())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
