use crate::config::Config;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }

    /// Resolves the `media_type` tag of a catalog entry. Lists that omit the
    /// tag (popular/trending movies) and unknown tags fall back to `Movie`.
    pub fn resolve(tag: Option<&str>) -> Self {
        tag.and_then(|t| t.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            _ => Err(anyhow::anyhow!("media kind must be 'movie' or 'tv'")),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movie or show entry as it appears in list and search responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub rating: f32,
    pub release_date: Option<String>,
    pub kind: MediaKind,
}

impl Title {
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.as_deref().and_then(release_year)
    }

    pub fn card(&self, config: &Config) -> TitleCard {
        TitleCard {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            poster_url: poster_url(config, self.poster_path.as_deref()),
            backdrop_url: backdrop_url(config, self.backdrop_path.as_deref()),
            rating: self.rating,
            year: self.release_year(),
        }
    }

    pub fn is(&self, kind: MediaKind, id: i64) -> bool {
        self.kind == kind && self.id == id
    }
}

/// Display-ready projection of a [`Title`] with every image resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleCard {
    pub id: i64,
    pub kind: MediaKind,
    pub name: String,
    pub poster_url: String,
    pub backdrop_url: String,
    pub rating: f32,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

/// Full per-title record from the detail endpoints, credits included.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TitleDetail {
    pub id: i64,
    pub kind: MediaKind,
    pub name: String,
    pub overview: String,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub rating: f32,
    pub vote_count: u32,
    pub release_date: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub production_companies: Vec<String>,
    pub spoken_languages: Vec<String>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    pub status: Option<String>,
    pub cast: Vec<CastMember>,
    pub director: Option<String>,
    pub producer: Option<String>,
    pub writer: Option<String>,
}

impl TitleDetail {
    pub fn to_title(&self) -> Title {
        Title {
            id: self.id,
            name: self.name.clone(),
            overview: self.overview.clone(),
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
            rating: self.rating,
            release_date: self.release_date.clone(),
            kind: self.kind,
        }
    }
}

pub fn poster_url(config: &Config, path: Option<&str>) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(p) => format!("{}{p}", config.poster_base),
        None => config.placeholder_image.clone(),
    }
}

pub fn backdrop_url(config: &Config, path: Option<&str>) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(p) => format!("{}{p}", config.backdrop_base),
        None => config.placeholder_image.clone(),
    }
}

fn release_year(date: &str) -> Option<i32> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.year())
}
