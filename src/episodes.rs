use serde::Serialize;
use std::fmt;

/// Per-season episode counts are not fetched before navigation, so every
/// season is treated as having this many episodes. Short seasons can
/// therefore be navigated past their real last episode.
pub const ASSUMED_MAX_EPISODES: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackCursor {
    pub season: u32,
    pub episode: u32,
}

impl Default for PlaybackCursor {
    fn default() -> Self {
        Self {
            season: 1,
            episode: 1,
        }
    }
}

impl fmt::Display for PlaybackCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

/// (season, episode) cursor for episodic titles.
///
/// `total_seasons` stays `None` until the show detail arrives; while it is
/// unknown the cursor never moves into a following season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeNavigator {
    cursor: PlaybackCursor,
    total_seasons: Option<u32>,
}

impl Default for EpisodeNavigator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EpisodeNavigator {
    pub fn new(total_seasons: Option<u32>) -> Self {
        Self {
            cursor: PlaybackCursor::default(),
            total_seasons: total_seasons.map(|n| n.max(1)),
        }
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    pub fn total_seasons(&self) -> Option<u32> {
        self.total_seasons
    }

    pub fn set_total_seasons(&mut self, total: u32) {
        let total = total.max(1);
        self.total_seasons = Some(total);
        if self.cursor.season > total {
            self.select_season(total);
        }
    }

    /// Always lands on episode 1 of the (clamped) season.
    pub fn select_season(&mut self, season: u32) {
        let upper = self.total_seasons.unwrap_or(u32::MAX);
        self.cursor.season = season.clamp(1, upper);
        self.cursor.episode = 1;
    }

    pub fn select_episode(&mut self, episode: u32) {
        self.cursor.episode = episode.clamp(1, ASSUMED_MAX_EPISODES);
    }

    pub fn can_go_previous(&self) -> bool {
        !(self.cursor.season == 1 && self.cursor.episode == 1)
    }

    pub fn can_go_next(&self) -> bool {
        self.cursor.episode < ASSUMED_MAX_EPISODES
            || self
                .total_seasons
                .is_some_and(|total| self.cursor.season < total)
    }

    /// Returns whether the cursor moved.
    pub fn previous(&mut self) -> bool {
        if self.cursor.episode > 1 {
            self.cursor.episode -= 1;
        } else if self.cursor.season > 1 {
            self.cursor.season -= 1;
            self.cursor.episode = ASSUMED_MAX_EPISODES;
        } else {
            return false;
        }
        true
    }

    /// Returns whether the cursor moved.
    pub fn next(&mut self) -> bool {
        if self.cursor.episode < ASSUMED_MAX_EPISODES {
            self.cursor.episode += 1;
        } else if self.can_go_next() {
            self.cursor.season += 1;
            self.cursor.episode = 1;
        } else {
            return false;
        }
        true
    }
}
