//! Fetch catalog data and print what the session would show for it.
//! Usage:
//!   cargo run --bin catalog_props -- lists
//!   cargo run --bin catalog_props -- search <query>
//!   cargo run --bin catalog_props -- movie <tmdb_id>
//!   cargo run --bin catalog_props -- tv <tmdb_id> [season] [episode]
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cinegrid::config::Config;
use cinegrid::episodes::EpisodeNavigator;
use cinegrid::models::MediaKind;
use cinegrid::session::{load_catalog, DetailPanel, PlayerPanel};
use cinegrid::tmdb::{CatalogApi, TmdbClient};
use dotenvy::dotenv;
use serde_json::json;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin catalog_props -- lists");
        eprintln!("       cargo run --bin catalog_props -- search <query>");
        eprintln!("       cargo run --bin catalog_props -- movie|tv <tmdb_id> [season] [episode]");
        std::process::exit(1);
    }

    let config = Config::from_env()?;
    let client = TmdbClient::new(&config)?;

    match args[1].as_str() {
        "lists" => {
            let catalog = load_catalog(&client, Duration::ZERO).await;
            let names = |titles: &[cinegrid::models::Title]| {
                titles.iter().map(|t| t.card(&config)).collect::<Vec<_>>()
            };
            print_json(&json!({
                "popular_movies": names(&catalog.popular_movies),
                "popular_shows": names(&catalog.popular_shows),
                "trending": names(&catalog.trending),
            }))?;
        }
        "search" => {
            let query = args[2..].join(" ");
            let results = client.search_multi(&query).await;
            let cards: Vec<_> = results.iter().map(|t| t.card(&config)).collect();
            print_json(&json!({ "query": query, "results": cards }))?;
        }
        other => {
            let kind: MediaKind = other.parse()?;
            let id: i64 = args
                .get(2)
                .context("missing tmdb_id")?
                .parse()
                .context("tmdb_id must be an integer")?;
            let detail = client
                .detail(kind, id)
                .await
                .with_context(|| format!("no catalog entry for {kind} {id}"))?;
            let title = detail.to_title();
            let mut preview = DetailPanel::pending(title.clone());
            preview.apply(Some(detail));
            let mut player = PlayerPanel::prepare(&client, title).await;
            if let Some(nav) = player.episodes.as_mut() {
                position(nav, args.get(3), args.get(4))?;
            }
            print_json(&json!({
                "detail": preview.view(&config),
                "player": player.view(&config),
            }))?;
        }
    }

    Ok(())
}

fn position(nav: &mut EpisodeNavigator, season: Option<&String>, episode: Option<&String>) -> Result<()> {
    if let Some(season) = season {
        nav.select_season(season.parse().context("season must be an integer")?);
    }
    if let Some(episode) = episode {
        nav.select_episode(episode.parse().context("episode must be an integer")?);
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
