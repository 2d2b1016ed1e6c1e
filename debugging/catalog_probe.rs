//! Fetch a catalog listing or a search from TMDB and print what the core would store.
//! Usage:
//!   cargo run --bin catalog_probe -- trending <movie|tv|all>
//!   cargo run --bin catalog_probe -- discover <movie|tv> [genre_id]
//!   cargo run --bin catalog_probe -- search <term>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use reelsync::models::MediaType;
use reelsync::tmdb::{self, CatalogEndpoint, PagingLimits, TmdbApi, TmdbClient, TMDB_BASE};
use serde_json::json;
use std::env;
use std::str::FromStr;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: cargo run --bin catalog_probe -- trending <movie|tv|all>");
        eprintln!("       cargo run --bin catalog_probe -- discover <movie|tv> [genre_id]");
        eprintln!("       cargo run --bin catalog_probe -- search <term>");
        std::process::exit(1);
    }

    let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
    let base = env::var("TMDB_BASE_URL").unwrap_or_else(|_| TMDB_BASE.to_string());
    let client = TmdbClient::new(base, api_key)?;

    let output = match args[1].as_str() {
        "search" => {
            let term = args[2..].join(" ");
            let results = tmdb::search_movies(&client, &term).await?;
            json!({ "term": term, "results": results })
        }
        "trending" | "discover" => {
            let media = MediaType::from_str(&args[2])?;
            let endpoint = if args[1] == "trending" {
                CatalogEndpoint::Trending(media)
            } else {
                let genre = args
                    .get(3)
                    .map(|g| g.parse::<i64>())
                    .transpose()
                    .context("genre_id must be an integer")?;
                CatalogEndpoint::Discover { media, genre }
            };
            let genres = client.fetch_genres().await?;
            let movies =
                tmdb::fetch_paged(&client, &endpoint, &genres, PagingLimits::default()).await?;
            json!({
                "endpoint": endpoint.path_and_query(),
                "count": movies.len(),
                "movies": movies
            })
        }
        other => anyhow::bail!("unknown command '{}'", other),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
