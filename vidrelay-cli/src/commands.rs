//! CLI command implementations

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Subcommand;
use serde_json::{Value, json};
use vidrelay_core::config::RelayConfig;
use vidrelay_core::{StreamFetcher, TokenProvider};
use vidrelay_search::MetadataResolver;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Server {
        /// Address to bind to (defaults to HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<IpAddr>,
        /// Port to bind to (defaults to PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Fetch the stream manifest for a movie
    Movie {
        /// TMDB movie id
        id: String,
    },
    /// Fetch the stream manifest for a series episode
    Episode {
        /// TMDB series id
        tmdb_id: String,
        /// Season number
        season: u32,
        /// Episode number
        episode: u32,
    },
    /// Look up metadata for a title
    Search {
        /// Free-text title, may span several words
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

/// Run the CLI command
///
///
/// # Errors
///
/// - `anyhow::Error` - Whichever lookup or server step failed
pub async fn run_command(command: Commands) -> Result<()> {
    let mut config = RelayConfig::from_env();

    match command {
        Commands::Server { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            vidrelay_web::run_server(config)
                .await
                .map_err(|e| anyhow!("Server failed: {e}"))
        }
        Commands::Movie { id } => {
            let streams = stream_fetcher(&config)?;
            let result = streams.fetch_movie_stream(&id).await?;
            print_json(&result.into_body([("movieId", json!(id))]))
        }
        Commands::Episode {
            tmdb_id,
            season,
            episode,
        } => {
            let streams = stream_fetcher(&config)?;
            let result = streams
                .fetch_episode_stream(&tmdb_id, season, episode)
                .await?;
            print_json(&result.into_body([
                ("tmdbId", json!(tmdb_id)),
                ("season", json!(season)),
                ("episode", json!(episode)),
            ]))
        }
        Commands::Search { query } => {
            let resolver = MetadataResolver::from_config(&config.metadata);
            let result = resolver.resolve(&query.join(" ")).await?;
            print_json(&serde_json::to_value(result)?)
        }
    }
}

fn stream_fetcher(config: &RelayConfig) -> Result<StreamFetcher> {
    let tokens = Arc::new(TokenProvider::from_config(&config.token));
    StreamFetcher::new(&config.provider, tokens).context("Failed to build stream fetcher")
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
