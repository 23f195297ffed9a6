use anyhow::Result;
use clap::{Parser, Subcommand};
use nba_points_predictor::config::Config;
use nba_points_predictor::data::DataStore;
use nba_points_predictor::{
    clean_and_store_player, fetch_per_game_averages, fetch_player_gamelogs, fetch_team_stats,
    predict_next_game, BasketballReferenceScraper, CachingPlayerIdResolver,
    OpenAiPlayerIdResolver, StaticPlayerIdResolver, Venue, FEATURE_NAMES,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cli", about = "Scrape NBA gamelogs and predict a player's next-game points")]
struct Cli {
    /// Season to work with, e.g. 2026 for 2025-26 (overrides NBA_SEASON)
    #[arg(long, global = true)]
    season: Option<u16>,

    /// Directory holding the CSV tables (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve player ids and store each player's raw gamelog
    FetchPlayers { names: Vec<String> },
    /// Store the league per-game averages table
    FetchAverages,
    /// Store the team advanced stats table
    FetchTeamStats,
    /// Clean stored raw gamelogs
    Clean { names: Vec<String> },
    /// Train on a player's gamelog and predict their next game
    Predict {
        name: String,
        /// Opponent abbreviation, e.g. DEN
        #[arg(long)]
        opp: String,
        /// The next game is at home (default: away)
        #[arg(long)]
        home: bool,
        /// Print the projected feature vector
        #[arg(long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(season) = cli.season {
        config.season = season;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let store = DataStore::new(&config.data_dir);

    match cli.command {
        Command::FetchPlayers { names } => {
            let scraper = BasketballReferenceScraper::new(config.http_timeout)?;
            let stored = match &config.player_ids_cache {
                Some(cache_file) if config.openai_api_key.is_none() => {
                    let resolver = StaticPlayerIdResolver::from_json_file(cache_file)?;
                    fetch_player_gamelogs(&scraper, &resolver, &store, &names, config.season)
                        .await?
                }
                Some(cache_file) => {
                    let resolver = CachingPlayerIdResolver::new(openai_resolver(&config)?, cache_file);
                    fetch_player_gamelogs(&scraper, &resolver, &store, &names, config.season)
                        .await?
                }
                None => {
                    let resolver = openai_resolver(&config)?;
                    fetch_player_gamelogs(&scraper, &resolver, &store, &names, config.season)
                        .await?
                }
            };
            println!("Stored gamelogs for {} of {} players", stored.len(), names.len());
            for name in stored {
                println!("  {}", store.raw_player_path(&name)?.display());
            }
        }
        Command::FetchAverages => {
            let scraper = BasketballReferenceScraper::new(config.http_timeout)?;
            fetch_per_game_averages(&scraper, &store, config.season).await?;
            println!(
                "Saved per-game averages to {}",
                store.per_game_averages_path(config.season).display()
            );
        }
        Command::FetchTeamStats => {
            let scraper = BasketballReferenceScraper::new(config.http_timeout)?;
            fetch_team_stats(&scraper, &store, config.season).await?;
            println!("Saved team stats to {}", store.team_stats_path().display());
        }
        Command::Clean { names } => {
            for name in names {
                match clean_and_store_player(&store, &name) {
                    Ok(report) => {
                        println!("{}: {} games cleaned", name, report.rows.len());
                        for column in &report.missing_columns {
                            println!("  Column {} not available", column);
                        }
                    }
                    Err(e) => eprintln!("Error cleaning {}: {:#}", name, e),
                }
            }
        }
        Command::Predict {
            name,
            opp,
            home,
            verbose,
        } => {
            let venue = if home { Venue::Home } else { Venue::Away };
            let report = predict_next_game(&store, &name, &opp, venue)?;

            println!(
                "Trained on {} games, tested on {}",
                report.evaluation.train_games, report.evaluation.test_games
            );
            println!("Test MAE: {:.2} points", report.evaluation.mean_absolute_error);
            if verbose {
                for (feature, value) in FEATURE_NAMES.iter().zip(report.features.to_array()) {
                    println!("  {:<10} {:>8.3}", feature, value);
                }
            }
            println!(
                "Predicted NEXT GAME POINTS for {} ({:?} vs {}): {:.2}",
                report.player, report.venue, report.opponent, report.predicted_points
            );
        }
    }

    Ok(())
}

fn openai_resolver(config: &Config) -> Result<OpenAiPlayerIdResolver> {
    OpenAiPlayerIdResolver::new(
        config.require_openai_api_key()?.to_string(),
        config.openai_model.clone(),
        config.http_timeout,
    )
}
