pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;
pub mod utils;

pub use api::*;
pub use error::PipelineError;
pub use models::*;
pub use scrapers::*;
pub use utils::*;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};
use utils::cleaning::{clean_player_table, CleanReport};
use utils::data::DataStore;
use utils::features::{add_features, make_next_game_features};
use utils::model::{train_and_evaluate, Evaluation, PointsModel};
use utils::teams::TeamStatsTable;

/// Resolve player ids and store each player's raw gamelog.
///
/// When a name resolves to several ids the first one whose page yields a
/// gamelog wins. Players with no usable id are logged and skipped. Returns
/// the names that were stored.
pub async fn fetch_player_gamelogs<R: PlayerIdResolver>(
    scraper: &BasketballReferenceScraper,
    resolver: &R,
    store: &DataStore,
    names: &[String],
    season: u16,
) -> Result<Vec<String>> {
    let ids = resolver
        .resolve(names)
        .await
        .context("Failed to resolve player ids")?;
    if ids.len() != names.len() {
        return Err(PipelineError::OracleLengthMismatch {
            expected: names.len(),
            got: ids.len(),
        }
        .into());
    }

    let mut stored = Vec::new();
    for (name, candidates) in names.iter().zip(ids) {
        let mut fetched = None;
        for player_id in &candidates {
            match scraper.fetch_player_gamelog(player_id, season).await {
                Ok(table) => {
                    fetched = Some(table);
                    break;
                }
                Err(e) => warn!("Gamelog for {} ({}) unavailable: {:#}", name, player_id, e),
            }
        }

        match fetched {
            Some(table) => {
                store.save_raw_player(name, &table)?;
                stored.push(name.clone());
            }
            None => warn!("No gamelog stored for {}", name),
        }
    }

    info!("Stored gamelogs for {} of {} players", stored.len(), names.len());
    Ok(stored)
}

/// Fetch and store the league per-game averages table
pub async fn fetch_per_game_averages(
    scraper: &BasketballReferenceScraper,
    store: &DataStore,
    season: u16,
) -> Result<()> {
    let table = scraper
        .fetch_per_game_averages(season)
        .await
        .context("Failed to fetch per-game averages")?;
    store.save_per_game_averages(season, &table)
}

/// Fetch and store the team advanced stats table
pub async fn fetch_team_stats(
    scraper: &BasketballReferenceScraper,
    store: &DataStore,
    season: u16,
) -> Result<()> {
    let table = scraper
        .fetch_team_advanced_stats(season)
        .await
        .context("Failed to fetch team advanced stats")?;
    // Validate before persisting
    TeamStatsTable::from_raw(&table)?;
    store.save_team_stats(&table)
}

/// Clean a player's stored raw gamelog into `clean/`. The raw table is kept.
pub fn clean_and_store_player(store: &DataStore, player: &str) -> Result<CleanReport> {
    let raw = store.load_raw_player(player)?;
    let report = clean_player_table(&raw, player);
    store.save_clean_player(player, &report.rows)?;
    Ok(report)
}

/// Everything produced by one next-game prediction
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub player: String,
    pub opponent: String,
    pub venue: Venue,
    pub model_games: usize,
    pub evaluation: Evaluation,
    pub features: FeatureRow,
    pub predicted_points: f64,
}

/// Train on a player's history and predict their next game against `next_opp_abbrev`
pub fn predict_from_history(
    player: &str,
    rows: &[GameLogRow],
    teams: &TeamStatsTable,
    next_opp_abbrev: &str,
    venue: Venue,
) -> Result<(PointsModel, PredictionReport)> {
    let model_rows = add_features(rows, teams);
    let (model, evaluation) = train_and_evaluate(&model_rows)
        .with_context(|| format!("Failed to train a model for {}", player))?;

    let features = make_next_game_features(rows, teams, next_opp_abbrev, venue)?;
    let predicted_points = model.predict_one(&features);
    info!(
        "Predicted {:.2} points for {} vs {}",
        predicted_points, player, next_opp_abbrev
    );

    let report = PredictionReport {
        player: player.to_string(),
        opponent: next_opp_abbrev.to_string(),
        venue,
        model_games: model_rows.len(),
        evaluation,
        features,
        predicted_points,
    };
    Ok((model, report))
}

/// Load a player's cleaned gamelog and the team stats from the store, then predict
pub fn predict_next_game(
    store: &DataStore,
    player: &str,
    next_opp_abbrev: &str,
    venue: Venue,
) -> Result<PredictionReport> {
    let rows = store.load_clean_player(player)?;
    let teams = store.load_team_stats()?;
    let (_, report) = predict_from_history(player, &rows, &teams, next_opp_abbrev, venue)?;
    Ok(report)
}
