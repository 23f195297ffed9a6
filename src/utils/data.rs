use crate::error::PipelineError;
use crate::models::{GameLogRow, RawTable};
use crate::utils::teams::TeamStatsTable;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const RAW_DIR: &str = "raw";
const CLEAN_DIR: &str = "clean";
const TEAM_STATS_FILE: &str = "team_stats.csv";

/// Write a raw table to CSV, header row first
pub fn save_table_to_csv(table: &RawTable, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

/// Load a raw table from CSV. Ragged rows are kept as-is.
pub fn load_table_from_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read CSV record")?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(headers, rows))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// `<player>.csv`, refusing names that would leave their directory
fn player_file_name(player: &str) -> Result<String, PipelineError> {
    let name = player.trim();
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(PipelineError::InvalidPlayerName(player.to_string()));
    }
    Ok(format!("{}.csv", name))
}

/// CSV files under one data directory.
///
/// Raw scraped gamelogs live in `raw/`, cleaned ones in `clean/`, so cleaning
/// never destroys its input.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_player_path(&self, player: &str) -> Result<PathBuf, PipelineError> {
        Ok(self.root.join(RAW_DIR).join(player_file_name(player)?))
    }

    pub fn clean_player_path(&self, player: &str) -> Result<PathBuf, PipelineError> {
        Ok(self.root.join(CLEAN_DIR).join(player_file_name(player)?))
    }

    pub fn team_stats_path(&self) -> PathBuf {
        self.root.join(TEAM_STATS_FILE)
    }

    pub fn per_game_averages_path(&self, season: u16) -> PathBuf {
        self.root
            .join(format!("nba_{}_all_players_average_per_game.csv", season))
    }

    pub fn save_raw_player(&self, player: &str, table: &RawTable) -> Result<()> {
        let path = self.raw_player_path(player)?;
        save_table_to_csv(table, &path)?;
        debug!("Saved raw gamelog for {} to {}", player, path.display());
        Ok(())
    }

    pub fn load_raw_player(&self, player: &str) -> Result<RawTable> {
        load_table_from_csv(&self.raw_player_path(player)?)
            .with_context(|| format!("No raw gamelog for {}", player))
    }

    pub fn save_clean_player(&self, player: &str, rows: &[GameLogRow]) -> Result<()> {
        let path = self.clean_player_path(player)?;
        ensure_parent(&path)?;
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
        for row in rows {
            writer
                .serialize(row)
                .context("Failed to serialize gamelog row")?;
        }
        writer.flush().context("Failed to flush CSV file")?;
        debug!("Saved {} cleaned games for {}", rows.len(), player);
        Ok(())
    }

    pub fn load_clean_player(&self, player: &str) -> Result<Vec<GameLogRow>> {
        let path = self.clean_player_path(player)?;
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("No cleaned gamelog for {} at {}", player, path.display()))?;
        reader
            .deserialize()
            .collect::<Result<Vec<GameLogRow>, _>>()
            .context("Failed to deserialize gamelog rows")
    }

    pub fn save_team_stats(&self, table: &RawTable) -> Result<()> {
        save_table_to_csv(table, &self.team_stats_path())
    }

    pub fn load_team_stats_table(&self) -> Result<RawTable> {
        load_table_from_csv(&self.team_stats_path())
    }

    pub fn load_team_stats(&self) -> Result<TeamStatsTable> {
        let table = self.load_team_stats_table()?;
        TeamStatsTable::from_raw(&table).context("Invalid team stats table")
    }

    pub fn save_per_game_averages(&self, season: u16, table: &RawTable) -> Result<()> {
        save_table_to_csv(table, &self.per_game_averages_path(season))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Venue;
    use chrono::NaiveDate;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "nba_points_predictor_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_raw_table_round_trip_keeps_ragged_rows() {
        let dir = scratch_dir("raw");
        let store = DataStore::new(&dir);
        let table = RawTable::new(
            vec!["Rk".into(), "".into(), "PTS".into()],
            vec![
                vec!["1".into(), "@".into(), "31".into()],
                vec!["".into(), "Season".into()],
            ],
        );

        store.save_raw_player("James Harden", &table).unwrap();
        let loaded = store.load_raw_player("James Harden").unwrap();
        assert_eq!(loaded, table);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_clean_rows_round_trip() {
        let dir = scratch_dir("clean");
        let store = DataStore::new(&dir);
        let rows = vec![GameLogRow {
            rank: Some(1),
            date: NaiveDate::from_ymd_opt(2025, 10, 21),
            team: "LAC".into(),
            venue: Some(Venue::Away),
            opponent: "UTA".into(),
            result: "W, 129-108".into(),
            minutes: Some(35.5),
            pts: Some(23.0),
            plus_minus: Some(-4.0),
            ..Default::default()
        }];

        store.save_clean_player("Ivica Zubac", &rows).unwrap();
        assert_eq!(store.load_clean_player("Ivica Zubac").unwrap(), rows);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_clean_file_is_an_error() {
        let store = DataStore::new(scratch_dir("missing"));
        assert!(store.load_clean_player("Nobody").is_err());
    }

    #[test]
    fn test_paths() {
        let store = DataStore::new("data");
        assert_eq!(
            store.per_game_averages_path(2026),
            Path::new("data/nba_2026_all_players_average_per_game.csv")
        );
        assert_eq!(store.team_stats_path(), Path::new("data/team_stats.csv"));
        assert_eq!(
            store.clean_player_path("Stephen Curry").unwrap(),
            Path::new("data/clean/Stephen Curry.csv")
        );
    }

    #[test]
    fn test_player_names_stay_inside_data_dir() {
        let dir = scratch_dir("escape");
        let store = DataStore::new(dir.join("data"));
        let table = RawTable::new(vec!["Rk".into()], vec![vec!["1".into()]]);

        for name in ["../x", "raw/../../x", "..", "", "a\\b"] {
            assert!(matches!(
                store.raw_player_path(name),
                Err(PipelineError::InvalidPlayerName(_))
            ));
            assert!(store.save_raw_player(name, &table).is_err());
        }
        assert!(!dir.join("x.csv").exists());
        assert!(!dir.join("data").join("x.csv").exists());

        // Accents and apostrophes are fine
        assert!(store.raw_player_path("De'Aaron Fox").is_ok());
        assert!(store.raw_player_path("Nikola Jokić").is_ok());

        let _ = fs::remove_dir_all(&dir);
    }
}
