use crate::error::PipelineError;
use crate::models::{RawTable, TeamAdvancedStats};
use crate::utils::cleaning::parse_numeric;
use std::collections::HashMap;
use tracing::{debug, warn};

/// basketball-reference abbreviations for the current 30 franchises
pub const TEAM_ABBREV_TO_NAME: [(&str, &str); 30] = [
    ("ATL", "Atlanta Hawks"),
    ("BOS", "Boston Celtics"),
    ("BRK", "Brooklyn Nets"),
    ("CHI", "Chicago Bulls"),
    ("CHO", "Charlotte Hornets"),
    ("CLE", "Cleveland Cavaliers"),
    ("DAL", "Dallas Mavericks"),
    ("DEN", "Denver Nuggets"),
    ("DET", "Detroit Pistons"),
    ("GSW", "Golden State Warriors"),
    ("HOU", "Houston Rockets"),
    ("IND", "Indiana Pacers"),
    ("LAC", "Los Angeles Clippers"),
    ("LAL", "Los Angeles Lakers"),
    ("MEM", "Memphis Grizzlies"),
    ("MIA", "Miami Heat"),
    ("MIL", "Milwaukee Bucks"),
    ("MIN", "Minnesota Timberwolves"),
    ("NOP", "New Orleans Pelicans"),
    ("NYK", "New York Knicks"),
    ("OKC", "Oklahoma City Thunder"),
    ("ORL", "Orlando Magic"),
    ("PHI", "Philadelphia 76ers"),
    ("PHO", "Phoenix Suns"),
    ("POR", "Portland Trail Blazers"),
    ("SAC", "Sacramento Kings"),
    ("SAS", "San Antonio Spurs"),
    ("TOR", "Toronto Raptors"),
    ("UTA", "Utah Jazz"),
    ("WAS", "Washington Wizards"),
];

/// Full team name for an abbreviation, case-insensitive
pub fn team_name(abbrev: &str) -> Option<&'static str> {
    let abbrev = abbrev.trim();
    TEAM_ABBREV_TO_NAME
        .iter()
        .find(|(a, _)| a.eq_ignore_ascii_case(abbrev))
        .map(|(_, name)| *name)
}

fn parse_team_row(table: &RawTable, row: &[String], team: &str) -> Option<TeamAdvancedStats> {
    let number = |column: &str| table.cell(row, column).and_then(parse_numeric);
    Some(TeamAdvancedStats {
        team: team.to_string(),
        ortg: number("ORtg")?,
        drtg: number("DRtg")?,
        nrtg: number("NRtg")?,
        pace: number("Pace")?,
        efg_pct: number("eFG%"),
        efg_pct_def: number("eFG%_DEF")?,
    })
}

/// Advanced stats for every team in a season, keyed by full team name
#[derive(Debug, Clone, Default)]
pub struct TeamStatsTable {
    teams: HashMap<String, TeamAdvancedStats>,
}

impl TeamStatsTable {
    /// Build from typed rows. A team appearing twice is an error.
    pub fn from_rows(rows: Vec<TeamAdvancedStats>) -> Result<Self, PipelineError> {
        let mut teams = HashMap::new();
        for row in rows {
            let name = row.team.clone();
            if teams.insert(name.clone(), row).is_some() {
                return Err(PipelineError::DuplicateTeam(name));
            }
        }
        Ok(Self { teams })
    }

    /// Build from the scraped advanced-team table.
    ///
    /// Rows without a team name (separators, league average) are skipped, as
    /// are rows whose ratings don't parse.
    pub fn from_raw(table: &RawTable) -> Result<Self, PipelineError> {
        for column in ["Team", "ORtg", "DRtg", "NRtg", "Pace", "eFG%_DEF"] {
            if table.column_index(column).is_none() {
                return Err(PipelineError::MissingTeamColumn(column.to_string()));
            }
        }

        let mut rows = Vec::new();
        for row in &table.rows {
            let team = table
                .cell(row, "Team")
                .map(|t| t.trim().trim_end_matches('*').trim())
                .unwrap_or_default();
            if team.is_empty() || team == "Team" || team == "League Average" {
                continue;
            }

            let parsed = parse_team_row(table, row, team);
            match parsed {
                Some(stats) => rows.push(stats),
                None => warn!("Skipping team stats row for {} with missing ratings", team),
            }
        }

        debug!("Loaded advanced stats for {} teams", rows.len());
        Self::from_rows(rows)
    }

    pub fn get(&self, team_name: &str) -> Option<&TeamAdvancedStats> {
        self.teams.get(team_name)
    }

    /// Stats for a team given its abbreviation.
    ///
    /// An unknown abbreviation and a known team with no stats row are distinct errors.
    pub fn by_abbrev(&self, abbrev: &str) -> Result<&TeamAdvancedStats, PipelineError> {
        let name = team_name(abbrev)
            .ok_or_else(|| PipelineError::UnknownTeamAbbreviation(abbrev.to_string()))?;
        self.get(name)
            .ok_or_else(|| PipelineError::MissingTeamStats(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}
