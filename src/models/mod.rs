use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An untyped table exactly as scraped from a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Index of the first column with this header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell of `row` under column `name`; `None` if the column is absent or the row is short
    pub fn cell<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        let idx = self.column_index(name)?;
        row.get(idx).map(|s| s.as_str())
    }

    /// Remove a column by name. Returns false if there was no such column.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.headers.remove(idx);
        for row in &mut self.rows {
            if idx < row.len() {
                row.remove(idx);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Where a game was played, from the player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    /// basketball-reference marks road games with "@" and leaves home games blank
    pub fn from_marker(marker: &str) -> Self {
        if marker.trim() == "@" {
            Venue::Away
        } else {
            Venue::Home
        }
    }

    /// 1.0 for home, 0.0 for away
    pub fn indicator(self) -> f64 {
        match self {
            Venue::Home => 1.0,
            Venue::Away => 0.0,
        }
    }
}

/// One cleaned game from a player's gamelog.
///
/// Every stat is optional: a cell that could not be converted is kept as a
/// missing value rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameLogRow {
    #[serde(rename = "Rk")]
    pub rank: Option<u32>,
    #[serde(rename = "Date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "HomeAway")]
    pub venue: Option<Venue>,
    #[serde(rename = "Opp")]
    pub opponent: String,
    #[serde(rename = "Result")]
    pub result: String,
    #[serde(rename = "MP")]
    pub minutes: Option<f64>,
    #[serde(rename = "FG")]
    pub fg: Option<f64>,
    #[serde(rename = "FGA")]
    pub fga: Option<f64>,
    #[serde(rename = "FG%")]
    pub fg_pct: Option<f64>,
    #[serde(rename = "3P")]
    pub three_p: Option<f64>,
    #[serde(rename = "3PA")]
    pub three_pa: Option<f64>,
    #[serde(rename = "3P%")]
    pub three_pct: Option<f64>,
    #[serde(rename = "2P")]
    pub two_p: Option<f64>,
    #[serde(rename = "2PA")]
    pub two_pa: Option<f64>,
    #[serde(rename = "2P%")]
    pub two_pct: Option<f64>,
    #[serde(rename = "eFG%")]
    pub efg_pct: Option<f64>,
    #[serde(rename = "FT")]
    pub ft: Option<f64>,
    #[serde(rename = "FTA")]
    pub fta: Option<f64>,
    #[serde(rename = "FT%")]
    pub ft_pct: Option<f64>,
    #[serde(rename = "ORB")]
    pub orb: Option<f64>,
    #[serde(rename = "DRB")]
    pub drb: Option<f64>,
    #[serde(rename = "TRB")]
    pub trb: Option<f64>,
    #[serde(rename = "AST")]
    pub ast: Option<f64>,
    #[serde(rename = "STL")]
    pub stl: Option<f64>,
    #[serde(rename = "BLK")]
    pub blk: Option<f64>,
    #[serde(rename = "TOV")]
    pub tov: Option<f64>,
    #[serde(rename = "PF")]
    pub pf: Option<f64>,
    #[serde(rename = "PTS")]
    pub pts: Option<f64>,
    #[serde(rename = "GmSc")]
    pub game_score: Option<f64>,
    #[serde(rename = "+/-")]
    pub plus_minus: Option<f64>,
}

impl GameLogRow {
    /// Mutable slot for one of the numeric stat columns
    pub fn stat_mut(&mut self, column: &str) -> Option<&mut Option<f64>> {
        let slot = match column {
            "FG" => &mut self.fg,
            "FGA" => &mut self.fga,
            "FG%" => &mut self.fg_pct,
            "3P" => &mut self.three_p,
            "3PA" => &mut self.three_pa,
            "3P%" => &mut self.three_pct,
            "2P" => &mut self.two_p,
            "2PA" => &mut self.two_pa,
            "2P%" => &mut self.two_pct,
            "eFG%" => &mut self.efg_pct,
            "FT" => &mut self.ft,
            "FTA" => &mut self.fta,
            "FT%" => &mut self.ft_pct,
            "ORB" => &mut self.orb,
            "DRB" => &mut self.drb,
            "TRB" => &mut self.trb,
            "AST" => &mut self.ast,
            "STL" => &mut self.stl,
            "BLK" => &mut self.blk,
            "TOV" => &mut self.tov,
            "PF" => &mut self.pf,
            "PTS" => &mut self.pts,
            "GmSc" => &mut self.game_score,
            "+/-" => &mut self.plus_minus,
            _ => return None,
        };
        Some(slot)
    }
}

/// Season advanced stats for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAdvancedStats {
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "ORtg")]
    pub ortg: f64,
    #[serde(rename = "DRtg")]
    pub drtg: f64,
    #[serde(rename = "NRtg")]
    pub nrtg: f64,
    #[serde(rename = "Pace")]
    pub pace: f64,
    #[serde(rename = "eFG%")]
    pub efg_pct: Option<f64>,
    #[serde(rename = "eFG%_DEF")]
    pub efg_pct_def: f64,
}

/// Predictor names in the order the model sees them
pub const FEATURE_NAMES: [&str; 16] = [
    "Home",
    "MP",
    "FGA",
    "3P",
    "FTA",
    "Usage",
    "PTS_last3",
    "PTS_last5",
    "FGA_last3",
    "MP_last5",
    "PTS_season",
    "DRtg",
    "ORtg",
    "NRtg",
    "Pace",
    "eFG%_DEF",
];

/// One model-ready row. `points` is the label and is absent for an upcoming game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: Option<NaiveDate>,
    pub opponent: String,
    pub home: f64,
    pub minutes: f64,
    pub fga: f64,
    pub three_p: f64,
    pub fta: f64,
    pub usage: f64,
    pub pts_last3: f64,
    pub pts_last5: f64,
    pub fga_last3: f64,
    pub mp_last5: f64,
    pub pts_season: f64,
    pub drtg: f64,
    pub ortg: f64,
    pub nrtg: f64,
    pub pace: f64,
    pub efg_pct_def: f64,
    pub points: Option<f64>,
}

impl FeatureRow {
    /// Predictors laid out in `FEATURE_NAMES` order
    pub fn to_array(&self) -> [f64; 16] {
        [
            self.home,
            self.minutes,
            self.fga,
            self.three_p,
            self.fta,
            self.usage,
            self.pts_last3,
            self.pts_last5,
            self.fga_last3,
            self.mp_last5,
            self.pts_season,
            self.drtg,
            self.ortg,
            self.nrtg,
            self.pace,
            self.efg_pct_def,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_from_marker() {
        assert_eq!(Venue::from_marker("@"), Venue::Away);
        assert_eq!(Venue::from_marker(" @ "), Venue::Away);
        assert_eq!(Venue::from_marker(""), Venue::Home);
        assert_eq!(Venue::from_marker("N"), Venue::Home);
    }

    #[test]
    fn test_drop_column_handles_short_rows() {
        let mut table = RawTable::new(
            vec!["Rk".into(), "Awards".into(), "PTS".into()],
            vec![
                vec!["1".into(), "MVP-1".into(), "30".into()],
                vec!["2".into()],
            ],
        );
        assert!(table.drop_column("Awards"));
        assert!(!table.drop_column("Awards"));
        assert_eq!(table.headers, vec!["Rk", "PTS"]);
        assert_eq!(table.rows[0], vec!["1", "30"]);
        assert_eq!(table.rows[1], vec!["2"]);
    }

    #[test]
    fn test_feature_array_order_matches_names() {
        let row = FeatureRow {
            date: None,
            opponent: "DEN".into(),
            home: 1.0,
            minutes: 2.0,
            fga: 3.0,
            three_p: 4.0,
            fta: 5.0,
            usage: 6.0,
            pts_last3: 7.0,
            pts_last5: 8.0,
            fga_last3: 9.0,
            mp_last5: 10.0,
            pts_season: 11.0,
            drtg: 12.0,
            ortg: 13.0,
            nrtg: 14.0,
            pace: 15.0,
            efg_pct_def: 16.0,
            points: None,
        };
        let values = row.to_array();
        assert_eq!(values.len(), FEATURE_NAMES.len());
        assert_eq!(values[FEATURE_NAMES.iter().position(|n| *n == "DRtg").unwrap()], 12.0);
        assert_eq!(values[FEATURE_NAMES.iter().position(|n| *n == "eFG%_DEF").unwrap()], 16.0);
    }
}
