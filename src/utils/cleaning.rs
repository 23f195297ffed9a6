use crate::models::{GameLogRow, RawTable, Venue};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Stat columns coerced to numbers when cleaning a gamelog
pub const NUMERIC_COLUMNS: [&str; 24] = [
    "FG", "FGA", "FG%", "3P", "3PA", "3P%", "2P", "2PA", "2P%", "eFG%", "FT", "FTA", "FT%", "ORB",
    "DRB", "TRB", "AST", "STL", "BLK", "TOV", "PF", "PTS", "GmSc", "+/-",
];

/// Headers the home/away marker column shows up under, depending on who exported the table
const VENUE_COLUMNS: [&str; 3] = ["", "Unnamed: 5", "@"];
/// Name the home/away column is reported under when the page lacks it
const VENUE_REPORT_COLUMN: &str = "HomeAway";

const RANK_COLUMN: &str = "Rk";
const DATE_COLUMN: &str = "Date";
const MINUTES_COLUMN: &str = "MP";

/// Outcome of cleaning one player's table
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub player: String,
    pub rows: Vec<GameLogRow>,
    pub header_rows_removed: usize,
    pub summary_row_removed: bool,
    pub missing_columns: Vec<String>,
}

/// Convert minutes played to decimal minutes.
///
/// "35:30" -> 35.5. Seconds are divided as-is, so "10:90" -> 11.5.
/// Plain numbers pass through; anything else is missing.
pub fn parse_minutes(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Some((m, s)) = value.split_once(':') {
        let minutes = m.trim().parse::<u32>().ok()?;
        let seconds = s.trim().parse::<u32>().ok()?;
        return Some(minutes as f64 + seconds as f64 / 60.0);
    }
    parse_numeric(value)
}

/// Lenient numeric conversion. Empty, non-numeric and non-finite cells are missing.
pub fn parse_numeric(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a game date down to calendar-day granularity
pub fn parse_game_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(value, "%a, %b %d, %Y").ok()
}

fn is_repeated_header(table: &RawTable, row: &[String]) -> bool {
    match table.cell(row, RANK_COLUMN) {
        Some(rank) => rank.trim() == RANK_COLUMN,
        None => table.column_index(RANK_COLUMN).is_none() && row == table.headers.as_slice(),
    }
}

/// A season-total row has no game number and no date
fn is_summary_row(table: &RawTable, row: &[String]) -> bool {
    let has_rank = table
        .cell(row, RANK_COLUMN)
        .and_then(|r| r.trim().parse::<u32>().ok())
        .is_some_and(|r| r > 0);
    let has_date = table
        .cell(row, DATE_COLUMN)
        .and_then(parse_game_date)
        .is_some();

    if table.column_index(RANK_COLUMN).is_some() {
        !has_rank || !has_date
    } else {
        !has_date
    }
}

/// Clean one player's raw gamelog.
///
/// Drops repeated header rows and the trailing season-total row (only when
/// it really is one), turns the venue marker into Home/Away, coerces stat
/// columns and parses minutes and dates. Absent columns are reported, not fatal.
pub fn clean_player_table(raw: &RawTable, player: &str) -> CleanReport {
    let mut rows: Vec<&Vec<String>> = raw.rows.iter().collect();

    let before = rows.len();
    rows.retain(|row| !is_repeated_header(raw, row));
    let header_rows_removed = before - rows.len();

    let summary_row_removed = match rows.last() {
        Some(last) if is_summary_row(raw, last) => {
            rows.pop();
            true
        }
        Some(_) => {
            warn!(
                "Player:{} last row looks like a game, not a season total; keeping it",
                player
            );
            false
        }
        None => false,
    };

    let venue_column = VENUE_COLUMNS
        .iter()
        .find_map(|c| raw.column_index(c));
    let mut missing_columns = Vec::new();
    if venue_column.is_none() {
        warn!("Player:{} Error: home/away column not available", player);
        missing_columns.push(VENUE_REPORT_COLUMN.to_string());
    }
    for column in [DATE_COLUMN, "Opp", MINUTES_COLUMN]
        .iter()
        .chain(NUMERIC_COLUMNS.iter())
    {
        if raw.column_index(column).is_none() {
            warn!("Player:{} Error: Column {} not available", player, column);
            missing_columns.push(column.to_string());
        }
    }

    let cleaned: Vec<GameLogRow> = rows
        .into_iter()
        .map(|row| {
            let text = |column: &str| raw.cell(row, column).unwrap_or_default().trim().to_string();

            let mut game = GameLogRow {
                rank: raw
                    .cell(row, RANK_COLUMN)
                    .and_then(|r| r.trim().parse().ok()),
                date: raw.cell(row, DATE_COLUMN).and_then(parse_game_date),
                team: text("Team"),
                venue: venue_column
                    .map(|idx| Venue::from_marker(row.get(idx).map(|s| s.as_str()).unwrap_or(""))),
                opponent: text("Opp"),
                result: text("Result"),
                minutes: raw.cell(row, MINUTES_COLUMN).and_then(parse_minutes),
                ..Default::default()
            };

            for column in NUMERIC_COLUMNS {
                let value = raw.cell(row, column).and_then(parse_numeric);
                if let Some(slot) = game.stat_mut(column) {
                    *slot = value;
                }
            }

            game
        })
        .collect();

    debug!(
        "Player:{} removed {} header rows, summary row removed: {}",
        player, header_rows_removed, summary_row_removed
    );
    info!("Cleaned {} games for {}", cleaned.len(), player);

    CleanReport {
        player: player.to_string(),
        rows: cleaned,
        header_rows_removed,
        summary_row_removed,
        missing_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn headers() -> Vec<String> {
        s(&[
            "Rk", "Gcar", "Gtm", "Date", "Team", "", "Opp", "Result", "GS", "MP", "FG", "FGA",
            "FG%", "3P", "3PA", "3P%", "2P", "2PA", "2P%", "eFG%", "FT", "FTA", "FT%", "ORB", "DRB",
            "TRB", "AST", "STL", "BLK", "TOV", "PF", "PTS", "GmSc", "+/-",
        ])
    }

    fn game(rk: &str, date: &str, venue: &str, opp: &str, mp: &str, pts: &str) -> Vec<String> {
        s(&[
            rk, rk, rk, date, "LAC", venue, opp, "W, 110-100", "*", mp, "8", "17", ".471", "3",
            "8", ".375", "5", "9", ".556", ".559", "6", "7", ".857", "1", "5", "6", "9", "2", "0",
            "4", "2", pts, "21.3", "+7",
        ])
    }

    fn raw_gamelog() -> RawTable {
        let mut rows = vec![
            game("1", "2025-10-22", "", "UTA", "35:30", "25"),
            game("2", "2025-10-24", "@", "DEN", "0:45", "2"),
        ];
        rows.push(headers());
        rows.push(game("3", "2025-10-26", "@", "PHO", "Inactive", ""));
        rows.push(s(&[
            "", "", "", "3 Games", "", "", "", "", "", "36:15", "24", "51",
        ]));
        RawTable::new(headers(), rows)
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes("35:30"), Some(35.5));
        assert_eq!(parse_minutes("0:45"), Some(0.75));
        assert_eq!(parse_minutes("10:90"), Some(11.5));
        assert_eq!(parse_minutes("32"), Some(32.0));
        assert_eq!(parse_minutes("31.5"), Some(31.5));
        assert_eq!(parse_minutes("Did Not Play"), None);
        assert_eq!(parse_minutes(""), None);
        assert_eq!(parse_minutes("ab:cd"), None);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(".471"), Some(0.471));
        assert_eq!(parse_numeric("+7"), Some(7.0));
        assert_eq!(parse_numeric("-12"), Some(-12.0));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("Inactive"), None);
        assert_eq!(parse_numeric("inf"), None);
    }

    #[test]
    fn test_parse_game_date_drops_time() {
        let expected = NaiveDate::from_ymd_opt(2025, 10, 22);
        assert_eq!(parse_game_date("2025-10-22"), expected);
        assert_eq!(parse_game_date("2025-10-22 00:00:00"), expected);
        assert_eq!(parse_game_date("2025-10-22T19:30:00"), expected);
        assert_eq!(parse_game_date("Wed, Oct 22, 2025"), expected);
        assert_eq!(parse_game_date("3 Games"), None);
    }

    #[test]
    fn test_clean_player_table() {
        let report = clean_player_table(&raw_gamelog(), "Ivica Zubac");

        assert_eq!(report.header_rows_removed, 1);
        assert!(report.summary_row_removed);
        assert!(report.missing_columns.is_empty());
        assert_eq!(report.rows.len(), 3);

        let first = &report.rows[0];
        assert_eq!(first.rank, Some(1));
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 10, 22));
        assert_eq!(first.venue, Some(Venue::Home));
        assert_eq!(first.opponent, "UTA");
        assert_eq!(first.minutes, Some(35.5));
        assert_eq!(first.pts, Some(25.0));
        assert_eq!(first.fg_pct, Some(0.471));
        assert_eq!(first.plus_minus, Some(7.0));

        let second = &report.rows[1];
        assert_eq!(second.venue, Some(Venue::Away));
        assert_eq!(second.minutes, Some(0.75));

        let inactive = &report.rows[2];
        assert_eq!(inactive.minutes, None);
        assert_eq!(inactive.pts, None);
    }

    #[test]
    fn test_clean_keeps_last_game_without_summary_row() {
        let mut raw = raw_gamelog();
        raw.rows.pop();
        let report = clean_player_table(&raw, "Ivica Zubac");
        assert!(!report.summary_row_removed);
        assert_eq!(report.rows.len(), 3);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let raw = raw_gamelog();
        let first = clean_player_table(&raw, "Stephen Curry");
        let second = clean_player_table(&raw, "Stephen Curry");
        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn test_missing_column_is_reported_not_fatal() {
        let mut raw = raw_gamelog();
        raw.drop_column("GmSc");
        let report = clean_player_table(&raw, "James Harden");
        assert_eq!(report.missing_columns, vec!["GmSc".to_string()]);
        assert_eq!(report.rows.len(), 3);
        assert!(report.rows.iter().all(|r| r.game_score.is_none()));
        assert_eq!(report.rows[0].pts, Some(25.0));
    }

    #[test]
    fn test_missing_venue_column_is_reported() {
        let mut raw = raw_gamelog();
        raw.drop_column("");
        let report = clean_player_table(&raw, "Jalen Brunson");
        assert_eq!(report.missing_columns, vec![VENUE_REPORT_COLUMN.to_string()]);
        assert_eq!(report.rows.len(), 3);
        assert!(report.rows.iter().all(|r| r.venue.is_none()));
    }
}
