use crate::error::PipelineError;
use crate::models::RawTable;
use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

const BASKETBALL_REFERENCE_URL: &str = "https://www.basketball-reference.com";

/// Ids the regular-season gamelog table has gone by
const GAMELOG_TABLE_IDS: [&str; 2] = ["player_game_log_reg", "pgl_basic"];
/// Position of the gamelog among the page's tables when no id matches
const GAMELOG_TABLE_INDEX: usize = 7;
const PER_GAME_TABLE_ID: &str = "per_game_stats";
const ADVANCED_TEAM_TABLE_ID: &str = "advanced-team";

/// Columns of the advanced team table that repeat under the defense header
const FOUR_FACTORS: [&str; 3] = ["eFG%", "TOV%", "FT/FGA"];

pub struct BasketballReferenceScraper {
    client: reqwest::Client,
    base_url: String,
}

impl BasketballReferenceScraper {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(BASKETBALL_REFERENCE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_page(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("{} returned error: {}", url, response.status());
        }

        response.text().await.context("Failed to read page body")
    }

    /// A player's regular-season game log for one season
    pub async fn fetch_player_gamelog(&self, player_id: &str, season: u16) -> Result<RawTable> {
        let path = gamelog_path(player_id, season)?;
        let html = self.fetch_page(&path).await?;
        let table = parse_gamelog_html(&html)?;
        info!("Fetched {} gamelog rows for {}", table.len(), player_id);
        Ok(table)
    }

    /// League-wide per-game averages for every player
    pub async fn fetch_per_game_averages(&self, season: u16) -> Result<RawTable> {
        let html = self
            .fetch_page(&format!("/leagues/NBA_{}_per_game.html", season))
            .await?;
        parse_per_game_html(&html)
    }

    /// Season advanced stats, one row per team
    pub async fn fetch_team_advanced_stats(&self, season: u16) -> Result<RawTable> {
        let html = self
            .fetch_page(&format!("/leagues/NBA_{}.html", season))
            .await?;
        parse_team_advanced_html(&html)
    }
}

/// `/players/<first letter>/<id>/gamelog/<season>`
pub fn gamelog_path(player_id: &str, season: u16) -> Result<String> {
    let player_id = player_id.trim();
    let initial = player_id
        .chars()
        .next()
        .filter(|c| c.is_ascii_alphabetic())
        .with_context(|| format!("Invalid player id: {:?}", player_id))?;
    Ok(format!(
        "/players/{}/{}/gamelog/{}",
        initial, player_id, season
    ))
}

pub fn parse_gamelog_html(html: &str) -> Result<RawTable> {
    for id in GAMELOG_TABLE_IDS {
        if let Some(table) = find_table_by_id(html, id)? {
            return Ok(table);
        }
    }
    warn!(
        "No gamelog table by id, falling back to table #{}",
        GAMELOG_TABLE_INDEX
    );
    find_table_by_index(html, GAMELOG_TABLE_INDEX)?
        .ok_or_else(|| PipelineError::TableNotFound("player gamelog".to_string()).into())
}

/// Per-game table without the trailing league-average row and the Awards column
pub fn parse_per_game_html(html: &str) -> Result<RawTable> {
    let mut table = find_table_by_id(html, PER_GAME_TABLE_ID)?
        .ok_or_else(|| PipelineError::TableNotFound(PER_GAME_TABLE_ID.to_string()))?;

    let is_league_average = table
        .rows
        .last()
        .and_then(|row| table.cell(row, "Player"))
        .is_some_and(|p| p.trim() == "League Average");
    if is_league_average {
        table.rows.pop();
    }
    table.drop_column("Awards");

    info!("Fetched per-game averages for {} players", table.len());
    Ok(table)
}

/// Advanced team table with defensive four factors suffixed `_DEF`,
/// playoff asterisks stripped and the league-average row dropped
pub fn parse_team_advanced_html(html: &str) -> Result<RawTable> {
    let mut table = find_table_by_id(html, ADVANCED_TEAM_TABLE_ID)?
        .ok_or_else(|| PipelineError::TableNotFound(ADVANCED_TEAM_TABLE_ID.to_string()))?;

    suffix_repeated_headers(&mut table.headers, &FOUR_FACTORS, "_DEF");

    if let Some(team_idx) = table.column_index("Team") {
        table.rows.retain(|row| {
            row.get(team_idx)
                .is_some_and(|t| !t.is_empty() && t != "Team" && t != "League Average")
        });
        for row in &mut table.rows {
            row[team_idx] = row[team_idx].trim_end_matches('*').to_string();
        }
    }

    info!("Fetched advanced stats for {} teams", table.len());
    Ok(table)
}

/// Rename the second and later occurrences of the given headers
fn suffix_repeated_headers(headers: &mut [String], names: &[&str], suffix: &str) {
    for name in names {
        let mut seen = false;
        for header in headers.iter_mut().filter(|h| h.as_str() == *name) {
            if seen {
                header.push_str(suffix);
            }
            seen = true;
        }
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .ok()
        .with_context(|| format!("Invalid selector: {}", css))
}

/// Find `<table id=..>` in the page, including tables shipped inside HTML comments
pub fn find_table_by_id(html: &str, id: &str) -> Result<Option<RawTable>> {
    let table_selector = selector(&format!("table#{}", id))?;

    let document = Html::parse_document(html);
    if let Some(table) = document.select(&table_selector).next() {
        return table_from_element(table).map(Some);
    }

    // basketball-reference defers some tables by wrapping them in comments
    let marker = format!("id=\"{}\"", id);
    for comment in html_comments(html).filter(|c| c.contains(&marker)) {
        let fragment = Html::parse_fragment(comment);
        if let Some(table) = fragment.select(&table_selector).next() {
            debug!("Found table {} inside a comment", id);
            return table_from_element(table).map(Some);
        }
    }

    Ok(None)
}

pub fn find_table_by_index(html: &str, index: usize) -> Result<Option<RawTable>> {
    let table_selector = selector("table")?;
    let document = Html::parse_document(html);
    document
        .select(&table_selector)
        .nth(index)
        .map(table_from_element)
        .transpose()
}

fn html_comments(html: &str) -> impl Iterator<Item = &str> {
    html.split("<!--")
        .skip(1)
        .filter_map(|chunk| chunk.split_once("-->").map(|(comment, _)| comment))
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Headers from the last header row, then body rows followed by footer rows.
///
/// Repeated header rows inside the body are kept; the cleaner removes them.
/// Cells spanning several columns are padded so later cells stay aligned.
fn table_from_element(table: ElementRef) -> Result<RawTable> {
    let header_row_selector = selector("thead tr")?;
    let cell_selector = selector("th, td")?;

    let headers: Vec<String> = table
        .select(&header_row_selector)
        .last()
        .map(|row| row.select(&cell_selector).map(cell_text).collect())
        .unwrap_or_default();

    let mut rows = Vec::new();
    for section in ["tbody tr", "tfoot tr"] {
        for row in table.select(&selector(section)?) {
            let mut cells = Vec::new();
            for cell in row.select(&cell_selector) {
                cells.push(cell_text(cell));
                let span = cell
                    .value()
                    .attr("colspan")
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(1);
                cells.extend(std::iter::repeat(String::new()).take(span.saturating_sub(1)));
            }
            if !cells.is_empty() {
                rows.push(cells);
            }
        }
    }

    if headers.is_empty() {
        // Headerless table: promote the first row
        let mut rows = rows.into_iter();
        let headers = rows.next().unwrap_or_default();
        return Ok(RawTable::new(headers, rows.collect()));
    }

    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMELOG_HTML: &str = r#"
        <html><body>
        <table id="player_game_log_reg">
          <thead>
            <tr><th colspan="5"></th><th colspan="3">Shooting</th></tr>
            <tr><th>Rk</th><th>Date</th><th></th><th>Opp</th><th>MP</th><th>FGA</th><th>FTA</th><th>PTS</th></tr>
          </thead>
          <tbody>
            <tr><th>1</th><td>2025-10-21</td><td></td><td>UTA</td><td>35:30</td><td>18</td><td>6</td><td>27</td></tr>
            <tr class="thead"><th>Rk</th><th>Date</th><th></th><th>Opp</th><th>MP</th><th>FGA</th><th>FTA</th><th>PTS</th></tr>
            <tr><th>2</th><td>2025-10-23</td><td>@</td><td>DEN</td><td colspan="4">Did Not Play</td></tr>
          </tbody>
          <tfoot>
            <tr><th></th><td>2 Games</td><td></td><td></td><td>35:30</td><td>18</td><td>6</td><td>27</td></tr>
          </tfoot>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_gamelog_table() {
        let table = parse_gamelog_html(GAMELOG_HTML).unwrap();
        assert_eq!(
            table.headers,
            vec!["Rk", "Date", "", "Opp", "MP", "FGA", "FTA", "PTS"]
        );
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[1][0], "Rk");
        // colspan padding keeps the row full width
        assert_eq!(table.rows[2].len(), 8);
        assert_eq!(table.rows[2][4], "Did Not Play");
        assert_eq!(table.rows[3][1], "2 Games");
    }

    #[test]
    fn test_team_table_inside_comment() {
        let html = r#"
            <div id="all_advanced_team"><!--
            <table id="advanced-team">
              <thead><tr><th>Rk</th><th>Team</th><th>ORtg</th><th>DRtg</th><th>NRtg</th><th>Pace</th><th>eFG%</th><th>TOV%</th><th>eFG%</th><th>TOV%</th></tr></thead>
              <tbody>
                <tr><th>1</th><td>Oklahoma City Thunder*</td><td>119.2</td><td>106.6</td><td>12.6</td><td>100.0</td><td>.556</td><td>10.8</td><td>.505</td><td>15.9</td></tr>
                <tr><th></th><td>League Average</td><td>114.5</td><td>114.5</td><td></td><td>99.4</td><td>.545</td><td>12.6</td><td>.545</td><td>12.6</td></tr>
              </tbody>
            </table>
            --></div>
        "#;
        let table = parse_team_advanced_html(html).unwrap();
        assert_eq!(
            table.headers,
            vec!["Rk", "Team", "ORtg", "DRtg", "NRtg", "Pace", "eFG%", "TOV%", "eFG%_DEF", "TOV%_DEF"]
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "Oklahoma City Thunder");
    }

    #[test]
    fn test_per_game_drops_league_average_and_awards() {
        let html = r#"
            <table id="per_game_stats">
              <thead><tr><th>Rk</th><th>Player</th><th>PTS</th><th>Awards</th></tr></thead>
              <tbody>
                <tr><th>1</th><td>Shai Gilgeous-Alexander</td><td>32.7</td><td>MVP-1</td></tr>
                <tr><th></th><td>League Average</td><td>11.1</td><td></td></tr>
              </tbody>
            </table>
        "#;
        let table = parse_per_game_html(html).unwrap();
        assert_eq!(table.headers, vec!["Rk", "Player", "PTS"]);
        assert_eq!(table.rows, vec![vec!["1", "Shai Gilgeous-Alexander", "32.7"]]);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        assert!(parse_per_game_html("<html><body></body></html>").is_err());
        assert!(parse_gamelog_html("<table><tr><td>1</td></tr></table>").is_err());
    }

    #[test]
    fn test_gamelog_path() {
        assert_eq!(
            gamelog_path("hardeja01", 2026).unwrap(),
            "/players/h/hardeja01/gamelog/2026"
        );
        assert!(gamelog_path("", 2026).is_err());
    }

    #[tokio::test]
    #[ignore] // Ignore by default since it requires network access
    async fn test_fetch_player_gamelog() {
        let scraper = BasketballReferenceScraper::new(Duration::from_secs(30)).unwrap();
        let table = scraper.fetch_player_gamelog("curryst01", 2026).await.unwrap();
        assert!(table.column_index("PTS").is_some());
    }
}
