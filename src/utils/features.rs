use crate::error::PipelineError;
use crate::models::{FeatureRow, GameLogRow, TeamAdvancedStats, Venue};
use crate::utils::teams::{team_name, TeamStatsTable};
use tracing::debug;

/// Free throws count for less than a full possession
const FREE_THROW_WEIGHT: f64 = 0.44;

/// Mean of the `window` values strictly before `index`.
/// Missing if the window runs off the start or holds a missing value.
pub fn trailing_mean(values: &[Option<f64>], index: usize, window: usize) -> Option<f64> {
    if window == 0 || index < window || index > values.len() {
        return None;
    }
    let slice = &values[index - window..index];
    let sum = slice.iter().copied().sum::<Option<f64>>()?;
    Some(sum / window as f64)
}

/// Mean of every present value strictly before `index`
pub fn expanding_mean(values: &[Option<f64>], index: usize) -> Option<f64> {
    let prior: Vec<f64> = values
        .get(..index)?
        .iter()
        .flatten()
        .copied()
        .collect();
    if prior.is_empty() {
        return None;
    }
    Some(prior.iter().sum::<f64>() / prior.len() as f64)
}

/// Possessions used per minute: (FGA + 0.44 * FTA) / MP. Undefined without minutes.
pub fn usage_rate(fga: Option<f64>, fta: Option<f64>, minutes: Option<f64>) -> Option<f64> {
    let minutes = minutes.filter(|m| *m > 0.0)?;
    Some((fga? + FREE_THROW_WEIGHT * fta?) / minutes)
}

/// Look-back features for one game, computed from earlier games only
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingFeatures {
    pub pts_last3: Option<f64>,
    pub pts_last5: Option<f64>,
    pub fga_last3: Option<f64>,
    pub mp_last5: Option<f64>,
    pub pts_season: Option<f64>,
    pub usage: Option<f64>,
}

impl RollingFeatures {
    fn is_complete(&self) -> bool {
        self.pts_last3.is_some()
            && self.pts_last5.is_some()
            && self.fga_last3.is_some()
            && self.mp_last5.is_some()
            && self.pts_season.is_some()
            && self.usage.is_some()
    }
}

/// Games the player actually played, oldest first.
///
/// A game counts once it has a points total and a date; ties on date keep
/// their table order.
pub fn played_games(rows: &[GameLogRow]) -> Vec<&GameLogRow> {
    let mut games: Vec<&GameLogRow> = rows
        .iter()
        .filter(|r| r.pts.is_some() && r.date.is_some())
        .collect();
    games.sort_by_key(|r| r.date);
    debug!(
        "{} of {} gamelog rows are played games",
        games.len(),
        rows.len()
    );
    games
}

/// Rolling features for each game of an already chronological history
pub fn rolling_features(games: &[&GameLogRow]) -> Vec<RollingFeatures> {
    let pts: Vec<Option<f64>> = games.iter().map(|g| g.pts).collect();
    let fga: Vec<Option<f64>> = games.iter().map(|g| g.fga).collect();
    let mp: Vec<Option<f64>> = games.iter().map(|g| g.minutes).collect();

    games
        .iter()
        .enumerate()
        .map(|(i, g)| RollingFeatures {
            pts_last3: trailing_mean(&pts, i, 3),
            pts_last5: trailing_mean(&pts, i, 5),
            fga_last3: trailing_mean(&fga, i, 3),
            mp_last5: trailing_mean(&mp, i, 5),
            pts_season: expanding_mean(&pts, i),
            usage: usage_rate(g.fga, g.fta, g.minutes),
        })
        .collect()
}

fn assemble(
    game: &GameLogRow,
    rolling: &RollingFeatures,
    home: f64,
    opponent: &str,
    opp: &TeamAdvancedStats,
    points: Option<f64>,
) -> Option<FeatureRow> {
    Some(FeatureRow {
        date: game.date,
        opponent: opponent.to_string(),
        home,
        minutes: game.minutes?,
        fga: game.fga?,
        three_p: game.three_p?,
        fta: game.fta?,
        usage: rolling.usage?,
        pts_last3: rolling.pts_last3?,
        pts_last5: rolling.pts_last5?,
        fga_last3: rolling.fga_last3?,
        mp_last5: rolling.mp_last5?,
        pts_season: rolling.pts_season?,
        drtg: opp.drtg,
        ortg: opp.ortg,
        nrtg: opp.nrtg,
        pace: opp.pace,
        efg_pct_def: opp.efg_pct_def,
        points,
    })
}

/// Join each played game with its opponent's advanced stats and add
/// look-back features.
///
/// Games that can't produce a full row are dropped: the first five of the
/// season (not enough history), games against an unmapped or unknown
/// opponent, and games with a missing stat.
pub fn add_features(rows: &[GameLogRow], teams: &TeamStatsTable) -> Vec<FeatureRow> {
    let games = played_games(rows);
    let rolling = rolling_features(&games);

    let features: Vec<FeatureRow> = games
        .iter()
        .zip(rolling.iter())
        .filter_map(|(game, rolling)| {
            let opp = team_name(&game.opponent).and_then(|name| teams.get(name))?;
            let home = game.venue?.indicator();
            assemble(game, rolling, home, &game.opponent, opp, game.pts)
        })
        .collect();

    debug!(
        "Built {} feature rows from {} played games",
        features.len(),
        games.len()
    );
    features
}

/// Project the player's current form onto an upcoming game.
///
/// Form comes from the most recent game with complete features; home flag
/// and opponent ratings come from the arguments, never from that game.
pub fn make_next_game_features(
    rows: &[GameLogRow],
    teams: &TeamStatsTable,
    next_opp_abbrev: &str,
    venue: Venue,
) -> Result<FeatureRow, PipelineError> {
    let opp = teams.by_abbrev(next_opp_abbrev)?;

    let games = played_games(rows);
    let rolling = rolling_features(&games);

    games
        .iter()
        .zip(rolling.iter())
        .rev()
        .filter(|(_, rolling)| rolling.is_complete())
        .find_map(|(game, rolling)| {
            assemble(
                game,
                rolling,
                venue.indicator(),
                next_opp_abbrev,
                opp,
                None,
            )
        })
        .map(|mut row| {
            row.date = None;
            row
        })
        .ok_or(PipelineError::InsufficientHistory)
}
