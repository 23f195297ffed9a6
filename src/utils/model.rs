use crate::error::PipelineError;
use crate::models::{FeatureRow, FEATURE_NAMES};
use anyhow::{Context, Result};
use linfa::prelude::*;
use linfa_elasticnet::ElasticNet;
use ndarray::{Array1, Array2, Axis, Ix1};
use serde::Serialize;
use tracing::info;

/// Share of the most recent games held out for evaluation
pub const TEST_FRACTION: f64 = 0.2;

const PENALTY: f64 = 0.1;
const L1_RATIO: f64 = 0.1;
const MAX_ITERATIONS: u32 = 5000;
const MIN_TRAINING_GAMES: usize = 2;

/// Split rows in time order: the latest `test_fraction` of games is the test set.
///
/// Never shuffles. The test size is rounded up so at least one game is held
/// out whenever there are two or more rows.
pub fn chronological_split(
    rows: &[FeatureRow],
    test_fraction: f64,
) -> (Vec<FeatureRow>, Vec<FeatureRow>) {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|r| r.date);

    let n = sorted.len();
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n.saturating_sub(1));
    let test = sorted.split_off(n - n_test);
    (sorted, test)
}

fn feature_matrix(rows: &[FeatureRow]) -> Array2<f64> {
    let values: Vec<[f64; 16]> = rows.iter().map(FeatureRow::to_array).collect();
    Array2::from_shape_fn((values.len(), FEATURE_NAMES.len()), |(i, j)| values[i][j])
}

/// Features and points of the rows that have a points label
fn labelled(rows: &[FeatureRow]) -> (Array2<f64>, Array1<f64>) {
    let rows: Vec<FeatureRow> = rows.iter().filter(|r| r.points.is_some()).cloned().collect();
    let targets: Array1<f64> = rows.iter().filter_map(|r| r.points).collect();
    (feature_matrix(&rows), targets)
}

/// Per-feature z-scoring learned from the training games, applied before
/// every fit and predict. Constant features keep a scale of 1.
#[derive(Debug, Clone)]
struct FeatureScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl FeatureScaler {
    fn fit(records: &Array2<f64>) -> Self {
        let means = records
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(records.ncols()));
        let scales = records
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        Self { means, scales }
    }

    fn transform(&self, records: &Array2<f64>) -> Array2<f64> {
        (records - &self.means) / &self.scales
    }
}

/// Held-out performance of a fitted model
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub train_games: usize,
    pub test_games: usize,
    pub mean_absolute_error: f64,
}

/// Regression from the feature vector to points scored
pub struct PointsModel {
    scaler: FeatureScaler,
    model: ElasticNet<f64>,
}

impl PointsModel {
    /// Fit on labelled rows; unlabelled rows are ignored
    pub fn fit(rows: &[FeatureRow]) -> Result<Self> {
        let (records, targets) = labelled(rows);
        let games = records.nrows();
        if games < MIN_TRAINING_GAMES {
            return Err(PipelineError::NotEnoughGames {
                needed: MIN_TRAINING_GAMES,
                got: games,
            }
            .into());
        }

        let scaler = FeatureScaler::fit(&records);
        let dataset: Dataset<f64, f64, Ix1> = Dataset::new(scaler.transform(&records), targets)
            .with_feature_names(FEATURE_NAMES.to_vec());

        let model = ElasticNet::params()
            .penalty(PENALTY)
            .l1_ratio(L1_RATIO)
            .max_iterations(MAX_ITERATIONS)
            .fit(&dataset)
            .context("Failed to fit points model")?;

        Ok(Self { scaler, model })
    }

    fn predict_records(&self, records: &Array2<f64>) -> Array1<f64> {
        self.model.predict(&self.scaler.transform(records))
    }

    pub fn predict(&self, rows: &[FeatureRow]) -> Array1<f64> {
        self.predict_records(&feature_matrix(rows))
    }

    pub fn predict_one(&self, row: &FeatureRow) -> f64 {
        self.predict(std::slice::from_ref(row))[0]
    }

    /// Mean absolute error against the labelled rows
    pub fn mean_absolute_error(&self, rows: &[FeatureRow]) -> Result<f64> {
        let (records, targets) = labelled(rows);
        let predictions = self.predict_records(&records);
        let dataset: Dataset<f64, f64, Ix1> = Dataset::new(records, targets);
        predictions
            .mean_absolute_error(&dataset)
            .context("Failed to score points model")
    }

    /// Fitted weight per standardized feature, plus the intercept
    pub fn coefficients(&self) -> (Vec<(&'static str, f64)>, f64) {
        let weights = FEATURE_NAMES
            .iter()
            .copied()
            .zip(self.model.hyperplane().iter().copied())
            .collect();
        (weights, self.model.intercept())
    }
}

/// Fit on the older 80% of games and score on the most recent 20%
pub fn train_and_evaluate(rows: &[FeatureRow]) -> Result<(PointsModel, Evaluation)> {
    let (train, test) = chronological_split(rows, TEST_FRACTION);
    let model = PointsModel::fit(&train)?;

    let mean_absolute_error = if test.is_empty() {
        f64::NAN
    } else {
        model.mean_absolute_error(&test)?
    };

    info!(
        "Trained on {} games, tested on {}: MAE {:.2} points",
        train.len(),
        test.len(),
        mean_absolute_error
    );

    Ok((
        model,
        Evaluation {
            train_games: train.len(),
            test_games: test.len(),
            mean_absolute_error,
        },
    ))
}
