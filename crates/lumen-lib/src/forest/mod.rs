//! Random-forest regressor
//!
//! Bagging and tree growth are delegated to smartcore's
//! `RandomForestRegressor`. This module pins the hyperparameters, keeps the
//! feature count next to the fitted ensemble and scores permutation
//! importances once at fit time, one feature per rayon task.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::{debug, info};

type Regressor = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

impl ForestParams {
    /// Every feature is a split candidate at every node
    fn regressor_params(&self, n_features: usize) -> RandomForestRegressorParameters {
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.n_estimators)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_m(n_features.max(1))
            .with_seed(self.seed);
        match self.max_depth {
            Some(depth) => params.with_max_depth(u16::try_from(depth).unwrap_or(u16::MAX)),
            None => params,
        }
    }
}

/// A fitted random forest
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_trees: usize,
    /// Permutation importances on the training rows, summing to one
    importances: Vec<f64>,
    model: Regressor,
}

impl RandomForest {
    /// Fit a forest on feature rows `x` and targets `y`
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Self, Failed> {
        let n_features = x.first().map(|r| r.len()).unwrap_or(0);
        let model = Regressor::fit(
            &matrix(x)?,
            &y.to_vec(),
            params.regressor_params(n_features),
        )?;

        let mut forest = Self {
            n_features,
            n_trees: params.n_estimators,
            importances: vec![0.0; n_features],
            model,
        };
        forest.importances = forest.permutation_importances(x, y, params.seed)?;

        info!(
            trees = forest.n_trees,
            samples = y.len(),
            features = n_features,
            "Random forest fitted"
        );
        debug!(importances = ?forest.importances, "Permutation importances");
        Ok(forest)
    }

    /// Predict one feature row
    pub fn predict(&self, features: &[f64]) -> Result<f64, Failed> {
        let predictions = self.predict_many(&[features.to_vec()])?;
        Ok(predictions.first().copied().unwrap_or(0.0))
    }

    pub fn predict_many(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, Failed> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        self.model.predict(&matrix(rows)?)
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        self.importances.clone()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Increase in squared error when one column is shuffled, clipped at
    /// zero and normalized. Each column gets its own seeded shuffle.
    fn permutation_importances(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        seed: u64,
    ) -> Result<Vec<f64>, Failed> {
        let baseline = mean_squared_error(y, &self.predict_many(x)?);

        let raw = (0..self.n_features)
            .into_par_iter()
            .map(|feature| {
                let mut column: Vec<f64> = x.iter().map(|r| r[feature]).collect();
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(feature as u64));
                column.shuffle(&mut rng);

                let shuffled: Vec<Vec<f64>> = x
                    .iter()
                    .zip(&column)
                    .map(|(row, &v)| {
                        let mut row = row.clone();
                        row[feature] = v;
                        row
                    })
                    .collect();
                let error = mean_squared_error(y, &self.predict_many(&shuffled)?);
                Ok((error - baseline).max(0.0))
            })
            .collect::<Result<Vec<f64>, Failed>>()?;

        let total: f64 = raw.iter().sum();
        if total > 0.0 {
            Ok(raw.into_iter().map(|v| v / total).collect())
        } else {
            Ok(raw)
        }
    }
}

fn matrix(rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>, Failed> {
    DenseMatrix::from_2d_vec(&rows.to_vec())
}

fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    total / y_true.len() as f64
}
