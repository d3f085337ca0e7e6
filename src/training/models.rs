//! Evaluation metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hold-out regression metrics recorded with every trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RegressionMetrics {
    /// Mean Absolute Error, in crore
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error, in crore
    pub rmse: f64,
    /// R-squared
    pub r2: f64,
    /// Training rows
    pub n_train: usize,
    /// Hold-out rows the metrics were computed on
    pub n_test: usize,
    /// Training time in seconds
    pub training_time_secs: f64,
}

impl RegressionMetrics {
    /// Compute regression metrics
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut metrics = Self {
            n_test: y_true.len(),
            ..Self::default()
        };
        if y_true.is_empty() {
            return metrics;
        }

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        metrics.mse = ss_res / n;
        metrics.rmse = metrics.mse.sqrt();
        metrics.mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.sum() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        metrics.r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else {
            0.0
        };

        metrics
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE {:.3} Cr, RMSE {:.3} Cr, R² {:.4} ({} train / {} test rows)",
            self.mae, self.rmse, self.r2, self.n_train, self.n_test
        )
    }
}
