//! Prediction adapter around the two fitted models.
//!
//! The models are opaque to the pipeline: a price regressor predicting the
//! next bar's close, and a direction model trained on 0/1 up-labels whose
//! ensemble mean is read as P(up). Both are loaded once at startup, held
//! immutable for the process lifetime, and injected where needed — never
//! ambient global state.

use crate::domain::errors::PipelineError;
use crate::domain::ml::FeatureVector;
use anyhow::{Result, anyhow};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

type ForestModel = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Output of one inference pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub predicted_price: f64,
    pub probability_up: f64,
}

/// Stateless, deterministic point prediction from one feature vector.
pub trait PredictionService: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction>;
}

/// The production predictor pair, deserialized from disk.
#[derive(Debug)]
pub struct ForecastModels {
    price_model: ForestModel,
    direction_model: ForestModel,
}

impl ForecastModels {
    /// Load both models. A missing or corrupt file is fatal at startup:
    /// the caller must not start serving without a loaded predictor.
    pub fn load(price_path: &Path, direction_path: &Path) -> Result<Self, PipelineError> {
        let price_model = Self::load_model(price_path)?;
        let direction_model = Self::load_model(direction_path)?;
        info!(
            "Loaded price model from {:?} and direction model from {:?}",
            price_path, direction_path
        );
        Ok(Self {
            price_model,
            direction_model,
        })
    }

    fn load_model(path: &Path) -> Result<ForestModel, PipelineError> {
        let file = File::open(path).map_err(|e| PipelineError::ModelUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            PipelineError::ModelUnavailable {
                path: path.display().to_string(),
                reason: format!("deserialization failed: {e}"),
            }
        })
    }

    fn infer(model: &ForestModel, features: &FeatureVector) -> Result<f64> {
        let matrix = DenseMatrix::from_2d_vec(&vec![features.to_vec()])
            .map_err(|e| anyhow!("matrix creation failed: {e}"))?;
        let predictions = model
            .predict(&matrix)
            .map_err(|e| anyhow!("prediction failed: {e}"))?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| anyhow!("model returned no prediction"))
    }
}

impl PredictionService for ForecastModels {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let predicted_price = Self::infer(&self.price_model, features)?;
        // Mean of 0/1 leaf votes; clamp guards against extrapolation noise.
        let probability_up = Self::infer(&self.direction_model, features)?.clamp(0.0, 1.0);
        Ok(Prediction {
            predicted_price,
            probability_up,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_model_is_model_unavailable() {
        let missing = Path::new("/nonexistent/price_model.json");
        let err = ForecastModels::load(missing, missing).unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable { .. }));
        assert!(err.to_string().contains("price_model.json"));
    }

    #[test]
    fn test_load_corrupt_model_is_model_unavailable() {
        let dir = std::env::temp_dir();
        let path = dir.join("intracast_corrupt_model_test.json");
        std::fs::write(&path, b"not a model").unwrap();
        let err = ForecastModels::load(&path, &path).unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable { .. }));
        let _ = std::fs::remove_file(&path);
    }
}
