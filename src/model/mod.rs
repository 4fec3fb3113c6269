//! Trained forest model.
//!
//! A [`Model`] owns everything needed to score new data: the training
//! configuration, the cut and factor tables (reused verbatim for every frame
//! that is scored), the response coding and the trees. Trees are held in
//! their arena form until [`Model::flatten`] converts them into a
//! [`FlatForest`]; prediction and persistence work on the flattened form.

pub mod flatten;

pub use flatten::FlatForest;

use crate::config::Config;
use crate::core::error::{BitForestError, DatasetError, Result};
use crate::core::types::VarType;
use crate::dataset::{BinarizedMatrix, Binarizer, CutTable, DataFrame, ResponseCode, ResponseEncoder};
use crate::forest::{BuildSummary, ForestBuilder};
use crate::prediction::{PredictionConfig, Predictor, ScoreMatrix};
use crate::tree::Tree;
use crate::dataset_error;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Trees of a model, before or after flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForestState {
    /// Arena trees as grown
    Trees(Vec<Tree>),
    /// Index-based layout used for serving
    Flat(FlatForest),
}

/// Trained random forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    config: Config,
    labels: Vec<String>,
    cut_table: CutTable,
    response: ResponseCode,
    forest: ForestState,
    ntrees: usize,
    #[serde(skip)]
    summary: Option<BuildSummary>,
}

impl Model {
    /// Train on `frame` and flatten the result.
    pub fn fit(config: &Config, frame: &DataFrame) -> Result<Self> {
        let mut model = Self::fit_trees(config, frame)?;
        model.flatten()?;
        Ok(model)
    }

    /// Train on `frame`, keeping the trees in arena form.
    pub fn fit_trees(config: &Config, frame: &DataFrame) -> Result<Self> {
        config.validate()?;
        let response_column = frame
            .response()
            .ok_or_else(|| dataset_error!("training frame has no response column"))?;
        if frame.num_rows() == 0 {
            return Err(DatasetError::Empty.into());
        }
        if frame.num_predictors() == 0 {
            return Err(dataset_error!("training frame has no predictors"));
        }
        log::info!(
            "Training on {} rows, {} predictors (types '{}')",
            frame.num_rows(),
            frame.num_predictors(),
            frame.var_types()
        );

        let cut_table = CutTable::fit(frame, config)?;
        let matrix = Binarizer::new(&cut_table).binarize(frame)?;
        let response = ResponseEncoder::from_config(config).encode(response_column)?;
        log::info!(
            "Response coded as {} with {} classes",
            config.task,
            response.nlevels()
        );

        let (trees, summary) = ForestBuilder::new(config)?.build(&matrix, &response)?;
        Ok(Model {
            config: config.clone(),
            labels: frame.labels().to_vec(),
            cut_table,
            response,
            ntrees: trees.len(),
            forest: ForestState::Trees(trees),
            summary: Some(summary),
        })
    }

    /// Convert the arena trees into their flat layout. A no-op when already flat.
    pub fn flatten(&mut self) -> Result<()> {
        if let ForestState::Trees(trees) = &self.forest {
            let flat = FlatForest::flatten(trees, self.response.nlevels())?;
            self.forest = ForestState::Flat(flat);
        }
        Ok(())
    }

    /// Whether the trees are in flat form.
    pub fn is_flat(&self) -> bool {
        matches!(self.forest, ForestState::Flat(_))
    }

    /// Training configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Predictor labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Cut and factor tables.
    pub fn cut_table(&self) -> &CutTable {
        &self.cut_table
    }

    /// Response coding.
    pub fn response(&self) -> &ResponseCode {
        &self.response
    }

    /// Number of trees.
    pub fn ntrees(&self) -> usize {
        self.ntrees
    }

    /// Binary features per predictor.
    pub fn n_bcols(&self) -> Vec<usize> {
        self.cut_table.n_bcols()
    }

    /// Type string with the response first, as for [`DataFrame::var_types`].
    pub fn var_types(&self) -> String {
        std::iter::once(self.response.source_type())
            .chain(self.cut_table.var_types())
            .map(|t: VarType| t.code())
            .collect()
    }

    /// Arena trees, if not yet flattened.
    pub fn trees(&self) -> Option<&[Tree]> {
        match &self.forest {
            ForestState::Trees(trees) => Some(trees),
            ForestState::Flat(_) => None,
        }
    }

    /// Flattened forest, once flattened.
    pub fn flat_forest(&self) -> Option<&FlatForest> {
        match &self.forest {
            ForestState::Flat(flat) => Some(flat),
            ForestState::Trees(_) => None,
        }
    }

    /// Statistics of the build that produced this model (not persisted).
    pub fn build_summary(&self) -> Option<&BuildSummary> {
        self.summary.as_ref()
    }

    /// Number of splits on each predictor over the whole forest.
    pub fn split_counts(&self) -> Vec<usize> {
        let num_vars = self.cut_table.num_vars();
        match &self.forest {
            ForestState::Flat(flat) => flat.split_counts(num_vars),
            ForestState::Trees(trees) => trees.iter().fold(vec![0; num_vars], |mut acc, tree| {
                for (a, c) in acc.iter_mut().zip(tree.split_counts(num_vars)) {
                    *a += c;
                }
                acc
            }),
        }
    }

    /// Binarize `frame` with the training tables.
    pub fn binarize(&self, frame: &DataFrame) -> Result<BinarizedMatrix> {
        Binarizer::new(&self.cut_table).binarize(frame)
    }

    /// Score `frame` with the configured vote method and thread count.
    pub fn predict(&self, frame: &DataFrame) -> Result<ScoreMatrix> {
        let matrix = self.binarize(frame)?;
        self.predict_binarized(&matrix)
    }

    /// Score an already binarized matrix.
    pub fn predict_binarized(&self, matrix: &BinarizedMatrix) -> Result<ScoreMatrix> {
        let config = PredictionConfig::new()
            .with_vote_method(self.config.vote_method)
            .with_num_threads(self.config.num_threads);
        self.predict_with(matrix, config)
    }

    /// Score an already binarized matrix with explicit prediction settings.
    pub fn predict_with(
        &self,
        matrix: &BinarizedMatrix,
        config: PredictionConfig,
    ) -> Result<ScoreMatrix> {
        let flat = self
            .flat_forest()
            .ok_or_else(|| BitForestError::prediction("model must be flattened before prediction"))?;
        if matrix.num_features() != self.cut_table.num_features() {
            return Err(BitForestError::data_dimension_mismatch(format!(
                "model expects {} binary features, matrix has {}",
                self.cut_table.num_features(),
                matrix.num_features()
            )));
        }
        Predictor::new(flat, &self.response, config)?.predict(matrix)
    }

    /// Write `scores` as text: the collapsed estimate under a `pred` header
    /// for a continuous response, otherwise one probability per class.
    pub fn write_scores<W: Write>(&self, scores: &ScoreMatrix, writer: &mut W) -> Result<()> {
        scores.write_to(writer, self.response.is_continuous())
    }

    /// Save the model: JSON for a `.json` path, bincode otherwise. The
    /// trees are flattened first if needed.
    pub fn save_model<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.flatten()?;
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        if is_json(path) {
            serde_json::to_writer(writer, self)?;
        } else {
            bincode::serialize_into(writer, self)?;
        }
        log::info!("Saved model with {} trees to {}", self.ntrees, path.display());
        Ok(())
    }

    /// Load a model written by [`Model::save_model`].
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let model: Model = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            bincode::deserialize_from(reader)?
        };
        model.check_loaded()?;
        log::info!("Loaded model with {} trees from {}", model.ntrees, path.display());
        Ok(model)
    }

    fn check_loaded(&self) -> Result<()> {
        let flat = self
            .flat_forest()
            .ok_or_else(|| BitForestError::serialization("stored model is not flattened"))?;
        if flat.num_trees() != self.ntrees {
            return Err(BitForestError::serialization(format!(
                "header declares {} trees, forest holds {}",
                self.ntrees,
                flat.num_trees()
            )));
        }
        if flat.nlevels() != self.response.nlevels() {
            return Err(BitForestError::serialization(format!(
                "response has {} classes, leaves hold {}",
                self.response.nlevels(),
                flat.nlevels()
            )));
        }
        flat.validate(self.cut_table.num_features())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("json")
}
