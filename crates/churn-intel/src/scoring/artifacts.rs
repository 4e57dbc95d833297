use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::classifier::LogisticModel;
use super::contract::FeatureContract;
use super::encoder::EncodingSpec;
use super::rescaler::ScalerParams;

pub const CONTRACT_FILE: &str = "feature_list.json";
pub const ENCODING_FILE: &str = "encoding.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const METADATA_FILE: &str = "model_metadata.json";

/// Categorical attributes the churn model has always been trained on.
pub const DEFAULT_CATEGORICAL_ATTRIBUTES: [&str; 3] = ["gender", "seniorcitizen", "contract"];

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("required artifact {} is missing", path.display())]
    Missing { path: PathBuf },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} lists {expected} features but the contract has {actual}", METADATA_FILE)]
    FeatureCount { expected: usize, actual: usize },
}

/// Descriptive metadata written alongside the model at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default = "unknown_version")]
    pub model_version: String,
    #[serde(default)]
    pub training_date: Option<String>,
    #[serde(default)]
    pub selected_model: Option<String>,
    #[serde(default)]
    pub num_features: Option<usize>,
    #[serde(default = "default_categorical_attributes")]
    pub categorical_features: Vec<String>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            model_version: unknown_version(),
            training_date: None,
            selected_model: None,
            num_features: None,
            categorical_features: default_categorical_attributes(),
        }
    }
}

fn unknown_version() -> String {
    "unversioned".to_string()
}

fn default_categorical_attributes() -> Vec<String> {
    DEFAULT_CATEGORICAL_ATTRIBUTES
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Everything a training run leaves behind for serving.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringArtifacts {
    pub contract: FeatureContract,
    pub encoding: Option<EncodingSpec>,
    pub scaler: Option<ScalerParams>,
    pub model: LogisticModel,
    pub metadata: ModelMetadata,
}

impl ScoringArtifacts {
    /// Load artifacts from `dir`. The contract and model are required; a
    /// missing scaler means the model consumes unscaled features.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();
        let contract: FeatureContract = read_json(&dir.join(CONTRACT_FILE))?;
        let model: LogisticModel = read_json(&dir.join(MODEL_FILE))?;
        let encoding = read_optional_json(&dir.join(ENCODING_FILE))?;
        let scaler = read_optional_json(&dir.join(SCALER_FILE))?;
        let metadata: ModelMetadata =
            read_optional_json(&dir.join(METADATA_FILE))?.unwrap_or_default();

        if let Some(expected) = metadata.num_features {
            if expected != contract.len() {
                return Err(ArtifactError::FeatureCount {
                    expected,
                    actual: contract.len(),
                });
            }
        }

        info!(
            dir = %dir.display(),
            features = contract.len(),
            scaled = scaler.is_some(),
            persisted_encoding = encoding.is_some(),
            model_version = metadata.model_version.as_str(),
            "scoring artifacts loaded"
        );

        Ok(Self {
            contract,
            encoding,
            scaler,
            model,
            metadata,
        })
    }

    /// Write the artifact set to `dir`, creating it when needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        write_json(&dir.join(CONTRACT_FILE), &self.contract)?;
        write_json(&dir.join(MODEL_FILE), &self.model)?;
        write_json(&dir.join(METADATA_FILE), &self.metadata)?;
        if let Some(encoding) = &self.encoding {
            write_json(&dir.join(ENCODING_FILE), encoding)?;
        }
        if let Some(scaler) = &self.scaler {
            write_json(&dir.join(SCALER_FILE), scaler)?;
        }
        Ok(())
    }

    /// The persisted encoding, or one inferred from the contract when the
    /// training run predates `encoding.json`.
    pub fn encoding_or_inferred(&self) -> EncodingSpec {
        match &self.encoding {
            Some(encoding) => encoding.clone(),
            None => {
                let attributes: Vec<&str> = self
                    .metadata
                    .categorical_features
                    .iter()
                    .map(String::as_str)
                    .collect();
                EncodingSpec::infer_from_contract(&self.contract, &attributes)
            }
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    read_optional_json(path)?.ok_or_else(|| ArtifactError::Missing {
        path: path.to_path_buf(),
    })
}

fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ArtifactError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let file = File::create(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}
