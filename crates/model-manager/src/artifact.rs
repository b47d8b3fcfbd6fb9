//! Model artifact format
//!
//! An artifact is a single JSON document holding the network topology and
//! weights, optionally the compile settings and Adam slots, and a metadata
//! header. The format version is checked on load.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::error::{Error, Result};
use common::utils::format_bytes;
use inference_engine::Sequential;
use model_trainer::{AdamState, CompileSettings, CompiledModel};

use crate::metadata::ArtifactMetadata;

/// Current artifact format version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Serialized model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Format version
    pub format_version: u32,
    
    /// Descriptive header
    pub metadata: ArtifactMetadata,
    
    /// Topology and weights
    pub network: Sequential,
    
    /// Compile settings, if the model was compiled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile: Option<CompileSettings>,
    
    /// Adam slots, if requested at save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer_state: Option<AdamState>,
}

impl ModelArtifact {
    /// Artifact for a bare or compiled-but-untrained network
    pub fn from_network(network: Sequential, compile: Option<CompileSettings>) -> Result<Self> {
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            metadata: ArtifactMetadata::describe(&network, false)?,
            network,
            compile,
            optimizer_state: None,
        })
    }
    
    /// Artifact for a compiled model, optionally keeping its optimizer slots
    pub fn from_compiled(model: CompiledModel, include_optimizer: bool) -> Result<Self> {
        let (network, settings, state) = model.into_parts();
        
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            metadata: ArtifactMetadata::describe(&network, include_optimizer)?,
            network,
            compile: Some(settings),
            optimizer_state: include_optimizer.then_some(state),
        })
    }
    
    /// Checks version, topology and optimizer slots
    pub fn validate(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(Error::Model(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        
        self.network.validate()?;
        
        let num_classes = self.network.num_classes()?;
        if self.metadata.num_classes != num_classes || self.metadata.input_shape != self.network.input_shape() {
            return Err(Error::Model(format!(
                "metadata describes input {} with {} classes, network has input {} with {} classes",
                self.metadata.input_shape,
                self.metadata.num_classes,
                self.network.input_shape(),
                num_classes
            )));
        }
        
        if let Some(state) = &self.optimizer_state {
            let params = self.network.parameters();
            let aligned = state.m.len() == params.len()
                && state.v.len() == params.len()
                && params
                    .iter()
                    .zip(state.m.iter().zip(&state.v))
                    .all(|(p, (m, v))| m.shape() == p.shape() && v.shape() == p.shape());
            if state.iterations > 0 && !aligned {
                return Err(Error::Model("optimizer state does not match the network".to_string()));
            }
        }
        
        Ok(())
    }
}

/// Writes `artifact` to `path`, creating parent directories
pub fn save_model(path: &Path, artifact: &ModelArtifact) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    
    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer(&mut writer, artifact)?;
    writer.flush()?;
    
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    info!(
        "Saved model {} ({} params, {}) to {}",
        artifact.metadata.name,
        artifact.metadata.parameter_count,
        format_bytes(size),
        path.display()
    );
    Ok(())
}

/// Reads and validates an artifact
pub fn load_model(path: &Path) -> Result<ModelArtifact> {
    if !path.exists() {
        return Err(Error::NotFound(format!("Model file not found: {}", path.display())));
    }
    
    debug!("Reading model artifact {}", path.display());
    let reader = BufReader::new(fs::File::open(path)?);
    let artifact: ModelArtifact = serde_json::from_reader(reader)?;
    artifact.validate()?;
    
    info!(
        "Loaded model {} saved at {}",
        artifact.metadata.name, artifact.metadata.saved_at
    );
    Ok(artifact)
}
