//! Builds and compiles the two-block classifier and saves it untrained,
//! without optimizer state.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use model_manager::{save_model, ModelArtifact};
use model_trainer::recipes::standard_model;
use model_trainer::{CompileSettings, CompiledModel};
use service_config::defaults::DEFAULT_MODEL_PATH;

fn main() -> Result<()> {
    logging::init_default()?;
    let mut rng = rand::thread_rng();
    
    let network = standard_model(&mut rng)?;
    info!("\n{}", network.summary()?);
    
    let model = CompiledModel::compile(network, CompileSettings::default())?;
    let artifact = ModelArtifact::from_compiled(model, false)?;
    save_model(Path::new(DEFAULT_MODEL_PATH), &artifact)?;
    println!("Saved model to {}", DEFAULT_MODEL_PATH);
    
    Ok(())
}
