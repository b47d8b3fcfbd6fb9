//! Builds the small demo classifier, fits it briefly on random data and
//! saves it together with its optimizer state.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use model_manager::{save_model, ModelArtifact};
use model_trainer::recipes::{
    dummy_model, DUMMY_BATCH_SIZE, DUMMY_EPOCHS, DUMMY_SAMPLES, MODEL_INPUT_SHAPE, NUM_CLASSES,
};
use model_trainer::{CompileSettings, CompiledModel, FitOptions, SyntheticDataset};
use service_config::defaults::DEFAULT_MODEL_PATH;

fn main() -> Result<()> {
    logging::init_default()?;
    let mut rng = rand::thread_rng();
    
    let network = dummy_model(&mut rng)?;
    info!("\n{}", network.summary()?);
    
    let mut model = CompiledModel::compile(network, CompileSettings::default())?;
    let data = SyntheticDataset::generate(&mut rng, DUMMY_SAMPLES, MODEL_INPUT_SHAPE, NUM_CLASSES)?;
    
    let options = FitOptions {
        epochs: DUMMY_EPOCHS,
        batch_size: DUMMY_BATCH_SIZE,
        shuffle: true,
    };
    model.fit(data.images.view(), &data.labels, options, &mut rng)?;
    
    let artifact = ModelArtifact::from_compiled(model, true)?;
    save_model(Path::new(DEFAULT_MODEL_PATH), &artifact)?;
    println!("Saved model to {}", DEFAULT_MODEL_PATH);
    
    Ok(())
}
