//! Synthetic training data

use ndarray::Array4;
use rand::Rng;

use common::error::{Error, Result};
use inference_engine::InputShape;

/// Random images with random labels, used only to exercise training
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    /// Images laid out as `(N, height, width, channels)`, uniform in `[0, 1)`
    pub images: Array4<f32>,
    
    /// One class index per image
    pub labels: Vec<usize>,
}

impl SyntheticDataset {
    /// Draws `samples` images of `shape` and labels below `num_classes`
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        samples: usize,
        shape: InputShape,
        num_classes: usize,
    ) -> Result<Self> {
        if num_classes == 0 {
            return Err(Error::InvalidArgument("num_classes must be positive".to_string()));
        }
        
        let InputShape { height, width, channels } = shape;
        let images = Array4::from_shape_fn((samples, height, width, channels), |_| rng.gen::<f32>());
        let labels = (0..samples).map(|_| rng.gen_range(0..num_classes)).collect();
        
        Ok(Self { images, labels })
    }
    
    /// Number of samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }
    
    /// Whether the dataset holds no samples
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
