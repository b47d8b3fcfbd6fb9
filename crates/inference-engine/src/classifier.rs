//! Classifier seam between the HTTP layer and the network

use common::error::{Error, Result};

use crate::activation::Activation;
use crate::network::Sequential;
use crate::tensor::{InputShape, Tensor};

/// Something that turns a preprocessed image into class probabilities
///
/// Implementations must be safe to share across request handlers; the
/// serving process holds one instance for its whole lifetime.
pub trait ImageClassifier: Send + Sync {
    /// Shape the preprocessed image must have
    fn input_shape(&self) -> InputShape;
    
    /// Length of the probability vector
    fn num_classes(&self) -> usize;
    
    /// Returns one probability per class for a `(height, width, channels)` image
    fn classify(&self, image: &Tensor) -> Result<Vec<f32>>;
}

/// [`ImageClassifier`] backed by a validated [`Sequential`] network
#[derive(Debug, Clone)]
pub struct CnnClassifier {
    /// The network
    network: Sequential,
    
    /// Output width, cached at construction
    num_classes: usize,
}

impl CnnClassifier {
    /// Wraps a network whose last layer is a softmax
    pub fn new(network: Sequential) -> Result<Self> {
        let num_classes = network.num_classes()?;
        
        if network.output_activation() != Activation::Softmax {
            return Err(Error::Model(format!(
                "classifier output must be softmax, got {}",
                network.output_activation()
            )));
        }
        
        Ok(Self { network, num_classes })
    }
    
    /// The wrapped network
    pub fn network(&self) -> &Sequential {
        &self.network
    }
}

impl ImageClassifier for CnnClassifier {
    fn input_shape(&self) -> InputShape {
        self.network.input_shape()
    }
    
    fn num_classes(&self) -> usize {
        self.num_classes
    }
    
    fn classify(&self, image: &Tensor) -> Result<Vec<f32>> {
        let output = self
            .network
            .forward(image)
            .map_err(|e| Error::Inference(e.to_string()))?;
        Ok(output.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    
    #[test]
    fn test_classify_returns_distribution() {
        let mut rng = StdRng::seed_from_u64(11);
        let network = Sequential::builder("tiny", InputShape::new(8, 8, 3))
            .conv2d(2, (3, 3), Activation::Relu)
            .max_pooling2d((2, 2))
            .flatten()
            .dense(4, Activation::Softmax)
            .build(&mut rng)
            .unwrap();
        let classifier = CnnClassifier::new(network).unwrap();
        
        assert_eq!(classifier.num_classes(), 4);
        assert_eq!(classifier.input_shape(), InputShape::new(8, 8, 3));
        
        let probabilities = classifier
            .classify(&ArrayD::from_elem(IxDyn(&[8, 8, 3]), 0.25))
            .unwrap();
        assert_eq!(probabilities.len(), 4);
        assert!((probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        
        let wrong = classifier.classify(&ArrayD::zeros(IxDyn(&[4, 4, 3])));
        assert!(matches!(wrong, Err(Error::Inference(_))));
    }
    
    #[test]
    fn test_rejects_non_softmax_output() {
        let mut rng = StdRng::seed_from_u64(12);
        let network = Sequential::builder("logits", InputShape::new(4, 4, 1))
            .flatten()
            .dense(3, Activation::Linear)
            .build(&mut rng)
            .unwrap();
        assert!(CnnClassifier::new(network).is_err());
    }
}
