//! Weight initialisers

use ndarray::{ArrayD, IxDyn};
use rand::Rng;

use crate::tensor::Tensor;

/// Glorot (Xavier) uniform initialisation: U(-l, l), l = sqrt(6 / (fan_in + fan_out))
pub fn glorot_uniform<R: Rng + ?Sized>(rng: &mut R, shape: &[usize], fan_in: usize, fan_out: usize) -> Tensor {
    let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
    ArrayD::from_shape_fn(IxDyn(shape), |_| rng.gen_range(-limit..=limit))
}

/// Zero initialisation, used for biases
pub fn zeros(shape: &[usize]) -> Tensor {
    ArrayD::zeros(IxDyn(shape))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    
    #[test]
    fn test_glorot_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let w = glorot_uniform(&mut rng, &[3, 3, 3, 8], 27, 72);
        let limit = (6.0f32 / 99.0).sqrt();
        
        assert_eq!(w.shape(), &[3, 3, 3, 8]);
        assert!(w.iter().all(|v| v.abs() <= limit));
        assert!(w.iter().any(|v| *v != 0.0));
    }
}
