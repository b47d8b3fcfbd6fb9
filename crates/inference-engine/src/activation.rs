//! Activation functions

use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// Element-wise (or, for softmax, vector-wise) activation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Identity
    #[default]
    Linear,
    /// max(0, x)
    Relu,
    /// Normalised exponential over the whole tensor
    Softmax,
}

impl Activation {
    /// Applies the activation to a pre-activation tensor
    pub fn apply(&self, z: &Tensor) -> Tensor {
        match self {
            Activation::Linear => z.clone(),
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Softmax => softmax(z),
        }
    }
    
    /// Maps the gradient w.r.t. the activation output back to the pre-activation
    ///
    /// `z` is the pre-activation and `output` the activated value.
    pub fn backward(&self, z: &Tensor, output: &Tensor, grad_output: &Tensor) -> Tensor {
        match self {
            Activation::Linear => grad_output.clone(),
            Activation::Relu => {
                let mut grad = grad_output.clone();
                grad.zip_mut_with(z, |g, &v| {
                    if v <= 0.0 {
                        *g = 0.0;
                    }
                });
                grad
            }
            Activation::Softmax => {
                // s * (g - <g, s>)
                let dot: f32 = grad_output.iter().zip(output.iter()).map(|(g, s)| g * s).sum();
                let mut grad = output.clone();
                grad.zip_mut_with(grad_output, |s, &g| *s *= g - dot);
                grad
            }
        }
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activation::Linear => write!(f, "linear"),
            Activation::Relu => write!(f, "relu"),
            Activation::Softmax => write!(f, "softmax"),
        }
    }
}

/// Numerically stable softmax over every element of `z`
pub fn softmax(z: &Tensor) -> Tensor {
    let max = z.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    let exp = z.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, ArrayD};
    
    fn dyn1(values: &[f32]) -> Tensor {
        arr1(values).into_dyn()
    }
    
    #[test]
    fn test_softmax_sums_to_one() {
        let out = softmax(&dyn1(&[1.0, 2.0, 3.0, 1000.0]));
        assert!((out.sum() - 1.0).abs() < 1e-6);
        assert!(out.iter().all(|p| p.is_finite()));
        assert!(out[[3]] > 0.99);
    }
    
    #[test]
    fn test_relu() {
        let z = dyn1(&[-1.0, 0.0, 2.0]);
        assert_eq!(Activation::Relu.apply(&z), dyn1(&[0.0, 0.0, 2.0]));
        
        let grad = Activation::Relu.backward(&z, &Activation::Relu.apply(&z), &dyn1(&[5.0, 5.0, 5.0]));
        assert_eq!(grad, dyn1(&[0.0, 0.0, 5.0]));
    }
    
    #[test]
    fn test_softmax_backward_matches_cross_entropy_shortcut() {
        // With g = -1/s_y at the target, s * (g - <g, s>) collapses to s - onehot(y)
        let z = dyn1(&[0.3, -1.2, 2.0]);
        let s = softmax(&z);
        let target = 2;
        let mut g = ArrayD::zeros(s.raw_dim());
        g[[target]] = -1.0 / s[[target]];
        
        let grad = Activation::Softmax.backward(&z, &s, &g);
        for i in 0..3 {
            let expected = s[[i]] - if i == target { 1.0 } else { 0.0 };
            assert!((grad[[i]] - expected).abs() < 1e-5);
        }
    }
    
    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Activation::Relu).unwrap(), "\"relu\"");
        assert_eq!(Activation::Softmax.to_string(), "softmax");
    }
}
