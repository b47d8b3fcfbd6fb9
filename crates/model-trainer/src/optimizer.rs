//! Adam optimizer

use ndarray::Zip;
use serde::{Deserialize, Serialize};

use common::error::{Error, Result};
use inference_engine::Tensor;

/// Adam hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    /// Step size
    pub learning_rate: f32,
    
    /// Decay of the first moment estimate
    pub beta_1: f32,
    
    /// Decay of the second moment estimate
    pub beta_2: f32,
    
    /// Denominator fuzz
    pub epsilon: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-7,
        }
    }
}

/// Slot variables, one moment pair per trainable tensor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdamState {
    /// Number of steps taken
    pub iterations: u64,
    
    /// First moments
    pub m: Vec<Tensor>,
    
    /// Second moments
    pub v: Vec<Tensor>,
}

/// Adam with bias-corrected step size
#[derive(Debug, Clone)]
pub struct Adam {
    config: AdamConfig,
    state: AdamState,
}

impl Adam {
    /// Creates an optimizer with empty slots
    pub fn new(config: AdamConfig) -> Self {
        Self {
            config,
            state: AdamState::default(),
        }
    }
    
    /// Resumes from saved slots
    pub fn from_state(config: AdamConfig, state: AdamState) -> Self {
        Self { config, state }
    }
    
    /// Hyper-parameters
    pub fn config(&self) -> AdamConfig {
        self.config
    }
    
    /// Current slots
    pub fn state(&self) -> &AdamState {
        &self.state
    }
    
    /// Consumes the optimizer, returning its slots
    pub fn into_state(self) -> AdamState {
        self.state
    }
    
    /// Applies one update; `grads` must line up with `params`
    pub fn step(&mut self, params: Vec<&mut Tensor>, grads: &[Tensor]) -> Result<()> {
        if params.len() != grads.len() {
            return Err(Error::Training(format!(
                "{} parameters but {} gradients",
                params.len(),
                grads.len()
            )));
        }
        
        if self.state.m.is_empty() && self.state.v.is_empty() {
            self.state.m = grads.iter().map(|g| Tensor::zeros(g.raw_dim())).collect();
            self.state.v = grads.iter().map(|g| Tensor::zeros(g.raw_dim())).collect();
        }
        
        for (i, (param, grad)) in params.iter().zip(grads).enumerate() {
            let slots_match = self.state.m.get(i).map(|m| m.shape()) == Some(grad.shape())
                && self.state.v.get(i).map(|v| v.shape()) == Some(grad.shape());
            if param.shape() != grad.shape() || !slots_match {
                return Err(Error::Shape(format!(
                    "optimizer slot {} does not match parameter shape {:?}",
                    i,
                    param.shape()
                )));
            }
        }
        if self.state.m.len() != grads.len() || self.state.v.len() != grads.len() {
            return Err(Error::Training(format!(
                "optimizer holds {} slots for {} parameters",
                self.state.m.len(),
                grads.len()
            )));
        }
        
        self.state.iterations += 1;
        let t = self.state.iterations.min(i32::MAX as u64) as i32;
        let AdamConfig {
            learning_rate,
            beta_1,
            beta_2,
            epsilon,
        } = self.config;
        let lr_t = learning_rate * (1.0 - beta_2.powi(t)).sqrt() / (1.0 - beta_1.powi(t));
        
        for (((param, grad), m), v) in params
            .into_iter()
            .zip(grads)
            .zip(self.state.m.iter_mut())
            .zip(self.state.v.iter_mut())
        {
            m.zip_mut_with(grad, |mi, &g| *mi = beta_1 * *mi + (1.0 - beta_1) * g);
            v.zip_mut_with(grad, |vi, &g| *vi = beta_2 * *vi + (1.0 - beta_2) * g * g);
            Zip::from(param)
                .and(&*m)
                .and(&*v)
                .for_each(|p, &mi, &vi| *p -= lr_t * mi / (vi.sqrt() + epsilon));
        }
        
        Ok(())
    }
}
