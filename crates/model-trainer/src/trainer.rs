//! Compiled models and the fit loop
//!
//! A [`CompiledModel`] pairs a network with its loss and optimizer. Fitting
//! walks shuffled mini-batches, averages per-sample gradients and applies one
//! Adam step per batch, logging loss and accuracy after every epoch.

use std::time::Instant;

use ndarray::{ArrayView4, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::error::{Error, Result};
use common::utils::{argmax, format_duration};
use inference_engine::{Activation, Sequential, Tensor};

use crate::loss::Loss;
use crate::optimizer::{Adam, AdamConfig, AdamState};

/// Metrics reported during training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Fraction of samples whose arg-max matches the label
    Accuracy,
}

/// Optimizer, loss and metrics attached to a network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileSettings {
    /// Adam hyper-parameters
    pub optimizer: AdamConfig,
    
    /// Training loss
    pub loss: Loss,
    
    /// Reported metrics
    pub metrics: Vec<Metric>,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            optimizer: AdamConfig::default(),
            loss: Loss::SparseCategoricalCrossentropy,
            metrics: vec![Metric::Accuracy],
        }
    }
}

/// Options for [`CompiledModel::fit`]
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Passes over the data
    pub epochs: usize,
    
    /// Samples per optimizer step
    pub batch_size: usize,
    
    /// Reshuffle sample order every epoch
    pub shuffle: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: 1,
            batch_size: 32,
            shuffle: true,
        }
    }
}

/// Averages over one epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number
    pub epoch: usize,
    
    /// Mean loss
    pub loss: f32,
    
    /// Mean accuracy, when requested
    pub accuracy: Option<f32>,
}

/// Per-epoch training record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    /// One entry per completed epoch
    pub epochs: Vec<EpochMetrics>,
}

impl History {
    /// Metrics of the last epoch
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// A network ready for training
#[derive(Debug, Clone)]
pub struct CompiledModel {
    network: Sequential,
    settings: CompileSettings,
    optimizer: Adam,
}

impl CompiledModel {
    /// Attaches loss and optimizer to a network with a softmax output
    pub fn compile(network: Sequential, settings: CompileSettings) -> Result<Self> {
        network.validate()?;
        
        if settings.loss == Loss::SparseCategoricalCrossentropy
            && network.output_activation() != Activation::Softmax
        {
            return Err(Error::Training(format!(
                "{} requires a softmax output, got {}",
                settings.loss,
                network.output_activation()
            )));
        }
        
        info!(
            "Compiled model {} (loss={}, lr={})",
            network.name(),
            settings.loss,
            settings.optimizer.learning_rate
        );
        
        let optimizer = Adam::new(settings.optimizer);
        Ok(Self {
            network,
            settings,
            optimizer,
        })
    }
    
    /// The network being trained
    pub fn network(&self) -> &Sequential {
        &self.network
    }
    
    /// Compile settings
    pub fn settings(&self) -> &CompileSettings {
        &self.settings
    }
    
    /// Optimizer slots
    pub fn optimizer_state(&self) -> &AdamState {
        self.optimizer.state()
    }
    
    /// Splits into network, settings and optimizer slots
    pub fn into_parts(self) -> (Sequential, CompileSettings, AdamState) {
        (self.network, self.settings, self.optimizer.into_state())
    }
    
    /// Trains on `images` `(N, H, W, C)` with one label per image
    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        images: ArrayView4<'_, f32>,
        labels: &[usize],
        options: FitOptions,
        rng: &mut R,
    ) -> Result<History> {
        let samples = images.len_of(Axis(0));
        if samples != labels.len() {
            return Err(Error::InvalidArgument(format!(
                "{} images but {} labels",
                samples,
                labels.len()
            )));
        }
        if samples == 0 || options.batch_size == 0 {
            return Err(Error::InvalidArgument(
                "fit needs at least one sample and a positive batch size".to_string(),
            ));
        }
        
        let mut history = History::default();
        let mut order: Vec<usize> = (0..samples).collect();
        let steps = (samples + options.batch_size - 1) / options.batch_size;
        
        for epoch in 1..=options.epochs {
            if options.shuffle {
                order.shuffle(rng);
            }
            
            let started = Instant::now();
            let mut loss_sum = 0.0f32;
            let mut correct = 0usize;
            
            for (step, batch) in order.chunks(options.batch_size).enumerate() {
                let mut grads: Vec<Tensor> = self
                    .network
                    .parameters()
                    .iter()
                    .map(|p| Tensor::zeros(p.raw_dim()))
                    .collect();
                
                for &i in batch {
                    let (loss, hit, sample_grads) = self.sample_gradients(images, labels[i], i)?;
                    loss_sum += loss;
                    correct += usize::from(hit);
                    
                    for (acc, g) in grads.iter_mut().zip(&sample_grads) {
                        *acc += g;
                    }
                }
                
                let scale = 1.0 / batch.len() as f32;
                for g in grads.iter_mut() {
                    g.mapv_inplace(|v| v * scale);
                }
                self.optimizer.step(self.network.parameters_mut(), &grads)?;
                
                debug!("epoch {} step {}/{}", epoch, step + 1, steps);
            }
            
            let metrics = EpochMetrics {
                epoch,
                loss: loss_sum / samples as f32,
                accuracy: self
                    .settings
                    .metrics
                    .contains(&Metric::Accuracy)
                    .then(|| correct as f32 / samples as f32),
            };
            
            info!(
                "Epoch {}/{}: {} steps in {}, loss={:.4}, accuracy={}",
                epoch,
                options.epochs,
                steps,
                format_duration(started.elapsed()),
                metrics.loss,
                metrics
                    .accuracy
                    .map(|a| format!("{:.4}", a))
                    .unwrap_or_else(|| "n/a".to_string())
            );
            history.epochs.push(metrics);
        }
        
        Ok(history)
    }
    
    /// Mean loss and accuracy without updating weights
    pub fn evaluate(&self, images: ArrayView4<'_, f32>, labels: &[usize]) -> Result<(f32, f32)> {
        let samples = images.len_of(Axis(0));
        if samples != labels.len() || samples == 0 {
            return Err(Error::InvalidArgument(format!(
                "cannot evaluate {} images against {} labels",
                samples,
                labels.len()
            )));
        }
        
        let mut loss_sum = 0.0f32;
        let mut correct = 0usize;
        for (sample, &label) in images.outer_iter().zip(labels) {
            let probabilities = self.network.forward(&sample.to_owned().into_dyn())?;
            loss_sum += self.settings.loss.value(&probabilities, label)?;
            let values: Vec<f32> = probabilities.iter().copied().collect();
            correct += usize::from(argmax(&values) == Some(label));
        }
        
        Ok((loss_sum / samples as f32, correct as f32 / samples as f32))
    }
    
    fn sample_gradients(
        &self,
        images: ArrayView4<'_, f32>,
        label: usize,
        index: usize,
    ) -> Result<(f32, bool, Vec<Tensor>)> {
        let input = images.index_axis(Axis(0), index).to_owned().into_dyn();
        let caches = self.network.forward_cached(&input)?;
        let probabilities = &caches
            .last()
            .ok_or_else(|| Error::Training("network has no layers".to_string()))?
            .output;
        
        let loss = self.settings.loss.value(probabilities, label)?;
        let values: Vec<f32> = probabilities.iter().copied().collect();
        let hit = argmax(&values) == Some(label);
        
        let grad_logits = self.settings.loss.grad_logits(probabilities, label)?;
        let grads = self.network.backward(&caches, grad_logits)?;
        
        Ok((loss, hit, grads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_engine::InputShape;
    use ndarray::Array4;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    
    fn separable_data() -> (Array4<f32>, Vec<usize>) {
        let labels: Vec<usize> = (0..8).map(|i| i % 2).collect();
        // class 0 lights the top half, class 1 the bottom half
        let images = Array4::from_shape_fn((8, 4, 4, 1), |(n, row, _, _)| {
            if (row < 2) == (labels[n] == 0) {
                0.9
            } else {
                0.1
            }
        });
        (images, labels)
    }
    
    fn tiny_network(rng: &mut StdRng) -> Sequential {
        Sequential::builder("tiny", InputShape::new(4, 4, 1))
            .flatten()
            .dense(2, Activation::Softmax)
            .build(rng)
            .unwrap()
    }
    
    #[test]
    fn test_fit_lowers_loss() {
        let mut rng = StdRng::seed_from_u64(21);
        let settings = CompileSettings {
            optimizer: AdamConfig {
                learning_rate: 0.05,
                ..AdamConfig::default()
            },
            ..CompileSettings::default()
        };
        let mut model = CompiledModel::compile(tiny_network(&mut rng), settings).unwrap();
        let (images, labels) = separable_data();
        
        let (before, _) = model.evaluate(images.view(), &labels).unwrap();
        let options = FitOptions {
            epochs: 20,
            batch_size: 4,
            shuffle: true,
        };
        let history = model.fit(images.view(), &labels, options, &mut rng).unwrap();
        let (after, accuracy) = model.evaluate(images.view(), &labels).unwrap();
        
        assert_eq!(history.epochs.len(), 20);
        assert!(after < before);
        assert!(history.last().unwrap().loss < history.epochs[0].loss);
        assert_eq!(accuracy, 1.0);
        assert_eq!(model.optimizer_state().iterations, 40);
    }
    
    #[test]
    fn test_compile_requires_softmax() {
        let mut rng = StdRng::seed_from_u64(22);
        let network = Sequential::builder("logits", InputShape::new(4, 4, 1))
            .flatten()
            .dense(2, Activation::Linear)
            .build(&mut rng)
            .unwrap();
        assert!(CompiledModel::compile(network, CompileSettings::default()).is_err());
    }
    
    #[test]
    fn test_fit_rejects_bad_inputs() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut model = CompiledModel::compile(tiny_network(&mut rng), CompileSettings::default()).unwrap();
        let (images, labels) = separable_data();
        
        assert!(model
            .fit(images.view(), &labels[..3], FitOptions::default(), &mut rng)
            .is_err());
        
        let zero_batch = FitOptions {
            batch_size: 0,
            ..FitOptions::default()
        };
        assert!(model.fit(images.view(), &labels, zero_batch, &mut rng).is_err());
        
        let bad_labels = vec![5; 8];
        assert!(model
            .fit(images.view(), &bad_labels, FitOptions::default(), &mut rng)
            .is_err());
    }
    
    #[test]
    fn test_settings_serde_defaults() {
        let settings: CompileSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, CompileSettings::default());
        
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["loss"], "sparse_categorical_crossentropy");
        assert_eq!(json["metrics"][0], "accuracy");
    }
}
