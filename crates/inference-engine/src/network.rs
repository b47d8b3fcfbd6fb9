//! Sequential network
//!
//! A [`Sequential`] is an ordered stack of [`Layer`]s applied to one
//! `(height, width, channels)` image at a time. Networks are assembled with
//! [`SequentialBuilder`], which infers every intermediate shape and
//! initialises the parameters.

use ndarray::{Array2, ArrayView4, Axis, Ix1};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::error::{Error, Result};

use crate::activation::Activation;
use crate::init::{glorot_uniform, zeros};
use crate::layers::{Conv2D, Dense, Flatten, Layer, LayerCache, MaxPooling2D};
use crate::tensor::{expect_shape, InputShape, Tensor};

/// Ordered stack of layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequential {
    /// Model name
    name: String,

    /// Expected shape of one input sample
    input_shape: InputShape,

    /// Layers in application order
    layers: Vec<Layer>,
}

impl Sequential {
    /// Starts building a network for the given input shape
    pub fn builder(name: impl Into<String>, input_shape: InputShape) -> SequentialBuilder {
        SequentialBuilder {
            name: name.into(),
            input_shape,
            specs: Vec::new(),
        }
    }

    /// Assembles a network from existing layers, validating the stack
    pub fn from_layers(name: impl Into<String>, input_shape: InputShape, layers: Vec<Layer>) -> Result<Self> {
        let network = Self {
            name: name.into(),
            input_shape,
            layers,
        };
        network.validate()?;
        Ok(network)
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expected shape of one input sample
    pub fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    /// Layers in application order
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Output shape of every layer, in order
    ///
    /// Fails if the stack is empty, a layer does not accept its input, stored
    /// parameters have the wrong shape, softmax appears before the last layer,
    /// or the network does not end in a flat vector.
    pub fn layer_shapes(&self) -> Result<Vec<Vec<usize>>> {
        if self.layers.is_empty() {
            return Err(Error::Model("network has no layers".to_string()));
        }

        let last = self.layers.len() - 1;
        let mut shape = self.input_shape.dims().to_vec();
        let mut shapes = Vec::with_capacity(self.layers.len());

        for (i, layer) in self.layers.iter().enumerate() {
            layer.check_parameters(&shape)?;
            shape = layer.output_shape(&shape)?;

            if layer.activation() == Activation::Softmax && i != last {
                return Err(Error::Model(format!(
                    "softmax is only supported on the last layer, found on layer {} ({})",
                    i,
                    layer.kind()
                )));
            }

            shapes.push(shape.clone());
        }

        if shape.len() != 1 {
            return Err(Error::Model(format!(
                "network must end with a flat output, got shape {:?}",
                shape
            )));
        }

        Ok(shapes)
    }

    /// Validates the layer stack
    pub fn validate(&self) -> Result<()> {
        self.layer_shapes().map(|_| ())
    }

    /// Width of the output vector
    pub fn num_classes(&self) -> Result<usize> {
        let shapes = self.layer_shapes()?;
        shapes
            .last()
            .and_then(|shape| shape.first().copied())
            .ok_or_else(|| Error::Model("network has no output".to_string()))
    }

    /// Activation of the last layer
    pub fn output_activation(&self) -> Activation {
        self.layers
            .last()
            .map(Layer::activation)
            .unwrap_or_default()
    }

    /// Runs one sample through the network
    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        expect_shape(input, &self.input_shape.dims(), "network input")?;

        let mut x = input.clone();
        for layer in &self.layers {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    /// Runs one sample through the network, keeping every layer's intermediates
    pub fn forward_cached(&self, input: &Tensor) -> Result<Vec<LayerCache>> {
        expect_shape(input, &self.input_shape.dims(), "network input")?;

        let mut caches: Vec<LayerCache> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let cache = match caches.last() {
                Some(previous) => layer.forward_cached(&previous.output)?,
                None => layer.forward_cached(input)?,
            };
            caches.push(cache);
        }
        Ok(caches)
    }

    /// Backpropagates from the gradient w.r.t. the last layer's pre-activation
    ///
    /// For a softmax output trained with cross-entropy that gradient is simply
    /// `probabilities - one_hot(target)`. Returns one gradient per tensor in
    /// [`Sequential::parameters`] order.
    pub fn backward(&self, caches: &[LayerCache], grad_output: Tensor) -> Result<Vec<Tensor>> {
        if caches.len() != self.layers.len() {
            return Err(Error::Shape(format!(
                "expected {} layer caches, got {}",
                self.layers.len(),
                caches.len()
            )));
        }

        let mut per_layer: Vec<Vec<Tensor>> = Vec::with_capacity(self.layers.len());
        let mut grad_pre = grad_output;

        for i in (0..self.layers.len()).rev() {
            let (param_grads, grad_input) = self.layers[i].backward(&caches[i], &grad_pre)?;
            per_layer.push(param_grads);

            if i > 0 {
                let previous = &caches[i - 1];
                grad_pre = self.layers[i - 1].activation().backward(
                    &previous.pre_activation,
                    &previous.output,
                    &grad_input,
                );
            }
        }

        per_layer.reverse();
        Ok(per_layer.into_iter().flatten().collect())
    }

    /// Runs a batch laid out as `(N, height, width, channels)`, returning `(N, classes)`
    pub fn predict(&self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>> {
        let classes = self.num_classes()?;
        let mut out = Array2::<f32>::zeros((batch.len_of(Axis(0)), classes));

        for (i, sample) in batch.outer_iter().enumerate() {
            let y = self.forward(&sample.to_owned().into_dyn())?;
            out.row_mut(i).assign(&y.into_dimensionality::<Ix1>()?);
        }

        Ok(out)
    }

    /// Trainable parameters, layer by layer
    pub fn parameters(&self) -> Vec<&Tensor> {
        self.layers.iter().flat_map(Layer::parameters).collect()
    }

    /// Mutable trainable parameters, same order as [`Sequential::parameters`]
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.layers.iter_mut().flat_map(Layer::parameters_mut).collect()
    }

    /// Number of trainable scalars
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    /// Layer-by-layer description
    pub fn summary(&self) -> Result<String> {
        let shapes = self.layer_shapes()?;
        let mut lines = vec![format!("Model: \"{}\" input {}", self.name, self.input_shape)];

        for (layer, shape) in self.layers.iter().zip(&shapes) {
            lines.push(format!(
                "  {:<14} {:<10} {:>16} {:>10}",
                layer.kind(),
                layer.activation().to_string(),
                format!("{:?}", shape),
                layer.parameter_count()
            ));
        }
        lines.push(format!("Total params: {}", self.parameter_count()));

        Ok(lines.join("\n"))
    }
}

/// Declared layer, before shapes are known
#[derive(Debug, Clone)]
enum LayerSpec {
    Conv2D {
        filters: usize,
        kernel_size: (usize, usize),
        activation: Activation,
    },
    MaxPooling2D {
        pool_size: (usize, usize),
    },
    Flatten,
    Dense {
        units: usize,
        activation: Activation,
    },
}

/// Builder for [`Sequential`] networks
#[derive(Debug, Clone)]
pub struct SequentialBuilder {
    /// Model name
    name: String,

    /// Expected shape of one input sample
    input_shape: InputShape,

    /// Declared layers
    specs: Vec<LayerSpec>,
}

impl SequentialBuilder {
    /// Appends a convolution with valid padding and unit stride
    pub fn conv2d(mut self, filters: usize, kernel_size: (usize, usize), activation: Activation) -> Self {
        self.specs.push(LayerSpec::Conv2D {
            filters,
            kernel_size,
            activation,
        });
        self
    }

    /// Appends a max pooling layer
    pub fn max_pooling2d(mut self, pool_size: (usize, usize)) -> Self {
        self.specs.push(LayerSpec::MaxPooling2D { pool_size });
        self
    }

    /// Appends a flatten layer
    pub fn flatten(mut self) -> Self {
        self.specs.push(LayerSpec::Flatten);
        self
    }

    /// Appends a fully connected layer
    pub fn dense(mut self, units: usize, activation: Activation) -> Self {
        self.specs.push(LayerSpec::Dense { units, activation });
        self
    }

    /// Infers shapes, initialises parameters and validates the stack
    pub fn build<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Sequential> {
        let mut shape = self.input_shape.dims().to_vec();
        let mut layers = Vec::with_capacity(self.specs.len());

        for spec in self.specs {
            let layer = match spec {
                LayerSpec::Conv2D {
                    filters,
                    kernel_size: (kh, kw),
                    activation,
                } => {
                    let channels = match shape.as_slice() {
                        [_, _, c] => *c,
                        other => {
                            return Err(Error::Model(format!(
                                "conv2d needs a 3-D input, got {:?}",
                                other
                            )))
                        }
                    };
                    if filters == 0 {
                        return Err(Error::Model("conv2d needs at least one filter".to_string()));
                    }
                    Layer::Conv2D(Conv2D {
                        filters,
                        kernel_size: (kh, kw),
                        activation,
                        kernel: glorot_uniform(rng, &[kh, kw, channels, filters], kh * kw * channels, kh * kw * filters),
                        bias: zeros(&[filters]),
                    })
                }
                LayerSpec::MaxPooling2D { pool_size } => Layer::MaxPooling2D(MaxPooling2D { pool_size }),
                LayerSpec::Flatten => Layer::Flatten(Flatten),
                LayerSpec::Dense { units, activation } => {
                    let features = match shape.as_slice() {
                        [f] => *f,
                        other => {
                            return Err(Error::Model(format!(
                                "dense needs a flat input, got {:?}; add a flatten layer first",
                                other
                            )))
                        }
                    };
                    if units == 0 {
                        return Err(Error::Model("dense needs at least one unit".to_string()));
                    }
                    Layer::Dense(Dense {
                        units,
                        activation,
                        kernel: glorot_uniform(rng, &[features, units], features, units),
                        bias: zeros(&[units]),
                    })
                }
            };

            shape = layer.output_shape(&shape)?;
            debug!("{} -> {:?}", layer.kind(), shape);
            layers.push(layer);
        }

        Sequential::from_layers(self.name, self.input_shape, layers)
    }
}
