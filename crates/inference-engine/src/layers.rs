//! Network layers
//!
//! Every layer works on a single sample laid out as `(height, width, channels)`
//! for spatial tensors or `(features)` once flattened. Each layer can run a
//! plain forward pass, a cached forward pass for training, and the matching
//! backward pass.

use std::ops::AddAssign;

use ndarray::{s, Array1, Array2, Array3, Array4, Axis, Ix1, Ix2, Ix3, Ix4};
use serde::{Deserialize, Serialize};

use common::error::{Error, Result};

use crate::activation::Activation;
use crate::tensor::{reshape, Tensor};

/// Intermediate values kept from a forward pass for the backward pass
#[derive(Debug, Clone)]
pub struct LayerCache {
    /// Layer input
    pub input: Tensor,
    /// Value before the activation was applied
    pub pre_activation: Tensor,
    /// Activated output
    pub output: Tensor,
}

/// 2-D convolution with valid padding and unit stride
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv2D {
    /// Number of output channels
    pub filters: usize,
    /// Kernel height and width
    pub kernel_size: (usize, usize),
    /// Output activation
    pub activation: Activation,
    /// Kernel laid out as `(kh, kw, in_channels, filters)`
    pub kernel: Tensor,
    /// One bias per filter
    pub bias: Tensor,
}

impl Conv2D {
    fn kernel4(&self) -> Result<ndarray::ArrayView4<'_, f32>> {
        Ok(self.kernel.view().into_dimensionality::<Ix4>()?)
    }

    fn bias1(&self) -> Result<ndarray::ArrayView1<'_, f32>> {
        Ok(self.bias.view().into_dimensionality::<Ix1>()?)
    }

    fn output_dims(&self, h: usize, w: usize) -> Result<(usize, usize)> {
        let (kh, kw) = self.kernel_size;
        if kh == 0 || kw == 0 || h < kh || w < kw {
            return Err(Error::Shape(format!(
                "conv2d kernel {}x{} does not fit input {}x{}",
                kh, kw, h, w
            )));
        }
        Ok((h - kh + 1, w - kw + 1))
    }

    fn pre_activation(&self, input: &Tensor) -> Result<Tensor> {
        let x = input.view().into_dimensionality::<Ix3>()?;
        let (h, w, c) = x.dim();
        let kernel = self.kernel4()?;
        let (kh, kw, kc, filters) = kernel.dim();
        if kc != c {
            return Err(Error::Shape(format!(
                "conv2d expects {} input channels, got {}",
                kc, c
            )));
        }
        let (oh, ow) = self.output_dims(h, w)?;

        // Sum of one matrix product per kernel offset
        let mut out = Array2::<f32>::zeros((oh * ow, filters));
        for u in 0..kh {
            for v in 0..kw {
                let patch: Array2<f32> = reshape(&x.slice(s![u..u + oh, v..v + ow, ..]), (oh * ow, c))?;
                out += &patch.dot(&kernel.slice(s![u, v, .., ..]));
            }
        }
        out += &self.bias1()?;

        let out: Array3<f32> = reshape(&out, (oh, ow, filters))?;
        Ok(out.into_dyn())
    }

    fn backward(&self, cache: &LayerCache, grad: &Tensor) -> Result<(Vec<Tensor>, Tensor)> {
        let x = cache.input.view().into_dimensionality::<Ix3>()?;
        let (h, w, c) = x.dim();
        let kernel = self.kernel4()?;
        let (kh, kw, _, filters) = kernel.dim();
        let (oh, ow) = self.output_dims(h, w)?;

        let dz: Array2<f32> = reshape(grad, (oh * ow, filters))?;
        let mut d_kernel = Array4::<f32>::zeros((kh, kw, c, filters));
        let mut d_input = Array3::<f32>::zeros((h, w, c));

        for u in 0..kh {
            for v in 0..kw {
                let patch: Array2<f32> = reshape(&x.slice(s![u..u + oh, v..v + ow, ..]), (oh * ow, c))?;
                d_kernel
                    .slice_mut(s![u, v, .., ..])
                    .assign(&patch.t().dot(&dz));

                let d_patch: Array3<f32> = reshape(&dz.dot(&kernel.slice(s![u, v, .., ..]).t()), (oh, ow, c))?;
                d_input
                    .slice_mut(s![u..u + oh, v..v + ow, ..])
                    .add_assign(&d_patch);
            }
        }

        let d_bias = dz.sum_axis(Axis(0));
        Ok((vec![d_kernel.into_dyn(), d_bias.into_dyn()], d_input.into_dyn()))
    }
}

/// 2-D max pooling with stride equal to the pool size
///
/// Trailing rows/columns that do not fill a whole window are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxPooling2D {
    /// Window height and width
    pub pool_size: (usize, usize),
}

impl MaxPooling2D {
    fn output_dims(&self, h: usize, w: usize) -> Result<(usize, usize)> {
        let (ph, pw) = self.pool_size;
        if ph == 0 || pw == 0 || h < ph || w < pw {
            return Err(Error::Shape(format!(
                "max pooling window {}x{} does not fit input {}x{}",
                ph, pw, h, w
            )));
        }
        Ok((h / ph, w / pw))
    }

    /// Position of the first maximum inside window `(i, j)` of channel `k`
    fn argmax_in_window(&self, x: &ndarray::ArrayView3<'_, f32>, i: usize, j: usize, k: usize) -> (usize, usize) {
        let (ph, pw) = self.pool_size;
        let mut best = (i * ph, j * pw);
        for a in i * ph..(i + 1) * ph {
            for b in j * pw..(j + 1) * pw {
                if x[[a, b, k]] > x[[best.0, best.1, k]] {
                    best = (a, b);
                }
            }
        }
        best
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let x = input.view().into_dimensionality::<Ix3>()?;
        let (h, w, c) = x.dim();
        let (oh, ow) = self.output_dims(h, w)?;

        let mut out = Array3::<f32>::zeros((oh, ow, c));
        for i in 0..oh {
            for j in 0..ow {
                for k in 0..c {
                    let (a, b) = self.argmax_in_window(&x, i, j, k);
                    out[[i, j, k]] = x[[a, b, k]];
                }
            }
        }
        Ok(out.into_dyn())
    }

    fn backward(&self, cache: &LayerCache, grad: &Tensor) -> Result<Tensor> {
        let x = cache.input.view().into_dimensionality::<Ix3>()?;
        let (h, w, c) = x.dim();
        let (oh, ow) = self.output_dims(h, w)?;
        let grad = grad.view().into_dimensionality::<Ix3>()?;

        let mut d_input = Array3::<f32>::zeros((h, w, c));
        for i in 0..oh {
            for j in 0..ow {
                for k in 0..c {
                    let (a, b) = self.argmax_in_window(&x, i, j, k);
                    d_input[[a, b, k]] += grad[[i, j, k]];
                }
            }
        }
        Ok(d_input.into_dyn())
    }
}

/// Collapses any tensor into a feature vector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flatten;

/// Fully connected layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    /// Number of output features
    pub units: usize,
    /// Output activation
    pub activation: Activation,
    /// Kernel laid out as `(in_features, units)`
    pub kernel: Tensor,
    /// One bias per unit
    pub bias: Tensor,
}

impl Dense {
    fn pre_activation(&self, input: &Tensor) -> Result<Tensor> {
        let x = input.view().into_dimensionality::<Ix1>().map_err(|_| {
            Error::Shape(format!("dense expects a flat input, got shape {:?}", input.shape()))
        })?;
        let kernel = self.kernel.view().into_dimensionality::<Ix2>()?;
        if kernel.nrows() != x.len() {
            return Err(Error::Shape(format!(
                "dense expects {} input features, got {}",
                kernel.nrows(),
                x.len()
            )));
        }
        let bias = self.bias.view().into_dimensionality::<Ix1>()?;

        let z: Array1<f32> = x.dot(&kernel) + &bias;
        Ok(z.into_dyn())
    }

    fn backward(&self, cache: &LayerCache, grad: &Tensor) -> Result<(Vec<Tensor>, Tensor)> {
        let x = cache.input.view().into_dimensionality::<Ix1>()?;
        let kernel = self.kernel.view().into_dimensionality::<Ix2>()?;
        let dz = grad.view().into_dimensionality::<Ix1>()?;

        let d_kernel = x.view().insert_axis(Axis(1)).dot(&dz.view().insert_axis(Axis(0)));
        let d_bias = dz.to_owned();
        let d_input = kernel.dot(&dz);

        Ok((vec![d_kernel.into_dyn(), d_bias.into_dyn()], d_input.into_dyn()))
    }
}

/// A network layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Layer {
    /// Convolution
    #[serde(rename = "conv2d")]
    Conv2D(Conv2D),
    /// Max pooling
    #[serde(rename = "max_pooling2d")]
    MaxPooling2D(MaxPooling2D),
    /// Flatten
    #[serde(rename = "flatten")]
    Flatten(Flatten),
    /// Fully connected
    #[serde(rename = "dense")]
    Dense(Dense),
}

impl Layer {
    /// Short layer kind name
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Conv2D(_) => "conv2d",
            Layer::MaxPooling2D(_) => "max_pooling2d",
            Layer::Flatten(_) => "flatten",
            Layer::Dense(_) => "dense",
        }
    }

    /// Output activation (linear for parameter-free layers)
    pub fn activation(&self) -> Activation {
        match self {
            Layer::Conv2D(conv) => conv.activation,
            Layer::Dense(dense) => dense.activation,
            Layer::MaxPooling2D(_) | Layer::Flatten(_) => Activation::Linear,
        }
    }

    /// Shape produced for a given input shape
    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        match self {
            Layer::Conv2D(conv) => match input {
                [h, w, _] => {
                    let (oh, ow) = conv.output_dims(*h, *w)?;
                    Ok(vec![oh, ow, conv.filters])
                }
                _ => Err(Error::Shape(format!("conv2d expects a 3-D input, got {:?}", input))),
            },
            Layer::MaxPooling2D(pool) => match input {
                [h, w, c] => {
                    let (oh, ow) = pool.output_dims(*h, *w)?;
                    Ok(vec![oh, ow, *c])
                }
                _ => Err(Error::Shape(format!("max pooling expects a 3-D input, got {:?}", input))),
            },
            Layer::Flatten(_) => Ok(vec![input.iter().product()]),
            Layer::Dense(dense) => match input {
                [_] => Ok(vec![dense.units]),
                _ => Err(Error::Shape(format!("dense expects a flat input, got {:?}", input))),
            },
        }
    }

    /// Checks stored parameter shapes against the input shape the layer receives
    pub fn check_parameters(&self, input: &[usize]) -> Result<()> {
        let expected: Vec<(&Tensor, Vec<usize>)> = match (self, input) {
            (Layer::Conv2D(conv), [_, _, c]) => vec![
                (&conv.kernel, vec![conv.kernel_size.0, conv.kernel_size.1, *c, conv.filters]),
                (&conv.bias, vec![conv.filters]),
            ],
            (Layer::Dense(dense), [features]) => vec![
                (&dense.kernel, vec![*features, dense.units]),
                (&dense.bias, vec![dense.units]),
            ],
            _ => Vec::new(),
        };

        for (tensor, shape) in expected {
            if tensor.shape() != shape.as_slice() {
                return Err(Error::Model(format!(
                    "{} parameter has shape {:?}, expected {:?}",
                    self.kind(),
                    tensor.shape(),
                    shape
                )));
            }
        }
        Ok(())
    }

    /// Forward pass without keeping intermediates
    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        match self {
            Layer::Conv2D(conv) => Ok(conv.activation.apply(&conv.pre_activation(input)?)),
            Layer::Dense(dense) => Ok(dense.activation.apply(&dense.pre_activation(input)?)),
            Layer::MaxPooling2D(pool) => pool.forward(input),
            Layer::Flatten(_) => Ok(reshape(input, input.len())?.into_dyn()),
        }
    }

    /// Forward pass keeping what the backward pass needs
    pub fn forward_cached(&self, input: &Tensor) -> Result<LayerCache> {
        let pre_activation = match self {
            Layer::Conv2D(conv) => conv.pre_activation(input)?,
            Layer::Dense(dense) => dense.pre_activation(input)?,
            Layer::MaxPooling2D(pool) => pool.forward(input)?,
            Layer::Flatten(_) => reshape(input, input.len())?.into_dyn(),
        };
        let output = self.activation().apply(&pre_activation);

        Ok(LayerCache {
            input: input.clone(),
            pre_activation,
            output,
        })
    }

    /// Backward pass from the gradient w.r.t. the pre-activation
    ///
    /// Returns the parameter gradients (in [`Layer::parameters`] order) and the
    /// gradient w.r.t. the layer input.
    pub fn backward(&self, cache: &LayerCache, grad_pre_activation: &Tensor) -> Result<(Vec<Tensor>, Tensor)> {
        match self {
            Layer::Conv2D(conv) => conv.backward(cache, grad_pre_activation),
            Layer::Dense(dense) => dense.backward(cache, grad_pre_activation),
            Layer::MaxPooling2D(pool) => Ok((Vec::new(), pool.backward(cache, grad_pre_activation)?)),
            Layer::Flatten(_) => {
                let grad = ndarray::ArrayD::from_shape_vec(
                    cache.input.raw_dim(),
                    grad_pre_activation.iter().copied().collect(),
                )?;
                Ok((Vec::new(), grad))
            }
        }
    }

    /// Trainable parameters
    pub fn parameters(&self) -> Vec<&Tensor> {
        match self {
            Layer::Conv2D(conv) => vec![&conv.kernel, &conv.bias],
            Layer::Dense(dense) => vec![&dense.kernel, &dense.bias],
            Layer::MaxPooling2D(_) | Layer::Flatten(_) => Vec::new(),
        }
    }

    /// Mutable trainable parameters, same order as [`Layer::parameters`]
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match self {
            Layer::Conv2D(conv) => vec![&mut conv.kernel, &mut conv.bias],
            Layer::Dense(dense) => vec![&mut dense.kernel, &mut dense.bias],
            Layer::MaxPooling2D(_) | Layer::Flatten(_) => Vec::new(),
        }
    }

    /// Number of trainable scalars
    pub fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array, ArrayD, IxDyn};

    fn conv(kernel: Tensor, bias: Tensor, activation: Activation) -> Layer {
        let shape = kernel.shape().to_vec();
        Layer::Conv2D(Conv2D {
            filters: shape[3],
            kernel_size: (shape[0], shape[1]),
            activation,
            kernel,
            bias,
        })
    }

    #[test]
    fn test_conv_forward_known_values() {
        let layer = conv(
            ArrayD::ones(IxDyn(&[2, 2, 1, 1])),
            arr1(&[0.5f32]).into_dyn(),
            Activation::Linear,
        );
        let input = ArrayD::ones(IxDyn(&[3, 3, 1]));

        let out = layer.forward(&input).unwrap();
        assert_eq!(out.shape(), &[2, 2, 1]);
        assert!(out.iter().all(|v| (*v - 4.5).abs() < 1e-6));
    }

    #[test]
    fn test_conv_multi_channel() {
        // Two input channels, kernel picks channel 0 minus channel 1 at the top-left tap
        let mut kernel = ArrayD::zeros(IxDyn(&[2, 2, 2, 1]));
        kernel[[0, 0, 0, 0]] = 1.0;
        kernel[[0, 0, 1, 0]] = -1.0;
        let layer = conv(kernel, arr1(&[0.0f32]).into_dyn(), Activation::Relu);

        let input = Array::from_shape_fn((3, 3, 2), |(i, j, k)| {
            if k == 0 { (i * 3 + j) as f32 } else { 2.0 }
        })
        .into_dyn();

        let out = layer.forward(&input).unwrap();
        assert_eq!(out.shape(), &[2, 2, 1]);
        assert_eq!(out[[0, 0, 0]], 0.0);
        assert_eq!(out[[0, 1, 0]], 0.0);
        assert_eq!(out[[1, 0, 0]], 1.0);
        assert_eq!(out[[1, 1, 0]], 2.0);
    }

    #[test]
    fn test_conv_rejects_channel_mismatch() {
        let layer = conv(
            ArrayD::ones(IxDyn(&[2, 2, 3, 1])),
            arr1(&[0.0f32]).into_dyn(),
            Activation::Linear,
        );
        assert!(layer.forward(&ArrayD::ones(IxDyn(&[4, 4, 1]))).is_err());
    }

    #[test]
    fn test_max_pooling_forward_and_backward() {
        let layer = Layer::MaxPooling2D(MaxPooling2D { pool_size: (2, 2) });
        let input = Array::from_shape_fn((4, 5, 1), |(i, j, _)| (i * 5 + j) as f32).into_dyn();

        let cache = layer.forward_cached(&input).unwrap();
        assert_eq!(cache.output.shape(), &[2, 2, 1]);
        assert_eq!(cache.output[[0, 0, 0]], 6.0);
        assert_eq!(cache.output[[0, 1, 0]], 8.0);
        assert_eq!(cache.output[[1, 0, 0]], 16.0);
        assert_eq!(cache.output[[1, 1, 0]], 18.0);

        let grad = ArrayD::ones(IxDyn(&[2, 2, 1]));
        let (params, d_input) = layer.backward(&cache, &grad).unwrap();
        assert!(params.is_empty());
        assert_eq!(d_input.sum(), 4.0);
        assert_eq!(d_input[[1, 1, 0]], 1.0);
        assert_eq!(d_input[[1, 3, 0]], 1.0);
        assert_eq!(d_input[[3, 1, 0]], 1.0);
        assert_eq!(d_input[[3, 3, 0]], 1.0);
        assert_eq!(d_input[[3, 4, 0]], 0.0);
    }

    #[test]
    fn test_flatten_round_trip() {
        let layer = Layer::Flatten(Flatten);
        let input = Array::from_shape_fn((2, 3, 2), |(i, j, k)| (i * 6 + j * 2 + k) as f32).into_dyn();

        let cache = layer.forward_cached(&input).unwrap();
        assert_eq!(cache.output.shape(), &[12]);
        assert_eq!(cache.output[[5]], 5.0);

        let (_, back) = layer.backward(&cache, &cache.output).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn test_dense_forward_and_backward() {
        let layer = Layer::Dense(Dense {
            units: 2,
            activation: Activation::Linear,
            kernel: arr2(&[[1.0f32, 0.0], [0.0, 2.0], [1.0, 1.0]]).into_dyn(),
            bias: arr1(&[0.5f32, -0.5]).into_dyn(),
        });
        let input = arr1(&[1.0f32, 2.0, 3.0]).into_dyn();

        let cache = layer.forward_cached(&input).unwrap();
        assert_eq!(cache.output, arr1(&[4.5f32, 6.5]).into_dyn());

        let grad = arr1(&[1.0f32, -1.0]).into_dyn();
        let (params, d_input) = layer.backward(&cache, &grad).unwrap();
        assert_eq!(params[0], arr2(&[[1.0f32, -1.0], [2.0, -2.0], [3.0, -3.0]]).into_dyn());
        assert_eq!(params[1], grad);
        assert_eq!(d_input, arr1(&[1.0f32, -2.0, 0.0]).into_dyn());
    }

    #[test]
    fn test_dense_rejects_spatial_input() {
        let layer = Layer::Dense(Dense {
            units: 1,
            activation: Activation::Linear,
            kernel: ArrayD::zeros(IxDyn(&[4, 1])),
            bias: ArrayD::zeros(IxDyn(&[1])),
        });
        assert!(layer.forward(&ArrayD::zeros(IxDyn(&[2, 2, 1]))).is_err());
        assert!(layer.output_shape(&[2, 2, 1]).is_err());
    }

    #[test]
    fn test_output_shapes() {
        let pool = Layer::MaxPooling2D(MaxPooling2D { pool_size: (2, 2) });
        assert_eq!(pool.output_shape(&[62, 62, 8]).unwrap(), vec![31, 31, 8]);
        assert_eq!(pool.output_shape(&[29, 29, 32]).unwrap(), vec![14, 14, 32]);
        assert_eq!(Layer::Flatten(Flatten).output_shape(&[31, 31, 8]).unwrap(), vec![7688]);
    }
}
