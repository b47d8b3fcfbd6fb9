//! Tensor aliases and reshaping helpers

use ndarray::{ArrayD, Dimension, IxDyn, ShapeBuilder};
use serde::{Deserialize, Serialize};

use common::error::{Error, Result};

/// Dynamic-rank `f32` tensor passed between layers
pub type Tensor = ArrayD<f32>;

/// Image input shape in height, width, channels order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputShape {
    /// Rows
    pub height: usize,
    /// Columns
    pub width: usize,
    /// Channels (3 for RGB)
    pub channels: usize,
}

impl InputShape {
    /// Creates a new input shape
    pub const fn new(height: usize, width: usize, channels: usize) -> Self {
        Self { height, width, channels }
    }

    /// Dimensions as a slice-friendly array
    pub fn dims(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    /// Number of scalars in one sample
    pub fn numel(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl std::fmt::Display for InputShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.height, self.width, self.channels)
    }
}

/// Copies `tensor` into a fresh standard-layout array of the given shape
///
/// Works for any memory layout since elements are read in logical order.
pub fn reshape<Sh, D>(tensor: &ndarray::ArrayBase<impl ndarray::Data<Elem = f32>, impl Dimension>, shape: Sh) -> Result<ndarray::Array<f32, D>>
where
    Sh: ShapeBuilder<Dim = D> + Into<ndarray::StrideShape<D>>,
    D: Dimension,
{
    ndarray::Array::from_shape_vec(shape, tensor.iter().copied().collect())
        .map_err(Error::from)
}

/// Checks that a tensor has exactly the expected dimensions
pub fn expect_shape(tensor: &Tensor, expected: &[usize], what: &str) -> Result<()> {
    if tensor.shape() != expected {
        return Err(Error::Shape(format!(
            "{}: expected shape {:?}, got {:?}",
            what,
            expected,
            tensor.shape()
        )));
    }
    Ok(())
}

/// Zero tensor with the given dimensions
pub fn zeros(shape: &[usize]) -> Tensor {
    ArrayD::zeros(IxDyn(shape))
}
