//! Image preprocessing
//!
//! Decodes uploaded bytes, resizes to the model's input size and scales
//! pixels into `[0, 1]`.

use image::imageops::FilterType;
use ndarray::Array3;

use common::error::{Error, Result};

use crate::tensor::{InputShape, Tensor};

/// Turns encoded image bytes into a network input tensor
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    /// Target tensor shape
    target: InputShape,
    
    /// Resampling filter
    filter: FilterType,
}

impl ImagePreprocessor {
    /// Creates a preprocessor using bicubic resampling
    pub fn new(target: InputShape) -> Self {
        Self {
            target,
            filter: FilterType::CatmullRom,
        }
    }
    
    /// Overrides the resampling filter
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
    
    /// Target tensor shape
    pub fn target(&self) -> InputShape {
        self.target
    }
    
    /// Decodes, resizes and normalises an encoded image
    pub fn preprocess(&self, bytes: &[u8]) -> Result<Tensor> {
        let img = image::load_from_memory(bytes).map_err(|e| Error::ImageDecode(e.to_string()))?;
        
        let InputShape { height, width, channels } = self.target;
        let resized = img.resize_exact(width as u32, height as u32, self.filter);
        
        let raw = match channels {
            1 => resized.to_luma8().into_raw(),
            3 => resized.to_rgb8().into_raw(),
            4 => resized.to_rgba8().into_raw(),
            other => {
                return Err(Error::Model(format!(
                    "unsupported input channel count {}",
                    other
                )))
            }
        };
        
        let pixels = Array3::from_shape_vec((height, width, channels), raw)?;
        Ok(pixels.mapv(|p| f32::from(p) / 255.0).into_dyn())
    }
}
