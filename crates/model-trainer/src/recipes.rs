//! Stock model recipes
//!
//! Both networks take a 64x64 RGB image and emit ten class probabilities.

use rand::Rng;

use common::error::Result;
use inference_engine::{Activation, InputShape, Sequential};

/// Input shape shared by every recipe
pub const MODEL_INPUT_SHAPE: InputShape = InputShape::new(64, 64, 3);

/// Output width shared by every recipe
pub const NUM_CLASSES: usize = 10;

/// Samples drawn for the quick fit of the dummy model
pub const DUMMY_SAMPLES: usize = 32;

/// Epochs for the quick fit of the dummy model
pub const DUMMY_EPOCHS: usize = 1;

/// Batch size for the quick fit of the dummy model
pub const DUMMY_BATCH_SIZE: usize = 8;

/// Single conv block classifier
pub fn dummy_model<R: Rng + ?Sized>(rng: &mut R) -> Result<Sequential> {
    Sequential::builder("dummy_classifier", MODEL_INPUT_SHAPE)
        .conv2d(8, (3, 3), Activation::Relu)
        .max_pooling2d((2, 2))
        .flatten()
        .dense(NUM_CLASSES, Activation::Softmax)
        .build(rng)
}

/// Two conv blocks followed by a hidden dense layer
pub fn standard_model<R: Rng + ?Sized>(rng: &mut R) -> Result<Sequential> {
    Sequential::builder("classifier", MODEL_INPUT_SHAPE)
        .conv2d(16, (3, 3), Activation::Relu)
        .max_pooling2d((2, 2))
        .conv2d(32, (3, 3), Activation::Relu)
        .max_pooling2d((2, 2))
        .flatten()
        .dense(64, Activation::Relu)
        .dense(NUM_CLASSES, Activation::Softmax)
        .build(rng)
}
