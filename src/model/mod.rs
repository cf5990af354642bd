//! Pretrained style transfer network: loading, caching and inference.

mod loader;
mod onnx;
mod provider;

pub use loader::{ModelCache, ModelSpec};
pub use onnx::{OnnxLoader, OnnxStyleModel};
pub use provider::ModelProvider;

use crate::error::Result;
use crate::image::ImageTensor;

/// A loaded, ready-to-run arbitrary style transfer network.
///
/// Both inputs are NHWC tensors with a batch of 1, 3 channels and values
/// in [0, 1]; their spatial sizes are independent. The output is the
/// content repainted in the style, at the content's spatial size.
pub trait StyleModel: Send + Sync {
    /// Run the network on one content/style pair.
    ///
    /// # Errors
    ///
    /// Returns a stylization error if inference fails.
    fn stylize(&self, content: &ImageTensor, style: &ImageTensor) -> Result<ImageTensor>;
}

/// Produces a [`StyleModel`]; typically slow, so callers go through a
/// [`ModelProvider`] to do it once.
pub trait ModelLoader: Send + Sync {
    type Model: StyleModel;

    /// Fetch and initialize the network.
    ///
    /// # Errors
    ///
    /// Returns a model load error if the network cannot be obtained.
    fn load(&self) -> Result<Self::Model>;
}
