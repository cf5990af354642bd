//! ONNX Runtime implementation of the style transfer network.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};
use crate::image::{ImageTensor, RGB_CHANNELS};

use super::{ModelCache, ModelLoader, ModelSpec, StyleModel};

/// Style transfer network backed by an ONNX Runtime session.
///
/// The session takes two positional inputs, content then style, and its
/// first output is the stylized image.
pub struct OnnxStyleModel {
    name: String,
    // `Session::run` needs exclusive access
    session: Mutex<Session>,
}

impl OnnxStyleModel {
    /// Load a model from an ONNX file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] if the file is not a loadable model.
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let name = path.display().to_string();

        tracing::info!("Loading style transfer model from {name}");

        let load_err = |source| Error::ModelLoad {
            name: name.clone(),
            source,
        };
        let session = Session::builder()
            .map_err(load_err)?
            .commit_from_file(&path)
            .map_err(load_err)?;

        Ok(Self {
            name,
            session: Mutex::new(session),
        })
    }

    /// Where the model was loaded from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl StyleModel for OnnxStyleModel {
    fn stylize(&self, content: &ImageTensor, style: &ImageTensor) -> Result<ImageTensor> {
        let content_value =
            Tensor::from_array(content.clone()).map_err(|source| Error::Inference { source })?;
        let style_value =
            Tensor::from_array(style.clone()).map_err(|source| Error::Inference { source })?;

        // A panic in another inference call leaves the session itself intact
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        let outputs = session
            .run(ort::inputs![content_value, style_value])
            .map_err(|source| Error::Inference { source })?;

        // Get first output
        let output = outputs
            .values()
            .next()
            .ok_or_else(|| Error::ShapeMismatch {
                expected: "stylized image output".to_string(),
                actual: "no output".to_string(),
            })?;

        extract_array4(&output)
    }
}

/// Extract a 4D NHWC RGB array from an ONNX value.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn extract_array4(value: &ort::value::ValueRef<'_>) -> Result<Array4<f32>> {
    let (shape_info, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    // Safe: tensor dimensions are always non-negative and within bounds
    let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

    if dims.len() != 4 || dims[3] != RGB_CHANNELS {
        return Err(Error::ShapeMismatch {
            expected: format!("(1, H, W, {RGB_CHANNELS}) tensor"),
            actual: format!("{dims:?}"),
        });
    }

    Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), data.to_vec()).map_err(|_| {
        Error::ShapeMismatch {
            expected: format!("{dims:?}"),
            actual: "reshape failed".to_string(),
        }
    })
}

/// Where an [`OnnxLoader`] gets its model file.
#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Cached { cache: ModelCache, spec: ModelSpec },
}

/// Loads an [`OnnxStyleModel`] from a file or from the model cache.
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    source: Source,
}

impl OnnxLoader {
    /// Load from an explicit ONNX file.
    #[must_use]
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    /// Load the model described by `spec`, downloading it into `cache`
    /// on first use.
    #[must_use]
    pub const fn cached(cache: ModelCache, spec: ModelSpec) -> Self {
        Self {
            source: Source::Cached { cache, spec },
        }
    }
}

impl ModelLoader for OnnxLoader {
    type Model = OnnxStyleModel;

    fn load(&self) -> Result<OnnxStyleModel> {
        let path = match &self.source {
            Source::File(path) => path.clone(),
            Source::Cached { cache, spec } => cache.model_path(spec)?,
        };

        OnnxStyleModel::from_file(path)
    }
}
