//! Style transfer orchestration.

use std::path::{Path, PathBuf};

use ::image::RgbImage;

use crate::error::{Error, Result};
use crate::image::{self, ImageSize};
use crate::model::{ModelCache, ModelLoader, ModelProvider, ModelSpec, OnnxLoader, StyleModel};

/// Configuration for the style transfer pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Size the style image is reduced to before style extraction.
    pub style_image_size: ImageSize,

    /// Size of the content tensor, and hence of the stylized output.
    pub output_image_size: ImageSize,

    /// Model to fetch into the cache when `model_path` is not set.
    pub model_spec: ModelSpec,

    /// Explicit ONNX model file; bypasses the cache.
    pub model_path: Option<PathBuf>,

    /// Output JPEG quality (1-100).
    pub output_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            style_image_size: ImageSize::STYLE_DEFAULT,
            output_image_size: ImageSize::OUTPUT_DEFAULT,
            model_spec: ModelSpec::default(),
            model_path: None,
            output_quality: 95,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        self.style_image_size.validate("style_image_size")?;
        self.output_image_size.validate("output_image_size")?;

        if !(1..=100).contains(&self.output_quality) {
            return Err(Error::invalid("output_quality", "must be between 1 and 100"));
        }

        Ok(())
    }

    /// A request for this configuration's sizes.
    #[must_use]
    pub fn request<P: Into<PathBuf>, Q: Into<PathBuf>>(
        &self,
        content_path: P,
        style_path: Q,
    ) -> StyleTransferRequest {
        StyleTransferRequest::new(content_path, style_path)
            .with_style_size(self.style_image_size)
            .with_output_size(self.output_image_size)
    }

    /// The model loader this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cache directory cannot be created.
    pub fn loader(&self) -> Result<OnnxLoader> {
        match &self.model_path {
            Some(path) => Ok(OnnxLoader::from_file(path)),
            None => Ok(OnnxLoader::cached(
                ModelCache::new()?,
                self.model_spec.clone(),
            )),
        }
    }
}

/// Everything that determines one stylized output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTransferRequest {
    content_path: PathBuf,
    style_path: PathBuf,
    style_size: ImageSize,
    output_size: ImageSize,
}

impl StyleTransferRequest {
    /// Request with the default style (256x256) and output (384x384) sizes.
    #[must_use]
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(content_path: P, style_path: Q) -> Self {
        Self {
            content_path: content_path.into(),
            style_path: style_path.into(),
            style_size: ImageSize::STYLE_DEFAULT,
            output_size: ImageSize::OUTPUT_DEFAULT,
        }
    }

    #[must_use]
    pub fn with_style_size(mut self, size: ImageSize) -> Self {
        self.style_size = size;
        self
    }

    #[must_use]
    pub fn with_output_size(mut self, size: ImageSize) -> Self {
        self.output_size = size;
        self
    }

    #[must_use]
    pub fn content_path(&self) -> &Path {
        &self.content_path
    }

    #[must_use]
    pub fn style_path(&self) -> &Path {
        &self.style_path
    }

    #[must_use]
    pub const fn style_size(&self) -> ImageSize {
        self.style_size
    }

    #[must_use]
    pub const fn output_size(&self) -> ImageSize {
        self.output_size
    }

    fn validate(&self) -> Result<()> {
        self.style_size.validate("style_size")?;
        self.output_size.validate("output_size")
    }
}

/// The stylized image, plus the model inputs it was made from.
#[derive(Debug, Clone)]
pub struct StylizedResult {
    image: RgbImage,
    content_preview: RgbImage,
    style_preview: RgbImage,
}

impl StylizedResult {
    /// The stylized image.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    #[must_use]
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Width and height of the stylized image.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// The cropped and resized content image fed to the model.
    #[must_use]
    pub const fn content_preview(&self) -> &RgbImage {
        &self.content_preview
    }

    /// The cropped, resized and blurred style image fed to the model.
    #[must_use]
    pub const fn style_preview(&self) -> &RgbImage {
        &self.style_preview
    }

    /// Content, style and stylized images side by side.
    #[must_use]
    pub fn comparison(&self) -> RgbImage {
        image::side_by_side(&[&self.content_preview, &self.style_preview, &self.image])
    }

    /// Export the stylized image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be saved.
    pub fn save<P: AsRef<Path>>(&self, path: P, quality: u8) -> Result<()> {
        image::save_image(&self.image, path, quality)
    }
}

/// Runs style transfer requests against a lazily loaded model.
pub struct StyleTransfer<L: ModelLoader> {
    provider: ModelProvider<L>,
}

impl StyleTransfer<OnnxLoader> {
    /// Pipeline for the ONNX model described by `config`.
    ///
    /// The model itself is loaded on the first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the model
    /// cache cannot be set up.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing pipeline with config: {config:?}");

        Ok(Self::new(ModelProvider::new(config.loader()?)))
    }
}

impl<L: ModelLoader> StyleTransfer<L> {
    #[must_use]
    pub const fn new(provider: ModelProvider<L>) -> Self {
        Self { provider }
    }

    #[must_use]
    pub const fn provider(&self) -> &ModelProvider<L> {
        &self.provider
    }

    /// Repaint the request's content image in the style of its style image.
    ///
    /// Both images are decoded before the model is touched, so a bad
    /// input path fails without loading or running the model.
    ///
    /// # Errors
    ///
    /// Returns a decode error for unreadable inputs, a model load error
    /// if the model cannot be obtained, or a stylization error if
    /// inference fails or returns a malformed tensor.
    pub fn stylize(&self, request: &StyleTransferRequest) -> Result<StylizedResult> {
        request.validate()?;

        tracing::info!(
            "Stylizing {} with {}",
            request.content_path.display(),
            request.style_path.display()
        );

        let content = image::normalize(&request.content_path, request.output_size)?;
        let style = image::normalize(&request.style_path, request.style_size)?;
        let style = image::avg_pool_3x3(&style);

        tracing::debug!(
            "Content tensor {:?}, style tensor {:?}",
            content.shape(),
            style.shape()
        );

        let model = self.provider.get()?;

        tracing::info!("Running style transfer...");
        let output = model.stylize(&content, &style)?;
        tracing::debug!("Output tensor {:?}", output.shape());

        let (_, height, width, _) = content.dim();
        if output.dim().1 != height || output.dim().2 != width {
            return Err(Error::ShapeMismatch {
                expected: format!("(1, {height}, {width}, 3)"),
                actual: format!("{:?}", output.shape()),
            });
        }

        let result = StylizedResult {
            image: image::tensor_to_image(&output)?,
            content_preview: image::tensor_to_image(&content)?,
            style_preview: image::tensor_to_image(&style)?,
        };

        tracing::info!("Stylization complete");
        Ok(result)
    }
}
