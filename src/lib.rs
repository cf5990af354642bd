//! # stylecast
//!
//! Arbitrary neural style transfer: repaint a content photo in the style
//! of any artwork using a pretrained network.
//!
//! Both images are centre-cropped to a square and resized, the style
//! image is lightly blurred, and the pair is run through an ONNX style
//! transfer model that is loaded once and shared by every request.
//!
//! ## Example
//!
//! ```no_run
//! use stylecast::{Config, StyleTransfer};
//!
//! # fn main() -> stylecast::Result<()> {
//! let config = Config::default();
//! let pipeline = StyleTransfer::from_config(&config)?;
//!
//! let request = config.request("cat.jpg", "mucha.jpg");
//! let result = pipeline.stylize(&request)?;
//! result.save("cat-mucha.png", config.output_quality)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;

pub use error::{Error, ErrorKind, Result};
pub use image::ImageSize;
pub use pipeline::{
    Config, PendingStylization, StyleTransfer, StyleTransferRequest, StylizedResult, Worker,
};
