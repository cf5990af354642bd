//! Image decoding, normalization, conversion and export utilities.

mod blur;
mod compare;
mod load;
mod save;

use std::fmt;
use std::str::FromStr;

pub use blur::avg_pool_3x3;
pub use compare::side_by_side;
pub use load::{decode_to_tensor, fit_within, normalize, CropWindow};
pub use save::{save_image, tensor_to_image};

use ndarray::Array4;

use crate::error::{Error, Result};

/// Image tensor in NHWC format (batch, height, width, channels).
/// Values are in the [0, 1] range and the batch dimension is always 1.
pub type ImageTensor = Array4<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;

/// Target size of a normalized image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// Default resolution of the stylized output.
    pub const OUTPUT_DEFAULT: Self = Self::square(384);

    /// Default resolution the style image is reduced to.
    pub const STYLE_DEFAULT: Self = Self::square(256);

    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Check that both dimensions are positive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] naming `name` if either side is zero.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid(
                name,
                format!("{self} must be positive in both dimensions"),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = Error;

    /// Parse `"384"` as a square or `"384x256"` as width by height.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| Error::invalid("size", format!("{s:?}: {e}")))
        };

        let size = match s.split_once(|c: char| c.eq_ignore_ascii_case(&'x')) {
            Some((w, h)) => Self::new(parse(w)?, parse(h)?),
            None => Self::square(parse(s)?),
        };
        size.validate("size")?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_square() {
        assert_eq!("384".parse::<ImageSize>().unwrap(), ImageSize::square(384));
    }

    #[test]
    fn test_parse_rectangle() {
        assert_eq!(
            "640x480".parse::<ImageSize>().unwrap(),
            ImageSize::new(640, 480)
        );
        assert_eq!(
            "64X32".parse::<ImageSize>().unwrap(),
            ImageSize::new(64, 32)
        );
    }

    #[test]
    fn test_parse_rejects_zero_and_garbage() {
        assert!("0".parse::<ImageSize>().is_err());
        assert!("10x0".parse::<ImageSize>().is_err());
        assert!("big".parse::<ImageSize>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ImageSize::new(50, 600).to_string(), "50x600");
    }
}
