//! Image loading and normalization.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageReader, ImageResult};
use ndarray::Array4;

use crate::error::{Error, Result};

use super::{ImageSize, ImageTensor, RGB_CHANNELS};

/// Square region kept by the centre crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub offset_x: u32,
    pub offset_y: u32,
    pub side: u32,
}

impl CropWindow {
    /// Largest centred square inside a `width` x `height` image.
    ///
    /// The excess on the longer axis is split evenly, rounding the
    /// leading offset down.
    #[must_use]
    pub const fn centered(width: u32, height: u32) -> Self {
        let side = if width < height { width } else { height };
        Self {
            offset_x: width.saturating_sub(height) / 2,
            offset_y: height.saturating_sub(width) / 2,
            side,
        }
    }
}

/// Size that fits a `width` x `height` image inside `target` without
/// changing its aspect ratio.
///
/// The result never exceeds `target` on either axis and matches it on
/// at least one (up to rounding).
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn fit_within(width: u32, height: u32, target: ImageSize) -> (u32, u32) {
    let scale = (f64::from(target.width) / f64::from(width))
        .min(f64::from(target.height) / f64::from(height));

    // Safe: scaled sides are bounded by the target, which fits in u32
    let fit = |side: u32, limit: u32| ((f64::from(side) * scale).round() as u32).clamp(1, limit);

    (fit(width, target.width), fit(height, target.height))
}

/// Load an image from disk and normalize it into a model input tensor.
///
/// The image is:
/// 1. Decoded and coerced to 3-channel floating point RGB
/// 2. Centre-cropped to a square
/// 3. Resized to fit `target` without distortion (bilinear filter)
/// 4. Returned as an NHWC tensor (1, H, W, 3) with values in [0, 1]
///
/// # Errors
///
/// Returns [`Error::Decode`] if the file cannot be read or decoded, and
/// [`Error::InvalidParameter`] if `target` has a zero side.
pub fn normalize<P: AsRef<Path>>(path: P, target: ImageSize) -> Result<ImageTensor> {
    let path = path.as_ref();
    target.validate("target_size")?;

    let img = decode_file(path).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = img.dimensions();
    let window = CropWindow::centered(width, height);
    let (out_width, out_height) = fit_within(window.side, window.side, target);

    tracing::debug!(
        "Normalizing {} ({width}x{height}) via {window:?} to {out_width}x{out_height}",
        path.display()
    );

    let square = DynamicImage::ImageRgb32F(img.to_rgb32f()).crop_imm(
        window.offset_x,
        window.offset_y,
        window.side,
        window.side,
    );
    let resized = square.resize_exact(out_width, out_height, FilterType::Triangle);

    decode_to_tensor(&resized)
}

/// Decode a file, detecting its format from the content rather than the
/// extension.
fn decode_file(path: &Path) -> ImageResult<DynamicImage> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

/// Convert a decoded image to an NHWC tensor, coercing it to RGB.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the pixel buffer does not match
/// the image dimensions.
pub fn decode_to_tensor(img: &DynamicImage) -> Result<ImageTensor> {
    let rgb = img.to_rgb32f();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);

    Array4::from_shape_vec((1, height, width, RGB_CHANNELS), rgb.into_raw()).map_err(|_| {
        Error::ShapeMismatch {
            expected: format!("(1, {height}, {width}, {RGB_CHANNELS})"),
            actual: "pixel buffer of a different length".to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_crop_window_landscape() {
        let window = CropWindow::centered(500, 300);
        assert_eq!(
            window,
            CropWindow {
                offset_x: 100,
                offset_y: 0,
                side: 300
            }
        );
    }

    #[test]
    fn test_crop_window_portrait_floors_offset() {
        let window = CropWindow::centered(300, 501);
        assert_eq!(window.side, 300);
        assert_eq!(window.offset_x, 0);
        assert_eq!(window.offset_y, 100);
    }

    #[test]
    fn test_crop_window_square_is_identity() {
        let window = CropWindow::centered(400, 400);
        assert_eq!(
            window,
            CropWindow {
                offset_x: 0,
                offset_y: 0,
                side: 400
            }
        );
    }

    #[test]
    fn test_crop_window_stays_in_bounds() {
        for (w, h) in [(1, 1), (1, 999), (999, 1), (640, 480), (17, 1024)] {
            let window = CropWindow::centered(w, h);
            assert_eq!(window.side, w.min(h));
            assert!(window.offset_x + window.side <= w);
            assert!(window.offset_y + window.side <= h);
        }
    }

    #[test]
    fn test_fit_within_square_target() {
        assert_eq!(fit_within(300, 300, ImageSize::square(384)), (384, 384));
        assert_eq!(fit_within(1000, 1000, ImageSize::square(50)), (50, 50));
    }

    #[test]
    fn test_fit_within_keeps_aspect() {
        assert_eq!(fit_within(300, 300, ImageSize::new(400, 200)), (200, 200));
        assert_eq!(fit_within(300, 300, ImageSize::new(100, 600)), (100, 100));
    }

    #[test]
    fn test_fit_within_bounds() {
        for target in [
            ImageSize::new(1, 1),
            ImageSize::new(7, 300),
            ImageSize::new(600, 599),
        ] {
            let (w, h) = fit_within(123, 123, target);
            assert!(w <= target.width && h <= target.height);
            assert!(w == target.width || h == target.height);
        }
    }

    #[test]
    fn test_decode_to_tensor_coerces_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 0])));
        let tensor = decode_to_tensor(&img).unwrap();

        assert_eq!(tensor.shape(), &[1, 2, 4, 3]);
        assert!((tensor[[0, 1, 3, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 3, 2]].abs() < 1e-6);
    }

    #[test]
    fn test_normalize_center_crop_and_resize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bands.png");

        // Red | green | blue vertical bands, each 100 pixels wide
        let img = RgbImage::from_fn(300, 100, |x, _| match x / 100 {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });
        img.save(&path).unwrap();

        let tensor = normalize(&path, ImageSize::square(50)).unwrap();
        assert_eq!(tensor.shape(), &[1, 50, 50, 3]);

        // Only the green middle band survives the crop
        let centre: ndarray::ArrayView1<f32> = tensor.slice(ndarray::s![0, 25, 25, ..]);
        assert!(centre[0] < 0.01);
        assert!(centre[1] > 0.99);
        assert!(centre[2] < 0.01);
    }

    #[test]
    fn test_normalize_grayscale_has_three_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        GrayImage::from_pixel(20, 40, Luma([128])).save(&path).unwrap();

        let tensor = normalize(&path, ImageSize::square(10)).unwrap();
        assert_eq!(tensor.shape(), &[1, 10, 10, 3]);

        let max = tensor.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = tensor.iter().copied().fold(f32::INFINITY, f32::min);
        assert!((0.0..=1.0).contains(&min));
        assert!((0.0..=1.0).contains(&max));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.png");
        RgbImage::from_fn(97, 61, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        })
        .save(&path)
        .unwrap();

        let first = normalize(&path, ImageSize::square(40)).unwrap();
        let second = normalize(&path, ImageSize::square(40)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_detects_format_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("source.png");
        RgbImage::from_pixel(20, 10, Rgb([0, 0, 255])).save(&png).unwrap();

        for name in ["photo", "really_png.jpg"] {
            let path = dir.path().join(name);
            std::fs::copy(&png, &path).unwrap();

            let tensor = normalize(&path, ImageSize::square(8)).unwrap();
            assert_eq!(tensor.shape(), &[1, 8, 8, 3]);
            assert!(tensor[[0, 4, 4, 2]] > 0.99);
        }
    }

    #[test]
    fn test_normalize_missing_file() {
        let err = normalize("does/not/exist.jpg", ImageSize::square(10)).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_normalize_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = normalize(&path, ImageSize::square(10)).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_normalize_rejects_zero_target() {
        let err = normalize("whatever.png", ImageSize::new(0, 10)).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }
}
