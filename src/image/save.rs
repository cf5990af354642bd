//! Tensor to image conversion and image export.

use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Save an image to disk.
///
/// The format is inferred from the extension. JPEG output is written
/// with the given quality (1-100); other formats ignore it.
///
/// # Errors
///
/// Returns an error if the image cannot be encoded or written.
pub fn save_image<P: AsRef<Path>>(img: &RgbImage, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();

    tracing::debug!("Saving {}x{} image to {}", img.width(), img.height(), path.display());

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            img.write_with_encoder(encoder).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
        _ => {
            img.save(path).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}

/// Convert the first batch element of an NHWC tensor to an RGB image.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the tensor is empty, does not
/// have 3 channels, or is too large for an image.
#[allow(clippy::cast_possible_truncation)]
pub fn tensor_to_image(tensor: &ImageTensor) -> Result<RgbImage> {
    let (batch, height, width, channels) = tensor.dim();

    if batch == 0 || channels != RGB_CHANNELS {
        return Err(Error::ShapeMismatch {
            expected: format!("(1, H, W, {RGB_CHANNELS})"),
            actual: format!("{:?}", tensor.shape()),
        });
    }

    let (Ok(img_width), Ok(img_height)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(Error::ShapeMismatch {
            expected: "image dimensions within u32".to_string(),
            actual: format!("{width}x{height}"),
        });
    };

    let mut img: RgbImage = ImageBuffer::new(img_width, img_height);

    for y in 0..height {
        for x in 0..width {
            let r = to_u8(tensor[[0, y, x, 0]]);
            let g = to_u8(tensor[[0, y, x, 1]]);
            let b = to_u8(tensor[[0, y, x, 2]]);

            // Safe: x and y are bounded by the u32 checked dimensions
            img.put_pixel(x as u32, y as u32, Rgb([r, g, b]));
        }
    }

    Ok(img)
}

/// Scale a value from [0, 1] to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting; NaN saturates to 0
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn test_to_u8() {
        assert_eq!(to_u8(0.0), 0);
        assert_eq!(to_u8(0.5), 128);
        assert_eq!(to_u8(1.0), 255);
    }

    #[test]
    fn test_to_u8_clamp() {
        assert_eq!(to_u8(-0.3), 0);
        assert_eq!(to_u8(1.7), 255);
        assert_eq!(to_u8(f32::NAN), 0);
    }

    #[test]
    fn test_tensor_to_image_layout() {
        let mut tensor = Array4::<f32>::zeros((1, 2, 3, 3));
        tensor[[0, 1, 2, 1]] = 1.0;

        let img = tensor_to_image(&tensor).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1), &Rgb([0, 255, 0]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_tensor_to_image_uses_first_batch() {
        let mut tensor = Array4::<f32>::zeros((2, 1, 1, 3));
        tensor[[1, 0, 0, 0]] = 1.0;

        let img = tensor_to_image(&tensor).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_tensor_to_image_rejects_wrong_channels() {
        let tensor = Array4::<f32>::zeros((1, 4, 4, 1));
        assert!(matches!(
            tensor_to_image(&tensor),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_save_png_and_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbImage::from_pixel(8, 6, Rgb([10, 200, 30]));

        for name in ["out.png", "out.jpg"] {
            let path = dir.path().join(name);
            save_image(&img, &path, 90).unwrap();
            let reloaded = image::open(&path).unwrap();
            assert_eq!((reloaded.width(), reloaded.height()), (8, 6));
        }
    }
}
