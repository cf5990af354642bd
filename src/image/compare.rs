//! Side-by-side comparison panel.

use image::{imageops, imageops::FilterType, RgbImage};

/// Lay images out left to right at a common height.
///
/// Every panel is scaled to the height of the first image, keeping its
/// aspect ratio. An empty slice yields an empty image.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn side_by_side(images: &[&RgbImage]) -> RgbImage {
    let Some(first) = images.first() else {
        return RgbImage::new(0, 0);
    };
    let height = first.height();

    let panels: Vec<RgbImage> = images
        .iter()
        .map(|img| {
            if img.height() == height || img.height() == 0 {
                (*img).clone()
            } else {
                let scale = f64::from(height) / f64::from(img.height());
                let width = ((f64::from(img.width()) * scale).round() as u32).max(1);
                imageops::resize(*img, width, height, FilterType::Triangle)
            }
        })
        .collect();

    let total_width = panels.iter().map(RgbImage::width).sum();
    let mut canvas = RgbImage::new(total_width, height);

    let mut x = 0i64;
    for panel in &panels {
        imageops::replace(&mut canvas, panel, x, 0);
        x += i64::from(panel.width());
    }

    canvas
}
