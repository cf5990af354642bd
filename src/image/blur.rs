//! Fixed smoothing applied to the style image before style extraction.

use ndarray::Array4;

use super::ImageTensor;

/// Window radius of the 3x3 pool.
const RADIUS: usize = 1;

/// 3x3 average pool with stride 1 and "same" padding.
///
/// Each output pixel is the mean of the input pixels inside its 3x3
/// neighbourhood, per channel. Positions outside the image are not
/// counted, so border pixels average over the partial window. The
/// output has exactly the input's shape.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn avg_pool_3x3(tensor: &ImageTensor) -> ImageTensor {
    let (batch, height, width, channels) = tensor.dim();
    let mut pooled = Array4::<f32>::zeros((batch, height, width, channels));

    for n in 0..batch {
        for y in 0..height {
            let rows = y.saturating_sub(RADIUS)..(y + RADIUS + 1).min(height);
            for x in 0..width {
                let cols = x.saturating_sub(RADIUS)..(x + RADIUS + 1).min(width);
                let count = (rows.len() * cols.len()) as f32;

                for c in 0..channels {
                    let mut sum = 0.0;
                    for yy in rows.clone() {
                        for xx in cols.clone() {
                            sum += tensor[[n, yy, xx, c]];
                        }
                    }
                    pooled[[n, y, x, c]] = sum / count;
                }
            }
        }
    }

    pooled
}
