use image::{GrayImage, Luma};
use imageproc::integral_image::integral_image;

use crate::{
    error::Result,
    traits::ImagePreprocessor,
    types::{BGR_CHANNELS, RawFrame},
};

/// Convert a BGR frame to grayscale with BT.601 weights (14-bit fixed point)
pub fn to_grayscale(frame: &RawFrame<'_>) -> Result<GrayImage> {
    const R_WEIGHT: u32 = 4899;
    const G_WEIGHT: u32 = 9617;
    const B_WEIGHT: u32 = 1868;
    const SHIFT: u32 = 14;

    frame.validate()?;

    let mut gray = GrayImage::new(frame.width(), frame.height());
    for y in 0..frame.height() {
        let row = frame.row(y);
        for (x, bgr) in row.chunks_exact(BGR_CHANNELS).enumerate() {
            let weighted = u32::from(bgr[0]) * B_WEIGHT
                + u32::from(bgr[1]) * G_WEIGHT
                + u32::from(bgr[2]) * R_WEIGHT;
            let value = (weighted + (1 << (SHIFT - 1))) >> SHIFT;
            gray.put_pixel(x as u32, y, Luma([value.min(255) as u8]));
        }
    }

    Ok(gray)
}

/// Gaussian blur with a fixed square kernel
#[derive(Debug, Clone)]
pub struct GaussianBlurPreprocessor {
    pub kernel_size: u32,
    pub sigma: f32,
}

impl Default for GaussianBlurPreprocessor {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            sigma: 1.5,
        }
    }
}

impl GaussianBlurPreprocessor {
    /// Normalized 1D kernel; the 2D kernel is its outer product
    pub fn kernel(&self) -> Vec<f32> {
        let radius = (self.kernel_size / 2) as i32;
        let denom = 2.0 * self.sigma * self.sigma;
        let weights: Vec<f32> = (-radius..=radius)
            .map(|i| (-((i * i) as f32) / denom).exp())
            .collect();
        let sum: f32 = weights.iter().sum();
        weights.into_iter().map(|w| w / sum).collect()
    }
}

impl ImagePreprocessor for GaussianBlurPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let kernel = self.kernel();
        Ok(imageproc::filter::separable_filter_equal(image, &kernel))
    }
}

/// Local-mean adaptive threshold with inverted polarity: pixels darker than
/// their neighbourhood mean minus `c` become 255, everything else 0.
#[derive(Debug, Clone)]
pub struct AdaptiveThresholdPreprocessor {
    pub block_size: u32,
    pub c: i32,
}

impl Default for AdaptiveThresholdPreprocessor {
    fn default() -> Self {
        Self {
            block_size: 21,
            c: 5,
        }
    }
}

impl ImagePreprocessor for AdaptiveThresholdPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let (width, height) = image.dimensions();
        let radius = self.block_size / 2;

        // (width + 1) x (height + 1), zero first row and column
        let integral = integral_image::<_, u32>(image);

        let mut output = GrayImage::new(width, height);
        for y in 0..height {
            // Window is clipped to the image, the mean uses the clipped area
            let y1 = y.saturating_sub(radius);
            let y2 = (y + radius + 1).min(height);
            for x in 0..width {
                let x1 = x.saturating_sub(radius);
                let x2 = (x + radius + 1).min(width);

                let area = u64::from((x2 - x1) * (y2 - y1));
                let sum = u64::from(integral.get_pixel(x2, y2)[0])
                    + u64::from(integral.get_pixel(x1, y1)[0])
                    - u64::from(integral.get_pixel(x1, y2)[0])
                    - u64::from(integral.get_pixel(x2, y1)[0]);
                let mean = ((sum + area / 2) / area) as i32;

                let pixel = i32::from(image.get_pixel(x, y)[0]);
                let value = if pixel - mean <= -self.c { 255u8 } else { 0u8 };
                output.put_pixel(x, y, Luma([value]));
            }
        }

        Ok(output)
    }
}
