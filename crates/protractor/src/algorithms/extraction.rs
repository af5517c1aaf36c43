use image::GrayImage;
use tracing::debug;

use crate::{
    algorithms::simplification::simplify_closed,
    config::EdgeConfig,
    error::Result,
    traits::VisionBackend,
    types::{Contour, Mask, Point, Polygon},
};

/// Imageproc/geo implementation of the vision primitives
#[derive(Debug, Clone, Default)]
pub struct ImageprocBackend;

impl VisionBackend for ImageprocBackend {
    fn detect_edges(&self, mask: &Mask, low_threshold: f32, high_threshold: f32) -> Result<Mask> {
        Ok(imageproc::edges::canny(mask, low_threshold, high_threshold))
    }

    fn trace_contours(&self, edges: &GrayImage) -> Result<Vec<Contour>> {
        let contours = imageproc::contours::find_contours::<i32>(edges);

        let result = contours
            .into_iter()
            .map(|contour| {
                let points: Vec<Point> = contour
                    .points
                    .iter()
                    .map(|p| Point::new(p.x, p.y))
                    .collect();
                Contour::new(compress_chain(&points))
            })
            .collect();

        Ok(result)
    }

    fn compute_area(&self, contour: &Contour) -> f64 {
        contour.area()
    }

    fn simplify_polygon(&self, contour: &Contour, epsilon: f64) -> Result<Polygon> {
        Ok(Polygon::new(simplify_closed(&contour.points, epsilon)))
    }
}

/// Keep only the points where the boundary changes direction.
///
/// The input is a closed chain of 8-connected pixels; a point survives when
/// the step arriving at it differs from the step leaving it.
pub fn compress_chain(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step = |from: &Point, to: &Point| (to.x - from.x, to.y - from.y);

    let compressed: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = &points[(i + n - 1) % n];
            let next = &points[(i + 1) % n];
            step(prev, &points[i]) != step(&points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if compressed.is_empty() {
        // Every step identical only happens for degenerate repeated points
        vec![points[0]]
    } else {
        compressed
    }
}

/// Edge detection followed by boundary tracing
pub fn extract_contours(
    backend: &dyn VisionBackend,
    mask: &Mask,
    edges: &EdgeConfig,
) -> Result<Vec<Contour>> {
    let edge_map = backend.detect_edges(mask, edges.low_threshold, edges.high_threshold())?;
    let contours = backend.trace_contours(&edge_map)?;
    debug!(count = contours.len(), "traced contours");
    Ok(contours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_compress_square_outline() {
        // Pixel walk around a 3x3 square
        let points = vec![
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(2, 0),
            Point::new(2, 1),
            Point::new(2, 2),
            Point::new(1, 2),
            Point::new(0, 2),
            Point::new(0, 1),
        ];
        let compressed = compress_chain(&points);
        assert_eq!(
            compressed,
            vec![
                Point::new(0, 0),
                Point::new(2, 0),
                Point::new(2, 2),
                Point::new(0, 2),
            ]
        );
    }

    #[test]
    fn test_compress_keeps_short_chains() {
        let points = vec![Point::new(4, 4), Point::new(5, 5)];
        assert_eq!(compress_chain(&points), points);
    }

    #[test]
    fn test_blank_mask_yields_empty_contour_set() {
        let mask = GrayImage::new(50, 50);
        let contours = extract_contours(&ImageprocBackend, &mask, &EdgeConfig::default())
            .expect("tracing a blank mask is not an error");
        assert!(contours.is_empty());
    }

    #[test]
    fn test_filled_square_traces_closed_boundary() {
        let mut mask = GrayImage::new(80, 80);
        draw_filled_rect_mut(&mut mask, Rect::at(20, 20).of_size(40, 40), Luma([255u8]));

        let contours = extract_contours(&ImageprocBackend, &mask, &EdgeConfig::default())
            .expect("tracing should succeed");
        assert!(!contours.is_empty());

        let largest = contours
            .iter()
            .map(|c| ImageprocBackend.compute_area(c))
            .fold(0.0, f64::max);
        // Edges run along the square's border, so the traced area is close to 40x40
        assert!(largest > 1000.0 && largest < 2500.0, "area was {largest}");
    }
}
