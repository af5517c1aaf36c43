use image::GrayImage;
use crate::{
    error::Result,
    types::{Contour, Mask, Polygon},
};

/// Trait for image preprocessing algorithms
pub trait ImagePreprocessor: Send + Sync {
    /// Preprocess the input image (e.g., blur, threshold)
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Vision primitives the pipeline is built on.
///
/// The pipeline only talks to this trait, so any library able to detect edges,
/// trace boundaries and simplify polylines can stand in for the default
/// imageproc/geo backend.
pub trait VisionBackend: Send + Sync {
    /// Edge map of a binary mask, foreground edges set to 255
    fn detect_edges(&self, mask: &Mask, low_threshold: f32, high_threshold: f32) -> Result<Mask>;

    /// Every closed boundary in the edge map, no hierarchy, collinear runs
    /// compressed to their end points. An empty vector is a valid answer.
    fn trace_contours(&self, edges: &Mask) -> Result<Vec<Contour>>;

    /// Area enclosed by the contour
    fn compute_area(&self, contour: &Contour) -> f64;

    /// Simplify the contour as a closed ring with the given tolerance in pixels
    fn simplify_polygon(&self, contour: &Contour, epsilon: f64) -> Result<Polygon>;
}
