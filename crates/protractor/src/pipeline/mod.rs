pub mod builder;

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tracing::{debug, error};

use crate::{
    algorithms::{
        approximate_polygon, calculate_angle, extract_contours, reduce_vertices, select_largest,
        to_grayscale,
    },
    config::DetectorConfig,
    error::{AngleError, Result},
    render::ResultRenderer,
    traits::{ImagePreprocessor, VisionBackend},
    types::{AngleMeasurement, AngleResult, AnnotatedFrame, Contour, Mask, Point, Polygon, RawFrame},
};

/// Intermediate geometry of a successful measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// Largest traced contour
    pub contour: Contour,
    /// Its simplified polygon
    pub polygon: Polygon,
    /// Vertices the angle was computed from
    pub vertices: Vec<Point>,
    pub angle: AngleMeasurement,
}

/// Result of [`Detector::detect`]
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub frame: AnnotatedFrame,
    pub result: AngleResult,
    /// Vertices the angle was computed from, empty when nothing was found
    pub vertices: Vec<Point>,
}

impl Detection {
    pub fn found(&self) -> bool {
        self.result.is_found()
    }

    pub fn angle(&self) -> Option<f64> {
        self.result.angle()
    }

    /// The `(frame, found)` pair
    pub fn into_parts(self) -> (AnnotatedFrame, bool) {
        let found = self.result.is_found();
        (self.frame, found)
    }
}

/// Angle detection pipeline.
///
/// Holds only read-only configuration and stateless components, so one
/// instance can serve any number of threads.
pub struct Detector {
    config: DetectorConfig,
    backend: Box<dyn VisionBackend>,
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    renderer: ResultRenderer,
}

impl Detector {
    /// Create a new detector builder
    pub fn builder() -> builder::DetectorBuilder {
        builder::DetectorBuilder::new()
    }

    /// Detector with the default backend and preprocessing for `config`
    pub fn new(config: DetectorConfig) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    pub(crate) fn new_with(
        config: DetectorConfig,
        backend: Box<dyn VisionBackend>,
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        renderer: ResultRenderer,
    ) -> Self {
        Self {
            config,
            backend,
            preprocessors,
            renderer,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn preprocessor_count(&self) -> usize {
        self.preprocessors.len()
    }

    /// Grayscale conversion followed by every preprocessor in order
    pub fn preprocess(&self, frame: &RawFrame<'_>) -> Result<Mask> {
        let mut mask = to_grayscale(frame)?;
        for preprocessor in &self.preprocessors {
            mask = preprocessor.preprocess(&mask)?;
        }
        Ok(mask)
    }

    /// Run every stage up to the angle, reporting why a frame has no angle
    pub fn measure(&self, frame: &RawFrame<'_>) -> Result<Measurement> {
        frame.validate()?;
        let backend = self.backend.as_ref();

        let mask = self.preprocess(frame)?;

        let contours = extract_contours(backend, &mask, &self.config.edges)?;
        if contours.is_empty() {
            return Err(AngleError::EmptyContourSet);
        }

        let contour = select_largest(backend, &contours);
        let polygon = approximate_polygon(backend, &contour, &self.config.approximation)?;
        let vertices = reduce_vertices(
            &polygon,
            &self.config.vertex_filter,
            &self.config.approximation,
        )?;
        let angle = calculate_angle(&vertices)?;

        Ok(Measurement {
            contour,
            polygon,
            vertices,
            angle,
        })
    }

    /// Measure and annotate one frame.
    ///
    /// Never fails: when no angle is found, or any stage faults or panics, the
    /// result is `NotFound` with an unmodified copy of the input.
    pub fn detect(&self, frame: &RawFrame<'_>) -> Detection {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.measure_and_render(frame)));

        match outcome {
            Ok(Ok((annotated, measurement))) => {
                let angle = measurement.angle;
                debug!(
                    angle = angle.angle_degrees,
                    apex_x = angle.apex.x,
                    apex_y = angle.apex.y,
                    vertices = measurement.vertices.len(),
                    "angle found"
                );
                Detection {
                    frame: annotated,
                    result: AngleResult::Found(angle),
                    vertices: measurement.vertices,
                }
            }
            Ok(Err(err)) => {
                if err.is_fault() {
                    error!(
                        error = %err,
                        width = frame.width(),
                        height = frame.height(),
                        stride = frame.stride(),
                        "angle detection failed"
                    );
                } else {
                    debug!(reason = %err, "no angle in frame");
                }
                Self::not_found(frame)
            }
            Err(payload) => {
                error!(
                    panic = panic_message(payload.as_ref()),
                    width = frame.width(),
                    height = frame.height(),
                    "angle detection panicked"
                );
                Self::not_found(frame)
            }
        }
    }

    fn measure_and_render(&self, frame: &RawFrame<'_>) -> Result<(AnnotatedFrame, Measurement)> {
        let measurement = self.measure(frame)?;
        let annotated = self.renderer.render(
            frame,
            &measurement.contour,
            &measurement.vertices,
            measurement.angle.angle_degrees,
        )?;
        Ok((annotated, measurement))
    }

    fn not_found(frame: &RawFrame<'_>) -> Detection {
        Detection {
            frame: AnnotatedFrame::copy_of(frame),
            result: AngleResult::NotFound,
            vertices: Vec::new(),
        }
    }

    /// Get information about the detector configuration
    pub fn info(&self) -> String {
        format!(
            "Detector: {} preprocessors, edges {}/{}, epsilon {} x perimeter",
            self.preprocessors.len(),
            self.config.edges.low_threshold,
            self.config.edges.high_threshold(),
            self.config.approximation.epsilon_factor
        )
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("config", &self.config)
            .field("preprocessors", &self.preprocessors.len())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::{Rgb, RgbImage};
    use imageproc::{drawing::draw_polygon_mut, point::Point as DrawPoint};

    use super::*;
    use crate::{algorithms::ImageprocBackend, error::VertexStage, types::FrameBuffer};

    /// White frame with a dark filled V pointing up
    fn notch_frame() -> FrameBuffer {
        let mut image = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        draw_polygon_mut(
            &mut image,
            &[
                DrawPoint::new(100, 30),
                DrawPoint::new(160, 170),
                DrawPoint::new(40, 170),
            ],
            Rgb([20, 20, 20]),
        );
        FrameBuffer::from_rgb_image(&image)
    }

    /// Delegates to the default backend but always simplifies to a segment
    struct SegmentBackend;

    impl VisionBackend for SegmentBackend {
        fn detect_edges(&self, mask: &Mask, low: f32, high: f32) -> Result<Mask> {
            ImageprocBackend.detect_edges(mask, low, high)
        }

        fn trace_contours(&self, edges: &Mask) -> Result<Vec<Contour>> {
            ImageprocBackend.trace_contours(edges)
        }

        fn compute_area(&self, contour: &Contour) -> f64 {
            ImageprocBackend.compute_area(contour)
        }

        fn simplify_polygon(&self, _contour: &Contour, _epsilon: f64) -> Result<Polygon> {
            Ok(Polygon::new(vec![Point::new(0, 0), Point::new(10, 10)]))
        }
    }

    struct PanickingBackend;

    impl VisionBackend for PanickingBackend {
        fn detect_edges(&self, _mask: &Mask, _low: f32, _high: f32) -> Result<Mask> {
            panic!("edge detector exploded")
        }

        fn trace_contours(&self, _edges: &Mask) -> Result<Vec<Contour>> {
            Ok(Vec::new())
        }

        fn compute_area(&self, _contour: &Contour) -> f64 {
            0.0
        }

        fn simplify_polygon(&self, _contour: &Contour, _epsilon: f64) -> Result<Polygon> {
            Ok(Polygon::default())
        }
    }

    #[test]
    fn test_notch_is_measured() {
        let detector = Detector::new(DetectorConfig::default()).expect("defaults build");
        let buffer = notch_frame();
        let frame = buffer.as_frame();

        let detection = detector.detect(&frame);
        assert!(detection.found(), "expected an angle");

        let angle = detection.angle().expect("found carries an angle");
        // Drawn opening is about 46 degrees
        assert!(angle > 30.0 && angle < 65.0, "angle was {angle}");

        let measurement = detection.result.measurement().expect("found");
        assert!(measurement.apex.y < 60, "apex {:?}", measurement.apex);
        assert_ne!(detection.frame.as_bytes(), frame.data());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let detector = Detector::new(DetectorConfig::default()).expect("defaults build");
        let buffer = notch_frame();

        let first = detector.detect(&buffer.as_frame());
        let second = detector.detect(&buffer.as_frame());
        assert_eq!(first, second);
    }

    #[test]
    fn test_uniform_frame_is_not_found_and_untouched() {
        let detector = Detector::new(DetectorConfig::default()).expect("defaults build");
        let buffer = FrameBuffer::filled(64, 48, [128, 128, 128]);
        let frame = buffer.as_frame();

        assert!(matches!(detector.measure(&frame), Err(AngleError::EmptyContourSet)));

        let (annotated, found) = detector.detect(&frame).into_parts();
        assert!(!found);
        assert_eq!(annotated.as_bytes(), frame.data());
    }

    #[test]
    fn test_malformed_frame_is_not_found() {
        let detector = Detector::new(DetectorConfig::default()).expect("defaults build");
        let data = vec![0u8; 100];
        let frame = RawFrame::new(&data, 40, 40, 120);

        assert!(matches!(detector.measure(&frame), Err(AngleError::MalformedFrame(_))));

        let detection = detector.detect(&frame);
        assert_eq!(detection.result, AngleResult::NotFound);
        assert_eq!(detection.frame.as_bytes(), data.as_slice());
    }

    #[test]
    fn test_overflowing_stride_is_malformed() {
        let detector = Detector::new(DetectorConfig::default()).expect("defaults build");
        let data = [0u8; 3];
        let frame = RawFrame::new(&data, 1, 2, usize::MAX);

        assert!(matches!(detector.measure(&frame), Err(AngleError::MalformedFrame(_))));
        assert!(matches!(to_grayscale(&frame), Err(AngleError::MalformedFrame(_))));
        assert!(!detector.detect(&frame).found());
    }

    #[test]
    fn test_two_vertex_polygon_is_not_found() {
        let detector = Detector::builder()
            .set_backend(SegmentBackend)
            .build()
            .expect("builds");
        let buffer = notch_frame();
        let frame = buffer.as_frame();

        assert!(matches!(
            detector.measure(&frame),
            Err(AngleError::InsufficientVertices {
                stage: VertexStage::Simplification,
                count: 2
            })
        ));
        let detection = detector.detect(&frame);
        assert!(!detection.found());
        assert_eq!(detection.frame.as_bytes(), frame.data());
    }

    #[test]
    fn test_backend_panic_is_contained() {
        let detector = Detector::builder()
            .set_backend(PanickingBackend)
            .build()
            .expect("builds");
        let buffer = notch_frame();
        let frame = buffer.as_frame();

        let detection = detector.detect(&frame);
        assert!(!detection.found());
        assert_eq!(detection.frame.as_bytes(), frame.data());
    }

    #[test]
    fn test_concurrent_detection_matches_sequential() {
        let detector = Arc::new(Detector::new(DetectorConfig::default()).expect("defaults build"));
        let buffer = Arc::new(notch_frame());
        let expected = detector.detect(&buffer.as_frame());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let detector = Arc::clone(&detector);
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || detector.detect(&buffer.as_frame()))
            })
            .collect();

        for handle in handles {
            let detection = handle.join().expect("worker thread finished");
            assert_eq!(detection, expected);
        }
    }
}
