//! # Protractor
//!
//! Measures the opening angle of a drill tip or V-notch from a single BGR
//! camera frame and returns an annotated copy of the frame for the operator.
//!
//! ## Pipeline
//!
//! - **Preprocessing**: grayscale, Gaussian blur, inverted local-mean threshold
//! - **Extraction**: Canny edges and boundary tracing through a [`VisionBackend`]
//! - **Selection**: the contour enclosing the largest area
//! - **Approximation**: closed Douglas-Peucker at 2% of the perimeter
//! - **Vertex filter**: near-duplicate removal for four-vertex polygons
//! - **Angle**: apex is the topmost vertex, rays are the two lowest
//! - **Rendering**: contour, vertex markers and the angle label
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use protractor::{Detector, DetectorConfig, io::load_frame};
//!
//! let detector = Detector::new(DetectorConfig::default())?;
//! let frame = load_frame("tip.png")?;
//!
//! let detection = detector.detect(&frame.as_frame());
//! if let Some(angle) = detection.angle() {
//!     println!("{angle:.1}");
//! }
//! detection.frame.save("tip-annotated.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Backend
//!
//! ```rust,no_run
//! use protractor::{Detector, ImageprocBackend, AdaptiveThresholdPreprocessor};
//!
//! let detector = Detector::builder()
//!     .set_backend(ImageprocBackend)
//!     .add_preprocessor(AdaptiveThresholdPreprocessor { block_size: 31, c: 7 })
//!     .build()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod config;
pub mod traits;
pub mod algorithms;
pub mod render;
pub mod pipeline;
pub mod io;

// Re-exports for convenience
pub use error::{AngleError, Result, VertexStage};
pub use types::{
    AngleMeasurement, AngleResult, AnnotatedFrame, Contour, FrameBuffer, Mask, Point, Polygon,
    RawFrame,
};
pub use config::DetectorConfig;
pub use traits::*;
pub use algorithms::*;
pub use render::ResultRenderer;
pub use pipeline::{Detection, Detector, Measurement, builder::DetectorBuilder};
pub use io::{DetectionReport, load_frame};

/// One-shot detection with the default configuration: the annotated frame and
/// whether an angle was found
pub fn detect(frame: &RawFrame<'_>) -> (AnnotatedFrame, bool) {
    match Detector::new(DetectorConfig::default()) {
        Ok(detector) => detector.detect(frame).into_parts(),
        Err(err) => {
            tracing::error!(error = %err, "default detector failed to build");
            (AnnotatedFrame::copy_of(frame), false)
        }
    }
}
