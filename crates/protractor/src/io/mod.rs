use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Result,
    pipeline::Detection,
    types::{AnnotatedFrame, FrameBuffer, Point},
};

/// Decode an image file into a tightly packed BGR frame
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<FrameBuffer> {
    let path = path.as_ref();
    let image = image::open(path)?.to_rgb8();
    debug!(path = %path.display(), width = image.width(), height = image.height(), "loaded frame");
    Ok(FrameBuffer::from_rgb_image(&image))
}

impl AnnotatedFrame {
    /// Encode to disk; the format follows the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_rgb_image()?.save(path.as_ref())?;
        Ok(())
    }
}

/// Serializable summary of one detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Where the frame came from, usually a file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub width: u32,
    pub height: u32,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle_degrees: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apex: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rays: Option<[Point; 2]>,
    pub vertex_count: usize,
}

impl DetectionReport {
    pub fn new(source: Option<String>, detection: &Detection) -> Self {
        let measurement = detection.result.measurement();
        Self {
            source,
            width: detection.frame.width(),
            height: detection.frame.height(),
            found: detection.found(),
            angle_degrees: detection.angle(),
            apex: measurement.map(|m| m.apex),
            rays: measurement.map(|m| [m.ray1, m.ray2]),
            vertex_count: detection.vertices.len(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
