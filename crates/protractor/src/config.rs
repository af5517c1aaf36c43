//! Read-only tuning constants for the detection pipeline.
//!
//! Defaults reproduce the values the bench was calibrated with. All sections
//! deserialize with `#[serde(default)]`, so a config file only needs to name
//! the values it overrides.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{AngleError, Result};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DetectorConfig {
    pub preprocess: PreprocessConfig,
    pub edges: EdgeConfig,
    pub approximation: ApproximationConfig,
    pub vertex_filter: VertexFilterConfig,
    pub render: RenderConfig,
}

/// Smoothing and adaptive binarization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side of the square Gaussian kernel, odd
    pub blur_kernel_size: u32,
    pub blur_sigma: f32,
    /// Side of the local-mean neighbourhood, odd
    pub threshold_block_size: u32,
    /// Subtracted from the local mean before comparing
    pub threshold_offset: i32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: 5,
            blur_sigma: 1.5,
            threshold_block_size: 21,
            threshold_offset: 5,
        }
    }
}

/// Canny hysteresis thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EdgeConfig {
    pub low_threshold: f32,
    /// High threshold = low threshold × ratio
    pub high_ratio: f32,
}

impl EdgeConfig {
    pub fn high_threshold(&self) -> f32 {
        self.low_threshold * self.high_ratio
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            low_threshold: 50.0,
            high_ratio: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ApproximationConfig {
    /// Simplification tolerance as a fraction of the contour perimeter
    pub epsilon_factor: f64,
    pub min_vertices: usize,
}

impl Default for ApproximationConfig {
    fn default() -> Self {
        Self {
            epsilon_factor: 0.02,
            min_vertices: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VertexFilterConfig {
    /// The filter only runs on polygons with exactly this many vertices
    pub trigger_count: usize,
    /// Pixels; closer vertices are dropped
    pub min_distance: f64,
}

impl Default for VertexFilterConfig {
    fn default() -> Self {
        Self {
            trigger_count: 4,
            min_distance: 20.0,
        }
    }
}

/// Overlay styling. Colors are B, G, R like the frame itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RenderConfig {
    pub contour_color: [u8; 3],
    pub contour_thickness: u32,
    pub vertex_color: [u8; 3],
    pub vertex_radius: i32,
    pub label_color: [u8; 3],
    /// Left end of the label baseline
    pub label_origin: [i32; 2],
    pub label_scale: f32,
    pub label_thickness: u32,
    pub label_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            contour_color: [0, 255, 0],
            contour_thickness: 2,
            vertex_color: [0, 0, 255],
            vertex_radius: 5,
            label_color: [255, 0, 0],
            label_origin: [20, 50],
            label_scale: 1.5,
            label_thickness: 3,
            label_prefix: "Angle: ".to_string(),
        }
    }
}

impl DetectorConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let pre = &self.preprocess;
        if pre.blur_kernel_size == 0 || pre.blur_kernel_size % 2 == 0 {
            return Err(invalid(format!(
                "blur_kernel_size must be odd, got {}",
                pre.blur_kernel_size
            )));
        }
        if !(pre.blur_sigma > 0.0) {
            return Err(invalid(format!("blur_sigma must be positive, got {}", pre.blur_sigma)));
        }
        if pre.threshold_block_size < 3 || pre.threshold_block_size % 2 == 0 {
            return Err(invalid(format!(
                "threshold_block_size must be odd and at least 3, got {}",
                pre.threshold_block_size
            )));
        }
        if !(self.edges.low_threshold >= 0.0) || !(self.edges.high_ratio >= 1.0) {
            return Err(invalid(format!(
                "edge thresholds must satisfy low >= 0 and ratio >= 1, got {} and {}",
                self.edges.low_threshold, self.edges.high_ratio
            )));
        }
        if !(self.approximation.epsilon_factor > 0.0) {
            return Err(invalid(format!(
                "epsilon_factor must be positive, got {}",
                self.approximation.epsilon_factor
            )));
        }
        if self.approximation.min_vertices < 3 {
            return Err(invalid(format!(
                "min_vertices must be at least 3, got {}",
                self.approximation.min_vertices
            )));
        }
        if !(self.vertex_filter.min_distance >= 0.0) {
            return Err(invalid(format!(
                "min_distance must not be negative, got {}",
                self.vertex_filter.min_distance
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> AngleError {
    AngleError::InvalidConfig(message)
}
