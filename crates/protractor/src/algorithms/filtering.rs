use tracing::debug;

use crate::{
    config::{ApproximationConfig, VertexFilterConfig},
    error::{AngleError, Result, VertexStage},
    types::{Point, Polygon},
};

/// Drop every vertex closer than `min_distance` to a vertex already kept,
/// scanning in polygon order.
pub fn filter_vertices(points: &[Point], min_distance: f64) -> Vec<Point> {
    let mut kept: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if kept.iter().all(|k| point.distance(k) >= min_distance) {
            kept.push(*point);
        }
    }
    kept
}

/// Vertex list handed to the angle calculation.
///
/// Only polygons with exactly `trigger_count` vertices are filtered; any other
/// count passes through as produced by the simplification.
pub fn reduce_vertices(
    polygon: &Polygon,
    filter: &VertexFilterConfig,
    approximation: &ApproximationConfig,
) -> Result<Vec<Point>> {
    if polygon.len() != filter.trigger_count {
        return Ok(polygon.vertices.clone());
    }

    let kept = filter_vertices(&polygon.vertices, filter.min_distance);
    debug!(before = polygon.len(), after = kept.len(), "filtered near-duplicate vertices");

    if kept.len() < approximation.min_vertices {
        return Err(AngleError::InsufficientVertices {
            stage: VertexStage::VertexFilter,
            count: kept.len(),
        });
    }

    Ok(kept)
}
