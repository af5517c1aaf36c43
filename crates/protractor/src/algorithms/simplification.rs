use geo::Simplify;
use geo_types::{Coord, LineString};
use tracing::debug;

use crate::{
    config::ApproximationConfig,
    error::{AngleError, Result, VertexStage},
    traits::VisionBackend,
    types::{Contour, Point, Polygon},
};

/// Douglas-Peucker on a closed ring.
///
/// The cut points come from three farthest-point scans: from the first point
/// to `a`, from `a` to `start`, and from `start` to `end`. Each scan walks the
/// ring forward from its origin and keeps the earliest of equally distant
/// points. A ring that stays within `epsilon` of `start` collapses to that
/// single point. Otherwise both halves are simplified as open chains with
/// geo's implementation and stitched back together, starting at `start`.
pub fn simplify_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let farthest_from = |origin: usize| {
        let mut best = (origin, 0.0);
        for step in 1..n {
            let j = (origin + step) % n;
            let dist = points[origin].distance(&points[j]);
            if dist > best.1 {
                best = (j, dist);
            }
        }
        best
    };

    let (a, _) = farthest_from(0);
    let (start, _) = farthest_from(a);
    let (end, max_dist) = farthest_from(start);
    if max_dist <= epsilon || start == end {
        return vec![points[start]];
    }

    let chain = |from: usize, to: usize| {
        let mut coords: Vec<Coord<f64>> = Vec::new();
        let mut i = from;
        loop {
            coords.push(points[i].to_coord());
            if i == to {
                break;
            }
            i = (i + 1) % n;
        }
        LineString::new(coords).simplify(&epsilon)
    };

    let forward = chain(start, end);
    let backward = chain(end, start);

    let mut result: Vec<Point> = forward.coords().map(|c| Point::from_coord(*c)).collect();
    let back_len = backward.0.len();
    // Both halves share their end points
    result.extend(
        backward
            .coords()
            .skip(1)
            .take(back_len.saturating_sub(2))
            .map(|c| Point::from_coord(*c)),
    );

    result
}

/// Simplify the selected contour with a tolerance proportional to its perimeter
pub fn approximate_polygon(
    backend: &dyn VisionBackend,
    contour: &Contour,
    config: &ApproximationConfig,
) -> Result<Polygon> {
    let perimeter = contour.perimeter();
    let epsilon = config.epsilon_factor * perimeter;
    let polygon = backend.simplify_polygon(contour, epsilon)?;

    debug!(
        perimeter,
        epsilon,
        contour_points = contour.len(),
        vertices = polygon.len(),
        "simplified contour"
    );

    if polygon.len() < config.min_vertices {
        return Err(AngleError::InsufficientVertices {
            stage: VertexStage::Simplification,
            count: polygon.len(),
        });
    }

    Ok(polygon)
}
