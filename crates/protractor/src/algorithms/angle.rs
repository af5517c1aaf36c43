use crate::{
    error::{AngleError, Result, VertexStage},
    types::{AngleMeasurement, Point},
};

/// Direction from `from` to `to` in degrees, measured from the +x axis with
/// image y growing downwards.
pub fn bearing(from: &Point, to: &Point) -> f64 {
    f64::from(to.y - from.y)
        .atan2(f64::from(to.x - from.x))
        .to_degrees()
}

/// Measure the angle at the topmost vertex.
///
/// Vertices are stable-sorted by y; the first is the apex and the last two
/// are the ray points. The rule is exact for a clean triangle. With five or
/// more vertices the two lowest points need not be the ends of the apex's
/// edges, and the result is then not a meaningful opening angle.
///
/// The angle is `|bearing(ray1) - bearing(ray2)|` without wrapping. Both rays
/// lie on or below the apex, so it stays within [0, 180].
pub fn calculate_angle(vertices: &[Point]) -> Result<AngleMeasurement> {
    if vertices.len() < 3 {
        return Err(AngleError::InsufficientVertices {
            stage: VertexStage::VertexFilter,
            count: vertices.len(),
        });
    }

    let mut sorted = vertices.to_vec();
    sorted.sort_by_key(|p| p.y);

    let apex = sorted[0];
    let ray1 = sorted[sorted.len() - 2];
    let ray2 = sorted[sorted.len() - 1];

    let angle_degrees = (bearing(&apex, &ray1) - bearing(&apex, &ray2)).abs();

    Ok(AngleMeasurement {
        apex,
        ray1,
        ray2,
        angle_degrees,
    })
}
