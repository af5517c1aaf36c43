use tracing::debug;

use crate::{traits::VisionBackend, types::Contour};

/// Pick the contour with the strictly largest area.
///
/// The running maximum starts at zero, so contours enclosing no area are never
/// selected and the first contour wins any tie. Returns an empty contour when
/// nothing encloses area.
pub fn select_largest(backend: &dyn VisionBackend, contours: &[Contour]) -> Contour {
    let mut max_area = 0.0;
    let mut selected: Option<(usize, &Contour)> = None;

    for (index, contour) in contours.iter().enumerate() {
        let area = backend.compute_area(contour);
        if area > max_area {
            max_area = area;
            selected = Some((index, contour));
        }
    }

    match selected {
        Some((index, contour)) => {
            debug!(index, area = max_area, points = contour.len(), "selected main contour");
            contour.clone()
        }
        None => {
            debug!(candidates = contours.len(), "no contour encloses any area");
            Contour::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithms::ImageprocBackend, types::Point};

    fn square(x: i32, y: i32, side: i32) -> Contour {
        Contour::new(vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x + side, y + side),
            Point::new(x, y + side),
        ])
    }

    #[test]
    fn test_largest_area_wins() {
        let contours = vec![square(0, 0, 5), square(10, 10, 20), square(50, 50, 8)];
        assert_eq!(select_largest(&ImageprocBackend, &contours), contours[1]);
    }

    #[test]
    fn test_first_contour_wins_tie() {
        let contours = vec![square(0, 0, 10), square(40, 40, 10)];
        let selected = select_largest(&ImageprocBackend, &contours);
        assert_eq!(selected.points[0], Point::new(0, 0));
    }

    #[test]
    fn test_empty_set_selects_empty_contour() {
        assert!(select_largest(&ImageprocBackend, &[]).is_empty());
    }

    #[test]
    fn test_zero_area_contours_are_never_selected() {
        let line = Contour::new(vec![Point::new(0, 0), Point::new(10, 0), Point::new(20, 0)]);
        assert!(select_largest(&ImageprocBackend, &[line]).is_empty());
    }
}
