use super::{Point2d, Rect};
use cgmath::prelude::*;

/// Computes the length of a polyline.
pub fn polyline_length(points: &[Point2d]) -> f64 {
    points
        .windows(2)
        .map(|seg| (seg[1] - seg[0]).magnitude())
        .sum()
}

/// Gets the point at distance `dist` along the polyline.
///
/// The distance is clamped to the polyline's extent. Returns `None` for an empty polyline.
pub fn sample_polyline(points: &[Point2d], dist: f64) -> Option<Point2d> {
    let first = *points.first()?;
    let mut remaining = f64::max(dist, 0.0);
    for seg in points.windows(2) {
        let delta = seg[1] - seg[0];
        let len = delta.magnitude();
        if remaining <= len {
            return Some(if len > 0.0 {
                seg[0] + delta * (remaining / len)
            } else {
                seg[0]
            });
        }
        remaining -= len;
    }
    Some(points.last().copied().unwrap_or(first))
}

/// Computes the bounding rectangle of one or more polylines.
pub fn polyline_bounds<'a>(polylines: impl IntoIterator<Item = &'a [Point2d]>) -> Option<Rect> {
    let mut points = polylines.into_iter().flatten();
    let first = *points.next()?;
    let mut rect = Rect::new(first, first);
    for point in points {
        rect.x.extend(point.x);
        rect.y.extend(point.y);
    }
    Some(rect)
}
