use super::Point2d;
use crate::util::Interval;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle.
///
/// Every test on a [Rect] is boundary-inclusive: a point lying exactly on an edge
/// is contained, and a polyline that only touches an edge intersects.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// The horizontal extent.
    pub x: Interval<f64>,
    /// The vertical extent.
    pub y: Interval<f64>,
}

impl Rect {
    /// Creates the rectangle spanned by two opposite corners.
    pub fn new(a: Point2d, b: Point2d) -> Self {
        Self {
            x: Interval::spanning(a.x, b.x),
            y: Interval::spanning(a.y, b.y),
        }
    }

    /// The lower-left corner.
    pub fn min(&self) -> Point2d {
        Point2d::new(self.x.min, self.y.min)
    }

    /// The upper-right corner.
    pub fn max(&self) -> Point2d {
        Point2d::new(self.x.max, self.y.max)
    }

    pub fn width(&self) -> f64 {
        self.x.length()
    }

    pub fn height(&self) -> f64 {
        self.y.length()
    }

    pub fn centre(&self) -> Point2d {
        Point2d::new(self.x.midpoint(), self.y.midpoint())
    }

    /// The four corners, counter-clockwise from the lower-left one.
    pub fn corners(&self) -> [Point2d; 4] {
        [
            Point2d::new(self.x.min, self.y.min),
            Point2d::new(self.x.max, self.y.min),
            Point2d::new(self.x.max, self.y.max),
            Point2d::new(self.x.min, self.y.max),
        ]
    }

    /// Returns true if the point lies inside the rectangle or on its boundary.
    pub fn contains(&self, point: Point2d) -> bool {
        self.x.contains(point.x) && self.y.contains(point.y)
    }

    /// Returns true if the two rectangles share a region of positive area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x.overlaps(&other.x) && self.y.overlaps(&other.y)
    }

    /// Returns true if the segment from `a` to `b` touches the rectangle.
    ///
    /// Uses Liang-Barsky clipping: the segment is parameterised as `a + t(b - a)`
    /// and each edge narrows the admissible range of `t`.
    pub fn intersects_segment(&self, a: Point2d, b: Point2d) -> bool {
        let d = b - a;
        let mut t = Interval::new(0.0, 1.0);
        let edges = [
            (-d.x, a.x - self.x.min),
            (d.x, self.x.max - a.x),
            (-d.y, a.y - self.y.min),
            (d.y, self.y.max - a.y),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                // Parallel to this edge, and outside of it
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t.max {
                    return false;
                }
                t.min = f64::max(t.min, r);
            } else {
                if r < t.min {
                    return false;
                }
                t.max = f64::min(t.max, r);
            }
        }
        true
    }

    /// Returns true if any part of the polyline touches the rectangle.
    pub fn intersects_polyline(&self, points: &[Point2d]) -> bool {
        match points {
            [] => false,
            [point] => self.contains(*point),
            _ => points
                .windows(2)
                .any(|seg| self.intersects_segment(seg[0], seg[1])),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Rect;
    use crate::math::Point2d;

    fn unit() -> Rect {
        Rect::new(Point2d::new(0.0, 0.0), Point2d::new(10.0, 10.0))
    }

    #[test]
    fn corners_are_normalised() {
        let rect = Rect::new(Point2d::new(10.0, 0.0), Point2d::new(0.0, 5.0));
        assert_eq!(rect.min(), Point2d::new(0.0, 0.0));
        assert_eq!(rect.max(), Point2d::new(10.0, 5.0));
    }

    #[test]
    fn boundary_points_are_contained() {
        let rect = unit();
        assert!(rect.contains(Point2d::new(0.0, 5.0)));
        assert!(rect.contains(Point2d::new(10.0, 10.0)));
        assert!(!rect.contains(Point2d::new(10.5, 10.0)));
    }

    #[test]
    fn segment_crossing_without_endpoints_inside() {
        let rect = unit();
        assert!(rect.intersects_segment(Point2d::new(-5.0, 5.0), Point2d::new(15.0, 5.0)));
        assert!(rect.intersects_segment(Point2d::new(-5.0, -5.0), Point2d::new(15.0, 15.0)));
    }

    #[test]
    fn segment_touching_an_edge() {
        let rect = unit();
        assert!(rect.intersects_segment(Point2d::new(10.0, -5.0), Point2d::new(10.0, 15.0)));
        assert!(rect.intersects_segment(Point2d::new(-5.0, 15.0), Point2d::new(5.0, 10.0)));
    }

    #[test]
    fn segment_missing_the_rectangle() {
        let rect = unit();
        assert!(!rect.intersects_segment(Point2d::new(11.0, -5.0), Point2d::new(11.0, 15.0)));
        assert!(!rect.intersects_segment(Point2d::new(-5.0, 8.0), Point2d::new(8.0, 21.0)));
    }

    #[test]
    fn polyline_intersection() {
        let rect = unit();
        let bent = [
            Point2d::new(-5.0, -5.0),
            Point2d::new(-5.0, 20.0),
            Point2d::new(5.0, 20.0),
            Point2d::new(5.0, 9.0),
        ];
        assert!(rect.intersects_polyline(&bent));
        assert!(!rect.intersects_polyline(&bent[..3]));
        assert!(rect.intersects_polyline(&[Point2d::new(1.0, 1.0)]));
        assert!(!rect.intersects_polyline(&[]));
    }
}
