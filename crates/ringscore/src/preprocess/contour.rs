//! Closed pixel boundaries traced from binary masks.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;

/// Ordered closed boundary of a foreground region.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area, positive for counter-clockwise traversal.
    pub fn signed_area(&self) -> f64 {
        self.edges()
            .map(|(p, q)| p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64)
            .sum::<f64>()
            / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Closed arc length.
    pub fn perimeter(&self) -> f64 {
        imageproc::geometry::arc_length(&self.points, true)
    }

    /// Polygon centroid from first-order moments; `None` for zero area.
    pub fn centroid(&self) -> Option<[f64; 2]> {
        let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
        for (p, q) in self.edges() {
            let (x0, y0, x1, y1) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
            let cross = x0 * y1 - x1 * y0;
            m00 += cross;
            m10 += (x0 + x1) * cross;
            m01 += (y0 + y1) * cross;
        }
        if m00.abs() < f64::EPSILON {
            return None;
        }
        // m00 holds twice the signed area.
        Some([m10 / (3.0 * m00), m01 / (3.0 * m00)])
    }

    /// Even-odd point test; points on the boundary count as inside.
    pub fn contains(&self, point: [f64; 2]) -> bool {
        let [px, py] = point;
        let mut inside = false;
        for (p, q) in self.edges() {
            let (x0, y0, x1, y1) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
            if on_segment([x0, y0], [x1, y1], point) {
                return true;
            }
            if (y0 > py) != (y1 > py) {
                let x_cross = x0 + (py - y0) * (x1 - x0) / (y1 - y0);
                if px < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Douglas-Peucker simplification of the closed boundary.
    ///
    /// The curve is split at the point farthest from its start and both
    /// halves are simplified as open polylines, so the start point is not
    /// forced to be a vertex of a straight edge twice.
    pub fn simplify(&self, epsilon: f64) -> Vec<Point<i32>> {
        let n = self.points.len();
        if n < 3 || !(epsilon > 0.0) {
            return self.points.clone();
        }
        let start = self.points[0];
        let dist2 = |p: &Point<i32>| {
            let (dx, dy) = ((p.x - start.x) as i64, (p.y - start.y) as i64);
            dx * dx + dy * dy
        };
        let split = (1..n)
            .max_by_key(|&i| dist2(&self.points[i]))
            .unwrap_or(1);
        if dist2(&self.points[split]) == 0 {
            return vec![start];
        }

        let mut closing: Vec<Point<i32>> = self.points[split..].to_vec();
        closing.push(start);
        let mut out = approximate_polygon_dp(&self.points[..=split], epsilon, false);
        let tail = approximate_polygon_dp(&closing, epsilon, false);
        out.extend(tail.into_iter().skip(1));
        out.pop();
        out
    }

    /// Boundary points as floating-point coordinates for fitting.
    pub fn to_f64(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.x as f64, p.y as f64]).collect()
    }

    fn edges(&self) -> impl Iterator<Item = (Point<i32>, Point<i32>)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }
}

fn on_segment(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> bool {
    let cross = (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0]);
    if cross.abs() > 1e-9 {
        return false;
    }
    p[0] >= a[0].min(b[0]) - 1e-9
        && p[0] <= a[0].max(b[0]) + 1e-9
        && p[1] >= a[1].min(b[1]) - 1e-9
        && p[1] <= a[1].max(b[1]) + 1e-9
}

/// Outer boundaries of top-level foreground regions (nonzero pixels).
///
/// Holes and islands nested inside holes are skipped.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// Every border at any nesting level, hole borders included.
pub fn find_all_contours(mask: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(mask)
        .into_iter()
        .map(|c| Contour::new(c.points))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    fn square(x0: i32, y0: i32, side: i32) -> Contour {
        Contour::new(vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ])
    }

    #[test]
    fn square_measures() {
        let c = square(10, 20, 10);
        assert_relative_eq!(c.area(), 100.0);
        assert_relative_eq!(c.perimeter(), 40.0);
        let [cx, cy] = c.centroid().expect("non-degenerate");
        assert_relative_eq!(cx, 15.0, epsilon = 1e-12);
        assert_relative_eq!(cy, 25.0, epsilon = 1e-12);
    }

    #[test]
    fn centroid_is_orientation_independent() {
        let mut c = square(0, 0, 8);
        c.points.reverse();
        let [cx, cy] = c.centroid().expect("non-degenerate");
        assert_relative_eq!(cx, 4.0, epsilon = 1e-12);
        assert_relative_eq!(cy, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn flat_contour_has_no_centroid() {
        let c = Contour::new(vec![Point::new(0, 0), Point::new(5, 0), Point::new(9, 0)]);
        assert!(c.centroid().is_none());
    }

    #[test]
    fn point_in_polygon_counts_boundary() {
        let c = square(0, 0, 10);
        assert!(c.contains([5.0, 5.0]));
        assert!(c.contains([0.0, 3.0]));
        assert!(c.contains([10.0, 10.0]));
        assert!(!c.contains([10.5, 5.0]));
        assert!(!c.contains([-1.0, -1.0]));
    }

    #[test]
    fn external_contours_skip_holes_and_islands() {
        // Ring with a separate blob inside its hole.
        let mask = GrayImage::from_fn(60, 60, |x, y| {
            let d = ((x as f64 - 30.0).powi(2) + (y as f64 - 30.0).powi(2)).sqrt();
            Luma([if (15.0..=25.0).contains(&d) || d <= 5.0 { 255 } else { 0 }])
        });
        let ext = find_external_contours(&mask);
        assert_eq!(ext.len(), 1);
        assert!(ext[0].area() > 1500.0);

        // Ring outer border, ring hole border and the island.
        let all = find_all_contours(&mask);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn simplify_reduces_rectangle_to_corners() {
        let mut points = Vec::new();
        for x in 10..50 {
            points.push(Point::new(x, 5));
        }
        for y in 5..30 {
            points.push(Point::new(50, y));
        }
        for x in (11..=50).rev() {
            points.push(Point::new(x, 30));
        }
        for y in (6..=30).rev() {
            points.push(Point::new(10, y));
        }
        let c = Contour::new(points);
        let quad = c.simplify(0.03 * c.perimeter());
        assert_eq!(quad.len(), 4);
        for corner in [(10, 5), (50, 5), (50, 30), (10, 30)] {
            assert!(quad.contains(&Point::new(corner.0, corner.1)), "{quad:?}");
        }
    }

    #[test]
    fn uniform_mask_has_no_contours() {
        assert!(find_external_contours(&GrayImage::new(32, 32)).is_empty());
    }
}
