use crate::common::error::{QrError, QrResult};

// Point
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub(crate) struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Z component of the cross product of `self -> a` and `self -> b`.
    pub fn cross(&self, a: &Point, b: &Point) -> f64 {
        (a.x - self.x) * (b.y - self.y) - (a.y - self.y) * (b.x - self.x)
    }

    /// Cosine of the angle between `self -> a` and `self -> b`.
    pub fn cos_angle(&self, a: &Point, b: &Point) -> f64 {
        let (ux, uy) = (a.x - self.x, a.y - self.y);
        let (vx, vy) = (b.x - self.x, b.y - self.y);
        let dot = ux * vx + uy * vy;
        let mag = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
        if mag == 0.0 {
            return 1.0;
        }
        (dot / mag).clamp(-1.0, 1.0)
    }
}

// Homography
//------------------------------------------------------------------------------

/// Perspective transform from symbol module space to image space,
/// computed from 4 point correspondences.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Homography([f64; 9]);

impl Homography {
    /// Solves the 8x8 linear system mapping `src[i]` onto `dst[i]`.
    pub fn compute(src: [Point; 4], dst: [Point; 4]) -> QrResult<Self> {
        let mut m = [[0f64; 9]; 8];
        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (u, v) = (dst[i].x, dst[i].y);
            m[i * 2] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
            m[i * 2 + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
        }

        // Gaussian elimination with partial pivoting
        for col in 0..8 {
            let pivot = (col..8)
                .max_by(|&a, &b| {
                    m[a][col].abs().partial_cmp(&m[b][col].abs()).expect("Pivot is never NaN")
                })
                .expect("Rows are never empty");
            if m[pivot][col].abs() < 1e-12 {
                return Err(QrError::NotFound);
            }
            m.swap(col, pivot);

            for row in 0..8 {
                if row == col {
                    continue;
                }
                let factor = m[row][col] / m[col][col];
                for k in col..9 {
                    m[row][k] -= factor * m[col][k];
                }
            }
        }

        let mut h = [0f64; 9];
        for i in 0..8 {
            h[i] = m[i][8] / m[i][i];
        }
        h[8] = 1.0;
        Ok(Self(h))
    }

    /// Projects a module space point into image space.
    pub fn map(&self, x: f64, y: f64) -> QrResult<Point> {
        let h = &self.0;
        let w = h[6] * x + h[7] * y + h[8];
        if w.abs() < 1e-12 {
            return Err(QrError::NotFound);
        }
        Ok(Point::new(
            (h[0] * x + h[1] * y + h[2]) / w,
            (h[3] * x + h[4] * y + h[5]) / w,
        ))
    }
}

#[cfg(test)]
mod geometry_tests {
    use super::{Homography, Point};

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_dist() {
        assert_eq!(pt(0.0, 0.0).dist(&pt(3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_cross_sign() {
        let o = pt(0.0, 0.0);
        // In image coordinates (y down), a clockwise turn is positive
        assert!(o.cross(&pt(1.0, 0.0), &pt(0.0, 1.0)) > 0.0);
        assert!(o.cross(&pt(0.0, 1.0), &pt(1.0, 0.0)) < 0.0);
    }

    #[test]
    fn test_cos_angle() {
        let o = pt(1.0, 1.0);
        let cos = o.cos_angle(&pt(2.0, 1.0), &pt(1.0, 5.0));
        assert!(cos.abs() < 1e-9);
        let cos = o.cos_angle(&pt(3.0, 3.0), &pt(5.0, 5.0));
        assert!((cos - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_homography_identity() {
        let quad = [pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)];
        let h = Homography::compute(quad, quad).unwrap();
        for p in quad {
            let q = h.map(p.x, p.y).unwrap();
            assert!(p.dist(&q) < 1e-9);
        }
    }

    #[test]
    fn test_homography_scale_translate() {
        let src = [pt(0.0, 0.0), pt(21.0, 0.0), pt(21.0, 21.0), pt(0.0, 21.0)];
        let dst = [pt(40.0, 40.0), pt(250.0, 40.0), pt(250.0, 250.0), pt(40.0, 250.0)];
        let h = Homography::compute(src, dst).unwrap();
        let q = h.map(10.5, 10.5).unwrap();
        assert!(q.dist(&pt(145.0, 145.0)) < 1e-6);
    }

    #[test]
    fn test_homography_perspective() {
        // A proper perspective warp: maps the unit square onto an
        // irregular quad and back onto the corners exactly
        let src = [pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)];
        let dst = [pt(10.0, 10.0), pt(90.0, 20.0), pt(80.0, 95.0), pt(5.0, 70.0)];
        let h = Homography::compute(src, dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let q = h.map(s.x, s.y).unwrap();
            assert!(q.dist(d) < 1e-6, "Corner maps to {q:?}, expected {d:?}");
        }
        // Interior points stay inside the quad
        let mid = h.map(0.5, 0.5).unwrap();
        assert!(mid.x > 10.0 && mid.x < 90.0 && mid.y > 10.0 && mid.y < 95.0);
    }

    #[test]
    fn test_degenerate_points() {
        // Three collinear source points have no valid homography
        let src = [pt(0.0, 0.0), pt(1.0, 1.0), pt(2.0, 2.0), pt(0.0, 1.0)];
        let dst = [pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)];
        assert!(Homography::compute(src, dst).is_err());
    }
}
