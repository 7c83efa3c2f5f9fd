use super::{Point3, TOLERANCE};

/// Shortest distance between segments `[a0, a1]` and `[b0, b1]`.
///
/// Clamped closest-approach of the two supporting lines; parallel segments
/// fall back to the endpoint projections.
#[must_use]
pub fn segment_segment_distance(a0: &Point3, a1: &Point3, b0: &Point3, b1: &Point3) -> f64 {
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    let r = a0 - b0;
    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);

    let (s, t) = if a < TOLERANCE && e < TOLERANCE {
        (0.0, 0.0)
    } else if a < TOLERANCE {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e < TOLERANCE {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > TOLERANCE {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    let pa = a0 + d1 * s;
    let pb = b0 + d2 * t;
    (pa - pb).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn parallel_segments() {
        let d = segment_segment_distance(
            &p(0.0, 0.0, 0.0),
            &p(10.0, 0.0, 0.0),
            &p(0.0, 6.0, 0.0),
            &p(10.0, 6.0, 0.0),
        );
        assert!((d - 6.0).abs() < 1e-9);
    }

    #[test]
    fn crossing_segments() {
        let d = segment_segment_distance(
            &p(-1.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, -1.0, 2.0),
            &p(0.0, 1.0, 2.0),
        );
        assert!((d - 2.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_collinear_segments() {
        let d = segment_segment_distance(
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(4.0, 0.0, 0.0),
            &p(5.0, 0.0, 0.0),
        );
        assert!((d - 3.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_point_segments() {
        let d = segment_segment_distance(
            &p(0.0, 0.0, 0.0),
            &p(0.0, 0.0, 0.0),
            &p(0.0, 3.0, 4.0),
            &p(0.0, 3.0, 4.0),
        );
        assert!((d - 5.0).abs() < 1e-9);
    }
}
