pub mod segment_3d;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Tolerance used when deciding that two registered surfaces are the same.
pub const MATCH_TOL: f64 = 1e-6;

/// Finds a unit direction perpendicular to the given unit vector.
#[must_use]
pub fn perpendicular_dir(axis: &Vector3) -> Vector3 {
    let candidate = if axis.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let perp = axis.cross(&candidate);
    perp / perp.norm()
}

/// Normalizes `v`, returning `None` for a near-zero vector.
#[must_use]
pub fn unit(v: &Vector3) -> Option<Vector3> {
    let len = v.norm();
    (len >= TOLERANCE).then(|| v / len)
}
