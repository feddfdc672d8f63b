//! Rotation and symmetric-matrix helpers for the per-face differential coordinates.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

pub type Mat3 = Matrix3<f64>;
pub type Vec3 = Vector3<f64>;

/// Exponential map of SO(3), `w` in axis-angle form.
pub fn rotation_exp(w: &Vec3) -> Mat3 {
    Rotation3::new(*w).into_inner()
}

/// Logarithm of SO(3) as an axis-angle vector with angle in [0, pi].
pub fn rotation_log(r: &Mat3) -> Vec3 {
    // Going through the quaternion keeps the axis well defined near pi, where
    // the skew part of `r` vanishes.
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*r)).scaled_axis()
}

/// Polar decomposition `d = r * exp(l)` with `r` a rotation and `l` symmetric.
///
/// Returns `None` if `d` is singular or not orientation preserving.
pub fn polar_log(d: &Mat3) -> Option<(Mat3, Mat3)> {
    let svd = d.svd(true, true);
    let (u, v_t) = (svd.u?, svd.v_t?);
    let sigma = svd.singular_values;
    if sigma.iter().any(|s| *s <= f64::EPSILON) {
        return None;
    }
    let r = u * v_t;
    if r.determinant() <= 0.0 {
        return None;
    }
    let v = v_t.transpose();
    let l = v * Mat3::from_diagonal(&sigma.map(f64::ln)) * v_t;
    Some((r, symmetrize(&l)))
}

/// `exp` of a symmetric matrix.
pub fn sym_exp(l: &Mat3) -> Mat3 {
    let eigen = l.symmetric_eigen();
    let q = eigen.eigenvectors;
    q * Mat3::from_diagonal(&eigen.eigenvalues.map(f64::exp)) * q.transpose()
}

pub fn symmetrize(m: &Mat3) -> Mat3 {
    (m + m.transpose()) * 0.5
}

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// Coordinates of a symmetric matrix in an orthonormal basis of Sym(3)
/// (Frobenius inner product).
pub fn sym_to_coords(m: &Mat3) -> [f64; 6] {
    [
        m[(0, 0)],
        m[(1, 1)],
        m[(2, 2)],
        SQRT_2 * m[(0, 1)],
        SQRT_2 * m[(0, 2)],
        SQRT_2 * m[(1, 2)],
    ]
}

pub fn coords_to_sym(c: &[f64]) -> Mat3 {
    let a = c[3] / SQRT_2;
    let b = c[4] / SQRT_2;
    let e = c[5] / SQRT_2;
    Mat3::new(c[0], a, b, a, c[1], e, b, e, c[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    fn assert_mat_eq(a: &Mat3, b: &Mat3) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert_float_eq!(*x, *y, abs <= 1e-10);
        }
    }

    #[test]
    fn rotation_round_trip() {
        for w in [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1e-9, 0.0, 0.0),
            Vec3::new(0.3, -0.2, 0.9),
            Vec3::new(0.0, 3.0, 0.0),
        ] {
            let back = rotation_log(&rotation_exp(&w));
            for (x, y) in w.iter().zip(back.iter()) {
                assert_float_eq!(*x, *y, abs <= 1e-10);
            }
        }
    }

    #[test]
    fn rotation_log_at_half_turn() {
        let r = rotation_exp(&Vec3::new(0.0, 0.0, std::f64::consts::PI));
        let w = rotation_log(&r);
        assert_float_eq!(w.norm(), std::f64::consts::PI, abs <= 1e-10);
        assert_float_eq!(w.z.abs(), std::f64::consts::PI, abs <= 1e-10);
    }

    #[test]
    fn polar_reconstructs_matrix() {
        let r = rotation_exp(&Vec3::new(0.1, 0.4, -0.3));
        let s = Mat3::new(2.0, 0.3, 0.0, 0.3, 1.0, 0.1, 0.0, 0.1, 0.5);
        let d = r * s;
        let (r2, l) = polar_log(&d).unwrap();
        assert_mat_eq(&r2, &r);
        assert_mat_eq(&sym_exp(&l), &s);
    }

    #[test]
    fn polar_rejects_reflections() {
        assert!(polar_log(&Mat3::from_diagonal(&Vec3::new(1.0, 1.0, -1.0))).is_none());
        assert!(polar_log(&Mat3::from_diagonal(&Vec3::new(1.0, 1.0, 0.0))).is_none());
    }

    #[test]
    fn sym_coords_preserve_norm() {
        let m = Mat3::new(1.0, 2.0, 3.0, 2.0, 4.0, 5.0, 3.0, 5.0, 6.0);
        let c = sym_to_coords(&m);
        let n2: f64 = c.iter().map(|x| x * x).sum();
        assert_float_eq!(n2, m.norm_squared(), rmax <= 1e-12);
        assert_mat_eq(&coords_to_sym(&c), &m);
    }
}
