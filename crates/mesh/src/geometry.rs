use cgmath::InnerSpace;

pub type Vector3 = cgmath::Vector3<f64>;

// We rely on Vector3 being repr(c) so vertex buffers can be viewed as flat f64 slices.
static_assertions::assert_eq_size!(Vector3, [f64; 3]);
static_assertions::assert_eq_align!(Vector3, f64);

/// A single triangle, stored as indices into the vertex list of its surface.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct Face {
    pub p0: u32,
    pub p1: u32,
    pub p2: u32,
}

impl Face {
    pub fn new(p0: u32, p1: u32, p2: u32) -> Self {
        Self { p0, p1, p2 }
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.p0 as usize, self.p1 as usize, self.p2 as usize]
    }
}

/// The vertices of one face, resolved against a vertex list.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Triangle {
    pub p0: Vector3,
    pub p1: Vector3,
    pub p2: Vector3,
}

impl Triangle {
    /// The two edge vectors leaving `p0`.
    pub fn edges(&self) -> (Vector3, Vector3) {
        (self.p1 - self.p0, self.p2 - self.p0)
    }

    /// Non-normalized normal; its length is twice the triangle area.
    pub fn scaled_normal(&self) -> Vector3 {
        let (u, v) = self.edges();
        u.cross(v)
    }

    pub fn area(&self) -> f64 {
        0.5 * self.scaled_normal().magnitude()
    }
}

impl std::default::Default for Triangle {
    fn default() -> Self {
        let origin = Vector3::new(0.0, 0.0, 0.0);
        Self {
            p0: origin,
            p1: origin,
            p2: origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn right_triangle_area() {
        let t = Triangle {
            p0: Vector3::new(0.0, 0.0, 0.0),
            p1: Vector3::new(2.0, 0.0, 0.0),
            p2: Vector3::new(0.0, 3.0, 0.0),
        };
        assert_float_eq!(t.area(), 3.0, abs <= 1e-12);
        assert_eq!(t.scaled_normal(), Vector3::new(0.0, 0.0, 6.0));
    }

    #[test]
    fn degenerate_triangle_has_no_area() {
        assert_eq!(Triangle::default().area(), 0.0);
    }
}
