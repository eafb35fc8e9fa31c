use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use bytemuck::{Pod, Zeroable};

/// Position or direction as stored by the host
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dist_square(&self, other: &Vector) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn dist(&self, other: &Vector) -> f32 {
        self.dist_square(other).sqrt()
    }

    /// Rotate by a host rotation matrix (row-major)
    pub fn rotate(&self, rot: &RotMatrix) -> Vector {
        Vector {
            x: rot.x1 * self.x + rot.y1 * self.y + rot.z1 * self.z,
            y: rot.x2 * self.x + rot.y2 * self.y + rot.z2 * self.z,
            z: rot.x3 * self.x + rot.y3 * self.y + rot.z3 * self.z,
        }
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, other: Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Vector {
    type Output = Vector;

    fn mul(self, scalar: f32) -> Vector {
        Vector::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f32> for Vector {
    type Output = Vector;

    fn div(self, scalar: f32) -> Vector {
        Vector::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

/// 3x3 rotation matrix in the host's row-major field order
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RotMatrix {
    pub x1: f32,
    pub y1: f32,
    pub z1: f32,
    pub x2: f32,
    pub y2: f32,
    pub z2: f32,
    pub x3: f32,
    pub y3: f32,
    pub z3: f32,
}

impl RotMatrix {
    pub const IDENTITY: RotMatrix = RotMatrix::from_rows([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);

    pub const fn from_rows(r1: [f32; 3], r2: [f32; 3], r3: [f32; 3]) -> Self {
        Self {
            x1: r1[0],
            y1: r1[1],
            z1: r1[2],
            x2: r2[0],
            y2: r2[1],
            z2: r2[2],
            x3: r3[0],
            y3: r3[1],
            z3: r3[2],
        }
    }
}

impl Default for RotMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for RotMatrix {
    type Output = RotMatrix;

    fn mul(self, o: RotMatrix) -> RotMatrix {
        let a = self;
        RotMatrix {
            x1: a.x1 * o.x1 + a.y1 * o.x2 + a.z1 * o.x3,
            y1: a.x1 * o.y1 + a.y1 * o.y2 + a.z1 * o.y3,
            z1: a.x1 * o.z1 + a.y1 * o.z2 + a.z1 * o.z3,

            x2: a.x2 * o.x1 + a.y2 * o.x2 + a.z2 * o.x3,
            y2: a.x2 * o.y1 + a.y2 * o.y2 + a.z2 * o.y3,
            z2: a.x2 * o.z1 + a.y2 * o.z2 + a.z2 * o.z3,

            x3: a.x3 * o.x1 + a.y3 * o.x2 + a.z3 * o.x3,
            y3: a.x3 * o.y1 + a.y3 * o.y2 + a.z3 * o.y3,
            z3: a.x3 * o.z1 + a.y3 * o.z2 + a.z3 * o.z3,
        }
    }
}

impl fmt::Display for RotMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RotMatrix({:.6}, {:.6}, {:.6}, {:.6}, {:.6}, {:.6}, {:.6}, {:.6}, {:.6})",
            self.x1, self.y1, self.z1, self.x2, self.y2, self.z2, self.x3, self.y3, self.z3
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_arithmetic() {
        let a = Vector::new(1.0, 2.0, 3.0);
        let b = Vector::new(0.5, -1.0, 2.0);
        assert_eq!(a + b, Vector::new(1.5, 1.0, 5.0));
        assert_eq!(a - b, Vector::new(0.5, 3.0, 1.0));
        assert_eq!(a * 2.0, Vector::new(2.0, 4.0, 6.0));
        assert_eq!(a / 2.0, Vector::new(0.5, 1.0, 1.5));
        assert_eq!(-a, Vector::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_vector_distance() {
        let a = Vector::new(0.0, 0.0, 0.0);
        let b = Vector::new(3.0, 4.0, 0.0);
        assert_eq!(a.dist_square(&b), 25.0);
        assert_eq!(a.dist(&b), 5.0);
    }

    #[test]
    fn test_rotate_by_identity_is_noop() {
        let v = Vector::new(1.0, -2.0, 3.5);
        assert_eq!(v.rotate(&RotMatrix::IDENTITY), v);
    }

    #[test]
    fn test_rotate_quarter_turn_about_y() {
        let rot = RotMatrix::from_rows([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]);
        let v = Vector::new(1.0, 0.0, 0.0);
        assert_eq!(v.rotate(&rot), Vector::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_matrix_compose_with_identity() {
        let rot = RotMatrix::from_rows([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        assert_eq!(rot * RotMatrix::IDENTITY, rot);
        assert_eq!(RotMatrix::IDENTITY * rot, rot);
    }

    #[test]
    fn test_matrix_compose_twice_is_half_turn() {
        let quarter = RotMatrix::from_rows([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let half = quarter * quarter;
        assert_eq!(
            half,
            RotMatrix::from_rows([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Vector::new(1.0, 2.0, 3.0).to_string(),
            "Vector(1.000000, 2.000000, 3.000000)"
        );
    }
}
