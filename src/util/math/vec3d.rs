use num::Float;
use std::fmt::Display;
use std::ops::{Mul, Neg, Sub};

/// A 3D vector generic over floating point types.
///
/// Used for device and world frame directions. All direction-carrying values
/// in the orientation pipeline are expected to be unit length, see [`Vec3D::normalize`].
#[derive(Debug, PartialEq, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Vec3D<T> {
    /// The x-component (world frame: east).
    x: T,
    /// The y-component (world frame: magnetic north).
    y: T,
    /// The z-component (world frame: up).
    z: T,
}

impl<T: Copy> Vec3D<T> {
    /// Creates a new vector with the given components.
    pub const fn new(x: T, y: T, z: T) -> Self { Self { x, y, z } }

    /// Returns the x-component of the vector.
    pub const fn x(&self) -> T { self.x }

    /// Returns the y-component of the vector.
    pub const fn y(&self) -> T { self.y }

    /// Returns the z-component of the vector.
    pub const fn z(&self) -> T { self.z }
}

impl<T: Float> Vec3D<T> {
    /// Magnitudes below this are treated as the zero vector when normalizing.
    fn min_magnitude() -> T { T::from(1e-4).unwrap_or_else(T::epsilon) }

    /// Unit vector along the world up axis.
    pub fn unit_z() -> Self { Self::new(T::zero(), T::zero(), T::one()) }

    /// Unit vector along the world north axis.
    pub fn unit_y() -> Self { Self::new(T::zero(), T::one(), T::zero()) }

    /// Creates a zero vector.
    pub fn zero() -> Self { Self::new(T::zero(), T::zero(), T::zero()) }

    /// Computes the dot product of `self` and `other`.
    pub fn dot(&self, other: &Self) -> T { self.x * other.x + self.y * other.y + self.z * other.z }

    /// Computes the right handed cross product `self × other`.
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared euclidean length.
    pub fn abs_sq(&self) -> T { self.dot(self) }

    /// Euclidean length.
    pub fn abs(&self) -> T { self.abs_sq().sqrt() }

    /// Length of the projection onto the horizontal (x/y) plane.
    pub fn horizontal_abs(&self) -> T { self.x.hypot(self.y) }

    /// Normalizes the vector to unit length.
    ///
    /// A (near) zero vector can not be normalized, the zero vector is returned
    /// instead so that callers can detect the degenerate case through [`Vec3D::abs_sq`].
    pub fn normalize(self) -> Self {
        let magnitude = self.abs();
        if magnitude > Self::min_magnitude() {
            Self::new(self.x / magnitude, self.y / magnitude, self.z / magnitude)
        } else {
            Self::zero()
        }
    }

    /// Returns `true` if every component is finite.
    pub fn is_finite(&self) -> bool { self.x.is_finite() && self.y.is_finite() && self.z.is_finite() }
}

impl<T: Float> Neg for Vec3D<T> {
    type Output = Self;

    fn neg(self) -> Self::Output { Self::new(-self.x, -self.y, -self.z) }
}

impl<T: Float> Sub for Vec3D<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl<T: Float> Mul<T> for Vec3D<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self::Output { Self::new(self.x * rhs, self.y * rhs, self.z * rhs) }
}

impl<T: Display> Display for Vec3D<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}
