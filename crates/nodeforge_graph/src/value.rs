// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scalar/vector values and arithmetic with numeric promotion.
//!
//! Every binary operation runs in a common [`ValueKind`]: the heavier of the
//! two operand kinds (`Int < Float < Vector2 < Vector3 < Vector4`). Both
//! operands are cast to that kind first:
//!
//! - scalar to vector broadcasts the scalar into every component
//! - vector to scalar keeps only `x`
//! - vector to a wider vector zero-fills, to a narrower one truncates
//!
//! Vector multiplication and division always scale by the right operand's
//! scalar cast, so `Vector3 * Vector3` is `a * b.x`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// Magnitude below which normalizing yields the zero vector
const NORMALIZE_EPSILON: f32 = 1e-5;

/// Kind of a [`Value`], ordered by promotion weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// 32-bit integer
    Int,
    /// Single precision float
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
}

impl ValueKind {
    /// Promotion weight (0 for `Int` up to 4 for `Vector4`)
    pub fn weight(self) -> u8 {
        match self {
            Self::Int => 0,
            Self::Float => 1,
            Self::Vector2 => 2,
            Self::Vector3 => 3,
            Self::Vector4 => 4,
        }
    }

    /// Kind for a promotion weight; anything above 4 saturates to `Vector4`
    pub fn from_weight(weight: u8) -> Self {
        match weight {
            0 => Self::Int,
            1 => Self::Float,
            2 => Self::Vector2,
            3 => Self::Vector3,
            _ => Self::Vector4,
        }
    }

    /// Common kind of two operands
    pub fn promote(self, other: Self) -> Self {
        self.max(other)
    }

    /// Number of float components (1 for scalars)
    pub fn components(self) -> usize {
        match self {
            Self::Int | Self::Float => 1,
            Self::Vector2 => 2,
            Self::Vector3 => 3,
            Self::Vector4 => 4,
        }
    }

    /// Whether this is one of the vector kinds
    pub fn is_vector(self) -> bool {
        self >= Self::Vector2
    }

    /// Display name, also used as the label of an operator's primary output
    pub fn label(self) -> &'static str {
        match self {
            Self::Int => "Integer",
            Self::Float => "Float",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::Vector4 => "Vector4",
        }
    }
}

/// Arithmetic failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// Integer division with a zero divisor
    #[error("Integer division by zero")]
    DivideByZero,
}

/// A value flowing through digit points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
}

impl Default for Value {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl Value {
    /// Kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Vector2(_) => ValueKind::Vector2,
            Self::Vector3(_) => ValueKind::Vector3,
            Self::Vector4(_) => ValueKind::Vector4,
        }
    }

    /// Zero of the given kind
    pub fn zero(kind: ValueKind) -> Self {
        Self::Int(0).cast(kind)
    }

    /// Build a value of `kind` from up to four components
    pub fn from_components(components: [f32; 4], kind: ValueKind) -> Self {
        let [x, y, z, w] = components;
        match kind {
            ValueKind::Int => Self::Float(x).cast(ValueKind::Int),
            ValueKind::Float => Self::Float(x),
            ValueKind::Vector2 => Self::Vector2([x, y]),
            ValueKind::Vector3 => Self::Vector3([x, y, z]),
            ValueKind::Vector4 => Self::Vector4([x, y, z, w]),
        }
    }

    /// Integer cast; floats round half to even, vectors truncate `x`
    pub fn to_int(&self) -> i32 {
        match *self {
            Self::Int(v) => v,
            Self::Float(v) => v.round_ties_even() as i32,
            Self::Vector2([x, ..]) | Self::Vector3([x, ..]) | Self::Vector4([x, ..]) => x as i32,
        }
    }

    /// Float cast; vectors yield `x`
    pub fn to_float(&self) -> f32 {
        match *self {
            Self::Int(v) => v as f32,
            Self::Float(v) => v,
            Self::Vector2([x, ..]) | Self::Vector3([x, ..]) | Self::Vector4([x, ..]) => x,
        }
    }

    /// All four components, zero-filled (scalars broadcast)
    pub fn to_vector4(&self) -> [f32; 4] {
        match *self {
            Self::Int(_) | Self::Float(_) => [self.to_float(); 4],
            Self::Vector2([x, y]) => [x, y, 0.0, 0.0],
            Self::Vector3([x, y, z]) => [x, y, z, 0.0],
            Self::Vector4(v) => v,
        }
    }

    /// 2D cast
    pub fn to_vector2(&self) -> [f32; 2] {
        let [x, y, ..] = self.to_vector4();
        [x, y]
    }

    /// 3D cast
    pub fn to_vector3(&self) -> [f32; 3] {
        let [x, y, z, _] = self.to_vector4();
        [x, y, z]
    }

    /// Component `index` of the value cast to `Vector4`
    pub fn component(&self, index: usize) -> f32 {
        self.to_vector4().get(index).copied().unwrap_or(0.0)
    }

    /// Cast to another kind
    pub fn cast(self, kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int => Self::Int(self.to_int()),
            ValueKind::Float => Self::Float(self.to_float()),
            ValueKind::Vector2 => Self::Vector2(self.to_vector2()),
            ValueKind::Vector3 => Self::Vector3(self.to_vector3()),
            ValueKind::Vector4 => Self::Vector4(self.to_vector4()),
        }
    }

    /// Addition with both operands cast to `kind`
    pub fn add_as(self, rhs: Self, kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int => Self::Int(self.to_int().wrapping_add(rhs.to_int())),
            _ => zip_components(self, rhs, kind, |a, b| a + b),
        }
    }

    /// Subtraction with both operands cast to `kind`
    pub fn sub_as(self, rhs: Self, kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int => Self::Int(self.to_int().wrapping_sub(rhs.to_int())),
            _ => zip_components(self, rhs, kind, |a, b| a - b),
        }
    }

    /// Multiplication in `kind`; vectors are scaled by `rhs` as a float
    pub fn mul_as(self, rhs: Self, kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int => Self::Int(self.to_int().wrapping_mul(rhs.to_int())),
            _ => {
                let scale = rhs.to_float();
                map_components(self, kind, |a| a * scale)
            }
        }
    }

    /// Division in `kind`; vectors are divided by `rhs` as a float
    pub fn div_as(self, rhs: Self, kind: ValueKind) -> Result<Self, ValueError> {
        match kind {
            ValueKind::Int => {
                let divisor = rhs.to_int();
                if divisor == 0 {
                    return Err(ValueError::DivideByZero);
                }
                Ok(Self::Int(self.to_int().wrapping_div(divisor)))
            }
            _ => {
                let divisor = rhs.to_float();
                Ok(map_components(self, kind, |a| a / divisor))
            }
        }
    }

    /// Euclidean length; scalars are measured as a broadcast `Vector2`
    pub fn magnitude(&self) -> f32 {
        let kind = self.kind().max(ValueKind::Vector2);
        let v = self.to_vector4();
        v[..kind.components()].iter().map(|c| c * c).sum::<f32>().sqrt()
    }

    /// Unit vector in the same direction.
    ///
    /// `Int` and `Float` are normalized as a broadcast `Vector2`, so
    /// `Float(3.0).normalized()` is `Vector2([0.7071, 0.7071])`. Magnitudes
    /// at or below `1e-5` produce the zero vector.
    pub fn normalized(self) -> Self {
        let kind = self.kind().max(ValueKind::Vector2);
        let vector = self.cast(kind);
        let magnitude = vector.magnitude();
        if magnitude > NORMALIZE_EPSILON {
            map_components(vector, kind, |c| c / magnitude)
        } else {
            Self::zero(kind)
        }
    }

    /// Distance between two values, both cast to `Vector3`
    pub fn distance(self, other: Self) -> f32 {
        let a = self.to_vector3();
        let b = other.to_vector3();
        Self::Vector3([a[0] - b[0], a[1] - b[1], a[2] - b[2]]).magnitude()
    }
}

/// Apply `f` to every component of `value` cast to `kind` (a float kind)
fn map_components(value: Value, kind: ValueKind, f: impl Fn(f32) -> f32) -> Value {
    let mut v = value.cast(kind).to_vector4();
    for c in &mut v[..kind.components()] {
        *c = f(*c);
    }
    Value::from_components(v, kind)
}

/// Combine two values component-wise in `kind` (a float kind)
fn zip_components(a: Value, b: Value, kind: ValueKind, f: impl Fn(f32, f32) -> f32) -> Value {
    let mut lhs = a.cast(kind).to_vector4();
    let rhs = b.cast(kind).to_vector4();
    for (l, r) in lhs[..kind.components()].iter_mut().zip(rhs) {
        *l = f(*l, r);
    }
    Value::from_components(lhs, kind)
}

/// Highest kind among the given kinds, `Int` when empty
pub fn widest_kind(kinds: impl IntoIterator<Item = ValueKind>) -> ValueKind {
    kinds.into_iter().fold(ValueKind::Int, ValueKind::promote)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Vector2([x, y]) => write!(f, "({x}, {y})"),
            Self::Vector3([x, y, z]) => write!(f, "({x}, {y}, {z})"),
            Self::Vector4([x, y, z, w]) => write!(f, "({x}, {y}, {z}, {w})"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl Add for Value {
    type Output = Self;

    /// `self + rhs` in the promoted kind
    fn add(self, rhs: Self) -> Self {
        self.add_as(rhs, self.kind().promote(rhs.kind()))
    }
}

impl Sub for Value {
    type Output = Self;

    /// `self - rhs` in the promoted kind
    fn sub(self, rhs: Self) -> Self {
        self.sub_as(rhs, self.kind().promote(rhs.kind()))
    }
}

impl Mul for Value {
    type Output = Self;

    /// `self * rhs` in the promoted kind
    fn mul(self, rhs: Self) -> Self {
        self.mul_as(rhs, self.kind().promote(rhs.kind()))
    }
}

impl Div for Value {
    type Output = Result<Self, ValueError>;

    /// `self / rhs` in the promoted kind; integer division by zero fails
    fn div(self, rhs: Self) -> Result<Self, ValueError> {
        self.div_as(rhs, self.kind().promote(rhs.kind()))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_examples() {
        assert_eq!(Value::Int(2) + Value::Float(1.5), Value::Float(3.5));
        assert_eq!(
            Value::Vector2([1.0, 1.0]) + Value::Float(2.0),
            Value::Vector2([3.0, 3.0])
        );
        assert_eq!(Value::Float(1.5) + Value::Int(2), Value::Float(3.5));
    }

    #[test]
    fn test_casts() {
        assert_eq!(Value::Float(2.5).cast(ValueKind::Vector3), Value::Vector3([2.5; 3]));
        assert_eq!(Value::Vector3([1.0, 2.0, 3.0]).cast(ValueKind::Float), Value::Float(1.0));
        assert_eq!(
            Value::Vector2([1.0, 2.0]).cast(ValueKind::Vector4),
            Value::Vector4([1.0, 2.0, 0.0, 0.0])
        );
        assert_eq!(
            Value::Vector4([1.0, 2.0, 3.0, 4.0]).cast(ValueKind::Vector2),
            Value::Vector2([1.0, 2.0])
        );
        assert_eq!(Value::Vector2([-2.7, 9.0]).cast(ValueKind::Int), Value::Int(-2));
        assert_eq!(Value::Float(2.5).cast(ValueKind::Int), Value::Int(2));
        assert_eq!(Value::Float(3.5).cast(ValueKind::Int), Value::Int(4));
    }

    #[test]
    fn test_vector_multiply_uses_scalar_of_rhs() {
        let a = Value::Vector3([1.0, 2.0, 3.0]);
        let b = Value::Vector3([2.0, 10.0, 10.0]);
        assert_eq!(a * b, Value::Vector3([2.0, 4.0, 6.0]));
        assert_eq!(Value::Int(3) * Value::Int(4), Value::Int(12));
    }

    #[test]
    fn test_divide() {
        assert_eq!(Value::Int(7) / Value::Int(2), Ok(Value::Int(3)));
        assert_eq!(Value::Int(7) / Value::Int(0), Err(ValueError::DivideByZero));
        assert_eq!(
            Value::Vector2([2.0, 4.0]) / Value::Float(2.0),
            Ok(Value::Vector2([1.0, 2.0]))
        );
        let Ok(Value::Float(v)) = Value::Float(1.0) / Value::Float(0.0) else {
            panic!("float division should not fail");
        };
        assert!(v.is_infinite());
    }

    #[test]
    fn test_int_overflow_wraps() {
        assert_eq!(Value::Int(i32::MAX) + Value::Int(1), Value::Int(i32::MIN));
        assert_eq!(Value::Int(i32::MIN) - Value::Int(1), Value::Int(i32::MAX));
    }

    #[test]
    fn test_subtract_promotes() {
        assert_eq!(Value::Int(10) - Value::Float(2.5), Value::Float(7.5));
        assert_eq!(
            Value::Vector2([3.0, 4.0]) - Value::Int(1),
            Value::Vector2([2.0, 3.0])
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            Value::Vector3([3.0, 0.0, 4.0]).normalized(),
            Value::Vector3([0.6, 0.0, 0.8])
        );
        let Value::Vector2([x, y]) = Value::Float(3.0).normalized() else {
            panic!("scalars normalize as Vector2");
        };
        assert!((x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(x, y);
        assert_eq!(Value::Vector4([0.0; 4]).normalized(), Value::Vector4([0.0; 4]));
    }

    #[test]
    fn test_distance() {
        let d = Value::Vector3([1.0, 1.0, 1.0]).distance(Value::Vector2([4.0, 5.0]));
        assert!((d - (9.0f32 + 16.0 + 1.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_widest_kind() {
        assert_eq!(widest_kind([]), ValueKind::Int);
        assert_eq!(
            widest_kind([ValueKind::Vector2, ValueKind::Float, ValueKind::Vector3]),
            ValueKind::Vector3
        );
        assert_eq!(ValueKind::from_weight(ValueKind::Vector2.weight()), ValueKind::Vector2);
    }
}
