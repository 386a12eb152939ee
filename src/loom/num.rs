use std::{
    fmt::{self, Debug},
    str::FromStr,
};

use bytemuck::Pod;
use derive_more::Display;
use half::f16;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataType {
    #[display("i8")]
    I8,
    #[display("i16")]
    I16,
    #[display("i32")]
    I32,
    #[display("i64")]
    I64,
    #[display("u8")]
    U8,
    #[display("u16")]
    U16,
    #[display("u32")]
    U32,
    #[display("u64")]
    U64,
    #[display("f16")]
    F16,
    #[display("f32")]
    F32,
    #[display("f64")]
    F64,
}

impl DataType {
    pub const ALL: [DataType; 11] = [
        DataType::I8,
        DataType::I16,
        DataType::I32,
        DataType::I64,
        DataType::U8,
        DataType::U16,
        DataType::U32,
        DataType::U64,
        DataType::F16,
        DataType::F32,
        DataType::F64,
    ];

    /// Returns the size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            DataType::I8 | DataType::U8 => 1,
            DataType::I16 | DataType::U16 | DataType::F16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::I64 | DataType::U64 | DataType::F64 => 8,
        }
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, DataType::F16 | DataType::F32 | DataType::F64)
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown data type `{0}`")]
pub struct DataTypeError(pub String);

impl FromStr for DataType {
    type Err = DataTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|r#type| r#type.to_string() == s)
            .ok_or_else(|| DataTypeError(s.to_owned()))
    }
}

pub trait Zero {
    fn zero() -> Self;
}

pub trait One {
    fn one() -> Self;
}

macro_rules! impl_zero_one {
    ($($ty:ty),+ => $zero:expr, $one:expr) => {
        $(
            impl Zero for $ty {
                #[inline]
                fn zero() -> Self {
                    $zero
                }
            }

            impl One for $ty {
                #[inline]
                fn one() -> Self {
                    $one
                }
            }
        )+
    };
}

impl_zero_one!(i8, i16, i32, i64, u8, u16, u32, u64 => 0, 1);
impl_zero_one!(f32, f64 => 0.0, 1.0);
impl_zero_one!(f16 => f16::ZERO, f16::ONE);

pub trait Scalar:
    Sized
    + Pod
    + Zero
    + One
    + PartialEq
    + PartialOrd
    + Debug
    + fmt::Display
    + Send
    + Sync
    + sealed::Sealed
{
    const DATA_TYPE: DataType;
}

macro_rules! impl_scalar {
    ($($ty:ty => $data_type:ident),+ $(,)?) => {
        $(
            impl Scalar for $ty {
                const DATA_TYPE: DataType = DataType::$data_type;
            }
        )+
    };
}

impl_scalar!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f16 => F16,
    f32 => F32,
    f64 => F64,
);

/// Native arithmetic of an element type.
///
/// Integer operations wrap on overflow. Integer division by zero has no result:
/// kernels check every divisor with [`Arithmetic::is_zero_divisor`] before dividing.
pub trait Arithmetic: Scalar {
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    fn abs(self) -> Self;
    fn min(self, rhs: Self) -> Self;
    fn max(self, rhs: Self) -> Self;
    /// Returns `true` if dividing by `self` is not defined for this type.
    fn is_zero_divisor(self) -> bool;
}

macro_rules! impl_arithmetic_signed {
    ($($ty:ty),+) => {
        $(
            impl Arithmetic for $ty {
                #[inline]
                fn add(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }
                #[inline]
                fn sub(self, rhs: Self) -> Self {
                    self.wrapping_sub(rhs)
                }
                #[inline]
                fn mul(self, rhs: Self) -> Self {
                    self.wrapping_mul(rhs)
                }
                #[inline]
                fn div(self, rhs: Self) -> Self {
                    self.wrapping_div(rhs)
                }
                #[inline]
                fn abs(self) -> Self {
                    self.wrapping_abs()
                }
                #[inline]
                fn min(self, rhs: Self) -> Self {
                    Ord::min(self, rhs)
                }
                #[inline]
                fn max(self, rhs: Self) -> Self {
                    Ord::max(self, rhs)
                }
                #[inline]
                fn is_zero_divisor(self) -> bool {
                    self == 0
                }
            }
        )+
    };
}

macro_rules! impl_arithmetic_unsigned {
    ($($ty:ty),+) => {
        $(
            impl Arithmetic for $ty {
                #[inline]
                fn add(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }
                #[inline]
                fn sub(self, rhs: Self) -> Self {
                    self.wrapping_sub(rhs)
                }
                #[inline]
                fn mul(self, rhs: Self) -> Self {
                    self.wrapping_mul(rhs)
                }
                #[inline]
                fn div(self, rhs: Self) -> Self {
                    self.wrapping_div(rhs)
                }
                #[inline]
                fn abs(self) -> Self {
                    self
                }
                #[inline]
                fn min(self, rhs: Self) -> Self {
                    Ord::min(self, rhs)
                }
                #[inline]
                fn max(self, rhs: Self) -> Self {
                    Ord::max(self, rhs)
                }
                #[inline]
                fn is_zero_divisor(self) -> bool {
                    self == 0
                }
            }
        )+
    };
}

macro_rules! impl_arithmetic_float {
    ($($ty:ty),+) => {
        $(
            impl Arithmetic for $ty {
                #[inline]
                fn add(self, rhs: Self) -> Self {
                    self + rhs
                }
                #[inline]
                fn sub(self, rhs: Self) -> Self {
                    self - rhs
                }
                #[inline]
                fn mul(self, rhs: Self) -> Self {
                    self * rhs
                }
                #[inline]
                fn div(self, rhs: Self) -> Self {
                    self / rhs
                }
                #[inline]
                fn abs(self) -> Self {
                    <$ty>::abs(self)
                }
                #[inline]
                fn min(self, rhs: Self) -> Self {
                    <$ty>::min(self, rhs)
                }
                #[inline]
                fn max(self, rhs: Self) -> Self {
                    <$ty>::max(self, rhs)
                }
                #[inline]
                fn is_zero_divisor(self) -> bool {
                    false
                }
            }
        )+
    };
}

impl_arithmetic_signed!(i8, i16, i32, i64);
impl_arithmetic_unsigned!(u8, u16, u32, u64);
impl_arithmetic_float!(f32, f64);

impl Arithmetic for f16 {
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self - rhs
    }
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self * rhs
    }
    #[inline]
    fn div(self, rhs: Self) -> Self {
        self / rhs
    }
    #[inline]
    fn abs(self) -> Self {
        f16::from_bits(self.to_bits() & 0x7fff)
    }
    #[inline]
    fn min(self, rhs: Self) -> Self {
        f16::min(self, rhs)
    }
    #[inline]
    fn max(self, rhs: Self) -> Self {
        f16::max(self, rhs)
    }
    #[inline]
    fn is_zero_divisor(self) -> bool {
        false
    }
}

/// Bitwise operations of integer element types.
///
/// Shift amounts are taken modulo the bit width of the type.
pub trait Integer: Arithmetic {
    fn not(self) -> Self;
    fn and(self, rhs: Self) -> Self;
    fn or(self, rhs: Self) -> Self;
    fn xor(self, rhs: Self) -> Self;
    fn shl(self, rhs: Self) -> Self;
    fn shr(self, rhs: Self) -> Self;
}

macro_rules! impl_integer {
    ($($ty:ty),+) => {
        $(
            impl Integer for $ty {
                #[inline]
                fn not(self) -> Self {
                    !self
                }
                #[inline]
                fn and(self, rhs: Self) -> Self {
                    self & rhs
                }
                #[inline]
                fn or(self, rhs: Self) -> Self {
                    self | rhs
                }
                #[inline]
                fn xor(self, rhs: Self) -> Self {
                    self ^ rhs
                }
                #[inline]
                fn shl(self, rhs: Self) -> Self {
                    self.wrapping_shl(rhs as u32)
                }
                #[inline]
                fn shr(self, rhs: Self) -> Self {
                    self.wrapping_shr(rhs as u32)
                }
            }
        )+
    };
}

impl_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

/// Transcendental and rounding functions of floating point element types.
pub trait Float: Arithmetic {
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn rsqrt(self) -> Self;
    fn cos(self) -> Self;
    fn sin(self) -> Self;
    fn tanh(self) -> Self;
    fn floor(self) -> Self;
    fn ceil(self) -> Self;
    fn atan2(self, rhs: Self) -> Self;
}

macro_rules! impl_float {
    ($($ty:ty),+) => {
        $(
            impl Float for $ty {
                #[inline]
                fn exp(self) -> Self {
                    <$ty>::exp(self)
                }
                #[inline]
                fn ln(self) -> Self {
                    <$ty>::ln(self)
                }
                #[inline]
                fn rsqrt(self) -> Self {
                    1.0 / <$ty>::sqrt(self)
                }
                #[inline]
                fn cos(self) -> Self {
                    <$ty>::cos(self)
                }
                #[inline]
                fn sin(self) -> Self {
                    <$ty>::sin(self)
                }
                #[inline]
                fn tanh(self) -> Self {
                    <$ty>::tanh(self)
                }
                #[inline]
                fn floor(self) -> Self {
                    <$ty>::floor(self)
                }
                #[inline]
                fn ceil(self) -> Self {
                    <$ty>::ceil(self)
                }
                #[inline]
                fn atan2(self, rhs: Self) -> Self {
                    <$ty>::atan2(self, rhs)
                }
            }
        )+
    };
}

impl_float!(f32, f64);

macro_rules! impl_float_f16 {
    ($($name:ident),+) => {
        $(
            #[inline]
            fn $name(self) -> Self {
                f16::from_f32(<f32 as Float>::$name(self.to_f32()))
            }
        )+
    };
}

impl Float for f16 {
    impl_float_f16!(exp, ln, rsqrt, cos, sin, tanh, floor, ceil);

    #[inline]
    fn atan2(self, rhs: Self) -> Self {
        f16::from_f32(self.to_f32().atan2(rhs.to_f32()))
    }
}

/// Element-by-element numeric conversion with `as` semantics:
/// integers truncate or extend, floats saturate into integers (NaN becomes zero).
pub trait Cast<U> {
    fn cast(self) -> U;
}

macro_rules! impl_cast {
    ($src:ty => $($dst:ty),+) => {
        $(
            impl Cast<$dst> for $src {
                #[inline]
                fn cast(self) -> $dst {
                    self as $dst
                }
            }
        )+
    };
}

impl_cast!(i8 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
impl_cast!(i16 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
impl_cast!(i32 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
impl_cast!(i64 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
impl_cast!(u8 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
impl_cast!(u16 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
impl_cast!(u32 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
impl_cast!(u64 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
impl_cast!(f32 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
impl_cast!(f64 => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

macro_rules! impl_cast_f16 {
    ($($ty:ty),+) => {
        $(
            impl Cast<f16> for $ty {
                #[inline]
                fn cast(self) -> f16 {
                    f16::from_f64(self as f64)
                }
            }

            impl Cast<$ty> for f16 {
                #[inline]
                fn cast(self) -> $ty {
                    self.to_f64() as $ty
                }
            }
        )+
    };
}

impl_cast_f16!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl Cast<f16> for f16 {
    #[inline]
    fn cast(self) -> f16 {
        self
    }
}

/// A [`Scalar`] convertible into every other element type.
pub trait Element:
    Scalar
    + Cast<i8>
    + Cast<i16>
    + Cast<i32>
    + Cast<i64>
    + Cast<u8>
    + Cast<u16>
    + Cast<u32>
    + Cast<u64>
    + Cast<f16>
    + Cast<f32>
    + Cast<f64>
{
}

impl<T> Element for T where
    T: Scalar
        + Cast<i8>
        + Cast<i16>
        + Cast<i32>
        + Cast<i64>
        + Cast<u8>
        + Cast<u16>
        + Cast<u32>
        + Cast<u64>
        + Cast<f16>
        + Cast<f32>
        + Cast<f64>
{
}

mod sealed {
    use half::f16;

    pub trait Sealed {}

    impl Sealed for i8 {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
    impl Sealed for f16 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

#[cfg(test)]
mod tests {
    use half::f16;

    use super::{Arithmetic, Cast, DataType, Element, Float, Integer, Scalar};

    #[test]
    fn test_data_type_round_trip_name() {
        for r#type in DataType::ALL {
            assert_eq!(r#type.to_string().parse::<DataType>(), Ok(r#type));
        }
        assert!("bool".parse::<DataType>().is_err());
        assert_eq!(<f16 as Scalar>::DATA_TYPE.size(), 2);
    }

    #[test]
    fn test_integer_wraps() {
        assert_eq!(Arithmetic::add(i8::MAX, 1), i8::MIN);
        assert_eq!(Arithmetic::mul(200u8, 2), 144);
        assert_eq!(Arithmetic::div(i32::MIN, -1), i32::MIN);
        assert_eq!(Arithmetic::abs(i16::MIN), i16::MIN);
        assert!(Arithmetic::is_zero_divisor(0u64));
        assert!(!Arithmetic::is_zero_divisor(0.0f32));
    }

    #[test]
    fn test_shift_modulo_width() {
        assert_eq!(Integer::shl(1u8, 9), 2);
        assert_eq!(Integer::shr(-8i32, 1), -4);
    }

    #[test]
    fn test_f16_float() {
        let x = f16::from_f32(4.0);
        assert_eq!(Float::rsqrt(x), f16::from_f32(0.5));
        assert_eq!(Arithmetic::abs(f16::from_f32(-2.5)), f16::from_f32(2.5));
    }

    #[test]
    fn test_cast_saturates() {
        assert_eq!(Cast::<u8>::cast(300.7f32), 255u8);
        assert_eq!(Cast::<i32>::cast(f32::NAN), 0i32);
        assert_eq!(Cast::<i8>::cast(257i32), 1i8);
        assert_eq!(Cast::<f32>::cast(f16::from_f32(1.5)), 1.5f32);
    }

    #[test]
    fn test_element() {
        fn widen<T: Element>(x: T) -> (f64, i64) {
            (Cast::<f64>::cast(x), Cast::<i64>::cast(x))
        }
        assert_eq!(widen(-3i8), (-3.0, -3));
        assert_eq!(widen(u64::MAX), (u64::MAX as f64, -1));
        assert_eq!(widen(f16::from_f32(2.5)), (2.5, 2));
    }
}
