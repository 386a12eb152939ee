//! Element operations the CPU kernels are generic over.
//!
//! Every operation is a unit marker type. Kernels are monomorphized per (operation, element type)
//! pair, so the inner loops contain no dispatch.

use crate::{
    hal::cpu::KernelError,
    loom::num::{Arithmetic, Float, Integer, Scalar},
};

pub trait BinaryOp<T> {
    type Output: Scalar;

    /// Validates the right-hand operands before any output is written.
    #[inline]
    fn check(_rhs: &[T]) -> Result<(), KernelError> {
        Ok(())
    }

    fn apply(lhs: T, rhs: T) -> Self::Output;
}

pub trait UnaryOp<T> {
    fn apply(x: T) -> T;
}

/// Folds a reduced axis into an accumulator.
pub trait ReduceOp<T> {
    fn combine(acc: T, x: T) -> T;
}

macro_rules! compare_op {
    ($($name:ident => $op:tt),+ $(,)?) => {
        $(
            #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name;

            impl<T: Scalar> BinaryOp<T> for $name {
                type Output = u8;

                #[inline]
                fn apply(lhs: T, rhs: T) -> u8 {
                    u8::from(lhs $op rhs)
                }
            }
        )+
    };
}

compare_op!(
    CompareEq => ==,
    CompareNe => !=,
    CompareLt => <,
    CompareLe => <=,
    CompareGt => >,
    CompareGe => >=,
);

macro_rules! binary_op {
    ($bound:ident: $($name:ident => $method:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name;

            impl<T: $bound> BinaryOp<T> for $name {
                type Output = T;

                #[inline]
                fn apply(lhs: T, rhs: T) -> T {
                    <T as $bound>::$method(lhs, rhs)
                }
            }
        )+
    };
}

binary_op!(Arithmetic: Add => add, Sub => sub, Mul => mul, Min => min, Max => max);
binary_op!(Integer: And => and, Or => or, Xor => xor, ShiftLeft => shl, ShiftRight => shr);
binary_op!(Float: Atan2 => atan2);

/// Division. Integer division by zero is rejected; floating point division follows IEEE 754.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Div;

impl<T: Arithmetic> BinaryOp<T> for Div {
    type Output = T;

    fn check(rhs: &[T]) -> Result<(), KernelError> {
        match rhs.iter().position(|&x| x.is_zero_divisor()) {
            Some(index) => Err(KernelError::DivideByZero(index)),
            None => Ok(()),
        }
    }

    #[inline]
    fn apply(lhs: T, rhs: T) -> T {
        lhs.div(rhs)
    }
}

macro_rules! unary_op {
    ($bound:ident: $($name:ident => $method:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name;

            impl<T: $bound> UnaryOp<T> for $name {
                #[inline]
                fn apply(x: T) -> T {
                    <T as $bound>::$method(x)
                }
            }
        )+
    };
}

unary_op!(Arithmetic: Abs => abs);
unary_op!(Integer: Not => not);
unary_op!(
    Float: Exp => exp,
    Log => ln,
    Rsqrt => rsqrt,
    Cos => cos,
    Sin => sin,
    Tanh => tanh,
    Floor => floor,
    Ceil => ceil
);

macro_rules! reduce_op {
    ($($name:ident => $method:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name;

            impl<T: Arithmetic> ReduceOp<T> for $name {
                #[inline]
                fn combine(acc: T, x: T) -> T {
                    <T as Arithmetic>::$method(acc, x)
                }
            }
        )+
    };
}

reduce_op!(ReduceSum => add, ReduceMin => min, ReduceMax => max);

#[cfg(test)]
mod tests {
    use half::f16;

    use super::{
        Abs, Add, BinaryOp, CompareLt, Div, Not, ReduceMax, ReduceOp, Rsqrt, ShiftLeft, UnaryOp,
    };

    #[test]
    fn test_ops() {
        assert_eq!(<CompareLt as BinaryOp<f32>>::apply(1.0, 2.0), 1);
        assert_eq!(<CompareLt as BinaryOp<i8>>::apply(2, 2), 0);
        assert_eq!(<Add as BinaryOp<u8>>::apply(250, 10), 4);
        assert_eq!(<ShiftLeft as BinaryOp<i32>>::apply(1, 33), 2);
        assert_eq!(<Abs as UnaryOp<i8>>::apply(i8::MIN), i8::MIN);
        assert_eq!(<Not as UnaryOp<u8>>::apply(0x0f), 0xf0);
        assert_eq!(<Rsqrt as UnaryOp<f32>>::apply(4.0), 0.5);
        assert_eq!(<ReduceMax as ReduceOp<f16>>::combine(f16::ONE, f16::ZERO), f16::ONE);

        assert!(<Div as BinaryOp<i32>>::check(&[1, 2, 0]).is_err());
        assert!(<Div as BinaryOp<f32>>::check(&[1.0, 0.0]).is_ok());
    }
}
