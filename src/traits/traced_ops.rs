//! `std::ops` implementations for [`Traced<F>`].
//!
//! Each operator records an opcode to the active tape.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::opcode::OpCode;
use crate::tape::TapeThreadLocal;
use crate::traced::{record_op, Traced};

// ──────────────────────────────────────────────
//  Traced<F> ↔ Traced<F> operators
// ──────────────────────────────────────────────

impl<F: TapeThreadLocal> Add for Traced<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        record_op(OpCode::Add, &[self, rhs])
    }
}

impl<F: TapeThreadLocal> Sub for Traced<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        record_op(OpCode::Sub, &[self, rhs])
    }
}

impl<F: TapeThreadLocal> Mul for Traced<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        record_op(OpCode::Mul, &[self, rhs])
    }
}

impl<F: TapeThreadLocal> Div for Traced<F> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        record_op(OpCode::Div, &[self, rhs])
    }
}

impl<F: TapeThreadLocal> Neg for Traced<F> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        record_op(OpCode::Neg, &[self])
    }
}

// Assign variants delegate to the binary ops.

impl<F: TapeThreadLocal> AddAssign for Traced<F> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<F: TapeThreadLocal> SubAssign for Traced<F> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<F: TapeThreadLocal> MulAssign for Traced<F> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<F: TapeThreadLocal> DivAssign for Traced<F> {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

// ──────────────────────────────────────────────
//  Mixed ops: Traced<F> with primitive floats
// ──────────────────────────────────────────────

// The scalar becomes a Const entry on the tape.
macro_rules! impl_traced_scalar_ops {
    ($f:ty, $($trait:ident :: $method:ident => $op:ident),*) => {
        $(
            impl $trait<$f> for Traced<$f> {
                type Output = Traced<$f>;
                #[inline]
                fn $method(self, rhs: $f) -> Traced<$f> {
                    record_op(OpCode::$op, &[self, Traced::constant(rhs)])
                }
            }

            impl $trait<Traced<$f>> for $f {
                type Output = Traced<$f>;
                #[inline]
                fn $method(self, rhs: Traced<$f>) -> Traced<$f> {
                    record_op(OpCode::$op, &[Traced::constant(self), rhs])
                }
            }
        )*
    };
}

impl_traced_scalar_ops!(f32, Add::add => Add, Sub::sub => Sub, Mul::mul => Mul, Div::div => Div);
impl_traced_scalar_ops!(f64, Add::add => Add, Sub::sub => Sub, Mul::mul => Mul, Div::div => Div);
