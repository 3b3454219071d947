//! Primitive operation registry.
//!
//! Each [`OpCode`] is an elementary operation with a fixed arity. The
//! [`eval_forward`] and [`partials`] functions evaluate / differentiate a
//! single opcode at given operand values. Both are pure, and both evaluators
//! go through them, so forward and reverse mode see bit-identical partials.

use std::fmt;

use crate::error::{AdError, Result};
use crate::float::Float;

/// Sentinel used in `arg_indices[1]` for unary ops (the second slot is unused).
pub const UNUSED: u32 = u32::MAX;

/// Elementary operation codes.
///
/// Binary ops use both `arg_indices` slots; unary ops use slot 0 only
/// (slot 1 = [`UNUSED`]). Leaves use neither.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    // ── Leaves ──
    /// Input variable, primal supplied per evaluation.
    Input,
    /// Scalar constant fixed at construction.
    Const,

    // ── Binary arithmetic ──
    Add,
    Sub,
    Mul,
    Div,

    // ── Unary ──
    Neg,
    Recip,
    Sqrt,
    Exp,
    Ln,
    Sin,
    Cos,
    Tan,
    Tanh,
}

impl OpCode {
    /// Number of operands the opcode consumes.
    #[inline]
    pub fn arity(self) -> usize {
        match self {
            OpCode::Input | OpCode::Const => 0,
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => 2,
            _ => 1,
        }
    }

    /// True for `Input` and `Const`.
    #[inline]
    pub fn is_leaf(self) -> bool {
        matches!(self, OpCode::Input | OpCode::Const)
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Input => "input",
            OpCode::Const => "const",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Neg => "neg",
            OpCode::Recip => "recip",
            OpCode::Sqrt => "sqrt",
            OpCode::Exp => "exp",
            OpCode::Ln => "log",
            OpCode::Sin => "sin",
            OpCode::Cos => "cos",
            OpCode::Tan => "tan",
            OpCode::Tanh => "tanh",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
fn domain_error(op: OpCode, reason: &'static str) -> AdError {
    // Index is filled in by the tape via `AdError::at`.
    AdError::Domain {
        op,
        index: 0,
        reason,
    }
}

/// Evaluate a single opcode in the forward direction.
///
/// For binary ops, `a` and `b` are the two operand values.
/// For unary ops, `a` is the operand value and `b` is ignored.
///
/// # Errors
///
/// [`AdError::Domain`] for `log` of a non-positive value, division by zero,
/// `recip(0)` and `sqrt` of a negative value.
#[inline]
pub fn eval_forward<T: Float>(op: OpCode, a: T, b: T) -> Result<T> {
    let zero = T::zero();
    let value = match op {
        OpCode::Input | OpCode::Const => {
            // values are set from the input slice / recorded constant
            unreachable!("Input/Const are never re-evaluated via eval_forward")
        }

        OpCode::Add => a + b,
        OpCode::Sub => a - b,
        OpCode::Mul => a * b,
        OpCode::Div => {
            if b == zero {
                return Err(domain_error(op, "division by zero"));
            }
            a / b
        }

        OpCode::Neg => -a,
        OpCode::Recip => {
            if a == zero {
                return Err(domain_error(op, "reciprocal of zero"));
            }
            a.recip()
        }
        OpCode::Sqrt => {
            if a < zero {
                return Err(domain_error(op, "square root of a negative value"));
            }
            a.sqrt()
        }
        OpCode::Exp => a.exp(),
        OpCode::Ln => {
            if a <= zero {
                return Err(domain_error(op, "logarithm of a non-positive value"));
            }
            a.ln()
        }
        OpCode::Sin => a.sin(),
        OpCode::Cos => a.cos(),
        OpCode::Tan => a.tan(),
        OpCode::Tanh => a.tanh(),
    };
    Ok(value)
}

/// Local partial derivatives of a single opcode.
///
/// Returns `(∂result/∂arg0, ∂result/∂arg1)`. For unary ops the second
/// partial is `T::zero()`; leaves have no operands and return zeros.
///
/// `a`, `b` are the operand values and `r` is the result value.
#[inline]
pub fn partials<T: Float>(op: OpCode, a: T, b: T, r: T) -> Result<(T, T)> {
    let zero = T::zero();
    let one = T::one();
    let pair = match op {
        OpCode::Input | OpCode::Const => (zero, zero),

        OpCode::Add => (one, one),
        OpCode::Sub => (one, -one),
        OpCode::Mul => (b, a),
        OpCode::Div => {
            if b == zero {
                return Err(domain_error(op, "division by zero"));
            }
            let inv = one / b;
            (inv, -a * inv * inv)
        }

        OpCode::Neg => (-one, zero),
        OpCode::Recip => {
            if a == zero {
                return Err(domain_error(op, "reciprocal of zero"));
            }
            // d/da (1/a) = -1/a²
            let inv = one / a;
            (-inv * inv, zero)
        }
        OpCode::Sqrt => {
            if a <= zero {
                return Err(domain_error(op, "sqrt is not differentiable at or below zero"));
            }
            let two = one + one;
            (one / (two * r), zero)
        }
        OpCode::Exp => (r, zero),
        OpCode::Ln => {
            if a <= zero {
                return Err(domain_error(op, "logarithm of a non-positive value"));
            }
            (one / a, zero)
        }
        OpCode::Sin => (a.cos(), zero),
        OpCode::Cos => (-a.sin(), zero),
        OpCode::Tan => {
            let c = a.cos();
            (one / (c * c), zero)
        }
        OpCode::Tanh => (one - r * r, zero),
    };
    Ok(pair)
}
