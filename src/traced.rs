//! Operator-overloaded recording handle.
//!
//! [`Traced<F>`] carries a primal and a tape index. Arithmetic on it appends
//! entries to the thread-local tape activated by [`crate::record`], so a
//! function written once over `Traced<F>` produces a reusable [`Tape`].
//!
//! Construction errors (an out-of-domain primal while recording, a handle
//! from another tape) cannot be returned through `std::ops`. The first one is
//! latched on the tape, later operations short-circuit to NaN, and
//! [`crate::record`] returns the latched error.

use std::fmt::{self, Display};

use log::debug;

use crate::error::{AdError, Result};
use crate::float::Float;
use crate::opcode::OpCode;
use crate::tape::{self, Tape, TapeThreadLocal, VarId, CONSTANT};

/// Recording variable. `Copy`, 16 bytes for `f64`.
#[derive(Clone, Copy, Debug)]
pub struct Traced<F: Float> {
    pub(crate) value: F,
    pub(crate) index: u32,
    /// Id of the owning tape; 0 for constants.
    pub(crate) tape_id: u32,
}

impl<F: Float> Traced<F> {
    /// Create a constant (not placed on the tape until it is used).
    #[inline]
    pub fn constant(value: F) -> Self {
        Traced {
            value,
            index: CONSTANT,
            tape_id: 0,
        }
    }

    /// Handle to variable `id` of `tape`, carrying its recorded primal.
    /// `None` if `id` is not on `tape`.
    #[inline]
    pub fn from_tape(tape: &Tape<F>, id: VarId) -> Option<Self> {
        tape.value(id).map(|value| Traced {
            value,
            index: id.0,
            tape_id: tape.id,
        })
    }

    /// Primal seen while recording.
    #[inline]
    pub fn value(&self) -> F {
        self.value
    }

    /// Tape variable, or `None` for a constant not yet on the tape.
    #[inline]
    pub fn id(&self) -> Option<VarId> {
        (self.index != CONSTANT).then_some(VarId(self.index))
    }

    #[inline]
    fn poisoned() -> Self {
        Traced::constant(F::nan())
    }
}

impl<F: Float + TapeThreadLocal> Traced<F> {
    pub fn ln(self) -> Self {
        record_op(OpCode::Ln, &[self])
    }

    pub fn sin(self) -> Self {
        record_op(OpCode::Sin, &[self])
    }

    pub fn cos(self) -> Self {
        record_op(OpCode::Cos, &[self])
    }

    pub fn tan(self) -> Self {
        record_op(OpCode::Tan, &[self])
    }

    pub fn tanh(self) -> Self {
        record_op(OpCode::Tanh, &[self])
    }

    pub fn exp(self) -> Self {
        record_op(OpCode::Exp, &[self])
    }

    pub fn sqrt(self) -> Self {
        record_op(OpCode::Sqrt, &[self])
    }

    pub fn recip(self) -> Self {
        record_op(OpCode::Recip, &[self])
    }
}

/// Place a handle on the tape, promoting constants to `Const` entries.
///
/// A handle recorded on a different tape is rejected as
/// [`AdError::InvalidOperand`]: its index means nothing here.
#[inline]
pub(crate) fn ensure_on_tape<F: Float>(x: &Traced<F>, tape: &mut Tape<F>) -> Result<VarId> {
    if x.index == CONSTANT {
        Ok(tape.constant(x.value))
    } else if x.tape_id != tape.id {
        Err(AdError::InvalidOperand {
            operand: x.index,
            index: tape.len() as u32,
        })
    } else {
        Ok(VarId(x.index))
    }
}

/// Record `op` over `args` on the active tape.
pub(crate) fn record_op<F: Float + TapeThreadLocal>(op: OpCode, args: &[Traced<F>]) -> Traced<F> {
    tape::with_active_tape(|t| {
        if t.pending_error.is_some() {
            return Traced::poisoned();
        }
        let mut ids = [VarId(0); 2];
        let placed = ids
            .iter_mut()
            .zip(args)
            .try_for_each(|(slot, x)| ensure_on_tape(x, t).map(|id| *slot = id));
        match placed.and_then(|()| t.push_op(op, &ids[..args.len()])) {
            Ok(id) => Traced {
                value: t.values[id.index()],
                index: id.0,
                tape_id: t.id,
            },
            Err(err) => {
                debug!("recording failed: {err}");
                t.pending_error = Some(err);
                Traced::poisoned()
            }
        }
    })
}

impl<F: Float> Display for Traced<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<F: Float> Default for Traced<F> {
    fn default() -> Self {
        Traced::constant(F::zero())
    }
}
