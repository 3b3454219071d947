//! Error types for tape construction and evaluation.

use thiserror::Error;

use crate::opcode::OpCode;

/// Errors raised while building a [`Tape`](crate::Tape) or evaluating it.
///
/// Every error is a deterministic function of the tape, the inputs and the
/// seed. A failed pass leaves the tape untouched and reusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdError {
    /// An operand does not name a variable created before the new one.
    ///
    /// A new variable's index equals the tape length, so this covers both
    /// operands that do not exist and operands that would form a cycle.
    #[error("operand {operand} does not precede new variable {index}")]
    InvalidOperand {
        /// The offending operand index.
        operand: u32,
        /// Index the new variable would have received.
        index: u32,
    },

    /// An operation was given the wrong number of operands.
    #[error("{op} takes {expected} operand(s), got {actual}")]
    Arity {
        op: OpCode,
        expected: usize,
        actual: usize,
    },

    /// Inputs and constants are created with their own constructors.
    #[error("{op} is a leaf and cannot be recorded as an operation")]
    LeafOp { op: OpCode },

    /// A primitive was evaluated outside its mathematical domain.
    #[error("{op} undefined at variable {index}: {reason}")]
    Domain {
        op: OpCode,
        /// Tape index of the variable being computed.
        index: u32,
        reason: &'static str,
    },

    /// An input, seed or weight vector has the wrong length.
    #[error("{what} has length {actual}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl AdError {
    /// Attach the tape index of the variable that triggered a domain error.
    pub(crate) fn at(self, i: usize) -> Self {
        match self {
            AdError::Domain { op, reason, .. } => AdError::Domain {
                op,
                index: i as u32,
                reason,
            },
            other => other,
        }
    }

    pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(AdError::DimensionMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}

/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, AdError>;
