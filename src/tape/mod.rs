//! Operation tape for re-evaluable forward- and reverse-mode AD.
//!
//! The tape is an arena of variables indexed by creation order. Each entry
//! stores an opcode, up to two operand indices and the primal value seen at
//! construction. Operands must already exist when an entry is appended, so
//! creation order is a topological order: the forward sweep walks it
//! front-to-back and the reverse sweep back-to-front.
//!
//! Once built, the tape is read-only. Every evaluation allocates its own
//! value / tangent / adjoint buffers, so one tape can serve many passes,
//! including concurrent ones.
//!
//! # Limitations
//!
//! A tape built by [`crate::record`] captures one execution path. If the
//! recorded closure branches on values (`if x > 0 { ... }`), re-evaluating at
//! inputs that take the other branch produces incorrect results.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use log::debug;

use crate::error::{AdError, Result};
use crate::float::Float;
use crate::opcode::{self, OpCode, UNUSED};

// Submodules: each adds impl blocks to Tape<F>
mod forward;
mod jacobian;
mod reverse;

#[cfg(feature = "parallel")]
mod parallel;

mod thread_local;

pub use self::forward::ForwardSweep;
pub use self::jacobian::{Jacobian, JacobianStrategy};
pub use self::reverse::ReverseSweep;
pub use self::thread_local::TapeThreadLocal;
pub(crate) use self::thread_local::{with_active_tape, TapeGuard};

/// Sentinel index for [`Traced`](crate::Traced) constants not yet on a tape.
pub const CONSTANT: u32 = u32::MAX;

static NEXT_TAPE_ID: AtomicU32 = AtomicU32::new(1);

#[inline]
fn next_tape_id() -> u32 {
    NEXT_TAPE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a variable on a [`Tape`].
///
/// The wrapped value is the variable's creation index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

impl VarId {
    /// Wrap a raw tape index. The tape validates it when it is used.
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        VarId(index)
    }

    /// Creation index as a `usize`, for indexing evaluation buffers.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Read-only view of one tape entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node<'a, F: Float> {
    pub id: VarId,
    pub op: OpCode,
    /// Operand indices, `op.arity()` long.
    pub operands: &'a [u32],
    /// Primal recorded at construction.
    pub value: F,
}

/// A recorded evaluation trace.
///
/// Build it with [`new_input`](Self::new_input), [`constant`](Self::constant)
/// and [`push_op`](Self::push_op) (or the named builders such as
/// [`mul`](Self::mul)), or let [`crate::record`] do it from a closure. Then
/// call [`forward_tangent`](Self::forward_tangent),
/// [`reverse_seeded`](Self::reverse_seeded) or [`jacobian`](Self::jacobian).
#[derive(Clone, Debug)]
pub struct Tape<F: Float> {
    pub(crate) opcodes: Vec<OpCode>,
    pub(crate) arg_indices: Vec<[u32; 2]>,
    /// Primals at construction time. Const entries are read from here on
    /// every pass; everything else is recomputed.
    pub(crate) values: Vec<F>,
    pub(crate) input_indices: Vec<u32>,
    pub(crate) output_indices: Vec<u32>,
    /// `consumers[v]` lists every entry that reads `v`. Built on first use.
    consumers: OnceLock<Vec<Vec<VarId>>>,
    /// First construction error hit while recording through `Traced`.
    pub(crate) pending_error: Option<AdError>,
    /// Process-unique id stamped into every `Traced` handle recorded here.
    pub(crate) id: u32,
}

macro_rules! binary_builders {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[doc = concat!("Record `", stringify!($name), "(a, b)`.")]
            #[inline]
            pub fn $name(&mut self, a: VarId, b: VarId) -> Result<VarId> {
                self.push_op(OpCode::$op, &[a, b])
            }
        )*
    };
}

macro_rules! unary_builders {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[doc = concat!("Record `", stringify!($name), "(x)`.")]
            #[inline]
            pub fn $name(&mut self, x: VarId) -> Result<VarId> {
                self.push_op(OpCode::$op, &[x])
            }
        )*
    };
}

impl<F: Float> Tape<F> {
    /// Create an empty tape.
    pub fn new() -> Self {
        Tape {
            opcodes: Vec::new(),
            arg_indices: Vec::new(),
            values: Vec::new(),
            input_indices: Vec::new(),
            output_indices: Vec::new(),
            consumers: OnceLock::new(),
            pending_error: None,
            id: next_tape_id(),
        }
    }

    /// Create a tape with pre-allocated capacity.
    pub fn with_capacity(est_ops: usize) -> Self {
        Tape {
            opcodes: Vec::with_capacity(est_ops),
            arg_indices: Vec::with_capacity(est_ops),
            values: Vec::with_capacity(est_ops),
            input_indices: Vec::new(),
            output_indices: Vec::new(),
            consumers: OnceLock::new(),
            pending_error: None,
            id: next_tape_id(),
        }
    }

    /// Register a new input variable with its construction-time primal.
    #[inline]
    pub fn new_input(&mut self, value: F) -> VarId {
        let id = self.push_entry(OpCode::Input, [UNUSED, UNUSED], value);
        self.input_indices.push(id.0);
        id
    }

    /// Register a scalar constant. Constants are leaves that are not inputs:
    /// their value never changes and they carry no derivative.
    #[inline]
    pub fn constant(&mut self, value: F) -> VarId {
        self.push_entry(OpCode::Const, [UNUSED, UNUSED], value)
    }

    /// Record an operation over existing variables. Returns the new variable.
    ///
    /// The primal is evaluated immediately from the operands' recorded values.
    ///
    /// # Errors
    ///
    /// - [`AdError::LeafOp`] for `Input` / `Const`.
    /// - [`AdError::Arity`] if `operands.len() != op.arity()`.
    /// - [`AdError::InvalidOperand`] if an operand is not strictly below the
    ///   new variable's index.
    /// - [`AdError::Domain`] if the recorded operands are outside `op`'s domain.
    ///
    /// The tape is left unchanged on error.
    pub fn push_op(&mut self, op: OpCode, operands: &[VarId]) -> Result<VarId> {
        if op.is_leaf() {
            return Err(AdError::LeafOp { op });
        }
        if operands.len() != op.arity() {
            return Err(AdError::Arity {
                op,
                expected: op.arity(),
                actual: operands.len(),
            });
        }

        let index = self.opcodes.len() as u32;
        if let Some(bad) = operands.iter().find(|v| v.0 >= index) {
            return Err(AdError::InvalidOperand {
                operand: bad.0,
                index,
            });
        }

        let args = [operands[0].0, operands.get(1).map_or(UNUSED, |v| v.0)];
        let (a, b) = load_operands(&self.values, args);
        let value = opcode::eval_forward(op, a, b).map_err(|e| e.at(index as usize))?;
        Ok(self.push_entry(op, args, value))
    }

    binary_builders! {
        add => Add,
        sub => Sub,
        mul => Mul,
        div => Div,
    }

    unary_builders! {
        neg => Neg,
        recip => Recip,
        sqrt => Sqrt,
        exp => Exp,
        ln => Ln,
        sin => Sin,
        cos => Cos,
        tan => Tan,
        tanh => Tanh,
    }

    #[inline]
    fn push_entry(&mut self, op: OpCode, args: [u32; 2], value: F) -> VarId {
        let idx = self.opcodes.len() as u32;
        self.opcodes.push(op);
        self.arg_indices.push(args);
        self.values.push(value);
        // Structure changed; rebuild the consumer table on next query.
        self.consumers = OnceLock::new();
        VarId(idx)
    }

    // ── Outputs ──

    /// Mark a single output variable, replacing any previous outputs.
    pub fn set_output(&mut self, output: VarId) -> Result<()> {
        self.set_outputs(&[output])
    }

    /// Mark the output variables, in row order of the Jacobian.
    ///
    /// The same variable may appear more than once.
    pub fn set_outputs(&mut self, outputs: &[VarId]) -> Result<()> {
        let len = self.opcodes.len() as u32;
        if let Some(bad) = outputs.iter().find(|v| v.0 >= len) {
            return Err(AdError::InvalidOperand {
                operand: bad.0,
                index: len,
            });
        }
        self.output_indices = outputs.iter().map(|v| v.0).collect();
        Ok(())
    }

    // ── Queries ──

    /// Number of input variables (`n`).
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input_indices.len()
    }

    /// Number of output variables (`m`).
    #[inline]
    pub fn num_outputs(&self) -> usize {
        self.output_indices.len()
    }

    /// Total number of tape entries (inputs + constants + operations).
    #[inline]
    pub fn len(&self) -> usize {
        self.opcodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.opcodes.is_empty()
    }

    /// Input variables in creation order.
    pub fn inputs(&self) -> impl ExactSizeIterator<Item = VarId> + '_ {
        self.input_indices.iter().map(|&i| VarId(i))
    }

    /// Output variables in the order given to [`set_outputs`](Self::set_outputs).
    pub fn outputs(&self) -> impl ExactSizeIterator<Item = VarId> + '_ {
        self.output_indices.iter().map(|&i| VarId(i))
    }

    /// Primal recorded at construction.
    #[inline]
    pub fn value(&self, v: VarId) -> Option<F> {
        self.values.get(v.index()).copied()
    }

    /// Output primals recorded at construction.
    pub fn output_values(&self) -> Vec<F> {
        self.output_indices
            .iter()
            .map(|&i| self.values[i as usize])
            .collect()
    }

    pub fn node(&self, v: VarId) -> Option<Node<'_, F>> {
        (v.index() < self.opcodes.len()).then(|| self.node_at(v.index()))
    }

    /// Entries in creation order. Use `.rev()` for the reverse sweep order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Node<'_, F>> + ExactSizeIterator + '_ {
        (0..self.opcodes.len()).map(move |i| self.node_at(i))
    }

    #[inline]
    fn node_at(&self, i: usize) -> Node<'_, F> {
        let op = self.opcodes[i];
        Node {
            id: VarId(i as u32),
            op,
            operands: &self.arg_indices[i][..op.arity()],
            value: self.values[i],
        }
    }

    /// Every entry that reads `v` as an operand, in creation order.
    ///
    /// An entry using `v` in both operand slots (`v * v`) is listed once.
    /// The table is computed on first call and cached; concurrent readers
    /// share it.
    pub fn consumers(&self, v: VarId) -> &[VarId] {
        self.consumers
            .get_or_init(|| self.build_consumers())
            .get(v.index())
            .map_or(&[], Vec::as_slice)
    }

    /// True if `v` feeds more than one downstream operation.
    #[inline]
    pub fn is_fork(&self, v: VarId) -> bool {
        self.consumers(v).len() > 1
    }

    fn build_consumers(&self) -> Vec<Vec<VarId>> {
        let mut table = vec![Vec::new(); self.opcodes.len()];
        for (i, (&op, args)) in self.opcodes.iter().zip(&self.arg_indices).enumerate() {
            let args = &args[..op.arity()];
            for (slot, &arg) in args.iter().enumerate() {
                if slot == 1 && args[0] == arg {
                    continue;
                }
                table[arg as usize].push(VarId(i as u32));
            }
        }
        table
    }

    // ── Evaluation helpers ──

    /// Operand primals of entry `i`, read from `values`.
    /// The second slot is zero for unary ops.
    #[inline]
    pub(crate) fn operand_values(&self, i: usize, values: &[F]) -> (F, F) {
        load_operands(values, self.arg_indices[i])
    }

    /// Tag a domain error with the entry it came from and note the aborted pass.
    #[cold]
    pub(crate) fn abort(&self, err: AdError, i: usize) -> AdError {
        let err = err.at(i);
        debug!("evaluation pass aborted: {err}");
        err
    }

    /// Remove and return the error latched during `Traced` recording.
    pub(crate) fn take_pending_error(&mut self) -> Option<AdError> {
        self.pending_error.take()
    }
}

impl<F: Float> Default for Tape<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn load_operands<F: Float>(values: &[F], [a_idx, b_idx]: [u32; 2]) -> (F, F) {
    let a = values[a_idx as usize];
    let b = if b_idx != UNUSED {
        values[b_idx as usize]
    } else {
        F::zero()
    };
    (a, b)
}
