use log::trace;

use crate::error::{AdError, Result};
use crate::float::Float;
use crate::opcode::{self, UNUSED};

use super::VarId;

/// Primals and adjoints of every variable after one reverse-mode pass.
///
/// The input adjoints are the vector-Jacobian product `wᵀ·J` for the output
/// seed `w`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReverseSweep<F: Float> {
    values: Vec<F>,
    adjoints: Vec<F>,
    input_indices: Vec<u32>,
    output_indices: Vec<u32>,
}

impl<F: Float> ReverseSweep<F> {
    /// Primal of `v` from the forward sweep.
    ///
    /// # Panics
    ///
    /// If `v` is not a variable of the tape that produced this sweep.
    #[inline]
    pub fn value(&self, v: VarId) -> F {
        self.values[v.index()]
    }

    /// Fully accumulated adjoint of `v`.
    ///
    /// # Panics
    ///
    /// If `v` is not a variable of the tape that produced this sweep.
    #[inline]
    pub fn adjoint(&self, v: VarId) -> F {
        self.adjoints[v.index()]
    }

    /// Adjoints indexed by creation order.
    pub fn adjoints(&self) -> &[F] {
        &self.adjoints
    }

    pub fn output_values(&self) -> Vec<F> {
        self.output_indices
            .iter()
            .map(|&i| self.values[i as usize])
            .collect()
    }

    /// Adjoints of the inputs, in input order.
    pub fn input_adjoints(&self) -> Vec<F> {
        self.input_indices
            .iter()
            .map(|&i| self.adjoints[i as usize])
            .collect()
    }

    /// `(primal_outputs, input_adjoints)`.
    pub fn into_outputs(self) -> (Vec<F>, Vec<F>) {
        (self.output_values(), self.input_adjoints())
    }
}

impl<F: Float> super::Tape<F> {
    /// Core reverse sweep shared by every reverse-mode entry point.
    ///
    /// Expects `adjoints` to be pre-seeded by the caller (length = tape
    /// length) and `values` to hold the primals of a completed forward sweep.
    /// Walks entries by decreasing index: every consumer of an entry has a
    /// larger index, so an entry's adjoint is complete by the time it is
    /// propagated to its own operands.
    pub(super) fn reverse_sweep_core(&self, adjoints: &mut [F], values: &[F]) -> Result<()> {
        for i in (0..self.opcodes.len()).rev() {
            let op = self.opcodes[i];
            if op.is_leaf() {
                continue;
            }
            let adj = adjoints[i];
            let (a, b) = self.operand_values(i, values);
            let (da, db) =
                opcode::partials(op, a, b, values[i]).map_err(|e| self.abort(e, i))?;

            let [a_idx, b_idx] = self.arg_indices[i];
            adjoints[a_idx as usize] = adjoints[a_idx as usize] + da * adj;
            if b_idx != UNUSED {
                adjoints[b_idx as usize] = adjoints[b_idx as usize] + db * adj;
            }
        }
        Ok(())
    }

    /// Seed output adjoints with `weights`. Repeated outputs accumulate.
    fn seeded_adjoints(&self, weights: &[F]) -> Vec<F> {
        let mut adjoints = vec![F::zero(); self.opcodes.len()];
        for (&out_idx, &w) in self.output_indices.iter().zip(weights) {
            adjoints[out_idx as usize] = adjoints[out_idx as usize] + w;
        }
        adjoints
    }

    /// Reverse sweep reading primals from an external buffer.
    ///
    /// Pair with [`forward_into`](Self::forward_into) to run several reverse
    /// sweeps over one forward sweep. Returns the full adjoint vector.
    pub fn reverse_from(&self, values: &[F], output_seed: &[F]) -> Result<Vec<F>> {
        AdError::check_len("primal buffer", self.opcodes.len(), values.len())?;
        AdError::check_len("output seed", self.num_outputs(), output_seed.len())?;
        trace!(
            "adjoint sweep: {} entries, {} outputs",
            self.opcodes.len(),
            output_seed.len()
        );

        let mut adjoints = self.seeded_adjoints(output_seed);
        self.reverse_sweep_core(&mut adjoints, values)?;
        Ok(adjoints)
    }

    /// Input adjoints for the unit seed on output `row`.
    pub(super) fn reverse_row(&self, values: &[F], row: usize) -> Result<Vec<F>> {
        let mut adjoints = vec![F::zero(); self.opcodes.len()];
        adjoints[self.output_indices[row] as usize] = F::one();
        self.reverse_sweep_core(&mut adjoints, values)?;
        Ok(self
            .input_indices
            .iter()
            .map(|&i| adjoints[i as usize])
            .collect())
    }

    /// Reverse-mode pass: forward sweep for primals, then one backward sweep.
    ///
    /// `output_seed` holds one weight per output. Seed output `k` with 1 and
    /// the rest with 0 to get the gradient of output `k` w.r.t. all inputs.
    ///
    /// # Errors
    ///
    /// [`AdError::DimensionMismatch`] before any work if `inputs` or
    /// `output_seed` has the wrong length; [`AdError::Domain`] from either
    /// sweep.
    pub fn reverse_seeded(&self, inputs: &[F], output_seed: &[F]) -> Result<ReverseSweep<F>> {
        AdError::check_len("inputs", self.num_inputs(), inputs.len())?;
        AdError::check_len("output seed", self.num_outputs(), output_seed.len())?;

        let values = self.primals(inputs)?;
        let adjoints = self.reverse_from(&values, output_seed)?;
        Ok(ReverseSweep {
            values,
            adjoints,
            input_indices: self.input_indices.clone(),
            output_indices: self.output_indices.clone(),
        })
    }

    /// Gradient of a single-output tape at `inputs`.
    pub fn gradient(&self, inputs: &[F]) -> Result<Vec<F>> {
        AdError::check_len("outputs", 1, self.num_outputs())?;
        Ok(self.reverse_seeded(inputs, &[F::one()])?.input_adjoints())
    }

    /// Evaluate the gradient at multiple input points.
    pub fn gradient_batch(&self, points: &[&[F]]) -> Result<Vec<Vec<F>>> {
        points.iter().map(|x| self.gradient(x)).collect()
    }
}
