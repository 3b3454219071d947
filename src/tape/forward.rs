use log::trace;

use crate::error::{AdError, Result};
use crate::float::Float;
use crate::opcode::{self, OpCode, UNUSED};

use super::VarId;

/// Primal and tangent of every variable after one forward-mode pass.
///
/// The output tangents are the Jacobian-vector product `J·u` for the seed `u`.
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardSweep<F: Float> {
    values: Vec<F>,
    tangents: Vec<F>,
    output_indices: Vec<u32>,
}

impl<F: Float> ForwardSweep<F> {
    /// Primal of `v` in this pass.
    ///
    /// # Panics
    ///
    /// If `v` is not a variable of the tape that produced this sweep.
    #[inline]
    pub fn value(&self, v: VarId) -> F {
        self.values[v.index()]
    }

    /// Tangent of `v` in this pass.
    ///
    /// # Panics
    ///
    /// If `v` is not a variable of the tape that produced this sweep.
    #[inline]
    pub fn tangent(&self, v: VarId) -> F {
        self.tangents[v.index()]
    }

    /// Primals indexed by creation order.
    pub fn values(&self) -> &[F] {
        &self.values
    }

    /// Tangents indexed by creation order.
    pub fn tangents(&self) -> &[F] {
        &self.tangents
    }

    pub fn output_values(&self) -> Vec<F> {
        self.output_indices
            .iter()
            .map(|&i| self.values[i as usize])
            .collect()
    }

    pub fn output_tangents(&self) -> Vec<F> {
        self.output_indices
            .iter()
            .map(|&i| self.tangents[i as usize])
            .collect()
    }

    /// `(primal_outputs, tangent_outputs)`.
    pub fn into_outputs(self) -> (Vec<F>, Vec<F>) {
        (self.output_values(), self.output_tangents())
    }
}

impl<F: Float> super::Tape<F> {
    /// Primal-only forward sweep into an external buffer.
    ///
    /// Reads opcodes, constants and argument indices from `self` and writes
    /// every primal into `values_buf`. The tape itself is not touched, so
    /// many sweeps can share it.
    pub fn forward_into(&self, inputs: &[F], values_buf: &mut Vec<F>) -> Result<()> {
        AdError::check_len("inputs", self.num_inputs(), inputs.len())?;
        trace!(
            "primal sweep: {} entries, {} inputs",
            self.opcodes.len(),
            inputs.len()
        );

        // Copy constant values from the tape, then overwrite inputs.
        values_buf.clear();
        values_buf.extend_from_slice(&self.values);
        for (&idx, &v) in self.input_indices.iter().zip(inputs) {
            values_buf[idx as usize] = v;
        }

        for i in 0..self.opcodes.len() {
            let op = self.opcodes[i];
            if op.is_leaf() {
                continue;
            }
            let (a, b) = self.operand_values(i, values_buf);
            values_buf[i] = opcode::eval_forward(op, a, b).map_err(|e| self.abort(e, i))?;
        }
        Ok(())
    }

    /// Primals of every variable at `inputs`.
    pub fn primals(&self, inputs: &[F]) -> Result<Vec<F>> {
        let mut values = Vec::with_capacity(self.opcodes.len());
        self.forward_into(inputs, &mut values)?;
        Ok(values)
    }

    /// Forward-mode pass: primals and tangents in one creation-order sweep.
    ///
    /// `seed` holds one tangent per input. Seed with the `j`-th unit vector
    /// to get `∂y/∂x_j` for every output `y`.
    ///
    /// # Errors
    ///
    /// [`AdError::DimensionMismatch`] before any work if `inputs` or `seed`
    /// has the wrong length; [`AdError::Domain`] if a primitive leaves its
    /// domain, which aborts the whole pass.
    pub fn forward_tangent(&self, inputs: &[F], seed: &[F]) -> Result<ForwardSweep<F>> {
        let ni = self.num_inputs();
        AdError::check_len("inputs", ni, inputs.len())?;
        AdError::check_len("tangent seed", ni, seed.len())?;
        trace!("tangent sweep: {} entries, {} inputs", self.opcodes.len(), ni);

        let n = self.opcodes.len();
        let mut values = vec![F::zero(); n];
        let mut tangents = vec![F::zero(); n];

        let mut input_slot = 0usize;
        for i in 0..n {
            match self.opcodes[i] {
                OpCode::Input => {
                    values[i] = inputs[input_slot];
                    tangents[i] = seed[input_slot];
                    input_slot += 1;
                }
                OpCode::Const => {
                    values[i] = self.values[i];
                }
                op => {
                    let (a, b) = self.operand_values(i, &values);
                    let r = opcode::eval_forward(op, a, b).map_err(|e| self.abort(e, i))?;
                    let (da, db) =
                        opcode::partials(op, a, b, r).map_err(|e| self.abort(e, i))?;

                    // Sum of incoming edge contributions.
                    let [a_idx, b_idx] = self.arg_indices[i];
                    let mut t = da * tangents[a_idx as usize];
                    if b_idx != UNUSED {
                        t = t + db * tangents[b_idx as usize];
                    }
                    values[i] = r;
                    tangents[i] = t;
                }
            }
        }

        Ok(ForwardSweep {
            values,
            tangents,
            output_indices: self.output_indices.clone(),
        })
    }
}
