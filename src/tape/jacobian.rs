use std::ops::Index;

use log::debug;

use crate::error::{AdError, Result};
use crate::float::Float;

/// How [`Tape::jacobian_with`](super::Tape::jacobian_with) assembles the matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum JacobianStrategy {
    /// Reverse when there are more inputs than outputs, forward otherwise.
    #[default]
    Auto,
    /// One forward-tangent pass per input, each filling a column.
    Forward,
    /// One primal sweep, then one reverse sweep per output, each filling a row.
    Reverse,
}

impl JacobianStrategy {
    /// Resolve `Auto` for a tape with `num_inputs` inputs and `num_outputs`
    /// outputs. Ties go to forward mode: it needs no separate primal sweep.
    pub fn resolve(self, num_inputs: usize, num_outputs: usize) -> Self {
        match self {
            JacobianStrategy::Auto if num_inputs > num_outputs => JacobianStrategy::Reverse,
            JacobianStrategy::Auto => JacobianStrategy::Forward,
            explicit => explicit,
        }
    }
}

/// Dense `m × n` Jacobian, `J[(i, j)] = ∂y_i/∂x_j`, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Jacobian<F: Float> {
    rows: usize,
    cols: usize,
    data: Vec<F>,
}

impl<F: Float> Jacobian<F> {
    pub(crate) fn zeros(rows: usize, cols: usize) -> Self {
        Jacobian {
            rows,
            cols,
            data: vec![F::zero(); rows * cols],
        }
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, value: F) {
        self.data[i * self.cols + j] = value;
    }

    /// Number of outputs (`m`).
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Number of inputs (`n`).
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<F> {
        (i < self.rows && j < self.cols).then(|| self.data[i * self.cols + j])
    }

    /// Gradient of output `i`.
    pub fn row(&self, i: usize) -> &[F] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Derivatives of every output w.r.t. input `j`.
    pub fn column(&self, j: usize) -> Vec<F> {
        (0..self.rows).map(|i| self[(i, j)]).collect()
    }

    /// Row-major entries.
    pub fn as_slice(&self) -> &[F] {
        &self.data
    }

    /// Nested `Vec` form, `rows[i][j] = ∂y_i/∂x_j`.
    pub fn to_rows(&self) -> Vec<Vec<F>> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }
}

impl<F: Float> Index<(usize, usize)> for Jacobian<F> {
    type Output = F;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &F {
        assert!(i < self.rows && j < self.cols, "Jacobian index out of bounds");
        &self.data[i * self.cols + j]
    }
}

impl<F: Float> super::Tape<F> {
    /// Full Jacobian at `inputs`, strategy chosen by shape.
    ///
    /// Equivalent to [`jacobian_with`](Self::jacobian_with) with
    /// [`JacobianStrategy::Auto`].
    pub fn jacobian(&self, inputs: &[F]) -> Result<Jacobian<F>> {
        self.jacobian_with(inputs, JacobianStrategy::Auto)
    }

    /// Full Jacobian at `inputs` using the given strategy.
    ///
    /// Both strategies produce the same matrix up to rounding. Any failing
    /// pass fails the whole call; no partial Jacobian is returned.
    ///
    /// # Errors
    ///
    /// [`AdError::DimensionMismatch`] before any work if `inputs` has the
    /// wrong length; [`AdError::Domain`] from any pass.
    pub fn jacobian_with(&self, inputs: &[F], strategy: JacobianStrategy) -> Result<Jacobian<F>> {
        AdError::check_len("inputs", self.num_inputs(), inputs.len())?;
        let (n, m) = (self.num_inputs(), self.num_outputs());
        let chosen = strategy.resolve(n, m);
        debug!("assembling {m}x{n} Jacobian with {chosen:?} strategy");
        match chosen {
            JacobianStrategy::Reverse => self.jacobian_reverse(inputs),
            JacobianStrategy::Auto | JacobianStrategy::Forward => self.jacobian_forward(inputs),
        }
    }

    /// Dense Jacobian via forward mode (one tangent pass per input).
    ///
    /// More efficient than reverse mode when `num_inputs < num_outputs`.
    pub fn jacobian_forward(&self, inputs: &[F]) -> Result<Jacobian<F>> {
        let n = self.num_inputs();
        AdError::check_len("inputs", n, inputs.len())?;

        let mut jac = Jacobian::zeros(self.num_outputs(), n);
        let mut seed = vec![F::zero(); n];
        for col in 0..n {
            seed[col] = F::one();
            let sweep = self.forward_tangent(inputs, &seed)?;
            for (row, t) in sweep.output_tangents().into_iter().enumerate() {
                jac.set(row, col, t);
            }
            seed[col] = F::zero();
        }
        Ok(jac)
    }

    /// Dense Jacobian via reverse mode (one reverse sweep per output).
    ///
    /// The primal sweep is shared by all rows.
    pub fn jacobian_reverse(&self, inputs: &[F]) -> Result<Jacobian<F>> {
        let values = self.primals(inputs)?;

        let mut jac = Jacobian::zeros(self.num_outputs(), self.num_inputs());
        for row in 0..self.num_outputs() {
            for (col, adj) in self.reverse_row(&values, row)?.into_iter().enumerate() {
                jac.set(row, col, adj);
            }
        }
        Ok(jac)
    }

    /// Jacobian-vector product: `(f(x), J·v)`.
    pub fn jvp(&self, inputs: &[F], direction: &[F]) -> Result<(Vec<F>, Vec<F>)> {
        Ok(self.forward_tangent(inputs, direction)?.into_outputs())
    }

    /// Vector-Jacobian product: `(f(x), wᵀ·J)`.
    pub fn vjp(&self, inputs: &[F], weights: &[F]) -> Result<(Vec<F>, Vec<F>)> {
        Ok(self.reverse_seeded(inputs, weights)?.into_outputs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_prefers_reverse_for_wide_tapes() {
        assert_eq!(
            JacobianStrategy::Auto.resolve(10, 1),
            JacobianStrategy::Reverse
        );
        assert_eq!(
            JacobianStrategy::Auto.resolve(1, 10),
            JacobianStrategy::Forward
        );
        assert_eq!(JacobianStrategy::Auto.resolve(3, 3), JacobianStrategy::Forward);
        assert_eq!(
            JacobianStrategy::Reverse.resolve(1, 10),
            JacobianStrategy::Reverse
        );
    }

    #[test]
    fn matrix_accessors() {
        let mut jac = Jacobian::<f64>::zeros(2, 3);
        jac.set(1, 2, 4.0);
        jac.set(0, 1, -1.0);
        assert_eq!(jac.nrows(), 2);
        assert_eq!(jac.ncols(), 3);
        assert_eq!(jac[(1, 2)], 4.0);
        assert_eq!(jac.get(2, 0), None);
        assert_eq!(jac.row(0), &[0.0, -1.0, 0.0]);
        assert_eq!(jac.column(2), vec![0.0, 4.0]);
        assert_eq!(jac.to_rows(), vec![vec![0.0, -1.0, 0.0], vec![0.0, 0.0, 4.0]]);
    }
}
