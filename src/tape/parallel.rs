use log::debug;
use rayon::prelude::*;

use crate::error::{AdError, Result};
use crate::float::Float;

use super::{Jacobian, JacobianStrategy};

impl<F: Float> super::Tape<F> {
    /// Parallel Jacobian: independent seeds are evaluated on rayon workers.
    ///
    /// Each pass owns its buffers and only reads the tape. If any pass fails
    /// the first error is returned and no matrix is produced.
    pub fn jacobian_par(&self, inputs: &[F], strategy: JacobianStrategy) -> Result<Jacobian<F>> {
        let (n, m) = (self.num_inputs(), self.num_outputs());
        AdError::check_len("inputs", n, inputs.len())?;
        let chosen = strategy.resolve(n, m);
        debug!("assembling {m}x{n} Jacobian in parallel with {chosen:?} strategy");

        let mut jac = Jacobian::zeros(m, n);
        match chosen {
            JacobianStrategy::Reverse => {
                let values = self.primals(inputs)?;
                let rows: Vec<Vec<F>> = (0..m)
                    .into_par_iter()
                    .map(|row| self.reverse_row(&values, row))
                    .collect::<Result<_>>()?;
                for (i, row) in rows.into_iter().enumerate() {
                    for (j, adj) in row.into_iter().enumerate() {
                        jac.set(i, j, adj);
                    }
                }
            }
            JacobianStrategy::Auto | JacobianStrategy::Forward => {
                let cols: Vec<Vec<F>> = (0..n)
                    .into_par_iter()
                    .map(|col| {
                        let seed: Vec<F> = (0..n)
                            .map(|i| if i == col { F::one() } else { F::zero() })
                            .collect();
                        self.forward_tangent(inputs, &seed)
                            .map(|sweep| sweep.output_tangents())
                    })
                    .collect::<Result<_>>()?;
                for (j, col) in cols.into_iter().enumerate() {
                    for (i, t) in col.into_iter().enumerate() {
                        jac.set(i, j, t);
                    }
                }
            }
        }
        Ok(jac)
    }

    /// Evaluate the gradient at multiple input points in parallel.
    pub fn gradient_batch_par(&self, points: &[&[F]]) -> Result<Vec<Vec<F>>> {
        points.par_iter().map(|x| self.gradient(x)).collect()
    }
}
