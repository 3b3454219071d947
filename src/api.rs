use crate::error::Result;
use crate::float::Float;
use crate::tape::{Jacobian, Tape, TapeGuard, TapeThreadLocal};
use crate::traced::{ensure_on_tape, Traced};

/// Record a function into a [`Tape`] that can be re-evaluated at different
/// inputs without re-recording.
///
/// Returns the tape and the output value from the recording pass.
///
/// # Limitations
///
/// The tape records one execution path. If `f` contains branches
/// (`if x > 0 { ... } else { ... }`), re-evaluating at inputs that take a
/// different branch produces **incorrect results**.
///
/// # Errors
///
/// The first construction error raised inside `f`, e.g.
/// [`AdError::Domain`](crate::AdError::Domain) for `ln` of a non-positive
/// recorded value.
///
/// # Example
///
/// ```
/// let (tape, val) = adtape::record(|x| x[0] * x[0] + x[1] * x[1], &[3.0_f64, 4.0]).unwrap();
/// assert!((val - 25.0).abs() < 1e-10);
///
/// let g = tape.gradient(&[3.0, 4.0]).unwrap();
/// assert!((g[0] - 6.0).abs() < 1e-10);
/// assert!((g[1] - 8.0).abs() < 1e-10);
/// ```
pub fn record<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Traced<F>]) -> Traced<F>,
    x: &[F],
) -> Result<(Tape<F>, F)> {
    let (tape, values) = record_multi(|v| vec![f(v)], x)?;
    Ok((tape, values[0]))
}

/// Record a multi-output function into a [`Tape`].
///
/// Like [`record`] but for vector-valued functions `f : R^n → R^m`. The
/// returned tape has `m` outputs, in the order `f` returns them.
pub fn record_multi<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Traced<F>]) -> Vec<Traced<F>>,
    x: &[F],
) -> Result<(Tape<F>, Vec<F>)> {
    let n = x.len();
    let mut tape = Tape::with_capacity(n * 10);

    // Register inputs.
    let inputs: Vec<Traced<F>> = x
        .iter()
        .map(|&val| Traced {
            value: val,
            index: tape.new_input(val).raw(),
            tape_id: tape.id,
        })
        .collect();

    let outputs = {
        let _guard = TapeGuard::new(&mut tape);
        f(&inputs)
    };

    if let Some(err) = tape.take_pending_error() {
        return Err(err);
    }

    // A constant output still needs a tape entry to be addressable.
    let ids = outputs
        .iter()
        .map(|o| ensure_on_tape(o, &mut tape))
        .collect::<Result<Vec<_>>>()?;
    tape.set_outputs(&ids)?;

    let values = tape.output_values();
    Ok((tape, values))
}

/// Forward-mode evaluation: `(primal_outputs, tangent_outputs)`.
///
/// One Jacobian-vector product `J·seed`.
pub fn evaluate_forward<F: Float>(
    tape: &Tape<F>,
    inputs: &[F],
    seed: &[F],
) -> Result<(Vec<F>, Vec<F>)> {
    tape.jvp(inputs, seed)
}

/// Reverse-mode evaluation: `(primal_outputs, input_adjoints)`.
///
/// One vector-Jacobian product `output_seedᵀ·J`.
pub fn evaluate_reverse<F: Float>(
    tape: &Tape<F>,
    inputs: &[F],
    output_seed: &[F],
) -> Result<(Vec<F>, Vec<F>)> {
    tape.vjp(inputs, output_seed)
}

/// Full `m × n` Jacobian at `inputs`, strategy chosen by shape.
pub fn jacobian<F: Float>(tape: &Tape<F>, inputs: &[F]) -> Result<Jacobian<F>> {
    tape.jacobian(inputs)
}

/// Record `f` and compute its gradient at `x`.
///
/// ```
/// let g = adtape::grad(|x| x[0].ln() + x[0] * x[1] - x[1].sin(), &[2.0_f64, 5.0]).unwrap();
/// assert!((g[0] - 5.5).abs() < 1e-12);
/// assert!((g[1] - (2.0 - 5.0_f64.cos())).abs() < 1e-12);
/// ```
pub fn grad<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Traced<F>]) -> Traced<F>,
    x: &[F],
) -> Result<Vec<F>> {
    let (tape, _) = record(f, x)?;
    tape.gradient(x)
}
