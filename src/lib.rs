//! Forward- and reverse-mode automatic differentiation over an operation tape.
//!
//! A [`Tape`] records a function as a sequence of elementary operations in
//! creation order. The same tape then serves any number of
//! Jacobian-vector products ([`Tape::forward_tangent`]), vector-Jacobian
//! products ([`Tape::reverse_seeded`]) and full Jacobians
//! ([`Tape::jacobian`]) at different inputs.
//!
//! ```
//! use adtape::{record, JacobianStrategy};
//!
//! let (tape, f) = record(|x| x[0].ln() + x[0] * x[1] - x[1].sin(), &[2.0_f64, 5.0]).unwrap();
//! assert!((f - 11.6521).abs() < 1e-4);
//!
//! let fwd = tape.jacobian_with(&[2.0, 5.0], JacobianStrategy::Forward).unwrap();
//! let rev = tape.jacobian_with(&[2.0, 5.0], JacobianStrategy::Reverse).unwrap();
//! assert!((fwd[(0, 0)] - 5.5).abs() < 1e-12);
//! assert!((rev[(0, 1)] - 1.7163).abs() < 1e-4);
//! ```

pub mod api;
pub mod error;
pub mod float;
pub mod opcode;
pub mod tape;
pub mod traced;
mod traits;

pub use api::{evaluate_forward, evaluate_reverse, grad, jacobian, record, record_multi};
pub use error::{AdError, Result};
pub use float::Float;
pub use opcode::OpCode;
pub use tape::{ForwardSweep, Jacobian, JacobianStrategy, Node, ReverseSweep, Tape, VarId};
pub use traced::Traced;

/// Type alias for tapes over `f64`.
pub type Tape64 = Tape<f64>;
/// Type alias for tapes over `f32`.
pub type Tape32 = Tape<f32>;
/// Type alias for recording variables over `f64`.
pub type Traced64 = Traced<f64>;
/// Type alias for recording variables over `f32`.
pub type Traced32 = Traced<f32>;
