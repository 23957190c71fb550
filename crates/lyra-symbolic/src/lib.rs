//! # Lyra Symbolic
//!
//! **Scalar algebra and expression arrays for the Lyra geometry engine**
//!
//! This crate is the symbolic collaborator behind `lyra-geometry`. Scalar
//! expressions are [symbolica](https://symbolica.io) atoms; the crate adds
//! the simplification, differentiation and substitution entry points the
//! geometry layer needs, and dense N-dimensional arrays of expressions on
//! top of `ndarray`.
//!
//! ## Core Components
//!
//! ### Expressions ([`Expr`])
//! - Exact rational constants, free [`Symbol`]s
//! - `sin`, `cos`, `exp`, `log` and undefined functions ([`Function`])
//! - Partial derivatives ([`Expr::diff`]) with the chain rule through
//!   undefined functions
//! - Substitution ([`Expr::subs`], [`Expr::subs_all`])
//!
//! ### Simplification ([`Expr::simplify`])
//! Expressions are put over a common denominator with exact polynomial
//! cancellation, multiple angles are expanded and `sin² + cos² = 1` is
//! applied.
//!
//! ### Arrays ([`SymArray`])
//! - Dense N-dimensional arrays of expressions backed by `ndarray`
//! - Tensor product, axis-pair contraction, axis permutation
//! - Labeled Einstein summation ([`SymArray::einsum_labeled`]) and
//!   subscript strings ([`EinsumSpec`])
//! - Determinant and inverse of square matrices
//!
//! ## Threads
//!
//! Without a `SYMBOLICA_LICENSE` key symbolica only runs on the first
//! thread that uses it. Multi-threaded callers go through
//! [`on_engine_thread`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use lyra_symbolic::{Expr, SymArray, Symbol};
//!
//! let r = Symbol::new("r");
//! let theta = Symbol::new("theta");
//! let metric = SymArray::from_rows(vec![
//!     vec![Expr::one(), Expr::zero()],
//!     vec![Expr::zero(), r.expr().powi(2) * theta.expr().sin().powi(2)],
//! ])
//! .unwrap();
//! let inverse = metric.inverse().unwrap();
//! let product = metric.matmul(&inverse).unwrap().simplify().unwrap();
//! assert_eq!(product, SymArray::identity(2));
//! ```

mod array;
mod diff;
mod display;
mod einsum_spec;
mod engine;
mod error;
mod expr;
mod matrix;
mod ops;
mod simplify;
mod subs;

#[cfg(test)]
mod tests;

pub use array::{multi_indices, MultiIndexIter, SymArray};
pub use einsum_spec::EinsumSpec;
pub use engine::on_engine_thread;
pub use error::{SymbolicError, SymbolicResult};
pub use expr::{symbols, Expr, Function, Symbol};
