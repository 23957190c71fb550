//! # Lyra Geometry
//!
//! **Symbolic tensor-index algebra over coordinate spaces with generalized
//! Lyra connections**
//!
//! Tensors live in a [`TensorSpace`] that owns the coordinates, the metric
//! and the inputs of the connection. Every tensor records the variance of
//! each axis; asking for a different placement raises or lowers through
//! the metric and caches the result.
//!
//! ## Core Components
//!
//! ### Spaces ([`TensorSpace`])
//! - Metric, inverse metric (lazy) and determinant
//! - Scale function `φ`, torsion `τ_{abc}` and non-metricity `M^a_{bc}`
//! - Christoffel symbols, the generalized connection and curvature,
//!   recomputed by [`TensorSpace::update`] with an [`UpdateRequest`]
//! - A registry of named tensors used by [`TensorSpace::eval_contract`]
//!
//! ### Tensors ([`Tensor`], [`IndexedTensor`])
//! - [`Variance`] per axis, re-signature with [`Tensor::with_signature`]
//! - Labelling with [`Index`] slots (`a.up()`, `a.down()`, `-&a`)
//! - Einstein summation over labels ([`TensorSpace::contract`]) and
//!   index-notation strings (`"A^a_b B^b_c"`)
//!
//! ### Calculus
//! - Covariant derivative [`TensorSpace::nabla`] with the generalized
//!   connection; gradient, divergence and Laplacian
//! - Riemann, Ricci, Einstein, Kretschmann and Euler density under the
//!   [`RiemannConvention`] of the [`SpaceConfig`]
//! - Autoparallel equations ([`TensorSpace::autoparallel_equations`])
//!
//! ## Quick Start
//!
//! ```no_run
//! use lyra_geometry::{TensorSpace, U};
//! use lyra_symbolic::{symbols, Expr, SymArray};
//!
//! let coords = symbols("r theta");
//! let r = coords[0].expr();
//! let space = TensorSpace::builder(coords)
//!     .metric(SymArray::diagonal(vec![Expr::one(), r.powi(2)]))
//!     .build()?;
//!
//! let v = space.from_array(
//!     SymArray::from_shape_vec(&[2], vec![Expr::one(), Expr::one()])?,
//!     [U],
//!     Some("v"),
//! )?;
//! let a = &space.index("a")[0];
//! let norm = space.contract(&[v.idx([a.up()])?.into(), v.idx([a.down()])?.into()])?;
//! assert_eq!(norm.expr()?, Expr::one() + r.powi(2));
//! # Ok::<(), lyra_geometry::GeometryError>(())
//! ```

mod autoparallel;
mod config;
mod connection;
mod contraction;
mod curvature;
mod error;
mod index;
mod nabla;
mod notation;
mod operators;
mod signature;
mod space;
mod tensor;


pub use autoparallel::{autoparallel_equations, AffineParameter, AutoparallelEquation};
pub use config::{Direction, RiemannConvention, SpaceConfig};
pub use connection::{
    christoffel_first_kind, christoffel_second_kind, generalized_connection, ConnectionInputs,
};
pub use contraction::Operand;
pub use curvature::{
    einstein_components, euler_density, kretschmann_scalar, ricci_components, ricci_scalar,
    riemann_components, scalar_curvature,
};
pub use error::{GeometryError, GeometryResult};
pub use index::{Index, IndexedTensor, Label, Slot};
pub use notation::{expand_slots, parse_expression, parse_token, TensorToken};
pub use signature::{
    normalize_signature, signature_string, IntoVariance, Signature, SignatureSpec, Variance, D, U,
};
pub use space::{
    Manifold, SpaceTime, TensorSource, TensorSpace, TensorSpaceBuilder, UpdateRequest, UpdateStep,
};
pub use tensor::{Tensor, TensorKind};

pub use lyra_symbolic;
