//! Gradient, divergence and Laplacian built on the covariant derivative.

use lyra_symbolic::SymArray;
use tracing::debug;

use crate::config::Direction;
use crate::error::{GeometryError, GeometryResult};
use crate::signature::{Variance, D, U};
use crate::space::TensorSpace;
use crate::tensor::Tensor;

impl TensorSpace {
    /// Partial derivatives `∂_a f` of a scalar, as a covector.
    pub fn gradient(&self, scalar: &Tensor) -> GeometryResult<Tensor> {
        if !scalar.belongs_to(self.context()) {
            return Err(GeometryError::ForeignSpace {
                name: scalar.name().to_string(),
            });
        }
        let f = scalar.expr()?;
        let coords = self.coords();
        let components = SymArray::try_from_fn(&[self.dim()], |idx| f.diff(&coords[idx[0]]).simplify())?;
        Ok(Tensor::derived(self.context(), components, vec![D]))
    }

    /// `∇_a T^{a...}`: the first axis contracted with a new derivative axis.
    ///
    /// A covariant first axis is raised with the metric beforehand.
    pub fn divergence(&self, tensor: &Tensor) -> GeometryResult<Tensor> {
        let rank = tensor.rank();
        if rank == 0 {
            return Err(GeometryError::RankMismatch(
                "divergence of a scalar".to_string(),
            ));
        }
        debug!(tensor = %tensor.name(), rank, "divergence");
        let raised = match tensor.signature()[0] {
            Variance::Up => tensor.clone(),
            Variance::Down => {
                let mut target = tensor.signature().to_vec();
                target[0] = U;
                tensor.with_signature(target)?
            }
        };
        let derivative = self.nabla_towards(&raised, Direction::Append)?;
        derivative.contract(0, rank, false)?.simplify()
    }

    /// `∇_a ∇^a f`.
    pub fn laplacian(&self, scalar: &Tensor) -> GeometryResult<Tensor> {
        let gradient = self.gradient(scalar)?.with_signature([U])?;
        self.divergence(&gradient)
    }
}
