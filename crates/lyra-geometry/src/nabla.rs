//! Covariant derivative with the generalized connection.
//!
//! ```text
//! ∇T[idx, k] = (1/φ) ∂_k T[idx]
//!            + Σ_{p up}   Σ_m Γ^{idx_p}_{m k} T[idx | p→m]
//!            − Σ_{p down} Σ_m Γ^m_{idx_p k}   T[idx | p→m]
//! ```
//!
//! The derivative index `k` is covariant and goes last or first depending
//! on the [`Direction`].

use lyra_symbolic::{Expr, SymArray};
use tracing::debug;

use crate::config::Direction;
use crate::error::{GeometryError, GeometryResult};
use crate::signature::{Variance, D};
use crate::space::TensorSpace;
use crate::tensor::Tensor;

impl TensorSpace {
    /// Covariant derivative, derivative axis placed per the configuration.
    pub fn nabla(&self, tensor: &Tensor) -> GeometryResult<Tensor> {
        self.nabla_towards(tensor, self.config().default_direction)
    }

    /// Covariant derivative with an explicit derivative-axis placement.
    pub fn nabla_towards(&self, tensor: &Tensor, direction: Direction) -> GeometryResult<Tensor> {
        if !tensor.belongs_to(self.context()) {
            return Err(GeometryError::ForeignSpace {
                name: tensor.name().to_string(),
            });
        }
        let gamma = self
            .connection()
            .ok_or_else(|| GeometryError::missing_connection("covariant derivative"))?
            .components();
        let dim = self.dim();
        let rank = tensor.rank();
        let signature = tensor.signature();
        let components = tensor.components();
        let inv_phi = self.phi().recip();
        let simplify = self.config().simplify_nabla;
        debug!(tensor = %tensor.name(), rank, ?direction, "covariant derivative");

        let partials: Vec<SymArray> = self.coords().iter().map(|x| components.diff(x)).collect();
        let mut moved = vec![0; rank];
        let result = SymArray::try_from_fn(&vec![dim; rank + 1], |full| {
            let (idx, k) = match direction {
                Direction::Append => (&full[..rank], full[rank]),
                Direction::Prepend => (&full[1..], full[0]),
            };
            let mut terms = vec![&partials[k][idx] * &inv_phi];
            moved.copy_from_slice(idx);
            for (p, variance) in signature.iter().enumerate() {
                for m in 0..dim {
                    moved[p] = m;
                    let value = &components[moved.as_slice()];
                    if value.is_zero() {
                        continue;
                    }
                    match variance {
                        Variance::Up => terms.push(&gamma[[idx[p], m, k]] * value),
                        Variance::Down => terms.push(-(&gamma[[m, idx[p], k]] * value)),
                    }
                }
                moved[p] = idx[p];
            }
            let sum = Expr::add_all(terms);
            if simplify {
                sum.simplify()
            } else {
                Ok(sum)
            }
        })?;

        let mut new_signature = signature.to_vec();
        match direction {
            Direction::Append => new_signature.push(D),
            Direction::Prepend => new_signature.insert(0, D),
        }
        Ok(Tensor::derived(self.context(), result, new_signature).with_label(tensor.label()))
    }

    /// `order`-fold covariant derivative, every derivative axis placed by
    /// `direction`.
    pub fn nabla_n(&self, tensor: &Tensor, order: usize, direction: Direction) -> GeometryResult<Tensor> {
        if order == 0 {
            return Err(GeometryError::InvalidOrder(order));
        }
        let mut current = self.nabla_towards(tensor, direction)?;
        for _ in 1..order {
            current = self.nabla_towards(&current, direction)?;
        }
        Ok(current)
    }

    /// `∇φ`.
    pub fn nabla_phi(&self) -> GeometryResult<Tensor> {
        let scale = self.scale().clone();
        self.nabla(&scale)
    }

    /// `∇∇φ`.
    pub fn nabla_nabla_phi(&self) -> GeometryResult<Tensor> {
        let scale = self.scale().clone();
        self.nabla_n(&scale, 2, self.config().default_direction)
    }
}
