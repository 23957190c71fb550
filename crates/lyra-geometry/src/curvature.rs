//! Riemann, Ricci and Einstein tensors and curvature invariants.
//!
//! ```text
//! R^l_{amn} = (1/φ²) ∂_m(φ Γ^l_{an}) − (1/φ²) ∂_n(φ Γ^l_{am})
//!           + Σ_r Γ^r_{an} Γ^l_{rm} − Σ_r Γ^r_{am} Γ^l_{rn}
//! Ric_{am}  = Σ_l R^l_{aml}
//! R         = g^{ab} Ric_{ab}
//! G_{ab}    = Ric_{ab} − ½ g_{ab} R
//! ```
//!
//! The Landau–Lifshitz convention negates the Riemann tensor and with it
//! every quantity built from it.

use lyra_symbolic::{Expr, SymArray, Symbol};
use tracing::debug;

use crate::config::RiemannConvention;
use crate::error::{GeometryError, GeometryResult};
use crate::signature::{D, U};
use crate::space::TensorSpace;
use crate::tensor::Tensor;

/// Riemann tensor `R^l_{amn}` of connection `gamma` (`Γ^a_{bc}`).
pub fn riemann_components(
    gamma: &SymArray,
    scale: &Expr,
    coords: &[Symbol],
    convention: RiemannConvention,
) -> GeometryResult<SymArray> {
    let dim = coords.len();
    debug!(dim, %convention, "computing Riemann tensor");
    let scaled = gamma.scale(scale);
    let derivatives: Vec<SymArray> = coords.iter().map(|x| scaled.diff(x)).collect();
    let inv_phi2 = scale.powi(-2);
    let sign = Expr::int(convention.sign());

    let flat = |l: usize, a: usize, m: usize, n: usize| ((l * dim + a) * dim + m) * dim + n;
    let mut values = vec![Expr::zero(); dim.pow(4)];
    for l in 0..dim {
        for a in 0..dim {
            for m in 0..dim {
                for n in (m + 1)..dim {
                    let derivative = &inv_phi2
                        * (derivatives[m][[l, a, n]].clone() - derivatives[n][[l, a, m]].clone());
                    let quadratic = Expr::add_all((0..dim).map(|r| {
                        gamma[[r, a, n]].clone() * gamma[[l, r, m]].clone()
                            - gamma[[r, a, m]].clone() * gamma[[l, r, n]].clone()
                    }));
                    let component = ((derivative + quadratic) * &sign).simplify()?;
                    values[flat(l, a, n, m)] = (-&component).simplify()?;
                    values[flat(l, a, m, n)] = component;
                }
            }
        }
    }
    Ok(SymArray::from_shape_vec(&[dim; 4], values)?)
}

/// `Ric_{am} = Σ_l R^l_{aml}`.
pub fn ricci_components(riemann: &SymArray) -> GeometryResult<SymArray> {
    Ok(riemann.contract(&[(0, 3)])?.simplify()?)
}

/// `R = g^{ab} Ric_{ab}`.
pub fn scalar_curvature(ricci: &SymArray, metric_inv: &SymArray) -> GeometryResult<Expr> {
    let traced = metric_inv.tensor_product(ricci).contract(&[(0, 2), (1, 3)])?;
    let value = traced.as_scalar().cloned().unwrap_or_default();
    Ok(value.simplify()?)
}

/// `G_{ab} = Ric_{ab} − ½ g_{ab} R`.
pub fn einstein_components(
    ricci: &SymArray,
    metric: &SymArray,
    scalar: &Expr,
) -> GeometryResult<SymArray> {
    let half_r = scalar * Expr::rational(1, 2);
    Ok(SymArray::try_from_fn(ricci.shape(), |idx| {
        (ricci[idx].clone() - metric[idx].clone() * &half_r).simplify()
    })?)
}

struct Curvature {
    riemann: Tensor,
    ricci: Tensor,
    scalar: Expr,
}

/// Curvature from the last update, or computed from the current connection.
fn curvature_of(space: &TensorSpace) -> GeometryResult<Curvature> {
    if let (Some(riemann), Some(ricci), Some(scalar)) =
        (space.riemann(), space.ricci(), space.scalar_curvature())
    {
        return Ok(Curvature {
            riemann: riemann.clone(),
            ricci: ricci.clone(),
            scalar: scalar.expr()?,
        });
    }
    if space.metric().is_none() {
        return Err(GeometryError::missing_metric("curvature"));
    }
    let gamma = space
        .connection()
        .ok_or_else(|| GeometryError::missing_connection("curvature"))?;
    let riemann = riemann_components(
        gamma.components(),
        &space.phi(),
        space.coords(),
        space.riemann_convention(),
    )?;
    let ricci = ricci_components(&riemann)?;
    let scalar = scalar_curvature(&ricci, space.metric_inv()?.components())?;
    let ctx = space.context();
    Ok(Curvature {
        riemann: Tensor::transient(ctx, riemann, vec![U, D, D, D]),
        ricci: Tensor::transient(ctx, ricci, vec![D, D]),
        scalar,
    })
}

/// Full contraction of a tensor with itself, all indices paired.
fn square(t: &Tensor) -> GeometryResult<Expr> {
    let rank = t.rank();
    let lower = t.convert(&vec![D; rank])?;
    let upper = t.convert(&vec![U; rank])?;
    let labels: Vec<usize> = (0..rank).collect();
    let total = SymArray::einsum_labeled(&[(&lower, labels.as_slice()), (&upper, labels.as_slice())], &[])?;
    Ok(total.as_scalar().cloned().unwrap_or_default().simplify()?)
}

fn scalar_tensor(space: &TensorSpace, value: Expr) -> Tensor {
    Tensor::derived(space.context(), SymArray::scalar(value), vec![])
}

/// Ricci scalar `R`.
pub fn ricci_scalar(space: &TensorSpace) -> GeometryResult<Tensor> {
    let curvature = curvature_of(space)?;
    Ok(scalar_tensor(space, curvature.scalar))
}

/// Kretschmann scalar `R_{abcd} R^{abcd}`.
pub fn kretschmann_scalar(space: &TensorSpace) -> GeometryResult<Tensor> {
    let curvature = curvature_of(space)?;
    Ok(scalar_tensor(space, square(&curvature.riemann)?))
}

/// Euler density `R² − 4 R_{ab} R^{ab} + R_{abcd} R^{abcd}`.
pub fn euler_density(space: &TensorSpace) -> GeometryResult<Tensor> {
    let curvature = curvature_of(space)?;
    let ricci_sq = square(&curvature.ricci)?;
    let kretschmann = square(&curvature.riemann)?;
    let value = (curvature.scalar.powi(2) - ricci_sq * 4 + kretschmann).simplify()?;
    Ok(scalar_tensor(space, value))
}

impl TensorSpace {
    pub fn ricci_scalar(&self) -> GeometryResult<Tensor> {
        ricci_scalar(self)
    }

    pub fn kretschmann_scalar(&self) -> GeometryResult<Tensor> {
        kretschmann_scalar(self)
    }

    pub fn euler_density(&self) -> GeometryResult<Tensor> {
        euler_density(self)
    }
}
