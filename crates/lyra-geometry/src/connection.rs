//! Christoffel symbols and the generalized Lyra connection.
//!
//! With scale `φ`, torsion `τ_{abc}` and non-metricity `M^a_{bc}`:
//!
//! ```text
//! Γ^b_{nl} = (1/φ) Γ̃^b_{nl} − ½ M^b_{nl}
//!          + (1/φ) [ δ^b_n (1/φ) ∂_l φ − Σ_s (1/φ) g_{nl} g^{bs} ∂_s φ ]
//!          + ½ Σ_m g^{mb} (τ_{lmn} − τ_{nlm} − τ_{mln})
//! ```
//!
//! where `Γ̃` are the Christoffel symbols of the second kind. For `φ = 1`
//! and vanishing `τ` and `M` this is the Levi-Civita connection.

use lyra_symbolic::{Expr, SymArray, Symbol};
use tracing::debug;

use crate::error::GeometryResult;

/// `Γ̃_{abc} = ½ (∂_b g_{ac} + ∂_c g_{ab} − ∂_a g_{bc})`.
pub fn christoffel_first_kind(metric: &SymArray, coords: &[Symbol]) -> GeometryResult<SymArray> {
    let dim = coords.len();
    let derivatives: Vec<SymArray> = coords.iter().map(|x| metric.diff(x)).collect();
    let half = Expr::rational(1, 2);
    Ok(SymArray::try_from_fn(&[dim, dim, dim], |idx| {
        let (a, b, c) = (idx[0], idx[1], idx[2]);
        let sum = derivatives[b][[a, c]].clone() + derivatives[c][[a, b]].clone()
            - derivatives[a][[b, c]].clone();
        (sum * &half).simplify()
    })?)
}

/// `Γ̃^a_{bc} = Σ_d g^{ad} Γ̃_{dbc}`.
pub fn christoffel_second_kind(metric_inv: &SymArray, first: &SymArray) -> GeometryResult<SymArray> {
    let dim = metric_inv.shape()[0];
    Ok(SymArray::try_from_fn(&[dim, dim, dim], |idx| {
        let (a, b, c) = (idx[0], idx[1], idx[2]);
        Expr::add_all((0..dim).map(|d| metric_inv[[a, d]].clone() * first[[d, b, c]].clone()))
            .simplify()
    })?)
}

/// Everything the generalized connection depends on.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInputs<'a> {
    pub metric: &'a SymArray,
    pub metric_inv: &'a SymArray,
    pub christoffel2: &'a SymArray,
    pub scale: &'a Expr,
    /// `τ_{abc}`
    pub torsion: &'a SymArray,
    /// `M^a_{bc}`
    pub nonmetricity: &'a SymArray,
    pub coords: &'a [Symbol],
}

/// Generalized connection coefficients `Γ^b_{nl}`, simplified.
pub fn generalized_connection(inputs: &ConnectionInputs<'_>) -> GeometryResult<SymArray> {
    let ConnectionInputs {
        metric: g,
        metric_inv: g_inv,
        christoffel2,
        scale: phi,
        torsion: tau,
        nonmetricity: m,
        coords,
    } = *inputs;
    let dim = coords.len();
    let inv_phi = phi.recip();
    let dphi: Vec<Expr> = coords.iter().map(|x| phi.diff(x)).collect();
    let half = Expr::rational(1, 2);
    debug!(dim, "deriving generalized connection");

    Ok(SymArray::try_from_fn(&[dim, dim, dim], |idx| {
        let (b, n, l) = (idx[0], idx[1], idx[2]);
        let mut terms = vec![
            christoffel2[[b, n, l]].clone() * &inv_phi,
            -(m[[b, n, l]].clone() * &half),
        ];

        let mut scale_terms = Vec::new();
        if b == n {
            scale_terms.push(&inv_phi * &dphi[l]);
        }
        for (s, ds) in dphi.iter().enumerate() {
            scale_terms.push(-(&inv_phi * &g[[n, l]] * &g_inv[[b, s]] * ds));
        }
        terms.push(&inv_phi * Expr::add_all(scale_terms));

        let torsion = Expr::add_all((0..dim).map(|k| {
            g_inv[[k, b]].clone()
                * (tau[[l, k, n]].clone() - tau[[n, l, k]].clone() - tau[[k, l, n]].clone())
        }));
        terms.push(torsion * &half);

        Expr::add_all(terms).simplify()
    })?)
}
