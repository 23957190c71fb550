//! Symbolic differentiation.
//!
//! Derivatives of undefined functions stay unevaluated as
//! `der(n_1, ..., n_k, f(args))`, with one derivative order per argument
//! slot. Differentiating again raises the orders.

use symbolica::atom::AtomCore;

use crate::expr::{Expr, Symbol};

impl Expr {
    /// Partial derivative with respect to `var`.
    pub fn diff(&self, var: &Symbol) -> Expr {
        Expr(self.0.derivative(var.0))
    }

    /// `n`-th partial derivative with respect to `var`.
    pub fn diff_n(&self, var: &Symbol, n: usize) -> Expr {
        let mut out = self.clone();
        for _ in 0..n {
            if out.is_zero() {
                break;
            }
            out = out.diff(var);
        }
        out
    }
}
