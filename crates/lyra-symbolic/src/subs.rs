//! Substitution of symbols by expressions.

use std::collections::HashMap;

use symbolica::atom::{AtomCore, AtomView};

use crate::expr::{Expr, Symbol};

impl Expr {
    /// Replace every occurrence of `sym` by `value`.
    pub fn subs(&self, sym: &Symbol, value: &Expr) -> Expr {
        let mut map = HashMap::with_capacity(1);
        map.insert(sym.clone(), value.clone());
        self.subs_all(&map)
    }

    /// Simultaneous substitution; replacements are not substituted into
    /// each other.
    ///
    /// Only variables are replaced. A function sharing a name with a
    /// replaced symbol keeps its name.
    pub fn subs_all(&self, map: &HashMap<Symbol, Expr>) -> Expr {
        if map.is_empty() {
            return self.clone();
        }
        Expr(self.0.replace_map(|view, _ctx, out| {
            if let AtomView::Var(v) = view {
                if let Some(value) = map.get(&Symbol(v.get_symbol())) {
                    **out = value.0.clone();
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::on_engine_thread;
    use crate::expr::Function;

    #[test]
    fn test_subs_folds_numbers() {
        on_engine_thread(|| {
            let x = Symbol::new("x");
            let e = x.expr().powi(2) + 3 * x.expr();
            assert_eq!(e.subs(&x, &Expr::int(2)), Expr::int(10));
        });
    }

    #[test]
    fn test_subs_is_simultaneous() {
        on_engine_thread(|| {
            let x = Symbol::new("x");
            let y = Symbol::new("y");
            let mut map = HashMap::new();
            map.insert(x.clone(), y.expr());
            map.insert(y.clone(), x.expr());
            let e = x.expr() - 2 * y.expr();
            assert_eq!(e.subs_all(&map), y.expr() - 2 * x.expr());
        });
    }

    #[test]
    fn test_coordinate_becomes_function_of_parameter() {
        on_engine_thread(|| {
            let x = Symbol::new("x");
            let tau = Symbol::new("tau");
            let curve = Function::new("x").call([tau.expr()]);
            let e = Function::new("f").call([x.expr()]).diff(&x);
            let on_curve = e.subs(&x, &curve);
            let along = Function::new("f").call([curve.clone()]).diff(&tau);
            assert_eq!(along, on_curve * curve.diff(&tau));
            assert_eq!(x.expr().cos().subs(&x, &Expr::zero()), Expr::one());
            let velocity = curve.diff(&tau);
            assert!(!velocity.is_zero());
            assert_eq!(velocity.subs(&x, &Expr::int(3)), velocity);
        });
    }
}
