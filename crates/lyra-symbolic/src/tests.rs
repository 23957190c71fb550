//! Cross-module tests for the symbolic layer.

use crate::*;

#[test]
fn test_derivative_then_simplify() {
    on_engine_thread(|| {
        let x = Symbol::new("x");
        let e = (x.expr().powi(2) + 1) / x.expr();
        let d = e.diff(&x).simplify().unwrap();
        let expected = (x.expr().powi(2) - 1) / x.expr().powi(2);
        assert!((d - expected).is_identically_zero().unwrap());
    });
}

#[test]
fn test_sphere_metric_derivative_identity() {
    on_engine_thread(|| {
        let theta = Symbol::new("theta");
        let s2 = theta.expr().sin().powi(2);
        // d/dθ (sin²θ) / (2 sin²θ) = cot θ
        let ratio = s2.diff(&theta) / (2 * s2.clone());
        let cot = theta.expr().cos() / theta.expr().sin();
        assert!((ratio - cot).is_identically_zero().unwrap());
    });
}

#[test]
fn test_schwarzschild_factor_cancels() {
    on_engine_thread(|| {
        let r = Symbol::new("r");
        let m = Expr::sym("M");
        let f = 1 - 2 * m.clone() / r.expr();
        let g_rr = f.recip();
        let e = f.diff(&r) / (2 * f.clone()) + g_rr.diff(&r) / (2 * g_rr.clone());
        assert!(e.is_identically_zero().unwrap());
    });
}

#[test]
fn test_inverse_of_symbolic_metric() {
    on_engine_thread(|| {
        let r = Symbol::new("r");
        let theta = Symbol::new("theta");
        let m = Expr::sym("M");
        let f = 1 - 2 * m / r.expr();
        let diag = [
            -f.clone(),
            f.recip(),
            r.expr().powi(2),
            r.expr().powi(2) * theta.expr().sin().powi(2),
        ];
        let g = SymArray::from_fn(&[4, 4], |idx| {
            if idx[0] == idx[1] {
                diag[idx[0]].clone()
            } else {
                Expr::zero()
            }
        });
        let inv = g.inverse().unwrap();
        let check = g.matmul(&inv).unwrap().simplify().unwrap();
        assert_eq!(check, SymArray::identity(4));
        let det = g.determinant().unwrap();
        let expected = -(r.expr().powi(4) * theta.expr().sin().powi(2));
        assert!((det - expected).is_identically_zero().unwrap());
    });
}

#[test]
fn test_einsum_with_symbols() {
    on_engine_thread(|| {
        let x = Expr::sym("x");
        let y = Expr::sym("y");
        let v = SymArray::from_shape_vec(&[2], vec![x.clone(), y.clone()]).unwrap();
        let norm = SymArray::einsum("i,i->", &[&v, &v]).unwrap();
        assert_eq!(norm.as_scalar(), Some(&(x.powi(2) + y.powi(2))));
    });
}
