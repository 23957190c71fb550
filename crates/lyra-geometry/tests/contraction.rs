//! Integration tests for labelled contraction through the public API

use lyra_geometry::{GeometryError, Operand, TensorSpace, D, U};
use lyra_symbolic::{on_engine_thread, symbols, Expr, SymArray};

fn polar() -> TensorSpace {
    let coords = symbols("r theta");
    let r = coords[0].expr();
    TensorSpace::builder(coords)
        .metric(SymArray::diagonal(vec![Expr::one(), r.powi(2)]))
        .build()
        .unwrap()
}

#[test]
fn test_renaming_summed_labels_changes_nothing() {
    on_engine_thread(|| {
        let space = polar();
        let t = space.generic("T", [U, D]).unwrap();
        let s = space.generic("S", [U, D]).unwrap();
        let idx = space.index("a b c x y z");
        let (a, b, c) = (&idx[0], &idx[1], &idx[2]);
        let (x, y, z) = (&idx[3], &idx[4], &idx[5]);

        let first = space
            .contract(&[t.idx([a.up(), -b]).unwrap().into(), s.idx([b.up(), -c]).unwrap().into()])
            .unwrap();
        let second = space
            .contract(&[t.idx([x.up(), -y]).unwrap().into(), s.idx([y.up(), -z]).unwrap().into()])
            .unwrap();
        assert_eq!(first.components(), second.components());
        assert_eq!(first.signature(), second.signature());
    });
}

#[test]
fn test_notation_matches_explicit_labels() {
    on_engine_thread(|| {
        let space = polar();
        let t = space.generic("A", [U, D]).unwrap();
        let s = space.generic("B", [U, D]).unwrap();
        let idx = space.index("a b c");
        let (a, b, c) = (&idx[0], &idx[1], &idx[2]);
        let explicit = t
            .idx([a.up(), -b])
            .unwrap()
            .times(s.idx([b.up(), -c]).unwrap())
            .unwrap();
        let parsed = space.eval_contract("A^{a}_{b} B^{b}_{c}").unwrap();
        assert_eq!(explicit.components(), parsed.components());
    });
}

#[test]
fn test_same_variance_needs_the_metric() {
    on_engine_thread(|| {
        let space = polar();
        let t = space.generic("T", [D, D]).unwrap();
        let a = &space.index("a")[0];
        assert!(matches!(
            t.idx([-a, -a]),
            Err(GeometryError::RepeatedVariance { .. })
        ));
        assert!(matches!(
            t.contract(0, 1, false),
            Err(GeometryError::RepeatedVariance { .. })
        ));

        // g^{ab} T_{ab}
        let trace = t.contract(0, 1, true).unwrap();
        let r = space.coords()[0].expr();
        let expected = t[[0, 0]].clone() + t[[1, 1]].clone() * r.powi(-2);
        assert!((trace.expr().unwrap() - expected).is_identically_zero().unwrap());
    });
}

#[test]
fn test_scalars_and_bare_tensors_as_operands() {
    on_engine_thread(|| {
        let space = polar();
        let v = space
            .from_array(
                SymArray::from_shape_vec(&[2], vec![Expr::int(3), Expr::int(4)]).unwrap(),
                [U],
                None,
            )
            .unwrap();
        let product = space
            .contract(&[Operand::from(2), Operand::from(&v), Operand::from(&v)])
            .unwrap();
        assert_eq!(product.rank(), 2);
        assert_eq!(product.components()[[1, 0]], Expr::int(24));
    });
}

#[test]
fn test_partial_derivative_contracts_like_an_index() {
    on_engine_thread(|| {
        let space = polar();
        let r = space.coords()[0].expr();
        let v = space
            .from_array(
                SymArray::from_shape_vec(&[2], vec![r.powi(2), r.clone()]).unwrap(),
                [U],
                None,
            )
            .unwrap();
        let m = &space.coord_index("m").unwrap()[0];
        // ∂_m v^m
        let div = v.idx([m.up()]).unwrap().partial(-m).unwrap();
        assert_eq!(div.expr().unwrap(), 2 * r);
        assert!(space.coord_index("m _").is_err());
    });
}

#[test]
fn test_foreign_operands_are_rejected() {
    on_engine_thread(|| {
        let space = polar();
        let other = polar();
        let t = other.generic("T", [U]).unwrap();
        let a = &space.index("a")[0];
        let result = space.contract(&[t.idx([a.up()]).unwrap().into()]);
        assert!(matches!(result, Err(GeometryError::ForeignSpace { .. })));
    });
}
