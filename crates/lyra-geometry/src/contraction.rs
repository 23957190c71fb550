//! Einstein summation over labelled operands.
//!
//! Operands are multiplied left to right. Their labels are pooled: a label
//! seen once stays free, a label seen twice must carry opposite variances
//! and is summed, anything else is rejected. Free labels keep their first
//! left-to-right position.

use std::rc::Rc;

use indexmap::IndexMap;
use lyra_symbolic::{Expr, SymArray};
use tracing::trace;

use crate::error::{GeometryError, GeometryResult};
use crate::index::{IndexedTensor, Label};
use crate::signature::Variance;
use crate::space::SpaceContext;
use crate::tensor::Tensor;

/// One factor of a product.
#[derive(Debug, Clone)]
pub enum Operand {
    Indexed(IndexedTensor),
    /// Every axis receives a fresh label, so it stays free
    Tensor(Tensor),
    Scalar(Expr),
}

impl From<IndexedTensor> for Operand {
    fn from(t: IndexedTensor) -> Self {
        Operand::Indexed(t)
    }
}

impl From<&IndexedTensor> for Operand {
    fn from(t: &IndexedTensor) -> Self {
        Operand::Indexed(t.clone())
    }
}

impl From<Tensor> for Operand {
    fn from(t: Tensor) -> Self {
        Operand::Tensor(t)
    }
}

impl From<&Tensor> for Operand {
    fn from(t: &Tensor) -> Self {
        Operand::Tensor(t.clone())
    }
}

impl From<Expr> for Operand {
    fn from(e: Expr) -> Self {
        Operand::Scalar(e)
    }
}

impl From<&Expr> for Operand {
    fn from(e: &Expr) -> Self {
        Operand::Scalar(e.clone())
    }
}

impl From<i64> for Operand {
    fn from(n: i64) -> Self {
        Operand::Scalar(Expr::int(n))
    }
}

/// Multiply operands of one space and sum repeated labels.
pub(crate) fn contract_operands(
    space: &Rc<SpaceContext>,
    operands: &[Operand],
) -> GeometryResult<IndexedTensor> {
    if operands.is_empty() {
        return Err(GeometryError::RankMismatch(
            "contraction needs at least one operand".to_string(),
        ));
    }
    let mut factors = Vec::new();
    let mut scalar = Expr::one();
    for operand in operands {
        match operand {
            Operand::Indexed(t) => {
                if !t.belongs_to(space) {
                    return Err(GeometryError::ForeignSpace {
                        name: format!("{:?}", t.labels()),
                    });
                }
                factors.push(t.clone());
            }
            Operand::Tensor(t) => {
                if !t.belongs_to(space) {
                    return Err(GeometryError::ForeignSpace {
                        name: t.name().to_string(),
                    });
                }
                factors.push(t.bare()?);
            }
            Operand::Scalar(e) => scalar = scalar * e,
        }
    }
    contract_factors(space, factors, scalar)
}

/// Group labels, validate variances and evaluate the summation.
pub(crate) fn contract_factors(
    space: &Rc<SpaceContext>,
    factors: Vec<IndexedTensor>,
    scalar: Expr,
) -> GeometryResult<IndexedTensor> {
    let mut groups: IndexMap<&Label, Vec<Variance>> = IndexMap::new();
    for factor in &factors {
        for (label, &variance) in factor.labels.iter().zip(&factor.signature) {
            groups.entry(label).or_default().push(variance);
        }
    }

    let mut free_labels = Vec::new();
    let mut free_signature = Vec::new();
    let mut summed = Vec::new();
    for (label, variances) in &groups {
        match variances.as_slice() {
            [v] => {
                free_labels.push((*label).clone());
                free_signature.push(*v);
            }
            [a, b] if a != b => summed.push((*label).clone()),
            [a, _] => {
                return Err(GeometryError::RepeatedVariance {
                    label: label.to_string(),
                    variance: *a,
                })
            }
            _ => {
                return Err(GeometryError::AmbiguousLabel {
                    label: label.to_string(),
                    count: variances.len(),
                })
            }
        }
    }
    trace!(
        factors = factors.len(),
        free = ?free_labels,
        summed = ?summed,
        "contracting labelled operands"
    );

    let components = match factors.as_slice() {
        [] => SymArray::scalar(Expr::one()),
        [single] if summed.is_empty() => single.components.clone(),
        _ => {
            let operands: Vec<(&SymArray, &[Label])> = factors
                .iter()
                .map(|f| (&f.components, f.labels.as_slice()))
                .collect();
            SymArray::einsum_labeled(&operands, &free_labels)?
        }
    };
    let components = if scalar.is_one() {
        components
    } else {
        components.scale(&scalar)
    };
    Ok(IndexedTensor::from_parts(
        components,
        free_signature,
        free_labels,
        Rc::clone(space),
    ))
}

#[cfg(test)]
mod tests {
    use lyra_symbolic::{on_engine_thread, symbols, Expr, SymArray};

    use super::*;
    use crate::index::{Index, Slot};
    use crate::signature::{D, U};
    use crate::space::TensorSpace;

    fn space() -> TensorSpace {
        TensorSpace::builder(symbols("x y"))
            .metric(SymArray::identity(2))
            .build()
            .unwrap()
    }

    fn indices<const N: usize>(space: &TensorSpace, names: &str) -> [Index; N] {
        space.index(names).try_into().unwrap()
    }

    #[test]
    fn test_free_labels_keep_left_to_right_order() {
        on_engine_thread(|| {
            let space = space();
            let [a, b, c] = indices(&space, "a b c");
            let t = space.generic("T", [U, D]).unwrap();
            let s = space.generic("S", [U, D]).unwrap();
            let prod = t.idx([a.up(), b.down()]).unwrap().times(s.idx([c.up(), a.down()]).unwrap()).unwrap();
            assert_eq!(prod.signature(), &[D, U]);
            assert_eq!(prod.labels()[0].name(), Some("b"));
            assert_eq!(prod.labels()[1].name(), Some("c"));
            let expected = t[[0, 1]].clone() * s[[0, 0]].clone() + t[[1, 1]].clone() * s[[0, 1]].clone();
            assert_eq!(prod.components()[[1, 0]], expected);
        });
    }

    #[test]
    fn test_repeated_and_ambiguous_labels() {
        on_engine_thread(|| {
            let space = space();
            let [a] = indices(&space, "a");
            let t = space.generic("T", [U, D]).unwrap();
            let v = space.generic("V", [U]).unwrap();
            let same = t.idx([a.up(), a.up()]);
            assert!(matches!(same, Err(GeometryError::RepeatedVariance { .. })));
            let thrice = space.contract(&[
                t.idx([a.up(), Slot::unlabeled(None)]).unwrap().into(),
                v.idx([a.up()]).unwrap().into(),
                v.idx([a.down()]).unwrap().into(),
            ]);
            assert!(matches!(
                thrice,
                Err(GeometryError::AmbiguousLabel { count: 3, .. })
            ));
        });
    }

    #[test]
    fn test_scalars_multiply_pointwise() {
        on_engine_thread(|| {
            let space = space();
            let v = space.generic("V", [U]).unwrap();
            let scaled = space
                .contract(&[Operand::from(3), Operand::from(&v)])
                .unwrap();
            assert_eq!(scaled.components()[[1]], v[[1]].clone() * 3);
            assert!(space.contract(&[]).is_err());
        });
    }

    #[test]
    fn test_foreign_space_is_rejected() {
        on_engine_thread(|| {
            let first = space();
            let second = space();
            let v = second.generic("V", [U]).unwrap();
            assert!(matches!(
                first.contract(&[Operand::from(&v)]),
                Err(GeometryError::ForeignSpace { .. })
            ));
        });
    }
}
