//! Dense N-dimensional arrays of expressions.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Index;

use ndarray::{ArrayD, Dimension, IxDyn};

use crate::error::{SymbolicError, SymbolicResult};
use crate::expr::{Expr, Symbol};

/// Row-major iterator over every multi-index of `shape`.
pub fn multi_indices(shape: &[usize]) -> MultiIndexIter {
    MultiIndexIter {
        shape: shape.to_vec(),
        next: if shape.iter().any(|&d| d == 0) {
            None
        } else {
            Some(vec![0; shape.len()])
        },
    }
}

/// Odometer over the multi-indices of a shape.
#[derive(Debug, Clone)]
pub struct MultiIndexIter {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl Iterator for MultiIndexIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut successor = current.clone();
        let mut axis = successor.len();
        let mut carried = true;
        while carried && axis > 0 {
            axis -= 1;
            successor[axis] += 1;
            if successor[axis] < self.shape[axis] {
                carried = false;
            } else {
                successor[axis] = 0;
            }
        }
        if !carried {
            self.next = Some(successor);
        }
        Some(current)
    }
}

/// N-dimensional array of [`Expr`] components in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct SymArray {
    data: ArrayD<Expr>,
}

impl SymArray {
    pub fn from_shape_vec(shape: &[usize], values: Vec<Expr>) -> SymbolicResult<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(SymbolicError::shape_mismatch(
                "from_shape_vec",
                &[expected],
                &[values.len()],
            ));
        }
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(|data| SymArray { data })
            .map_err(|e| SymbolicError::ShapeMismatch {
                operation: format!("from_shape_vec: {e}"),
                expected: shape.to_vec(),
                actual: vec![expected],
            })
    }

    pub fn from_elem(shape: &[usize], value: Expr) -> Self {
        SymArray {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        SymArray::from_elem(shape, Expr::zero())
    }

    /// Rank-0 array holding one value.
    pub fn scalar(value: Expr) -> Self {
        SymArray::from_elem(&[], value)
    }

    /// Build an array by evaluating `f` at every multi-index.
    pub fn from_fn<F>(shape: &[usize], mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> Expr,
    {
        SymArray {
            data: ArrayD::from_shape_fn(IxDyn(shape), |ix: IxDyn| {
                let idx = ix.as_array_view().to_vec();
                f(&idx)
            }),
        }
    }

    /// Fallible variant of [`SymArray::from_fn`].
    pub fn try_from_fn<F>(shape: &[usize], mut f: F) -> SymbolicResult<Self>
    where
        F: FnMut(&[usize]) -> SymbolicResult<Expr>,
    {
        let values = multi_indices(shape)
            .map(|idx| f(&idx))
            .collect::<SymbolicResult<Vec<_>>>()?;
        SymArray::from_shape_vec(shape, values)
    }

    /// 2-D array from rows.
    pub fn from_rows(rows: Vec<Vec<Expr>>) -> SymbolicResult<Self> {
        let n = rows.len();
        let m = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != m) {
            return Err(SymbolicError::shape_mismatch("from_rows", &[m], &[bad.len()]));
        }
        SymArray::from_shape_vec(&[n, m], rows.into_iter().flatten().collect())
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, idx: &[usize]) -> Option<&Expr> {
        self.data.get(idx)
    }

    pub fn get_mut(&mut self, idx: &[usize]) -> Option<&mut Expr> {
        self.data.get_mut(idx)
    }

    /// Components in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.data.iter()
    }

    pub fn to_vec(&self) -> Vec<Expr> {
        self.data.iter().cloned().collect()
    }

    /// The single component of a rank-0 array.
    pub fn as_scalar(&self) -> Option<&Expr> {
        if self.rank() == 0 {
            self.data.iter().next()
        } else {
            None
        }
    }

    pub fn map<F>(&self, f: F) -> SymArray
    where
        F: FnMut(&Expr) -> Expr,
    {
        SymArray {
            data: self.data.map(f),
        }
    }

    pub fn try_map<F>(&self, f: F) -> SymbolicResult<SymArray>
    where
        F: FnMut(&Expr) -> SymbolicResult<Expr>,
    {
        let values = self.data.iter().map(f).collect::<SymbolicResult<Vec<_>>>()?;
        SymArray::from_shape_vec(self.shape(), values)
    }

    /// Simplify every component.
    pub fn simplify(&self) -> SymbolicResult<SymArray> {
        self.try_map(Expr::simplify)
    }

    pub fn diff(&self, var: &Symbol) -> SymArray {
        self.map(|e| e.diff(var))
    }

    pub fn scale(&self, k: &Expr) -> SymArray {
        self.map(|e| e * k)
    }

    pub fn neg(&self) -> SymArray {
        self.map(|e| -e)
    }

    fn zip_with<F>(&self, other: &SymArray, operation: &str, mut f: F) -> SymbolicResult<SymArray>
    where
        F: FnMut(&Expr, &Expr) -> Expr,
    {
        if self.shape() != other.shape() {
            return Err(SymbolicError::shape_mismatch(
                operation,
                self.shape(),
                other.shape(),
            ));
        }
        let values = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| f(a, b))
            .collect();
        SymArray::from_shape_vec(self.shape(), values)
    }

    pub fn add(&self, other: &SymArray) -> SymbolicResult<SymArray> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &SymArray) -> SymbolicResult<SymArray> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// True when every component is literally zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(Expr::is_zero)
    }

    /// Outer product; the result's axes are `self`'s followed by `other`'s.
    pub fn tensor_product(&self, other: &SymArray) -> SymArray {
        let split = self.rank();
        let mut shape = self.shape().to_vec();
        shape.extend_from_slice(other.shape());
        SymArray::from_fn(&shape, |idx| &self.data[&idx[..split]] * &other.data[&idx[split..]])
    }

    /// Sum over each pair of axes; remaining axes keep their relative order.
    pub fn contract(&self, pairs: &[(usize, usize)]) -> SymbolicResult<SymArray> {
        let rank = self.rank();
        let mut used = vec![false; rank];
        for &(a, b) in pairs {
            if a >= rank || b >= rank || a == b || used[a] || used[b] {
                return Err(SymbolicError::InvalidAxisPairs {
                    pairs: pairs.to_vec(),
                    rank,
                });
            }
            if self.shape()[a] != self.shape()[b] {
                return Err(SymbolicError::shape_mismatch(
                    "contract",
                    &[self.shape()[a]],
                    &[self.shape()[b]],
                ));
            }
            used[a] = true;
            used[b] = true;
        }
        let kept: Vec<usize> = (0..rank).filter(|&ax| !used[ax]).collect();
        let out_shape: Vec<usize> = kept.iter().map(|&ax| self.shape()[ax]).collect();
        let pair_dims: Vec<usize> = pairs.iter().map(|&(a, _)| self.shape()[a]).collect();

        let mut full = vec![0; rank];
        let values = multi_indices(&out_shape)
            .map(|out| {
                for (slot, &ax) in kept.iter().enumerate() {
                    full[ax] = out[slot];
                }
                Expr::add_all(multi_indices(&pair_dims).map(|inner| {
                    for (k, &(a, b)) in pairs.iter().enumerate() {
                        full[a] = inner[k];
                        full[b] = inner[k];
                    }
                    self.data[full.as_slice()].clone()
                }))
            })
            .collect();
        SymArray::from_shape_vec(&out_shape, values)
    }

    /// Reorder axes: axis `i` of the result is axis `perm[i]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> SymbolicResult<SymArray> {
        let rank = self.rank();
        let mut seen = vec![false; rank];
        if perm.len() != rank || perm.iter().any(|&p| p >= rank || std::mem::replace(&mut seen[p], true)) {
            return Err(SymbolicError::InvalidPermutation {
                perm: perm.to_vec(),
                rank,
            });
        }
        let out_shape: Vec<usize> = perm.iter().map(|&p| self.shape()[p]).collect();
        let mut src = vec![0; rank];
        let values = multi_indices(&out_shape)
            .map(|out| {
                for (i, &p) in perm.iter().enumerate() {
                    src[p] = out[i];
                }
                self.data[src.as_slice()].clone()
            })
            .collect();
        SymArray::from_shape_vec(&out_shape, values)
    }

    /// Generalized Einstein summation over labelled operands.
    ///
    /// Each operand carries one label per axis. Labels listed in `output`
    /// become the result axes in that order; every other label is summed.
    /// A label repeated inside one operand takes its diagonal.
    pub fn einsum_labeled<L>(operands: &[(&SymArray, &[L])], output: &[L]) -> SymbolicResult<SymArray>
    where
        L: Clone + Eq + Hash + fmt::Debug,
    {
        let mut slots: HashMap<L, usize> = HashMap::new();
        let mut order: Vec<L> = Vec::new();
        let mut extents: Vec<usize> = Vec::new();
        for (array, labels) in operands {
            if labels.len() != array.rank() {
                return Err(SymbolicError::shape_mismatch(
                    "einsum operand labels",
                    &[array.rank()],
                    &[labels.len()],
                ));
            }
            for (axis, label) in labels.iter().enumerate() {
                let dim = array.shape()[axis];
                match slots.get(label) {
                    Some(&slot) if extents[slot] != dim => {
                        return Err(SymbolicError::ExtentMismatch {
                            label: format!("{label:?}"),
                            first: extents[slot],
                            second: dim,
                        });
                    }
                    Some(_) => {}
                    None => {
                        slots.insert(label.clone(), order.len());
                        order.push(label.clone());
                        extents.push(dim);
                    }
                }
            }
        }

        let mut out_slots = Vec::with_capacity(output.len());
        for label in output {
            let slot = slots.get(label).copied().ok_or_else(|| {
                SymbolicError::invalid_einsum(
                    format!("{output:?}"),
                    format!("output label {label:?} does not appear in any operand"),
                )
            })?;
            if out_slots.contains(&slot) {
                return Err(SymbolicError::invalid_einsum(
                    format!("{output:?}"),
                    format!("output label {label:?} repeated"),
                ));
            }
            out_slots.push(slot);
        }
        let summed_slots: Vec<usize> = (0..order.len()).filter(|s| !out_slots.contains(s)).collect();
        let out_shape: Vec<usize> = out_slots.iter().map(|&s| extents[s]).collect();
        let summed_shape: Vec<usize> = summed_slots.iter().map(|&s| extents[s]).collect();

        let axis_slots: Vec<Vec<usize>> = operands
            .iter()
            .map(|(_, labels)| labels.iter().map(|l| slots[l]).collect())
            .collect();

        let mut assignment = vec![0; order.len()];
        let mut positions: Vec<Vec<usize>> = operands.iter().map(|(a, _)| vec![0; a.rank()]).collect();
        let values = multi_indices(&out_shape)
            .map(|out| {
                for (k, &s) in out_slots.iter().enumerate() {
                    assignment[s] = out[k];
                }
                Expr::add_all(multi_indices(&summed_shape).map(|inner| {
                    for (k, &s) in summed_slots.iter().enumerate() {
                        assignment[s] = inner[k];
                    }
                    Expr::mul_all(operands.iter().enumerate().map(|(o, (array, _))| {
                        for (axis, &s) in axis_slots[o].iter().enumerate() {
                            positions[o][axis] = assignment[s];
                        }
                        array.data[positions[o].as_slice()].clone()
                    }))
                }))
            })
            .collect();
        SymArray::from_shape_vec(&out_shape, values)
    }
}

impl Index<&[usize]> for SymArray {
    type Output = Expr;

    fn index(&self, idx: &[usize]) -> &Expr {
        &self.data[idx]
    }
}

impl<const N: usize> Index<[usize; N]> for SymArray {
    type Output = Expr;

    fn index(&self, idx: [usize; N]) -> &Expr {
        &self.data[&idx[..]]
    }
}

impl From<ArrayD<Expr>> for SymArray {
    fn from(data: ArrayD<Expr>) -> Self {
        SymArray { data }
    }
}

impl fmt::Display for SymArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_level(
            f: &mut fmt::Formatter<'_>,
            values: &mut std::slice::Iter<'_, Expr>,
            shape: &[usize],
        ) -> fmt::Result {
            match shape.split_first() {
                None => match values.next() {
                    Some(v) => write!(f, "{v}"),
                    None => Ok(()),
                },
                Some((&n, rest)) => {
                    f.write_str("[")?;
                    for i in 0..n {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write_level(f, values, rest)?;
                    }
                    f.write_str("]")
                }
            }
        }
        let values = self.to_vec();
        write_level(f, &mut values.iter(), self.shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::on_engine_thread;

    fn ints(shape: &[usize], values: &[i64]) -> SymArray {
        SymArray::from_shape_vec(shape, values.iter().map(|&v| Expr::int(v)).collect()).unwrap()
    }

    #[test]
    fn test_multi_indices_row_major() {
        let all: Vec<_> = multi_indices(&[2, 2]).collect();
        assert_eq!(all, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        assert_eq!(multi_indices(&[]).count(), 1);
        assert_eq!(multi_indices(&[3, 0]).count(), 0);
    }

    #[test]
    fn test_contract_trace() {
        on_engine_thread(|| {
            let m = ints(&[2, 2], &[1, 2, 3, 4]);
            let tr = m.contract(&[(0, 1)]).unwrap();
            assert_eq!(tr.as_scalar(), Some(&Expr::int(5)));
        });
    }

    #[test]
    fn test_tensor_product_then_contract_is_matmul() {
        on_engine_thread(|| {
            let a = ints(&[2, 2], &[1, 2, 3, 4]);
            let b = ints(&[2, 2], &[5, 6, 7, 8]);
            let ab = a.tensor_product(&b).contract(&[(1, 2)]).unwrap();
            assert_eq!(ab, ints(&[2, 2], &[19, 22, 43, 50]));
        });
    }

    #[test]
    fn test_permute_transposes() {
        on_engine_thread(|| {
            let a = ints(&[2, 3], &[1, 2, 3, 4, 5, 6]);
            let t = a.permute(&[1, 0]).unwrap();
            assert_eq!(t.shape(), &[3, 2]);
            assert_eq!(t[[2, 1]], Expr::int(6));
            assert!(a.permute(&[0, 0]).is_err());
        });
    }

    #[test]
    fn test_einsum_labeled_full_contraction() {
        on_engine_thread(|| {
            let t = ints(&[2, 2], &[1, 2, 3, 4]);
            let out = SymArray::einsum_labeled(&[(&t, &["a", "b"][..]), (&t, &["a", "b"][..])], &[]).unwrap();
            assert_eq!(out.as_scalar(), Some(&Expr::int(30)));
        });
    }

    #[test]
    fn test_einsum_labeled_extent_mismatch() {
        on_engine_thread(|| {
            let a = SymArray::zeros(&[2]);
            let b = SymArray::zeros(&[3]);
            let err = SymArray::einsum_labeled(&[(&a, &['i'][..]), (&b, &['i'][..])], &[]);
            assert!(matches!(err, Err(SymbolicError::ExtentMismatch { .. })));
        });
    }

    #[test]
    fn test_display_nested() {
        on_engine_thread(|| {
            let a = ints(&[2, 2], &[1, 0, 0, 1]);
            assert_eq!(a.to_string(), "[[1, 0], [0, 1]]");
        });
    }
}
